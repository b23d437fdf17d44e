use event_indexer::{service::run_service, Dependencies, IndexerConfig, IndexingError};
use event_indexer_pipeline::shutdown::ShutdownHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match IndexerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not set up yet; the filter depends on the config.
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);

    if let Err(e) = run(config).await {
        error!(error = %e, "Event indexer failed");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .init();
}

async fn run(config: IndexerConfig) -> Result<(), IndexingError> {
    info!("Starting event indexer");

    let dependencies = Dependencies::new(&config).await?;
    let orchestrator = dependencies.orchestrator;

    tokio::spawn(shutdown_on_signal(orchestrator.shutdown_handle()));

    run_service(&orchestrator, config.health_addr).await?;

    info!("Event indexer stopped");
    Ok(())
}

/// Trigger a graceful shutdown on SIGINT or SIGTERM.
async fn shutdown_on_signal(shutdown: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                wait_for_ctrl_c().await;
                shutdown.shutdown();
                return;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;

    info!("Shutting down");
    shutdown.shutdown();
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT");
        std::future::pending::<()>().await;
    }
}
