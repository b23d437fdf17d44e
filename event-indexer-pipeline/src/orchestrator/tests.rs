use super::*;
use async_trait::async_trait;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::consumer::Acknowledge;
use event_indexer_shared::Event;

const WAIT: Duration = Duration::from_secs(2);

/// Source backed by channels the test writes to.
struct ChannelSource {
    streams: StdMutex<Option<SourceStreams>>,
}

impl ChannelSource {
    fn new() -> (Arc<Self>, mpsc::Sender<UnitOfWork>, mpsc::Sender<SourceError>) {
        let (unit_tx, unit_rx) = mpsc::channel(16);
        let (error_tx, error_rx) = mpsc::channel(16);
        let source = Arc::new(Self {
            streams: StdMutex::new(Some(SourceStreams {
                units: unit_rx,
                errors: error_rx,
            })),
        });
        (source, unit_tx, error_tx)
    }
}

impl EventSource for ChannelSource {
    fn consume(&self, _shutdown: ShutdownSignal) -> SourceStreams {
        self.streams
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(SourceStreams::closed)
    }
}

/// Sink that records calls and returns a fixed result.
struct MockSink {
    result: Result<(), IndexError>,
    calls: StdMutex<Vec<Vec<Event>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    entered: Notify,
    gate: Option<Notify>,
}

impl MockSink {
    fn new(result: Result<(), IndexError>) -> Self {
        Self {
            result,
            calls: StdMutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
            entered: Notify::new(),
            gate: None,
        }
    }

    fn ok() -> Self {
        Self::new(Ok(()))
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Block every `index` call until `gate.notify_one()`.
    fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    fn indexed_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|event| event.id.clone())
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn index(&self, events: &[Event]) -> Result<(), IndexError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(events.to_vec());
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Acknowledger that counts calls and wakes the test.
#[derive(Clone)]
struct AckProbe {
    count: Arc<AtomicUsize>,
    notify: Arc<Notify>,
    fail: bool,
}

impl AckProbe {
    fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn unit(&self, event: Event) -> UnitOfWork {
        UnitOfWork::new(event, Acknowledgement::new(self.clone()))
    }
}

#[async_trait]
impl Acknowledge for AckProbe {
    async fn acknowledge(&self) -> Result<(), SourceError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
        if self.fail {
            Err(SourceError::acknowledge("commit failed"))
        } else {
            Ok(())
        }
    }
}

/// Feed `units` to a fresh orchestrator, close the stream and wait for it.
async fn run_to_completion(sink: Arc<MockSink>, units: Vec<UnitOfWork>, workers: usize) {
    let (source, unit_tx, _error_tx) = ChannelSource::new();
    let orchestrator = Orchestrator::new(source, sink, workers);

    for unit in units {
        unit_tx.send(unit).await.unwrap();
    }
    drop(unit_tx);

    timeout(WAIT, orchestrator.run())
        .await
        .expect("orchestrator should stop once the stream closes")
        .unwrap();
}

#[tokio::test]
async fn test_success_event_indexed_and_acknowledged() {
    let sink = Arc::new(MockSink::ok());
    let ack = AckProbe::new();

    run_to_completion(sink.clone(), vec![ack.unit(Event::new("a", 200))], 1).await;

    assert_eq!(sink.call_count(), 1);
    assert_eq!(sink.calls.lock().unwrap()[0].len(), 1);
    assert_eq!(sink.indexed_ids(), vec!["a".to_string()]);
    assert_eq!(ack.count(), 1);
}

#[tokio::test]
async fn test_zero_status_is_indexed() {
    let sink = Arc::new(MockSink::ok());
    let ack = AckProbe::new();

    run_to_completion(sink.clone(), vec![ack.unit(Event::new("zero", 0))], 1).await;

    assert_eq!(sink.indexed_ids(), vec!["zero".to_string()]);
    assert_eq!(ack.count(), 1);
}

#[tokio::test]
async fn test_client_error_acknowledged_not_indexed() {
    let sink = Arc::new(MockSink::ok());
    let ack = AckProbe::new();

    run_to_completion(sink.clone(), vec![ack.unit(Event::new("b", 404))], 1).await;

    assert_eq!(sink.call_count(), 0);
    assert_eq!(ack.count(), 1);
}

#[tokio::test]
async fn test_server_error_and_unknown_acknowledged_not_indexed() {
    let sink = Arc::new(MockSink::ok());
    let acks: Vec<AckProbe> = (0..4).map(|_| AckProbe::new()).collect();
    let units = vec![
        acks[0].unit(Event::new("s", 503)),
        acks[1].unit(Event::new("u1", 302)),
        acks[2].unit(Event::new("u2", -7)),
        acks[3].unit(Event::new("u3", 700)),
    ];

    run_to_completion(sink.clone(), units, 2).await;

    assert_eq!(sink.call_count(), 0);
    for ack in &acks {
        assert_eq!(ack.count(), 1);
    }
}

#[tokio::test]
async fn test_sink_failure_is_never_acknowledged() {
    let errors = [
        IndexError::throttled("429"),
        IndexError::unavailable("503"),
        IndexError::rejected("400"),
        IndexError::conflict("409"),
    ];

    for error in errors {
        let sink = Arc::new(MockSink::new(Err(error.clone())));
        let ack = AckProbe::new();

        run_to_completion(sink.clone(), vec![ack.unit(Event::new("c", 200))], 1).await;

        assert_eq!(sink.call_count(), 1, "{:?}", error);
        assert_eq!(ack.count(), 0, "{:?} must not acknowledge", error);
    }
}

#[tokio::test]
async fn test_process_unit_outcomes() {
    let ok_sink = MockSink::ok();
    let failing_sink = MockSink::new(Err(IndexError::unavailable("down")));
    let ack = AckProbe::new();

    assert_eq!(
        process_unit(&ok_sink, ack.unit(Event::new("a", 201)), 0).await,
        UnitOutcome::Indexed
    );
    assert_eq!(
        process_unit(&ok_sink, ack.unit(Event::new("b", 422)), 0).await,
        UnitOutcome::Dropped
    );
    assert_eq!(
        process_unit(&failing_sink, ack.unit(Event::new("c", 200)), 0).await,
        UnitOutcome::Deferred(IndexError::unavailable("down"))
    );
    assert_eq!(ack.count(), 2);
}

#[tokio::test]
async fn test_acknowledge_failure_does_not_stop_processing() {
    let sink = Arc::new(MockSink::ok());
    let failing = AckProbe::failing();
    let healthy = AckProbe::new();
    let units = vec![
        failing.unit(Event::new("first", 200)),
        healthy.unit(Event::new("second", 200)),
    ];

    run_to_completion(sink.clone(), units, 1).await;

    assert_eq!(failing.count(), 1);
    assert_eq!(healthy.count(), 1);
    assert_eq!(sink.call_count(), 2);
}

#[tokio::test]
async fn test_single_worker_is_sequential_and_ordered() {
    let sink = Arc::new(MockSink::ok().with_delay(Duration::from_millis(5)));
    let ack = AckProbe::new();
    let units = (0..5)
        .map(|i| ack.unit(Event::new(format!("e{}", i), 200)))
        .collect();

    run_to_completion(sink.clone(), units, 1).await;

    assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(sink.indexed_ids(), vec!["e0", "e1", "e2", "e3", "e4"]);
    assert_eq!(ack.count(), 5);
}

#[tokio::test]
async fn test_zero_workers_behaves_as_one() {
    let (source, _unit_tx, _error_tx) = ChannelSource::new();
    let orchestrator = Orchestrator::new(source, Arc::new(MockSink::ok()), 0);
    assert_eq!(orchestrator.worker_count(), 1);

    let sink = Arc::new(MockSink::ok().with_delay(Duration::from_millis(5)));
    let ack = AckProbe::new();
    let units = (0..3)
        .map(|i| ack.unit(Event::new(format!("z{}", i), 200)))
        .collect();

    run_to_completion(sink.clone(), units, 0).await;

    assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(ack.count(), 3);
}

#[tokio::test]
async fn test_many_workers_process_every_unit() {
    let sink = Arc::new(MockSink::ok().with_delay(Duration::from_millis(2)));
    let ack = AckProbe::new();
    let units = (0..12)
        .map(|i| ack.unit(Event::new(format!("m{}", i), 200)))
        .collect();

    run_to_completion(sink.clone(), units, 4).await;

    let mut ids = sink.indexed_ids();
    ids.sort();
    assert_eq!(ids.len(), 12);
    assert_eq!(ack.count(), 12);
}

#[tokio::test]
async fn test_source_errors_are_drained() {
    let (source, unit_tx, error_tx) = ChannelSource::new();
    let sink = Arc::new(MockSink::ok());
    let orchestrator = Orchestrator::new(source, sink.clone(), 1);
    let ack = AckProbe::new();

    error_tx.send(SourceError::kafka("broker down")).await.unwrap();
    error_tx.send(SourceError::decode("bad json")).await.unwrap();
    unit_tx.send(ack.unit(Event::new("after-error", 200))).await.unwrap();
    drop(unit_tx);

    timeout(WAIT, orchestrator.run()).await.unwrap().unwrap();

    assert_eq!(ack.count(), 1);
    assert_eq!(sink.indexed_ids(), vec!["after-error".to_string()]);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_sink_call() {
    let (source, unit_tx, _error_tx) = ChannelSource::new();
    let sink = Arc::new(MockSink::ok().gated());
    let orchestrator = Arc::new(Orchestrator::new(source, sink.clone(), 2));
    let ack = AckProbe::new();

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run().await })
    };

    unit_tx.send(ack.unit(Event::new("slow", 200))).await.unwrap();
    timeout(WAIT, sink.entered.notified())
        .await
        .expect("sink call should start");

    orchestrator.shutdown();

    // The pool must not report stopped while the sink call is outstanding.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!runner.is_finished());
    assert_eq!(ack.count(), 0);

    sink.gate.as_ref().unwrap().notify_one();

    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
    assert_eq!(ack.count(), 1);
}

#[tokio::test]
async fn test_shutdown_stops_dispatch_of_queued_units() {
    let (source, unit_tx, _error_tx) = ChannelSource::new();
    let sink = Arc::new(MockSink::ok());
    let orchestrator = Orchestrator::new(source, sink.clone(), 2);
    let ack = AckProbe::new();

    orchestrator.shutdown();
    unit_tx.send(ack.unit(Event::new("late", 200))).await.unwrap();

    // The stream stays open; only the stop signal can end the run.
    timeout(WAIT, orchestrator.run()).await.unwrap().unwrap();

    assert_eq!(sink.call_count(), 0);
    assert_eq!(ack.count(), 0);
}

#[tokio::test]
async fn test_shutdown_handle_stops_idle_pool() {
    let (source, _unit_tx, _error_tx) = ChannelSource::new();
    let orchestrator = Arc::new(Orchestrator::new(source, Arc::new(MockSink::ok()), 3));
    let handle = orchestrator.shutdown_handle();

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.shutdown();

    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_run_twice_is_rejected() {
    let (source, unit_tx, _error_tx) = ChannelSource::new();
    let orchestrator = Orchestrator::new(source, Arc::new(MockSink::ok()), 1);
    drop(unit_tx);

    timeout(WAIT, orchestrator.run()).await.unwrap().unwrap();

    assert!(matches!(
        orchestrator.run().await,
        Err(PipelineError::AlreadyStarted)
    ));
}
