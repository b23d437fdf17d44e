//! Kafka event source implementation.
//!
//! Consumes JSON events from a Kafka topic and hands them to the pipeline as
//! units of work. Offsets are committed manually, one acknowledgment at a
//! time, through the [`OffsetTracker`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::{
    client::ClientContext,
    config::ClientConfig,
    consumer::{CommitMode, Consumer, ConsumerContext, StreamConsumer},
    error::KafkaResult,
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::consumer::messages::{Acknowledge, Acknowledgement, SourceStreams, UnitOfWork};
use crate::consumer::offsets::OffsetTracker;
use crate::consumer::EventSource;
use crate::errors::{PipelineError, SourceError};
use crate::shutdown::ShutdownSignal;
use event_indexer_shared::Event;

/// Capacity of the error side channel. Errors beyond it are only logged.
const ERROR_CHANNEL_SIZE: usize = 64;

/// Consumer context that logs commit failures the broker reports later.
///
/// Commits are issued with [`CommitMode::Async`], so a failure after the
/// request was queued only surfaces here. The affected records are
/// redelivered after a restart or rebalance.
struct CommitLoggingContext;

impl ClientContext for CommitLoggingContext {}

impl ConsumerContext for CommitLoggingContext {
    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        if let Err(e) = result {
            warn!(
                error = %e,
                partitions = offsets.count(),
                "Offset commit failed, records will be redelivered"
            );
        }
    }
}

type IndexerConsumer = StreamConsumer<CommitLoggingContext>;

/// Settings for [`KafkaEventSource`].
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    /// Broker addresses.
    pub brokers: Vec<String>,
    /// Topic to consume.
    pub topic: String,
    /// Consumer group ID.
    pub group_id: String,
    /// Size of the unit-of-work channel buffer.
    pub channel_buffer_size: usize,
}

impl KafkaConsumerConfig {
    /// Create a config with the default channel buffer size.
    pub fn new(brokers: Vec<String>, topic: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            brokers,
            topic: topic.into(),
            group_id: group_id.into(),
            channel_buffer_size: 100,
        }
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.brokers.iter().all(|broker| broker.trim().is_empty()) {
            return Err(PipelineError::config("brokers must not be empty"));
        }
        if self.topic.trim().is_empty() {
            return Err(PipelineError::config("topic must not be empty"));
        }
        if self.group_id.trim().is_empty() {
            return Err(PipelineError::config("group id must not be empty"));
        }
        Ok(())
    }
}

/// Kafka-backed event source.
pub struct KafkaEventSource {
    consumer: Arc<IndexerConsumer>,
    offsets: Arc<OffsetTracker>,
    config: KafkaConsumerConfig,
    started: AtomicBool,
}

impl KafkaEventSource {
    /// Create a new Kafka event source with manual offset commits.
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaEventSource)` - A new source instance
    /// * `Err(PipelineError)` - If the config is invalid or consumer creation fails
    pub fn new(config: KafkaConsumerConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let brokers = config.brokers.join(",");
        let consumer: IndexerConsumer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create_with_context(CommitLoggingContext)?;

        info!(
            brokers = %brokers,
            topic = %config.topic,
            group_id = %config.group_id,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            offsets: Arc::new(OffsetTracker::new()),
            config,
            started: AtomicBool::new(false),
        })
    }

    /// Subscribe to the configured topic.
    pub fn subscribe(&self) -> Result<(), PipelineError> {
        self.consumer.subscribe(&[self.config.topic.as_str()])?;

        info!(topic = %self.config.topic, "Subscribed to Kafka topic");
        Ok(())
    }
}

impl EventSource for KafkaEventSource {
    fn consume(&self, shutdown: ShutdownSignal) -> SourceStreams {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Kafka source is already being consumed");
            return SourceStreams::closed();
        }

        let (unit_tx, unit_rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_SIZE);

        let reader = StreamReader {
            consumer: self.consumer.clone(),
            offsets: self.offsets.clone(),
            units: unit_tx,
            errors: error_tx,
        };
        tokio::spawn(reader.run(shutdown));

        SourceStreams {
            units: unit_rx,
            errors: error_rx,
        }
    }
}

/// Background task that turns Kafka records into units of work.
///
/// Dropping it closes both output channels.
struct StreamReader {
    consumer: Arc<IndexerConsumer>,
    offsets: Arc<OffsetTracker>,
    units: mpsc::Sender<UnitOfWork>,
    errors: mpsc::Sender<SourceError>,
}

impl StreamReader {
    async fn run(self, mut shutdown: ShutdownSignal) {
        let mut message_stream = self.consumer.stream();

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("Consumer received shutdown signal");
                    break;
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            if !self.forward(&msg, &mut shutdown).await {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            report(&self.errors, SourceError::kafka(e.to_string()));
                        }
                        None => {
                            info!("Kafka stream ended");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Forward one record. Returns `false` once the pipeline stops listening.
    async fn forward(&self, msg: &BorrowedMessage<'_>, shutdown: &mut ShutdownSignal) -> bool {
        let topic = msg.topic();
        let partition = msg.partition();
        let offset = msg.offset();

        debug!(topic = %topic, partition = partition, offset = offset, "Received message");

        let admission = admit_record(
            &self.offsets,
            &self.errors,
            topic,
            partition,
            offset,
            msg.payload(),
        );
        let event = match admission {
            Admission::Deliver(event) => event,
            Admission::Released(position) => {
                if let Some(position) = position {
                    if let Err(e) = commit_position(&self.consumer, topic, partition, position) {
                        report(&self.errors, e);
                    }
                }
                return true;
            }
        };

        let ack = KafkaAcknowledgement {
            consumer: self.consumer.clone(),
            offsets: self.offsets.clone(),
            topic: topic.to_string(),
            partition,
            offset,
        };
        let unit = UnitOfWork::new(event, Acknowledgement::new(ack));

        tokio::select! {
            _ = shutdown.triggered() => false,
            sent = self.units.send(unit) => sent.is_ok(),
        }
    }
}

/// What the reader does with one record.
#[derive(Debug)]
enum Admission {
    /// Hand the event to a worker.
    Deliver(Event),
    /// The record never reaches a worker and its offset is already
    /// complete. Carries the position to commit when it advanced.
    Released(Option<i64>),
}

/// Track a record's offset and decide whether it reaches a worker.
///
/// Empty and undecodable records are released at once so they cannot hold
/// back their partition; decode failures are also reported on `errors`.
fn admit_record(
    offsets: &OffsetTracker,
    errors: &mpsc::Sender<SourceError>,
    topic: &str,
    partition: i32,
    offset: i64,
    payload: Option<&[u8]>,
) -> Admission {
    offsets.track(topic, partition, offset);

    match decode_event(payload) {
        Ok(Some(event)) => Admission::Deliver(event),
        Ok(None) => {
            debug!(offset = offset, "Skipping message with empty payload");
            Admission::Released(offsets.complete(topic, partition, offset))
        }
        Err(e) => {
            warn!(partition = partition, offset = offset, error = %e, "Skipping undecodable message");
            report(errors, e);
            Admission::Released(offsets.complete(topic, partition, offset))
        }
    }
}

fn report(errors: &mpsc::Sender<SourceError>, err: SourceError) {
    if let Err(e) = errors.try_send(err) {
        debug!(error = %e, "Dropped source error");
    }
}

/// Acknowledges one Kafka record by completing its offset.
struct KafkaAcknowledgement {
    consumer: Arc<IndexerConsumer>,
    offsets: Arc<OffsetTracker>,
    topic: String,
    partition: i32,
    offset: i64,
}

#[async_trait]
impl Acknowledge for KafkaAcknowledgement {
    async fn acknowledge(&self) -> Result<(), SourceError> {
        complete_offset(
            &self.consumer,
            &self.offsets,
            &self.topic,
            self.partition,
            self.offset,
        )
    }
}

/// Mark an offset done and commit the partition's new position, if any.
fn complete_offset(
    consumer: &IndexerConsumer,
    offsets: &OffsetTracker,
    topic: &str,
    partition: i32,
    offset: i64,
) -> Result<(), SourceError> {
    match offsets.complete(topic, partition, offset) {
        Some(position) => commit_position(consumer, topic, partition, position),
        None => {
            debug!(
                topic = %topic,
                partition = partition,
                offset = offset,
                pending = offsets.pending(topic, partition),
                "Commit waits for earlier offsets"
            );
            Ok(())
        }
    }
}

fn commit_position(
    consumer: &IndexerConsumer,
    topic: &str,
    partition: i32,
    position: i64,
) -> Result<(), SourceError> {
    let tpl = commit_list(topic, partition, position)?;

    consumer
        .commit(&tpl, CommitMode::Async)
        .map_err(|e| SourceError::acknowledge(e.to_string()))?;

    debug!(topic = %topic, partition = partition, position = position, "Committed offset");
    Ok(())
}

fn commit_list(topic: &str, partition: i32, position: i64) -> Result<TopicPartitionList, SourceError> {
    let mut tpl = TopicPartitionList::new();
    tpl.add_partition_offset(topic, partition, Offset::Offset(position))
        .map_err(|e| SourceError::acknowledge(e.to_string()))?;
    Ok(tpl)
}

/// Decode a record payload. An absent or empty payload yields `None`.
fn decode_event(payload: Option<&[u8]>) -> Result<Option<Event>, SourceError> {
    match payload {
        None => Ok(None),
        Some(bytes) if bytes.is_empty() => Ok(None),
        Some(bytes) => Event::from_json(bytes)
            .map(Some)
            .map_err(|e| SourceError::decode(e.to_string())),
    }
}
