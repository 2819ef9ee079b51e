//! Downstream sinks for decoded batches.
//!
//! The daemon drains the receiver's batch channel into one of these
//! sinks. They are intentionally small: real deployments replace them
//! with a forwarder into the rest of the pipeline. The sink kind is
//! chosen once from config and dispatched through the [`Sink`] enum.

use metrics::counter;
use tracing::{debug, info};

use sawmill_core::error::{PipelineError, SawmillError};
use sawmill_core::event::BatchEvent;
use sawmill_core::metrics::{SINK_BATCHES_DELIVERED_TOTAL, SINK_MESSAGES_DELIVERED_TOTAL};
use sawmill_core::pipeline::BatchSink;

/// Prints every decoded message to stdout as one JSON line.
#[derive(Debug, Default)]
pub struct StdOutSink {
    delivered: u64,
}

impl StdOutSink {
    /// Create a new stdout sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl BatchSink for StdOutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn deliver(&mut self, event: BatchEvent) -> Result<(), SawmillError> {
        for message in &event.batch.messages {
            let line = serde_json::to_string(message)
                .map_err(|e| PipelineError::Sink(e.to_string()))?;
            println!("{line}");
        }
        record_delivery(&event);
        self.delivered += 1;
        Ok(())
    }
}

/// Counts and drops batches. Useful for load testing the receiver.
#[derive(Debug, Default)]
pub struct NullSink {
    delivered: u64,
    messages: u64,
}

impl NullSink {
    /// Create a new null sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches dropped so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Number of messages dropped so far.
    pub fn messages(&self) -> u64 {
        self.messages
    }
}

impl BatchSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    async fn deliver(&mut self, event: BatchEvent) -> Result<(), SawmillError> {
        debug!(
            batch = %event.batch,
            from = %event.received_from,
            "dropping batch (null sink)"
        );
        record_delivery(&event);
        self.delivered += 1;
        self.messages += event.batch.len() as u64;
        Ok(())
    }
}

fn record_delivery(event: &BatchEvent) {
    counter!(SINK_BATCHES_DELIVERED_TOTAL).increment(1);
    counter!(SINK_MESSAGES_DELIVERED_TOTAL).increment(event.batch.len() as u64);
}

/// Sink selected once at startup from `[sink] kind`.
#[derive(Debug)]
pub enum Sink {
    /// JSON lines to stdout.
    StdOut(StdOutSink),
    /// Count and drop.
    Null(NullSink),
}

impl Sink {
    /// Build a sink from the configured kind string.
    pub fn from_kind(kind: &str) -> Result<Self, SawmillError> {
        match kind {
            "stdout" => Ok(Self::StdOut(StdOutSink::new())),
            "null" => Ok(Self::Null(NullSink::new())),
            other => Err(PipelineError::InitFailed(format!("unknown sink kind: {other}")).into()),
        }
    }

    /// Sink name for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::StdOut(sink) => sink.name(),
            Self::Null(sink) => sink.name(),
        }
    }

    /// Deliver one batch event to the underlying sink.
    pub async fn deliver(&mut self, event: BatchEvent) -> Result<(), SawmillError> {
        match self {
            Self::StdOut(sink) => sink.deliver(event).await,
            Self::Null(sink) => sink.deliver(event).await,
        }
    }

    /// Drain the batch channel until it closes.
    ///
    /// Runs as the daemon's delivery task. Sink errors are logged and
    /// the loop continues; losing one batch must not stop delivery.
    pub async fn run(
        &mut self,
        mut batch_rx: tokio::sync::mpsc::Receiver<BatchEvent>,
    ) {
        info!(sink = self.name(), "sink task started");
        while let Some(event) = batch_rx.recv().await {
            if let Err(e) = self.deliver(event).await {
                tracing::error!(sink = self.name(), error = %e, "failed to deliver batch");
            }
        }
        info!(sink = self.name(), "batch channel closed, sink task exiting");
    }
}
