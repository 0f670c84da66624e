//! Publisher contract and the periodic publish loop
//!
//! Backends implement [`Publisher`]. The core never retries or buffers on a
//! publisher's behalf: a failed publish is logged and the next step simply
//! publishes a fresh snapshot.

mod logging;


pub use logging::LoggingPublisher;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{TallyError, TallyResult};
use crate::meter::RegistrySnapshot;
use crate::registry::MeterRegistry;

/// Sink for registry snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Ship one snapshot to the backend
    async fn publish(&self, snapshot: &RegistrySnapshot) -> TallyResult<()>;
}

/// Periodically snapshots a registry and hands the snapshot to every publisher
pub struct PublishLoop {
    registry: Arc<MeterRegistry>,
    publishers: Vec<Arc<dyn Publisher>>,
    step: Duration,
}

impl PublishLoop {
    /// Create a loop publishing every `publish_step` of the registry config
    pub fn new(registry: Arc<MeterRegistry>) -> Self {
        let step = registry.config().publish_step;
        Self {
            registry,
            publishers: Vec::new(),
            step,
        }
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Publish one snapshot to every publisher; returns the failures
    pub async fn publish_once(&self) -> Vec<TallyError> {
        let snapshot = self.registry.snapshot();
        let mut failures = Vec::new();
        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(&snapshot).await {
                tracing::warn!(
                    publisher = publisher.name(),
                    meters = snapshot.len(),
                    error = %e,
                    "publish failed"
                );
                failures.push(e);
            }
        }
        failures
    }

    /// Publish every step until `cancel` fires, then publish one last time
    pub async fn run(self, cancel: CancellationToken) {
        // `interval` panics on a zero period
        let period = self.step.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        tracing::debug!(
            step = ?self.step,
            publishers = self.publishers.len(),
            "publish loop started"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.publish_once().await;
                }
            }
        }

        self.publish_once().await;
        tracing::debug!("publish loop stopped");
    }

    /// Run on the current tokio runtime
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
