//! Publisher that writes snapshots to the log

use async_trait::async_trait;

use super::Publisher;
use crate::error::TallyResult;
use crate::meter::{MeterSnapshot, MeterValue, RegistrySnapshot};

/// Logs one `info` line per meter.
///
/// Useful during development and as a reference for backend publishers.
#[derive(Debug, Clone)]
pub struct LoggingPublisher {
    name: String,
    skip_empty: bool,
}

impl LoggingPublisher {
    pub fn new() -> Self {
        Self {
            name: "logging".to_string(),
            skip_empty: true,
        }
    }

    /// Also log meters that have recorded nothing
    pub fn with_empty_meters(mut self) -> Self {
        self.skip_empty = false;
        self
    }

    /// Render one meter as a single line, or `None` if it should be skipped
    pub fn render(&self, meter: &MeterSnapshot) -> Option<String> {
        let id = &meter.id;
        let line = match &meter.value {
            MeterValue::Counter { count } => {
                if self.skip_empty && *count == 0.0 {
                    return None;
                }
                format!("{id} count={count}")
            }
            MeterValue::Gauge { value } => match value {
                Some(value) => format!("{id} value={value}"),
                None if self.skip_empty => return None,
                None => format!("{id} value=none"),
            },
            MeterValue::Timer(timer) => {
                if self.skip_empty && timer.count() == 0 {
                    return None;
                }
                let unit = timer.base_unit;
                format!(
                    "{id} count={} total={:.3} mean={:.3} max={:.3} unit={unit}",
                    timer.count(),
                    timer.total_time(unit),
                    timer.mean(unit),
                    timer.max(unit),
                )
            }
            MeterValue::DistributionSummary(summary) => {
                if self.skip_empty && summary.count == 0 {
                    return None;
                }
                let mut line = format!(
                    "{id} count={} total={} mean={} max={}",
                    summary.count,
                    summary.total,
                    summary.mean(),
                    summary.max,
                );
                if let Some(unit) = id.base_unit() {
                    line.push_str(&format!(" unit={unit}"));
                }
                line
            }
            MeterValue::LongTaskTimer(ltt) => {
                if self.skip_empty && ltt.active_tasks == 0 {
                    return None;
                }
                let unit = ltt.base_unit;
                format!(
                    "{id} active={} duration={:.3} longest={:.3} unit={unit}",
                    ltt.active_tasks,
                    ltt.active_duration(unit),
                    ltt.longest_active(unit),
                )
            }
        };
        Some(line)
    }
}

impl Default for LoggingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for LoggingPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, snapshot: &RegistrySnapshot) -> TallyResult<()> {
        for meter in &snapshot.meters {
            if let Some(line) = self.render(meter) {
                tracing::info!(timestamp = %snapshot.timestamp, "{line}");
            }
        }
        Ok(())
    }
}
