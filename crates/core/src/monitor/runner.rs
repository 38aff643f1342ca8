//! Detect-and-deliver cycle execution.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::delta::RunRange;
use crate::notify::Notifier;
use crate::status::read_status;
use crate::store::{InstrumentRecord, StoreError, WatermarkStore};

use super::types::{BatchSummary, CycleError};

/// Runs one instrument's cycle: read status, compute the delta, deliver.
pub struct InstrumentMonitor {
    notifier: Arc<dyn Notifier>,
}

impl InstrumentMonitor {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Execute one cycle and return the watermark to persist.
    ///
    /// The returned value is `record.last_known_run` unchanged when there
    /// is nothing new (the common idle case, which must not touch the
    /// network), or the instrument's current run after a successful
    /// delivery. Any failure propagates with the watermark untouched;
    /// there is no partial advance.
    pub async fn run_cycle(&self, record: &InstrumentRecord) -> Result<u64, CycleError> {
        let status = read_status(&record.status_file_path)?;

        let Some(range) = RunRange::between(record.last_known_run, status.current_run) else {
            debug!(
                "No new runs for {} (current {})",
                record.instrument_name, status.current_run
            );
            return Ok(record.last_known_run);
        };

        info!(
            "Submitting runs {} for {} via {}",
            range,
            record.instrument_name,
            self.notifier.name()
        );
        self.notifier.notify(record, &range).await?;
        Ok(status.current_run)
    }
}

/// Drives a full batch invocation over the watermark store.
pub struct BatchDriver {
    monitor: InstrumentMonitor,
    lock_timeout: Duration,
}

impl BatchDriver {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            monitor: InstrumentMonitor::new(notifier),
            lock_timeout: Duration::from_millis(1000),
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Run one batch over every instrument in the store.
    ///
    /// Holds the store lock for the whole invocation. A cycle failure on
    /// one instrument is logged and skipped; the rest still run and the
    /// full record set (advanced and unchanged rows alike, in original
    /// order) is rewritten at the end. A lock timeout aborts before any
    /// mutation; the in-progress invocation is treated as authoritative.
    pub async fn run(&self, store: &WatermarkStore) -> Result<BatchSummary, StoreError> {
        let _guard = store.lock(self.lock_timeout).await?;

        let mut records = store.load()?;
        let mut summary = BatchSummary::default();

        for record in &mut records {
            summary.processed += 1;
            match self.monitor.run_cycle(record).await {
                Ok(watermark) => {
                    if watermark > record.last_known_run {
                        summary.advanced += 1;
                    }
                    record.last_known_run = watermark;
                }
                Err(e) => {
                    error!("Skipping {} this cycle: {}", record.instrument_name, e);
                    summary.failed += 1;
                }
            }
        }

        store.save(&records)?;
        info!("Batch complete: {}", summary);
        Ok(summary)
    }
}
