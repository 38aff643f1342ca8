//! Types for run notification delivery.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::broker::BrokerError;
use crate::delta::RunRange;
use crate::store::InstrumentRecord;

/// Errors that can occur delivering a run notification.
///
/// Any of these leaves the instrument's watermark unchanged for the
/// cycle; the next scheduled invocation retries the same range.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Failed to read summary file {path}: {reason}")]
    Summary { path: PathBuf, reason: String },
}

/// A delivery transport for new-run notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Deliver notification of every run in `range` for this instrument.
    ///
    /// Must be all-or-nothing from the caller's perspective: an `Err`
    /// means the watermark may not advance, even if some runs in the
    /// range were already sent (the downstream service tolerates
    /// duplicates; it must never miss a run).
    async fn notify(
        &self,
        record: &InstrumentRecord,
        range: &RunRange,
    ) -> Result<(), DeliveryError>;

    /// Release any transport resources (e.g. a held broker connection).
    /// Default is a no-op for connectionless transports.
    async fn shutdown(&self) {}
}
