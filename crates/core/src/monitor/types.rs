//! Types for monitoring cycles.

use thiserror::Error;

use crate::notify::DeliveryError;
use crate::status::StatusError;

/// Why a single instrument's cycle did not advance its watermark.
///
/// Local to one instrument; the batch carries on with the rest.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Per-batch outcome counts, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Instruments processed this invocation.
    pub processed: usize,
    /// Instruments whose watermark advanced.
    pub advanced: usize,
    /// Instruments skipped this cycle due to an error.
    pub failed: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} advanced, {} failed",
            self.processed, self.advanced, self.failed
        )
    }
}
