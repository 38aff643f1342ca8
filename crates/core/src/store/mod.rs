//! Watermark store: the per-instrument record set.
//!
//! A flat CSV file holds one row per monitored instrument with the last
//! run number already reported downstream. The file is rewritten in full
//! at the end of each batch invocation; a co-located lock file serializes
//! overlapping invocations across processes.

mod csv_store;
mod lock;
mod types;

pub use csv_store::WatermarkStore;
pub use lock::StoreLockGuard;
pub use types::{InstrumentRecord, StoreError};
