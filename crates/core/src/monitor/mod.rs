//! Run monitoring orchestration.
//!
//! `InstrumentMonitor` executes one detect-and-deliver cycle for a single
//! instrument; `BatchDriver` runs every configured instrument under the
//! store lock and rewrites the record set.

mod runner;
mod types;

pub use runner::{BatchDriver, InstrumentMonitor};
pub use types::{BatchSummary, CycleError};
