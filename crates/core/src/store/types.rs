//! Types for the watermark store.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur reading, writing or locking the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Watermark store not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read watermark store: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write watermark store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open lock file {path}: {source}")]
    LockFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Timed out acquiring lock on {0}; another invocation may be running")]
    LockTimeout(PathBuf),
}

/// One row of the watermark store.
///
/// `last_known_run` is the only field the batch ever mutates; everything
/// else is opaque per-instrument configuration carried through rewrites
/// verbatim. Row order in the file is stable across invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub instrument_name: String,
    pub last_known_run: u64,
    pub status_file_path: PathBuf,
    pub summary_file_path: PathBuf,
    pub data_directory: PathBuf,
    pub file_extension: String,
}
