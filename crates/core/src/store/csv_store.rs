//! CSV-backed watermark store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::lock::{self, StoreLockGuard};
use super::types::{InstrumentRecord, StoreError};

/// Handle to the on-disk record set.
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all instrument records, preserving file order.
    pub fn load(&self) -> Result<Vec<InstrumentRecord>, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotFound(self.path.clone()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: InstrumentRecord = row?;
            records.push(record);
        }
        debug!("Loaded {} instrument records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Rewrite the full record set in the given order.
    ///
    /// Always writes every row, including instruments whose watermark did
    /// not advance this invocation, so the file remains authoritative.
    pub fn save(&self, records: &[InstrumentRecord]) -> Result<(), StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("Wrote {} instrument records to {:?}", records.len(), self.path);
        Ok(())
    }

    /// Acquire the store's cross-process lock, waiting at most `timeout`.
    pub async fn lock(&self, timeout: Duration) -> Result<StoreLockGuard, StoreError> {
        lock::acquire(&self.path, timeout).await
    }
}
