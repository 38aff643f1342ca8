//! Mock notifier for testing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::delta::RunRange;
use crate::notify::{DeliveryError, Notifier};
use crate::store::InstrumentRecord;

/// A recorded delivery for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    pub instrument: String,
    pub range: RunRange,
}

/// Mock implementation of the `Notifier` trait.
///
/// Records every delivered range and can be armed to fail for chosen
/// instruments, simulating a transport outage on one endpoint while the
/// rest of the batch proceeds.
pub struct MockNotifier {
    calls: Arc<RwLock<Vec<RecordedNotification>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Make every delivery for `instrument` fail with a transport error.
    pub async fn fail_instrument(&self, instrument: &str) {
        self.failing.write().await.insert(instrument.to_string());
    }

    /// All deliveries recorded so far, in order.
    pub async fn recorded(&self) -> Vec<RecordedNotification> {
        self.calls.read().await.clone()
    }

    /// Total number of runs delivered for `instrument`.
    pub async fn delivered_runs(&self, instrument: &str) -> u64 {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.instrument == instrument)
            .map(|call| call.range.len())
            .sum()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn notify(
        &self,
        record: &InstrumentRecord,
        range: &RunRange,
    ) -> Result<(), DeliveryError> {
        if self.failing.read().await.contains(&record.instrument_name) {
            return Err(DeliveryError::Transport(
                "simulated transport failure".to_string(),
            ));
        }
        self.calls.write().await.push(RecordedNotification {
            instrument: record.instrument_name.clone(),
            range: *range,
        });
        Ok(())
    }
}
