//! Queue notifier publishing run-started messages to the broker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broker::{BrokerClient, SendOptions};
use crate::config::BrokerConfig;
use crate::delta::RunRange;
use crate::store::InstrumentRecord;

use super::types::{DeliveryError, Notifier};

const FACILITY: &str = "ISIS";

/// Principal recorded on messages produced by automated ingest.
const AUTOMATED_INGEST_USER: i64 = 0;

/// Run numbers are zero-padded to this width in data file names.
const RUN_NUMBER_WIDTH: usize = 8;

/// Payload published to the processor queue, one message per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunNotification {
    pub rb_number: String,
    pub instrument: String,
    /// Location of the run's data file.
    pub data: String,
    pub run_number: u64,
    pub started_by: i64,
    pub facility: String,
}

/// Notifies the reduction pipeline by publishing one serialized
/// run-started message per new run onto the configured destination.
pub struct QueueNotifier {
    client: BrokerClient,
    config: BrokerConfig,
}

impl QueueNotifier {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            client: BrokerClient::new(config.clone()),
            config,
        }
    }

    pub fn client(&self) -> &BrokerClient {
        &self.client
    }

    fn send_options(&self) -> SendOptions {
        SendOptions {
            persistent: self.config.persistent,
            priority: self.config.priority,
            delay_ms: self.config.delay_ms,
        }
    }
}

/// Location of a run's data file:
/// `<data_directory>/<cycle_folder>/<INSTRUMENT><run><ext>` with the run
/// number zero-padded.
fn data_file_location(record: &InstrumentRecord, cycle_folder: &str, run: u64) -> String {
    record
        .data_directory
        .join(cycle_folder)
        .join(format!(
            "{}{:0width$}{}",
            record.instrument_name,
            run,
            record.file_extension,
            width = RUN_NUMBER_WIDTH
        ))
        .display()
        .to_string()
}

/// RB number of the experiment currently on the instrument: the final
/// token of the last non-empty line of the instrument's summary file.
fn read_rb_number(record: &InstrumentRecord) -> Result<String, DeliveryError> {
    let path = &record.summary_file_path;
    let contents = std::fs::read_to_string(path).map_err(|e| DeliveryError::Summary {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    contents
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.split_whitespace().last())
        .map(str::to_string)
        .ok_or_else(|| DeliveryError::Summary {
            path: path.clone(),
            reason: "no RB number in summary".to_string(),
        })
}

#[async_trait]
impl Notifier for QueueNotifier {
    fn name(&self) -> &str {
        "queue"
    }

    async fn notify(
        &self,
        record: &InstrumentRecord,
        range: &RunRange,
    ) -> Result<(), DeliveryError> {
        let rb_number = read_rb_number(record)?;
        let opts = self.send_options();

        for run in range.runs() {
            let message = RunNotification {
                rb_number: rb_number.clone(),
                instrument: record.instrument_name.clone(),
                data: data_file_location(record, &self.config.cycle_folder, run),
                run_number: run,
                started_by: AUTOMATED_INGEST_USER,
                facility: FACILITY.to_string(),
            };
            let body = serde_json::to_string(&message)
                .map_err(|e| DeliveryError::Transport(e.to_string()))?;
            self.client
                .send(&self.config.destination, &body, &opts)
                .await?;
            debug!("Queued run {} for {}", run, record.instrument_name);
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.disconnect().await;
    }
}
