//! HTTP notifier posting run ranges to the reduction service API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::delta::RunRange;
use crate::store::InstrumentRecord;

use super::types::{DeliveryError, Notifier};

/// Notifies the reduction service of new runs with a single POST per
/// instrument cycle, covering the whole range.
pub struct ReductionApiNotifier {
    client: Client,
    config: ApiConfig,
}

impl ReductionApiNotifier {
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Target URL: `<base>/<instrument>/<start_run>/<end_run>`.
    fn submit_url(&self, instrument: &str, range: &RunRange) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.base_url().trim_end_matches('/'),
            instrument,
            range.start_run,
            range.end_run_exclusive
        )
    }
}

#[async_trait]
impl Notifier for ReductionApiNotifier {
    fn name(&self) -> &str {
        "reduction-api"
    }

    async fn notify(
        &self,
        record: &InstrumentRecord,
        range: &RunRange,
    ) -> Result<(), DeliveryError> {
        let url = self.submit_url(&record.instrument_name, range);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Token {}", self.config.token))
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else if e.is_connect() {
                    DeliveryError::ConnectionFailed(e.to_string())
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        // Only transport-level failures count as delivery failures; an
        // HTTP error status is the reduction service's business and is
        // surfaced in the logs for operators.
        info!(
            "Reduction API responded {} for {} runs {}",
            response.status(),
            record.instrument_name,
            range
        );
        Ok(())
    }
}
