//! Run notification delivery.
//!
//! One `Notifier` carries run notifications for a deployment; the
//! transport (HTTP call to the reduction API, or a message published to
//! the broker) is selected by configuration, never both for one event.

mod http;
mod queue;
mod types;

pub use http::ReductionApiNotifier;
pub use queue::{QueueNotifier, RunNotification};
pub use types::{DeliveryError, Notifier};

use std::sync::Arc;

use crate::config::{Config, ConfigError, Transport};

/// Build the notifier selected by `delivery.transport`.
pub fn create_notifier(config: &Config) -> Result<Arc<dyn Notifier>, ConfigError> {
    match config.delivery.transport {
        Transport::Http => {
            let api = config.api.clone().ok_or_else(|| {
                ConfigError::ValidationError("missing [api] section for http transport".to_string())
            })?;
            Ok(Arc::new(ReductionApiNotifier::new(api)))
        }
        Transport::Queue => {
            let broker = config.broker.clone().ok_or_else(|| {
                ConfigError::ValidationError(
                    "missing [broker] section for queue transport".to_string(),
                )
            })?;
            Ok(Arc::new(QueueNotifier::new(broker)))
        }
    }
}
