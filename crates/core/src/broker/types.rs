//! Types for broker operations.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur talking to the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Unable to connect to message broker: {0}")]
    ConnectFailed(String),

    #[error("Not connected to message broker")]
    NotConnected,

    #[error("Broker connection lost: {0}")]
    ConnectionLost(String),

    #[error("Malformed frame from broker: {0}")]
    MalformedFrame(String),

    #[error("A listener is already consuming from this connection")]
    ListenerActive,
}

/// Per-send publication options, passed through to the broker as headers.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Ask the broker to persist the message.
    pub persistent: bool,
    /// Message priority.
    pub priority: u8,
    /// Optional broker-side delivery delay in milliseconds.
    pub delay_ms: Option<u64>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            persistent: true,
            priority: 4,
            delay_ms: None,
        }
    }
}

/// Receives messages for subscribed destinations.
///
/// The subscription uses client acks with a prefetch of one, so the next
/// message is not dispatched until `on_message` has returned.
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, destination: &str, body: &str);
}
