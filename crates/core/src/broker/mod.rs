//! Message broker client.
//!
//! A thin STOMP-style client used by the queue delivery transport: one
//! long-lived connection per process, lazily established and reused
//! across sends, with an explicit Disconnected/Connected state instead of
//! implicit null-checks. Reconnection is decided by a pure function of
//! the current state and a liveness probe.

pub mod frame;

mod client;
mod types;

pub use client::{connect_action, BrokerClient, ConnectAction};
pub use frame::Frame;
pub use types::{BrokerError, MessageListener, SendOptions};
