//! Testing utilities and mock implementations.
//!
//! Provides a mock delivery transport so batch behavior can be tested
//! without a reachable reduction API or broker.

mod mock_notifier;

pub use mock_notifier::{MockNotifier, RecordedNotification};
