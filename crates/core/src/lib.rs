pub mod broker;
pub mod config;
pub mod delta;
pub mod monitor;
pub mod notify;
pub mod status;
pub mod store;
pub mod testing;

pub use broker::{
    connect_action, BrokerClient, BrokerError, ConnectAction, Frame, MessageListener, SendOptions,
};
pub use config::{
    load_config, load_config_from_str, validate_config, ApiConfig, ApiProfile, BrokerConfig,
    Config, ConfigError, DeliveryConfig, StoreConfig, Transport,
};
pub use delta::RunRange;
pub use monitor::{BatchDriver, BatchSummary, CycleError, InstrumentMonitor};
pub use notify::{
    create_notifier, DeliveryError, Notifier, QueueNotifier, ReductionApiNotifier, RunNotification,
};
pub use status::{read_status, StatusError, StatusReading};
pub use store::{InstrumentRecord, StoreError, StoreLockGuard, WatermarkStore};
