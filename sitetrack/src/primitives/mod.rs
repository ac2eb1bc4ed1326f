/// Process-level configuration supplied by the host.
pub mod config;

/// Host-forwarded logging.
pub mod logger;

/// Named option storage implemented by the host.
pub mod option_store;

pub use config::PluginConfig;
pub use option_store::{OptionStore, OptionStoreError};
