//! The settings record: schema, defaults and persistence.

mod configuration;
mod defaults;
mod error;
mod store;

pub use configuration::{
    AnalyticsTab, Configuration, RunStatus, DEFAULT_DATE_FORMAT, DEFAULT_LIMIT,
    DEFAULT_TIMEOUT_SECONDS,
};
pub use defaults::{
    default_configuration, defaults_with_registry, domain_from_host, effective_track_as,
};
pub use error::ConfigStoreError;
pub use store::{ConfigStore, RawRecord};
