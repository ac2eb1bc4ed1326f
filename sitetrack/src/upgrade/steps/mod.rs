//! The milestones of the settings record, oldest first.

mod consolidate_legacy_options;
mod event_processing;
mod timeout_settings;
mod version_stamp;

use std::sync::Arc;

pub use consolidate_legacy_options::ConsolidateLegacyOptions;
pub use event_processing::EventProcessing;
pub use timeout_settings::TimeoutSettings;
pub use version_stamp::VersionStamp;

use crate::upgrade::step::UpgradeStep;

/// Every release that changed the record's layout, in ascending milestone order
#[must_use]
pub fn default_steps() -> Vec<Arc<dyn UpgradeStep>> {
    vec![
        Arc::new(ConsolidateLegacyOptions),
        Arc::new(VersionStamp::new("1.4.1.1")),
        Arc::new(TimeoutSettings),
        Arc::new(EventProcessing),
        Arc::new(VersionStamp::new("1.4.3.2")),
    ]
}
