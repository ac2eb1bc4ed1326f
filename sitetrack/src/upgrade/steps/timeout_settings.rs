use serde_json::Value;

use crate::settings::{ConfigStore, RawRecord, DEFAULT_TIMEOUT_SECONDS};
use crate::upgrade::error::UpgradeResult;
use crate::upgrade::step::{StepOutcome, UpgradeStep};

/// Introduces the visit timeout override, switched off at the default duration
pub struct TimeoutSettings;

impl UpgradeStep for TimeoutSettings {
    fn milestone(&self) -> &'static str {
        "1.4.2"
    }

    fn apply(&self, record: &mut RawRecord, _store: &ConfigStore) -> UpgradeResult<StepOutcome> {
        record.insert("use_timeout".to_string(), Value::Bool(false));
        record.insert("timeout".to_string(), Value::from(DEFAULT_TIMEOUT_SECONDS));
        Ok(StepOutcome::default())
    }
}
