use serde_json::Value;

use crate::settings::{ConfigStore, RawRecord};
use crate::upgrade::error::UpgradeResult;
use crate::upgrade::step::{StepOutcome, UpgradeStep};

/// Introduces the event forwarding master switch, on
pub struct EventProcessing;

impl UpgradeStep for EventProcessing {
    fn milestone(&self) -> &'static str {
        "1.4.3"
    }

    fn apply(&self, record: &mut RawRecord, _store: &ConfigStore) -> UpgradeResult<StepOutcome> {
        record.insert("process_event".to_string(), Value::Bool(true));
        Ok(StepOutcome::default())
    }
}
