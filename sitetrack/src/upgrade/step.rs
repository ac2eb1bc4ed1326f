use crate::settings::{ConfigStore, RawRecord};
use crate::upgrade::error::UpgradeResult;

/// What a step did besides patching the record
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Legacy option names (without prefix) to delete once the patched record is persisted
    pub retired_options: Vec<String>,
}

/// One milestone on the upgrade chain.
///
/// A step patches the untyped record in place; the controller stamps the milestone
/// version and persists the result. Steps must be idempotent: running one twice on the
/// same record yields the same record.
pub trait UpgradeStep: Send + Sync {
    /// The version a record has after this step, e.g. `"1.4.2"`
    fn milestone(&self) -> &'static str;

    /// Patches `record`. `store` gives read access to options stored outside the record.
    ///
    /// # Errors
    /// - `UpgradeError::Persistence` if reading a legacy option fails
    /// - `UpgradeError::Json` if an existing field has an unusable shape
    fn apply(&self, record: &mut RawRecord, store: &ConfigStore) -> UpgradeResult<StepOutcome>;
}
