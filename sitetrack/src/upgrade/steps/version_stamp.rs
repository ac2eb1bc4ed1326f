use crate::settings::{ConfigStore, RawRecord};
use crate::upgrade::error::UpgradeResult;
use crate::upgrade::step::{StepOutcome, UpgradeStep};

/// A milestone that changes nothing but the stored version
pub struct VersionStamp {
    milestone: &'static str,
}

impl VersionStamp {
    /// A bump-only step to `milestone`
    #[must_use]
    pub const fn new(milestone: &'static str) -> Self {
        Self { milestone }
    }
}

impl UpgradeStep for VersionStamp {
    fn milestone(&self) -> &'static str {
        self.milestone
    }

    fn apply(&self, _record: &mut RawRecord, _store: &ConfigStore) -> UpgradeResult<StepOutcome> {
        Ok(StepOutcome::default())
    }
}
