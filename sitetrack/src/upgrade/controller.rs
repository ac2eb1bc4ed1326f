use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::primitives::{OptionStore, PluginConfig};
use crate::settings::{ConfigStore, RawRecord};
use crate::sitetrack_export;
use crate::upgrade::error::{UpgradeError, UpgradeResult};
use crate::upgrade::record_keys::{check_loadable, normalize_record_keys};
use crate::upgrade::step::UpgradeStep;
use crate::upgrade::steps::default_steps;
use crate::version::{PluginVersion, VersionGuard};

/// Result of an upgrade pass
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum UpgradeOutcome {
    /// The stored record already carries the running version
    UpToDate {
        /// The current version
        version: String,
    },
    /// The stored version moved forward
    Advanced {
        /// Stored version before the pass (empty for an unversioned record)
        from: String,
        /// Stored version after the pass
        to: String,
    },
    /// The stored record is not at the running version and nothing was applied
    Pending {
        /// The stored version
        version: String,
    },
    /// No record is stored, so there is nothing to upgrade
    Skipped,
}

struct ScheduledStep {
    guard: VersionGuard,
    milestone: PluginVersion,
    step: Arc<dyn UpgradeStep>,
}

/// Moves the stored settings record along the chain of milestones.
///
/// Each milestone `M` runs for stored versions in `[previous milestone, M)`; the first
/// milestone runs for anything older, including unversioned records. A milestone newer
/// than the running plugin never runs. When the stored version is older than the running
/// one but no milestone covers it, the record is stamped with the running version.
///
/// Every call to [`UpgradeController::upgrade_once`] advances by at most one milestone, so
/// a record several releases behind catches up over successive loads. Record keys of older
/// releases are renamed before every write, and a write that would leave a record the
/// typed schema rejects is refused.
#[derive(uniffi::Object)]
pub struct UpgradeController {
    store: Arc<ConfigStore>,
    schedule: Vec<ScheduledStep>,
}

#[sitetrack_export]
impl UpgradeController {
    /// Creates a controller with the built-in milestones.
    ///
    /// # Errors
    /// - `UpgradeError::Version` if a milestone does not parse
    #[uniffi::constructor]
    pub fn new(
        option_store: Arc<dyn OptionStore>,
        config: Arc<PluginConfig>,
    ) -> Result<Arc<Self>, UpgradeError> {
        let store = Arc::new(ConfigStore::new(option_store, config));
        Self::with_steps(store, default_steps()).map(Arc::new)
    }

    /// Applies at most one milestone to the stored record.
    ///
    /// # Errors
    /// - `UpgradeError::MigrationInconsistency` if the stored version does not parse, is
    ///   newer than the running version, or the upgraded record would not load; the record
    ///   is left untouched
    /// - `UpgradeError::Persistence` if the record cannot be read or written
    /// - `UpgradeError::Json` if a step cannot work with the stored fields
    pub fn upgrade_once(&self) -> Result<UpgradeOutcome, UpgradeError> {
        let Some(mut record) = self.store.read_raw()? else {
            crate::debug!(
                "upgrade.skipped reason=no_record timestamp={}",
                Utc::now().to_rfc3339()
            );
            return Ok(UpgradeOutcome::Skipped);
        };

        let running = self.store.plugin_config().plugin_version();
        let (stored_text, stored) = stored_version(&record);
        let inconsistency = |reason: &str| UpgradeError::MigrationInconsistency {
            stored: stored_text.clone(),
            running: running.to_string(),
            reason: reason.to_string(),
        };
        let Some(stored) = stored else {
            crate::error!(
                "upgrade.inconsistent stored={} running={} reason=unparseable timestamp={}",
                stored_text,
                running,
                Utc::now().to_rfc3339()
            );
            return Err(inconsistency("stored version is not a version string"));
        };

        match stored.cmp(running) {
            Ordering::Equal => return self.normalize_current(record, &stored),
            Ordering::Greater => {
                let error = inconsistency("stored version is newer than the running version");
                crate::error!(
                    "upgrade.inconsistent stored={} running={} reason=newer_than_running timestamp={}",
                    stored_text,
                    running,
                    Utc::now().to_rfc3339()
                );
                return Err(error);
            }
            Ordering::Less => {}
        }

        normalize_record_keys(
            &mut record,
            self.store.plugin_config().legacy_option_prefix(),
        );

        let next = self
            .schedule
            .iter()
            .find(|scheduled| scheduled.milestone <= *running && scheduled.guard.matches(&stored));

        match next {
            Some(scheduled) => self.run_step(scheduled, record, &stored),
            None => self.stamp_running_version(record, &stored),
        }
    }

    /// Repeats [`Self::upgrade_once`] until the record is up to date, at most `max_steps` times.
    ///
    /// Returns `Advanced` spanning every milestone applied, or the record's current state when
    /// nothing moved (`Pending` if it is still behind).
    ///
    /// # Errors
    /// Stops at the first failing pass and returns its error; earlier passes stay persisted.
    pub fn upgrade_to_current(&self, max_steps: u32) -> Result<UpgradeOutcome, UpgradeError> {
        let mut first_from = None;
        let mut last_to = None;

        for _ in 0..max_steps {
            match self.upgrade_once()? {
                UpgradeOutcome::Advanced { from, to } => {
                    first_from.get_or_insert(from);
                    last_to = Some(to);
                }
                settled => {
                    return Ok(match (first_from, last_to) {
                        (Some(from), Some(to)) => UpgradeOutcome::Advanced { from, to },
                        _ => settled,
                    });
                }
            }
        }

        crate::warn!(
            "upgrade.step_limit_reached max_steps={} timestamp={}",
            max_steps,
            Utc::now().to_rfc3339()
        );
        match (first_from, last_to) {
            (Some(from), Some(to)) => Ok(UpgradeOutcome::Advanced { from, to }),
            _ => self.current_state(),
        }
    }
}

impl UpgradeController {
    /// Creates a controller running `steps`, which must be in ascending milestone order
    ///
    /// # Errors
    /// - `UpgradeError::Version` if a milestone does not parse
    pub fn with_steps(
        store: Arc<ConfigStore>,
        steps: Vec<Arc<dyn UpgradeStep>>,
    ) -> UpgradeResult<Self> {
        let mut schedule = Vec::with_capacity(steps.len());
        let mut previous: Option<&'static str> = None;
        for step in steps {
            let milestone = step.milestone();
            schedule.push(ScheduledStep {
                guard: VersionGuard::range(previous, milestone)?,
                milestone: PluginVersion::parse(milestone)?,
                step,
            });
            previous = Some(milestone);
        }
        Ok(Self { store, schedule })
    }

    fn run_step(
        &self,
        scheduled: &ScheduledStep,
        mut record: RawRecord,
        stored: &PluginVersion,
    ) -> UpgradeResult<UpgradeOutcome> {
        let milestone = scheduled.milestone.to_string();
        let start = Utc::now();
        crate::info!(
            "upgrade.started id={} from={} guard=\"{}\" timestamp={}",
            milestone,
            stored,
            scheduled.guard,
            start.to_rfc3339()
        );

        let applied = scheduled
            .step
            .apply(&mut record, &self.store)
            .and_then(|outcome| {
                record.insert("version".to_string(), Value::String(milestone.clone()));
                self.persist(&record, stored)?;
                Ok(outcome)
            });

        let outcome = match applied {
            Ok(outcome) => outcome,
            Err(e) => {
                crate::error!(
                    "upgrade.failed id={} from={} error={:?} timestamp={}",
                    milestone,
                    stored,
                    e,
                    Utc::now().to_rfc3339()
                );
                return Err(e);
            }
        };

        for name in &outcome.retired_options {
            if let Err(e) = self.store.delete_legacy_option(name) {
                crate::warn!(
                    "upgrade.legacy_option_kept id={} option={} error={:?} timestamp={}",
                    milestone,
                    name,
                    e,
                    Utc::now().to_rfc3339()
                );
            }
        }

        crate::info!(
            "upgrade.succeeded id={} from={} to={} retired_options={} duration_ms={} timestamp={}",
            milestone,
            stored,
            milestone,
            outcome.retired_options.len(),
            (Utc::now() - start).num_milliseconds(),
            Utc::now().to_rfc3339()
        );

        Ok(UpgradeOutcome::Advanced {
            from: stored.to_string(),
            to: milestone,
        })
    }

    fn stamp_running_version(
        &self,
        mut record: RawRecord,
        stored: &PluginVersion,
    ) -> UpgradeResult<UpgradeOutcome> {
        let running = self.store.plugin_config().plugin_version_string();
        record.insert("version".to_string(), Value::String(running.clone()));
        if let Err(e) = self.persist(&record, stored) {
            crate::error!(
                "upgrade.stamp_failed from={} to={} error={:?} timestamp={}",
                stored,
                running,
                e,
                Utc::now().to_rfc3339()
            );
            return Err(e);
        }

        crate::info!(
            "upgrade.stamped from={} to={} timestamp={}",
            stored,
            running,
            Utc::now().to_rfc3339()
        );

        Ok(UpgradeOutcome::Advanced {
            from: stored.to_string(),
            to: running,
        })
    }

    /// A record already at the running version only needs old keys renamed
    fn normalize_current(
        &self,
        mut record: RawRecord,
        stored: &PluginVersion,
    ) -> UpgradeResult<UpgradeOutcome> {
        let prefix = self.store.plugin_config().legacy_option_prefix();
        if normalize_record_keys(&mut record, prefix) {
            self.persist(&record, stored)?;
            crate::info!(
                "upgrade.keys_renamed version={} timestamp={}",
                stored,
                Utc::now().to_rfc3339()
            );
        }
        Ok(UpgradeOutcome::UpToDate {
            version: self.store.plugin_config().plugin_version_string(),
        })
    }

    /// Writes `record` if it reads back as a settings record
    fn persist(&self, record: &RawRecord, stored: &PluginVersion) -> UpgradeResult<()> {
        if let Err(e) = check_loadable(record) {
            return Err(UpgradeError::MigrationInconsistency {
                stored: stored.to_string(),
                running: self.store.plugin_config().plugin_version_string(),
                reason: format!("upgraded record does not load: {e}"),
            });
        }
        self.store.write_raw(record)?;
        Ok(())
    }

    /// Where the stored record stands, without changing it
    fn current_state(&self) -> UpgradeResult<UpgradeOutcome> {
        let Some(record) = self.store.read_raw()? else {
            return Ok(UpgradeOutcome::Skipped);
        };
        let (stored_text, stored) = stored_version(&record);
        let running = self.store.plugin_config().plugin_version();
        Ok(match stored {
            Some(stored) if stored.cmp(running) == Ordering::Equal => UpgradeOutcome::UpToDate {
                version: stored_text,
            },
            _ => UpgradeOutcome::Pending {
                version: stored_text,
            },
        })
    }
}

/// The record's `version` as text, and parsed when it is a valid version string.
/// A missing key is the unversioned value.
fn stored_version(record: &RawRecord) -> (String, Option<PluginVersion>) {
    match record.get("version") {
        None | Some(Value::Null) => (String::new(), Some(PluginVersion::unversioned())),
        Some(Value::String(version)) => (version.clone(), PluginVersion::parse(version).ok()),
        Some(other) => (other.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::primitives::option_store::{InMemoryOptionStore, ReadOnlyOptionStore};

    fn controller(running: &str, options: Arc<dyn OptionStore>) -> Arc<UpgradeController> {
        UpgradeController::new(options, Arc::new(PluginConfig::new(running).unwrap())).unwrap()
    }

    fn stored_record(options: &InMemoryOptionStore) -> Value {
        serde_json::from_str(&options.raw("sitetrack").unwrap()).unwrap()
    }

    fn options_with_record(record: &Value) -> Arc<InMemoryOptionStore> {
        Arc::new(InMemoryOptionStore::with_options(&[(
            "sitetrack",
            record.to_string().as_str(),
        )]))
    }

    #[test]
    fn test_missing_record_is_skipped() {
        let options = Arc::new(InMemoryOptionStore::new());
        let controller = controller("1.4.3.2", options.clone());

        assert_eq!(controller.upgrade_once().unwrap(), UpgradeOutcome::Skipped);
        assert!(!options.contains("sitetrack"));
    }

    #[test]
    fn test_current_record_is_up_to_date() {
        let options = options_with_record(&json!({ "version": "1.4.3.2" }));
        let controller = controller("1.4.3.2", options);

        assert_eq!(
            controller.upgrade_once().unwrap(),
            UpgradeOutcome::UpToDate {
                version: "1.4.3.2".to_string()
            }
        );
    }

    #[test]
    fn test_each_milestone_advances_once() {
        let cases = [
            ("", "1.4.1"),
            ("1.3", "1.4.1"),
            ("1.4.1", "1.4.1.1"),
            ("1.4.1.1", "1.4.2"),
            ("1.4.1.5", "1.4.2"),
            ("1.4.2", "1.4.3"),
            ("1.4.3", "1.4.3.2"),
            ("1.4.3.1", "1.4.3.2"),
        ];

        for (from, to) in cases {
            let options = options_with_record(&json!({ "version": from }));
            let controller = controller("1.4.3.2", options.clone());

            assert_eq!(
                controller.upgrade_once().unwrap(),
                UpgradeOutcome::Advanced {
                    from: from.to_string(),
                    to: to.to_string()
                },
                "from {from:?}"
            );
            assert_eq!(stored_record(&options)["version"], to, "from {from:?}");
        }
    }

    #[test]
    fn test_timeout_milestone_sets_defaults() {
        let options = options_with_record(&json!({
            "version": "1.4.1.1",
            "use_timeout": true,
            "timeout": 30,
            "api_key": "kept",
        }));
        controller("1.4.3.2", options.clone()).upgrade_once().unwrap();

        let record = stored_record(&options);
        assert_eq!(record["use_timeout"], false);
        assert_eq!(record["timeout"], 600);
        assert_eq!(record["api_key"], "kept");
    }

    #[test]
    fn test_event_processing_milestone_enables_switch() {
        let options = options_with_record(&json!({ "version": "1.4.2", "process_event": false }));
        controller("1.4.3.2", options.clone()).upgrade_once().unwrap();

        assert_eq!(stored_record(&options)["process_event"], true);
    }

    #[test]
    fn test_milestone_newer_than_running_is_not_applied() {
        let options = options_with_record(&json!({ "version": "1.4.2" }));
        let controller = controller("1.4.2.5", options.clone());

        assert_eq!(
            controller.upgrade_once().unwrap(),
            UpgradeOutcome::Advanced {
                from: "1.4.2".to_string(),
                to: "1.4.2.5".to_string()
            }
        );
        assert!(stored_record(&options).get("process_event").is_none());
    }

    #[test]
    fn test_record_past_last_milestone_is_stamped() {
        let options = options_with_record(&json!({ "version": "1.4.3.2", "limit": 25 }));
        let controller = controller("3.3.2", options.clone());

        assert_eq!(
            controller.upgrade_once().unwrap(),
            UpgradeOutcome::Advanced {
                from: "1.4.3.2".to_string(),
                to: "3.3.2".to_string()
            }
        );
        let record = stored_record(&options);
        assert_eq!(record["version"], "3.3.2");
        assert_eq!(record["limit"], 25);
    }

    #[test]
    fn test_inconsistent_versions_leave_record_untouched() {
        for version in [json!("9.9"), json!("not-a-version"), json!(1.5)] {
            let record = json!({ "version": version });
            let options = options_with_record(&record);
            let before = options.raw("sitetrack");

            let result = controller("1.4.3.2", options.clone()).upgrade_once();

            assert!(
                matches!(result, Err(UpgradeError::MigrationInconsistency { .. })),
                "{version}"
            );
            assert_eq!(options.raw("sitetrack"), before);
        }
    }

    #[test]
    fn test_legacy_options_deleted_after_consolidation() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[
            ("sitetrack", r#"{"version":""}"#),
            ("sitetrack_api_key", "abc"),
            ("sitetrack_show_comments", "YES"),
        ]));
        controller("1.4.3.2", options.clone()).upgrade_once().unwrap();

        let record = stored_record(&options);
        assert_eq!(record["version"], "1.4.1");
        assert_eq!(record["api_key"], "abc");
        assert_eq!(record["events"]["comment_post"], true);
        assert!(!options.contains("sitetrack_api_key"));
        assert!(!options.contains("sitetrack_show_comments"));
    }

    #[test]
    fn test_failed_write_keeps_legacy_options() {
        let inner = InMemoryOptionStore::with_options(&[
            ("sitetrack", r#"{"version":"1.0"}"#),
            ("sitetrack_api_key", "abc"),
        ]);
        let options: Arc<dyn OptionStore> = Arc::new(ReadOnlyOptionStore::new(inner));
        let controller = controller("1.4.3.2", options.clone());

        let result = controller.upgrade_once();
        assert!(matches!(result, Err(UpgradeError::Persistence(_))));
        assert_eq!(options.get("sitetrack_api_key".to_string()).unwrap(), "abc");
        assert_eq!(
            options.get("sitetrack".to_string()).unwrap(),
            r#"{"version":"1.0"}"#
        );
    }

    #[test]
    fn test_upgrade_to_current_walks_whole_chain() {
        let options = options_with_record(&json!({}));
        let controller = controller("1.4.3.2", options.clone());

        assert_eq!(
            controller.upgrade_to_current(10).unwrap(),
            UpgradeOutcome::Advanced {
                from: String::new(),
                to: "1.4.3.2".to_string()
            }
        );
        let record = stored_record(&options);
        assert_eq!(record["version"], "1.4.3.2");
        assert_eq!(record["process_event"], true);
        assert_eq!(record["use_timeout"], false);
        assert_eq!(
            controller.upgrade_to_current(10).unwrap(),
            UpgradeOutcome::UpToDate {
                version: "1.4.3.2".to_string()
            }
        );
    }

    #[test]
    fn test_upgrade_to_current_respects_step_limit() {
        let options = options_with_record(&json!({ "version": "1.4.1" }));
        let controller = controller("1.4.3.2", options.clone());

        assert_eq!(
            controller.upgrade_to_current(2).unwrap(),
            UpgradeOutcome::Advanced {
                from: "1.4.1".to_string(),
                to: "1.4.2".to_string()
            }
        );
        assert_eq!(stored_record(&options)["version"], "1.4.2");
    }

    #[test]
    fn test_old_keys_renamed_on_every_milestone() {
        let options = options_with_record(&json!({
            "version": "1.4.3",
            "trackas": "shop.example",
            "sitetrack_event": { "signup": true },
        }));
        let controller = controller("1.4.3.2", options.clone());

        assert_eq!(
            controller.upgrade_once().unwrap(),
            UpgradeOutcome::Advanced {
                from: "1.4.3".to_string(),
                to: "1.4.3.2".to_string()
            }
        );
        let record = stored_record(&options);
        assert_eq!(record["track_as"], "shop.example");
        assert_eq!(record["events"]["signup"], true);
        assert!(record.get("trackas").is_none());
        assert!(record.get("sitetrack_event").is_none());
    }

    #[test]
    fn test_old_keys_renamed_when_stamping_and_up_to_date() {
        let options = options_with_record(&json!({ "version": "1.4.3.2", "trackas": "a.example" }));
        controller("3.3.2", options.clone()).upgrade_once().unwrap();
        assert_eq!(
            stored_record(&options),
            json!({ "version": "3.3.2", "track_as": "a.example" })
        );

        let options = options_with_record(&json!({ "version": "1.4.3.2", "trackas": "b.example" }));
        assert_eq!(
            controller("1.4.3.2", options.clone()).upgrade_once().unwrap(),
            UpgradeOutcome::UpToDate {
                version: "1.4.3.2".to_string()
            }
        );
        assert_eq!(
            stored_record(&options),
            json!({ "version": "1.4.3.2", "track_as": "b.example" })
        );
    }

    #[test]
    fn test_unloadable_result_is_not_written() {
        for running in ["1.4.3.2", "3.3.2"] {
            let options = options_with_record(&json!({ "version": "1.4.3", "other_events": "1" }));
            let before = options.raw("sitetrack");

            let result = controller(running, options.clone()).upgrade_once();

            assert!(
                matches!(
                    &result,
                    Err(UpgradeError::MigrationInconsistency { reason, .. })
                        if reason.contains("other_events")
                ),
                "{result:?}"
            );
            assert_eq!(options.raw("sitetrack"), before);
        }
    }

    #[test]
    fn test_zero_step_limit_reports_current_state() {
        let options = options_with_record(&json!({ "version": "1.4.2" }));
        assert_eq!(
            controller("1.4.3.2", options.clone()).upgrade_to_current(0).unwrap(),
            UpgradeOutcome::Pending {
                version: "1.4.2".to_string()
            }
        );
        assert_eq!(stored_record(&options)["version"], "1.4.2");

        let options = options_with_record(&json!({ "version": "1.4.3.2" }));
        assert_eq!(
            controller("1.4.3.2", options).upgrade_to_current(0).unwrap(),
            UpgradeOutcome::UpToDate {
                version: "1.4.3.2".to_string()
            }
        );

        let options = Arc::new(InMemoryOptionStore::new());
        assert_eq!(
            controller("1.4.3.2", options).upgrade_to_current(0).unwrap(),
            UpgradeOutcome::Skipped
        );
    }
}
