use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde_json::Value;

use crate::events::{EventGroup, EventListing, EventRegistry, Translator};
use crate::primitives::{OptionStore, PluginConfig};
use crate::settings::{
    defaults_with_registry, effective_track_as, ConfigStore, ConfigStoreError, Configuration,
};
use crate::sitetrack_export;
use crate::upgrade::steps::ConsolidateLegacyOptions;
use crate::upgrade::{UpgradeController, UpgradeError, UpgradeOutcome};
use crate::validation::{SettingsValidator, ValidationError, ValidationOutcome};

/// Errors surfaced by [`SettingsManager`]
#[crate::sitetrack_error]
pub enum SettingsError {
    /// Reading or writing the record failed
    #[error(transparent)]
    Store(#[from] ConfigStoreError),

    /// The record could not be upgraded
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    /// A settings submission was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What happened to a settings submission
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SubmissionOutcome {
    /// The stored record was removed
    Deleted,
    /// The defaults were stored
    Reset {
        /// The record as persisted
        config: Configuration,
    },
    /// The submitted settings were stored
    Saved {
        /// The record as persisted
        config: Configuration,
    },
}

/// Entry point for the host: ties the plugin lifecycle and the settings screen to the
/// stored record.
///
/// # Examples
///
/// ## Kotlin
///
/// ```kotlin
/// val settings = SettingsManager(optionStore, PluginConfig("1.4.3.2"))
/// settings.activate(requestHost)
/// val config = settings.load(requestHost)
/// ```
#[derive(uniffi::Object)]
pub struct SettingsManager {
    store: Arc<ConfigStore>,
    upgrades: UpgradeController,
    builtin_events: EventRegistry,
    localized_events: OnceLock<EventRegistry>,
}

#[sitetrack_export]
impl SettingsManager {
    /// Creates a manager over the host's option storage.
    ///
    /// # Errors
    /// - `SettingsError::Upgrade` if the built-in milestones cannot be scheduled
    #[uniffi::constructor]
    pub fn new(
        option_store: Arc<dyn OptionStore>,
        config: Arc<PluginConfig>,
    ) -> Result<Arc<Self>, SettingsError> {
        let store = Arc::new(ConfigStore::new(option_store, config));
        let upgrades = UpgradeController::with_steps(
            store.clone(),
            crate::upgrade::steps::default_steps(),
        )?;
        Ok(Arc::new(Self {
            store,
            upgrades,
            builtin_events: EventRegistry::builtin(),
            localized_events: OnceLock::new(),
        }))
    }

    /// Current settings for a request.
    ///
    /// A stored record behind the running version is advanced by one milestone first;
    /// upgrade failures are logged and the record is used as stored. Without a stored
    /// record the defaults for `request_host` are returned without being persisted.
    ///
    /// # Errors
    /// - `SettingsError::Store` if the record cannot be read
    pub fn load(&self, request_host: &str) -> Result<Configuration, SettingsError> {
        self.upgrade_logged();

        let mut config = self.read_or_defaults(request_host)?;
        config.track_as = effective_track_as(&config, request_host);
        Ok(config)
    }

    /// Runs on plugin activation.
    ///
    /// Without a record the defaults are stored. If options from releases that predate the
    /// record are still around, the defaults are stored unversioned and folded together
    /// with those options by the first milestone. An existing record is marked activated
    /// and advanced by one milestone.
    ///
    /// # Errors
    /// - `SettingsError::Store` if the record cannot be read or written
    /// - `SettingsError::Upgrade` if consolidating legacy options fails
    pub fn activate(&self, request_host: &str) -> Result<Configuration, SettingsError> {
        let Some(mut record) = self.store.read_raw()? else {
            let defaults = self.defaults(request_host);
            if ConsolidateLegacyOptions::legacy_options_present(&self.store)? {
                crate::info!(
                    "settings.legacy_install_detected timestamp={}",
                    Utc::now().to_rfc3339()
                );
                let Value::Object(raw) =
                    serde_json::to_value(&defaults).map_err(ConfigStoreError::from)?
                else {
                    return Err(ConfigStoreError::Serialization {
                        message: "defaults did not serialize to an object".to_string(),
                    }
                    .into());
                };
                self.store.write_raw(&raw)?;
                self.upgrades.upgrade_once()?;
                return self.read_or_defaults(request_host);
            }

            let config = self.store.write(&defaults)?;
            crate::info!(
                "settings.installed version={} timestamp={}",
                config.version,
                Utc::now().to_rfc3339()
            );
            return Ok(config);
        };

        if record.get("activated") != Some(&Value::Bool(true)) {
            record.insert("activated".to_string(), Value::Bool(true));
            self.store.write_raw(&record)?;
            crate::info!("settings.activated timestamp={}", Utc::now().to_rfc3339());
        }
        self.upgrade_logged();
        self.read_or_defaults(request_host)
    }

    /// Runs on plugin deactivation: marks the stored record deactivated.
    ///
    /// Returns `false` when there is no record.
    ///
    /// # Errors
    /// - `SettingsError::Store` if the record cannot be read or written
    pub fn deactivate(&self) -> Result<bool, SettingsError> {
        let Some(mut record) = self.store.read_raw()? else {
            return Ok(false);
        };
        record.insert("activated".to_string(), Value::Bool(false));
        self.store.write_raw(&record)?;
        crate::info!("settings.deactivated timestamp={}", Utc::now().to_rfc3339());
        Ok(true)
    }

    /// Validates and applies a settings form submission given as a JSON object.
    ///
    /// A rejected submission leaves the stored record unchanged. The `delete` and `default`
    /// flags never read the stored record, so they also recover one that no longer loads.
    ///
    /// # Errors
    /// - `SettingsError::Validation` if the submission is rejected
    /// - `SettingsError::Store` if the record cannot be read, written or deleted
    pub fn submit_settings(
        &self,
        submission: &str,
        request_host: &str,
    ) -> Result<SubmissionOutcome, SettingsError> {
        let submission = rejection_logged(SettingsValidator::parse(submission))?;
        let validator = SettingsValidator::new(self.events());
        let validated = match validator.control_action(&submission, request_host) {
            Some(action) => action,
            None => {
                let stored = self.read_or_defaults(request_host)?;
                rejection_logged(validator.validate(&submission, &stored, request_host))?
            }
        };

        let outcome = match validated {
            ValidationOutcome::Delete => {
                self.store.delete()?;
                SubmissionOutcome::Deleted
            }
            ValidationOutcome::Reset(defaults) => SubmissionOutcome::Reset {
                config: self.store.write(&defaults)?,
            },
            ValidationOutcome::Update(config) => SubmissionOutcome::Saved {
                config: self.store.write(&config)?,
            },
        };

        crate::info!(
            "settings.submitted outcome={} timestamp={}",
            match &outcome {
                SubmissionOutcome::Deleted => "deleted",
                SubmissionOutcome::Reset { .. } => "reset",
                SubmissionOutcome::Saved { .. } => "saved",
            },
            Utc::now().to_rfc3339()
        );
        Ok(outcome)
    }

    /// Replaces the stored record with the defaults for `request_host`
    ///
    /// # Errors
    /// - `SettingsError::Store` if the record cannot be written
    pub fn reset_to_defaults(&self, request_host: &str) -> Result<Configuration, SettingsError> {
        Ok(self.store.write(&self.defaults(request_host))?)
    }

    /// Deletes the stored record. Returns `false` if none was stored.
    ///
    /// # Errors
    /// - `SettingsError::Store` if the record cannot be deleted
    pub fn delete_configuration(&self) -> Result<bool, SettingsError> {
        let deleted = self.store.delete()?;
        crate::info!(
            "settings.deleted existed={} timestamp={}",
            deleted,
            Utc::now().to_rfc3339()
        );
        Ok(deleted)
    }

    /// Translates event names and descriptions once the host's localization is loaded.
    ///
    /// Only the first call has an effect; returns `false` for later ones.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn localize_events(&self, translator: Arc<dyn Translator>) -> bool {
        let localized = self.builtin_events.localized(translator.as_ref());
        if self.localized_events.set(localized).is_err() {
            crate::warn!("events.already_localized");
            return false;
        }
        true
    }

    /// The settings screen's event checkboxes for `group`, checked per `config`
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn event_listing(&self, config: Configuration, group: EventGroup) -> Vec<EventListing> {
        self.events().listing(group, config.event_states(group))
    }
}

impl SettingsManager {
    fn events(&self) -> &EventRegistry {
        self.localized_events.get().unwrap_or(&self.builtin_events)
    }

    fn defaults(&self, request_host: &str) -> Configuration {
        defaults_with_registry(request_host, self.events())
    }

    fn read_or_defaults(&self, request_host: &str) -> Result<Configuration, SettingsError> {
        Ok(self
            .store
            .read()?
            .unwrap_or_else(|| self.defaults(request_host)))
    }

    /// One upgrade pass whose failure is logged rather than returned
    fn upgrade_logged(&self) {
        match self.upgrades.upgrade_once() {
            Ok(UpgradeOutcome::Advanced { from, to }) => crate::debug!(
                "settings.upgraded from={} to={} timestamp={}",
                from,
                to,
                Utc::now().to_rfc3339()
            ),
            Ok(
                UpgradeOutcome::UpToDate { .. }
                | UpgradeOutcome::Pending { .. }
                | UpgradeOutcome::Skipped,
            ) => {}
            Err(e) => crate::error!(
                "settings.upgrade_failed error={:?} timestamp={}",
                e,
                Utc::now().to_rfc3339()
            ),
        }
    }
}

/// Logs a rejected submission on its way to the caller
fn rejection_logged<T>(result: Result<T, ValidationError>) -> Result<T, SettingsError> {
    result.map_err(|e| {
        crate::warn!(
            "settings.rejected error={:?} timestamp={}",
            e,
            Utc::now().to_rfc3339()
        );
        e.into()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::primitives::option_store::{InMemoryOptionStore, ReadOnlyOptionStore};

    struct Shouting;

    impl Translator for Shouting {
        fn translate(&self, text: String) -> String {
            text.to_uppercase()
        }
    }

    fn manager(options: Arc<dyn OptionStore>) -> Arc<SettingsManager> {
        SettingsManager::new(options, Arc::new(PluginConfig::new("1.4.3.2").unwrap())).unwrap()
    }

    fn stored(options: &InMemoryOptionStore) -> Value {
        serde_json::from_str(&options.raw("sitetrack").unwrap()).unwrap()
    }

    #[test]
    fn test_load_without_record_returns_unpersisted_defaults() {
        let options = Arc::new(InMemoryOptionStore::new());
        let config = manager(options.clone()).load("www.example.com").unwrap();

        assert_eq!(config.track_as, "example.com");
        assert!(config.version.is_empty());
        assert!(!options.contains("sitetrack"));
    }

    #[test]
    fn test_load_survives_inconsistent_version() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[(
            "sitetrack",
            r#"{"version":"9.9","limit":10}"#,
        )]));
        let config = manager(options.clone()).load("example.com").unwrap();

        assert_eq!(config.version, "9.9");
        assert_eq!(config.limit, 10);
    }

    #[test]
    fn test_load_fills_empty_track_as() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[(
            "sitetrack",
            r#"{"version":"1.4.3.2","track_as":""}"#,
        )]));
        let config = manager(options).load("http://www.example.org/").unwrap();
        assert_eq!(config.track_as, "example.org");
    }

    #[test]
    fn test_fresh_activation_stores_stamped_defaults() {
        let options = Arc::new(InMemoryOptionStore::new());
        let config = manager(options.clone()).activate("www.example.com").unwrap();

        assert_eq!(config.version, "1.4.3.2");
        assert_eq!(stored(&options)["version"], "1.4.3.2");
        assert_eq!(stored(&options)["track_as"], "example.com");
    }

    #[test]
    fn test_activation_with_legacy_options_consolidates_them() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[
            ("sitetrack_api_key", "legacy-key"),
            ("sitetrack_track_admin", "YES"),
        ]));
        let config = manager(options.clone()).activate("example.com").unwrap();

        assert_eq!(config.version, "1.4.1");
        assert_eq!(config.api_key, "legacy-key");
        assert!(config.track_admin);
        assert!(!options.contains("sitetrack_api_key"));
        assert!(!options.contains("sitetrack_track_admin"));
    }

    #[test]
    fn test_deactivate_then_activate_toggles_only_activated() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[(
            "sitetrack",
            r#"{"version":"1.4.3.2","limit":7}"#,
        )]));
        let manager = manager(options.clone());

        assert!(manager.deactivate().unwrap());
        assert_eq!(stored(&options), json!({ "version": "1.4.3.2", "limit": 7, "activated": false }));

        let config = manager.activate("example.com").unwrap();
        assert!(config.activated);
        assert_eq!(config.limit, 7);
        assert_eq!(stored(&options), json!({ "version": "1.4.3.2", "limit": 7, "activated": true }));
    }

    #[test]
    fn test_deactivate_without_record() {
        assert!(!manager(Arc::new(InMemoryOptionStore::new())).deactivate().unwrap());
    }

    #[test]
    fn test_submit_saves_and_stamps_version() {
        let options = Arc::new(InMemoryOptionStore::new());
        let outcome = manager(options.clone())
            .submit_settings(r#"{"timeout":"300","use_timeout":"on","api_key":"k"}"#, "example.com")
            .unwrap();

        let SubmissionOutcome::Saved { config } = outcome else {
            panic!("expected a save");
        };
        assert_eq!(config.version, "1.4.3.2");
        assert_eq!(config.timeout, 300);
        assert!(config.use_timeout);
        assert_eq!(stored(&options)["api_key"], "k");
    }

    #[test]
    fn test_rejected_submission_leaves_store_unchanged() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[(
            "sitetrack",
            r#"{"version":"1.4.3.2","timeout":600}"#,
        )]));
        let before = options.raw("sitetrack");

        let result = manager(options.clone()).submit_settings(r#"{"timeout":"ten"}"#, "example.com");

        assert!(matches!(
            result,
            Err(SettingsError::Validation(ValidationError::TimeoutNotNumeric { .. }))
        ));
        assert_eq!(options.raw("sitetrack"), before);
    }

    #[test]
    fn test_submit_delete_and_reset() {
        let options = Arc::new(InMemoryOptionStore::with_options(&[(
            "sitetrack",
            r#"{"version":"1.4.3.2","limit":3}"#,
        )]));
        let manager = manager(options.clone());

        let outcome = manager.submit_settings(r#"{"default":"true"}"#, "www.example.com").unwrap();
        let SubmissionOutcome::Reset { config } = outcome else {
            panic!("expected a reset");
        };
        assert_eq!(config.limit, 50);
        assert_eq!(config.version, "1.4.3.2");

        assert_eq!(
            manager.submit_settings(r#"{"delete":true}"#, "example.com").unwrap(),
            SubmissionOutcome::Deleted
        );
        assert!(!options.contains("sitetrack"));
    }

    #[test]
    fn test_write_failure_surfaces() {
        let options = Arc::new(ReadOnlyOptionStore::new(InMemoryOptionStore::new()));
        let result = manager(options).reset_to_defaults("example.com");
        assert!(matches!(result, Err(SettingsError::Store(ConfigStoreError::Persistence(_)))));
    }

    #[test]
    fn test_delete_configuration() {
        let options = Arc::new(InMemoryOptionStore::new());
        let manager = manager(options.clone());
        manager.reset_to_defaults("example.com").unwrap();

        assert!(manager.delete_configuration().unwrap());
        assert!(!manager.delete_configuration().unwrap());
    }

    #[test]
    fn test_events_localize_once() {
        let manager = manager(Arc::new(InMemoryOptionStore::new()));
        let config = manager.load("example.com").unwrap();

        assert_eq!(manager.event_listing(config.clone(), EventGroup::Site)[0].display_name, "comments");
        assert!(manager.localize_events(Arc::new(Shouting)));
        assert!(!manager.localize_events(Arc::new(Shouting)));

        let listing = manager.event_listing(config.clone(), EventGroup::Commerce);
        assert_eq!(listing[0].display_name, "CART UPDATE");
        assert!(listing.iter().all(|event| event.enabled));
    }
}
