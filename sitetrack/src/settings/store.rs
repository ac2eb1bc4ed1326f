use std::sync::Arc;

use serde_json::{Map, Value};

use crate::primitives::{OptionStore, OptionStoreError, PluginConfig};

use super::configuration::Configuration;
use super::error::ConfigStoreError;

/// The settings record as an untyped JSON object, as seen by upgrade steps
pub type RawRecord = Map<String, Value>;

/// Reads and writes the single settings record through the host's [`OptionStore`].
///
/// Nothing is cached: every read goes to the host, so callers always see the latest write.
pub struct ConfigStore {
    options: Arc<dyn OptionStore>,
    config: Arc<PluginConfig>,
}

impl ConfigStore {
    /// Creates a store for the record named in `config`
    #[must_use]
    pub fn new(options: Arc<dyn OptionStore>, config: Arc<PluginConfig>) -> Self {
        Self { options, config }
    }

    /// The plugin configuration this store was created with
    #[must_use]
    pub fn plugin_config(&self) -> &PluginConfig {
        &self.config
    }

    /// Reads the typed record. `None` when nothing is stored.
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    /// - `ConfigStoreError::CorruptRecord` if the stored value is not a valid record
    pub fn read(&self) -> Result<Option<Configuration>, ConfigStoreError> {
        self.read_raw()?
            .map(|raw| {
                serde_json::from_value(Value::Object(raw)).map_err(|e| {
                    ConfigStoreError::CorruptRecord {
                        message: e.to_string(),
                    }
                })
            })
            .transpose()
    }

    /// Reads the record as an untyped JSON object. `None` when nothing is stored.
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    /// - `ConfigStoreError::CorruptRecord` if the stored value is not a JSON object
    pub fn read_raw(&self) -> Result<Option<RawRecord>, ConfigStoreError> {
        let json = match self.options.get(self.config.record_name()) {
            Ok(json) => json,
            Err(OptionStoreError::KeyNotFound) => return Ok(None),
            Err(OptionStoreError::ParsingFailure) => {
                return Err(ConfigStoreError::CorruptRecord {
                    message: "host could not read the stored value".to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&json) {
            Ok(Value::Object(record)) => Ok(Some(record)),
            Ok(other) => Err(ConfigStoreError::CorruptRecord {
                message: format!("expected a JSON object, found {other}"),
            }),
            Err(e) => Err(ConfigStoreError::CorruptRecord {
                message: e.to_string(),
            }),
        }
    }

    /// Persists the record and returns what was written.
    ///
    /// A record without a version is stamped with the running plugin version, so a fresh
    /// install never has to walk the upgrade chain.
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails; the stored record is then unchanged
    pub fn write(&self, config: &Configuration) -> Result<Configuration, ConfigStoreError> {
        let mut config = config.clone();
        if config.is_unversioned() {
            config.version = self.config.plugin_version_string();
        }
        let json = serde_json::to_string(&config)?;
        self.options.set(self.config.record_name(), json)?;
        crate::debug!(
            "settings.written version={} timestamp={}",
            config.version,
            chrono::Utc::now().to_rfc3339()
        );
        Ok(config)
    }

    /// Persists an untyped record exactly as given
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    pub fn write_raw(&self, record: &RawRecord) -> Result<(), ConfigStoreError> {
        let json = serde_json::to_string(record)?;
        self.options.set(self.config.record_name(), json)?;
        Ok(())
    }

    /// Deletes the record. Returns `false` if nothing was stored.
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    pub fn delete(&self) -> Result<bool, ConfigStoreError> {
        delete_option(self.options.as_ref(), self.config.record_name())
    }

    /// Reads a legacy option (e.g. `api_key` → `<prefix>api_key`). `None` when not set.
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    pub fn legacy_option(&self, name: &str) -> Result<Option<String>, ConfigStoreError> {
        match self.options.get(self.config.legacy_option(name)) {
            Ok(value) => Ok(Some(value)),
            Err(OptionStoreError::KeyNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a legacy option. Returns `false` if it was not set.
    ///
    /// # Errors
    /// - `ConfigStoreError::Persistence` if the host store fails
    pub fn delete_legacy_option(&self, name: &str) -> Result<bool, ConfigStoreError> {
        delete_option(self.options.as_ref(), self.config.legacy_option(name))
    }
}

fn delete_option(options: &dyn OptionStore, key: String) -> Result<bool, ConfigStoreError> {
    match options.delete(key) {
        Ok(()) => Ok(true),
        Err(OptionStoreError::KeyNotFound) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
