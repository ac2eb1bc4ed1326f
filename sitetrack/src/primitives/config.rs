use crate::sitetrack_export;
use crate::version::{PluginVersion, VersionError};

/// Option name the settings record is stored under unless the host overrides it.
pub const DEFAULT_RECORD_NAME: &str = "sitetrack";

/// Prefix of the individually stored options that predate the settings record.
pub const DEFAULT_LEGACY_OPTION_PREFIX: &str = "sitetrack_";

/// Process-level configuration handed in by the host at startup.
///
/// Holds what the core cannot discover on its own: the version of the plugin currently
/// running and where the settings live in the host's option storage.
#[derive(Debug, Clone, uniffi::Object)]
pub struct PluginConfig {
    plugin_version: PluginVersion,
    record_name: String,
    legacy_option_prefix: String,
}

#[sitetrack_export]
impl PluginConfig {
    /// Creates a configuration using the default record name and legacy prefix.
    ///
    /// # Errors
    /// - `VersionError::InvalidVersion` if `plugin_version` is empty or not a dotted numeric version
    ///
    /// # Examples
    ///
    /// ## Kotlin
    ///
    /// ```kotlin
    /// val config = PluginConfig("1.4.3.2")
    /// ```
    #[uniffi::constructor]
    pub fn new(plugin_version: &str) -> Result<Self, VersionError> {
        Self::with_storage(
            plugin_version,
            DEFAULT_RECORD_NAME.to_string(),
            DEFAULT_LEGACY_OPTION_PREFIX.to_string(),
        )
    }

    /// Creates a configuration with explicit storage names.
    ///
    /// # Errors
    /// - `VersionError::InvalidVersion` if `plugin_version` is empty or not a dotted numeric version
    #[uniffi::constructor]
    pub fn with_storage(
        plugin_version: &str,
        record_name: String,
        legacy_option_prefix: String,
    ) -> Result<Self, VersionError> {
        let plugin_version = PluginVersion::parse(plugin_version)?;
        if plugin_version.is_unversioned() {
            return Err(VersionError::InvalidVersion {
                version: String::new(),
            });
        }
        crate::debug!(
            "plugin_config.created version={} record_name={} legacy_prefix={}",
            plugin_version,
            record_name,
            legacy_option_prefix
        );
        Ok(Self {
            plugin_version,
            record_name,
            legacy_option_prefix,
        })
    }

    /// The running plugin version as a string
    #[must_use]
    pub fn plugin_version_string(&self) -> String {
        self.plugin_version.to_string()
    }

    /// The option name of the settings record
    #[must_use]
    pub fn record_name(&self) -> String {
        self.record_name.clone()
    }
}

impl PluginConfig {
    /// The running plugin version
    #[must_use]
    pub const fn plugin_version(&self) -> &PluginVersion {
        &self.plugin_version
    }

    /// Full option name of a legacy setting, e.g. `sitetrack_api_key` for `api_key`
    #[must_use]
    pub fn legacy_option(&self, name: &str) -> String {
        format!("{}{name}", self.legacy_option_prefix)
    }

    /// The prefix shared by legacy option names
    #[must_use]
    pub fn legacy_option_prefix(&self) -> &str {
        &self.legacy_option_prefix
    }
}
