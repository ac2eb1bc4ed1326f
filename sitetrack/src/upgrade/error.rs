use crate::settings::ConfigStoreError;

/// Errors that can occur while upgrading the stored settings record
#[crate::sitetrack_error]
pub enum UpgradeError {
    /// Reading or writing the record failed
    #[error(transparent)]
    Persistence(#[from] ConfigStoreError),

    /// The stored record cannot be placed on the upgrade chain, or upgrading it would
    /// produce a record that does not load
    #[error("stored settings version {stored:?} cannot be upgraded to running version {running}: {reason}")]
    MigrationInconsistency {
        /// Version found in the stored record
        stored: String,
        /// Version of the running plugin
        running: String,
        /// What is wrong with the stored record
        reason: String,
    },

    /// A milestone is not a valid version
    #[error(transparent)]
    Version(#[from] crate::version::VersionError),

    /// A record field had a shape the step could not work with
    #[error("JSON error: {message}")]
    Json {
        /// The error message
        message: String,
    },
}

impl From<serde_json::Error> for UpgradeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

/// Result type for upgrade operations
pub type UpgradeResult<T> = std::result::Result<T, UpgradeError>;
