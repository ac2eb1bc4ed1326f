use crate::primitives::OptionStoreError;

/// Errors raised while reading or writing the settings record
#[crate::sitetrack_error]
pub enum ConfigStoreError {
    /// The host's option storage failed
    #[error("persistence failure: {0}")]
    Persistence(#[from] OptionStoreError),

    /// The stored record exists but is not a valid settings record
    #[error("stored settings record is corrupt: {message}")]
    CorruptRecord {
        /// Why the record was rejected
        message: String,
    },

    /// The record could not be serialized for storage
    #[error("failed to serialize settings record: {message}")]
    Serialization {
        /// The error message from `serde_json`
        message: String,
    },
}

impl From<serde_json::Error> for ConfigStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
