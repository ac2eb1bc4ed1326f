use thiserror::Error;

/// Errors that can occur when interacting with the host's option storage
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum OptionStoreError {
    /// The requested option was not found in the store
    #[error("option not found")]
    KeyNotFound,
    /// Failed to parse the value retrieved from the store
    #[error("failed to parse option value")]
    ParsingFailure,
    /// Failed to update the value in the store
    #[error("failed to update option")]
    UpdateFailure,
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for OptionStoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// Named option storage provided by the host plugin framework.
///
/// Each option is a string value stored under a name. The settings record is one option
/// holding JSON; installs that predate the record keep each legacy setting under its own name.
///
/// Writes are durable and visible to subsequent reads in the same process. There is no
/// locking and no transaction: two requests writing the same option race, last write wins.
#[uniffi::export(with_foreign)]
pub trait OptionStore: Send + Sync {
    /// Get an option value
    ///
    /// # Errors
    /// - `OptionStoreError::KeyNotFound` if the option is not set
    /// - `OptionStoreError::ParsingFailure` if the stored value cannot be read back as a string
    fn get(&self, key: String) -> Result<String, OptionStoreError>;

    /// Set an option value, creating it if needed
    ///
    /// # Errors
    /// - `OptionStoreError::UpdateFailure` if the value could not be persisted
    fn set(&self, key: String, value: String) -> Result<(), OptionStoreError>;

    /// Delete an option
    ///
    /// # Errors
    /// - `OptionStoreError::KeyNotFound` if the option is not set
    /// - `OptionStoreError::UpdateFailure` if the option could not be removed
    fn delete(&self, key: String) -> Result<(), OptionStoreError>;
}

#[cfg(test)]
/// In-memory `OptionStore` for unit tests
#[allow(dead_code)]
pub struct InMemoryOptionStore {
    options: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
#[allow(dead_code)]
impl InMemoryOptionStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Creates a store pre-populated with the given options
    #[must_use]
    pub fn with_options(options: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (key, value) in options {
            store.set((*key).to_string(), (*value).to_string()).unwrap();
        }
        store
    }

    /// Whether an option is currently stored
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.options.lock().unwrap().contains_key(key)
    }

    /// Raw stored value of an option
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.options.lock().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
impl OptionStore for InMemoryOptionStore {
    fn get(&self, key: String) -> Result<String, OptionStoreError> {
        let value = self.options.lock().unwrap().get(&key).cloned();
        value.ok_or(OptionStoreError::KeyNotFound)
    }

    fn set(&self, key: String, value: String) -> Result<(), OptionStoreError> {
        self.options.lock().unwrap().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: String) -> Result<(), OptionStoreError> {
        self.options
            .lock()
            .unwrap()
            .remove(&key)
            .map(|_| ())
            .ok_or(OptionStoreError::KeyNotFound)
    }
}

#[cfg(test)]
/// `OptionStore` whose reads succeed from an inner store but whose writes and deletes fail
#[allow(dead_code)]
pub struct ReadOnlyOptionStore {
    inner: InMemoryOptionStore,
}

#[cfg(test)]
#[allow(dead_code)]
impl ReadOnlyOptionStore {
    /// Wraps the given store
    #[must_use]
    pub const fn new(inner: InMemoryOptionStore) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
impl OptionStore for ReadOnlyOptionStore {
    fn get(&self, key: String) -> Result<String, OptionStoreError> {
        self.inner.get(key)
    }

    fn set(&self, _key: String, _value: String) -> Result<(), OptionStoreError> {
        Err(OptionStoreError::UpdateFailure)
    }

    fn delete(&self, _key: String) -> Result<(), OptionStoreError> {
        Err(OptionStoreError::UpdateFailure)
    }
}
