#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sitetrack::primitives::{OptionStore, OptionStoreError, PluginConfig};
use sitetrack::SettingsManager;

/// Option storage backed by a map, standing in for the host's options table
#[derive(Default)]
pub struct MemoryOptions {
    options: Mutex<HashMap<String, String>>,
}

impl MemoryOptions {
    pub fn with(options: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        for (key, value) in options {
            store
                .options
                .lock()
                .unwrap()
                .insert((*key).to_string(), (*value).to_string());
        }
        Arc::new(store)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.options.lock().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.lock().unwrap().contains_key(key)
    }

    pub fn record(&self) -> serde_json::Value {
        serde_json::from_str(&self.raw("sitetrack").expect("no settings record stored"))
            .expect("settings record is not JSON")
    }
}

impl OptionStore for MemoryOptions {
    fn get(&self, key: String) -> Result<String, OptionStoreError> {
        self.raw(&key).ok_or(OptionStoreError::KeyNotFound)
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

pub fn plugin_config(running: &str) -> Arc<PluginConfig> {
    Arc::new(PluginConfig::new(running).expect("valid running version"))
}

pub fn settings_manager(options: &Arc<MemoryOptions>, running: &str) -> Arc<SettingsManager> {
    SettingsManager::new(options.clone(), plugin_config(running)).expect("manager")
}
