/// Settings record persisted in chrome.storage.sync

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::prelude::*;

/// Key the settings record lives under
pub const SETTINGS_KEY: &str = "options";

/// Model used when the stored record does not name one
pub const DEFAULT_MODEL: &str = "Qwen_Qwen2.5-Coder-7B-Instruct-exl2";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("storage call failed: {0}")]
    Call(String),

    #[error("stored settings are malformed: {0}")]
    Decode(String),
}

/// Endpoint configuration for the classification client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: String::new(),
            base_url: String::new(),
            model: default_model(),
        }
    }
}

impl Settings {
    /// Model to request, falling back to the default when left blank
    pub fn model(&self) -> &str {
        if self.model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            self.model.trim()
        }
    }

    /// Decode a record as read from storage; a missing record is the default
    pub fn from_stored(stored: Option<serde_json::Value>) -> Result<Settings, StorageError> {
        match stored {
            None | Some(serde_json::Value::Null) => Ok(Settings::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| StorageError::Decode(e.to_string())),
        }
    }
}

/// Durable home of the settings record
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn load(&self) -> Result<Settings, StorageError>;
    async fn save(&self, settings: &Settings) -> Result<(), StorageError>;
}

// Import JS bridge functions
#[wasm_bindgen(module = "/sidepanel.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getSyncStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setSyncStorage(key: &str, value: JsValue) -> Result<(), JsValue>;
}

/// `SettingsStore` over chrome.storage.sync
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncSettingsStore;

impl SettingsStore for SyncSettingsStore {
    async fn load(&self) -> Result<Settings, StorageError> {
        let stored_js = getSyncStorage(SETTINGS_KEY)
            .await
            .map_err(|e| StorageError::Call(format!("{:?}", e)))?;

        if stored_js.is_null() || stored_js.is_undefined() {
            return Ok(Settings::default());
        }

        let stored: serde_json::Value = serde_wasm_bindgen::from_value(stored_js)
            .map_err(|e| StorageError::Decode(format!("{:?}", e)))?;

        Settings::from_stored(Some(stored))
    }

    async fn save(&self, settings: &Settings) -> Result<(), StorageError> {
        let settings_js = serde_wasm_bindgen::to_value(settings)
            .map_err(|e| StorageError::Decode(format!("{:?}", e)))?;

        setSyncStorage(SETTINGS_KEY, settings_js)
            .await
            .map_err(|e| StorageError::Call(format!("{:?}", e)))
    }
}
