// Backend selection and remote document credentials

use crate::store::LocalStore;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Local slot the configuration is persisted under
pub const CONFIG_KEY: &str = "taskboard_config";

pub const DEFAULT_BASE_URL: &str = "https://api.jsonbin.io/v3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which backend the factory should hand out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Local,
    Cloud,
}

/// Where and how to reach the shared remote document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    pub api_key: String,
    pub document_id: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub storage_type: StorageKind,
    pub remote: RemoteConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            document_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    /// Both credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.document_id.trim().is_empty()
    }

    /// Endpoint returning the latest document envelope
    pub fn read_url(&self) -> String {
        format!("{}/b/{}/latest", self.base_url.trim_end_matches('/'), self.document_id)
    }

    /// Endpoint replacing the whole document
    pub fn write_url(&self) -> String {
        format!("{}/b/{}", self.base_url.trim_end_matches('/'), self.document_id)
    }
}

impl Config {
    /// Load from the local store, falling back to defaults when absent or corrupt
    pub fn load(store: &LocalStore) -> Self {
        match store.get(CONFIG_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    warn!(key = CONFIG_KEY, error = ?e, "Corrupt configuration, using defaults");
                    Self::default()
                }
            },
            Ok(None) => {
                debug!("No saved configuration, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(key = CONFIG_KEY, error = ?e, "Failed to read configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Persist to the local store
    pub fn save(&self, store: &LocalStore) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize configuration")?;
        store.set(CONFIG_KEY, &json)
    }

    /// Cloud storage selected and usable
    pub fn is_cloud_enabled(&self) -> bool {
        self.storage_type == StorageKind::Cloud && self.remote.has_credentials()
    }

    /// Switch backend; cloud requires both credentials to be filled in
    pub fn set_storage(&mut self, kind: StorageKind) -> Result<()> {
        if kind == StorageKind::Cloud && !self.remote.has_credentials() {
            return Err(eyre!("Cloud storage requires both an API key and a document ID"));
        }
        self.storage_type = kind;
        Ok(())
    }

    pub fn set_remote(&mut self, api_key: impl Into<String>, document_id: impl Into<String>) {
        self.remote.api_key = api_key.into().trim().to_string();
        self.remote.document_id = document_id.into().trim().to_string();
    }
}
