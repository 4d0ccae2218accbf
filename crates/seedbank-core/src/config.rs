use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use seedbank_vault::VaultConfig;

use crate::error::{Result, SeedbankError};
use crate::layout;
use crate::platform::fs::atomic_write;

/// Repository-level settings stored in `seedbank.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Name of the vault archives are uploaded to.
    #[serde(default = "default_vault_name")]
    pub vault_name: String,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Keys seedbank does not interpret; kept so `save` round-trips them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Author recorded on history commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            vault_name: default_vault_name(),
            vault: VaultConfig::default(),
            history: HistoryConfig::default(),
            extra: BTreeMap::new(),
        }
    }
}

fn default_vault_name() -> String {
    "seedbank".to_string()
}

fn default_author_name() -> String {
    "seedbank".to_string()
}

fn default_author_email() -> String {
    "seedbank@localhost".to_string()
}

impl RepoConfig {
    /// Read `seedbank.json` from a repository root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = layout::config_path(root);
        let data = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SeedbankError::RepoNotInitialized(root.display().to_string())
            } else {
                SeedbankError::Io(e)
            }
        })?;
        Self::from_json(&data)
            .map_err(|e| SeedbankError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(data: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(self)?;
        out.push(b'\n');
        Ok(out)
    }

    /// Atomically write `seedbank.json` into a repository root.
    pub fn save(&self, root: &Path) -> Result<()> {
        atomic_write(&layout::config_path(root), &self.to_json()?)?;
        Ok(())
    }

    /// Look up a setting by dotted key, e.g. `vault_name` or `vault.retry.max_retries`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut value = serde_json::to_value(self).ok()?;
        for part in key.split('.') {
            value = value.get_mut(part)?.take();
        }
        Some(value)
    }
}
