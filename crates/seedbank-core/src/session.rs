use std::path::{Path, PathBuf};
use std::sync::Arc;

use seedbank_vault::{vault_from_config, VaultClient};
use tracing::debug;

use crate::config::RepoConfig;
use crate::error::{Result, SeedbankError};
use crate::history::{GitHistory, History};
use crate::layout;
use crate::manager::ArchiveManager;
use crate::platform::paths;

/// Everything one command needs to work on a repository: its root, config,
/// archive registry, history log and (on demand) a vault client.
pub struct Session {
    root: PathBuf,
    pub config: RepoConfig,
    pub manager: ArchiveManager,
    history: Box<dyn History>,
    vault: Option<Arc<dyn VaultClient>>,
}

impl Session {
    /// Open an initialized repository. The config and all metadata records
    /// are read once here.
    pub fn open(root: &Path) -> Result<Self> {
        let root = paths::absolute(&root.to_string_lossy())?;
        if !layout::is_initialized(&root) {
            return Err(SeedbankError::RepoNotInitialized(root.display().to_string()));
        }
        let config = RepoConfig::load(&root)?;
        let manager = ArchiveManager::load(&layout::meta_dir(&root))?;
        let history = GitHistory::open(&root, &config.history)?;
        debug!("opened repository {}", root.display());
        Ok(Self::from_parts(root, config, manager, Box::new(history)))
    }

    pub fn from_parts(
        root: PathBuf,
        config: RepoConfig,
        manager: ArchiveManager,
        history: Box<dyn History>,
    ) -> Self {
        Self {
            root,
            config,
            manager,
            history,
            vault: None,
        }
    }

    /// Use `vault` instead of building one from config.
    pub fn with_vault(mut self, vault: Arc<dyn VaultClient>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history(&self) -> &dyn History {
        self.history.as_ref()
    }

    /// The vault client, built from the `vault` config block on first use.
    pub fn vault(&mut self) -> Result<Arc<dyn VaultClient>> {
        if let Some(vault) = &self.vault {
            return Ok(Arc::clone(vault));
        }
        let vault: Arc<dyn VaultClient> =
            Arc::from(vault_from_config(&self.config.vault, &self.root)?);
        self.vault = Some(Arc::clone(&vault));
        Ok(vault)
    }
}
