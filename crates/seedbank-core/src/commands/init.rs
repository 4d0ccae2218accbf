use std::path::Path;

use tracing::info;

use crate::config::RepoConfig;
use crate::error::{Result, SeedbankError};
use crate::history::{GitHistory, History};
use crate::layout;
use crate::platform::fs::atomic_write;
use crate::session::Session;

pub const INITIAL_COMMIT_MESSAGE: &str = "Initialize seedbank repository";

/// Run `sb init`: create the history log, config and directory layout at
/// `root`, and commit the config.
pub fn run(root: &Path, config: &RepoConfig) -> Result<Session> {
    if !root.is_dir() {
        return Err(SeedbankError::InvalidSourcePath(root.display().to_string()));
    }
    if layout::is_initialized(root) {
        return Err(SeedbankError::RepoAlreadyInitialized(
            root.display().to_string(),
        ));
    }

    let history = GitHistory::init(root, &config.history)?;
    config.save(root)?;
    atomic_write(
        &root.join(layout::GITIGNORE_FILE),
        layout::GITIGNORE_CONTENTS.as_bytes(),
    )?;
    for dir in [
        layout::meta_dir(root),
        layout::local_dir(root),
        layout::pending_dir(root),
    ] {
        std::fs::create_dir_all(dir)?;
    }

    history.commit(
        &[
            Path::new(layout::CONFIG_FILE),
            Path::new(layout::GITIGNORE_FILE),
        ],
        INITIAL_COMMIT_MESSAGE,
    )?;
    info!("seedbank initialized at {}", root.display());

    Session::open(root)
}
