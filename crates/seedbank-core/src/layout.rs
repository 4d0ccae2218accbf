//! On-disk layout of a seedbank repository.
//!
//! ```text
//! <root>/
//!   .git/                 versioned history
//!   .gitignore            ignores local/ and pending/
//!   seedbank.json         repository config
//!   meta/<uid>.json       one metadata record per archive
//!   local/<uid>.tar.zst   one payload per archive
//!   pending/<uid>.json    uploads not yet recorded in history
//! ```

use std::path::{Path, PathBuf};

use seedbank_types::ArchiveUid;

pub const CONFIG_FILE: &str = "seedbank.json";
pub const GIT_DIR: &str = ".git";
pub const GITIGNORE_FILE: &str = ".gitignore";
pub const META_DIR: &str = "meta";
pub const LOCAL_DIR: &str = "local";
pub const PENDING_DIR: &str = "pending";

/// Contents of the `.gitignore` written by `init`.
pub const GITIGNORE_CONTENTS: &str = "/local/\n/pending/\n";

/// A repository is initialized iff it has both a git directory and a config file.
pub fn is_initialized(root: &Path) -> bool {
    root.join(GIT_DIR).exists() && root.join(CONFIG_FILE).is_file()
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn meta_dir(root: &Path) -> PathBuf {
    root.join(META_DIR)
}

pub fn local_dir(root: &Path) -> PathBuf {
    root.join(LOCAL_DIR)
}

pub fn pending_dir(root: &Path) -> PathBuf {
    root.join(PENDING_DIR)
}

/// Repository directories that never go into a payload, even when the
/// repository sits inside the directory being archived.
pub fn unarchived_dirs(root: &Path) -> [PathBuf; 3] {
    [root.join(GIT_DIR), local_dir(root), pending_dir(root)]
}

pub fn metadata_path(root: &Path, uid: &ArchiveUid) -> PathBuf {
    meta_dir(root).join(uid.metadata_file_name())
}

pub fn payload_path(root: &Path, uid: &ArchiveUid) -> PathBuf {
    local_dir(root).join(uid.payload_file_name())
}

pub fn pending_path(root: &Path, uid: &ArchiveUid) -> PathBuf {
    pending_dir(root).join(uid.metadata_file_name())
}

/// Path of a metadata record relative to the root, as staged in history.
pub fn metadata_rel_path(uid: &ArchiveUid) -> PathBuf {
    Path::new(META_DIR).join(uid.metadata_file_name())
}
