use crate::archive::Archive;
use crate::error::Result;
use crate::journal::PendingUpload;
use crate::session::Session;

/// Everything known locally about one archive.
#[derive(Debug, Clone)]
pub struct ArchiveDetails {
    pub archive: Archive,
    pub payload_present: bool,
    /// Set when an upload reached the vault but is not yet recorded.
    pub pending: Option<PendingUpload>,
}

/// Run `sb show`.
pub fn run(session: &Session, uid_prefix: &str) -> Result<ArchiveDetails> {
    let archive = session.manager.require(uid_prefix)?.clone();
    let payload_present = archive.payload_path(session.root()).is_file();
    let pending = PendingUpload::find(session.root(), &archive.uid)?;
    Ok(ArchiveDetails {
        archive,
        payload_present,
        pending,
    })
}
