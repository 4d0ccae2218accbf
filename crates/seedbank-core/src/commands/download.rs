use crate::error::{Result, SeedbankError};
use crate::session::Session;

/// Run `sb download`. Retrieval from cold storage is not supported yet; the
/// archive is resolved so a bad prefix still reports the usual errors.
pub fn run(session: &Session, uid_prefix: &str) -> Result<()> {
    let archive = session.manager.require(uid_prefix)?;
    if !archive.is_uploaded() {
        return Err(SeedbankError::Other(format!(
            "archive {} has not been uploaded",
            archive.uid
        )));
    }
    Err(SeedbankError::Other(format!(
        "download of archive {} is not supported",
        archive.uid
    )))
}
