use std::path::Path;

use seedbank_core::commands;
use seedbank_core::session::Session;

pub(crate) fn run_download(root: &Path, uid_prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(root)?;
    commands::download::run(&session, uid_prefix)?;
    Ok(())
}
