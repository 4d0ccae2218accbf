use std::path::Path;

use seedbank_core::commands;
use seedbank_core::platform::paths;
use seedbank_core::session::Session;

use crate::format::format_bytes;

pub(crate) fn run_create(root: &Path, source: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(root)?;
    let source = paths::absolute(source)?;
    let uid = commands::create::run(&mut session, &source)?;

    if let Some(archive) = session.manager.get(uid.as_str()) {
        println!("Created archive {uid}");
        println!(
            "  {} file(s), {}",
            archive.file_list.len(),
            format_bytes(archive.size)
        );
    }
    Ok(())
}
