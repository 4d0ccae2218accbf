use std::path::Path;

use comfy_table::Cell;

use seedbank_core::commands;
use seedbank_core::session::Session;

use crate::format::{format_bytes, format_time};
use crate::table::CliTableTheme;

pub(crate) fn run_list(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(root)?;
    let archives = commands::list::run(&session);
    if archives.is_empty() {
        println!("No archives found.");
        return Ok(());
    }

    let theme = CliTableTheme::detect();
    let mut table = theme.new_data_table(&["UID", "Created", "Size", "Status", "Description"]);
    for archive in archives {
        table.add_row(vec![
            Cell::new(archive.uid.short()),
            Cell::new(format_time(&archive.create_time)),
            Cell::new(format_bytes(archive.size)),
            theme.status_cell(archive.is_uploaded()),
            Cell::new(archive.summary()),
        ]);
    }
    println!("{table}");
    Ok(())
}
