use std::path::Path;

use crate::cli::Commands;
use crate::cmd;

pub(crate) fn dispatch_command(
    command: &Commands,
    root: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Init {
            vault_name,
            local_vault,
            region,
        } => cmd::init::run_init(
            root,
            vault_name.as_deref(),
            local_vault.as_deref(),
            region.as_deref(),
        ),
        Commands::List => cmd::list::run_list(root),
        Commands::Create { path } => cmd::create::run_create(root, path),
        Commands::Upload { uid_prefix, yes } => cmd::upload::run_upload(root, uid_prefix, *yes),
        Commands::Download { uid_prefix } => cmd::download::run_download(root, uid_prefix),
        Commands::Repair => cmd::repair::run_repair(root),
        Commands::Show { uid_prefix, files } => cmd::show::run_show(root, uid_prefix, *files),
    }
}
