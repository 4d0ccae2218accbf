use std::path::Path;

use seedbank_core::commands;
use seedbank_core::config::RepoConfig;
use seedbank_core::platform::paths;
use seedbank_vault::VaultBackendKind;

pub(crate) fn run_init(
    root: &Path,
    vault_name: Option<&str>,
    local_vault: Option<&str>,
    region: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = RepoConfig::default();
    if let Some(name) = vault_name {
        config.vault_name = name.to_string();
    }
    if let Some(dir) = local_vault {
        config.vault.backend = VaultBackendKind::Local;
        config.vault.path = Some(paths::expand_tilde(dir).to_string_lossy().to_string());
    }
    config.vault.region = region.map(str::to_string);

    std::fs::create_dir_all(root)?;
    let session = commands::init::run(root, &config)?;
    println!("Seedbank initialized at {}", paths::normalize_dir(&session.root().to_string_lossy())?);
    Ok(())
}
