mod cli;
mod cmd;
mod dispatch;
mod format;
mod prompt;
mod table;

use std::path::PathBuf;

use clap::Parser;

use seedbank_core::platform::paths;

use cli::Cli;

fn repo_root(flag: Option<&str>) -> std::io::Result<PathBuf> {
    match flag {
        Some(dir) => paths::absolute(dir),
        None => std::env::current_dir(),
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = match repo_root(cli.repo.as_deref()) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: cannot resolve repository directory: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!("running `{}` in {}", cli.command.name(), root.display());

    if let Err(e) = dispatch::dispatch_command(&cli.command, &root) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
