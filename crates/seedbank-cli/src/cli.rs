use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sb",
    version,
    about = "Seedbank: a librarian for your cold-storage archives",
    after_help = "\
Repository layout:
  seedbank.json        repository config (vault name, vault backend, history author)
  meta/<uid>.json      one metadata record per archive, tracked in git
  local/<uid>.tar.zst  archive payloads, not tracked

Environment variables (glacier backend):
  AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN   credentials
  AWS_REGION / AWS_DEFAULT_REGION                               region when not set in config"
)]
pub(crate) struct Cli {
    /// Repository root (defaults to the current directory)
    #[arg(short = 'C', long = "repo", global = true)]
    pub repo: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Initialize an empty seedbank repository
    Init {
        /// Name of the vault archives are uploaded to
        #[arg(long)]
        vault_name: Option<String>,

        /// Use a local directory as the vault instead of Glacier
        #[arg(long, value_name = "DIR")]
        local_vault: Option<String>,

        /// Glacier region
        #[arg(long, conflicts_with = "local_vault")]
        region: Option<String>,
    },

    /// List archives, from least to most recent
    List,

    /// Bundle a directory into a new local archive (does not upload it)
    Create {
        /// Directory to archive
        path: String,
    },

    /// Upload an archive to the vault
    Upload {
        /// Unique prefix of the archive uid
        uid_prefix: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Retrieve an archive from the vault (not supported yet)
    Download {
        /// Unique prefix of the archive uid
        uid_prefix: String,
    },

    /// Finish recording uploads that were interrupted before reaching history
    Repair,

    /// Show one archive's metadata
    Show {
        /// Unique prefix of the archive uid
        uid_prefix: String,

        /// Also print every file in the archive
        #[arg(long)]
        files: bool,
    },
}

impl Commands {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::List => "list",
            Commands::Create { .. } => "create",
            Commands::Upload { .. } => "upload",
            Commands::Download { .. } => "download",
            Commands::Repair => "repair",
            Commands::Show { .. } => "show",
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repo_flag_is_global() {
        let cli = Cli::try_parse_from(["sb", "list", "-C", "/tmp/bank", "-vv"]).unwrap();
        assert_eq!(cli.repo.as_deref(), Some("/tmp/bank"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command.name(), "list");
    }

    #[test]
    fn upload_takes_prefix_and_yes() {
        let cli = Cli::try_parse_from(["sb", "upload", "ab12", "--yes"]).unwrap();
        match cli.command {
            Commands::Upload { uid_prefix, yes } => {
                assert_eq!(uid_prefix, "ab12");
                assert!(yes);
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn create_requires_path() {
        assert!(Cli::try_parse_from(["sb", "create"]).is_err());
    }

    #[test]
    fn local_vault_conflicts_with_region() {
        assert!(Cli::try_parse_from([
            "sb",
            "init",
            "--local-vault",
            "v",
            "--region",
            "eu-west-1"
        ])
        .is_err());
    }
}
