use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use lume::Transport;

#[derive(Parser)]
#[command(name = "lume-fleet")]
#[command(author = "Hoa Long")]
#[command(version)]
#[command(about = "Manage a fleet of Lume VMs declaratively", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the fleet config file (default: ./fleet.yml)
    #[arg(short, long, global = true, env = "LUME_FLEET_CONFIG")]
    pub config: Option<String>,

    /// How to talk to Lume: http (lume serve) or cli (lume binary)
    #[arg(long, global = true, env = "LUME_FLEET_TRANSPORT", default_value = "http")]
    pub transport: Transport,

    /// Base URL of `lume serve`
    #[arg(long, global = true, env = "LUME_API_URL", default_value = lume::DEFAULT_API_URL)]
    pub api_url: String,

    /// Lume executable used by the cli transport
    #[arg(long, global = true, env = "LUME_BIN", default_value = lume::DEFAULT_LUME_BIN)]
    pub lume_bin: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create and start VMs defined in the fleet config
    Up(UpArgs),

    /// Stop running VMs
    Down(DownArgs),

    /// Delete VMs entirely
    Destroy(DestroyArgs),

    /// Show fleet VM status
    Status(StatusArgs),

    /// Check the fleet config and print the resolved VMs
    Validate,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// VM selection shared by the lifecycle commands
#[derive(Args, Debug, Default)]
pub struct Selection {
    /// Only these VMs (default: all)
    #[arg(value_name = "VM")]
    pub names: Vec<String>,

    /// Only VMs carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,
}

#[derive(Args)]
pub struct UpArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Minutes to wait for a new VM to finish provisioning
    #[arg(long, value_name = "MINUTES", default_value_t = 30)]
    pub timeout: u64,
}

#[derive(Args)]
pub struct DownArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Skip confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Only VMs carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_up_with_selection() {
        let cli = Cli::try_parse_from([
            "lume-fleet", "up", "dev", "ci", "--tag", "mac", "--timeout", "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Up(args) => {
                assert_eq!(args.selection.names, vec!["dev", "ci"]);
                assert_eq!(args.selection.tag.as_deref(), Some("mac"));
                assert_eq!(args.timeout, 5);
                assert!(!args.dry_run);
            }
            _ => panic!("expected up"),
        }
    }

    #[test]
    fn test_parse_global_transport() {
        let cli = Cli::try_parse_from(["lume-fleet", "down", "--transport", "cli"]).unwrap();
        assert_eq!(cli.transport, Transport::Cli);

        assert!(Cli::try_parse_from(["lume-fleet", "down", "--transport", "grpc"]).is_err());
    }

    #[test]
    fn test_parse_destroy_flags() {
        let cli = Cli::try_parse_from(["lume-fleet", "destroy", "-f", "-n", "old"]).unwrap();
        match cli.command {
            Commands::Destroy(args) => {
                assert!(args.force);
                assert!(args.dry_run);
                assert_eq!(args.selection.names, vec!["old"]);
            }
            _ => panic!("expected destroy"),
        }
    }
}
