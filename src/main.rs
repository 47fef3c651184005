mod cli;
mod commands;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use lume::ConnectOptions;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Explicit config path from `--config` / `LUME_FLEET_CONFIG`
    pub config: Option<String>,
    pub connect: ConnectOptions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        connect: ConnectOptions {
            transport: cli.transport,
            api_url: cli.api_url,
            lume_bin: cli.lume_bin,
        },
    };

    match cli.command {
        Commands::Up(args) => commands::up::run(&ctx, args),
        Commands::Down(args) => commands::down::run(&ctx, args),
        Commands::Destroy(args) => commands::destroy::run(&ctx, args),
        Commands::Status(args) => commands::status::run(&ctx, args),
        Commands::Validate => commands::validate::run(&ctx),
        Commands::Version => {
            println!("lume-fleet {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "lume-fleet", &mut io::stdout());
            Ok(())
        }
    }
}
