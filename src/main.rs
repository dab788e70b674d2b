mod cli;
mod commands;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
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
    };

    match cli.command {
        Commands::Plan(args) => commands::plan::run(&ctx, args),
        Commands::Validate(args) => commands::validate::run(&ctx, args),
        Commands::Schema(args) => commands::schema::run(&ctx, args),
    }
}
