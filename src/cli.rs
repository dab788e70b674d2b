use clap::{Args, Parser, Subcommand};
use edgeconf::ServiceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edgeconf")]
#[command(version)]
#[command(about = "Plan and validate declared edge service configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the remote changes between two declarations
    Plan(PlanArgs),

    /// Check a declaration against the attribute schemas
    Validate(ValidateArgs),

    /// Print the registered attribute schemas
    Schema(SchemaArgs),
}

#[derive(Args)]
pub struct KindArg {
    /// Service kind: vcl or wasm
    #[arg(short, long, default_value = "vcl", env = "EDGECONF_SERVICE_KIND")]
    pub kind: ServiceKind,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub kind: KindArg,

    /// State recorded by the last read (TOML or JSON)
    pub old: PathBuf,

    /// New declaration (TOML or JSON)
    pub new: PathBuf,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub kind: KindArg,

    /// Declaration to validate (TOML or JSON)
    pub file: PathBuf,
}

#[derive(Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub kind: KindArg,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}
