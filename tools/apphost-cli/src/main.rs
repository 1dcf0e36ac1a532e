//! apphost CLI - run resident applications from a host configuration.
//!
//! Commands:
//! - `apphost run` - Build, start and keep applications resident until Ctrl-C
//! - `apphost resolve` - Resolve a symbol through one application's chain
//! - `apphost config` - Manage configuration

mod commands;
mod context;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, ResolveArgs, RunArgs};

/// apphost - Host resident applications with per-instance class loaders
#[derive(Parser)]
#[command(name = "apphost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run applications until interrupted
    Run(RunArgs),

    /// Resolve a symbol through an application's class loaders
    Resolve(ResolveArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);
    let output = output::Output::new(cli.verbose, cli.json);

    if let Err(e) = execute(cli, output.clone()).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn execute(cli: Cli, output: output::Output) -> Result<()> {
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &ctx).await,
        Commands::Resolve(args) => commands::resolve::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    }
}
