mod config;
mod cspell;
mod error;
mod extract;
mod github;
mod members;
mod persist;
mod wordlist;
mod workflows;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use crate::config::{Config, ConfigOverrides, OutputFormat};
use crate::extract::ExtractionPolicy;
use crate::workflows::{RunContext, SyncOutcome, run_local_flow, run_remote_flow};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Add organization member names to a cspell ignore list"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Optional path to a configuration TOML file overriding defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// How words are derived from member handles or names
    #[arg(long, value_enum)]
    policy: Option<ExtractionPolicy>,

    /// cspell configuration file to read existing words from
    #[arg(long)]
    cspell: Option<PathBuf>,

    /// Write the result here instead of back into the cspell file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output file format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Override the GitHub API base URL
    #[arg(long = "api-url")]
    api_url: Option<String>,

    /// Show the words that would be added without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Ask before writing
    #[arg(long)]
    confirm: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read members from a local JSON snapshot
    Local(LocalArgs),
    /// Fetch members of a GitHub organization
    Remote(RemoteArgs),
    /// Print the words extracted from the given handles
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
struct LocalArgs {
    /// Members JSON file (defaults to MEMBERS_FILE or members.json)
    #[arg(short, long)]
    members: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RemoteArgs {
    /// Organization to list (defaults to GITHUB_ORG)
    #[arg(long)]
    org: Option<String>,

    /// Also save the fetched members to this JSON file
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Login handles or display names
    #[arg(name = "HANDLE", required = true)]
    handles: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("{err:#}");
    }

    if let Err(err) = run(cli).await {
        tracing::error!("{err:#}");
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow::anyhow!("Failed to set tracing subscriber: {err}"))
}

async fn run(cli: Cli) -> Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let (members_file, org) = match &cli.command {
        Command::Local(args) => (args.members.clone(), None),
        Command::Remote(args) => (None, args.org.clone()),
        Command::Extract(_) => (None, None),
    };

    let overrides = ConfigOverrides {
        github_org: org,
        github_api_url: cli.api_url.clone(),
        members_file,
        cspell_file: cli.cspell.clone(),
        output_file: cli.output.clone(),
        output_format: cli.format,
        policy: cli.policy,
    };

    let config = Config::load(cli.config.clone(), overrides)?;

    let run_ctx = RunContext {
        config: &config,
        dry_run: cli.dry_run,
        confirm: cli.confirm,
    };

    tracing::info!("Starting the cspell update process...");
    let outcome = match cli.command {
        Command::Local(_) => run_local_flow(&config.members_file, &run_ctx)?,
        Command::Remote(args) => run_remote_flow(args.snapshot.as_deref(), &run_ctx).await?,
        Command::Extract(args) => {
            workflows::print_extracted(&args.handles, config.policy);
            return Ok(());
        }
    };

    if let SyncOutcome::Written { path, .. } = &outcome {
        tracing::info!("{} updated successfully.", path.display());
    } else {
        tracing::debug!("Finished without writing: {:?}", outcome);
    }

    Ok(())
}
