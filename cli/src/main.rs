//! CLI for gitup.
//!
//! Mirrors every repository of a GitLab or GitHub account into a local tree,
//! or forks batches of GitLab repositories between groups.

use clap::{Args as ClapArgs, Parser, Subcommand};
use gitup::{load_forks, Config, ForkConfig, RunSummary, Runner, RunnerConfig, RunnerError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Workers used when neither the command line nor the config file sets one.
const DEFAULT_CONCURRENCY: usize = 10;

/// gitup - Bulk sync and fork of hosted git repositories.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file.
    #[arg(long, short, global = true, default_value = "gitup.toml")]
    config: PathBuf,

    /// Number of repositories processed at once.
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Access token (overrides repo.token).
    #[arg(long, global = true, env = "GITUP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clone or update every selected repository under the configured cwd.
    Sync {
        /// Only sync these groups (repeatable, overrides sync.groups).
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Keep bare mirrors (overrides sync.bare).
        #[arg(long)]
        bare: bool,
    },

    /// Fork repositories from one group into another.
    Fork(ForkArgs),
}

#[derive(ClapArgs, Debug)]
struct ForkArgs {
    /// File of [[fork]] requests, used instead of the config file's list.
    #[arg(long, conflicts_with = "from_group")]
    forks: Option<PathBuf>,

    /// Source group of a single request.
    #[arg(long, requires = "from_repo")]
    from_group: Option<String>,

    /// Source repository (repeatable).
    #[arg(long = "from-repo")]
    from_repo: Vec<String>,

    /// Destination group.
    #[arg(long)]
    to_group: Option<String>,

    /// New name, parallel to --from-repo (repeatable).
    #[arg(long = "to-repo")]
    to_repo: Vec<String>,

    /// Remove the fork relationship after forking.
    #[arg(long)]
    rm_fork_relation: bool,
}

impl ForkArgs {
    /// Single request given on the command line, if any.
    fn request(&self) -> Option<ForkConfig> {
        let from_group = self.from_group.clone()?;
        Some(ForkConfig {
            from_group,
            from_repos: self.from_repo.clone(),
            to_group: self.to_group.clone(),
            to_repos: self.to_repo.clone(),
            rm_fork_relation: self.rm_fork_relation,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.debug);

    // Run the main logic
    match run(args).await {
        Ok(summary) => {
            print_summary(&summary);

            if summary.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::from(0)
            }
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info", or
///   "debug" with `--debug`)
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = if debug {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(filter)
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<RunSummary, RunnerError> {
    let config = Config::load(&args.config)?;
    let runner_config =
        RunnerConfig::from_config(&config, args.token, args.concurrency, DEFAULT_CONCURRENCY)?;
    let runner = Runner::new(runner_config)?;

    let result = match args.command {
        Command::Sync { groups, bare } => {
            let mut sync = config.sync.clone();
            if !groups.is_empty() {
                sync.groups = groups;
            }
            sync.bare |= bare;
            Ok(runner.run_sync(&sync).await)
        }
        Command::Fork(fork) => {
            let requests = match (&fork.forks, fork.request()) {
                (Some(path), _) => load_forks(path)?,
                (None, Some(request)) => vec![request],
                (None, None) => config.fork.clone(),
            };
            if requests.is_empty() {
                warn!("No fork requests given");
            }
            runner.run_fork(&requests).await
        }
    };

    runner.shutdown().await;
    result
}

/// Prints the final run summary.
fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!("  Submitted: {}", summary.submitted);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped: {}", summary.skipped);
}
