//! StackExchange Backup main entry point
//!
//! This is the command-line interface for the personal Stack Exchange backup.

use anyhow::Context;
use clap::Parser;
use stackexchange_backup::archive::{ObjectStore, S3Store};
use stackexchange_backup::cache::open_cache;
use stackexchange_backup::config::{load_config, load_from_env, Config};
use stackexchange_backup::output::print_statistics;
use stackexchange_backup::pipeline::{CodePrompt, Coordinator, RunOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// StackExchange Backup: archive your answers, questions and comments
///
/// Authenticates against the Stack Exchange API, exports your activity on
/// every site you belong to as JSON, and packages the run into a zip
/// archive mirrored to S3-compatible storage.
#[derive(Parser, Debug)]
#[command(name = "stackexchange-backup")]
#[command(version)]
#[command(about = "Back up your Stack Exchange activity", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults + environment when omitted)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Authorization code, or the full redirect URL containing it
    #[arg(long, value_name = "CODE")]
    code: Option<String>,

    /// Clear the cached code, token and responses before running
    #[arg(long)]
    flush_cache: bool,

    /// Build the archive but do not upload it
    #[arg(long)]
    skip_upload: bool,

    /// Reuse an explicit run folder name instead of the current time
    #[arg(long, value_name = "TS")]
    run_timestamp: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Prints the consent URL and reads the code from stdin
struct StdinPrompt;

impl CodePrompt for StdinPrompt {
    fn ask(&mut self, authorization_url: &str) -> io::Result<String> {
        println!("Open this URL in a browser and approve access:\n");
        println!("  {}\n", authorization_url);
        print!("Paste the code (or the URL you were redirected to): ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    let cache = open_cache(config.output.cache_path.as_deref().map(Path::new))
        .context("Failed to open cache")?;

    let remote: Option<Arc<dyn ObjectStore>> = match &config.remote {
        Some(remote) => {
            let store = S3Store::from_config(remote).context("Failed to set up remote storage")?;
            tracing::info!("Mirroring to {}", store.describe());
            Some(Arc::new(store))
        }
        None => {
            tracing::info!("No [remote] section configured, running local-only");
            None
        }
    };

    let options = RunOptions {
        code: cli.code,
        flush_cache: cli.flush_cache,
        skip_upload: cli.skip_upload,
        run_timestamp: cli.run_timestamp,
    };

    let mut coordinator = Coordinator::new(config, cache, remote, options)?;
    let stats = coordinator
        .run(&mut StdinPrompt)
        .await
        .context("Backup run failed")?;

    if !cli.quiet {
        println!();
        print_statistics(&stats);
    }

    Ok(())
}

fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            tracing::info!("No configuration file given, using defaults and environment");
            load_from_env().context("Invalid configuration")
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stackexchange_backup=info,warn"),
            1 => EnvFilter::new("stackexchange_backup=debug,info"),
            2 => EnvFilter::new("stackexchange_backup=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(io::stderr)
        .init();
}
