//! weapon-roster CLI
//!
//! Sweeps every eligible weapon, refine, optimizer variant and main-stat
//! combo for one character and writes the result table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use weapon_roster::runner::CancelToken;
use weapon_roster::sweep::{self, SweepOptions, SweepStatus};

#[derive(Debug, Parser)]
#[command(name = "weapon-roster", version, about)]
struct Args {
    /// App root (default: search upwards for input/weapon_roster/roster_config.json).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Roster config file (default: <root>/input/weapon_roster/roster_config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the example inputs from input/weapon_roster/examples.
    #[arg(long)]
    examples: bool,

    /// Only run (weapon, refine) pairs missing from the base table.
    #[arg(long)]
    skip_existing: bool,

    /// On conflicts keep whichever result scores higher.
    #[arg(long)]
    keep_better: bool,

    /// Output table path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Base table to resume from.
    #[arg(long)]
    base: Option<PathBuf>,
}

impl From<Args> for SweepOptions {
    fn from(args: Args) -> Self {
        Self {
            root: args.root,
            config: args.config,
            use_examples: args.examples,
            skip_existing: args.skip_existing,
            keep_better: args.keep_better,
            output: args.output,
            base: args.base,
        }
    }
}

/// Cancels `token` on the first Ctrl+C.
fn spawn_interrupt_watcher(token: CancelToken) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "cannot install Ctrl+C handler");
                return;
            }
        };
        runtime.block_on(async {
            if signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
                token.cancel();
            }
        });
    });
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let token = CancelToken::new();
    spawn_interrupt_watcher(token.clone());

    match sweep::run(&SweepOptions::from(args), &token) {
        Ok(report) => {
            match &report.status {
                SweepStatus::Completed => {}
                SweepStatus::Canceled => info!("sweep canceled; partial results were exported"),
                SweepStatus::SourcesNotReady(_) => {
                    info!("acquisition sources need attention; nothing was run");
                }
            }
            if let Some(path) = &report.output {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
