//! `mso` entry point.
//!
//! Thin driver: loads config once, wires the ARM client and manifest
//! inspector, and hands literal names plus an offset to the reconciler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use commands::ReconcileArgs;

#[derive(Parser)]
#[command(name = "mso")]
#[command(about = "Manifest-offset filter reconciliation for streaming locators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Apply an offset filter to a streaming locator
    Reconcile(ReconcileArgs),

    /// Print the timescale and first segment tick read from a manifest URL
    Timing {
        /// Manifest URL (e.g. https://host/<id>/video.ism/manifest)
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let cancel = cancel_on_ctrl_c();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mso_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
        Commands::Reconcile(args) => commands::reconcile::run(args, &cancel).await?,
        Commands::Timing { url } => commands::timing(&url, &cancel).await?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Token cancelled on the first Ctrl-C. In-flight remote calls abort.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling");
            trigger.cancel();
        }
    });
    token
}
