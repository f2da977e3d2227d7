use anyhow::{bail, Result};
use clap::Args;
use mso_manifest::HttpManifestInspector;
use mso_reconcile::{
    reconcile, ReconcileOutcome, ReconcileRequest, DEFAULT_ENDPOINT_NAME, DEFAULT_FILTER_NAME,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::wire;

pub const DEFAULT_POLICY: &str = "Predefined_ClearStreamingOnly";

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Layered config paths in merge order
    #[arg(long = "config", required = true)]
    pub config_paths: Vec<String>,

    /// Asset name
    #[arg(long)]
    pub asset: String,

    /// Streaming locator name
    #[arg(long)]
    pub locator: String,

    /// Streaming policy used when the locator is recreated
    #[arg(long, default_value = DEFAULT_POLICY)]
    pub policy: String,

    /// Desired playback offset in seconds (<= 0 removes the offset)
    #[arg(long, allow_hyphen_values = true)]
    pub offset: i64,

    /// Asset filter name
    #[arg(long, default_value = DEFAULT_FILTER_NAME)]
    pub filter: String,

    /// Streaming endpoint name
    #[arg(long, default_value = DEFAULT_ENDPOINT_NAME)]
    pub endpoint: String,

    /// Run twice and fail unless both runs apply the same timestamp
    #[arg(long, default_value_t = false)]
    pub verify_idempotent: bool,

    /// Print the outcome as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub async fn run(args: ReconcileArgs, cancel: &CancellationToken) -> Result<()> {
    let wiring = wire(&args.config_paths)?;
    info!(
        account = %wiring.media.account_name,
        resource_group = %wiring.media.resource_group,
        config_hash = %wiring.config_hash,
        "config loaded"
    );

    let inspector = HttpManifestInspector::new();
    let req = ReconcileRequest::new(&args.asset, args.offset, &args.locator, &args.policy)
        .with_filter_name(&args.filter)
        .with_endpoint_name(&args.endpoint);

    let first = reconcile(&wiring.client, &inspector, &wiring.scope, &req, cancel).await?;
    print_outcome("first", &first, args.json)?;

    if !args.verify_idempotent {
        return Ok(());
    }

    let second = reconcile(&wiring.client, &inspector, &wiring.scope, &req, cancel).await?;
    print_outcome("second", &second, args.json)?;

    if first.timestamp() != second.timestamp() {
        bail!(
            "VALUES ARE NOT THE SAME: first={} second={}",
            first.timestamp(),
            second.timestamp()
        );
    }
    println!("Match");
    Ok(())
}

fn print_outcome(label: &str, outcome: &ReconcileOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }
    match outcome {
        ReconcileOutcome::LocatorNotFound => {
            println!("{label}: locator_not_found timestamp=0");
        }
        ReconcileOutcome::Applied(r) => {
            println!(
                "{label}: timestamp={} filter={:?} locator={:?} streaming_locator_id={}",
                r.timestamp,
                r.filter_action,
                r.locator_action,
                r.streaming_locator_id.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}
