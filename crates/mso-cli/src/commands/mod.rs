//! Command handler modules for mso-cli.
//!
//! Shared wiring used by multiple commands lives here.

pub mod reconcile;

use std::sync::Arc;

use anyhow::{Context, Result};
use mso_config::{resolve_secrets, MediaConfig};
use mso_manifest::{HttpManifestInspector, TimingSource};
use mso_media::{ArmMediaClient, Scope, StaticTokenProvider, TokenProvider};
use tokio_util::sync::CancellationToken;

pub use reconcile::ReconcileArgs;

/// Everything a reconcile run needs, built once from config.
pub struct Wiring {
    pub media: MediaConfig,
    pub config_hash: String,
    pub scope: Scope,
    pub client: ArmMediaClient,
}

/// Load layered config, resolve secrets, and build the ARM client.
pub fn wire(config_paths: &[String]) -> Result<Wiring> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = mso_config::load_layered_yaml(&path_refs)?;
    let media = MediaConfig::from_config_json(&loaded.config_json)?;
    let secrets = resolve_secrets(&media)?;

    let tokens: Arc<dyn TokenProvider> = Arc::new(
        StaticTokenProvider::new(secrets.arm_token).context("invalid management API token")?,
    );
    let client = ArmMediaClient::new(media.arm_endpoint.clone(), tokens)
        .context("build management API client")?;
    let scope = Scope::new(
        media.subscription_id.clone(),
        media.resource_group.clone(),
        media.account_name.clone(),
    );

    Ok(Wiring {
        media,
        config_hash: loaded.config_hash,
        scope,
        client,
    })
}

pub async fn timing(url: &str, cancel: &CancellationToken) -> Result<()> {
    let timing = HttpManifestInspector::new().resolve_timing(url, cancel).await;
    println!(
        "timescale={} first_offset_marker={}",
        timing.timescale, timing.first_offset_marker
    );
    Ok(())
}
