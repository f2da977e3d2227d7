use anyhow::{Context, Result};
use mso_manifest::{manifest_url, ManifestTiming, TimingSource};
use mso_media::{
    first_streaming_path, AssetFilter, CancellationToken, MediaError, MediaServices, Scope,
    StreamingLocator,
};
use tracing::{debug, info, warn};

use crate::engine::{clamp_offset, plan};
use crate::{FilterAction, LocatorAction, ReconcileOutcome, ReconcileReport, ReconcileRequest};

/// Drive the asset filter and streaming locator to the state implied by
/// `req.offset_seconds`.
///
/// Calls are issued strictly one after another. The remote API is the only
/// source of truth; nothing is cached between calls.
///
/// # Errors
/// - asset or streaming endpoint missing, or their fetch failing
/// - listing paths, upserting the filter, or replacing the locator failing
/// - cancellation at any point
///
/// A missing locator is not an error: it yields
/// [`ReconcileOutcome::LocatorNotFound`] and no mutations.
pub async fn reconcile(
    client: &dyn MediaServices,
    timing_source: &dyn TimingSource,
    scope: &Scope,
    req: &ReconcileRequest,
    cancel: &CancellationToken,
) -> Result<ReconcileOutcome> {
    let offset = clamp_offset(req.offset_seconds);
    if offset != req.offset_seconds {
        debug!(requested = req.offset_seconds, "negative offset clamped to 0");
    }

    client
        .get_asset(scope, &req.asset_name, cancel)
        .await
        .with_context(|| format!("fetch asset '{}'", req.asset_name))?
        .with_context(|| format!("asset '{}' not found", req.asset_name))?;

    let Some(locator) = client
        .get_streaming_locator(scope, &req.locator_name, cancel)
        .await
        .with_context(|| format!("fetch streaming locator '{}'", req.locator_name))?
    else {
        warn!(
            locator = %req.locator_name,
            "streaming locator not found; nothing to reconcile"
        );
        return Ok(ReconcileOutcome::LocatorNotFound);
    };

    let endpoint = client
        .get_streaming_endpoint(scope, &req.endpoint_name, cancel)
        .await
        .with_context(|| format!("fetch streaming endpoint '{}'", req.endpoint_name))?
        .with_context(|| format!("streaming endpoint '{}' not found", req.endpoint_name))?;

    let mut timing: Option<ManifestTiming> = None;
    let mut manifest: Option<String> = None;

    if offset > 0 {
        let paths = client
            .list_paths(scope, &req.locator_name, cancel)
            .await
            .with_context(|| format!("list paths for locator '{}'", req.locator_name))?;

        manifest = first_streaming_path(&paths).map(|p| manifest_url(&endpoint.host_name, p));
        timing = Some(match &manifest {
            Some(url) => timing_source.resolve_timing(url, cancel).await,
            None => {
                warn!(
                    locator = %req.locator_name,
                    "locator has no streaming paths; using default timing"
                );
                ManifestTiming::default()
            }
        });
    }

    let existing = lookup_filter(client, scope, req, cancel).await?;

    let mut decided = plan(
        offset,
        &locator,
        existing.as_ref(),
        &req.filter_name,
        timing.unwrap_or_default(),
    )?;
    debug!(?decided, "reconcile plan");

    match decided.filter_action.clone() {
        FilterAction::Leave => {}
        FilterAction::Delete => {
            match client
                .delete_asset_filter(scope, &req.asset_name, &req.filter_name, cancel)
                .await
            {
                Ok(()) => info!(filter = %req.filter_name, "asset filter deleted"),
                Err(e) if e.is_cancelled() => {
                    return Err(e).context("delete asset filter");
                }
                Err(e) => {
                    warn!(
                        filter = %req.filter_name,
                        error = %e,
                        "asset filter delete failed; treating filter as absent"
                    );
                    decided = plan(
                        offset,
                        &locator,
                        None,
                        &req.filter_name,
                        ManifestTiming::default(),
                    )?;
                }
            }
        }
        FilterAction::Upsert(range) => {
            client
                .create_or_update_asset_filter(
                    scope,
                    &req.asset_name,
                    &req.filter_name,
                    range,
                    cancel,
                )
                .await
                .with_context(|| format!("create or update asset filter '{}'", req.filter_name))?;
            info!(
                filter = %req.filter_name,
                start_timestamp = range.start_timestamp,
                timescale = range.timescale,
                "asset filter applied"
            );
        }
    }

    let mut streaming_locator_id = locator.streaming_locator_id.clone();
    if let LocatorAction::Replace { filters } = &decided.locator_action {
        let next = StreamingLocator {
            name: locator.name.clone(),
            asset_name: req.asset_name.clone(),
            streaming_policy_name: req.policy_name.clone(),
            streaming_locator_id: locator.streaming_locator_id.clone(),
            filters: filters.clone(),
        };
        let created = client
            .replace_streaming_locator(scope, &next, cancel)
            .await
            .with_context(|| format!("replace streaming locator '{}'", locator.name))?;
        info!(
            locator = %created.name,
            filters = ?created.filters,
            "streaming locator recreated"
        );
        streaming_locator_id = created.streaming_locator_id;
    }

    Ok(ReconcileOutcome::Applied(ReconcileReport {
        timestamp: decided.timestamp,
        timing,
        manifest_url: manifest,
        filter_action: decided.filter_action,
        locator_action: decided.locator_action,
        streaming_locator_id,
    }))
}

/// Current filter, or `None` when absent.
///
/// A failed lookup (other than cancellation) is logged and treated as absent:
/// with no offset that means nothing to delete, with an offset it means the
/// filter is (re)written.
async fn lookup_filter(
    client: &dyn MediaServices,
    scope: &Scope,
    req: &ReconcileRequest,
    cancel: &CancellationToken,
) -> Result<Option<AssetFilter>> {
    match client
        .get_asset_filter(scope, &req.asset_name, &req.filter_name, cancel)
        .await
    {
        Ok(f) => Ok(f),
        Err(MediaError::Cancelled) => Err(MediaError::Cancelled).context("fetch asset filter"),
        Err(e) => {
            warn!(
                filter = %req.filter_name,
                error = %e,
                "asset filter lookup failed; treating filter as absent"
            );
            Ok(None)
        }
    }
}
