//! Offset reconciliation against the in-memory media account.
//!
//! GREEN when:
//! - offset=100s on a fresh locator creates the filter at 1_000_000_000
//!   ticks and recreates the locator with `[offsetFilter]` (scenario A).
//! - Repeating the call returns the same timestamp and issues no mutations
//!   (scenario B / idempotence).
//! - offset=0 after a prior run deletes the filter and recreates the locator
//!   filter-less, returning 0 (scenario C).
//! - A missing locator yields `LocatorNotFound` and no mutations (scenario D).
//! - The locator id survives every recreate.

use std::sync::Mutex;

use async_trait::async_trait;
use mso_manifest::{ManifestTiming, TimingSource};
use mso_media::{
    Asset, AssetFilter, CancellationToken, MediaError, MemoryMediaServices, Op,
    PresentationTimeRange, Scope, StreamingEndpoint, StreamingLocator, StreamingPath,
};
use mso_reconcile::*;

const ASSET: &str = "inputAsset-98fa6162ff5e4a9dbfc28fac1a3a0ebe";
const LOCATOR: &str = "streamingLocator-98fa6162ff5e4a9dbfc28fac1a3a0ebe";
const POLICY: &str = "Predefined_ClearStreamingOnly";
const LOCATOR_ID: &str = "5b8e2d4c-1f3a-4c6e-9d2b-7a1e0f3c5d9b";
const HOST: &str = "acct-usea.streaming.media.azure.net";

/// Timing source returning a fixed value and recording requested URLs.
struct FixedTiming {
    timing: ManifestTiming,
    urls: Mutex<Vec<String>>,
}

impl FixedTiming {
    fn new(timing: ManifestTiming) -> Self {
        Self {
            timing,
            urls: Mutex::new(Vec::new()),
        }
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimingSource for FixedTiming {
    async fn resolve_timing(&self, manifest_url: &str, _cancel: &CancellationToken) -> ManifestTiming {
        self.urls.lock().unwrap().push(manifest_url.to_string());
        self.timing
    }
}

fn scope() -> Scope {
    Scope::new("sub", "rg", "acct")
}

fn account(locator_filters: &[&str]) -> MemoryMediaServices {
    MemoryMediaServices::new()
        .with_asset(Asset::new(ASSET))
        .with_endpoint(StreamingEndpoint::new("default", HOST))
        .with_locator(
            StreamingLocator::new(LOCATOR, ASSET, POLICY)
                .with_id(LOCATOR_ID)
                .with_filters(locator_filters.iter().copied()),
        )
        .with_paths(
            LOCATOR,
            vec![
                StreamingPath::new("Hls", [format!("/{LOCATOR_ID}/video.ism/manifest(format=m3u8-cmaf)")]),
                StreamingPath::new("Dash", [format!("/{LOCATOR_ID}/video.ism/manifest(format=mpd-time-cmaf)")]),
            ],
        )
}

fn request(offset: i64) -> ReconcileRequest {
    ReconcileRequest::new(ASSET, offset, LOCATOR, POLICY)
}

async fn run(svc: &MemoryMediaServices, timing: &FixedTiming, offset: i64) -> ReconcileOutcome {
    reconcile(svc, timing, &scope(), &request(offset), &CancellationToken::new())
        .await
        .unwrap()
}

fn default_range(start: i64) -> PresentationTimeRange {
    PresentationTimeRange {
        start_timestamp: start,
        timescale: 10_000_000,
    }
}

// ============================================================================
// Scenarios A–D
// ============================================================================

#[tokio::test]
async fn scenario_a_positive_offset_creates_filter_and_recreates_locator() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming::default());

    let out = run(&svc, &timing, 100).await;

    assert_eq!(out.timestamp(), 1_000_000_000);
    assert_eq!(
        svc.filter(ASSET, DEFAULT_FILTER_NAME)
            .and_then(|f| f.presentation_time_range),
        Some(default_range(1_000_000_000))
    );
    let loc = svc.locator(LOCATOR).expect("locator recreated");
    assert_eq!(loc.filters, vec![DEFAULT_FILTER_NAME.to_string()]);
    assert_eq!(loc.streaming_locator_id.as_deref(), Some(LOCATOR_ID));
    assert_eq!(
        svc.ops(),
        vec![
            Op::UpsertFilter {
                asset: ASSET.to_string(),
                filter: DEFAULT_FILTER_NAME.to_string(),
                range: default_range(1_000_000_000),
            },
            Op::DeleteLocator {
                name: LOCATOR.to_string()
            },
            Op::CreateLocator {
                name: LOCATOR.to_string(),
                streaming_locator_id: Some(LOCATOR_ID.to_string()),
                filters: vec![DEFAULT_FILTER_NAME.to_string()],
            },
        ]
    );
    assert_eq!(
        timing.urls(),
        vec![format!("https://{HOST}/{LOCATOR_ID}/video.ism/manifest")]
    );
}

#[tokio::test]
async fn scenario_b_second_call_is_converged() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming::default());

    let first = run(&svc, &timing, 100).await;
    svc.clear_ops();
    let second = run(&svc, &timing, 100).await;

    assert_eq!(first.timestamp(), 1_000_000_000);
    assert_eq!(second.timestamp(), first.timestamp());
    assert!(svc.ops().is_empty(), "second call mutated: {:?}", svc.ops());
    let report = second.report().unwrap();
    assert_eq!(report.filter_action, FilterAction::Leave);
    assert_eq!(report.locator_action, LocatorAction::Keep);
}

#[tokio::test]
async fn scenario_c_zero_offset_removes_prior_filter() {
    let svc = account(&[DEFAULT_FILTER_NAME]).with_filter(
        ASSET,
        AssetFilter::new(DEFAULT_FILTER_NAME, default_range(1_000_000_000)),
    );
    let timing = FixedTiming::new(ManifestTiming::default());

    let out = run(&svc, &timing, 0).await;

    assert_eq!(out.timestamp(), 0);
    assert!(svc.filter(ASSET, DEFAULT_FILTER_NAME).is_none());
    let loc = svc.locator(LOCATOR).expect("locator recreated");
    assert!(loc.filters.is_empty());
    assert_eq!(loc.streaming_locator_id.as_deref(), Some(LOCATOR_ID));
    assert_eq!(
        svc.ops(),
        vec![
            Op::DeleteFilter {
                asset: ASSET.to_string(),
                filter: DEFAULT_FILTER_NAME.to_string(),
            },
            Op::DeleteLocator {
                name: LOCATOR.to_string()
            },
            Op::CreateLocator {
                name: LOCATOR.to_string(),
                streaming_locator_id: Some(LOCATOR_ID.to_string()),
                filters: vec![],
            },
        ]
    );
    assert!(timing.urls().is_empty(), "no manifest read for zero offset");
}

#[tokio::test]
async fn scenario_d_missing_locator_is_noop() {
    let svc = MemoryMediaServices::new()
        .with_asset(Asset::new(ASSET))
        .with_endpoint(StreamingEndpoint::new("default", HOST));
    let timing = FixedTiming::new(ManifestTiming::default());

    let out = run(&svc, &timing, 100).await;

    assert_eq!(out, ReconcileOutcome::LocatorNotFound);
    assert_eq!(out.timestamp(), 0);
    assert!(svc.ops().is_empty());
    assert!(timing.urls().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn offset_formula_uses_manifest_timing() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming {
        timescale: 90_000,
        first_offset_marker: 123_456,
    });

    let out = run(&svc, &timing, 37).await;

    assert_eq!(out.timestamp(), 37 * 90_000 + 123_456);
    let range = svc
        .filter(ASSET, DEFAULT_FILTER_NAME)
        .and_then(|f| f.presentation_time_range)
        .unwrap();
    assert_eq!(range.timescale, 90_000);
    assert_eq!(range.start_timestamp, 37 * 90_000 + 123_456);
}

#[tokio::test]
async fn negative_offset_behaves_like_zero() {
    let seeded = || {
        account(&[DEFAULT_FILTER_NAME]).with_filter(
            ASSET,
            AssetFilter::new(DEFAULT_FILTER_NAME, default_range(5)),
        )
    };
    let timing = FixedTiming::new(ManifestTiming::default());

    let neg = seeded();
    let zero = seeded();
    let a = run(&neg, &timing, -42).await;
    let b = run(&zero, &timing, 0).await;

    assert_eq!(a, b);
    assert_eq!(neg.ops(), zero.ops());
}

#[tokio::test]
async fn zero_offset_with_stale_reference_recreates_locator() {
    // Filter already gone, but the locator still names it (any case).
    let svc = account(&["OFFSETFILTER"]);
    let timing = FixedTiming::new(ManifestTiming::default());

    run(&svc, &timing, 0).await;

    assert!(svc.locator(LOCATOR).unwrap().filters.is_empty());
    assert!(svc
        .ops()
        .iter()
        .all(|op| !matches!(op, Op::DeleteFilter { .. })));
}

#[tokio::test]
async fn zero_offset_converged_is_noop() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming::default());

    let out = run(&svc, &timing, 0).await;

    assert_eq!(out.timestamp(), 0);
    assert!(svc.ops().is_empty());
}

#[tokio::test]
async fn offset_change_updates_filter_without_locator_recreate() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming::default());

    run(&svc, &timing, 100).await;
    svc.clear_ops();
    let out = run(&svc, &timing, 30).await;

    assert_eq!(out.timestamp(), 300_000_000);
    assert_eq!(
        svc.ops(),
        vec![Op::UpsertFilter {
            asset: ASSET.to_string(),
            filter: DEFAULT_FILTER_NAME.to_string(),
            range: default_range(300_000_000),
        }]
    );
}

#[tokio::test]
async fn locator_id_survives_round_trip_of_offsets() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming::default());

    for offset in [100, 0, 100, -1, 5] {
        run(&svc, &timing, offset).await;
        assert_eq!(
            svc.locator(LOCATOR).unwrap().streaming_locator_id.as_deref(),
            Some(LOCATOR_ID)
        );
    }
}

#[tokio::test]
async fn no_streaming_paths_uses_default_timing() {
    let svc = account(&[]).with_paths(LOCATOR, vec![StreamingPath::new("Hls", Vec::<String>::new())]);
    let timing = FixedTiming::new(ManifestTiming {
        timescale: 1,
        first_offset_marker: 1,
    });

    let out = run(&svc, &timing, 100).await;

    assert_eq!(out.timestamp(), 100 * 10_000_000);
    assert!(timing.urls().is_empty());
    assert_eq!(out.report().unwrap().manifest_url, None);
}

#[tokio::test]
async fn custom_filter_and_endpoint_names() {
    let svc = account(&[]).with_endpoint(StreamingEndpoint::new("premium", "premium.example.net"));
    let timing = FixedTiming::new(ManifestTiming::default());
    let req = request(10)
        .with_filter_name("introSkip")
        .with_endpoint_name("premium");

    reconcile(&svc, &timing, &scope(), &req, &CancellationToken::new())
        .await
        .unwrap();

    assert!(svc.filter(ASSET, "introSkip").is_some());
    assert_eq!(svc.locator(LOCATOR).unwrap().filters, vec!["introSkip".to_string()]);
    assert!(timing.urls()[0].starts_with("https://premium.example.net/"));
}

// ============================================================================
// Error policy
// ============================================================================

#[tokio::test]
async fn missing_asset_is_fatal() {
    let svc = MemoryMediaServices::new()
        .with_endpoint(StreamingEndpoint::new("default", HOST))
        .with_locator(StreamingLocator::new(LOCATOR, ASSET, POLICY));
    let timing = FixedTiming::new(ManifestTiming::default());

    let err = reconcile(&svc, &timing, &scope(), &request(100), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not found"));
    assert!(svc.ops().is_empty());
}

#[tokio::test]
async fn missing_endpoint_is_fatal() {
    let svc = account(&[]).with_endpoint(StreamingEndpoint::new("other", HOST));
    let timing = FixedTiming::new(ManifestTiming::default());
    let req = request(100).with_endpoint_name("absent");

    let err = reconcile(&svc, &timing, &scope(), &req, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("streaming endpoint 'absent' not found"));
    assert!(svc.ops().is_empty());
}

#[tokio::test]
async fn endpoint_transport_failure_is_fatal() {
    let svc = account(&[]);
    svc.fail_endpoint_get();
    let timing = FixedTiming::new(ManifestTiming::default());

    let err = reconcile(&svc, &timing, &scope(), &request(100), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MediaError>(),
        Some(MediaError::Network(_))
    ));
}

#[tokio::test]
async fn filter_delete_failure_is_absorbed() {
    let svc = account(&[]).with_filter(
        ASSET,
        AssetFilter::new(DEFAULT_FILTER_NAME, default_range(5)),
    );
    svc.fail_filter_delete();
    let timing = FixedTiming::new(ManifestTiming::default());

    let out = run(&svc, &timing, 0).await;

    assert_eq!(out.timestamp(), 0);
    // Locator did not reference the filter, so nothing else happens.
    assert!(svc.ops().is_empty());
}

#[tokio::test]
async fn filter_delete_failure_still_clears_referencing_locator() {
    let svc = account(&[DEFAULT_FILTER_NAME]).with_filter(
        ASSET,
        AssetFilter::new(DEFAULT_FILTER_NAME, default_range(5)),
    );
    svc.fail_filter_delete();
    let timing = FixedTiming::new(ManifestTiming::default());

    let out = run(&svc, &timing, 0).await;

    assert_eq!(out.timestamp(), 0);
    assert_eq!(
        svc.ops(),
        vec![
            Op::DeleteLocator {
                name: LOCATOR.to_string(),
            },
            Op::CreateLocator {
                name: LOCATOR.to_string(),
                streaming_locator_id: Some(LOCATOR_ID.to_string()),
                filters: vec![],
            },
        ]
    );
    let loc = svc.locator(LOCATOR).unwrap();
    assert!(loc.filters.is_empty());
    assert_eq!(loc.streaming_locator_id.as_deref(), Some(LOCATOR_ID));
    // The filter itself survives the failed delete.
    assert!(svc.filter(ASSET, DEFAULT_FILTER_NAME).is_some());
}

#[tokio::test]
async fn interrupted_replace_is_surfaced() {
    let svc = account(&[]);
    svc.fail_next_locator_create();
    let timing = FixedTiming::new(ManifestTiming::default());

    let err = reconcile(&svc, &timing, &scope(), &request(100), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MediaError>(),
        Some(MediaError::ReplaceInterrupted { .. })
    ));
    assert!(svc.locator(LOCATOR).is_none(), "locator left deleted");
}

#[tokio::test]
async fn cancelled_reconcile_issues_no_mutations() {
    let svc = account(&[]);
    let timing = FixedTiming::new(ManifestTiming::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = reconcile(&svc, &timing, &scope(), &request(100), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MediaError>(),
        Some(MediaError::Cancelled)
    ));
    assert!(svc.ops().is_empty());
}
