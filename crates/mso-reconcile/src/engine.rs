use mso_manifest::ManifestTiming;
use mso_media::{AssetFilter, PresentationTimeRange, StreamingLocator};

use crate::{FilterAction, LocatorAction, ReconcilePlan};

/// Negative offsets are treated as "no offset".
pub fn clamp_offset(offset_seconds: i64) -> i64 {
    offset_seconds.max(0)
}

/// `offset * timescale + first_offset_marker` does not fit in `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestampOverflow {
    pub offset_seconds: i64,
    pub timing: ManifestTiming,
}

impl std::fmt::Display for TimestampOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "filter timestamp overflows i64: offset={}s timescale={} first_offset_marker={}",
            self.offset_seconds, self.timing.timescale, self.timing.first_offset_marker
        )
    }
}

impl std::error::Error for TimestampOverflow {}

/// Decide the filter and locator mutations for one reconciliation.
///
/// - `offset_seconds` is clamped to >= 0.
/// - `existing_filter` is the current remote filter, `None` if absent.
/// - `timing` is only consulted for a positive offset.
///
/// No offset:
/// - filter exists: delete it; replace the locator (filter-less) if it
///   references any filter at all.
/// - filter absent: replace the locator only if it still references
///   `filter_name`.
///
/// Positive offset:
/// - upsert the filter unless it already carries exactly the computed range.
/// - replace the locator with `[filter_name]` unless it already references it.
pub fn plan(
    offset_seconds: i64,
    locator: &StreamingLocator,
    existing_filter: Option<&AssetFilter>,
    filter_name: &str,
    timing: ManifestTiming,
) -> Result<ReconcilePlan, TimestampOverflow> {
    let offset_seconds = clamp_offset(offset_seconds);

    if offset_seconds == 0 {
        let (filter_action, recreate) = match existing_filter {
            Some(_) => (FilterAction::Delete, !locator.filters.is_empty()),
            None => (FilterAction::Leave, locator.references_filter(filter_name)),
        };
        return Ok(ReconcilePlan {
            timestamp: 0,
            filter_action,
            locator_action: if recreate {
                LocatorAction::Replace {
                    filters: Vec::new(),
                }
            } else {
                LocatorAction::Keep
            },
        });
    }

    let timestamp = timing
        .timestamp_at(offset_seconds)
        .ok_or(TimestampOverflow {
            offset_seconds,
            timing,
        })?;
    let range = PresentationTimeRange {
        start_timestamp: timestamp,
        timescale: timing.timescale,
    };

    let already_applied = existing_filter
        .and_then(|f| f.presentation_time_range)
        .map(|r| r == range)
        .unwrap_or(false);
    let filter_action = if already_applied {
        FilterAction::Leave
    } else {
        FilterAction::Upsert(range)
    };

    let locator_action = if locator.references_filter(filter_name) {
        LocatorAction::Keep
    } else {
        LocatorAction::Replace {
            filters: vec![filter_name.to_string()],
        }
    };

    Ok(ReconcilePlan {
        timestamp,
        filter_action,
        locator_action,
    })
}
