use mso_manifest::ManifestTiming;
use mso_media::PresentationTimeRange;
use serde::Serialize;

pub const DEFAULT_FILTER_NAME: &str = "offsetFilter";
pub const DEFAULT_ENDPOINT_NAME: &str = "default";

/// One desired-offset reconciliation against a named locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub asset_name: String,
    /// Desired playback start in seconds. Negative values mean "no offset".
    pub offset_seconds: i64,
    pub locator_name: String,
    pub policy_name: String,
    pub filter_name: String,
    pub endpoint_name: String,
}

impl ReconcileRequest {
    pub fn new(
        asset_name: impl Into<String>,
        offset_seconds: i64,
        locator_name: impl Into<String>,
        policy_name: impl Into<String>,
    ) -> Self {
        Self {
            asset_name: asset_name.into(),
            offset_seconds,
            locator_name: locator_name.into(),
            policy_name: policy_name.into(),
            filter_name: DEFAULT_FILTER_NAME.to_string(),
            endpoint_name: DEFAULT_ENDPOINT_NAME.to_string(),
        }
    }

    pub fn with_filter_name(mut self, filter_name: impl Into<String>) -> Self {
        self.filter_name = filter_name.into();
        self
    }

    pub fn with_endpoint_name(mut self, endpoint_name: impl Into<String>) -> Self {
        self.endpoint_name = endpoint_name.into();
        self
    }
}

/// What happens to the asset filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FilterAction {
    /// Filter already matches (or is already absent).
    Leave,
    Delete,
    Upsert(PresentationTimeRange),
}

/// What happens to the streaming locator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LocatorAction {
    Keep,
    /// Delete and recreate with this exact filter list, carrying the id forward.
    Replace { filters: Vec<String> },
}

/// Output of the pure decision engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub timestamp: i64,
    pub filter_action: FilterAction,
    pub locator_action: LocatorAction,
}

impl ReconcilePlan {
    /// True when applying this plan issues no create/delete calls.
    pub fn is_converged(&self) -> bool {
        self.filter_action == FilterAction::Leave && self.locator_action == LocatorAction::Keep
    }
}

/// What a reconciliation applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Applied filter start in manifest ticks; 0 for the no-offset case.
    pub timestamp: i64,
    /// Timing used for the positive-offset case.
    pub timing: Option<ManifestTiming>,
    pub manifest_url: Option<String>,
    pub filter_action: FilterAction,
    pub locator_action: LocatorAction,
    pub streaming_locator_id: Option<String>,
}

/// Result of [`crate::reconcile`].
///
/// A missing locator is reported explicitly rather than as a zero timestamp,
/// so "setup missing" stays distinguishable from "no offset applied".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ReconcileOutcome {
    LocatorNotFound,
    Applied(ReconcileReport),
}

impl ReconcileOutcome {
    /// Applied timestamp, or 0 when there was nothing to reconcile.
    pub fn timestamp(&self) -> i64 {
        match self {
            ReconcileOutcome::LocatorNotFound => 0,
            ReconcileOutcome::Applied(r) => r.timestamp,
        }
    }

    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            ReconcileOutcome::LocatorNotFound => None,
            ReconcileOutcome::Applied(r) => Some(r),
        }
    }
}
