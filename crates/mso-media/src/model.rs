use serde::{Deserialize, Serialize};

/// Remote media object. Only ever read by the reconciler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub asset_id: Option<String>,
    pub container: Option<String>,
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asset_id: None,
            container: None,
        }
    }
}

/// Named binding of an asset to a streaming policy, optionally restricted by filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingLocator {
    pub name: String,
    pub asset_name: String,
    pub streaming_policy_name: String,
    /// Immutable identifier. Must be carried forward when the locator is recreated.
    pub streaming_locator_id: Option<String>,
    pub filters: Vec<String>,
}

impl StreamingLocator {
    pub fn new(
        name: impl Into<String>,
        asset_name: impl Into<String>,
        streaming_policy_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            asset_name: asset_name.into(),
            streaming_policy_name: streaming_policy_name.into(),
            streaming_locator_id: None,
            filters: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.streaming_locator_id = Some(id.into());
        self
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// True when `filter_name` appears in the filter list, ignoring ASCII case.
    pub fn references_filter(&self, filter_name: &str) -> bool {
        self.filters
            .iter()
            .any(|f| f.eq_ignore_ascii_case(filter_name))
    }
}

/// Presentation window of an asset filter, in manifest ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationTimeRange {
    pub start_timestamp: i64,
    pub timescale: i64,
}

/// Named playback restriction scoped to one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFilter {
    pub name: String,
    pub presentation_time_range: Option<PresentationTimeRange>,
}

impl AssetFilter {
    pub fn new(name: impl Into<String>, range: PresentationTimeRange) -> Self {
        Self {
            name: name.into(),
            presentation_time_range: Some(range),
        }
    }
}

/// Read-only endpoint exposing the host streaming URLs are built against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingEndpoint {
    pub name: String,
    pub host_name: String,
}

impl StreamingEndpoint {
    pub fn new(name: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host_name: host_name.into(),
        }
    }
}

/// One protocol's playback paths for a locator (as returned by list-paths).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingPath {
    pub streaming_protocol: String,
    pub encryption_scheme: String,
    pub paths: Vec<String>,
}

impl StreamingPath {
    pub fn new<I, S>(streaming_protocol: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            streaming_protocol: streaming_protocol.into(),
            encryption_scheme: "NoEncryption".to_string(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// First path entry of the first streaming path that has any.
pub fn first_streaming_path(paths: &[StreamingPath]) -> Option<&str> {
    paths
        .iter()
        .find_map(|p| p.paths.first())
        .map(String::as_str)
}
