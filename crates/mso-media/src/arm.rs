//! ARM REST adapter for [`MediaServices`].
//!
//! Only the resource fields the reconciler reads or writes are mapped; the
//! rest of each ARM payload is ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::MAX_RESPONSE_SIZE;
use crate::{
    cancellable, Asset, AssetFilter, MediaError, MediaServices, PresentationTimeRange, Scope,
    StreamingEndpoint, StreamingLocator, StreamingPath, TokenProvider,
};

pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
pub const API_VERSION: &str = "2022-08-01";

/// Media Services management client speaking ARM JSON over HTTPS.
pub struct ArmMediaClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for ArmMediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmMediaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ArmMediaClient {
    pub fn new(
        arm_endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, MediaError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MediaError::InvalidConfig(format!("http client build failed: {e}")))?;
        Ok(Self::with_client(http, arm_endpoint, tokens))
    }

    pub fn with_client(
        http: Client,
        arm_endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: arm_endpoint.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Account-scoped resource URL. Every segment is percent-encoded, so a
    /// name containing `/`, `?` or spaces stays a single path segment.
    fn url(&self, scope: &Scope, resource: &[&str]) -> Result<Url, MediaError> {
        let invalid = |reason: String| {
            MediaError::InvalidConfig(format!("arm endpoint '{}': {reason}", self.base_url))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base url".to_string()))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                scope.subscription_id.as_str(),
                "resourceGroups",
                scope.resource_group.as_str(),
                "providers",
                "Microsoft.Media",
                "mediaServices",
                scope.account_name.as_str(),
            ])
            .extend(resource);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, MediaError> {
        let token = self.tokens.bearer_token(cancel).await?;
        let mut req = self.http.request(method.clone(), url.clone()).bearer_auth(token);
        if let Some(b) = body {
            req = req.json(b);
        }
        debug!(%method, %url, "arm request");
        Ok(req.send().await?)
    }

    /// GET a resource; 404 maps to `None`.
    async fn get_resource<T: DeserializeOwned>(
        &self,
        url: Url,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, MediaError> {
        cancellable(cancel, async {
            let resp = self
                .send::<()>(Method::GET, &url, None, cancel)
                .await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let resp = check_response(resp).await?;
            Ok(Some(json_with_limit(resp).await?))
        })
        .await
    }

    async fn put_resource<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, MediaError> {
        cancellable(cancel, async {
            let resp = self.send(Method::PUT, &url, Some(body), cancel).await?;
            let resp = check_response(resp).await?;
            json_with_limit(resp).await
        })
        .await
    }

    /// DELETE a resource; 404 counts as already deleted.
    async fn delete_resource(&self, url: Url, cancel: &CancellationToken) -> Result<(), MediaError> {
        cancellable(cancel, async {
            let resp = self
                .send::<()>(Method::DELETE, &url, None, cancel)
                .await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(());
            }
            check_response(resp).await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MediaServices for ArmMediaClient {
    async fn get_asset(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Asset>, MediaError> {
        let url = self.url(scope, &["assets", name])?;
        let res: Option<ArmResource<AssetProps>> = self.get_resource(url, cancel).await?;
        Ok(res.map(|r| Asset {
            name: r.name,
            asset_id: r.properties.asset_id,
            container: r.properties.container,
        }))
    }

    async fn get_streaming_locator(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingLocator>, MediaError> {
        let url = self.url(scope, &["streamingLocators", name])?;
        let res: Option<ArmResource<LocatorProps>> = self.get_resource(url, cancel).await?;
        Ok(res.map(ArmResource::into_locator))
    }

    async fn create_streaming_locator(
        &self,
        scope: &Scope,
        locator: &StreamingLocator,
        cancel: &CancellationToken,
    ) -> Result<StreamingLocator, MediaError> {
        let url = self.url(scope, &["streamingLocators", locator.name.as_str()])?;
        let body = ArmBody {
            properties: LocatorProps {
                asset_name: locator.asset_name.clone(),
                streaming_policy_name: locator.streaming_policy_name.clone(),
                streaming_locator_id: locator.streaming_locator_id.clone(),
                filters: locator.filters.clone(),
            },
        };
        let res: ArmResource<LocatorProps> = self.put_resource(url, &body, cancel).await?;
        Ok(res.into_locator())
    }

    async fn delete_streaming_locator(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let url = self.url(scope, &["streamingLocators", name])?;
        self.delete_resource(url, cancel).await
    }

    async fn list_paths(
        &self,
        scope: &Scope,
        locator_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamingPath>, MediaError> {
        let url = self.url(scope, &["streamingLocators", locator_name, "listPaths"])?;
        let body: ListPathsResponse = cancellable(cancel, async {
            let resp = self
                .send(Method::POST, &url, Some(&serde_json::json!({})), cancel)
                .await?;
            let resp = check_response(resp).await?;
            json_with_limit(resp).await
        })
        .await?;

        Ok(body
            .streaming_paths
            .into_iter()
            .map(|p| StreamingPath {
                streaming_protocol: p.streaming_protocol,
                encryption_scheme: p.encryption_scheme,
                paths: p.paths,
            })
            .collect())
    }

    async fn get_streaming_endpoint(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingEndpoint>, MediaError> {
        let url = self.url(scope, &["streamingEndpoints", name])?;
        let res: Option<ArmResource<EndpointProps>> = self.get_resource(url, cancel).await?;
        Ok(res.map(|r| StreamingEndpoint {
            name: r.name,
            host_name: r.properties.host_name,
        }))
    }

    async fn get_asset_filter(
        &self,
        scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AssetFilter>, MediaError> {
        let url = self.url(scope, &["assets", asset_name, "assetFilters", filter_name])?;
        let res: Option<ArmResource<FilterProps>> = self.get_resource(url, cancel).await?;
        Ok(res.map(ArmResource::into_filter))
    }

    async fn create_or_update_asset_filter(
        &self,
        scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        range: PresentationTimeRange,
        cancel: &CancellationToken,
    ) -> Result<AssetFilter, MediaError> {
        let url = self.url(scope, &["assets", asset_name, "assetFilters", filter_name])?;
        let body = ArmBody {
            properties: FilterProps {
                presentation_time_range: Some(RangeWire {
                    start_timestamp: Some(range.start_timestamp),
                    timescale: Some(range.timescale),
                }),
            },
        };
        let res: ArmResource<FilterProps> = self.put_resource(url, &body, cancel).await?;
        Ok(res.into_filter())
    }

    async fn delete_asset_filter(
        &self,
        scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let url = self.url(scope, &["assets", asset_name, "assetFilters", filter_name])?;
        self.delete_resource(url, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Map a non-success response to `Api` (when the body carries an ARM error)
/// or `Http`.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, MediaError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    if let Ok(env) = serde_json::from_str::<ArmErrorEnvelope>(&body) {
        return Err(MediaError::Api {
            code: env.error.code,
            message: env.error.message,
        });
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(MediaError::Auth(format!("{status} for {url}")));
    }
    Err(MediaError::Http { status, url })
}

async fn json_with_limit<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, MediaError> {
    if let Some(cl) = resp.content_length() {
        if cl as usize > MAX_RESPONSE_SIZE {
            return Err(MediaError::ResponseTooLarge { size: cl });
        }
    }
    let bytes = resp.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(MediaError::ResponseTooLarge {
            size: bytes.len() as u64,
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ArmResource<P> {
    name: String,
    #[serde(default)]
    properties: P,
}

impl ArmResource<LocatorProps> {
    fn into_locator(self) -> StreamingLocator {
        StreamingLocator {
            name: self.name,
            asset_name: self.properties.asset_name,
            streaming_policy_name: self.properties.streaming_policy_name,
            streaming_locator_id: self.properties.streaming_locator_id,
            filters: self.properties.filters,
        }
    }
}

impl ArmResource<FilterProps> {
    fn into_filter(self) -> AssetFilter {
        let range = self.properties.presentation_time_range.and_then(|r| {
            Some(PresentationTimeRange {
                start_timestamp: r.start_timestamp?,
                timescale: r.timescale?,
            })
        });
        AssetFilter {
            name: self.name,
            presentation_time_range: range,
        }
    }
}

#[derive(Debug, Serialize)]
struct ArmBody<P> {
    properties: P,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProps {
    asset_id: Option<String>,
    container: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocatorProps {
    #[serde(default)]
    asset_name: String,
    #[serde(default)]
    streaming_policy_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    streaming_locator_id: Option<String>,
    #[serde(default)]
    filters: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointProps {
    #[serde(default)]
    host_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    presentation_time_range: Option<RangeWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timescale: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPathsResponse {
    #[serde(default)]
    streaming_paths: Vec<PathWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathWire {
    #[serde(default)]
    streaming_protocol: String,
    #[serde(default)]
    encryption_scheme: String,
    #[serde(default)]
    paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ArmErrorEnvelope {
    error: ArmErrorBody,
}

#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    code: String,
    message: String,
}
