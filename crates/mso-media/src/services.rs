//! The management-API contract the reconciler drives.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    Asset, AssetFilter, MediaError, PresentationTimeRange, StreamingEndpoint, StreamingLocator,
    StreamingPath,
};

/// Identifies the media account every call is made against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
}

impl Scope {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            account_name: account_name.into(),
        }
    }
}

/// Remote media management operations.
///
/// `get_*` methods return `Ok(None)` when the resource does not exist; an
/// `Err` always means the call itself failed (transport, auth, API error),
/// never "not found".
///
/// Every method takes the caller's [`CancellationToken`]; implementations
/// must abort the in-flight call and return [`MediaError::Cancelled`] when
/// it fires.
#[async_trait]
pub trait MediaServices: Send + Sync {
    async fn get_asset(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Asset>, MediaError>;

    async fn get_streaming_locator(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingLocator>, MediaError>;

    async fn create_streaming_locator(
        &self,
        scope: &Scope,
        locator: &StreamingLocator,
        cancel: &CancellationToken,
    ) -> Result<StreamingLocator, MediaError>;

    /// Deleting a locator that does not exist succeeds.
    async fn delete_streaming_locator(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError>;

    async fn list_paths(
        &self,
        scope: &Scope,
        locator_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamingPath>, MediaError>;

    async fn get_streaming_endpoint(
        &self,
        scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingEndpoint>, MediaError>;

    async fn get_asset_filter(
        &self,
        scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AssetFilter>, MediaError>;

    async fn create_or_update_asset_filter(
        &self,
        scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        range: PresentationTimeRange,
        cancel: &CancellationToken,
    ) -> Result<AssetFilter, MediaError>;

    /// Deleting a filter that does not exist succeeds.
    async fn delete_asset_filter(
        &self,
        scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError>;

    /// Replace the locator named `locator.name` with `locator`.
    ///
    /// Locators are immutable remotely, so this is a delete followed by a
    /// create and is NOT atomic. If the delete succeeds and the create fails
    /// (including by cancellation), the account is left without the locator
    /// and [`MediaError::ReplaceInterrupted`] is returned.
    async fn replace_streaming_locator(
        &self,
        scope: &Scope,
        locator: &StreamingLocator,
        cancel: &CancellationToken,
    ) -> Result<StreamingLocator, MediaError> {
        self.delete_streaming_locator(scope, &locator.name, cancel)
            .await?;

        match self.create_streaming_locator(scope, locator, cancel).await {
            Ok(created) => Ok(created),
            Err(err) => {
                warn!(
                    locator = %locator.name,
                    error = %err,
                    "streaming locator deleted but recreate failed"
                );
                Err(MediaError::ReplaceInterrupted {
                    name: locator.name.clone(),
                    source: Box::new(err),
                })
            }
        }
    }
}
