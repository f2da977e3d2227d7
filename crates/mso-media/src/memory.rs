//! In-memory [`MediaServices`] double.
//!
//! Holds one account's resources in maps and records every mutating call in
//! an [`Op`] log so tests can assert exactly which create/delete calls a
//! reconciliation issued. Compiled only for tests or with the `testkit`
//! feature.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    Asset, AssetFilter, MediaError, MediaServices, PresentationTimeRange, Scope,
    StreamingEndpoint, StreamingLocator, StreamingPath,
};

/// A mutating call observed by [`MemoryMediaServices`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    CreateLocator {
        name: String,
        streaming_locator_id: Option<String>,
        filters: Vec<String>,
    },
    DeleteLocator {
        name: String,
    },
    UpsertFilter {
        asset: String,
        filter: String,
        range: PresentationTimeRange,
    },
    DeleteFilter {
        asset: String,
        filter: String,
    },
}

#[derive(Default)]
struct State {
    assets: BTreeMap<String, Asset>,
    locators: BTreeMap<String, StreamingLocator>,
    endpoints: BTreeMap<String, StreamingEndpoint>,
    filters: BTreeMap<(String, String), AssetFilter>,
    paths: BTreeMap<String, Vec<StreamingPath>>,
    ops: Vec<Op>,
    fail_next_locator_create: bool,
    fail_filter_delete: bool,
    fail_endpoint_get: bool,
}

#[derive(Default)]
pub struct MemoryMediaServices {
    state: Mutex<State>,
}

impl MemoryMediaServices {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- seeding -----------------------------------------------------------

    pub fn with_asset(self, asset: Asset) -> Self {
        self.state().assets.insert(asset.name.clone(), asset);
        self
    }

    pub fn with_locator(self, locator: StreamingLocator) -> Self {
        self.state().locators.insert(locator.name.clone(), locator);
        self
    }

    pub fn with_endpoint(self, endpoint: StreamingEndpoint) -> Self {
        self.state().endpoints.insert(endpoint.name.clone(), endpoint);
        self
    }

    pub fn with_filter(self, asset_name: &str, filter: AssetFilter) -> Self {
        self.state()
            .filters
            .insert((asset_name.to_string(), filter.name.clone()), filter);
        self
    }

    pub fn with_paths(self, locator_name: &str, paths: Vec<StreamingPath>) -> Self {
        self.state().paths.insert(locator_name.to_string(), paths);
        self
    }

    // --- fault injection ---------------------------------------------------

    /// The next `create_streaming_locator` fails with a network error.
    pub fn fail_next_locator_create(&self) {
        self.state().fail_next_locator_create = true;
    }

    /// Every `delete_asset_filter` fails with a network error.
    pub fn fail_filter_delete(&self) {
        self.state().fail_filter_delete = true;
    }

    /// Every `get_streaming_endpoint` fails with a network error.
    pub fn fail_endpoint_get(&self) {
        self.state().fail_endpoint_get = true;
    }

    // --- inspection --------------------------------------------------------

    pub fn ops(&self) -> Vec<Op> {
        self.state().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state().ops.clear();
    }

    pub fn locator(&self, name: &str) -> Option<StreamingLocator> {
        self.state().locators.get(name).cloned()
    }

    pub fn filter(&self, asset_name: &str, filter_name: &str) -> Option<AssetFilter> {
        self.state()
            .filters
            .get(&(asset_name.to_string(), filter_name.to_string()))
            .cloned()
    }
}

fn check(cancel: &CancellationToken) -> Result<(), MediaError> {
    if cancel.is_cancelled() {
        Err(MediaError::Cancelled)
    } else {
        Ok(())
    }
}

#[async_trait]
impl MediaServices for MemoryMediaServices {
    async fn get_asset(
        &self,
        _scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Asset>, MediaError> {
        check(cancel)?;
        Ok(self.state().assets.get(name).cloned())
    }

    async fn get_streaming_locator(
        &self,
        _scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingLocator>, MediaError> {
        check(cancel)?;
        Ok(self.state().locators.get(name).cloned())
    }

    async fn create_streaming_locator(
        &self,
        _scope: &Scope,
        locator: &StreamingLocator,
        cancel: &CancellationToken,
    ) -> Result<StreamingLocator, MediaError> {
        check(cancel)?;
        let mut st = self.state();
        if st.fail_next_locator_create {
            st.fail_next_locator_create = false;
            return Err(MediaError::Network("injected create failure".to_string()));
        }
        if st.locators.contains_key(&locator.name) {
            return Err(MediaError::Api {
                code: "Conflict".to_string(),
                message: format!("streaming locator '{}' already exists", locator.name),
            });
        }
        let mut created = locator.clone();
        if created.streaming_locator_id.is_none() {
            created.streaming_locator_id = Some(uuid::Uuid::new_v4().to_string());
        }
        st.ops.push(Op::CreateLocator {
            name: created.name.clone(),
            streaming_locator_id: locator.streaming_locator_id.clone(),
            filters: created.filters.clone(),
        });
        st.locators.insert(created.name.clone(), created.clone());
        Ok(created)
    }

    async fn delete_streaming_locator(
        &self,
        _scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        check(cancel)?;
        let mut st = self.state();
        st.ops.push(Op::DeleteLocator {
            name: name.to_string(),
        });
        st.locators.remove(name);
        Ok(())
    }

    async fn list_paths(
        &self,
        _scope: &Scope,
        locator_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamingPath>, MediaError> {
        check(cancel)?;
        let st = self.state();
        if !st.locators.contains_key(locator_name) {
            return Err(MediaError::Api {
                code: "NotFound".to_string(),
                message: format!("streaming locator '{locator_name}' not found"),
            });
        }
        Ok(st.paths.get(locator_name).cloned().unwrap_or_default())
    }

    async fn get_streaming_endpoint(
        &self,
        _scope: &Scope,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingEndpoint>, MediaError> {
        check(cancel)?;
        let st = self.state();
        if st.fail_endpoint_get {
            return Err(MediaError::Network("injected endpoint failure".to_string()));
        }
        Ok(st.endpoints.get(name).cloned())
    }

    async fn get_asset_filter(
        &self,
        _scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AssetFilter>, MediaError> {
        check(cancel)?;
        Ok(self.filter(asset_name, filter_name))
    }

    async fn create_or_update_asset_filter(
        &self,
        _scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        range: PresentationTimeRange,
        cancel: &CancellationToken,
    ) -> Result<AssetFilter, MediaError> {
        check(cancel)?;
        let mut st = self.state();
        let filter = AssetFilter::new(filter_name, range);
        st.ops.push(Op::UpsertFilter {
            asset: asset_name.to_string(),
            filter: filter_name.to_string(),
            range,
        });
        st.filters
            .insert((asset_name.to_string(), filter_name.to_string()), filter.clone());
        Ok(filter)
    }

    async fn delete_asset_filter(
        &self,
        _scope: &Scope,
        asset_name: &str,
        filter_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        check(cancel)?;
        let mut st = self.state();
        if st.fail_filter_delete {
            return Err(MediaError::Network("injected filter delete failure".to_string()));
        }
        st.ops.push(Op::DeleteFilter {
            asset: asset_name.to_string(),
            filter: filter_name.to_string(),
        });
        st.filters
            .remove(&(asset_name.to_string(), filter_name.to_string()));
        Ok(())
    }
}
