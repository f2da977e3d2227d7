//! Media account settings read from the merged config JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::read_str_at;

pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_ARM_TOKEN_ENV: &str = "MSO_ARM_TOKEN";

/// Immutable account settings. Loaded once at startup.
///
/// Contains env var NAMES only; values are resolved by
/// [`crate::resolve_secrets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    pub arm_endpoint: String,
    /// Env var holding a ready bearer token for the management API.
    pub arm_token_env: String,
}

impl MediaConfig {
    /// Read settings from the merged config.
    ///
    /// Required: `/media/subscription_id`, `/media/resource_group`,
    /// `/media/account_name`. Everything else has a default.
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let required = |ptr: &str| {
            read_str_at(config_json, ptr)
                .with_context(|| format!("CONFIG_MISSING: required key '{ptr}' is absent or empty"))
        };

        Ok(Self {
            subscription_id: required("/media/subscription_id")?,
            resource_group: required("/media/resource_group")?,
            account_name: required("/media/account_name")?,
            arm_endpoint: read_str_at(config_json, "/media/arm_endpoint")
                .unwrap_or_else(|| DEFAULT_ARM_ENDPOINT.to_string()),
            arm_token_env: read_str_at(config_json, "/aad/token_env")
                .unwrap_or_else(|| DEFAULT_ARM_TOKEN_ENV.to_string()),
        })
    }
}
