//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (e.g. `"MSO_ARM_TOKEN"`).
//! - Callers invoke [`resolve_secrets`] once at startup and pass the result
//!   into constructors; no `std::env::var` calls elsewhere.
//! - `Debug` redacts values. Errors name the variable, never the value.

use anyhow::{bail, Result};

use crate::MediaConfig;

/// Secrets resolved from the environment.
///
/// **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Bearer token for the management API audience. Required.
    pub arm_token: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("arm_token", &"<REDACTED>")
            .finish()
    }
}

/// Resolve a named environment variable; unset or blank yields `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve the secrets named by `config`.
///
/// # Errors
/// SECRETS_MISSING naming the env var when the management token is unset.
pub fn resolve_secrets(config: &MediaConfig) -> Result<ResolvedSecrets> {
    let Some(arm_token) = resolve_env(&config.arm_token_env) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (management API bearer token) \
             is not set or empty",
            config.arm_token_env,
        );
    };

    Ok(ResolvedSecrets { arm_token })
}
