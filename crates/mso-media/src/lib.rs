//! mso-media
//!
//! Boundary to the remote media management API.
//!
//! This crate owns the resource model (asset, streaming locator, asset filter,
//! streaming endpoint), the [`MediaServices`] trait the reconciler drives, and
//! the concrete ARM REST adapter. It holds no durable state: every call goes
//! to the remote API, which is the single source of truth.

pub mod arm;
pub mod auth;
pub mod cancel;
pub mod error;
pub mod model;
pub mod services;

#[cfg(any(test, feature = "testkit"))]
pub mod memory;

pub use arm::ArmMediaClient;
pub use auth::{StaticTokenProvider, TokenProvider};
pub use cancel::cancellable;
pub use error::MediaError;
pub use model::*;
pub use services::{MediaServices, Scope};

#[cfg(any(test, feature = "testkit"))]
pub use memory::{MemoryMediaServices, Op};

/// Re-exported so callers thread the same token type through every call.
pub use tokio_util::sync::CancellationToken;
