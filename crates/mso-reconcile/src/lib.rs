//! mso-reconcile
//!
//! Offset filter reconciliation.
//!
//! Decisions:
//! - Offset <= 0 means "no offset": the filter is removed and the locator
//!   must not reference it.
//! - Offset > 0: filter start = offset * timescale + first segment tick,
//!   and the locator must reference the filter.
//! - Locator recreation is driven by filter membership only.
//! - The locator id is carried across recreation.
//!
//! `engine` is pure logic (no IO). `reconciler` drives the remote API.

mod engine;
mod reconciler;
mod types;

pub use engine::{clamp_offset, plan, TimestampOverflow};
pub use reconciler::reconcile;
pub use types::*;
