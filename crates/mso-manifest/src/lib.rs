//! mso-manifest
//!
//! Manifest inspection: reads the video track's timescale and the start
//! tick of its first segment from a smooth-streaming client manifest.
//!
//! Best-effort by contract. Any fetch or parse failure degrades to
//! [`ManifestTiming::default`] rather than blocking reconciliation.

pub mod fetch;
pub mod parse;

pub use fetch::{decode_manifest, HttpManifestInspector, TimingSource};
pub use parse::parse_timing;

use serde::{Deserialize, Serialize};

/// Ticks per second assumed when the manifest does not say otherwise.
pub const DEFAULT_TIMESCALE: i64 = 10_000_000;

/// Timing fields derived from one manifest read. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTiming {
    pub timescale: i64,
    pub first_offset_marker: i64,
}

impl Default for ManifestTiming {
    fn default() -> Self {
        Self {
            timescale: DEFAULT_TIMESCALE,
            first_offset_marker: 0,
        }
    }
}

impl ManifestTiming {
    /// `offset_seconds * timescale + first_offset_marker`, or `None` on overflow.
    pub fn timestamp_at(&self, offset_seconds: i64) -> Option<i64> {
        offset_seconds
            .checked_mul(self.timescale)?
            .checked_add(self.first_offset_marker)
    }
}

/// Build the manifest URL for a streaming path served from `hostname`.
///
/// The path is made absolute, joined to `https://{hostname}`, cut at its last
/// `/`, and `/manifest` is appended. For a path such as
/// `/id/video.ism/manifest(format=m3u8-cmaf)` this yields
/// `https://host/id/video.ism/manifest`.
pub fn manifest_url(hostname: &str, path: &str) -> String {
    let base = if path.starts_with('/') {
        format!("https://{hostname}{path}")
    } else {
        format!("https://{hostname}/{path}")
    };
    // The path is absolute, so a '/' always follows the scheme separator.
    let cut = base.rfind('/').unwrap_or(base.len());
    format!("{}/manifest", &base[..cut])
}
