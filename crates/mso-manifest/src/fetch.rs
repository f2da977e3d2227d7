//! Manifest transport.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{parse_timing, ManifestTiming};

/// Maximum manifest body read (8 MB). Larger bodies are treated as malformed.
pub const MAX_MANIFEST_SIZE: usize = 8 * 1024 * 1024;

/// Source of [`ManifestTiming`] for a manifest URL.
///
/// Infallible by contract: implementations absorb every failure and return
/// the best-effort value (defaults when nothing could be read).
#[async_trait]
pub trait TimingSource: Send + Sync {
    async fn resolve_timing(&self, manifest_url: &str, cancel: &CancellationToken)
        -> ManifestTiming;
}

/// Fetches manifests over HTTP(S) and parses them with [`parse_timing`].
#[derive(Debug, Clone)]
pub struct HttpManifestInspector {
    http: reqwest::Client,
}

impl Default for HttpManifestInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpManifestInspector {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "manifest http client build failed; using defaults");
                reqwest::Client::new()
            });
        Self { http }
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("http status {}", status.as_u16()));
        }
        if let Some(cl) = resp.content_length() {
            if cl as usize > MAX_MANIFEST_SIZE {
                return Err(format!("manifest too large ({cl} bytes)"));
            }
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| format!("body read failed: {e}"))?;
        if bytes.len() > MAX_MANIFEST_SIZE {
            return Err(format!("manifest too large ({} bytes)", bytes.len()));
        }
        decode_manifest(&bytes)
    }
}

/// Decode a manifest body to text, honouring a UTF-16 byte order mark.
///
/// Smooth-streaming server manifests are frequently served as UTF-16LE.
/// Bodies without a UTF-16 BOM must be UTF-8; a UTF-8 BOM is dropped.
pub fn decode_manifest(bytes: &[u8]) -> Result<String, String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => {
            let text =
                std::str::from_utf8(bytes).map_err(|_| "manifest is not utf-8".to_string())?;
            Ok(text.strip_prefix('\u{FEFF}').unwrap_or(text).to_string())
        }
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if body.len() % 2 != 0 {
        return Err("utf-16 manifest has an odd byte count".to_string());
    }
    let units: Vec<u16> = body.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|_| "manifest is not valid utf-16".to_string())
}

#[async_trait]
impl TimingSource for HttpManifestInspector {
    async fn resolve_timing(
        &self,
        manifest_url: &str,
        cancel: &CancellationToken,
    ) -> ManifestTiming {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = manifest_url, "manifest fetch cancelled; using default timing");
                return ManifestTiming::default();
            }
            res = self.fetch(manifest_url) => res,
        };

        match body {
            Ok(xml) => {
                let timing = parse_timing(&xml);
                debug!(
                    url = manifest_url,
                    timescale = timing.timescale,
                    first_offset_marker = timing.first_offset_marker,
                    "manifest timing resolved"
                );
                timing
            }
            Err(reason) => {
                warn!(url = manifest_url, %reason, "manifest unavailable; using default timing");
                ManifestTiming::default()
            }
        }
    }
}
