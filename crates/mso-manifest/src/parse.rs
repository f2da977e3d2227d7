use roxmltree::{Document, Node};
use tracing::debug;

use crate::ManifestTiming;

/// Extract [`ManifestTiming`] from a smooth-streaming manifest document.
///
/// Looks at the first `StreamIndex` child of the root whose `Type` is `video`
/// (any case). `TimeScale` on that index and `t` on its first `c` element
/// override the defaults when present and parseable as `i64`. Anything
/// missing or malformed leaves the corresponding default in place.
pub fn parse_timing(xml: &str) -> ManifestTiming {
    let mut timing = ManifestTiming::default();

    let doc = match Document::parse(xml) {
        Ok(d) => d,
        Err(e) => {
            debug!(error = %e, "manifest is not well-formed xml; using default timing");
            return timing;
        }
    };

    let Some(video) = video_index(doc.root_element()) else {
        debug!("manifest has no video StreamIndex; using default timing");
        return timing;
    };

    if let Some(ts) = video.attribute("TimeScale").and_then(parse_i64) {
        timing.timescale = ts;
    }

    let first_chunk = video
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "c");
    if let Some(t) = first_chunk
        .and_then(|c| c.attribute("t"))
        .and_then(parse_i64)
    {
        timing.first_offset_marker = t;
    }

    timing
}

fn video_index<'a, 'input>(root: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    root.children().find(|n| {
        n.is_element()
            && n.tag_name().name() == "StreamIndex"
            && n
                .attribute("Type")
                .map(|t| t.to_lowercase() == "video")
                .unwrap_or(false)
    })
}

fn parse_i64(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}
