//! Content locator
//!
//! Finds the active subtitle container among a prioritized list of
//! selectors, and the primary video surface for overlay anchoring.

use crate::page::{NodeId, Page};
use crate::selector::Selector;

/// Candidate subtitle container selectors, most specific first.
/// Player-specific regions must precede the generic class-substring
/// heuristics, which would otherwise match unrelated UI text.
pub const SUBTITLE_SELECTORS: &[&str] = &[
    // Bitmovin player subtitle containers
    ".bmpui-ui-subtitle-overlay",
    ".bmpui-subtitle-region-container",
    ".bmpui-ui-subtitle-label",
    "[class*='bmpui'][class*='subtitle']",
    // Generic class-name heuristics
    "[class*='subtitle']",
    "[class*='caption']",
    "[class*='ondertitel']",
    // Video.js subtitle containers
    ".vjs-text-track-display",
    ".vjs-text-track-cue",
];

/// Non-owning reference to a located subtitle container
#[derive(Debug, Clone, Copy)]
pub struct SubtitleHandle {
    pub node: NodeId,
    /// The selector that produced the match
    pub selector: &'static str,
}

/// Locate the active subtitle container: the first selector, in priority
/// order, that currently matches an attached element with non-empty
/// trimmed text. Malformed selectors are skipped.
pub fn locate(page: &Page) -> Option<SubtitleHandle> {
    for raw in SUBTITLE_SELECTORS.iter().copied() {
        let selector = match Selector::parse(raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!("Skipping malformed selector {:?}: {}", raw, e);
                continue;
            }
        };

        for node in page.query_all(&selector) {
            let has_text = page
                .text_content(node)
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false);
            if has_text {
                tracing::debug!("Found subtitle container via {:?}", raw);
                return Some(SubtitleHandle { node, selector: raw });
            }
        }
    }
    None
}

/// Locate the primary video surface: the video element with the largest
/// rendered area. Ties resolve to the first in document order. Used only
/// to anchor presentation, never by detection.
pub fn locate_video(page: &Page) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for (node, rect) in page.videos() {
        let area = rect.area();
        match best {
            Some((_, max)) if area <= max => {}
            _ => best = Some((node, area)),
        }
    }
    best.map(|(node, _)| node)
}
