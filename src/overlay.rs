//! Click-region derivation over a finished document.
//!
//! Interaction runs can overlap: a link may wrap an image glyph. Regions are
//! resolved with deterministic priority image > video > link — a lower
//! priority region is dropped when a higher priority one already fully
//! covers its range, so a link wrapping an image contributes the image's tap
//! behavior, not the link's.

use crate::document::{AttributedDocument, Run, RunKind};

/// What a tap inside a region should do.
#[derive(Clone, Debug, PartialEq)]
pub enum TapAction {
    /// Open the viewer for image `ordinal` of the document's image list.
    Image { ordinal: usize },
    /// Follow a hyperlink.
    Link { href: String },
    /// Start video playback.
    Video { url: String },
}

/// A character range plus the interaction payload a host reacts to on tap.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickRegion {
    pub start: usize,
    pub end: usize,
    pub action: TapAction,
}

impl ClickRegion {
    fn covers(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Host-side tap callbacks, invoked by [`dispatch_tap`].
pub trait TagClickHandler {
    /// A tapped image: all image URLs of the document in order, plus the
    /// index of the tapped one.
    fn on_image_tap(&self, image_urls: &[String], ordinal: usize);
    fn on_link_tap(&self, href: &str);
    fn on_video_tap(&self, video_url: &str);
}

/// Derive click regions from a document's interaction runs.
///
/// Image regions carry the image's index among image runs (the position in
/// the document's URL list), not the shared placeholder ordinal.
pub(crate) fn build_regions(doc: &AttributedDocument) -> Vec<ClickRegion> {
    let mut regions = Vec::new();

    let mut image_index = 0usize;
    for run in &doc.runs {
        if matches!(run.kind, RunKind::Image { .. }) {
            regions.push(ClickRegion {
                start: run.start,
                end: run.end,
                action: TapAction::Image {
                    ordinal: image_index,
                },
            });
            image_index += 1;
        }
    }
    let image_count = regions.len();

    for run in &doc.runs {
        if let RunKind::Video { src, .. } = &run.kind {
            if covered_by(&regions[..image_count], run) {
                continue;
            }
            regions.push(ClickRegion {
                start: run.start,
                end: run.end,
                action: TapAction::Video {
                    url: src.clone().unwrap_or_default(),
                },
            });
        }
    }
    let media_count = regions.len();

    for run in &doc.runs {
        if let RunKind::Link { href } = &run.kind {
            if covered_by(&regions[..media_count], run) {
                continue;
            }
            regions.push(ClickRegion {
                start: run.start,
                end: run.end,
                action: TapAction::Link { href: href.clone() },
            });
        }
    }

    regions
}

fn covered_by(regions: &[ClickRegion], run: &Run) -> bool {
    regions.iter().any(|r| r.covers(run.start, run.end))
}

/// Strip trailing newline characters, truncating runs and regions that
/// extended into the removed tail. Idempotent: a second pass over an
/// already-stripped document changes nothing.
pub(crate) fn strip_trailing_newlines(
    doc: &mut AttributedDocument,
    regions: &mut Vec<ClickRegion>,
) {
    let trailing = doc.text.chars().rev().take_while(|&c| c == '\n').count();
    if trailing == 0 {
        return;
    }
    doc.text.truncate(doc.text.len() - trailing);
    let new_len = doc.text.chars().count();

    doc.runs.retain_mut(|run| {
        run.end = run.end.min(new_len);
        run.start < run.end
    });
    regions.retain_mut(|region| {
        region.end = region.end.min(new_len);
        region.start < region.end
    });
}

/// Map a tap offset to the region covering it, first-added wins.
pub fn region_at(regions: &[ClickRegion], offset: usize) -> Option<&ClickRegion> {
    regions.iter().find(|region| region.contains(offset))
}
