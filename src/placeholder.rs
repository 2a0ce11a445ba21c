//! Placeholder sizing for images and video posters.
//!
//! Declared `width`/`height` attributes are collected by a pre-scan over the
//! *raw* markup, before tag normalization, because ordinal assignment depends
//! on the raw document order of `<img>` tags. During the tag walk each
//! image/video occurrence registers a placeholder here; content arrives later
//! through the host's [`ImageLoader`] and is sized by [`PlaceholderTable::
//! placed_bounds`] without blocking text layout.

use crate::DisplayMetrics;
use regex::Regex;
use std::sync::LazyLock;

/// Source-token prefix that routes a fetch to the video-poster path.
pub const VIDEO_POSTER_PREFIX: &str = "video-poster:";

/// Sentinel poster token requesting the loader's default video placeholder.
pub const DEFAULT_VIDEO_POSTER: &str = "default";

static IMAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?i:img)\s+([^>]*)>").expect("image tag pattern is valid"));

static IMAGE_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i:width)\s*=\s*"?(\w+)"?"#).expect("image width pattern is valid")
});

static IMAGE_HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i:height)\s*=\s*"?(\w+)"?"#).expect("image height pattern is valid")
});

/// Declared dimensions of one `<img>` tag, in density-independent units.
///
/// A dimension is `-1` when the attribute was absent or non-numeric; such a
/// record is invalid and the content's intrinsic size wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSizeRecord {
    pub width: i32,
    pub height: i32,
}

impl ImageSizeRecord {
    pub fn valid(&self) -> bool {
        self.width >= 0 && self.height >= 0
    }
}

/// Pre-scan raw markup for `<img>` declared sizes, in document order.
pub fn scan(raw: &str) -> Vec<ImageSizeRecord> {
    IMAGE_TAG
        .captures_iter(raw)
        .map(|caps| {
            let attrs = caps[1].trim();
            ImageSizeRecord {
                width: scan_dimension(&IMAGE_WIDTH, attrs),
                height: scan_dimension(&IMAGE_HEIGHT, attrs),
            }
        })
        .collect()
}

fn scan_dimension(pattern: &Regex, attrs: &str) -> i32 {
    pattern
        .captures(attrs)
        .and_then(|caps| caps[1].trim().parse().ok())
        .unwrap_or(-1)
}

/// Intrinsic or placed pixel dimensions of placeholder content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentSize {
    pub width: i32,
    pub height: i32,
}

/// Result of an asynchronous content fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Content arrived; dimensions are its intrinsic size in pixels.
    Loaded(ContentSize),
    /// Fetch failed; the error placeholder substitutes.
    Failed,
}

/// Completion callback handed to the loader. May fire on any thread; the
/// host marshals the resulting update onto its document-owning context.
pub type LoadCallback = Box<dyn FnOnce(LoadOutcome) + Send + 'static>;

/// Host-supplied asynchronous content fetcher.
///
/// The loader never blocks the render: parsing finishes with provisional
/// placeholder bounds and each callback later yields the final ones.
pub trait ImageLoader {
    /// Fetch an inline image.
    fn load_image(&self, url: &str, done: LoadCallback);
    /// Fetch a video poster frame. `source` carries the
    /// [`VIDEO_POSTER_PREFIX`] token, with [`DEFAULT_VIDEO_POSTER`] standing
    /// in when the tag declared no poster.
    fn load_video_poster(&self, source: &str, done: LoadCallback);
    /// Intrinsic size of the drawable shown while a fetch is in flight.
    fn placeholder_size(&self) -> ContentSize;
    /// Intrinsic size of the drawable shown after a failed fetch.
    fn error_size(&self) -> ContentSize;
}

/// Which fetch path a placeholder takes.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PlaceholderKind {
    Image { src: String },
    VideoPoster { poster: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PlaceholderEntry {
    kind: PlaceholderKind,
    /// Index into the scan records; image placeholders only.
    record: Option<usize>,
}

/// Lifecycle stage of a placeholder update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderState {
    /// Default drawable, fetch not yet complete.
    Provisional,
    /// Fetched content, declared-or-intrinsic sizing applied.
    Final,
    /// Error drawable after a failed fetch.
    Error,
}

/// Sized bounds for one placeholder ordinal, ready to apply to the glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaceholderUpdate {
    pub ordinal: usize,
    pub bounds: ContentSize,
    pub state: PlaceholderState,
}

/// Per-document placeholder registry: ordinal assignment, record binding
/// and the sizing policy. Read-only once the tag walk finishes.
#[derive(Clone, Debug, Default)]
pub struct PlaceholderTable {
    records: Vec<ImageSizeRecord>,
    entries: Vec<PlaceholderEntry>,
    next_record: usize,
    metrics: DisplayMetrics,
}

impl PlaceholderTable {
    pub(crate) fn new(records: Vec<ImageSizeRecord>, metrics: DisplayMetrics) -> Self {
        Self {
            records,
            entries: Vec::new(),
            next_record: 0,
            metrics,
        }
    }

    /// Number of registered placeholders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register an image occurrence, binding it to the next unconsumed
    /// pre-scan record. Returns the placeholder ordinal.
    pub(crate) fn register_image(&mut self, src: String) -> usize {
        let record = if self.next_record < self.records.len() {
            let idx = self.next_record;
            self.next_record += 1;
            Some(idx)
        } else {
            log::debug!("image placeholder has no matching pre-scan record");
            None
        };
        self.push_entry(PlaceholderEntry {
            kind: PlaceholderKind::Image { src },
            record,
        })
    }

    /// Register a video occurrence. Posters never bind to scan records;
    /// their intrinsic size always wins.
    pub(crate) fn register_video(&mut self, poster: Option<String>) -> usize {
        self.push_entry(PlaceholderEntry {
            kind: PlaceholderKind::VideoPoster { poster },
            record: None,
        })
    }

    fn push_entry(&mut self, entry: PlaceholderEntry) -> usize {
        let ordinal = self.entries.len();
        self.entries.push(entry);
        ordinal
    }

    /// The loader-facing source token for one placeholder: the image URL
    /// itself, or the prefixed poster token for videos.
    pub fn source_token(&self, ordinal: usize) -> Option<String> {
        self.entries.get(ordinal).map(|entry| match &entry.kind {
            PlaceholderKind::Image { src } => src.clone(),
            PlaceholderKind::VideoPoster { poster } => match poster {
                Some(url) if !url.is_empty() => format!("{VIDEO_POSTER_PREFIX}{url}"),
                _ => format!("{VIDEO_POSTER_PREFIX}{DEFAULT_VIDEO_POSTER}"),
            },
        })
    }

    pub(crate) fn is_video(&self, ordinal: usize) -> bool {
        matches!(
            self.entries.get(ordinal).map(|entry| &entry.kind),
            Some(PlaceholderKind::VideoPoster { .. })
        )
    }

    /// Apply the sizing policy for one placeholder.
    ///
    /// `use_declared` selects declared dimensions when the bound record is
    /// valid (final image content); provisional and error drawables size by
    /// intrinsic dimensions only. Whatever the source, the result is then
    /// fit to `max_content_width` preserving aspect ratio and the height is
    /// clamped to the viewport. Width is not corrected after the height
    /// clamp; extreme bounds distort rather than overflow.
    pub fn placed_bounds(
        &self,
        ordinal: usize,
        intrinsic: ContentSize,
        use_declared: bool,
    ) -> ContentSize {
        let declared = if use_declared {
            self.entries
                .get(ordinal)
                .and_then(|entry| entry.record)
                .and_then(|idx| self.records.get(idx))
                .filter(|record| record.valid())
                .copied()
        } else {
            None
        };

        let (mut width, mut height) = match declared {
            Some(record) => (
                self.metrics.dp_to_px(record.width),
                self.metrics.dp_to_px(record.height),
            ),
            None => (intrinsic.width, intrinsic.height),
        };

        if width > 0 && height > 0 {
            let max_width = self.metrics.max_content_width;
            if max_width > 0 && (width > max_width || self.metrics.fit_width) {
                height = (height as f32 / width as f32 * max_width as f32) as i32;
                width = max_width;
            }
            if height > self.metrics.viewport_height {
                height = self.metrics.viewport_height;
            }
        }

        ContentSize { width, height }
    }

    /// Provisional update shown while the fetch is in flight.
    pub fn provisional_update(&self, ordinal: usize, placeholder: ContentSize) -> PlaceholderUpdate {
        PlaceholderUpdate {
            ordinal,
            bounds: self.placed_bounds(ordinal, placeholder, false),
            state: PlaceholderState::Provisional,
        }
    }

    /// Update derived from a completed fetch.
    pub fn outcome_update(
        &self,
        ordinal: usize,
        outcome: LoadOutcome,
        error_placeholder: ContentSize,
    ) -> PlaceholderUpdate {
        match outcome {
            LoadOutcome::Loaded(intrinsic) => PlaceholderUpdate {
                ordinal,
                bounds: self.placed_bounds(ordinal, intrinsic, true),
                state: PlaceholderState::Final,
            },
            LoadOutcome::Failed => PlaceholderUpdate {
                ordinal,
                bounds: self.placed_bounds(ordinal, error_placeholder, false),
                state: PlaceholderState::Error,
            },
        }
    }
}
