//! Attributed-text compiler for a restricted HTML dialect.
//!
//! Turns sloppy, app-authored markup into a character sequence plus style
//! and interaction runs a text surface can render directly: lists with
//! bullet and number markers, inline color/size spans, hyperlinks, and
//! image/video placeholder glyphs that are sized asynchronously through a
//! host-supplied loader. Rendering never fails; malformed input degrades
//! and surfaces as diagnostics.
//!
//! ```no_run
//! use spanned_html::{DisplayMetrics, DocumentBuilder};
//!
//! let builder = DocumentBuilder::new(DisplayMetrics::default());
//! let rendered = builder.render("<p>Hello <b>world</b></p>");
//! assert_eq!(rendered.document.text, "Hello world");
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod attrs;
mod builder;
pub mod color;
mod document;
mod handler;
mod normalize;
mod overlay;
mod placeholder;

pub use builder::{DocumentBuilder, PostTransform, RenderedDocument};
pub use document::{Alignment, AttributedDocument, Run, RunKind};
pub use handler::OBJECT_REPLACEMENT;
pub use overlay::{region_at, ClickRegion, TagClickHandler, TapAction};
pub use placeholder::{
    scan, ContentSize, ImageLoader, ImageSizeRecord, LoadCallback, LoadOutcome, PlaceholderState,
    PlaceholderTable, PlaceholderUpdate, DEFAULT_VIDEO_POSTER, VIDEO_POSTER_PREFIX,
};

/// Geometry and density of the surface the document will be drawn on.
///
/// Declared image sizes are density-independent and convert through
/// `density`; placeholder sizing clamps against the viewport fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    /// Pixels per density-independent unit.
    pub density: f32,
    /// Visible width of the surface, in pixels.
    pub viewport_width: i32,
    /// Visible height of the surface, in pixels. Placeholder heights clamp
    /// here.
    pub viewport_height: i32,
    /// Width budget for inline content, in pixels. Zero disables width
    /// fitting entirely.
    pub max_content_width: i32,
    /// Upscale narrow content to `max_content_width` instead of only
    /// shrinking oversized content.
    pub fit_width: bool,
    /// Ambient text size in pixels; anchors the legacy `<font size=N>`
    /// scale.
    pub base_text_size_px: f32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            density: 1.0,
            viewport_width: 1080,
            viewport_height: 1920,
            max_content_width: 0,
            fit_width: false,
            base_text_size_px: 16.0,
        }
    }
}

impl DisplayMetrics {
    /// Density-independent units to physical pixels, rounded to nearest.
    pub fn dp_to_px(&self, dp: i32) -> i32 {
        (dp as f32 * self.density + 0.5) as i32
    }

    /// Physical pixels to density-independent units, rounded to nearest.
    pub fn px_to_dp(&self, px: f32) -> i32 {
        (px / self.density + 0.5) as i32
    }
}

/// Non-fatal anomaly recorded while rendering.
///
/// Diagnostics never stop a render; they describe what was dropped or
/// ignored so callers can log or assert on input quality.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderDiagnostic {
    /// An attribute value that could not be interpreted; the attribute was
    /// ignored.
    MalformedAttribute {
        tag: &'static str,
        attribute: &'static str,
        value: String,
    },
    /// A closing tag with no matching open; the close was ignored.
    UnbalancedClose { tag: String },
    /// The tokenizer hit unrecoverable input; everything consumed up to
    /// `offset` still rendered.
    TokenizerAbort { offset: usize, detail: String },
}
