//! Render orchestration: raw markup in, immutable document snapshot out.
//!
//! The builder is the only component that knows about the host rendering
//! surface and its content loader. The pipeline is strictly forward: size
//! pre-scan over the raw markup, tag normalization, the tag-handler walk,
//! overlay derivation, trailing-newline strip, then the optional caller
//! post-transform.

use crate::document::{AttributedDocument, RunKind};
use crate::handler::TagHandler;
use crate::overlay::{self, ClickRegion, TagClickHandler, TapAction};
use crate::placeholder::{
    self, ImageLoader, LoadOutcome, PlaceholderTable, PlaceholderUpdate,
};
use crate::{normalize, DisplayMetrics, RenderDiagnostic};
use std::sync::Arc;

/// Caller hook that may rewrite the final character sequence.
///
/// Runs after overlay derivation. If the transform changes the text length,
/// offset-based runs and regions become advisory; keeping offsets consistent
/// is the caller's responsibility.
pub type PostTransform = dyn Fn(String) -> String + Send + Sync;

/// Facade over the render pipeline.
pub struct DocumentBuilder {
    metrics: DisplayMetrics,
    post_transform: Option<Box<PostTransform>>,
}

impl DocumentBuilder {
    pub fn new(metrics: DisplayMetrics) -> Self {
        Self {
            metrics,
            post_transform: None,
        }
    }

    /// Install a post-transform hook applied to the finished text.
    pub fn post_transform(mut self, hook: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.post_transform = Some(Box::new(hook));
        self
    }

    /// Render markup into an attributed document plus click regions.
    ///
    /// Never fails: malformed attributes, unbalanced tags and tokenizer
    /// errors degrade the output and are reported as diagnostics.
    pub fn render(&self, markup: &str) -> RenderedDocument {
        if markup.trim().is_empty() {
            return RenderedDocument::empty(self.metrics);
        }

        // Declared sizes come from the raw markup: ordinal assignment
        // depends on raw document order and normalization must not see
        // attribute text first.
        let records = placeholder::scan(markup);
        let normalized = normalize::normalize(markup);

        let handler = TagHandler::new(self.metrics, PlaceholderTable::new(records, self.metrics));
        let output = handler.run(&normalized);

        let mut document = output.buffer.finish();
        let mut regions = overlay::build_regions(&document);
        overlay::strip_trailing_newlines(&mut document, &mut regions);

        let image_urls = document
            .runs
            .iter()
            .filter_map(|run| match &run.kind {
                RunKind::Image { src, .. } => Some(src.clone()),
                _ => None,
            })
            .collect();

        if let Some(hook) = &self.post_transform {
            let before_len = document.char_len();
            document.text = hook(std::mem::take(&mut document.text));
            if document.char_len() != before_len {
                log::debug!("post-transform changed text length; regions are advisory now");
            }
        }

        RenderedDocument {
            document,
            regions,
            image_urls,
            diagnostics: output.diagnostics,
            placeholders: Arc::new(output.placeholders),
        }
    }
}

/// Immutable render result handed to the host surface.
#[derive(Clone, Debug)]
pub struct RenderedDocument {
    /// Text plus style/interaction runs.
    pub document: AttributedDocument,
    /// Tap regions, overlap-resolved.
    pub regions: Vec<ClickRegion>,
    /// All image URLs in document order; indexed by image tap ordinals.
    pub image_urls: Vec<String>,
    /// Non-fatal anomalies encountered while rendering.
    pub diagnostics: Vec<RenderDiagnostic>,
    placeholders: Arc<PlaceholderTable>,
}

impl RenderedDocument {
    fn empty(metrics: DisplayMetrics) -> Self {
        Self {
            document: AttributedDocument::default(),
            regions: Vec::new(),
            image_urls: Vec::new(),
            diagnostics: Vec::new(),
            placeholders: Arc::new(PlaceholderTable::new(Vec::new(), metrics)),
        }
    }

    /// Placeholder registry for this document.
    pub fn placeholders(&self) -> &PlaceholderTable {
        &self.placeholders
    }

    /// The region covering a tap offset, if any.
    pub fn region_at(&self, offset: usize) -> Option<&ClickRegion> {
        overlay::region_at(&self.regions, offset)
    }

    /// Route a tap at `offset` to the host's click handler. Returns whether
    /// a region consumed the tap.
    pub fn dispatch_tap(&self, offset: usize, handler: &dyn TagClickHandler) -> bool {
        let Some(region) = self.region_at(offset) else {
            return false;
        };
        match &region.action {
            TapAction::Image { ordinal } => handler.on_image_tap(&self.image_urls, *ordinal),
            TapAction::Link { href } => handler.on_link_tap(href),
            TapAction::Video { url } => handler.on_video_tap(url),
        }
        true
    }

    /// Start asynchronous content loads for every placeholder.
    ///
    /// `on_update` fires once per placeholder with provisional bounds
    /// (default drawable) before its fetch is dispatched, then again from
    /// the loader's completion callback with final or error bounds.
    /// Completion callbacks may arrive on any thread; the host marshals
    /// each update onto the context that owns the displayed document and
    /// drops updates for documents no longer current.
    pub fn begin_loads<L, F>(&self, loader: &L, on_update: F)
    where
        L: ImageLoader + ?Sized,
        F: Fn(PlaceholderUpdate) + Send + Sync + 'static,
    {
        let on_update = Arc::new(on_update);
        let placeholder_size = loader.placeholder_size();
        let error_size = loader.error_size();

        for ordinal in 0..self.placeholders.len() {
            on_update(self.placeholders.provisional_update(ordinal, placeholder_size));

            let Some(source) = self.placeholders.source_token(ordinal) else {
                continue;
            };
            let table = Arc::clone(&self.placeholders);
            let notify = Arc::clone(&on_update);
            let done = Box::new(move |outcome: LoadOutcome| {
                notify(table.outcome_update(ordinal, outcome, error_size));
            });

            if self.placeholders.is_video(ordinal) {
                loader.load_video_poster(&source, done);
            } else if source.is_empty() {
                log::debug!("skipping load for image placeholder {ordinal} with empty src");
            } else {
                loader.load_image(&source, done);
            }
        }
    }
}
