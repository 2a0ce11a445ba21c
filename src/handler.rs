//! The tag-handling state machine.
//!
//! Consumes the tokenizer's open/close event stream over normalized markup
//! and incrementally builds the attributed document. There is no global
//! state enum: state lives in the list-context stack and the per-kind
//! open-mark stacks. An opening tag pushes a zero-length mark recording the
//! current buffer position; the matching close pops it and emits concrete
//! runs over `[mark, current length)`. A close with an empty stack is a
//! logged no-op so unbalanced markup degrades instead of failing.

use crate::attrs::attributes;
use crate::color;
use crate::document::{Alignment, DocumentBuffer, RunKind};
use crate::normalize::ROOT_TAG;
use crate::placeholder::PlaceholderTable;
use crate::{DisplayMetrics, RenderDiagnostic};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::LazyLock;

/// Glyph standing in for inline image/video content.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Base list indent in density-independent units.
const INDENT: i32 = 10;
/// Per-level indent for list items.
const LIST_ITEM_INDENT: i32 = INDENT * 2;
/// Radius of the rendered bullet glyph; part of the marker's leading width.
const BULLET_RADIUS: i32 = 4;
/// Leading width a bullet marker occupies: glyph plus its gap.
const BULLET_LEADING_WIDTH: i32 = 2 * BULLET_RADIUS + INDENT;
/// Minimum newline padding around paragraph blocks.
const PARAGRAPH_NEWLINES: usize = 1;

static STYLE_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\s+|\A|;\s*)color\s*:\s*([^;]+)").expect("style color pattern is valid")
});

static STYLE_FONT_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"font-size\s*:\s*(\d+)px").expect("style font-size pattern is valid")
});

static TEXT_ALIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\s+|\A)text-align\s*:\s*(\S+)").expect("text-align pattern is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

/// Inline color/size captured from a `style` attribute at open time.
#[derive(Debug)]
struct ForegroundMark {
    start: usize,
    color: Option<u32>,
    size: Option<u16>,
}

/// Mark for b/u/i tags; `styled` records whether the open also pushed a
/// foreground mark, so the close pops symmetrically.
#[derive(Debug)]
struct StyledMark {
    start: usize,
    styled: bool,
}

#[derive(Debug)]
struct AnchorMark {
    start: usize,
    href: Option<String>,
    styled: bool,
}

#[derive(Debug)]
struct ParagraphMark {
    align: Option<(usize, Alignment)>,
    styled: bool,
}

#[derive(Debug)]
struct FontMark {
    start: usize,
    color: Option<String>,
    size: Option<String>,
}

/// Everything the tag walk produces.
pub(crate) struct HandlerOutput {
    pub buffer: DocumentBuffer,
    pub placeholders: PlaceholderTable,
    pub diagnostics: Vec<RenderDiagnostic>,
}

pub(crate) struct TagHandler {
    buf: DocumentBuffer,
    metrics: DisplayMetrics,
    placeholders: PlaceholderTable,
    diagnostics: Vec<RenderDiagnostic>,

    lists: SmallVec<[ListKind; 4]>,
    ol_counters: SmallVec<[u32; 4]>,
    ul_items: SmallVec<[usize; 4]>,
    ol_items: SmallVec<[usize; 4]>,

    foregrounds: SmallVec<[ForegroundMark; 4]>,
    spans: SmallVec<[bool; 4]>,
    bolds: SmallVec<[StyledMark; 4]>,
    underlines: SmallVec<[StyledMark; 4]>,
    italics: SmallVec<[StyledMark; 4]>,
    anchors: SmallVec<[AnchorMark; 2]>,
    paragraphs: SmallVec<[ParagraphMark; 2]>,
    fonts: SmallVec<[FontMark; 2]>,
    strikes: SmallVec<[usize; 2]>,
    codes: SmallVec<[usize; 2]>,
    centers: SmallVec<[usize; 2]>,
    table_rows: SmallVec<[usize; 2]>,
    table_headers: SmallVec<[usize; 2]>,
    table_cells: SmallVec<[usize; 2]>,
}

impl TagHandler {
    pub(crate) fn new(metrics: DisplayMetrics, placeholders: PlaceholderTable) -> Self {
        Self {
            buf: DocumentBuffer::new(),
            metrics,
            placeholders,
            diagnostics: Vec::new(),
            lists: SmallVec::new(),
            ol_counters: SmallVec::new(),
            ul_items: SmallVec::new(),
            ol_items: SmallVec::new(),
            foregrounds: SmallVec::new(),
            spans: SmallVec::new(),
            bolds: SmallVec::new(),
            underlines: SmallVec::new(),
            italics: SmallVec::new(),
            anchors: SmallVec::new(),
            paragraphs: SmallVec::new(),
            fonts: SmallVec::new(),
            strikes: SmallVec::new(),
            codes: SmallVec::new(),
            centers: SmallVec::new(),
            table_rows: SmallVec::new(),
            table_headers: SmallVec::new(),
            table_cells: SmallVec::new(),
        }
    }

    /// Walk normalized markup and build the document.
    ///
    /// Tokenizer errors abort the walk with a diagnostic; everything
    /// consumed so far still renders.
    pub(crate) fn run(mut self, normalized: &str) -> HandlerOutput {
        let mut reader = Reader::from_reader(normalized.as_bytes());
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;
        reader.config_mut().allow_unmatched_ends = true;
        let mut buf = Vec::with_capacity(64);
        let mut entity_buf = String::with_capacity(16);

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let tag = decode_name(e.name().as_ref());
                    self.open(&tag, &e);
                }
                Ok(Event::Empty(e)) => {
                    let tag = decode_name(e.name().as_ref());
                    self.open(&tag, &e);
                    self.close(&tag);
                }
                Ok(Event::End(e)) => {
                    let tag = decode_name(e.name().as_ref());
                    self.close(&tag);
                }
                Ok(Event::Text(e)) => match e.decode() {
                    Ok(text) => self.append_text(text.as_ref()),
                    Err(err) => log::debug!("undecodable text node: {err:?}"),
                },
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e);
                    self.append_text(text.as_ref());
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Ok(name) = e.decode() {
                        entity_buf.clear();
                        entity_buf.push('&');
                        entity_buf.push_str(name.as_ref());
                        entity_buf.push(';');
                        match quick_xml::escape::unescape(&entity_buf) {
                            Ok(resolved) => self.append_text(resolved.as_ref()),
                            // Unknown entity: keep it visible as literal text.
                            Err(_) => {
                                let literal = entity_buf.clone();
                                self.append_text(&literal);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    let offset = reader.buffer_position() as usize;
                    log::warn!("tokenizer error at {offset}, keeping partial document: {err:?}");
                    self.diagnostics.push(RenderDiagnostic::TokenizerAbort {
                        offset,
                        detail: format!("{err:?}"),
                    });
                    break;
                }
            }
            buf.clear();
        }

        HandlerOutput {
            buffer: self.buf,
            placeholders: self.placeholders,
            diagnostics: self.diagnostics,
        }
    }

    fn open(&mut self, tag: &str, event: &BytesStart<'_>) {
        match tag {
            "x-ul" => self.lists.push(ListKind::Unordered),
            "x-ol" => {
                self.lists.push(ListKind::Ordered);
                self.ol_counters.push(1);
            }
            "x-li" => self.open_list_item(),
            "x-font" => {
                let attrs = attributes(event);
                self.fonts.push(FontMark {
                    start: self.buf.len(),
                    color: attrs.get("color").cloned(),
                    size: attrs.get("size").cloned(),
                });
            }
            "x-div" => self.buf.ensure_block_break(),
            "x-span" => {
                let styled = self.open_foreground(event);
                self.spans.push(styled);
            }
            "x-b" => {
                let styled = self.open_foreground(event);
                self.bolds.push(StyledMark {
                    start: self.buf.len(),
                    styled,
                });
            }
            "x-u" => {
                let styled = self.open_foreground(event);
                self.underlines.push(StyledMark {
                    start: self.buf.len(),
                    styled,
                });
            }
            "x-i" => {
                let styled = self.open_foreground(event);
                self.italics.push(StyledMark {
                    start: self.buf.len(),
                    styled,
                });
            }
            "x-p" => self.open_paragraph(event),
            "x-a" => {
                let attrs = attributes(event);
                let href = attrs.get("href").cloned();
                let styled = self.open_foreground(event);
                self.anchors.push(AnchorMark {
                    start: self.buf.len(),
                    href,
                    styled,
                });
            }
            "x-video" => self.open_video(event),
            "img" => self.open_image(event),
            "br" => self.buf.push_char('\n'),
            "code" => self.codes.push(self.buf.len()),
            "center" => self.centers.push(self.buf.len()),
            "s" | "strike" => self.strikes.push(self.buf.len()),
            "tr" => self.table_rows.push(self.buf.len()),
            "th" => self.table_headers.push(self.buf.len()),
            "td" => self.table_cells.push(self.buf.len()),
            _ => {
                if tag != ROOT_TAG {
                    log::debug!("ignoring unknown tag <{tag}>");
                }
            }
        }
    }

    fn close(&mut self, tag: &str) {
        match tag {
            "x-ul" => self.close_list(ListKind::Unordered, tag),
            "x-ol" => self.close_list(ListKind::Ordered, tag),
            "x-li" => self.close_list_item(),
            "x-font" => self.close_font(tag),
            "x-div" => self.buf.ensure_block_break(),
            "x-span" => match self.spans.pop() {
                Some(true) => self.close_foreground(),
                Some(false) => {}
                None => self.unbalanced(tag),
            },
            "x-b" => self.close_styled_mark(tag, RunKind::Bold),
            "x-u" => self.close_styled_mark(tag, RunKind::Underline),
            "x-i" => self.close_styled_mark(tag, RunKind::Italic),
            "x-p" => self.close_paragraph(tag),
            "x-a" => self.close_anchor(tag),
            // Videos are handled entirely at open.
            "x-video" => {}
            "img" | "br" => {}
            "code" => match self.codes.pop() {
                Some(start) => self.buf.push_run(start, RunKind::Monospace),
                None => self.unbalanced(tag),
            },
            "center" => self.close_center(tag),
            "s" | "strike" => match self.strikes.pop() {
                Some(start) => self.buf.push_run(start, RunKind::Strikethrough),
                None => self.unbalanced(tag),
            },
            // Reserved for future table support; marks pair up but emit
            // no runs.
            "tr" => {
                self.table_rows.pop();
            }
            "th" => {
                self.table_headers.pop();
            }
            "td" => {
                self.table_cells.pop();
            }
            _ => {}
        }
    }

    fn open_list_item(&mut self) {
        self.buf.ensure_block_break();
        match self.lists.last() {
            Some(ListKind::Ordered) => {
                self.ol_items.push(self.buf.len());
                if let Some(counter) = self.ol_counters.last_mut() {
                    *counter += 1;
                }
            }
            Some(ListKind::Unordered) => self.ul_items.push(self.buf.len()),
            None => {}
        }
    }

    fn close_list_item(&mut self) {
        let depth = self.lists.len() as i32;
        match self.lists.last() {
            Some(ListKind::Unordered) => {
                self.buf.ensure_block_break();
                // Nested bullet markers compound leading width; counter the
                // previous levels so indentation grows one step per level.
                let mut gap_width = INDENT;
                if depth > 1 {
                    gap_width = INDENT - BULLET_LEADING_WIDTH;
                    if depth > 2 {
                        gap_width -= (depth - 2) * LIST_ITEM_INDENT;
                    }
                }
                match self.ul_items.pop() {
                    Some(start) => {
                        let margin = LIST_ITEM_INDENT * (depth - 1);
                        self.buf.push_run(start, RunKind::LeadingMargin(margin));
                        self.buf.push_run(start, RunKind::Bullet { gap_width });
                    }
                    None => self.unbalanced("li"),
                }
            }
            Some(ListKind::Ordered) => {
                self.buf.ensure_block_break();
                let mut margin = LIST_ITEM_INDENT * (depth - 1);
                if depth > 2 {
                    margin -= (depth - 2) * LIST_ITEM_INDENT;
                }
                let ordinal = self.ol_counters.last().map_or(0, |c| c.saturating_sub(1));
                match self.ol_items.pop() {
                    Some(start) => {
                        self.buf.push_run(start, RunKind::LeadingMargin(margin));
                        self.buf.push_run(start, RunKind::Number { ordinal });
                    }
                    None => self.unbalanced("li"),
                }
            }
            None => {}
        }
    }

    fn close_list(&mut self, kind: ListKind, tag: &str) {
        if self.lists.last() == Some(&kind) {
            self.lists.pop();
            if kind == ListKind::Ordered {
                self.ol_counters.pop();
            }
        } else {
            self.unbalanced(tag);
        }
    }

    /// Capture `color:`/`font-size:Npx` from a `style` attribute as a
    /// foreground mark. Returns whether a mark was pushed, so the close
    /// side pops symmetrically.
    fn open_foreground(&mut self, event: &BytesStart<'_>) -> bool {
        let attrs = attributes(event);
        let Some(style) = attrs.get("style") else {
            return false;
        };

        let color = STYLE_COLOR
            .captures(style)
            .map(|caps| color::resolve_or(caps[1].trim(), color::BLACK));
        let size = STYLE_FONT_SIZE.captures(style).and_then(|caps| {
            let digits = &caps[1];
            match digits.parse::<u16>() {
                Ok(size) => Some(size),
                Err(_) => {
                    self.malformed("span", "font-size", digits);
                    None
                }
            }
        });

        self.foregrounds.push(ForegroundMark {
            start: self.buf.len(),
            color,
            size,
        });
        true
    }

    fn close_foreground(&mut self) {
        let Some(mark) = self.foregrounds.pop() else {
            return;
        };
        if let Some(argb) = mark.color {
            // Inline colors render fully opaque.
            self.buf
                .push_run(mark.start, RunKind::ForegroundColor(argb | 0xFF00_0000));
        }
        if let Some(size) = mark.size {
            if size > 0 {
                self.buf
                    .push_run(mark.start, RunKind::AbsoluteSize { size, dip: true });
            }
        }
    }

    fn close_styled_mark(&mut self, tag: &str, kind: RunKind) {
        let stack = match tag {
            "x-b" => &mut self.bolds,
            "x-u" => &mut self.underlines,
            _ => &mut self.italics,
        };
        match stack.pop() {
            Some(mark) => {
                if mark.styled {
                    self.close_foreground();
                }
                self.buf.push_run(mark.start, kind);
            }
            None => self.unbalanced(tag),
        }
    }

    fn open_paragraph(&mut self, event: &BytesStart<'_>) {
        self.buf.append_min_newlines(PARAGRAPH_NEWLINES);
        let attrs = attributes(event);
        let align = attrs.get("style").and_then(|style| {
            TEXT_ALIGN.captures(style).and_then(|caps| {
                let value = caps[1].split(';').next().unwrap_or("").trim();
                match value.to_ascii_lowercase().as_str() {
                    "start" => Some((self.buf.len(), Alignment::Start)),
                    "center" => Some((self.buf.len(), Alignment::Center)),
                    "end" => Some((self.buf.len(), Alignment::End)),
                    other => {
                        self.malformed("p", "text-align", other);
                        None
                    }
                }
            })
        });
        let styled = self.open_foreground(event);
        self.paragraphs.push(ParagraphMark { align, styled });
    }

    fn close_paragraph(&mut self, tag: &str) {
        match self.paragraphs.pop() {
            Some(mark) => {
                if mark.styled {
                    self.close_foreground();
                }
                self.buf.append_min_newlines(PARAGRAPH_NEWLINES);
                if let Some((start, alignment)) = mark.align {
                    self.buf.push_run(start, RunKind::Alignment(alignment));
                }
            }
            None => self.unbalanced(tag),
        }
    }

    fn close_anchor(&mut self, tag: &str) {
        match self.anchors.pop() {
            Some(mark) => {
                if mark.styled {
                    self.close_foreground();
                }
                match mark.href {
                    Some(href) if !href.is_empty() => {
                        self.buf.push_run(mark.start, RunKind::Link { href });
                    }
                    _ => {}
                }
            }
            None => self.unbalanced(tag),
        }
    }

    fn close_center(&mut self, tag: &str) {
        match self.centers.pop() {
            Some(start) => {
                // Alignment runs must end on a line break.
                if start != self.buf.len() {
                    self.buf.push_char('\n');
                    self.buf
                        .push_run(start, RunKind::Alignment(Alignment::Center));
                }
            }
            None => self.unbalanced(tag),
        }
    }

    fn close_font(&mut self, tag: &str) {
        let Some(mark) = self.fonts.pop() else {
            self.unbalanced(tag);
            return;
        };
        if mark.start == self.buf.len() {
            return;
        }
        if let Some(token) = &mark.color {
            match color::resolve(token) {
                Some(argb) => self
                    .buf
                    .push_run(mark.start, RunKind::ForegroundColor(argb | 0xFF00_0000)),
                None => self.malformed("font", "color", token),
            }
        }
        if let Some(raw) = &mark.size {
            match self.legacy_font_size(raw) {
                Some(size) => self
                    .buf
                    .push_run(mark.start, RunKind::AbsoluteSize { size, dip: true }),
                None => self.malformed("font", "size", raw),
            }
        }
    }

    /// Legacy `<font size=N>` mapping: clamp N to [1,7]; level 3 is the
    /// ambient size and each level shifts one device-independent unit.
    fn legacy_font_size(&self, raw: &str) -> Option<u16> {
        let level: i32 = raw.trim().parse().ok()?;
        let level = level.clamp(1, 7);
        let base = self.metrics.px_to_dp(self.metrics.base_text_size_px);
        let size = base + (level - 3);
        u16::try_from(size).ok().filter(|&s| s > 0)
    }

    fn open_video(&mut self, event: &BytesStart<'_>) {
        let attrs = attributes(event);
        let src = attrs.get("src").cloned();
        let poster = attrs.get("poster").cloned();
        let ordinal = self.placeholders.register_video(poster.clone());
        let start = self.buf.len();
        self.buf.push_char(OBJECT_REPLACEMENT);
        self.buf.push_run(
            start,
            RunKind::Video {
                ordinal,
                poster,
                src,
            },
        );
    }

    fn open_image(&mut self, event: &BytesStart<'_>) {
        let attrs = attributes(event);
        let src = attrs.get("src").cloned().unwrap_or_default();
        if src.is_empty() {
            log::debug!("image tag without src; placeholder will stay provisional");
        }
        let ordinal = self.placeholders.register_image(src.clone());
        let start = self.buf.len();
        self.buf.push_char(OBJECT_REPLACEMENT);
        self.buf.push_run(start, RunKind::Image { ordinal, src });
    }

    /// Append a text node with whitespace collapsed: interior runs become a
    /// single space, and a leading space survives only when the buffer
    /// doesn't already end in whitespace.
    fn append_text(&mut self, raw: &str) {
        let mut pending_space = false;
        let mut wrote = false;
        let mut out = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space {
                if wrote || !self.ends_with_whitespace() {
                    out.push(' ');
                }
                pending_space = false;
            }
            out.push(ch);
            wrote = true;
        }
        if pending_space && wrote {
            out.push(' ');
        }
        if !out.is_empty() {
            self.buf.push_str(&out);
        }
    }

    fn ends_with_whitespace(&self) -> bool {
        self.buf
            .text()
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace)
    }

    fn unbalanced(&mut self, tag: &str) {
        log::debug!("close </{tag}> without matching open; ignoring");
        self.diagnostics.push(RenderDiagnostic::UnbalancedClose {
            tag: tag.trim_start_matches("x-").to_string(),
        });
    }

    fn malformed(&mut self, tag: &'static str, attribute: &'static str, value: &str) {
        log::warn!("malformed {attribute} on <{tag}>: {value:?}");
        self.diagnostics.push(RenderDiagnostic::MalformedAttribute {
            tag,
            attribute,
            value: value.to_string(),
        });
    }
}

fn decode_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}
