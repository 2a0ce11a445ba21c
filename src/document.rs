//! Attributed document model: a character sequence plus style and
//! interaction runs over half-open character ranges.
//!
//! Offsets count Unicode scalar values, not bytes, so hosts that map tap
//! positions to characters can index runs directly. Runs may overlap
//! arbitrarily; interaction runs are disambiguated later by the overlay
//! builder.

/// Horizontal alignment of a block of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    /// Natural leading edge.
    Start,
    /// Centered.
    Center,
    /// Trailing edge.
    End,
}

/// One style or interaction attribute over a character range.
#[derive(Clone, Debug, PartialEq)]
pub enum RunKind {
    /// Text color, packed ARGB.
    ForegroundColor(u32),
    /// Fixed text size. `dip` selects device-independent units.
    AbsoluteSize { size: u16, dip: bool },
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Monospace,
    /// Block alignment; the run always ends on a line break.
    Alignment(Alignment),
    /// Left margin applied to the covered lines, in density-independent
    /// units. May be negative: nested list markers subtract the previous
    /// level's marker width so indentation grows one step per level.
    LeadingMargin(i32),
    /// Bullet marker for an unordered list item. `gap_width` is the space
    /// between bullet and text, after nesting correction.
    Bullet { gap_width: i32 },
    /// Number marker for an ordered list item, 1-based display ordinal.
    Number { ordinal: u32 },
    /// Tappable hyperlink.
    Link { href: String },
    /// Inline image placeholder glyph. `ordinal` keys the placeholder
    /// registered for this occurrence.
    Image { ordinal: usize, src: String },
    /// Inline video placeholder glyph.
    Video {
        ordinal: usize,
        poster: Option<String>,
        src: Option<String>,
    },
}

/// An annotation over `[start, end)` character offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
    pub kind: RunKind,
}

/// Immutable-after-build character sequence plus its runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributedDocument {
    /// The rendered character sequence.
    pub text: String,
    /// Runs in emission order.
    pub runs: Vec<Run>,
}

impl AttributedDocument {
    /// Length in characters (Unicode scalar values).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Iterate runs of one kind predicate without allocating.
    pub fn runs_where<'a, P>(&'a self, pred: P) -> impl Iterator<Item = &'a Run>
    where
        P: Fn(&RunKind) -> bool + 'a,
    {
        self.runs.iter().filter(move |run| pred(&run.kind))
    }
}

/// Append-only buffer the tag handler builds the document in.
///
/// Tracks the character length incrementally so mark positions and run
/// bounds never re-count the string.
#[derive(Debug, Default)]
pub struct DocumentBuffer {
    text: String,
    char_len: usize,
    runs: Vec<Run>,
}

impl DocumentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length in characters; the `start` recorded by open marks and
    /// the `end` used when marks resolve.
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    pub fn ends_with_newline(&self) -> bool {
        self.text.ends_with('\n')
    }

    pub fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.char_len += 1;
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.char_len += s.chars().count();
    }

    /// Append a newline unless the buffer is empty or already ends with one.
    pub fn ensure_block_break(&mut self) {
        if !self.is_empty() && !self.ends_with_newline() {
            self.push_char('\n');
        }
    }

    /// Top up trailing newlines to at least `min`. Empty buffers are left
    /// alone so documents never lead with blank padding.
    pub fn append_min_newlines(&mut self, min: usize) {
        if self.is_empty() {
            return;
        }
        let existing = self.text.chars().rev().take_while(|&c| c == '\n').count();
        for _ in existing..min {
            self.push_char('\n');
        }
    }

    /// Record a run over `[start, current length)`. Zero-length spans are
    /// discarded; an open/close pair with no content between them produces
    /// nothing.
    pub fn push_run(&mut self, start: usize, kind: RunKind) {
        self.push_run_to(start, self.char_len, kind);
    }

    /// Record a run over an explicit range, discarding empty ranges.
    pub fn push_run_to(&mut self, start: usize, end: usize, kind: RunKind) {
        if start < end {
            self.runs.push(Run { start, end, kind });
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Freeze into the immutable document snapshot.
    pub fn finish(self) -> AttributedDocument {
        AttributedDocument {
            text: self.text,
            runs: self.runs,
        }
    }
}
