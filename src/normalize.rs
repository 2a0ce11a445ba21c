//! Raw-tag rewriting that runs once before tokenization.
//!
//! The tag handler wants to own list, paragraph and inline-style semantics
//! uniformly, so every ambiguous tag is rewritten to an internal `x-*` name
//! the tokenizer has no opinion about. Substring rewrites of `<b` and `<i`
//! would also hit `<br` and `<img`, so those two are token-swapped out of the
//! way and restored afterwards.

use regex::Regex;
use std::sync::LazyLock;

/// Synthetic root element wrapped around the fragment.
pub const ROOT_TAG: &str = "x-root";

static DIV_WRAPPED_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<div>(<img\s+[^>]*>)</div>").expect("div-img strip pattern is valid")
});

const BR_SWAP: &str = "\u{1}BR\u{1}";
const IMG_SWAP: &str = "\u{1}IMG\u{1}";

/// Rewrite raw markup into the internal tag dialect.
///
/// Not idempotent; the builder runs it exactly once per document. The
/// declared-size pre-scan happens on the raw input *before* this rewrite so
/// attribute text is untouched when ordinals are assigned.
pub fn normalize(raw: &str) -> String {
    // A <div> that only wraps an image forces a pointless block break.
    let html = DIV_WRAPPED_IMG.replace_all(raw, "$1");

    let mut html = format!("<{ROOT_TAG}>{html}</{ROOT_TAG}>");

    for (open, close, internal) in [
        ("<ul", "</ul>", "x-ul"),
        ("<ol", "</ol>", "x-ol"),
        ("<li", "</li>", "x-li"),
        ("<font", "</font>", "x-font"),
        ("<div", "</div>", "x-div"),
        ("<span", "</span>", "x-span"),
    ] {
        html = html.replace(open, &format!("<{internal}"));
        html = html.replace(close, &format!("</{internal}>"));
    }

    // <br must survive the <b rewrite.
    html = html.replace("<br", BR_SWAP);
    html = html.replace("<b", "<x-b");
    html = html.replace(BR_SWAP, "<br");
    html = html.replace("</b>", "</x-b>");

    html = html.replace("<p", "<x-p");
    html = html.replace("</p>", "</x-p>");
    html = html.replace("<a", "<x-a");
    html = html.replace("</a>", "</x-a>");
    html = html.replace("<u", "<x-u");
    html = html.replace("</u>", "</x-u>");

    // <img must survive the <i rewrite.
    html = html.replace("<img", IMG_SWAP);
    html = html.replace("<i", "<x-i");
    html = html.replace(IMG_SWAP, "<img");
    html = html.replace("<video", "<x-video");
    html = html.replace("</video>", "</x-video>");
    html = html.replace("</i>", "</x-i>");

    // Raw line breaks become explicit break tags; self-closed so the
    // tokenizer sees a balanced stream.
    html = html.replace('\n', "<br/>");
    html = html.replace("<br>", "<br/>");

    html
}
