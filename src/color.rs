//! Color token parsing for inline styles and `<font color>` attributes.
//!
//! Grammars are tried in order: hex (`#RRGGBB` or `#RRGGBBAA`), `rgb(r,g,b)`,
//! `rgba(r,g,b,a)` with alpha in `[0,1]`, then a small named-color table.
//! Resolution never fails: callers either suppress the style run when a token
//! does not resolve or substitute a default of their choosing.

use regex::Regex;
use std::sync::LazyLock;

/// Opaque black, the conventional fallback for unresolved CSS colors.
pub const BLACK: u32 = 0xFF00_0000;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#([0-9A-Fa-f]{6})([0-9A-Fa-f]{2})?").expect("hex color pattern is valid")
});

static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*rgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)")
        .expect("rgb color pattern is valid")
});

static RGBA_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*rgba\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*([\d.]+)")
        .expect("rgba color pattern is valid")
});

/// Named colors recognized in addition to the numeric grammars.
///
/// US and UK spellings of the gray family, plus `green`.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("darkgray", 0xFFA9_A9A9),
    ("gray", 0xFF80_8080),
    ("lightgray", 0xFFD3_D3D3),
    ("darkgrey", 0xFFA9_A9A9),
    ("grey", 0xFF80_8080),
    ("lightgrey", 0xFFD3_D3D3),
    ("green", 0xFF00_8000),
];

/// Parse a color token into a packed ARGB value.
///
/// Returns `None` when no grammar matches, so callers can decide whether an
/// unresolved token suppresses the style run entirely or falls back to a
/// default ([`resolve_or`]).
pub fn resolve(token: &str) -> Option<u32> {
    if let Some(caps) = HEX_COLOR.captures(token) {
        let rgb = u32::from_str_radix(&caps[1], 16).ok()?;
        let alpha = match caps.get(2) {
            Some(a) => u32::from_str_radix(a.as_str(), 16).ok()?,
            None => 0xFF,
        };
        return Some((alpha << 24) | rgb);
    }

    if let Some(caps) = RGB_COLOR.captures(token) {
        let (r, g, b) = (component(&caps[1]), component(&caps[2]), component(&caps[3]));
        return Some(0xFF00_0000 | (r << 16) | (g << 8) | b);
    }

    if let Some(caps) = RGBA_COLOR.captures(token) {
        let (r, g, b) = (component(&caps[1]), component(&caps[2]), component(&caps[3]));
        let alpha: f32 = caps[4].parse().ok()?;
        // Truncating scale; 0.5 maps to 127.
        let a = ((alpha * 255.0) as i64).clamp(0, 255) as u32;
        return Some((a << 24) | (r << 16) | (g << 8) | b);
    }

    let lowered = token.trim().to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|&(_, argb)| argb)
}

/// Parse a color token, substituting `default` when nothing matches.
pub fn resolve_or(token: &str, default: u32) -> u32 {
    resolve(token).unwrap_or(default)
}

fn component(digits: &str) -> u32 {
    digits.parse::<u32>().unwrap_or(0).min(255)
}
