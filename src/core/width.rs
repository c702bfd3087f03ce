//! Grapheme-aware width helpers for plain text fallback output.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Truncates `input` to at most `width` columns without splitting graphemes.
pub fn fit_to_width(input: &str, width: usize) -> String {
    let mut out = String::with_capacity(input.len().min(width * 4));
    let mut used = 0;
    for grapheme in input.graphemes(true) {
        let grapheme_width = UnicodeWidthStr::width(grapheme);
        if used + grapheme_width > width {
            break;
        }
        used += grapheme_width;
        out.push_str(grapheme);
    }
    out
}
