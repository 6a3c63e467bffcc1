//! Text layout and line breaking
//!
//! Greedy word wrapping against a width budget. Tokens that cannot fit on a line of
//! their own are hard-broken grapheme by grapheme.

use crate::fonts::{FontHandle, FontResolver, FontWeight};
use crate::runs::measure_mixed;
use unicode_segmentation::UnicodeSegmentation;

/// Anything that can tell how wide a string renders, in points.
pub trait TextMeasure {
    fn width(&self, text: &str) -> f32;
}

/// Measures with a single font at a fixed size.
pub struct FontMeasure<'a> {
    pub fonts: &'a FontResolver,
    pub font: FontHandle,
    pub size: f32,
}

impl TextMeasure for FontMeasure<'_> {
    fn width(&self, text: &str) -> f32 {
        self.fonts.measure(text, self.font, self.size)
    }
}

/// Measures run by run, so mixed-script text uses the right font for each part.
pub struct MixedMeasure<'a> {
    pub fonts: &'a FontResolver,
    pub weight: FontWeight,
    pub size: f32,
}

impl TextMeasure for MixedMeasure<'_> {
    fn width(&self, text: &str) -> f32 {
        measure_mixed(self.fonts, text, self.weight, self.size)
    }
}

/// One display line produced by the wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    pub width: f32,
}

impl LayoutLine {
    fn measured(text: String, measure: &impl TextMeasure) -> Self {
        let width = measure.width(&text);
        Self { text, width }
    }
}

/// Wrap `text` into lines no wider than `max_width`.
///
/// Always returns at least one line; empty input gives a single empty line.
pub fn wrap(text: &str, measure: &impl TextMeasure, max_width: f32) -> Vec<LayoutLine> {
    let mut lines = Vec::new();
    let mut buffer = String::new();

    for token in text.split_whitespace() {
        let candidate = if buffer.is_empty() {
            token.to_string()
        } else {
            format!("{} {}", buffer, token)
        };

        if measure.width(&candidate) <= max_width {
            buffer = candidate;
            continue;
        }

        if !buffer.is_empty() {
            lines.push(LayoutLine::measured(std::mem::take(&mut buffer), measure));
        }

        if measure.width(token) <= max_width {
            buffer = token.to_string();
        } else {
            let mut fragments = hard_break(token, measure, max_width);
            // The last fragment keeps accumulating words.
            buffer = fragments.pop().unwrap_or_default();
            lines.extend(
                fragments
                    .into_iter()
                    .map(|fragment| LayoutLine::measured(fragment, measure)),
            );
        }
    }

    if !buffer.is_empty() || lines.is_empty() {
        lines.push(LayoutLine::measured(buffer, measure));
    }
    lines
}

/// Convenience wrapper for single-font text.
pub fn wrap_with_font(
    text: &str,
    fonts: &FontResolver,
    font: FontHandle,
    size: f32,
    max_width: f32,
) -> Vec<LayoutLine> {
    wrap(text, &FontMeasure { fonts, font, size }, max_width)
}

/// Break an over-wide token into maximal fragments that each fit `max_width`.
///
/// A grapheme wider than the budget on its own becomes a fragment by itself.
pub fn hard_break(token: &str, measure: &impl TextMeasure, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current_piece = String::new();

    for grapheme in token.graphemes(true) {
        let test_piece = format!("{}{}", current_piece, grapheme);
        if measure.width(&test_piece) <= max_width {
            current_piece = test_piece;
        } else if current_piece.is_empty() {
            pieces.push(grapheme.to_string());
        } else {
            pieces.push(std::mem::replace(&mut current_piece, grapheme.to_string()));
        }
    }

    if !current_piece.is_empty() {
        pieces.push(current_piece);
    }
    pieces
}
