//! Font measurement for layout.
//!
//! [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
//!
//! "CSS assumes that every font has font metrics that specify a
//! characteristic height above the baseline and a depth below it."

use crate::values::FontSpec;

/// Text measurement provider used by layout and paint.
///
/// The sign convention follows the rasterizer: `ascent` is the (negative)
/// offset from the baseline to the top of the tallest glyph and `descent`
/// is the (positive) offset to the bottom of the deepest one.
pub trait FontMetrics: Send + Sync {
    /// Advance width of `text` set in `font`.
    fn measure(&self, text: &str, font: &FontSpec) -> f32;

    /// Offset from the baseline to the top of the font. Negative.
    fn ascent(&self, font: &FontSpec) -> f32;

    /// Offset from the baseline to the bottom of the font. Positive.
    fn descent(&self, font: &FontSpec) -> f32;

    /// Distance from the top of one line of `font` to the top of the next.
    fn linespace(&self, font: &FontSpec) -> f32 {
        self.descent(font) - self.ascent(font)
    }
}

/// Deterministic metrics for tests and for running without system fonts.
///
/// Every character advances `0.6 × size`; the font rises `0.8 × size` above
/// the baseline and drops `0.2 × size` below it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateFontMetrics;

impl FontMetrics for ApproximateFontMetrics {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        text.chars().count() as f32 * font.size * 0.6
    }

    fn ascent(&self, font: &FontSpec) -> f32 {
        -0.8 * font.size
    }

    fn descent(&self, font: &FontSpec) -> f32 {
        0.2 * font.size
    }
}
