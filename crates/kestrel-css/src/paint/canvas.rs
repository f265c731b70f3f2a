//! The drawing surface display commands execute against.

use crate::layout::Rect;
use crate::values::{BlendMode, ColorValue, FontSpec};

/// A 2D drawing target with a stack of offscreen layers.
///
/// Implemented by the rasterizer. Coordinates are in the surface's own
/// pixel space.
pub trait Canvas {
    /// Fill `rect` with a solid color.
    fn fill_rect(&mut self, rect: Rect, color: ColorValue);

    /// Fill `rect` with corners rounded to `radius`.
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: ColorValue);

    /// Stroke a straight line.
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: ColorValue, thickness: f32);

    /// Stroke the outline of `rect`.
    fn stroke_rect(&mut self, rect: Rect, color: ColorValue, thickness: f32);

    /// Draw `text` with its top-left corner at `(x, y)`.
    fn draw_text(&mut self, x: f32, y: f32, text: &str, font: &FontSpec, color: ColorValue);

    /// Start drawing into a fresh transparent layer.
    fn save_layer(&mut self, opacity: f32, blend_mode: BlendMode);

    /// Composite the top layer onto the one below with the opacity and blend
    /// mode it was saved with.
    fn restore(&mut self);
}
