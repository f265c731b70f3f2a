//! Software rasterizer: executes display lists into tiny-skia pixmaps.
//!
//! Each saved layer is a full-size transparent pixmap. Restoring composites
//! it onto the layer below with the opacity and blend mode it was saved
//! with, which is how opacity, `mix-blend-mode`, and the destination-in
//! clip mask produced by paint all take effect.

use kestrel_css::{BlendMode, Canvas, ColorValue, DisplayList, FontMetrics, FontSpec, Rect};
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint,
    PremultipliedColorU8, Stroke, Transform,
};
use tracing::warn;

use crate::error::RasterError;
use crate::font::FontCache;

/// Control-point distance for approximating a quarter circle with a cubic.
const KAPPA: f32 = 0.552_284_8;

/// Allocate a surface filled with `background`.
///
/// # Errors
///
/// Returns [`RasterError::Surface`] if either dimension is zero or the
/// allocation fails.
pub fn new_surface(width: u32, height: u32, background: Color) -> Result<Pixmap, RasterError> {
    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Surface { width, height })?;
    pixmap.fill(background);
    Ok(pixmap)
}

/// Execute `list` onto a fresh white surface.
///
/// # Errors
///
/// Returns an error if the surface cannot be allocated.
pub fn rasterize(
    list: &DisplayList,
    width: u32,
    height: u32,
    fonts: &FontCache,
) -> Result<Pixmap, RasterError> {
    let mut surface = new_surface(width, height, Color::WHITE)?;
    let mut canvas = SkiaCanvas::new(&mut surface, fonts);
    list.execute(&mut canvas);
    canvas.finish();
    Ok(surface)
}

const fn map_blend_mode(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::SourceOver => tiny_skia::BlendMode::SourceOver,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Difference => tiny_skia::BlendMode::Difference,
        BlendMode::DestinationIn => tiny_skia::BlendMode::DestinationIn,
    }
}

struct Layer {
    pixmap: Pixmap,
    opacity: f32,
    blend_mode: BlendMode,
}

/// A [`Canvas`] drawing into a tiny-skia pixmap.
pub struct SkiaCanvas<'a> {
    base: &'a mut Pixmap,
    /// Saved layers, innermost last. `None` marks a layer that could not be
    /// allocated; its contents draw straight into the layer below.
    layers: Vec<Option<Layer>>,
    fonts: &'a FontCache,
}

impl<'a> SkiaCanvas<'a> {
    /// Draw onto `base` using `fonts` for text.
    pub fn new(base: &'a mut Pixmap, fonts: &'a FontCache) -> Self {
        Self {
            base,
            layers: Vec::new(),
            fonts,
        }
    }

    /// Composite any layers left unbalanced by the commands.
    pub fn finish(&mut self) {
        while !self.layers.is_empty() {
            self.restore();
        }
    }

    fn target(&mut self) -> &mut Pixmap {
        match self.layers.iter_mut().rev().find_map(Option::as_mut) {
            Some(layer) => &mut layer.pixmap,
            None => &mut *self.base,
        }
    }

    fn fill_path(&mut self, path: &Path, color: ColorValue) {
        let paint = solid_paint(color);
        self.target()
            .fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn stroke_path(&mut self, path: &Path, color: ColorValue, thickness: f32) {
        let paint = solid_paint(color);
        let stroke = Stroke {
            width: thickness,
            ..Stroke::default()
        };
        self.target()
            .stroke_path(path, &paint, &stroke, Transform::identity(), None);
    }
}

impl Canvas for SkiaCanvas<'_> {
    fn fill_rect(&mut self, rect: Rect, color: ColorValue) {
        if let Some(rect) = to_skia_rect(rect) {
            let paint = solid_paint(color);
            self.target()
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: ColorValue) {
        if let Some(path) = rounded_rect_path(rect, radius) {
            self.fill_path(&path, color);
        }
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: ColorValue, thickness: f32) {
        let mut builder = PathBuilder::new();
        builder.move_to(from.0, from.1);
        builder.line_to(to.0, to.1);
        if let Some(path) = builder.finish() {
            self.stroke_path(&path, color, thickness);
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: ColorValue, thickness: f32) {
        if let Some(rect) = to_skia_rect(rect) {
            let path = PathBuilder::from_rect(rect);
            self.stroke_path(&path, color, thickness);
        }
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, font: &FontSpec, color: ColorValue) {
        let fonts = self.fonts;
        let Some(face) = fonts.font_for(font) else {
            return;
        };
        let baseline = y - fonts.ascent(font);
        let mut cursor_x = x;
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            let (metrics, coverage) = face.rasterize(ch, font.size);
            if let Some(glyph) = glyph_pixmap(metrics.width, metrics.height, &coverage, color) {
                let glyph_x = cursor_x.round() as i32 + metrics.xmin;
                let glyph_y = baseline.round() as i32 - metrics.ymin - metrics.height as i32;
                self.target().draw_pixmap(
                    glyph_x,
                    glyph_y,
                    glyph.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
            cursor_x += metrics.advance_width;
        }
    }

    fn save_layer(&mut self, opacity: f32, blend_mode: BlendMode) {
        let (width, height) = (self.base.width(), self.base.height());
        let layer = Pixmap::new(width, height).map(|pixmap| Layer {
            pixmap,
            opacity,
            blend_mode,
        });
        if layer.is_none() {
            warn!(width, height, "failed to allocate layer; drawing without it");
        }
        self.layers.push(layer);
    }

    fn restore(&mut self) {
        let Some(Some(layer)) = self.layers.pop() else {
            return;
        };
        let paint = PixmapPaint {
            opacity: layer.opacity.clamp(0.0, 1.0),
            blend_mode: map_blend_mode(layer.blend_mode),
            quality: FilterQuality::Nearest,
        };
        self.target().draw_pixmap(
            0,
            0,
            layer.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }
}

fn solid_paint(color: ColorValue) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn to_skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

/// Path for `rect` with each corner rounded to `radius`, clamped to half
/// the shorter side.
fn rounded_rect_path(rect: Rect, radius: f32) -> Option<Path> {
    let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0);
    if radius <= 0.0 {
        return to_skia_rect(rect).map(PathBuilder::from_rect);
    }
    let (left, top, right, bottom) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let k = radius * KAPPA;
    let mut builder = PathBuilder::new();
    builder.move_to(left + radius, top);
    builder.line_to(right - radius, top);
    builder.cubic_to(right - radius + k, top, right, top + radius - k, right, top + radius);
    builder.line_to(right, bottom - radius);
    builder.cubic_to(
        right,
        bottom - radius + k,
        right - radius + k,
        bottom,
        right - radius,
        bottom,
    );
    builder.line_to(left + radius, bottom);
    builder.cubic_to(left + radius - k, bottom, left, bottom - radius + k, left, bottom - radius);
    builder.line_to(left, top + radius);
    builder.cubic_to(left, top + radius - k, left + radius - k, top, left + radius, top);
    builder.close();
    builder.finish()
}

/// Premultiplied glyph image from fontdue's coverage bitmap.
fn glyph_pixmap(width: usize, height: usize, coverage: &[u8], color: ColorValue) -> Option<Pixmap> {
    let mut glyph = Pixmap::new(width as u32, height as u32)?;
    for (pixel, &cov) in glyph.pixels_mut().iter_mut().zip(coverage) {
        let alpha = u16::from(cov) * u16::from(color.a) / 255;
        let premultiply = |channel: u8| (u16::from(channel) * alpha / 255) as u8;
        if let Some(value) = PremultipliedColorU8::from_rgba(
            premultiply(color.r),
            premultiply(color.g),
            premultiply(color.b),
            alpha as u8,
        ) {
            *pixel = value;
        }
    }
    Some(glyph)
}
