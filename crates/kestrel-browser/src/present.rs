//! Handing finished frames to the display.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgba, RgbaImage};
use tiny_skia::Pixmap;

use crate::error::PresentError;

/// The windowing backend's side of the draw step.
pub trait Presenter: Send {
    /// Show `frame`, which covers the whole window.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be shown; the compositor will
    /// try again on its next iteration.
    fn present(&mut self, frame: &Pixmap) -> Result<(), PresentError>;
}

/// Presenter for running without a window. Counts frames.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPresenter {
    frames: Arc<AtomicUsize>,
}

impl HeadlessPresenter {
    /// A new presenter with no frames shown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far. Clones share the count.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

impl Presenter for HeadlessPresenter {
    fn present(&mut self, _frame: &Pixmap) -> Result<(), PresentError> {
        let _ = self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Un-premultiply a surface into an image for saving.
#[must_use]
pub fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    RgbaImage::from_fn(pixmap.width(), pixmap.height(), |x, y| {
        pixmap.pixel(x, y).map_or(Rgba([0, 0, 0, 0]), |pixel| {
            let color = pixel.demultiply();
            Rgba([color.red(), color.green(), color.blue(), color.alpha()])
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn test_headless_presenter_counts_frames() {
        let presenter = HeadlessPresenter::new();
        let mut boxed: Box<dyn Presenter> = Box::new(presenter.clone());
        let frame = Pixmap::new(2, 2).expect("pixmap");
        boxed.present(&frame).expect("present");
        boxed.present(&frame).expect("present");
        assert_eq!(presenter.frames(), 2);
    }

    #[test]
    fn test_image_conversion_keeps_colors() {
        let mut frame = Pixmap::new(3, 2).expect("pixmap");
        frame.fill(Color::from_rgba8(10, 20, 30, 255));
        let image = to_rgba_image(&frame);
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
    }
}
