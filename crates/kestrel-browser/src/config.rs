//! Browser configuration.

use std::time::Duration;

use kestrel_css::LayoutConfig;

/// Window geometry and timing constants.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels, chrome included.
    pub height: u32,
    /// Horizontal page margin.
    pub hstep: f32,
    /// Vertical page margin.
    pub vstep: f32,
    /// Distance scrolled per down-arrow press.
    pub scroll_step: f32,
    /// Delay between an animation frame being requested and being run.
    pub refresh_interval: Duration,
    /// Pixel size of the address bar font.
    pub chrome_font_size: f32,
    /// Padding around the address bar.
    pub chrome_padding: f32,
}

impl BrowserConfig {
    /// Layout content area for a tab of the window's width.
    #[must_use]
    pub fn layout_config(&self, width: u32) -> LayoutConfig {
        LayoutConfig::for_viewport(width as f32, self.hstep, self.vstep)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            hstep: 13.0,
            vstep: 18.0,
            scroll_step: 100.0,
            refresh_interval: Duration::from_millis(33),
            chrome_font_size: 20.0,
            chrome_padding: 5.0,
        }
    }
}
