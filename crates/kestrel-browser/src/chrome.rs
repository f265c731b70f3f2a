//! The browser chrome: an address bar above the content area.

use kestrel_css::{ColorValue, DisplayCommand, DisplayList, FontMetrics, FontSpec, Rect};

use crate::config::BrowserConfig;

/// Geometry of the address bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Chrome {
    font: FontSpec,
    padding: f32,
    bottom: f32,
    address_rect: Rect,
}

impl Chrome {
    /// Lay out the chrome for a window of `width`.
    #[must_use]
    pub fn new(config: &BrowserConfig, width: f32, metrics: &dyn FontMetrics) -> Self {
        let font = FontSpec::regular(config.chrome_font_size);
        let padding = config.chrome_padding;
        let font_height = metrics.linespace(&font);
        let address_rect = Rect::from_ltrb(
            padding,
            padding,
            width - padding,
            padding + font_height,
        );
        Self {
            font,
            padding,
            bottom: address_rect.bottom() + padding,
            address_rect,
        }
    }

    /// Height of the chrome; the content area starts here.
    #[must_use]
    pub const fn bottom(&self) -> f32 {
        self.bottom
    }

    /// The outlined box showing the URL.
    #[must_use]
    pub const fn address_rect(&self) -> Rect {
        self.address_rect
    }

    /// Draw the chrome showing `url` across a window of `width`.
    #[must_use]
    pub fn paint(&self, url: &str, width: f32, metrics: &dyn FontMetrics) -> DisplayList {
        let black = ColorValue::BLACK;
        let mut list = DisplayList::new();
        list.push(DisplayCommand::Rect {
            rect: Rect::new(0.0, 0.0, width, self.bottom),
            color: ColorValue::WHITE,
        });
        list.push(DisplayCommand::line(
            (0.0, self.bottom),
            (width, self.bottom),
            black,
            1.0,
        ));
        list.push(DisplayCommand::Outline {
            rect: self.address_rect,
            color: black,
            thickness: 1.0,
        });
        list.push(DisplayCommand::text(
            self.address_rect.left() + self.padding,
            self.address_rect.top(),
            url,
            self.font,
            black,
            metrics,
        ));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_css::ApproximateFontMetrics;

    #[test]
    fn test_chrome_height_is_one_line_plus_padding() {
        let chrome = Chrome::new(&BrowserConfig::default(), 800.0, &ApproximateFontMetrics);
        // 20px font: linespace 20, padding 5 above and below.
        assert!((chrome.bottom() - 30.0).abs() < 1e-3);
        assert!((chrome.address_rect().right() - 795.0).abs() < 1e-3);
    }

    #[test]
    fn test_chrome_paints_url() {
        let chrome = Chrome::new(&BrowserConfig::default(), 800.0, &ApproximateFontMetrics);
        let list = chrome.paint("http://example.org/", 800.0, &ApproximateFontMetrics);
        let texts: Vec<_> = list
            .commands()
            .iter()
            .filter_map(|cmd| match cmd {
                DisplayCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["http://example.org/"]);
        assert!(matches!(list.commands()[0], DisplayCommand::Rect { .. }));
    }
}
