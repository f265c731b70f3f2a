//! System fonts loaded with fontdue, shared by layout and raster.
//!
//! [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
//!
//! "CSS assumes that every font has font metrics that specify a
//! characteristic height above the baseline and a depth below it."

use fontdue::{Font, FontSettings};
use kestrel_css::{ApproximateFontMetrics, FontMetrics, FontSpec, FontStyle, FontWeight};
use tracing::{debug, warn};

/// Common system font paths to search for a default (regular) font.
const FONT_SEARCH_PATHS: &[&str] = &[
    // macOS
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/SFNS.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    // Windows
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

/// System font paths for bold variants.
const FONT_BOLD_SEARCH_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// System font paths for italic variants.
const FONT_ITALIC_SEARCH_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Italic.ttf",
    "/Library/Fonts/Arial Italic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Oblique.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Italic.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansOblique.ttf",
    "C:\\Windows\\Fonts\\ariali.ttf",
];

/// System font paths for bold-italic variants.
const FONT_BOLD_ITALIC_SEARCH_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
    "/Library/Fonts/Arial Bold Italic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-BoldOblique.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBoldOblique.ttf",
    "C:\\Windows\\Fonts\\arialbi.ttf",
];

/// The four faces of the UI font, each optional.
///
/// Loaded once at startup and shared (behind an `Arc`) by every tab's
/// layout and by the compositor's rasterizer, so measurement and drawing
/// always agree. With no regular face available, measurement falls back to
/// [`ApproximateFontMetrics`] and text is not drawn.
#[derive(Default)]
pub struct FontCache {
    regular: Option<Font>,
    bold: Option<Font>,
    italic: Option<Font>,
    bold_italic: Option<Font>,
}

impl FontCache {
    /// Search the usual system locations for each face.
    #[must_use]
    pub fn load_system() -> Self {
        let regular = load_font_from_paths(FONT_SEARCH_PATHS, "regular");
        if regular.is_none() {
            warn!(
                searched = FONT_SEARCH_PATHS.len(),
                "no system font found; text will be measured approximately and not drawn"
            );
        }
        Self {
            regular,
            bold: load_font_from_paths(FONT_BOLD_SEARCH_PATHS, "bold"),
            italic: load_font_from_paths(FONT_ITALIC_SEARCH_PATHS, "italic"),
            bold_italic: load_font_from_paths(FONT_BOLD_ITALIC_SEARCH_PATHS, "bold-italic"),
        }
    }

    /// A cache with no faces. Measurement is approximate; nothing is drawn.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a regular face was found.
    #[must_use]
    pub const fn has_fonts(&self) -> bool {
        self.regular.is_some()
    }

    /// Best available face for `spec`, falling back through partial matches
    /// to the regular face.
    #[must_use]
    pub fn font_for(&self, spec: &FontSpec) -> Option<&Font> {
        let bold = spec.weight == FontWeight::Bold;
        let italic = spec.style == FontStyle::Italic;
        match (bold, italic) {
            (true, true) => self
                .bold_italic
                .as_ref()
                .or(self.bold.as_ref())
                .or(self.regular.as_ref()),
            (true, false) => self.bold.as_ref().or(self.regular.as_ref()),
            (false, true) => self.italic.as_ref().or(self.regular.as_ref()),
            (false, false) => self.regular.as_ref(),
        }
    }
}

impl FontMetrics for FontCache {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        let Some(face) = self.font_for(font) else {
            return ApproximateFontMetrics.measure(text, font);
        };
        text.chars()
            .filter(|ch| !ch.is_control())
            .map(|ch| face.metrics(ch, font.size).advance_width)
            .sum()
    }

    fn ascent(&self, font: &FontSpec) -> f32 {
        // fontdue reports ascent as a positive distance above the baseline.
        self.font_for(font)
            .and_then(|face| face.horizontal_line_metrics(font.size))
            .map_or_else(|| ApproximateFontMetrics.ascent(font), |m| -m.ascent)
    }

    fn descent(&self, font: &FontSpec) -> f32 {
        self.font_for(font)
            .and_then(|face| face.horizontal_line_metrics(font.size))
            .map_or_else(|| ApproximateFontMetrics.descent(font), |m| -m.descent)
    }
}

fn load_font_from_paths(paths: &[&str], label: &str) -> Option<Font> {
    for path in paths {
        if let Ok(data) = std::fs::read(path)
            && let Ok(font) = Font::from_bytes(data, FontSettings::default())
        {
            debug!(face = label, path = path, "loaded system font");
            return Some(font);
        }
    }
    None
}
