//! Typed views over resolved style strings.
//!
//! The cascade stores every property as the raw string the author wrote.
//! Layout and paint convert on read through the helpers here, falling back
//! to a default (and a one-time warning) when a value cannot be used.

use kestrel_common::warning::warn_once;
use serde::Serialize;

/// [§ 4 Representing Colors](https://www.w3.org/TR/css-color-4/#color-type)
///
/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorValue {
    /// "the red color channel" (0-255)
    pub r: u8,
    /// "the green color channel" (0-255)
    pub g: u8,
    /// "the blue color channel" (0-255)
    pub b: u8,
    /// "the alpha channel" (0-255, 255 = fully opaque)
    pub a: u8,
}

impl ColorValue {
    /// Opaque black, the fallback for anything unparseable.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Fully transparent.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// An opaque color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// [§ 4.2 The RGB hexadecimal notations](https://www.w3.org/TR/css-color-4/#hex-notation)
    ///
    /// Only the six-digit `#RRGGBB` form is supported.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    /// [§ 6.1 Named Colors](https://www.w3.org/TR/css-color-4/#named-colors)
    ///
    /// The handful of named colors the default stylesheet and test pages use.
    #[must_use]
    pub fn from_named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "gray" => Some(Self::rgb(0x80, 0x80, 0x80)),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::rgb(0xff, 0, 0)),
            "green" => Some(Self::rgb(0, 0xff, 0)),
            "blue" => Some(Self::rgb(0, 0, 0xff)),
            "lightblue" => Some(Self::rgb(0xad, 0xd8, 0xe6)),
            "lightgreen" => Some(Self::rgb(0x90, 0xee, 0x90)),
            "orange" => Some(Self::rgb(0xff, 0xa5, 0)),
            "orangered" => Some(Self::rgb(0xff, 0x45, 0)),
            "transparent" => Some(Self::TRANSPARENT),
            _ => None,
        }
    }

    /// Parse a color, falling back to black.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::from_hex(value)
            .or_else(|| Self::from_named(value))
            .unwrap_or_else(|| {
                warn_once("CSS", &format!("unsupported color '{value}', using black"));
                Self::BLACK
            })
    }
}

/// Parse a `<number>px` length. Anything else yields `0.0`.
#[must_use]
pub fn parse_px(value: &str) -> f32 {
    value
        .strip_suffix("px")
        .and_then(|n| n.trim().parse::<f32>().ok())
        .unwrap_or_else(|| {
            warn_once("CSS", &format!("unsupported length '{value}', using 0px"));
            0.0
        })
}

/// Parse a `<number>%` percentage into a fraction (`50%` is `0.5`).
#[must_use]
pub fn parse_percentage(value: &str) -> Option<f32> {
    value
        .strip_suffix('%')
        .and_then(|n| n.trim().parse::<f32>().ok())
        .map(|n| n / 100.0)
}

/// Parse an `opacity` value, clamped to `[0, 1]`. Unparseable values are opaque.
#[must_use]
pub fn parse_opacity(value: &str) -> f32 {
    value.trim().parse::<f32>().map_or_else(
        |_| {
            warn_once("CSS", &format!("unsupported opacity '{value}', using 1"));
            1.0
        },
        |n| n.clamp(0.0, 1.0),
    )
}

/// [Compositing § 5 Blending](https://www.w3.org/TR/compositing-1/#blending)
///
/// The blend modes the compositor understands. `DestinationIn` only ever
/// appears as the mask layer of an `overflow: clip` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Ordinary alpha compositing.
    SourceOver,
    /// `mix-blend-mode: multiply`
    Multiply,
    /// `mix-blend-mode: difference`
    Difference,
    /// Keep the destination only where the source is opaque.
    DestinationIn,
}

impl BlendMode {
    /// Parse a blend mode keyword. Unknown keywords composite normally.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "multiply" => Self::Multiply,
            "difference" => Self::Difference,
            "destination-in" => Self::DestinationIn,
            "source-over" | "normal" => Self::SourceOver,
            other => {
                warn_once("CSS", &format!("unsupported blend mode '{other}'"));
                Self::SourceOver
            }
        }
    }
}

/// [§ 3.2 'font-weight'](https://www.w3.org/TR/css-fonts-4/#font-weight-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// `normal`
    #[default]
    Normal,
    /// `bold`
    Bold,
}

/// [§ 3.3 'font-style'](https://www.w3.org/TR/css-fonts-4/#font-style-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Upright glyphs.
    #[default]
    Roman,
    /// `italic`
    Italic,
}

/// Everything needed to pick and size a face.
///
/// `size` is in device pixels: three quarters of the CSS `font-size`,
/// truncated to a whole number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FontSpec {
    /// Face size in device pixels.
    pub size: f32,
    /// Weight.
    pub weight: FontWeight,
    /// Slant.
    pub style: FontStyle,
}

impl FontSpec {
    /// A regular upright font at `size`.
    #[must_use]
    pub const fn regular(size: f32) -> Self {
        Self {
            size,
            weight: FontWeight::Normal,
            style: FontStyle::Roman,
        }
    }

    /// Derive the font from a node's resolved `font-size`, `font-weight`,
    /// and `font-style`.
    #[must_use]
    pub fn from_style(font_size: &str, font_weight: &str, font_style: &str) -> Self {
        let weight = if font_weight == "bold" {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        };
        let style = if font_style == "italic" {
            FontStyle::Italic
        } else {
            FontStyle::Roman
        };
        Self {
            size: (parse_px(font_size) * 0.75).trunc(),
            weight,
            style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(ColorValue::parse("#ff0000"), ColorValue::rgb(255, 0, 0));
        assert_eq!(ColorValue::parse("blue"), ColorValue::rgb(0, 0, 255));
        assert_eq!(ColorValue::parse("#fff"), ColorValue::BLACK);
        assert_eq!(ColorValue::parse("chartreuse"), ColorValue::BLACK);
    }

    #[test]
    fn test_length_parsing() {
        assert!((parse_px("16px") - 16.0).abs() < f32::EPSILON);
        assert!((parse_px("2.5px") - 2.5).abs() < f32::EPSILON);
        assert!(parse_px("2em").abs() < f32::EPSILON);
        assert_eq!(parse_percentage("50%"), Some(0.5));
        assert_eq!(parse_percentage("50px"), None);
    }

    #[test]
    fn test_opacity_is_clamped() {
        assert!((parse_opacity("0.5") - 0.5).abs() < f32::EPSILON);
        assert!((parse_opacity("3") - 1.0).abs() < f32::EPSILON);
        assert!((parse_opacity("half") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_font_from_style() {
        let font = FontSpec::from_style("16px", "bold", "italic");
        assert!((font.size - 12.0).abs() < f32::EPSILON);
        assert_eq!(font.weight, FontWeight::Bold);
        assert_eq!(font.style, FontStyle::Italic);

        let font = FontSpec::from_style("15px", "normal", "normal");
        assert!((font.size - 11.0).abs() < f32::EPSILON);
        assert_eq!(font.style, FontStyle::Roman);
    }
}
