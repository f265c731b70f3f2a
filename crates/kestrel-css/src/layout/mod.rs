//! Layout: block and inline formatting over the styled DOM.
//!
//! [CSS 2.1 § 9 Visual formatting model](https://www.w3.org/TR/CSS2/visuren.html)
//!
//! The layout tree is rebuilt from scratch on every render. A Document box
//! wraps a Block box for the document element; each Block either stacks
//! child Blocks vertically or flows its inline content into Line boxes
//! holding one Text box per word (and one Input box per form control).

pub mod box_model;
pub mod font;
pub mod layout_box;

pub use box_model::Rect;
pub use font::{ApproximateFontMetrics, FontMetrics};
pub use layout_box::{BoxKind, LayoutBox, LayoutBoxId, LayoutMode, LayoutTree};

/// Elements that force their parent into block layout.
pub const BLOCK_ELEMENTS: &[&str] = &[
    "html", "body", "article", "section", "nav", "aside", "h1", "h2", "h3", "h4", "h5", "h6",
    "hgroup", "header", "footer", "address", "p", "hr", "pre", "blockquote", "ol", "ul", "menu",
    "li", "dl", "dt", "dd", "figure", "figcaption", "main", "div", "table", "form", "fieldset",
    "legend", "details", "summary",
];

/// Fixed width of `<input>` and `<button>` boxes.
pub const INPUT_WIDTH_PX: f32 = 200.0;

/// Where the document's content area sits inside the tab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Left edge of the content area.
    pub content_x: f32,
    /// Top edge of the content area.
    pub content_y: f32,
    /// Width available to the document element.
    pub content_width: f32,
}

impl LayoutConfig {
    /// Content area for a viewport `width` wide with `hstep` margins on each
    /// side and `vstep` above.
    #[must_use]
    pub fn for_viewport(width: f32, hstep: f32, vstep: f32) -> Self {
        Self {
            content_x: hstep,
            content_y: vstep,
            content_width: width - 2.0 * hstep,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::for_viewport(800.0, 13.0, 18.0)
    }
}
