//! CSS parsing, cascade, layout, and paint for the Kestrel browser.
//!
//! # Scope
//!
//! This crate implements:
//! - **CSS Parser** ([§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing))
//!   - Rules of the form `selector { property: value; }`
//!   - Error recovery per declaration and per rule
//!
//! - **CSS Selectors** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/))
//!   - Type selectors and the descendant combinator
//!   - Specificity calculation
//!
//! - **CSS Cascade** ([CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/))
//!   - Specificity-ordered rule application, later rules winning ties
//!   - Inline `style` attributes
//!   - Inheritance of font and color properties
//!   - Percentage `font-size`
//!
//! - **Layout** ([CSS 2.1 § 9](https://www.w3.org/TR/CSS2/visuren.html))
//!   - Block stacking and word-wrapped inline lines
//!
//! - **Paint** ([CSS 2.1 Appendix E](https://www.w3.org/TR/CSS2/zindex.html))
//!   - Display lists with opacity, blend modes, and rounded clipping
//!
//! # Not Yet Implemented
//!
//! - Class, ID, and attribute selectors
//! - Multi-word property values and shorthands
//! - Relative length units other than a percentage `font-size`

/// CSS cascade and style resolution per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod cascade;
/// Block and inline layout per [CSS 2.1 § 9](https://www.w3.org/TR/CSS2/visuren.html).
pub mod layout;
/// Display list and painting per [CSS 2.1 Appendix E](https://www.w3.org/TR/CSS2/zindex.html).
pub mod paint;
/// CSS parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
pub mod parser;
/// CSS selector matching per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;
/// User-agent stylesheet per [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html).
pub mod ua_stylesheet;
/// Typed readers for resolved property values.
pub mod values;

// Re-exports for convenience
pub use cascade::{INHERITED_PROPERTIES, StyleRule, resolve_styles, sort_rules};
pub use layout::{
    ApproximateFontMetrics, BoxKind, FontMetrics, LayoutBox, LayoutBoxId, LayoutConfig, LayoutTree,
    Rect,
};
pub use paint::{Canvas, DisplayCommand, DisplayList, Painter};
pub use parser::{CssParseError, CssParser};
pub use selector::Selector;
pub use ua_stylesheet::ua_rules;
pub use values::{BlendMode, ColorValue, FontSpec, FontStyle, FontWeight};
