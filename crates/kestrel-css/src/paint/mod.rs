//! Painting: turning the layout tree into a display list.
//!
//! [CSS 2.1 Appendix E](https://www.w3.org/TR/CSS2/zindex.html)

pub mod canvas;
pub mod display_list;
pub mod painter;

pub use canvas::Canvas;
pub use display_list::{DisplayCommand, DisplayList};
pub use painter::{Painter, paint_visual_effects};
