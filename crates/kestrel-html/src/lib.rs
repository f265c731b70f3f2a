//! Forgiving HTML parser for the Kestrel browser.
//!
//! This is not a WHATWG tree builder. It splits the source into tags and
//! text runs, inserts the implied `html`, `head`, and `body` elements, and
//! never fails: malformed markup still produces a tree.

mod parser;

pub use parser::{HEAD_TAGS, HtmlParser, SELF_CLOSING_TAGS, format_tree, parse_fragment, print_tree};
