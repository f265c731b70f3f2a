//! Common utilities for the Kestrel browser.
//!
//! This crate provides shared infrastructure used by all browser components:
//! - **Warning System** - deduplicated diagnostics routed through `tracing`
//! - **URL helpers** - relative URL resolution and form-body encoding

pub mod url;
pub mod warning;
