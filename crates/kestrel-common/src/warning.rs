//! Deduplicated browser warnings.
//!
//! Lenient components (the HTML parser, the cascade, layout, and paint)
//! never fail on bad input. They report what they skipped through
//! [`warn_once`], which forwards each unique message to `tracing` a single
//! time so a page full of the same unsupported value does not flood the log.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about an unsupported or malformed input (emitted once per unique message).
///
/// # Example
/// ```ignore
/// warn_once("CSS", "unsupported unit 'em' in font-size: 1.5em");
/// ```
pub fn warn_once(component: &str, message: &str) {
    let key = format!("[{component}] {message}");
    let should_emit = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_emit {
        tracing::warn!(component = component, "{message}");
    }
}

/// Clear all recorded warnings (call when loading a new page)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}

/// Number of distinct warnings recorded since the last [`clear_warnings`].
#[must_use]
pub fn warning_count() -> usize {
    WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map_or(0, HashSet::len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_warning_is_recorded_once() {
        warn_once("test", "repeated-warning-marker");
        let after_first = warning_count();
        warn_once("test", "repeated-warning-marker");
        assert_eq!(warning_count(), after_first);
        assert!(after_first >= 1);
    }
}
