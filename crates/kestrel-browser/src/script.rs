//! The seam between documents and a scripting engine.
//!
//! No engine ships in this crate. A [`ScriptHost`] runs code against a
//! [`DocumentApi`], the narrow view of a tab that scripts get: selector
//! queries, attribute reads, subtree replacement, and callback scheduling.
//! Hosts are created per page load through a [`ScriptHostFactory`] and
//! discarded on navigation.

use std::sync::Arc;
use std::time::Duration;

use kestrel_css::CssParseError;
use kestrel_dom::NodeId;

use crate::error::ScriptError;

/// What a script may do to its document.
pub trait DocumentApi {
    /// Elements matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if `selector` does not parse.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, CssParseError>;

    /// Value of attribute `name` on `node`.
    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Replace the children of `node` with the nodes parsed from `html`.
    fn set_inner_html(&mut self, node: NodeId, html: &str);

    /// Run the host's timeout `handle` after `delay`.
    fn set_timeout(&mut self, handle: u64, delay: Duration);

    /// Ask for an animation frame; the host's handlers run at the start of it.
    fn request_animation_frame(&mut self);
}

/// A scripting engine bound to one page load.
pub trait ScriptHost: Send {
    /// Run a script's source.
    ///
    /// # Errors
    ///
    /// Returns an error if the script throws.
    fn run(&mut self, name: &str, code: &str, document: &mut dyn DocumentApi)
    -> Result<(), ScriptError>;

    /// Deliver an event to listeners on `target`. Returns `true` if a
    /// listener cancelled the default action.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener throws.
    fn dispatch_event(
        &mut self,
        event_type: &str,
        target: NodeId,
        document: &mut dyn DocumentApi,
    ) -> Result<bool, ScriptError>;

    /// Run the callback registered for timeout `handle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback throws.
    fn run_timeout(&mut self, handle: u64, document: &mut dyn DocumentApi)
    -> Result<(), ScriptError>;

    /// Run every pending animation-frame callback.
    ///
    /// # Errors
    ///
    /// Returns an error if a callback throws.
    fn run_animation_frame_handlers(
        &mut self,
        document: &mut dyn DocumentApi,
    ) -> Result<(), ScriptError>;
}

/// Creates a fresh host for each page load.
pub type ScriptHostFactory = Arc<dyn Fn() -> Box<dyn ScriptHost> + Send + Sync>;

/// A host that ignores scripts. Events are never cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScript;

impl ScriptHost for NoScript {
    fn run(&mut self, _: &str, _: &str, _: &mut dyn DocumentApi) -> Result<(), ScriptError> {
        Ok(())
    }

    fn dispatch_event(
        &mut self,
        _: &str,
        _: NodeId,
        _: &mut dyn DocumentApi,
    ) -> Result<bool, ScriptError> {
        Ok(false)
    }

    fn run_timeout(&mut self, _: u64, _: &mut dyn DocumentApi) -> Result<(), ScriptError> {
        Ok(())
    }

    fn run_animation_frame_handlers(&mut self, _: &mut dyn DocumentApi) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// Factory producing [`NoScript`] hosts.
#[must_use]
pub fn no_script() -> ScriptHostFactory {
    Arc::new(|| -> Box<dyn ScriptHost> { Box::new(NoScript) })
}
