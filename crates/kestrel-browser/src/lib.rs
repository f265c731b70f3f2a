//! Tabs, compositor, and rasterizer for the Kestrel browser.
//!
//! # Scope
//!
//! This crate provides:
//! - **Task Queue** - one FIFO worker thread per tab
//! - **Tabs** - document loading, rendering, input, and form submission
//! - **Commit/Raster/Draw** - frame hand-off from tabs to the compositor
//! - **Animation Frames** - timer-paced, coalesced frame scheduling
//! - **Software Rendering** - tiny-skia layers and fontdue text
//!
//! # Not Yet Implemented
//!
//! - Network fetching (documents come from a [`DocumentLoader`])
//! - A scripting engine (scripts run through a [`ScriptHost`])
//! - Windowing (frames go to a [`Presenter`])

pub mod chrome;
pub mod commit;
pub mod compositor;
pub mod config;
pub mod error;
pub mod font;
pub mod loader;
pub mod pipeline;
pub mod present;
pub mod raster;
pub mod script;
pub mod tab;
pub mod task;
pub mod timer;

pub use kestrel_css as css;
pub use kestrel_dom as dom;
pub use kestrel_html as html;

pub use commit::{CommitData, FrameSink, TabId, clamp_scroll};
pub use compositor::{Compositor, FrameState};
pub use config::BrowserConfig;
pub use error::{BrowserError, LoadError, PresentError, RasterError, ScriptError};
pub use font::FontCache;
pub use loader::{DocumentLoader, FileLoader, MemoryLoader, Response};
pub use present::{HeadlessPresenter, Presenter};
pub use script::{DocumentApi, NoScript, ScriptHost, ScriptHostFactory, no_script};
pub use tab::{Tab, TabServices};
pub use task::{Task, TaskRunner, TaskSender};
pub use timer::{TimerId, TimerService};

use kestrel_css::{DisplayList, FontMetrics, LayoutTree, StyleRule};
use kestrel_dom::DomTree;
use kestrel_html::HtmlParser;

/// A document parsed, styled, laid out, and painted in one go, without a
/// tab or compositor. Used for inspecting the pipeline's output.
#[derive(Debug)]
pub struct LoadedDocument {
    /// Source URL or path.
    pub url: String,
    /// Original HTML source.
    pub html_source: String,
    /// Styled node tree.
    pub dom: DomTree,
    /// User-agent and linked rules, in source order.
    pub rules: Vec<StyleRule>,
    /// Box tree with computed geometry.
    pub layout: LayoutTree,
    /// Paint output.
    pub display_list: DisplayList,
}

/// Fetch `url` through `loader` and run it through the whole pipeline.
///
/// # Errors
///
/// Returns an error if the document itself cannot be fetched. Missing
/// stylesheets are skipped.
pub fn load_document(
    url: &str,
    loader: &dyn DocumentLoader,
    config: &BrowserConfig,
    metrics: &dyn FontMetrics,
) -> Result<LoadedDocument, LoadError> {
    let html_source = loader.fetch(url, None)?.body;
    Ok(parse_html_with_base_url(
        &html_source,
        url,
        loader,
        config,
        metrics,
    ))
}

/// Run an HTML string through the whole pipeline. Relative stylesheet
/// links resolve against `url`.
#[must_use]
pub fn parse_html_with_base_url(
    html: &str,
    url: &str,
    loader: &dyn DocumentLoader,
    config: &BrowserConfig,
    metrics: &dyn FontMetrics,
) -> LoadedDocument {
    let mut dom = HtmlParser::new(html).parse();
    let rules = pipeline::document_rules(&dom, Some(url), loader);
    let layout_config = config.layout_config(config.width);
    let output = pipeline::render_document(&mut dom, &rules, &layout_config, metrics);
    LoadedDocument {
        url: url.to_string(),
        html_source: html.to_string(),
        dom,
        rules,
        layout: output.layout,
        display_list: output.display_list,
    }
}
