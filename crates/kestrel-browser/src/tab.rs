//! A tab: one document and everything derived from it.
//!
//! A [`Tab`] is owned by its worker thread and only ever touched through
//! tasks on that worker's queue. It loads documents, runs the
//! Style → Layout → Paint pipeline when dirty, and commits finished frames
//! to the compositor.

use std::iter;
use std::sync::{Arc, Weak};
use std::time::Duration;

use kestrel_common::url::{percent_encode, resolve_url};
use kestrel_css::{
    CssParseError, CssParser, DisplayList, FontMetrics, LayoutTree, StyleRule, ua_rules,
};
use kestrel_dom::{DomTree, NodeId};
use kestrel_html::{HtmlParser, parse_fragment};
use tracing::{debug, debug_span, warn};

use crate::commit::{CommitData, FrameSink, TabId, clamp_scroll, content_height};
use crate::config::BrowserConfig;
use crate::error::ScriptError;
use crate::loader::DocumentLoader;
use crate::pipeline::{document_rules, fetch_subresource, linked_urls, render_document};
use crate::script::{DocumentApi, ScriptHost, ScriptHostFactory};
use crate::task::{Task, TaskSender};
use crate::timer::TimerService;

/// Process-wide services every tab shares.
#[derive(Clone)]
pub struct TabServices {
    /// Window and timing settings.
    pub config: BrowserConfig,
    /// Text measurement, shared with the rasterizer.
    pub metrics: Arc<dyn FontMetrics>,
    /// Source of documents, scripts, and stylesheets.
    pub loader: Arc<dyn DocumentLoader>,
    /// Creates a script host for each page load.
    pub scripts: ScriptHostFactory,
    /// Timer thread for script timeouts.
    pub timers: TimerService,
}

/// Document state owned by a tab's worker thread.
pub struct Tab {
    id: TabId,
    services: TabServices,
    sink: Weak<dyn FrameSink>,
    tasks: TaskSender<Self>,
    width: u32,
    tab_height: f32,
    url: Option<String>,
    history: Vec<String>,
    nodes: DomTree,
    rules: Vec<StyleRule>,
    layout: Option<LayoutTree>,
    /// Painted since the last commit; `None` once handed over.
    display_list: Option<DisplayList>,
    document_height: f32,
    scroll: f32,
    scroll_changed_in_tab: bool,
    needs_render: bool,
    focus: Option<NodeId>,
    script: Option<Box<dyn ScriptHost>>,
    /// Bumped on every load; callbacks from an older page check it and
    /// do nothing.
    script_generation: u64,
}

impl Tab {
    /// A blank tab `width` pixels wide with `tab_height` pixels of content
    /// area. `tasks` must schedule onto the worker that will own it.
    #[must_use]
    pub fn new(
        id: TabId,
        services: TabServices,
        sink: Weak<dyn FrameSink>,
        tasks: TaskSender<Self>,
        width: u32,
        tab_height: f32,
    ) -> Self {
        Self {
            id,
            services,
            sink,
            tasks,
            width,
            tab_height,
            url: None,
            history: Vec::new(),
            nodes: DomTree::new(),
            rules: ua_rules().to_vec(),
            layout: None,
            display_list: None,
            document_height: 0.0,
            scroll: 0.0,
            scroll_changed_in_tab: false,
            needs_render: false,
            focus: None,
            script: None,
            script_generation: 0,
        }
    }

    /// This tab's ID.
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    /// URL of the current document.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The document's node tree.
    #[must_use]
    pub const fn nodes(&self) -> &DomTree {
        &self.nodes
    }

    /// Layout from the last render.
    #[must_use]
    pub const fn layout(&self) -> Option<&LayoutTree> {
        self.layout.as_ref()
    }

    /// Current scroll offset.
    #[must_use]
    pub const fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Whether the next animation frame will re-render.
    #[must_use]
    pub const fn needs_render(&self) -> bool {
        self.needs_render
    }

    /// The focused input, if any.
    #[must_use]
    pub const fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    /// Navigate to `url`. A `payload` makes it a form submission.
    pub fn load(&mut self, url: &str, payload: Option<&str>) {
        let _span = debug_span!("load", tab = self.id.0, url).entered();
        self.focus = None;
        self.scroll = 0.0;
        self.scroll_changed_in_tab = true;
        self.history.push(url.to_string());
        self.url = Some(url.to_string());

        let body = match self.services.loader.fetch(url, payload) {
            Ok(response) => response.body,
            Err(err) => {
                warn!(tab = self.id.0, url, error = %err, "failed to load document");
                String::new()
            }
        };
        self.nodes = HtmlParser::new(&body).parse();

        self.script_generation += 1;
        self.script = Some((self.services.scripts)());
        let generation = self.script_generation;
        let loader = self.services.loader.as_ref();
        for src in linked_urls(&self.nodes, self.url.as_deref(), "script", "src", None) {
            let Some(code) = fetch_subresource(loader, &src) else {
                continue;
            };
            self.tasks.schedule(Task::new("script", move |tab: &mut Self| {
                tab.run_script(generation, &src, &code);
            }));
        }

        self.rules = document_rules(&self.nodes, self.url.as_deref(), loader);
        debug!(tab = self.id.0, rules = self.rules.len(), "document loaded");
        self.set_needs_render();
    }

    /// Mark the document dirty and ask the compositor for a frame.
    pub fn set_needs_render(&mut self) {
        self.needs_render = true;
        if let Some(sink) = self.sink.upgrade() {
            sink.set_needs_animation_frame(self.id);
        }
    }

    /// Run Style → Layout → Paint if the document is dirty, then clamp the
    /// scroll offset to the new content height.
    pub fn render(&mut self) {
        if !self.needs_render {
            return;
        }
        let config = self.services.config.layout_config(self.width);
        let output = render_document(
            &mut self.nodes,
            &self.rules,
            &config,
            self.services.metrics.as_ref(),
        );
        self.document_height = content_height(output.layout.height(), self.services.config.vstep);
        let clamped = clamp_scroll(self.scroll, self.document_height, self.tab_height);
        if (clamped - self.scroll).abs() > f32::EPSILON {
            self.scroll_changed_in_tab = true;
        }
        self.scroll = clamped;
        self.layout = Some(output.layout);
        self.display_list = Some(output.display_list);
        self.needs_render = false;
    }

    /// One animation frame: adopt the compositor's scroll offset unless
    /// this tab moved it itself, run script frame callbacks, render, and
    /// commit.
    pub fn run_animation_frame(&mut self, scroll: f32) {
        if !self.scroll_changed_in_tab {
            self.scroll = scroll;
        }
        let _ = self.with_script(|host, tab| host.run_animation_frame_handlers(tab));
        self.render();

        let commit = CommitData {
            url: self.url.clone(),
            scroll: self.scroll_changed_in_tab.then_some(self.scroll),
            height: self.document_height,
            display_list: self.display_list.take(),
        };
        self.scroll_changed_in_tab = false;
        if let Some(sink) = self.sink.upgrade() {
            sink.commit(self.id, commit);
        }
    }

    /// Handle a click at `(x, y)` in tab coordinates.
    ///
    /// Links navigate, inputs take focus with their value cleared, and
    /// buttons submit their form. A script listener can cancel each of
    /// these.
    pub fn click(&mut self, x: f32, y: f32) {
        self.render();
        if let Some(focused) = self.focus.take() {
            self.nodes.set_focused(focused, false);
        }
        let y = y + self.scroll;
        let Some(hit) = self.layout.as_ref().and_then(|layout| {
            layout
                .hit_test(x, y)
                .and_then(|id| layout.get(id))
                .map(|b| b.node)
        }) else {
            return;
        };

        let chain: Vec<NodeId> = iter::once(hit).chain(self.nodes.ancestors(hit)).collect();
        for element in chain {
            let tag = self.nodes.tag_name(element).map(str::to_string);
            match tag.as_deref() {
                Some("a") if self.nodes.attribute(element, "href").is_some() => {
                    if self.dispatch_event("click", element) {
                        return;
                    }
                    let href = self.nodes.attribute(element, "href").unwrap_or_default();
                    let url = resolve_url(href, self.url.as_deref());
                    self.load(&url, None);
                    return;
                }
                Some("input") => {
                    if self.dispatch_event("click", element) {
                        return;
                    }
                    self.nodes.set_attribute(element, "value", "");
                    self.nodes.set_focused(element, true);
                    self.focus = Some(element);
                    self.set_needs_render();
                    return;
                }
                Some("button") => {
                    if self.dispatch_event("click", element) {
                        return;
                    }
                    let form = self.nodes.ancestors(element).find(|&id| {
                        self.nodes.tag_name(id) == Some("form")
                            && self.nodes.attribute(id, "action").is_some()
                    });
                    if let Some(form) = form {
                        self.submit_form(form);
                    }
                    return;
                }
                _ => {}
            }
        }
    }

    /// Submit `form`: encode its named inputs and load its action with
    /// them as the payload.
    pub fn submit_form(&mut self, form: NodeId) {
        if self.dispatch_event("submit", form) {
            return;
        }
        let body = self
            .nodes
            .descendants(form)
            .into_iter()
            .filter(|&id| self.nodes.tag_name(id) == Some("input"))
            .filter_map(|id| {
                let name = self.nodes.attribute(id, "name")?;
                let value = self.nodes.attribute(id, "value").unwrap_or_default();
                Some(format!("{}={}", percent_encode(name), percent_encode(value)))
            })
            .collect::<Vec<_>>()
            .join("&");
        let action = self.nodes.attribute(form, "action").unwrap_or_default();
        let url = resolve_url(action, self.url.as_deref());
        self.load(&url, Some(&body));
    }

    /// Type `ch` into the focused input.
    pub fn keypress(&mut self, ch: char) {
        let Some(focused) = self.focus else {
            return;
        };
        if self.dispatch_event("keydown", focused) {
            return;
        }
        let mut value = self
            .nodes
            .attribute(focused, "value")
            .unwrap_or_default()
            .to_string();
        value.push(ch);
        self.nodes.set_attribute(focused, "value", &value);
        self.set_needs_render();
    }

    /// Return to the previous page in history.
    pub fn go_back(&mut self) {
        if self.history.len() > 1 {
            let _ = self.history.pop();
            if let Some(back) = self.history.pop() {
                self.load(&back, None);
            }
        }
    }

    /// The window was resized.
    pub fn resize(&mut self, width: u32, tab_height: f32) {
        self.width = width;
        self.tab_height = tab_height;
        self.set_needs_render();
    }

    /// Drop the script host. Runs on the worker when it shuts down.
    pub fn shutdown(&mut self) {
        self.script_generation += 1;
        self.script = None;
        debug!(tab = self.id.0, "tab shut down");
    }

    fn run_script(&mut self, generation: u64, name: &str, code: &str) {
        if generation != self.script_generation {
            return;
        }
        let _ = self.with_script(|host, tab| host.run(name, code, tab));
    }

    fn run_timeout(&mut self, generation: u64, handle: u64) {
        if generation != self.script_generation {
            return;
        }
        let _ = self.with_script(|host, tab| host.run_timeout(handle, tab));
    }

    /// Deliver an event. Returns whether a listener cancelled the default
    /// action; errors count as not cancelled.
    fn dispatch_event(&mut self, event_type: &str, target: NodeId) -> bool {
        self.with_script(|host, tab| host.dispatch_event(event_type, target, tab))
            .unwrap_or(false)
    }

    /// Call into the script host with this tab as its document. Errors are
    /// logged and reported as `None`.
    fn with_script<T>(
        &mut self,
        call: impl FnOnce(&mut dyn ScriptHost, &mut Self) -> Result<T, ScriptError>,
    ) -> Option<T> {
        let mut host = self.script.take()?;
        let generation = self.script_generation;
        let result = call(host.as_mut(), self);
        if self.script_generation == generation {
            self.script = Some(host);
        }
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(tab = self.id.0, error = %err, "script error");
                None
            }
        }
    }
}

impl DocumentApi for Tab {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, CssParseError> {
        let selector = CssParser::new(selector).parse_selector()?;
        Ok(self
            .nodes
            .descendants(self.nodes.root())
            .into_iter()
            .filter(|&id| selector.matches(&self.nodes, id))
            .collect())
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.attribute(node, name).map(str::to_string)
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) {
        let (fragment, body) = parse_fragment(html);
        let Some(body) = body else {
            return;
        };
        let children = fragment
            .children(body)
            .iter()
            .map(|&child| self.nodes.import_subtree(&fragment, child))
            .collect();
        self.nodes.replace_children(node, children);
        self.set_needs_render();
    }

    fn set_timeout(&mut self, handle: u64, delay: Duration) {
        let tasks = self.tasks.clone();
        let generation = self.script_generation;
        let _ = self.services.timers.schedule(delay, move || {
            tasks.schedule(Task::new("timeout", move |tab: &mut Self| {
                tab.run_timeout(generation, handle);
            }));
        });
    }

    fn request_animation_frame(&mut self) {
        if let Some(sink) = self.sink.upgrade() {
            sink.set_needs_animation_frame(self.id);
        }
    }
}
