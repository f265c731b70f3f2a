//! Style, layout, and paint in one pass, plus the stylesheet collection
//! that feeds it.

use kestrel_common::url::resolve_url;
use kestrel_css::{
    CssParser, DisplayList, FontMetrics, LayoutConfig, LayoutTree, Painter, StyleRule,
    resolve_styles, sort_rules, ua_rules,
};
use kestrel_dom::DomTree;
use tracing::{debug_span, warn};

use crate::loader::DocumentLoader;

/// Result of rendering a document.
#[derive(Debug)]
pub struct RenderOutput {
    /// Geometry of every box.
    pub layout: LayoutTree,
    /// Drawing commands in paint order.
    pub display_list: DisplayList,
}

/// Resolve styles on `nodes` with `rules` (in source order), lay the tree
/// out, and paint it.
///
/// Every stage recomputes from scratch; nothing from a previous render is
/// reused.
pub fn render_document(
    nodes: &mut DomTree,
    rules: &[StyleRule],
    config: &LayoutConfig,
    metrics: &dyn FontMetrics,
) -> RenderOutput {
    let _span = debug_span!("render", nodes = nodes.len()).entered();
    let sorted = sort_rules(rules);
    resolve_styles(nodes, &sorted);
    let layout = LayoutTree::layout(nodes, config, metrics);
    let display_list = Painter::new(nodes, metrics).paint(&layout);
    RenderOutput {
        layout,
        display_list,
    }
}

/// The user-agent rules followed by every `<link rel=stylesheet>` sheet in
/// document order. Sheets that fail to load are skipped.
#[must_use]
pub fn document_rules(
    nodes: &DomTree,
    base_url: Option<&str>,
    loader: &dyn DocumentLoader,
) -> Vec<StyleRule> {
    let mut rules = ua_rules().to_vec();
    for href in linked_urls(nodes, base_url, "link", "href", Some(("rel", "stylesheet"))) {
        if let Some(sheet) = fetch_subresource(loader, &href) {
            rules.extend(CssParser::new(&sheet).parse_stylesheet());
        }
    }
    rules
}

/// Resolved URLs in attribute `attr` of every `tag` element, optionally
/// only those where another attribute has a given value.
pub(crate) fn linked_urls(
    nodes: &DomTree,
    base_url: Option<&str>,
    tag: &str,
    attr: &str,
    filter: Option<(&str, &str)>,
) -> Vec<String> {
    nodes
        .descendants(nodes.root())
        .into_iter()
        .filter(|&id| nodes.tag_name(id) == Some(tag))
        .filter(|&id| filter.is_none_or(|(name, value)| nodes.attribute(id, name) == Some(value)))
        .filter_map(|id| nodes.attribute(id, attr))
        .map(|href| resolve_url(href, base_url))
        .collect()
}

pub(crate) fn fetch_subresource(loader: &dyn DocumentLoader, url: &str) -> Option<String> {
    match loader.fetch(url, None) {
        Ok(response) => Some(response.body),
        Err(err) => {
            warn!(url, error = %err, "failed to load subresource");
            None
        }
    }
}
