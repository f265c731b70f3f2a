//! [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/)
//!
//! Style resolution writes a complete [`StyleMap`] onto every node reachable
//! from the document element. Each node's map is built from scratch:
//!
//! 1. inherited properties, copied from the parent or set to their initial
//!    value at the root,
//! 2. every matching rule, in the order given (callers pass rules sorted by
//!    [`sort_rules`], so later and more specific rules win),
//! 3. the element's inline `style` attribute,
//! 4. a percentage `font-size` is resolved against the parent's pixel size.
//!
//! Resolution never fails. Unparseable values are stored as written and
//! replaced with defaults when layout reads them.

use kestrel_dom::{DomTree, NodeId, StyleMap};

use crate::parser::CssParser;
use crate::selector::Selector;
use crate::values::{parse_percentage, parse_px};

/// [§ 7 Inheritance](https://www.w3.org/TR/css-cascade-4/#inheriting)
///
/// Properties every node inherits from its parent, with their initial values.
pub const INHERITED_PROPERTIES: &[(&str, &str)] = &[
    ("font-size", "16px"),
    ("font-style", "normal"),
    ("font-weight", "normal"),
    ("color", "black"),
];

/// Initial `font-size`, used to resolve a percentage at the root.
const INITIAL_FONT_SIZE: &str = "16px";

/// A selector with its declarations in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Which nodes the rule applies to.
    pub selector: Selector,
    /// `(property, value)` pairs; a later duplicate property wins.
    pub declarations: Vec<(String, String)>,
}

impl StyleRule {
    /// [§ 6.4.3 Specificity](https://www.w3.org/TR/css-cascade-4/#cascade-specificity)
    #[must_use]
    pub fn cascade_priority(&self) -> u32 {
        self.selector.specificity()
    }
}

/// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
///
/// Stable-sort rules by ascending specificity. Rules of equal specificity
/// keep their relative order, so the later one is applied last and wins.
#[must_use]
pub fn sort_rules(rules: &[StyleRule]) -> Vec<StyleRule> {
    let mut sorted = rules.to_vec();
    sorted.sort_by_key(StyleRule::cascade_priority);
    sorted
}

/// Resolve styles for every node under the document element.
///
/// `rules` must already be in cascade order (see [`sort_rules`]).
pub fn resolve_styles(tree: &mut DomTree, rules: &[StyleRule]) {
    let Some(root) = tree.document_element() else {
        return;
    };
    resolve_node(tree, root, rules);
}

/// Resolve the style of `node` and then of all its descendants.
pub fn resolve_node(tree: &mut DomTree, node: NodeId, rules: &[StyleRule]) {
    let style = compute_style(tree, node, rules);
    if let Some(n) = tree.get_mut(node) {
        n.style = style;
    }
    let children = tree.children(node).to_vec();
    for child in children {
        resolve_node(tree, child, rules);
    }
}

fn compute_style(tree: &DomTree, node: NodeId, rules: &[StyleRule]) -> StyleMap {
    let parent_style = tree
        .parent(node)
        .and_then(|p| tree.style(p))
        .filter(|s| !s.is_empty());

    // STEP 1: Inherited properties.
    let mut style = StyleMap::new();
    for &(property, initial) in INHERITED_PROPERTIES {
        let value = parent_style
            .and_then(|s| s.get(property))
            .map_or(initial, String::as_str);
        let _ = style.insert(property.to_string(), value.to_string());
    }

    // STEP 2: Matching rules in cascade order.
    for rule in rules.iter().filter(|r| r.selector.matches(tree, node)) {
        for (property, value) in &rule.declarations {
            let _ = style.insert(property.clone(), value.clone());
        }
    }

    // STEP 3: Inline style attribute.
    if let Some(inline) = tree.attribute(node, "style") {
        for (property, value) in CssParser::new(inline).parse_declarations() {
            let _ = style.insert(property, value);
        }
    }

    // STEP 4: [§ 2.5 'font-size'](https://www.w3.org/TR/css-fonts-4/#font-size-prop)
    // "Percentages: refer to parent element's font size"
    let percentage = style.get("font-size").and_then(|v| parse_percentage(v));
    if let Some(fraction) = percentage {
        let parent_size = parent_style
            .and_then(|s| s.get("font-size"))
            .map_or(INITIAL_FONT_SIZE, String::as_str);
        let resolved = fraction * parse_px(parent_size);
        let _ = style.insert("font-size".to_string(), format!("{resolved}px"));
    }

    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_for_equal_specificity() {
        let rules = CssParser::new("div p { color: green; } p { color: red; } b { color: blue; }")
            .parse_stylesheet();
        let sorted = sort_rules(&rules);
        let values: Vec<&str> = sorted
            .iter()
            .map(|r| r.declarations[0].1.as_str())
            .collect();
        assert_eq!(values, vec!["red", "blue", "green"]);
    }
}
