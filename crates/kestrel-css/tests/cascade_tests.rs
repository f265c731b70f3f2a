//! Integration tests for style resolution.

use kestrel_css::{CssParser, StyleRule, resolve_styles, sort_rules, ua_rules};
use kestrel_dom::{DomTree, NodeId};
use kestrel_html::HtmlParser;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn styled(html: &str, css: &str) -> DomTree {
    let mut tree = HtmlParser::new(html).parse();
    let mut rules: Vec<StyleRule> = ua_rules().to_vec();
    rules.extend(CssParser::new(css).parse_stylesheet());
    resolve_styles(&mut tree, &sort_rules(&rules));
    tree
}

/// First element with `tag`, in document order.
fn find(tree: &DomTree, tag: &str) -> NodeId {
    tree.descendants(tree.root())
        .into_iter()
        .find(|&id| tree.tag_name(id) == Some(tag))
        .unwrap_or_else(|| panic!("no <{tag}> in tree"))
}

fn prop<'a>(tree: &'a DomTree, id: NodeId, property: &str) -> Option<&'a str> {
    tree.style_value(id, property)
}

#[test]
fn test_root_gets_initial_inherited_values() {
    let tree = styled("<p>x</p>", "");
    let html = tree.document_element().expect("html");
    assert_eq!(prop(&tree, html, "font-size"), Some("16px"));
    assert_eq!(prop(&tree, html, "font-style"), Some("normal"));
    assert_eq!(prop(&tree, html, "font-weight"), Some("normal"));
    assert_eq!(prop(&tree, html, "color"), Some("black"));
}

#[test]
fn test_inherited_properties_flow_to_children() {
    let tree = styled("<div><p><b>x</b></p></div>", "div { color: red; font-size: 20px; }");
    let b = find(&tree, "b");
    assert_eq!(prop(&tree, b, "color"), Some("red"));
    assert_eq!(prop(&tree, b, "font-size"), Some("20px"));
    assert_eq!(prop(&tree, b, "font-weight"), Some("bold"));

    // Text nodes inherit too.
    let text = tree.children(b)[0];
    assert_eq!(prop(&tree, text, "color"), Some("red"));
}

#[test]
fn test_non_inherited_properties_stay_put() {
    let tree = styled("<div><p>x</p></div>", "div { background-color: blue; }");
    let p = find(&tree, "p");
    assert_eq!(prop(&tree, p, "background-color"), None);
}

#[test]
fn test_later_rule_of_equal_specificity_wins() {
    let tree = styled("<p>x</p>", "p { color: green; } p { color: red; }");
    assert_eq!(prop(&tree, find(&tree, "p"), "color"), Some("red"));
}

#[test]
fn test_more_specific_rule_wins_regardless_of_order() {
    let tree = styled("<div><p>x</p></div>", "div p { color: green; } p { color: red; }");
    assert_eq!(prop(&tree, find(&tree, "p"), "color"), Some("green"));
}

#[test]
fn test_author_rule_overrides_ua_rule() {
    let tree = styled("<a href=x>link</a>", "a { color: red; }");
    assert_eq!(prop(&tree, find(&tree, "a"), "color"), Some("red"));

    let tree = styled("<a href=x>link</a>", "");
    assert_eq!(prop(&tree, find(&tree, "a"), "color"), Some("blue"));
}

#[test]
fn test_inline_style_beats_rules() {
    let tree = styled("<div><p style=\"color:orange\">x</p></div>", "div p { color: green; }");
    assert_eq!(prop(&tree, find(&tree, "p"), "color"), Some("orange"));
}

#[test]
fn test_percentage_font_size_uses_parent_pixels() {
    let tree = styled(
        "<div><span>x</span></div>",
        "div { font-size: 20px; } span { font-size: 50%; }",
    );
    assert_eq!(prop(&tree, find(&tree, "span"), "font-size"), Some("10px"));
}

#[test]
fn test_percentage_font_size_at_root_uses_initial_size() {
    let tree = styled("<p>x</p>", "html { font-size: 150%; }");
    let html = tree.document_element().expect("html");
    assert_eq!(prop(&tree, html, "font-size"), Some("24px"));
}

#[test]
fn test_resolution_is_deterministic() {
    let html = "<div><p>a <b>b</b> <i>c</i></p><small>d</small></div>";
    let css = "div { color: red; } p b { color: green; } i { font-size: 30px; }";
    let first = styled(html, css);
    let second = styled(html, css);
    for id in first.descendants(first.root()) {
        assert_eq!(first.style(id), second.style(id));
    }
}

#[test]
fn test_restyle_discards_previous_values() {
    let mut tree = HtmlParser::new("<p>x</p>").parse();
    let rules = CssParser::new("p { color: red; }").parse_stylesheet();
    resolve_styles(&mut tree, &rules);
    resolve_styles(&mut tree, &[]);
    assert_eq!(prop(&tree, find(&tree, "p"), "color"), Some("black"));
}

const PALETTE: [&str; 4] = ["red", "green", "blue", "orange"];

#[quickcheck]
fn prop_last_equal_specificity_rule_wins(picks: Vec<u8>) -> TestResult {
    let Some(&last) = picks.last() else {
        return TestResult::discard();
    };
    let css: String = picks
        .iter()
        .map(|&pick| format!("p {{ color: {}; }} ", PALETTE[usize::from(pick) % PALETTE.len()]))
        .collect();
    let tree = styled("<p>x</p>", &css);
    let expected = PALETTE[usize::from(last) % PALETTE.len()];
    TestResult::from_bool(prop(&tree, find(&tree, "p"), "color") == Some(expected))
}
