//! Tests for DOM tree construction, traversal, and mutation.

use kestrel_dom::{DomTree, ElementData, NodeId, NodeType};

/// Helper to create an element node and return its NodeId.
fn alloc_element(tree: &mut DomTree, tag: &str) -> NodeId {
    tree.alloc(NodeType::Element(ElementData::new(tag)))
}

fn alloc_text(tree: &mut DomTree, text: &str) -> NodeId {
    tree.alloc(NodeType::Text(text.to_string()))
}

// ========== append_child / parent links ==========

#[test]
fn test_append_child_sets_parent() {
    let mut tree = DomTree::new();
    let html = alloc_element(&mut tree, "html");
    tree.append_child(NodeId::ROOT, html);
    let body = alloc_element(&mut tree, "body");
    tree.append_child(html, body);

    assert_eq!(tree.parent(body), Some(html));
    assert_eq!(tree.children(html), &[body]);
    assert_eq!(tree.document_element(), Some(html));
    assert_eq!(tree.body(), Some(body));
}

#[test]
fn test_ancestors_walk_to_root() {
    let mut tree = DomTree::new();
    let html = alloc_element(&mut tree, "html");
    tree.append_child(NodeId::ROOT, html);
    let p = alloc_element(&mut tree, "p");
    tree.append_child(html, p);
    let text = alloc_text(&mut tree, "hi");
    tree.append_child(p, text);

    let ancestors: Vec<NodeId> = tree.ancestors(text).collect();
    assert_eq!(ancestors, vec![p, html, NodeId::ROOT]);
}

// ========== descendants ==========

#[test]
fn test_descendants_are_preorder() {
    let mut tree = DomTree::new();
    let div = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, div);
    let a = alloc_element(&mut tree, "a");
    let b = alloc_element(&mut tree, "b");
    tree.append_child(div, a);
    tree.append_child(div, b);
    let a_text = alloc_text(&mut tree, "x");
    tree.append_child(a, a_text);

    assert_eq!(tree.descendants(div), vec![div, a, a_text, b]);
}

// ========== replace_children / import_subtree ==========

#[test]
fn test_replace_children_detaches_old_nodes() {
    let mut tree = DomTree::new();
    let div = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, div);
    let old = alloc_text(&mut tree, "old");
    tree.append_child(div, old);

    let new = alloc_text(&mut tree, "new");
    tree.replace_children(div, vec![new]);

    assert_eq!(tree.children(div), &[new]);
    assert_eq!(tree.parent(old), None);
    assert_eq!(tree.parent(new), Some(div));
}

#[test]
fn test_import_subtree_copies_structure() {
    let mut source = DomTree::new();
    let p = alloc_element(&mut source, "p");
    source.append_child(NodeId::ROOT, p);
    let text = alloc_text(&mut source, "copied");
    source.append_child(p, text);

    let mut target = DomTree::new();
    let copy = target.import_subtree(&source, p);

    assert_eq!(target.tag_name(copy), Some("p"));
    let children = target.children(copy).to_vec();
    assert_eq!(children.len(), 1);
    assert_eq!(target.as_text(children[0]), Some("copied"));
    assert_eq!(target.parent(copy), None);
}

// ========== attributes / focus ==========

#[test]
fn test_set_attribute_and_focus() {
    let mut tree = DomTree::new();
    let input = alloc_element(&mut tree, "input");
    tree.append_child(NodeId::ROOT, input);

    tree.set_attribute(input, "value", "abc");
    tree.set_focused(input, true);

    assert_eq!(tree.attribute(input, "value"), Some("abc"));
    assert!(tree.is_focused(input));
}

#[test]
fn test_set_attribute_on_text_is_ignored() {
    let mut tree = DomTree::new();
    let text = alloc_text(&mut tree, "t");
    tree.set_attribute(text, "value", "abc");
    assert_eq!(tree.attribute(text, "value"), None);
}

// ========== attributes ==========

#[test]
fn test_attributes_keep_insertion_order() {
    let mut tree = DomTree::new();
    let input = alloc_element(&mut tree, "input");
    tree.set_attribute(input, "type", "text");
    tree.set_attribute(input, "name", "q");
    tree.set_attribute(input, "value", "");
    tree.set_attribute(input, "type", "search");

    let element = tree.as_element(input).expect("element");
    let pairs: Vec<(&str, &str)> = element.attrs.iter().collect();
    assert_eq!(pairs, vec![("type", "search"), ("name", "q"), ("value", "")]);
    assert_eq!(element.attrs.len(), 3);
}
