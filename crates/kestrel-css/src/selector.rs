//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/)
//!
//! Only type selectors and the descendant combinator are supported.

use kestrel_dom::{DomTree, NodeId};

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    ///
    /// Matches elements whose lowercased tag name equals the stored name.
    Tag(String),
    /// [§ 14.1 Descendant combinator](https://www.w3.org/TR/selectors-4/#descendant-combinators)
    ///
    /// "A descendant combinator is whitespace that separates two compound
    /// selectors." Matches when the second selector matches the node and
    /// the first matches any ancestor of it.
    Descendant(Box<Selector>, Box<Selector>),
}

impl Selector {
    /// Build a type selector. The name is lowercased.
    #[must_use]
    pub fn tag(name: &str) -> Self {
        Self::Tag(name.to_lowercase())
    }

    /// Combine `ancestor descendant`.
    #[must_use]
    pub fn descendant(ancestor: Self, descendant: Self) -> Self {
        Self::Descendant(Box::new(ancestor), Box::new(descendant))
    }

    /// [§ 17 Calculating a selector's specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
    ///
    /// Each type selector counts one; a descendant selector counts the sum
    /// of its parts.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        match self {
            Self::Tag(_) => 1,
            Self::Descendant(ancestor, descendant) => {
                ancestor.specificity() + descendant.specificity()
            }
        }
    }

    /// Whether this selector matches `node` in `tree`.
    #[must_use]
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        match self {
            Self::Tag(tag) => tree.tag_name(node) == Some(tag.as_str()),
            Self::Descendant(ancestor, descendant) => {
                descendant.matches(tree, node)
                    && tree.ancestors(node).any(|id| ancestor.matches(tree, id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_dom::{ElementData, NodeType};

    fn element(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
        let id = tree.alloc(NodeType::Element(ElementData::new(tag)));
        tree.append_child(parent, id);
        id
    }

    #[test]
    fn test_specificity_sums_parts() {
        let sel = Selector::descendant(
            Selector::descendant(Selector::tag("div"), Selector::tag("p")),
            Selector::tag("b"),
        );
        assert_eq!(Selector::tag("p").specificity(), 1);
        assert_eq!(sel.specificity(), 3);
    }

    #[test]
    fn test_descendant_matches_any_ancestor() {
        let mut tree = DomTree::new();
        let div = element(&mut tree, NodeId::ROOT, "div");
        let section = element(&mut tree, div, "section");
        let p = element(&mut tree, section, "p");

        assert!(Selector::descendant(Selector::tag("div"), Selector::tag("p")).matches(&tree, p));
        assert!(!Selector::descendant(Selector::tag("p"), Selector::tag("div")).matches(&tree, div));
        assert!(!Selector::tag("P").matches(&tree, section));
        assert!(Selector::tag("P").matches(&tree, p));
    }
}
