use kestrel_common::warning::warn_once;
use kestrel_dom::{AttributesMap, DomTree, ElementData, NodeId, NodeType};

/// [§ 13.1.2 Elements](https://html.spec.whatwg.org/multipage/syntax.html#void-elements)
///
/// "Void elements only have a start tag; end tags must not be specified for
/// void elements."
pub const SELF_CLOSING_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements that belong in `<head>` when the author left it implicit.
pub const HEAD_TAGS: &[&str] = &[
    "base", "basefont", "bgsound", "noscript", "link", "meta", "title", "style", "script",
];

/// Character-level HTML parser.
///
/// Elements are appended to their parent as soon as their start tag is
/// seen; the `unfinished` stack tracks which element receives new content.
pub struct HtmlParser {
    body: String,
    tree: DomTree,
    unfinished: Vec<NodeId>,
}

impl HtmlParser {
    /// Create a parser over `body`.
    #[must_use]
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            tree: DomTree::new(),
            unfinished: Vec::new(),
        }
    }

    /// Parse the whole source into a tree whose document element is `<html>`.
    #[must_use]
    pub fn parse(mut self) -> DomTree {
        let source = std::mem::take(&mut self.body);
        let mut text = String::new();
        let mut in_tag = false;

        for c in source.chars() {
            match c {
                '<' => {
                    in_tag = true;
                    if !text.is_empty() {
                        self.add_text(&text);
                    }
                    text.clear();
                }
                '>' => {
                    in_tag = false;
                    self.add_tag(&text);
                    text.clear();
                }
                _ => text.push(c),
            }
        }
        if !in_tag && !text.is_empty() {
            self.add_text(&text);
        }
        self.finish()
    }

    fn add_text(&mut self, text: &str) {
        if text.chars().all(char::is_whitespace) {
            return;
        }
        self.implicit_tags(None);
        let Some(&parent) = self.unfinished.last() else {
            return;
        };
        let node = self.tree.alloc(NodeType::Text(decode_entities(text)));
        self.tree.append_child(parent, node);
    }

    fn add_tag(&mut self, text: &str) {
        let Some((tag, attrs)) = split_attributes(text) else {
            warn_once("HTML", "ignoring empty tag '<>'");
            return;
        };
        // Doctype and comments.
        if tag.starts_with('!') {
            return;
        }
        self.implicit_tags(Some(&tag));

        if let Some(name) = tag.strip_prefix('/') {
            let open = self
                .unfinished
                .iter()
                .rposition(|&id| self.tree.tag_name(id) == Some(name));
            match open {
                // The document element is never closed early.
                Some(0) => {}
                Some(position) => self.unfinished.truncate(position),
                None => warn_once("HTML", &format!("ignoring unmatched end tag </{name}>")),
            }
        } else if SELF_CLOSING_TAGS.contains(&tag.as_str()) {
            let Some(&parent) = self.unfinished.last() else {
                return;
            };
            let node = self.alloc_element(tag, attrs);
            self.tree.append_child(parent, node);
        } else {
            let parent = self.unfinished.last().copied().unwrap_or(NodeId::ROOT);
            let node = self.alloc_element(tag, attrs);
            self.tree.append_child(parent, node);
            self.unfinished.push(node);
        }
    }

    fn alloc_element(&mut self, tag_name: String, attrs: AttributesMap) -> NodeId {
        self.tree
            .alloc(NodeType::Element(ElementData { tag_name, attrs }))
    }

    /// Insert the `html`, `head`, and `body` elements the source omitted.
    fn implicit_tags(&mut self, tag: Option<&str>) {
        loop {
            let open: Vec<&str> = self
                .unfinished
                .iter()
                .filter_map(|&id| self.tree.tag_name(id))
                .collect();

            if open.is_empty() && tag != Some("html") {
                self.add_tag("html");
            } else if open == ["html"]
                && !matches!(tag, Some("head" | "body" | "/html"))
            {
                if tag.is_some_and(|t| HEAD_TAGS.contains(&t)) {
                    self.add_tag("head");
                } else {
                    self.add_tag("body");
                }
            } else if open == ["html", "head"]
                && tag != Some("/head")
                && !tag.is_some_and(|t| HEAD_TAGS.contains(&t))
            {
                self.add_tag("/head");
            } else {
                break;
            }
        }
    }

    fn finish(mut self) -> DomTree {
        if self.unfinished.is_empty() {
            self.implicit_tags(None);
        }
        self.tree
    }
}

/// Parse `html` as the contents of a `<body>` and return the fragment tree
/// together with the body element whose children are the parsed nodes.
#[must_use]
pub fn parse_fragment(html: &str) -> (DomTree, Option<NodeId>) {
    let tree = HtmlParser::new(&format!("<html><body>{html}</body></html>")).parse();
    let body = tree.body();
    (tree, body)
}

/// Split the inside of a tag into its lowercased name and attributes.
fn split_attributes(text: &str) -> Option<(String, AttributesMap)> {
    let mut parts = text.split_whitespace();
    let tag = parts.next()?.to_lowercase();
    let mut attrs = AttributesMap::new();
    for pair in parts {
        if let Some((key, value)) = pair.split_once('=') {
            let value = strip_quotes(value);
            let _ = attrs.insert(key.to_lowercase(), value.to_string());
        } else {
            let _ = attrs.insert(pair.to_lowercase(), String::new());
        }
    }
    Some((tag, attrs))
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

/// Render the subtree at `id` as an indented outline, one node per line.
#[must_use]
pub fn format_tree(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    write_tree(tree, id, 0, &mut out);
    out
}

fn write_tree(tree: &DomTree, id: NodeId, indent: usize, out: &mut String) {
    let prefix = "  ".repeat(indent);
    let Some(node) = tree.get(id) else {
        return;
    };
    match &node.node_type {
        NodeType::Document => {
            out.push_str(&format!("{prefix}Document\n"));
        }
        NodeType::Element(data) => {
            if data.attrs.is_empty() {
                out.push_str(&format!("{prefix}<{}>\n", data.tag_name));
            } else {
                let attrs: Vec<String> = data
                    .attrs
                    .iter()
                    .map(|(k, v)| {
                        if v.is_empty() {
                            k.to_string()
                        } else {
                            format!("{k}=\"{v}\"")
                        }
                    })
                    .collect();
                out.push_str(&format!("{prefix}<{} {}>\n", data.tag_name, attrs.join(" ")));
            }
        }
        NodeType::Text(data) => {
            let display = data.replace('\n', "\\n");
            out.push_str(&format!("{prefix}\"{display}\"\n"));
        }
    }
    for &child_id in tree.children(id) {
        write_tree(tree, child_id, indent + 1, out);
    }
}

/// Print the subtree at `id` to stdout.
pub fn print_tree(tree: &DomTree, id: NodeId) {
    print!("{}", format_tree(tree, id));
}
