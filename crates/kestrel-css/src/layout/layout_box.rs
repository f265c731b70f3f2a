//! The layout tree.
//!
//! Boxes live in an arena indexed by [`LayoutBoxId`]. Each box refers back
//! to the DOM node it was generated for, to its parent box, and to the
//! sibling box laid out immediately before it.

use kestrel_dom::{DomTree, NodeId};

use super::box_model::Rect;
use super::font::FontMetrics;
use super::{BLOCK_ELEMENTS, INPUT_WIDTH_PX, LayoutConfig};
use crate::values::FontSpec;

/// Index of a box in a [`LayoutTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBoxId(pub usize);

impl LayoutBoxId {
    /// The Document box is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// What kind of box this is.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxKind {
    /// Root of the tree; positions the content area.
    Document,
    /// [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
    Block,
    /// [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
    ///
    /// "The rectangular area that contains the boxes that form a line is
    /// called a line box."
    Line,
    /// A single word.
    Text {
        /// The word, without surrounding whitespace.
        word: String,
        /// Font the word is set in.
        font: FontSpec,
    },
    /// An `<input>` or `<button>` control.
    Input {
        /// Font of the control's text.
        font: FontSpec,
    },
}

/// How a Block box lays out its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Stack a Block box per child node.
    Block,
    /// Flow text and controls into Line boxes.
    Inline,
}

/// A positioned box.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Box kind.
    pub kind: BoxKind,
    /// DOM node this box was generated for.
    pub node: NodeId,
    /// Containing box. `None` only for the Document box.
    pub parent: Option<LayoutBoxId>,
    /// Sibling laid out immediately before this one.
    pub previous: Option<LayoutBoxId>,
    /// Child boxes in layout order.
    pub children: Vec<LayoutBoxId>,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl LayoutBox {
    /// The box's border rectangle.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// The font of a Text or Input box.
    #[must_use]
    pub const fn font(&self) -> Option<&FontSpec> {
        match &self.kind {
            BoxKind::Text { font, .. } | BoxKind::Input { font } => Some(font),
            _ => None,
        }
    }
}

/// Arena of layout boxes rooted at a Document box.
#[derive(Debug, Clone)]
pub struct LayoutTree {
    boxes: Vec<LayoutBox>,
}

impl LayoutTree {
    /// Build and lay out the tree for `dom`, whose styles must already be
    /// resolved.
    #[must_use]
    pub fn layout(dom: &DomTree, config: &LayoutConfig, metrics: &dyn FontMetrics) -> Self {
        let mut builder = LayoutBuilder {
            dom,
            metrics,
            boxes: Vec::new(),
        };
        builder.layout_document(config);
        Self {
            boxes: builder.boxes,
        }
    }

    /// The Document box.
    #[must_use]
    pub const fn root(&self) -> LayoutBoxId {
        LayoutBoxId::ROOT
    }

    /// Get a box by its ID.
    #[must_use]
    pub fn get(&self, id: LayoutBoxId) -> Option<&LayoutBox> {
        self.boxes.get(id.0)
    }

    /// Number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether the tree has no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Child boxes of `id`.
    #[must_use]
    pub fn children(&self, id: LayoutBoxId) -> &[LayoutBoxId] {
        self.get(id).map_or(&[], |b| b.children.as_slice())
    }

    /// Height of the document's content.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.get(LayoutBoxId::ROOT).map_or(0.0, |b| b.height)
    }

    /// Flatten the subtree at `id` in pre-order, `id` first.
    #[must_use]
    pub fn descendants(&self, id: LayoutBoxId) -> Vec<LayoutBoxId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// The innermost box containing the point, in document coordinates.
    ///
    /// Ties go to the box that comes last in pre-order, which is the
    /// deepest and latest-painted one.
    #[must_use]
    pub fn hit_test(&self, x: f32, y: f32) -> Option<LayoutBoxId> {
        self.descendants(LayoutBoxId::ROOT)
            .into_iter()
            .rev()
            .find(|&id| self.get(id).is_some_and(|b| b.rect().contains(x, y)))
    }

    /// Iterate over every box with its ID.
    pub fn iter(&self) -> impl Iterator<Item = (LayoutBoxId, &LayoutBox)> {
        self.boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (LayoutBoxId(i), b))
    }
}

/// Decide whether `node`'s Block box stacks blocks or flows inline content.
#[must_use]
pub fn layout_mode(dom: &DomTree, node: NodeId) -> LayoutMode {
    if dom.as_text(node).is_some() {
        return LayoutMode::Inline;
    }
    let children = dom.children(node);
    let has_block_child = children
        .iter()
        .any(|&c| dom.tag_name(c).is_some_and(|t| BLOCK_ELEMENTS.contains(&t)));
    if has_block_child {
        LayoutMode::Block
    } else if !children.is_empty() || dom.tag_name(node) == Some("input") {
        LayoutMode::Inline
    } else {
        LayoutMode::Block
    }
}

/// Font for text generated by `node`, from its resolved style.
#[must_use]
pub fn font_for_node(dom: &DomTree, node: NodeId) -> FontSpec {
    let value = |property: &str, default: &'static str| {
        dom.style_value(node, property).unwrap_or(default).to_string()
    };
    FontSpec::from_style(
        &value("font-size", "16px"),
        &value("font-weight", "normal"),
        &value("font-style", "normal"),
    )
}

struct LayoutBuilder<'a> {
    dom: &'a DomTree,
    metrics: &'a dyn FontMetrics,
    boxes: Vec<LayoutBox>,
}

impl LayoutBuilder<'_> {
    fn push(
        &mut self,
        kind: BoxKind,
        node: NodeId,
        parent: Option<LayoutBoxId>,
        previous: Option<LayoutBoxId>,
    ) -> LayoutBoxId {
        let id = LayoutBoxId(self.boxes.len());
        self.boxes.push(LayoutBox {
            kind,
            node,
            parent,
            previous,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        });
        if let Some(parent) = parent {
            self.boxes[parent.0].children.push(id);
        }
        id
    }

    /// Top edge for a box stacked under `previous`, or at its parent's top.
    fn stacked_y(&self, id: LayoutBoxId) -> f32 {
        let b = &self.boxes[id.0];
        match (b.previous, b.parent) {
            (Some(prev), _) => self.boxes[prev.0].y + self.boxes[prev.0].height,
            (None, Some(parent)) => self.boxes[parent.0].y,
            (None, None) => 0.0,
        }
    }

    fn layout_document(&mut self, config: &LayoutConfig) {
        let node = self.dom.document_element().unwrap_or(NodeId::ROOT);
        let document = self.push(BoxKind::Document, node, None, None);
        {
            let b = &mut self.boxes[document.0];
            b.x = config.content_x;
            b.y = config.content_y;
            b.width = config.content_width;
        }
        let child = self.push(BoxKind::Block, node, Some(document), None);
        self.layout_block(child);
        self.boxes[document.0].height = self.boxes[child.0].height;
    }

    /// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
    fn layout_block(&mut self, id: LayoutBoxId) {
        let parent = self.boxes[id.0].parent.unwrap_or(LayoutBoxId::ROOT);
        let (x, width) = (self.boxes[parent.0].x, self.boxes[parent.0].width);
        let y = self.stacked_y(id);
        let node = self.boxes[id.0].node;
        {
            let b = &mut self.boxes[id.0];
            b.x = x;
            b.y = y;
            b.width = width;
        }

        match layout_mode(self.dom, node) {
            LayoutMode::Block => {
                let dom = self.dom;
                let mut previous = None;
                for &child in dom.children(node) {
                    previous = Some(self.push(BoxKind::Block, child, Some(id), previous));
                }
            }
            LayoutMode::Inline => {
                let mut cursor_x = 0.0;
                let _ = self.new_line(id, &mut cursor_x);
                self.recurse(id, node, &mut cursor_x);
            }
        }

        let children = self.boxes[id.0].children.clone();
        for &child in &children {
            match self.boxes[child.0].kind {
                BoxKind::Line => self.layout_line(child),
                _ => self.layout_block(child),
            }
        }

        // [§ 10.6.3](https://www.w3.org/TR/CSS2/visudet.html#normal-block)
        // Auto height is the sum of the children's heights.
        self.boxes[id.0].height = children.iter().map(|c| self.boxes[c.0].height).sum();
    }

    fn recurse(&mut self, block: LayoutBoxId, node: NodeId, cursor_x: &mut f32) {
        let dom = self.dom;
        if let Some(text) = dom.as_text(node) {
            for word in text.split_whitespace() {
                self.word(block, node, word, cursor_x);
            }
            return;
        }
        match dom.tag_name(node) {
            Some("br") => {
                let _ = self.new_line(block, cursor_x);
            }
            Some("input" | "button") => self.input(block, node, cursor_x),
            _ => {
                for &child in dom.children(node) {
                    self.recurse(block, child, cursor_x);
                }
            }
        }
    }

    fn new_line(&mut self, block: LayoutBoxId, cursor_x: &mut f32) -> LayoutBoxId {
        *cursor_x = 0.0;
        let previous = self.boxes[block.0].children.last().copied();
        let node = self.boxes[block.0].node;
        self.push(BoxKind::Line, node, Some(block), previous)
    }

    /// Place an inline item of width `w`, starting a new line if it would
    /// overflow a line that already holds something.
    fn place_inline(
        &mut self,
        block: LayoutBoxId,
        node: NodeId,
        kind: BoxKind,
        w: f32,
        cursor_x: &mut f32,
    ) {
        let font = match &kind {
            BoxKind::Text { font, .. } | BoxKind::Input { font } => *font,
            _ => return,
        };
        let mut line = match self.boxes[block.0].children.last() {
            Some(&line) => line,
            None => self.new_line(block, cursor_x),
        };
        let overflows = *cursor_x + w > self.boxes[block.0].width;
        if overflows && !self.boxes[line.0].children.is_empty() {
            line = self.new_line(block, cursor_x);
        }
        let previous = self.boxes[line.0].children.last().copied();
        let _ = self.push(kind, node, Some(line), previous);
        *cursor_x += w + self.metrics.measure(" ", &font);
    }

    fn word(&mut self, block: LayoutBoxId, node: NodeId, word: &str, cursor_x: &mut f32) {
        let font = font_for_node(self.dom, node);
        let w = self.metrics.measure(word, &font);
        let kind = BoxKind::Text {
            word: word.to_string(),
            font,
        };
        self.place_inline(block, node, kind, w, cursor_x);
    }

    fn input(&mut self, block: LayoutBoxId, node: NodeId, cursor_x: &mut f32) {
        let font = font_for_node(self.dom, node);
        self.place_inline(block, node, BoxKind::Input { font }, INPUT_WIDTH_PX, cursor_x);
    }

    /// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
    ///
    /// Words share a baseline placed 1.25 × the tallest ascent below the
    /// line's top, and the line is 1.25 × the tallest ascent plus the
    /// deepest descent high.
    fn layout_line(&mut self, id: LayoutBoxId) {
        let parent = self.boxes[id.0].parent.unwrap_or(LayoutBoxId::ROOT);
        let (x, width) = (self.boxes[parent.0].x, self.boxes[parent.0].width);
        let y = self.stacked_y(id);
        {
            let b = &mut self.boxes[id.0];
            b.x = x;
            b.y = y;
            b.width = width;
        }

        let children = self.boxes[id.0].children.clone();
        if children.is_empty() {
            self.boxes[id.0].height = 0.0;
            return;
        }
        for &child in &children {
            self.layout_inline_item(child, x);
        }

        let fonts: Vec<FontSpec> = children
            .iter()
            .filter_map(|c| self.boxes[c.0].font().copied())
            .collect();
        let max_ascent = fonts
            .iter()
            .map(|f| -self.metrics.ascent(f))
            .fold(0.0, f32::max);
        let baseline = y + 1.25 * max_ascent;
        for &child in &children {
            if let Some(font) = self.boxes[child.0].font().copied() {
                self.boxes[child.0].y = baseline + self.metrics.ascent(&font);
            }
        }
        let max_descent = fonts
            .iter()
            .map(|f| self.metrics.descent(f))
            .fold(0.0, f32::max);
        self.boxes[id.0].height = 1.25 * (max_ascent + max_descent);
    }

    /// Size a Text or Input box and place it after its previous sibling.
    fn layout_inline_item(&mut self, id: LayoutBoxId, line_x: f32) {
        let Some(font) = self.boxes[id.0].font().copied() else {
            return;
        };
        let width = match &self.boxes[id.0].kind {
            BoxKind::Text { word, .. } => self.metrics.measure(word, &font),
            _ => INPUT_WIDTH_PX,
        };
        let x = match self.boxes[id.0].previous {
            Some(prev) => {
                let prev_box = &self.boxes[prev.0];
                let space = prev_box
                    .font()
                    .map_or(0.0, |f| self.metrics.measure(" ", f));
                prev_box.x + space + prev_box.width
            }
            None => line_x,
        };
        let height = self.metrics.linespace(&font);
        let b = &mut self.boxes[id.0];
        b.width = width;
        b.x = x;
        b.height = height;
    }
}
