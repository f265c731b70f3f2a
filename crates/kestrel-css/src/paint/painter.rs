//! Painter - walks the layout tree and emits display commands
//!
//! [CSS 2.1 Appendix E.2 Painting order](https://www.w3.org/TR/CSS2/zindex.html#painting-order)
//!
//! Each box paints itself, then its children, and a Block box finally wraps
//! the lot in the visual effects its style asks for.

use kestrel_common::warning::warn_once;
use kestrel_dom::{DomTree, NodeId, StyleMap};

use super::display_list::{DisplayCommand, DisplayList};
use crate::layout::{BoxKind, FontMetrics, LayoutBox, LayoutBoxId, LayoutTree, Rect};
use crate::values::{BlendMode, ColorValue, parse_opacity, parse_px};

/// Paints a layout tree.
pub struct Painter<'a> {
    dom: &'a DomTree,
    metrics: &'a dyn FontMetrics,
}

impl<'a> Painter<'a> {
    /// Create a painter over the styled DOM the layout tree was built from.
    #[must_use]
    pub fn new(dom: &'a DomTree, metrics: &'a dyn FontMetrics) -> Self {
        Self { dom, metrics }
    }

    /// Paint the whole layout tree.
    #[must_use]
    pub fn paint(&self, layout: &LayoutTree) -> DisplayList {
        let mut commands = Vec::new();
        self.paint_box(layout, layout.root(), &mut commands);
        DisplayList::from(commands)
    }

    fn paint_box(&self, layout: &LayoutTree, id: LayoutBoxId, out: &mut Vec<DisplayCommand>) {
        let Some(layout_box) = layout.get(id) else {
            return;
        };
        let paints = self.should_paint(layout_box);

        let mut commands = if paints {
            self.paint_self(layout_box)
        } else {
            Vec::new()
        };
        for &child in &layout_box.children {
            self.paint_box(layout, child, &mut commands);
        }
        if paints && layout_box.kind == BoxKind::Block {
            let empty = StyleMap::new();
            let style = self.dom.style(layout_box.node).unwrap_or(&empty);
            commands = paint_visual_effects(style, commands, layout_box.rect());
        }
        out.extend(commands);
    }

    /// Block boxes generated for form controls leave all painting to the
    /// control's own Input box.
    fn should_paint(&self, layout_box: &LayoutBox) -> bool {
        if layout_box.kind != BoxKind::Block {
            return true;
        }
        !matches!(
            self.dom.tag_name(layout_box.node),
            Some("input" | "button")
        )
    }

    fn paint_self(&self, layout_box: &LayoutBox) -> Vec<DisplayCommand> {
        match &layout_box.kind {
            BoxKind::Document | BoxKind::Line => Vec::new(),
            BoxKind::Block => self.background(layout_box).into_iter().collect(),
            BoxKind::Text { word, font } => vec![DisplayCommand::text(
                layout_box.x,
                layout_box.y,
                word,
                *font,
                self.color(layout_box.node),
                self.metrics,
            )],
            BoxKind::Input { font } => {
                let mut commands: Vec<DisplayCommand> =
                    self.background(layout_box).into_iter().collect();
                let text = self.control_text(layout_box.node);
                commands.push(DisplayCommand::text(
                    layout_box.x,
                    layout_box.y,
                    &text,
                    *font,
                    self.color(layout_box.node),
                    self.metrics,
                ));
                if self.dom.is_focused(layout_box.node) {
                    let cx = layout_box.x + self.metrics.measure(&text, font);
                    commands.push(DisplayCommand::line(
                        (cx, layout_box.y),
                        (cx, layout_box.y + layout_box.height),
                        ColorValue::BLACK,
                        1.0,
                    ));
                }
                commands
            }
        }
    }

    /// [§ 3.10 'background-color'](https://www.w3.org/TR/css-backgrounds-3/#background-color)
    fn background(&self, layout_box: &LayoutBox) -> Option<DisplayCommand> {
        let color = self.dom.style_value(layout_box.node, "background-color")?;
        if color == "transparent" {
            return None;
        }
        Some(DisplayCommand::RoundedRect {
            rect: layout_box.rect(),
            radius: self.border_radius(layout_box.node),
            color: ColorValue::parse(color),
        })
    }

    fn border_radius(&self, node: NodeId) -> f32 {
        self.dom
            .style_value(node, "border-radius")
            .map_or(0.0, parse_px)
    }

    fn color(&self, node: NodeId) -> ColorValue {
        self.dom
            .style_value(node, "color")
            .map_or(ColorValue::BLACK, ColorValue::parse)
    }

    /// The text shown inside an `<input>` or `<button>`.
    fn control_text(&self, node: NodeId) -> String {
        match self.dom.tag_name(node) {
            Some("input") => self
                .dom
                .attribute(node, "value")
                .unwrap_or_default()
                .to_string(),
            Some("button") => match self.dom.children(node) {
                [only] if self.dom.as_text(*only).is_some() => {
                    self.dom.as_text(*only).unwrap_or_default().to_string()
                }
                _ => {
                    warn_once("Paint", "ignoring HTML contents inside button");
                    String::new()
                }
            },
            _ => String::new(),
        }
    }
}

/// [Compositing and Blending](https://www.w3.org/TR/compositing-1/)
///
/// Wrap `commands` in a single Blend carrying the node's `opacity` and
/// `mix-blend-mode`. With `overflow: clip` a white rounded rectangle is
/// composited last with destination-in, masking the group to the box's
/// rounded border. The group then always gets a blend mode so the mask only
/// applies inside its own layer.
#[must_use]
pub fn paint_visual_effects(
    style: &StyleMap,
    mut commands: Vec<DisplayCommand>,
    rect: Rect,
) -> Vec<DisplayCommand> {
    let opacity = style.get("opacity").map_or(1.0, |v| parse_opacity(v));
    let mut blend_mode = style.get("mix-blend-mode").map(|v| BlendMode::parse(v));

    if style.get("overflow").map(String::as_str) == Some("clip") {
        let radius = style.get("border-radius").map_or(0.0, |v| parse_px(v));
        if blend_mode.is_none() {
            blend_mode = Some(BlendMode::SourceOver);
        }
        commands.push(DisplayCommand::blend(
            1.0,
            Some(BlendMode::DestinationIn),
            vec![DisplayCommand::RoundedRect {
                rect,
                radius,
                color: ColorValue::WHITE,
            }],
        ));
    }

    vec![DisplayCommand::blend(opacity, blend_mode, commands)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(pairs: &[(&str, &str)]) -> StyleMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_effects_without_style_are_transparent() {
        let out = paint_visual_effects(&StyleMap::new(), vec![], Rect::default());
        assert_eq!(out.len(), 1);
        assert!(!out[0].should_save());
    }

    #[test]
    fn test_overflow_clip_appends_mask_and_forces_layer() {
        let rect = Rect::new(0.0, 0.0, 50.0, 20.0);
        let out = paint_visual_effects(
            &style(&[("overflow", "clip"), ("border-radius", "4px")]),
            vec![],
            rect,
        );
        assert!(out[0].should_save());
        let mask = &out[0].children()[0];
        assert!(matches!(
            mask,
            DisplayCommand::Blend {
                blend_mode: Some(BlendMode::DestinationIn),
                ..
            }
        ));
        assert_eq!(
            mask.children()[0],
            DisplayCommand::RoundedRect {
                rect,
                radius: 4.0,
                color: ColorValue::WHITE,
            }
        );
    }

    #[test]
    fn test_mix_blend_mode_is_carried() {
        let out = paint_visual_effects(
            &style(&[("mix-blend-mode", "difference"), ("opacity", "0.25")]),
            vec![],
            Rect::default(),
        );
        assert!(matches!(
            out[0],
            DisplayCommand::Blend {
                blend_mode: Some(BlendMode::Difference),
                ..
            }
        ));
    }
}
