//! Display List - a sequence of drawing commands
//!
//! [CSS 2.1 Appendix E](https://www.w3.org/TR/CSS2/zindex.html)
//!
//! The display list is the output of the painting phase. Commands appear in
//! painting order (back to front). A display list is immutable once handed
//! to the compositor, so it can be rastered on another thread.

use serde::Serialize;

use super::canvas::Canvas;
use crate::layout::{FontMetrics, Rect};
use crate::values::{BlendMode, ColorValue, FontSpec};

/// A single drawing command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DisplayCommand {
    /// Fill a rectangle with a solid color.
    Rect {
        /// Area to fill.
        rect: Rect,
        /// Fill color.
        color: ColorValue,
    },

    /// [§ 5 'border-radius'](https://www.w3.org/TR/css-backgrounds-3/#border-radius)
    ///
    /// Fill a rectangle with rounded corners.
    RoundedRect {
        /// Area to fill.
        rect: Rect,
        /// Corner radius; zero gives square corners.
        radius: f32,
        /// Fill color.
        color: ColorValue,
    },

    /// Stroke a line between two points.
    Line {
        /// Start point.
        from: (f32, f32),
        /// End point.
        to: (f32, f32),
        /// Stroke color.
        color: ColorValue,
        /// Stroke width.
        thickness: f32,
        /// Rectangle spanned by the two points.
        rect: Rect,
    },

    /// Stroke the outline of a rectangle.
    Outline {
        /// Rectangle to outline.
        rect: Rect,
        /// Stroke color.
        color: ColorValue,
        /// Stroke width.
        thickness: f32,
    },

    /// Draw a run of text.
    Text {
        /// The text.
        text: String,
        /// Font to set it in.
        font: FontSpec,
        /// Text color.
        color: ColorValue,
        /// Top-left at the line's top; one line tall and as wide as the text.
        rect: Rect,
    },

    /// [Compositing § 3](https://www.w3.org/TR/compositing-1/#csscompositingrules_CSS)
    ///
    /// Draw the children into an isolated group, then composite the group
    /// with `opacity` and `blend_mode`. Groups that neither fade nor blend
    /// draw straight through.
    Blend {
        /// Group opacity in `[0, 1]`.
        opacity: f32,
        /// Blend mode, if one was requested.
        blend_mode: Option<BlendMode>,
        /// Commands drawn into the group.
        children: Vec<DisplayCommand>,
        /// Union of the children's rectangles.
        rect: Rect,
    },
}

impl DisplayCommand {
    /// A straight line; its rectangle spans the endpoints.
    #[must_use]
    pub fn line(from: (f32, f32), to: (f32, f32), color: ColorValue, thickness: f32) -> Self {
        Self::Line {
            from,
            to,
            color,
            thickness,
            rect: Rect::from_ltrb(from.0, from.1, to.0, to.1),
        }
    }

    /// Text whose top-left corner is at `(x, y)`.
    #[must_use]
    pub fn text(
        x: f32,
        y: f32,
        text: &str,
        font: FontSpec,
        color: ColorValue,
        metrics: &dyn FontMetrics,
    ) -> Self {
        let rect = Rect::from_ltrb(
            x,
            y,
            x + metrics.measure(text, &font),
            y - metrics.ascent(&font) + metrics.descent(&font),
        );
        Self::Text {
            text: text.to_string(),
            font,
            color,
            rect,
        }
    }

    /// A group of children composited together.
    #[must_use]
    pub fn blend(opacity: f32, blend_mode: Option<BlendMode>, children: Vec<Self>) -> Self {
        let rect = children
            .iter()
            .fold(Rect::default(), |acc, c| acc.union(c.rect()));
        Self::Blend {
            opacity,
            blend_mode,
            children,
            rect,
        }
    }

    /// The area this command may touch.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        match self {
            Self::Rect { rect, .. }
            | Self::RoundedRect { rect, .. }
            | Self::Line { rect, .. }
            | Self::Outline { rect, .. }
            | Self::Text { rect, .. }
            | Self::Blend { rect, .. } => *rect,
        }
    }

    /// Whether executing this command needs an offscreen layer.
    ///
    /// True for a Blend with a blend mode or with opacity below one.
    #[must_use]
    pub fn should_save(&self) -> bool {
        match self {
            Self::Blend {
                opacity,
                blend_mode,
                ..
            } => blend_mode.is_some() || *opacity < 1.0,
            _ => false,
        }
    }

    /// Child commands of a Blend; empty for everything else.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Blend { children, .. } => children,
            _ => &[],
        }
    }

    /// Draw this command onto `canvas`.
    pub fn execute(&self, canvas: &mut dyn Canvas) {
        match self {
            Self::Rect { rect, color } => canvas.fill_rect(*rect, *color),
            Self::RoundedRect {
                rect,
                radius,
                color,
            } => canvas.fill_rounded_rect(*rect, *radius, *color),
            Self::Line {
                from,
                to,
                color,
                thickness,
                ..
            } => canvas.stroke_line(*from, *to, *color, *thickness),
            Self::Outline {
                rect,
                color,
                thickness,
            } => canvas.stroke_rect(*rect, *color, *thickness),
            Self::Text {
                text,
                font,
                color,
                rect,
            } => canvas.draw_text(rect.left(), rect.top(), text, font, *color),
            Self::Blend {
                opacity,
                blend_mode,
                children,
                ..
            } => {
                let save = self.should_save();
                if save {
                    canvas.save_layer(*opacity, blend_mode.unwrap_or(BlendMode::SourceOver));
                }
                for child in children {
                    child.execute(canvas);
                }
                if save {
                    canvas.restore();
                }
            }
        }
    }
}

/// An ordered list of display commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayList {
    commands: Vec<DisplayCommand>,
}

impl DisplayList {
    /// Create an empty display list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Append a command.
    pub fn push(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }

    /// Top-level commands in painting order.
    #[must_use]
    pub fn commands(&self) -> &[DisplayCommand] {
        &self.commands
    }

    /// Number of top-level commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every command, with Blend children following their group, in
    /// pre-order.
    #[must_use]
    pub fn flatten(&self) -> Vec<&DisplayCommand> {
        fn walk<'a>(commands: &'a [DisplayCommand], out: &mut Vec<&'a DisplayCommand>) {
            for command in commands {
                out.push(command);
                walk(command.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.commands, &mut out);
        out
    }

    /// Execute every command against `canvas`.
    pub fn execute(&self, canvas: &mut dyn Canvas) {
        for command in &self.commands {
            command.execute(canvas);
        }
    }
}

impl From<Vec<DisplayCommand>> for DisplayList {
    fn from(commands: Vec<DisplayCommand>) -> Self {
        Self { commands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCanvas {
        calls: Vec<String>,
    }

    impl Canvas for RecordingCanvas {
        fn fill_rect(&mut self, _rect: Rect, _color: ColorValue) {
            self.calls.push("fill_rect".into());
        }
        fn fill_rounded_rect(&mut self, _rect: Rect, _radius: f32, _color: ColorValue) {
            self.calls.push("fill_rounded_rect".into());
        }
        fn stroke_line(&mut self, _: (f32, f32), _: (f32, f32), _: ColorValue, _: f32) {
            self.calls.push("stroke_line".into());
        }
        fn stroke_rect(&mut self, _rect: Rect, _color: ColorValue, _thickness: f32) {
            self.calls.push("stroke_rect".into());
        }
        fn draw_text(&mut self, _: f32, _: f32, text: &str, _: &FontSpec, _: ColorValue) {
            self.calls.push(format!("draw_text {text}"));
        }
        fn save_layer(&mut self, opacity: f32, blend_mode: BlendMode) {
            self.calls.push(format!("save_layer {opacity} {blend_mode:?}"));
        }
        fn restore(&mut self) {
            self.calls.push("restore".into());
        }
    }

    fn rect_cmd(x: f32) -> DisplayCommand {
        DisplayCommand::Rect {
            rect: Rect::new(x, 0.0, 10.0, 10.0),
            color: ColorValue::BLACK,
        }
    }

    #[test]
    fn test_plain_blend_draws_straight_through() {
        let blend = DisplayCommand::blend(1.0, None, vec![rect_cmd(0.0)]);
        assert!(!blend.should_save());

        let mut canvas = RecordingCanvas::default();
        blend.execute(&mut canvas);
        assert_eq!(canvas.calls, vec!["fill_rect"]);
    }

    #[test]
    fn test_translucent_blend_uses_a_layer() {
        let blend = DisplayCommand::blend(0.5, None, vec![rect_cmd(0.0)]);
        assert!(blend.should_save());

        let mut canvas = RecordingCanvas::default();
        blend.execute(&mut canvas);
        assert_eq!(
            canvas.calls,
            vec!["save_layer 0.5 SourceOver", "fill_rect", "restore"]
        );
    }

    #[test]
    fn test_blend_mode_alone_forces_a_layer() {
        let blend = DisplayCommand::blend(1.0, Some(BlendMode::Multiply), vec![]);
        assert!(blend.should_save());
    }

    #[test]
    fn test_blend_rect_is_union_of_children() {
        let blend = DisplayCommand::blend(1.0, None, vec![rect_cmd(0.0), rect_cmd(20.0)]);
        assert_eq!(blend.rect(), Rect::new(0.0, 0.0, 30.0, 10.0));
    }

    #[test]
    fn test_flatten_is_preorder() {
        let inner = DisplayCommand::blend(1.0, None, vec![rect_cmd(5.0)]);
        let list = DisplayList::from(vec![rect_cmd(0.0), inner]);
        let flat = list.flatten();
        assert_eq!(flat.len(), 3);
        assert!(matches!(flat[1], DisplayCommand::Blend { .. }));
        assert_eq!(flat[2].rect().x, 5.0);
    }
}
