//! End-to-end tests: HTML and CSS in, display list out.

use kestrel_css::{
    ApproximateFontMetrics, BlendMode, ColorValue, CssParser, DisplayCommand, DisplayList,
    LayoutConfig, LayoutTree, Painter, StyleRule, resolve_styles, sort_rules, ua_rules,
};
use kestrel_dom::NodeId;
use kestrel_html::HtmlParser;

const EPSILON: f32 = 1e-3;

fn render(html: &str, css: &str) -> DisplayList {
    let mut tree = HtmlParser::new(html).parse();
    let mut rules: Vec<StyleRule> = ua_rules().to_vec();
    rules.extend(CssParser::new(css).parse_stylesheet());
    resolve_styles(&mut tree, &sort_rules(&rules));
    let layout = LayoutTree::layout(&tree, &LayoutConfig::default(), &ApproximateFontMetrics);
    Painter::new(&tree, &ApproximateFontMetrics).paint(&layout)
}

fn render_focused(html: &str, tag: &str) -> DisplayList {
    let mut tree = HtmlParser::new(html).parse();
    resolve_styles(&mut tree, &sort_rules(ua_rules()));
    let target: Option<NodeId> = tree
        .descendants(tree.root())
        .into_iter()
        .find(|&id| tree.tag_name(id) == Some(tag));
    if let Some(id) = target {
        tree.set_focused(id, true);
    }
    let layout = LayoutTree::layout(&tree, &LayoutConfig::default(), &ApproximateFontMetrics);
    Painter::new(&tree, &ApproximateFontMetrics).paint(&layout)
}

fn texts(list: &DisplayList) -> Vec<(&str, ColorValue, f32, f32)> {
    list.flatten()
        .into_iter()
        .filter_map(|c| match c {
            DisplayCommand::Text {
                text, color, rect, ..
            } => Some((text.as_str(), *color, rect.x, rect.y)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_blue_paragraph_text_position_and_color() {
    let list = render("<p>hi</p>", "p { color: blue; }");
    let texts = texts(&list);
    assert_eq!(texts.len(), 1);
    let (text, color, x, y) = texts[0];
    assert_eq!(text, "hi");
    assert_eq!(color, ColorValue::rgb(0, 0, 255));
    assert!((x - 13.0).abs() < EPSILON);
    assert!((y - 20.4).abs() < EPSILON, "y = {y}");
}

#[test]
fn test_opacity_wraps_children_in_one_saving_blend() {
    let list = render("<div><p>faded</p></div>", "div { opacity: 0.5; }");
    let saving: Vec<&DisplayCommand> = list
        .flatten()
        .into_iter()
        .filter(|c| c.should_save())
        .collect();
    assert_eq!(saving.len(), 1);

    let DisplayCommand::Blend {
        opacity, children, ..
    } = saving[0]
    else {
        panic!("expected a Blend");
    };
    assert!((opacity - 0.5).abs() < EPSILON);
    let inner = DisplayList::from(children.clone());
    assert_eq!(texts(&inner).len(), 1);
}

#[test]
fn test_plain_page_has_no_layers() {
    let list = render("<div><p>plain</p></div>", "");
    assert!(list.flatten().iter().all(|c| !c.should_save()));
}

#[test]
fn test_background_is_painted_before_text() {
    let list = render("<pre>code</pre>", "");
    let flat = list.flatten();
    let bg = flat
        .iter()
        .position(|c| matches!(c, DisplayCommand::RoundedRect { .. }))
        .expect("pre background");
    let text = flat
        .iter()
        .position(|c| matches!(c, DisplayCommand::Text { .. }))
        .expect("pre text");
    assert!(bg < text);
    if let DisplayCommand::RoundedRect { color, .. } = flat[bg] {
        assert_eq!(*color, ColorValue::rgb(0x80, 0x80, 0x80));
    }
}

#[test]
fn test_overflow_clip_masks_with_destination_in() {
    let list = render(
        "<div><p>clipped</p></div>",
        "div { overflow: clip; border-radius: 8px; }",
    );
    let masks = list
        .flatten()
        .into_iter()
        .filter(|c| {
            matches!(
                c,
                DisplayCommand::Blend {
                    blend_mode: Some(BlendMode::DestinationIn),
                    ..
                }
            )
        })
        .count();
    assert_eq!(masks, 1);
}

#[test]
fn test_input_value_and_caret() {
    let list = render_focused("<input value=abc>", "input");
    let texts = texts(&list);
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, "abc");
    let carets = list
        .flatten()
        .into_iter()
        .filter(|c| matches!(c, DisplayCommand::Line { .. }))
        .count();
    assert_eq!(carets, 1);
}

#[test]
fn test_unfocused_input_has_no_caret() {
    let list = render("<input value=abc>", "");
    assert!(
        list.flatten()
            .iter()
            .all(|c| !matches!(c, DisplayCommand::Line { .. }))
    );
}

#[test]
fn test_button_label_and_background() {
    let list = render("<button>Go</button>", "");
    let texts = texts(&list);
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, "Go");
    assert!(list.flatten().iter().any(|c| matches!(
        c,
        DisplayCommand::RoundedRect { color, .. } if *color == ColorValue::rgb(0xff, 0xa5, 0)
    )));
}

#[test]
fn test_button_with_markup_shows_no_label() {
    let list = render("<button><b>Go</b></button>", "");
    let texts = texts(&list);
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, "");
}
