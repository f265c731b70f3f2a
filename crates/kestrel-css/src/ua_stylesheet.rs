//! User-Agent Stylesheet
//!
//! [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html)
//!
//! "User agents are expected to have a default style sheet that presents elements
//! of HTML documents in ways consistent with general user expectations."
//!
//! UA rules are placed ahead of author rules before sorting, so an author
//! rule of equal specificity overrides them.

use std::sync::OnceLock;

use crate::cascade::StyleRule;
use crate::parser::CssParser;

/// Default CSS rules for the elements Kestrel gives special treatment.
const UA_CSS: &str = r"
pre { background-color: gray; }
a { color: blue; }
i { font-style: italic; }
b { font-weight: bold; }
small { font-size: 90%; }
big { font-size: 110%; }

input {
    font-size: 16px; font-weight: normal; font-style: normal;
    background-color: lightblue;
}

button {
    font-size: 16px; font-weight: normal; font-style: normal;
    background-color: orange;
}
";

/// Return the parsed UA stylesheet, parsing only once.
pub fn ua_rules() -> &'static [StyleRule] {
    static RULES: OnceLock<Vec<StyleRule>> = OnceLock::new();
    RULES.get_or_init(|| CssParser::new(UA_CSS).parse_stylesheet())
}
