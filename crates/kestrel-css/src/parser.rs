//! [CSS Syntax Module Level 3](https://www.w3.org/TR/css-syntax-3/)
//!
//! A character-level recursive-descent parser for the subset of CSS the
//! browser understands: `selector { property: value; ... }` rules where a
//! value is a single word. Parsing never fails as a whole. A bad
//! declaration is skipped up to the next `;` or `}`, and a bad rule is
//! skipped up to the next `}`.

use thiserror::Error;

use crate::cascade::StyleRule;
use crate::selector::Selector;

/// Characters allowed inside a word besides alphanumerics.
const WORD_PUNCTUATION: &[char] = &['#', '-', '.', '%'];

/// Errors raised while parsing a single construct.
///
/// These never escape [`CssParser::parse_stylesheet`] or
/// [`CssParser::parse_declarations`], which recover from them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssParseError {
    /// A specific character was required.
    #[error("expected '{expected}' at offset {position}")]
    Expected {
        /// The required character.
        expected: char,
        /// Character offset into the source.
        position: usize,
    },
    /// A property name, value, or selector word was required.
    #[error("expected a word at offset {position}")]
    ExpectedWord {
        /// Character offset into the source.
        position: usize,
    },
    /// Input remained after a complete selector.
    #[error("unexpected input after selector at offset {position}")]
    TrailingInput {
        /// Character offset into the source.
        position: usize,
    },
}

/// Recursive-descent CSS parser over a character buffer.
pub struct CssParser {
    chars: Vec<char>,
    pos: usize,
}

impl CssParser {
    /// Create a parser over `source`. Comments are dropped up front.
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            chars: strip_comments(source).chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn literal(&mut self, expected: char) -> Result<(), CssParseError> {
        if self.peek() != Some(expected) {
            return Err(CssParseError::Expected {
                expected,
                position: self.pos,
            });
        }
        self.pos += 1;
        Ok(())
    }

    fn word(&mut self) -> Result<String, CssParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || WORD_PUNCTUATION.contains(&c))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(CssParseError::ExpectedWord { position: start });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Skip forward to the first of `stops`, returning it without consuming.
    fn ignore_until(&mut self, stops: &[char]) -> Option<char> {
        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                return Some(c);
            }
            self.pos += 1;
        }
        None
    }

    fn pair(&mut self) -> Result<(String, String), CssParseError> {
        let property = self.word()?;
        self.whitespace();
        self.literal(':')?;
        self.whitespace();
        let value = self.word()?;
        Ok((property.to_lowercase(), value))
    }

    /// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
    ///
    /// Parse declarations up to the closing `}` or end of input. Used for
    /// rule bodies and for inline `style` attributes.
    pub fn parse_declarations(&mut self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        while self.peek().is_some_and(|c| c != '}') {
            let declaration = self.pair().and_then(|pair| {
                self.whitespace();
                // The final declaration may omit its semicolon.
                if self.peek().is_some_and(|c| c != '}') {
                    self.literal(';')?;
                }
                self.whitespace();
                Ok(pair)
            });
            match declaration {
                Ok(pair) => pairs.push(pair),
                Err(_) => {
                    if self.ignore_until(&[';', '}']) == Some(';') {
                        self.pos += 1;
                        self.whitespace();
                    } else {
                        break;
                    }
                }
            }
        }
        pairs
    }

    fn selector(&mut self) -> Result<Selector, CssParseError> {
        let mut out = Selector::tag(&self.word()?);
        self.whitespace();
        while self.peek().is_some_and(|c| c != '{') {
            let descendant = Selector::tag(&self.word()?);
            out = Selector::descendant(out, descendant);
            self.whitespace();
        }
        Ok(out)
    }

    /// Parse the whole input as a single selector, as `querySelectorAll` does.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid selector.
    pub fn parse_selector(&mut self) -> Result<Selector, CssParseError> {
        self.whitespace();
        let selector = self.selector()?;
        if self.pos < self.chars.len() {
            return Err(CssParseError::TrailingInput { position: self.pos });
        }
        Ok(selector)
    }

    fn rule(&mut self) -> Result<StyleRule, CssParseError> {
        self.whitespace();
        let selector = self.selector()?;
        self.literal('{')?;
        self.whitespace();
        let declarations = self.parse_declarations();
        self.literal('}')?;
        Ok(StyleRule {
            selector,
            declarations,
        })
    }

    /// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
    ///
    /// Parse every rule in the input, in source order.
    pub fn parse_stylesheet(&mut self) -> Vec<StyleRule> {
        let mut rules = Vec::new();
        while self.pos < self.chars.len() {
            match self.rule() {
                Ok(rule) => rules.push(rule),
                Err(err) => {
                    tracing::debug!(%err, "skipping malformed CSS rule");
                    if self.ignore_until(&['}']).is_some() {
                        self.pos += 1;
                        self.whitespace();
                    } else {
                        break;
                    }
                }
            }
        }
        rules
    }
}

/// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
///
/// An unterminated comment runs to the end of the input.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decls(source: &str) -> Vec<(String, String)> {
        CssParser::new(source).parse_declarations()
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            decls("color: red; font-size:20px;"),
            vec![
                ("color".to_string(), "red".to_string()),
                ("font-size".to_string(), "20px".to_string()),
            ]
        );
    }

    #[test]
    fn test_bad_declaration_is_skipped_to_semicolon() {
        assert_eq!(
            decls("color: ; font-weight: bold;"),
            vec![("font-weight".to_string(), "bold".to_string())]
        );
    }

    #[test]
    fn test_final_semicolon_is_optional() {
        assert_eq!(
            decls("color: red; margin: 1px"),
            vec![
                ("color".to_string(), "red".to_string()),
                ("margin".to_string(), "1px".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_word_value_is_skipped() {
        assert_eq!(
            decls("border: 1px solid; color: red;"),
            vec![("color".to_string(), "red".to_string())]
        );
    }

    #[test]
    fn test_stylesheet_rules_in_order() {
        let rules = CssParser::new("p { color: blue; } div p { color: red; }").parse_stylesheet();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selector, Selector::tag("p"));
        assert_eq!(
            rules[1].selector,
            Selector::descendant(Selector::tag("div"), Selector::tag("p"))
        );
        assert_eq!(rules[1].declarations[0].1, "red");
    }

    #[test]
    fn test_bad_rule_is_skipped_to_closing_brace() {
        let rules = CssParser::new("@media { x } p { color: blue; }").parse_stylesheet();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, Selector::tag("p"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let rules = CssParser::new("/* lead */ p { /* inner */ color: blue; }").parse_stylesheet();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].declarations.len(), 1);
    }

    #[test]
    fn test_unterminated_rule_yields_nothing() {
        assert!(CssParser::new("p { color: blue;").parse_stylesheet().is_empty());
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            CssParser::new(" div  span").parse_selector(),
            Ok(Selector::descendant(Selector::tag("div"), Selector::tag("span")))
        );
        assert!(CssParser::new("").parse_selector().is_err());
        assert!(CssParser::new("p {").parse_selector().is_err());
    }
}
