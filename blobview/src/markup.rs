//! Highlighted markup as produced by an external tokenizer.
//!
//! The tokenizer contract is deliberately small: text runs carry raw
//! characters, elements carry one class string naming a token kind and any
//! number of children. [`parse`] reads that contract from HTML text; the
//! browser host builds the same tree from live DOM nodes.

use serde::Serialize;

use crate::Error;

/// A node of highlighted markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Text(Text),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    /// Empty when the element carried no class.
    pub class: String,
    pub children: Vec<Node>,
}

impl Node {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(Text {
            content: content.into(),
        })
    }

    #[must_use]
    pub fn element(class: impl Into<String>, children: Vec<Node>) -> Self {
        Self::Element(Element {
            class: class.into(),
            children,
        })
    }

    /// Concatenated text of this node and all its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(&text.content),
            Self::Element(element) => {
                for child in &element.children {
                    child.push_text(out);
                }
            }
        }
    }

    #[must_use]
    pub fn contains_newline(&self) -> bool {
        match self {
            Self::Text(text) => text.content.contains('\n'),
            Self::Element(element) => element.children.iter().any(Node::contains_newline),
        }
    }
}

impl Element {
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text(&mut out);
        }
        out
    }
}

peg::parser! {
    grammar markup_parser() for str {
        pub(crate) rule nodes() -> Vec<Node>
            = node()*

        rule node() -> Node
            = element() / text()

        rule element() -> Node
            = "<" open:tag_name() attributes:attribute()* _ ">" children:nodes() "</" close:tag_name() _ ">" {?
                if open.eq_ignore_ascii_case(close) {
                    let class = attributes
                        .into_iter()
                        .find_map(|(name, value)| name.eq_ignore_ascii_case("class").then_some(value))
                        .unwrap_or_default();
                    Ok(Node::element(class, children))
                } else {
                    Err("matching closing tag")
                }
            }

        rule text() -> Node
            = t:$([^'<']+) { Node::text(decode_entities(t)) }

        rule tag_name() -> &'input str
            = $(['a'..='z' | 'A'..='Z'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '-']*)

        rule attribute() -> (&'input str, String)
            = __ name:attribute_name() value:(_ "=" _ v:attribute_value() { v })? {
                (name, value.unwrap_or_default())
            }

        rule attribute_name() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | ':']+)

        rule attribute_value() -> String
            = "\"" v:$([^'"']*) "\"" { decode_entities(v) }
            / "'" v:$([^'\'']*) "'" { decode_entities(v) }

        rule _ = quiet!{[' ' | '\t' | '\n' | '\r']*}
        rule __ = quiet!{[' ' | '\t' | '\n' | '\r']+}
    }
}

/// Parse highlighted HTML into a markup tree.
///
/// # Errors
///
/// Returns [`Error::Markup`] when tags are unbalanced or malformed.
#[tracing::instrument(level = "trace", skip(input), fields(len = input.len()))]
pub fn parse(input: &str) -> Result<Vec<Node>, Error> {
    Ok(markup_parser::nodes(input)?)
}

/// Decode HTML character references.
///
/// Unknown named references are kept literally, as browsers do.
#[must_use]
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        out.push_str(before);
        match after.find(';').and_then(|semi| {
            let name = after.get(1..semi)?;
            Some((decode_reference(name)?, semi))
        }) {
            Some((ch, semi)) => {
                out.push(ch);
                rest = after.get(semi + 1..).unwrap_or_default();
            }
            None => {
                out.push('&');
                rest = after.get(1..).unwrap_or_default();
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        numeric => {
            let digits = numeric.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(s, &mut out);
    out
}

pub(crate) fn escape_into(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_spans() -> Result<(), Error> {
        let nodes = parse(r#"<span class="hljs-keyword">fn</span> <span class="hljs-title">main</span>"#)?;
        assert_eq!(
            nodes,
            vec![
                Node::element("hljs-keyword", vec![Node::text("fn")]),
                Node::text(" "),
                Node::element("hljs-title", vec![Node::text("main")]),
            ]
        );
        Ok(())
    }

    #[test]
    fn decodes_entities_in_text() -> Result<(), Error> {
        let nodes = parse("a &lt; b &amp;&amp; c &#62; d &#x41; &unknown;")?;
        assert_eq!(nodes, vec![Node::text("a < b && c > d A &unknown;")]);
        Ok(())
    }

    #[test]
    fn element_without_class_has_empty_class() -> Result<(), Error> {
        let nodes = parse("<b id='x'>bold</b>")?;
        assert_eq!(nodes, vec![Node::element("", vec![Node::text("bold")])]);
        Ok(())
    }

    #[test]
    fn single_quoted_class() -> Result<(), Error> {
        let nodes = parse("<span class='c'>x</span>")?;
        assert_eq!(nodes, vec![Node::element("c", vec![Node::text("x")])]);
        Ok(())
    }

    #[test]
    fn mismatched_closing_tag_is_an_error() {
        let result = parse("<span class=\"a\">x</div>");
        assert!(matches!(result, Err(Error::Markup(_))));
    }

    #[test]
    fn unclosed_element_is_an_error() {
        let result = parse("<span class=\"a\">x");
        assert!(result.is_err_and(|e| e.offset().is_some()));
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let node = Node::element(
            "outer",
            vec![
                Node::text("a\n"),
                Node::element("inner", vec![Node::text("b")]),
            ],
        );
        assert_eq!(node.text_content(), "a\nb");
        assert!(node.contains_newline());
    }

    #[test]
    fn escape_round_trips_through_decode() {
        let text = r#"if a < b && c > "d" {"#;
        assert_eq!(decode_entities(&escape_html(text)), text);
    }
}
