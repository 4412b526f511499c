//! Reconstructs source lines from highlighted markup.
//!
//! Highlighters wrap tokens in spans without regard for line boundaries: a
//! block comment is one span spanning many lines. The walk below splits such
//! spans so that every line owns its own tokens, each carrying the full chain
//! of classes that was active when its text was produced.

use crate::markup::{Element, Node};

use super::{Line, LineTable, Token};

/// Accumulates tokens into lines during the markup walk.
struct Accumulator {
    lines: Vec<Vec<Token>>,
    current: Vec<Token>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Append a token to the current line.
    ///
    /// A line holds either a single empty placeholder token or only non-empty
    /// tokens: an empty token is kept only while it is the line's sole
    /// content, so an empty line still occupies a position.
    fn push(&mut self, token: Token) {
        if token.text.is_empty() {
            if self.current.is_empty() {
                self.current.push(token);
            }
            return;
        }
        if self.current.len() == 1 && self.current.iter().all(|t| t.text.is_empty()) {
            self.current.clear();
        }
        self.current.push(token);
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
    }

    fn finish(mut self) -> Vec<Line> {
        self.break_line();
        self.lines
            .into_iter()
            .enumerate()
            .map(|(index, tokens)| Line::new(index + 1, tokens))
            .collect()
    }
}

/// Build a [`LineTable`] from highlighted markup nodes.
#[tracing::instrument(level = "debug", skip(nodes), fields(roots = nodes.len()))]
pub(crate) fn build(nodes: &[Node]) -> LineTable {
    let mut acc = Accumulator::new();
    for node in nodes {
        process(node, &[], &mut acc);
    }
    let table = LineTable::from_lines(acc.finish());
    tracing::debug!(lines = table.len(), "built line table");
    table
}

fn process(node: &Node, classes: &[String], acc: &mut Accumulator) {
    match node {
        Node::Text(text) => push_text(&text.content, classes, acc),
        Node::Element(element) => process_element(element, classes, acc),
    }
}

fn process_element(element: &Element, classes: &[String], acc: &mut Accumulator) {
    let chain = with_class(classes, &element.class);
    match element.children.as_slice() {
        // The class is inlined onto the child's tokens instead of nesting
        // another wrapper around them.
        [only] => process(only, &chain, acc),
        children if children.iter().any(Node::contains_newline) => {
            for child in children {
                process(child, &chain, acc);
            }
        }
        // No newline inside: its internal structure is irrelevant to line
        // splitting, keep it whole.
        _ => acc.push(Token::atomic(element.text_content(), chain, element.clone())),
    }
}

fn push_text(content: &str, classes: &[String], acc: &mut Accumulator) {
    for (i, segment) in content.split('\n').enumerate() {
        if i != 0 {
            acc.break_line();
        }
        acc.push(Token::new(segment, classes.to_vec()));
    }
}

fn with_class(classes: &[String], class: &str) -> Vec<String> {
    let mut chain = classes.to_vec();
    if !class.is_empty() {
        chain.push(class.to_string());
    }
    chain
}
