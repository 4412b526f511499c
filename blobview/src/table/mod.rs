//! Line-addressable table built from highlighted markup.

mod builder;
mod dom;

use serde::Serialize;

use crate::{
    Error,
    error::Mismatch,
    markup::{Element, Node},
};

pub use dom::{CODE_CELL_CLASS, LINE_NUMBER_CLASS, NodeId, NodeKind, NodeRef, TableDom};

/// Smallest styled unit of source text in the rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    text: String,
    /// Outermost first.
    classes: Vec<String>,
    /// 1-based character column of the token's first character.
    start_column: usize,
    /// Original subtree of an atomic multi-child element.
    #[serde(skip)]
    markup: Option<Element>,
}

impl Token {
    pub(crate) fn new(text: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            text: text.into(),
            classes,
            start_column: 0,
            markup: None,
        }
    }

    pub(crate) fn atomic(text: String, classes: Vec<String>, markup: Element) -> Self {
        Self {
            text,
            classes,
            start_column: 0,
            markup: Some(markup),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn start_column(&self) -> usize {
        self.start_column
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    #[must_use]
    pub fn markup(&self) -> Option<&Element> {
        self.markup.as_ref()
    }

    fn contains_column(&self, column: usize) -> bool {
        let len = self.char_len();
        if len == 0 {
            column == self.start_column
        } else {
            column >= self.start_column && column < self.start_column + len
        }
    }
}

/// One newline-delimited row of file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    number: usize,
    tokens: Vec<Token>,
    highlighted: bool,
}

impl Line {
    fn new(number: usize, mut tokens: Vec<Token>) -> Self {
        let mut column = 1;
        for token in &mut tokens {
            token.start_column = column;
            column += token.char_len();
        }
        Self {
            number,
            tokens,
            highlighted: false,
        }
    }

    /// 1-based line number.
    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub(crate) fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.tokens.iter().map(Token::text).collect()
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        self.tokens.iter().map(Token::char_len).sum()
    }
}

/// Identity of a token: its line and its index within that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenId {
    pub line: usize,
    pub index: usize,
}

/// A resolved pointer position: 1-based line and character column, and the
/// token under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hit {
    pub line: usize,
    pub column: usize,
    pub token: TokenId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineTable {
    lines: Vec<Line>,
}

impl LineTable {
    fn from_lines(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Build a table from highlighted markup.
    #[must_use]
    pub fn build(nodes: &[Node]) -> Self {
        builder::build(nodes)
    }

    /// Build a table and verify that it reproduces `source` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildInconsistency`] when the concatenated line text
    /// differs from `source`. This is a contract violation by the tokenizer:
    /// every line/column computation downstream depends on the match.
    pub fn build_checked(nodes: &[Node], source: &str) -> Result<Self, Error> {
        let table = Self::build(nodes);
        table.verify(source)?;
        Ok(table)
    }

    /// Compare the reconstructed text against `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildInconsistency`] describing the first difference.
    pub fn verify(&self, source: &str) -> Result<(), Error> {
        let actual = self.text();
        if actual == source {
            return Ok(());
        }
        let line = actual
            .split('\n')
            .zip(source.split('\n'))
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| actual.split('\n').count().min(source.split('\n').count()))
            + 1;
        let mismatch = Mismatch {
            expected_len: source.len(),
            actual_len: actual.len(),
            line,
        };
        tracing::error!(%mismatch, "highlighted markup does not reproduce the source text");
        Err(Error::BuildInconsistency(mismatch))
    }

    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Line by 1-based number.
    #[must_use]
    pub fn line(&self, number: usize) -> Option<&Line> {
        self.lines.get(number.checked_sub(1)?)
    }

    pub(crate) fn line_mut(&mut self, number: usize) -> Option<&mut Line> {
        self.lines.get_mut(number.checked_sub(1)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Full text, lines joined with `\n`.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.line(id.line)?.tokens.get(id.index)
    }

    /// The token covering a 1-based character column.
    #[must_use]
    pub fn token_at(&self, line: usize, column: usize) -> Option<(TokenId, &Token)> {
        let tokens = &self.line(line)?.tokens;
        tokens
            .iter()
            .enumerate()
            .find(|(_, token)| token.contains_column(column))
            .map(|(index, token)| (TokenId { line, index }, token))
    }

    /// Turn a raw cell position into a hit on a token.
    ///
    /// `None` when the line does not exist in this table or no token covers
    /// the column, e.g. the pointer is past the end of the line.
    #[must_use]
    pub fn hit(&self, line: usize, column: usize) -> Option<Hit> {
        let (token, _) = self.token_at(line, column)?;
        Some(Hit {
            line,
            column,
            token,
        })
    }

    /// Numbers of all highlighted lines.
    #[must_use]
    pub fn highlighted_lines(&self) -> Vec<usize> {
        self.lines
            .iter()
            .filter(|line| line.highlighted)
            .map(|line| line.number)
            .collect()
    }

    /// Render the table into an in-memory DOM.
    #[must_use]
    pub fn render(&self, highlight_class: &str) -> TableDom {
        TableDom::render(self, highlight_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_checked_accepts_matching_source() -> Result<(), Error> {
        let nodes = markup::parse("<span class=\"k\">let</span> x = 1;\n")?;
        let table = LineTable::build_checked(&nodes, "let x = 1;\n")?;
        assert_eq!(table.len(), 2);
        Ok(())
    }

    #[test]
    #[tracing_test::traced_test]
    fn build_checked_reports_first_differing_line() -> Result<(), Error> {
        let nodes = markup::parse("a\nb\nc")?;
        let result = LineTable::build_checked(&nodes, "a\nB\nc");
        let Err(Error::BuildInconsistency(mismatch)) = result else {
            panic!("expected a build inconsistency, got {result:?}");
        };
        assert_eq!(
            mismatch,
            Mismatch {
                expected_len: 5,
                actual_len: 5,
                line: 2
            }
        );
        assert!(logs_contain("does not reproduce the source text"));
        Ok(())
    }

    #[test]
    fn missing_trailing_line_is_reported_on_the_missing_line() -> Result<(), Error> {
        let nodes = markup::parse("a\nb")?;
        let result = LineTable::build_checked(&nodes, "a\nb\n");
        assert!(matches!(
            result,
            Err(Error::BuildInconsistency(Mismatch { line: 3, .. }))
        ));
        let nodes = markup::parse("a\nb\nc")?;
        let result = LineTable::build_checked(&nodes, "a\nb");
        assert!(matches!(
            result,
            Err(Error::BuildInconsistency(Mismatch { line: 3, .. }))
        ));
        Ok(())
    }

    #[test]
    fn token_at_maps_columns_to_tokens() -> Result<(), Error> {
        let nodes = markup::parse("<span class=\"k\">fn</span> <span class=\"t\">main</span>()")?;
        let table = LineTable::build(&nodes);
        let at = |column| table.token_at(1, column).map(|(id, t)| (id.index, t.text()));
        assert_eq!(at(1), Some((0, "fn")));
        assert_eq!(at(2), Some((0, "fn")));
        assert_eq!(at(3), Some((1, " ")));
        assert_eq!(at(4), Some((2, "main")));
        assert_eq!(at(8), Some((3, "()")));
        assert_eq!(at(10), None);
        assert_eq!(table.token_at(2, 1), None);
        Ok(())
    }

    #[test]
    fn empty_line_placeholder_is_hit_at_column_one() {
        let table = LineTable::build(&[Node::text("a\n\nb")]);
        assert_eq!(
            table.hit(2, 1).map(|hit| hit.token),
            Some(TokenId { line: 2, index: 0 })
        );
        assert_eq!(table.hit(2, 2), None);
    }

    #[test]
    fn line_zero_does_not_exist() {
        let table = LineTable::build(&[Node::text("a")]);
        assert!(table.line(0).is_none());
        assert!(table.line(1).is_some());
    }
}
