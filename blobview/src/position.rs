//! Mapping between pointer targets in a rendered table and line/column
//! positions.
//!
//! The walk is written against [`ViewNode`] so the same code runs over the
//! in-memory [`TableDom`](crate::TableDom) and over live browser nodes.

use serde::Serialize;

use crate::table::{LineTable, Token, TokenId};

/// What a node is, as far as position resolution cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Row,
    LineNumberCell,
    CodeCell,
    Other,
}

/// A node of a rendered line table.
pub trait ViewNode: Sized {
    fn parent(&self) -> Option<Self>;

    fn previous_sibling(&self) -> Option<Self>;

    fn role(&self) -> NodeRole;

    /// Number of characters of text at or below this node.
    fn char_len(&self) -> usize;

    /// For a row, the number written in its line-number cell.
    fn row_line_number(&self) -> Option<usize>;
}

/// A 1-based line and character column inside a code cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellPosition {
    pub line: usize,
    pub column: usize,
}

/// Resolve a pointer target and the character offset inside it.
///
/// The column counts every character that precedes the target inside its code
/// cell plus `offset`. An offset at or past the end of the target addresses its
/// last character, so a caret between two tokens stays on the one the pointer
/// is over. Returns `None` when the target is outside any row, in
/// the line-number column, or directly on the code cell rather than on one of
/// its tokens.
#[tracing::instrument(level = "trace", skip(target))]
pub fn resolve<N: ViewNode>(target: &N, offset: usize) -> Option<CellPosition> {
    if target.role() == NodeRole::CodeCell {
        tracing::trace!("target is the code cell itself");
        return None;
    }
    let mut preceding = 0;
    let mut sibling = target.previous_sibling();
    let mut parent = target.parent();
    loop {
        while let Some(previous) = sibling {
            preceding += previous.char_len();
            sibling = previous.previous_sibling();
        }
        let current = parent?;
        match current.role() {
            NodeRole::CodeCell => {
                let line = current.parent()?.row_line_number()?;
                let column = preceding + offset.min(target.char_len().saturating_sub(1)) + 1;
                return Some(CellPosition { line, column });
            }
            NodeRole::Row | NodeRole::LineNumberCell => return None,
            NodeRole::Other => {
                sibling = current.previous_sibling();
                parent = current.parent();
            }
        }
    }
}

/// The line of the row containing `target`, wherever in the row it is.
#[must_use]
pub fn resolve_row<N: ViewNode>(target: &N) -> Option<usize> {
    let mut node = match target.role() {
        NodeRole::Row => return target.row_line_number(),
        NodeRole::LineNumberCell | NodeRole::CodeCell | NodeRole::Other => target.parent()?,
    };
    loop {
        if node.role() == NodeRole::Row {
            return node.row_line_number();
        }
        node = node.parent()?;
    }
}

/// The token at a 1-based line and character column.
#[must_use]
pub fn locate(table: &LineTable, line: usize, column: usize) -> Option<(TokenId, &Token)> {
    table.token_at(line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{markup, table::TableDom};
    use pretty_assertions::assert_eq;

    fn dom(input: &str) -> (LineTable, TableDom) {
        let nodes = markup::parse(input).unwrap_or_default();
        let table = LineTable::build(&nodes);
        let dom = table.render("highlighted");
        (table, dom)
    }

    #[test]
    fn resolves_text_inside_a_token() {
        let (_, dom) = dom("x\n<span class=\"k\">let</span> <span class=\"v\">value</span> = 1;");
        let token = dom.token_node(TokenId { line: 2, index: 2 });
        let text = token.and_then(|id| dom.first_text(id)).map(|id| dom.node(id));
        assert_eq!(
            text.and_then(|t| resolve(&t, 2)),
            Some(CellPosition { line: 2, column: 7 })
        );
    }

    #[test]
    fn resolves_through_nested_spans() {
        let (table, dom) = dom("<span class=\"a\"><span class=\"b\">ab</span></span>cd");
        let token = dom.token_node(TokenId { line: 1, index: 1 });
        let text = token.and_then(|id| dom.first_text(id)).map(|id| dom.node(id));
        let position = text.and_then(|t| resolve(&t, 1));
        assert_eq!(position, Some(CellPosition { line: 1, column: 4 }));
        let hit = position.and_then(|p| table.hit(p.line, p.column));
        assert_eq!(hit.map(|h| h.token), Some(TokenId { line: 1, index: 1 }));
    }

    #[test]
    fn resolves_inside_atomic_markup() {
        let (_, dom) = dom("<span class=\"s\">\"<span class=\"e\">\\t</span>\"</span>!");
        let escape = dom
            .token_node(TokenId { line: 1, index: 0 })
            .and_then(|id| dom.children(id).get(1).copied())
            .and_then(|id| dom.first_text(id))
            .map(|id| dom.node(id));
        assert_eq!(
            escape.and_then(|t| resolve(&t, 1)),
            Some(CellPosition { line: 1, column: 3 })
        );
    }

    #[test]
    fn code_cell_itself_resolves_to_none() {
        let (_, dom) = dom("abc");
        let cell = dom.code_cell(1).map(|id| dom.node(id));
        assert_eq!(cell.and_then(|c| resolve(&c, 0)), None);
    }

    #[test]
    fn line_number_cell_resolves_to_none() {
        let (_, dom) = dom("abc");
        let number = dom
            .line_number_cell(1)
            .and_then(|id| dom.first_text(id))
            .map(|id| dom.node(id));
        assert_eq!(number.and_then(|n| resolve(&n, 0)), None);
        assert_eq!(number.and_then(|n| resolve_row(&n)), Some(1));
    }

    #[test]
    fn outside_any_row_resolves_to_none() {
        let (_, dom) = dom("abc");
        let row = dom.row(1).map(|id| dom.node(id));
        let table = row.and_then(|r| r.parent());
        assert!(table.is_some());
        assert_eq!(table.and_then(|t| resolve(&t, 0)), None);
        assert_eq!(table.and_then(|t| resolve_row(&t)), None);
    }

    #[test]
    fn offset_past_the_end_stays_on_the_target_token() {
        let (table, dom) = dom("<span class=\"k\">fn</span> main");
        let id = TokenId { line: 1, index: 0 };
        let text = dom
            .token_node(id)
            .and_then(|node| dom.first_text(node))
            .map(|node| dom.node(node));
        for offset in [1, 2, 10] {
            let position = text.and_then(|t| resolve(&t, offset));
            assert_eq!(position, Some(CellPosition { line: 1, column: 2 }));
            let hit = position.and_then(|p| table.hit(p.line, p.column));
            assert_eq!(hit.map(|h| h.token), Some(id));
        }
    }

    #[test]
    fn locate_is_the_inverse_of_resolve() {
        let (table, dom) = dom("<span class=\"k\">pub</span> <span class=\"k\">fn</span>");
        for (index, token) in table.line(1).map(|l| l.tokens()).unwrap_or_default().iter().enumerate() {
            let id = TokenId { line: 1, index };
            let located = locate(&table, 1, token.start_column()).map(|(id, _)| id);
            assert_eq!(located, Some(id));
            let text = dom.token_node(id).and_then(|n| dom.first_text(n)).map(|n| dom.node(n));
            assert_eq!(
                text.and_then(|t| resolve(&t, 0)).map(|p| p.column),
                Some(token.start_column())
            );
        }
    }
}
