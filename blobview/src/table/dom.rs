//! In-memory rendering of a [`LineTable`].
//!
//! Mirrors the table the browser host writes into the page: one row per line,
//! a `line-number` cell and a `code-cell` cell whose children are exactly the
//! line's tokens, one node per token. Used to serialize the table and as the
//! node tree the position resolver walks when no browser is around.

use crate::{
    highlight::HighlightChange,
    markup::{self, Element, Node},
    position::{NodeRole, ViewNode},
};

use super::{LineTable, Token, TokenId};

pub const LINE_NUMBER_CLASS: &str = "line-number";
pub const CODE_CELL_CLASS: &str = "code-cell";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Table,
    Row,
    LineNumberCell,
    CodeCell,
    Span,
    Text,
}

#[derive(Debug, Clone)]
struct DomNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    text: String,
}

#[derive(Debug, Clone)]
pub struct TableDom {
    nodes: Vec<DomNode>,
    /// Row node per line, index `line - 1`.
    rows: Vec<NodeId>,
    highlight_class: String,
}

impl TableDom {
    pub(crate) fn render(table: &LineTable, highlight_class: &str) -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            rows: Vec::with_capacity(table.len()),
            highlight_class: highlight_class.to_string(),
        };
        let root = dom.push(None, NodeKind::Table, Vec::new(), String::new());
        for line in table.lines() {
            let row = dom.push(Some(root), NodeKind::Row, Vec::new(), String::new());
            let number = dom.push(
                Some(row),
                NodeKind::LineNumberCell,
                vec![LINE_NUMBER_CLASS.to_string()],
                String::new(),
            );
            dom.push(Some(number), NodeKind::Text, Vec::new(), line.number().to_string());
            let mut classes = vec![CODE_CELL_CLASS.to_string()];
            if line.is_highlighted() {
                classes.push(dom.highlight_class.clone());
            }
            let cell = dom.push(Some(row), NodeKind::CodeCell, classes, String::new());
            for token in line.tokens() {
                dom.push_token(cell, token);
            }
            dom.rows.push(row);
        }
        dom
    }

    fn push(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
        classes: Vec<String>,
        text: String,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode {
            kind,
            parent,
            children: Vec::new(),
            classes,
            text,
        });
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
            parent.children.push(id);
        }
        id
    }

    fn push_token(&mut self, cell: NodeId, token: &Token) {
        let classes = token.classes();
        let outer = match token.markup() {
            Some(element) if !element.class.is_empty() => {
                classes.get(..classes.len().saturating_sub(1)).unwrap_or_default()
            }
            Some(_) | None => classes,
        };
        let mut parent = cell;
        for class in outer {
            parent = self.push(Some(parent), NodeKind::Span, vec![class.clone()], String::new());
        }
        match token.markup() {
            Some(element) => self.push_element(parent, element),
            None => {
                self.push(Some(parent), NodeKind::Text, Vec::new(), token.text().to_string());
            }
        }
    }

    fn push_element(&mut self, parent: NodeId, element: &Element) {
        let classes = if element.class.is_empty() {
            Vec::new()
        } else {
            vec![element.class.clone()]
        };
        let id = self.push(Some(parent), NodeKind::Span, classes, String::new());
        for child in &element.children {
            match child {
                Node::Text(text) => {
                    self.push(Some(id), NodeKind::Text, Vec::new(), text.content.clone());
                }
                Node::Element(element) => self.push_element(id, element),
            }
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { dom: self, id }
    }

    #[must_use]
    pub fn row(&self, line: usize) -> Option<NodeId> {
        self.rows.get(line.checked_sub(1)?).copied()
    }

    #[must_use]
    pub fn line_number_cell(&self, line: usize) -> Option<NodeId> {
        self.child_of_kind(self.row(line)?, NodeKind::LineNumberCell)
    }

    /// The rendered code cell of a 1-based line.
    #[must_use]
    pub fn code_cell(&self, line: usize) -> Option<NodeId> {
        self.child_of_kind(self.row(line)?, NodeKind::CodeCell)
    }

    /// Where pointer listeners for a line are attached; the code cell itself.
    #[must_use]
    pub fn event_target(&self, line: usize) -> Option<NodeId> {
        self.code_cell(line)
    }

    /// The node rendering a token: the code cell's child at the token's index.
    #[must_use]
    pub fn token_node(&self, token: TokenId) -> Option<NodeId> {
        let cell = self.code_cell(token.line)?;
        self.nodes.get(cell.0)?.children.get(token.index).copied()
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |node| node.children.as_slice())
    }

    /// First text node at or below `id`, in document order.
    #[must_use]
    pub fn first_text(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id.0)?;
        if node.kind == NodeKind::Text {
            return Some(id);
        }
        node.children.iter().find_map(|child| self.first_text(*child))
    }

    fn child_of_kind(&self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.nodes
            .get(parent.0)?
            .children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child.0).is_some_and(|n| n.kind == kind))
    }

    /// Mirror a highlight change onto the rendered code cells.
    pub fn apply_highlight(&mut self, change: &HighlightChange) {
        if let Some(cell) = change.cleared.and_then(|line| self.code_cell(line))
            && let Some(node) = self.nodes.get_mut(cell.0)
        {
            node.classes.retain(|class| *class != self.highlight_class);
        }
        if let Some(cell) = change.applied.and_then(|line| self.code_cell(line))
            && let Some(node) = self.nodes.get_mut(cell.0)
            && !node.classes.contains(&self.highlight_class)
        {
            node.classes.push(self.highlight_class.clone());
        }
    }

    /// Lines whose code cell carries the highlight class.
    #[must_use]
    pub fn highlighted_lines(&self) -> Vec<usize> {
        (1..=self.rows.len())
            .filter(|line| {
                self.code_cell(*line)
                    .and_then(|cell| self.nodes.get(cell.0))
                    .is_some_and(|node| node.classes.contains(&self.highlight_class))
            })
            .collect()
    }

    /// Serialize the table to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.nodes.first() {
            out.push_str("<table><tbody>");
            for child in &root.children {
                self.write_node(*child, &mut out);
            }
            out.push_str("</tbody></table>");
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let (open, close) = match node.kind {
            NodeKind::Text => {
                markup::escape_into(&node.text, out);
                return;
            }
            NodeKind::Table => ("table", "</table>"),
            NodeKind::Row => ("tr", "</tr>"),
            NodeKind::LineNumberCell | NodeKind::CodeCell => ("td", "</td>"),
            NodeKind::Span => ("span", "</span>"),
        };
        out.push('<');
        out.push_str(open);
        if !node.classes.is_empty() {
            out.push_str(" class=\"");
            markup::escape_into(&node.classes.join(" "), out);
            out.push('"');
        }
        out.push('>');
        for child in &node.children {
            self.write_node(*child, out);
        }
        out.push_str(close);
    }
}

/// A node of a [`TableDom`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    dom: &'a TableDom,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> Option<NodeKind> {
        self.inner().map(|node| node.kind)
    }

    fn inner(&self) -> Option<&'a DomNode> {
        self.dom.nodes.get(self.id.0)
    }

    fn at(&self, id: NodeId) -> Self {
        Self { dom: self.dom, id }
    }

    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        if let Some(node) = self.inner() {
            out.push_str(&node.text);
            for child in &node.children {
                self.at(*child).push_text(out);
            }
        }
    }
}

impl ViewNode for NodeRef<'_> {
    fn parent(&self) -> Option<Self> {
        self.inner()?.parent.map(|id| self.at(id))
    }

    fn previous_sibling(&self) -> Option<Self> {
        let parent = self.dom.nodes.get(self.inner()?.parent?.0)?;
        let position = parent.children.iter().position(|child| *child == self.id)?;
        parent
            .children
            .get(position.checked_sub(1)?)
            .map(|id| self.at(*id))
    }

    fn role(&self) -> NodeRole {
        match self.kind() {
            Some(NodeKind::Row) => NodeRole::Row,
            Some(NodeKind::LineNumberCell) => NodeRole::LineNumberCell,
            Some(NodeKind::CodeCell) => NodeRole::CodeCell,
            Some(NodeKind::Table | NodeKind::Span | NodeKind::Text) | None => NodeRole::Other,
        }
    }

    fn char_len(&self) -> usize {
        self.text_content().chars().count()
    }

    fn row_line_number(&self) -> Option<usize> {
        let row = self.inner()?;
        let cell = row
            .children
            .iter()
            .map(|id| self.at(*id))
            .find(|child| child.kind() == Some(NodeKind::LineNumberCell))?;
        cell.text_content().trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup;
    use pretty_assertions::assert_eq;

    fn render(input: &str) -> TableDom {
        let nodes = markup::parse(input).unwrap_or_default();
        LineTable::build(&nodes).render("highlighted")
    }

    #[test]
    fn renders_one_row_per_line() {
        let dom = render("<span class=\"c\">a\nbb\n</span>");
        assert_eq!(
            dom.to_html(),
            concat!(
                "<table><tbody>",
                "<tr><td class=\"line-number\">1</td><td class=\"code-cell\"><span class=\"c\">a</span></td></tr>",
                "<tr><td class=\"line-number\">2</td><td class=\"code-cell\"><span class=\"c\">bb</span></td></tr>",
                "<tr><td class=\"line-number\">3</td><td class=\"code-cell\"><span class=\"c\"></span></td></tr>",
                "</tbody></table>"
            )
        );
    }

    #[test]
    fn each_token_is_one_child_of_the_code_cell() {
        let dom = render("<span class=\"k\">fn</span> <span class=\"s\">\"<span class=\"e\">\\n</span>\"</span>");
        let cell = dom.code_cell(1).map(|id| dom.node(id));
        let count = (0..4)
            .filter(|index| dom.token_node(TokenId { line: 1, index: *index }).is_some())
            .count();
        assert_eq!(count, 3);
        assert_eq!(
            cell.map(|c| c.text_content()),
            Some("fn \"\\n\"".to_string())
        );
    }

    #[test]
    fn atomic_tokens_keep_their_inner_structure() {
        let dom = render("<span class=\"s\">\"<span class=\"e\">&amp;</span>\"</span>");
        assert!(dom.to_html().contains(
            "<span class=\"s\">&quot;<span class=\"e\">&amp;</span>&quot;</span>"
        ));
    }

    #[test]
    fn text_is_escaped() {
        let dom = render("a &lt; b");
        assert!(dom.to_html().contains("a &lt; b"));
    }

    #[test]
    fn apply_highlight_moves_the_class() {
        let mut dom = render("a\nb\nc");
        dom.apply_highlight(&HighlightChange {
            cleared: None,
            applied: Some(2),
        });
        assert_eq!(dom.highlighted_lines(), vec![2]);
        dom.apply_highlight(&HighlightChange {
            cleared: Some(2),
            applied: Some(3),
        });
        assert_eq!(dom.highlighted_lines(), vec![3]);
        assert!(dom.to_html().contains("<td class=\"code-cell highlighted\">c</td>"));
    }

    #[test]
    fn row_reads_its_line_number_cell() {
        let dom = render("a\nb");
        let row = dom.row(2).map(|id| dom.node(id));
        assert_eq!(row.and_then(|r| r.row_line_number()), Some(2));
    }
}
