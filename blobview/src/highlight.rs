//! The selected-line highlight.

use serde::Serialize;

use crate::table::LineTable;

/// Lines whose highlight state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightChange {
    pub cleared: Option<usize>,
    pub applied: Option<usize>,
}

/// Sole writer of the highlighted flag of a view's lines.
///
/// Keeps at most one line highlighted.
#[derive(Debug, Clone, Default)]
pub struct HighlightController {
    current: Option<usize>,
}

impl HighlightController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Move the highlight to `line`, or remove it with `None`.
    ///
    /// Returns the change to mirror onto the rendered table, or `None` when
    /// nothing changed. A line outside the table is logged and ignored.
    #[tracing::instrument(level = "trace", skip(self, table))]
    pub fn set_highlighted_line(
        &mut self,
        table: &mut LineTable,
        line: Option<usize>,
    ) -> Option<HighlightChange> {
        if line == self.current {
            return None;
        }
        if let Some(line) = line
            && table.line(line).is_none()
        {
            tracing::warn!(line, lines = table.len(), "cannot highlight a line outside the table");
            return None;
        }
        let cleared = self.current.take();
        if let Some(previous) = cleared.and_then(|n| table.line_mut(n)) {
            previous.set_highlighted(false);
        }
        if let Some(next) = line.and_then(|n| table.line_mut(n)) {
            next.set_highlighted(true);
        }
        self.current = line;
        Some(HighlightChange {
            cleared,
            applied: line,
        })
    }

    /// Re-apply the current highlight to a freshly built table.
    ///
    /// Lines are rebuilt whenever the file content changes; the highlight
    /// survives only if its line still exists.
    pub fn rebuilt(&mut self, table: &mut LineTable) {
        match self.current.and_then(|n| table.line_mut(n)) {
            Some(line) => line.set_highlighted(true),
            None => self.current = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Node;
    use pretty_assertions::assert_eq;

    fn table() -> LineTable {
        LineTable::build(&[Node::text("a\nb\nc\nd")])
    }

    #[test]
    fn moves_the_highlight() {
        let mut table = table();
        let mut controller = HighlightController::new();
        assert_eq!(
            controller.set_highlighted_line(&mut table, Some(2)),
            Some(HighlightChange {
                cleared: None,
                applied: Some(2)
            })
        );
        assert_eq!(
            controller.set_highlighted_line(&mut table, Some(4)),
            Some(HighlightChange {
                cleared: Some(2),
                applied: Some(4)
            })
        );
        assert_eq!(table.highlighted_lines(), vec![4]);
    }

    #[test]
    fn is_idempotent() {
        let mut table = table();
        let mut controller = HighlightController::new();
        controller.set_highlighted_line(&mut table, Some(3));
        assert_eq!(controller.set_highlighted_line(&mut table, Some(3)), None);
        assert_eq!(table.highlighted_lines(), vec![3]);
    }

    #[test]
    fn clearing_leaves_no_line_highlighted() {
        let mut table = table();
        let mut controller = HighlightController::new();
        controller.set_highlighted_line(&mut table, Some(1));
        controller.set_highlighted_line(&mut table, None);
        assert!(table.highlighted_lines().is_empty());
        assert_eq!(controller.current(), None);
    }

    #[test]
    #[tracing_test::traced_test]
    fn out_of_range_line_is_ignored() {
        let mut table = table();
        let mut controller = HighlightController::new();
        controller.set_highlighted_line(&mut table, Some(2));
        assert_eq!(controller.set_highlighted_line(&mut table, Some(9)), None);
        assert_eq!(table.highlighted_lines(), vec![2]);
        assert!(logs_contain("outside the table"));
    }

    #[test]
    fn rebuilt_table_keeps_the_highlight_when_possible() {
        let mut table = table();
        let mut controller = HighlightController::new();
        controller.set_highlighted_line(&mut table, Some(3));
        let mut shorter = LineTable::build(&[Node::text("x\ny\nz")]);
        controller.rebuilt(&mut shorter);
        assert_eq!(shorter.highlighted_lines(), vec![3]);
        let mut tiny = LineTable::build(&[Node::text("x")]);
        controller.rebuilt(&mut tiny);
        assert!(tiny.highlighted_lines().is_empty());
        assert_eq!(controller.current(), None);
    }
}
