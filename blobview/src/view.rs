//! A document view: one file's line table with its hover overlay, line
//! highlight and URL state.
//!
//! Every view owns its own state machines. Hosts translate browser events
//! into [`ViewInput`]s, feed them to [`DocumentView::handle`] in order and
//! apply the returned [`Effect`]s.

use crate::{
    Error,
    highlight::HighlightController,
    hoverifier::{AnchorSource, Effect, Hoverifier, Input, Target},
    location::{self, DocumentPosition, Selection},
    markup::Node,
    options::ViewOptions,
    table::{Hit, LineTable, TableDom},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewInput {
    /// Pointer moved over the code; `None` when not over a token.
    PointerMove(Option<Hit>),
    PointerLeave,
    /// Click inside the table. `line` is the row clicked, which is also set
    /// when the click missed every token (line numbers, trailing space).
    Click { hit: Option<Hit>, line: Option<usize> },
    /// The browser location changed (back/forward, edited fragment).
    LocationChanged(String),
    Hover(Input),
}

#[derive(Debug, Clone)]
pub struct DocumentView {
    /// The document, without selection.
    base: DocumentPosition,
    table: LineTable,
    hoverifier: Hoverifier,
    highlight: HighlightController,
    selection: Option<Selection>,
    options: ViewOptions,
}

impl DocumentView {
    /// Build the view of a blob from its highlighted markup.
    ///
    /// When `source` is given the line table is checked against it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildInconsistency`] when the table does not
    /// reproduce `source` and the options are strict.
    #[tracing::instrument(level = "debug", skip(nodes, source, options), fields(document = %base))]
    pub fn new(
        base: DocumentPosition,
        nodes: &[Node],
        source: Option<&str>,
        options: ViewOptions,
    ) -> Result<Self, Error> {
        let table = LineTable::build(nodes);
        if let Some(source) = source
            && let Err(error) = table.verify(source)
            && options.strict
        {
            return Err(error);
        }
        Ok(Self {
            base: base.with_selection(None),
            table,
            hoverifier: Hoverifier::new(options.debounce),
            highlight: HighlightController::new(),
            selection: None,
            options,
        })
    }

    #[must_use]
    pub fn base(&self) -> &DocumentPosition {
        &self.base
    }

    #[must_use]
    pub fn table(&self) -> &LineTable {
        &self.table
    }

    #[must_use]
    pub fn hoverifier(&self) -> &Hoverifier {
        &self.hoverifier
    }

    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    #[must_use]
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Render the table, with the current highlight.
    #[must_use]
    pub fn render(&self) -> TableDom {
        self.table.render(&self.options.highlight_class)
    }

    /// Replace the file content, keeping the selection when its line still
    /// exists.
    pub fn rebuild(&mut self, nodes: &[Node]) {
        self.table = LineTable::build(nodes);
        self.highlight.rebuilt(&mut self.table);
        if self.highlight.current().is_none() {
            self.selection = None;
        }
    }

    /// Apply the selection of the page's initial URL.
    pub fn restore(&mut self, href: &str) -> Vec<Effect> {
        match parse_location(href) {
            Ok(position) if position.same_document(&self.base) => {
                self.select(position.selection, true)
            }
            Ok(position) => {
                tracing::debug!(%position, "location is another document");
                Vec::new()
            }
            Err(error) => {
                tracing::warn!(%error, href, "ignoring malformed URL");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn handle(&mut self, input: ViewInput, anchors: &impl AnchorSource) -> Vec<Effect> {
        match input {
            ViewInput::PointerMove(hit) => {
                let target = hit.map(|hit| self.target(hit));
                self.hover(Input::PointerMove(target), anchors)
            }
            ViewInput::PointerLeave => self.hover(Input::PointerLeave, anchors),
            ViewInput::Click { hit, line } => self.click(hit, line, anchors),
            ViewInput::LocationChanged(href) => self.location_changed(&href),
            ViewInput::Hover(input) => self.hover(input, anchors),
        }
    }

    fn target(&self, hit: Hit) -> Target {
        Target {
            position: self.base.clone().with_line_column(hit.line, hit.column),
            token: hit.token,
        }
    }

    fn hover(&mut self, input: Input, anchors: &impl AnchorSource) -> Vec<Effect> {
        let effects = self.hoverifier.handle(input, anchors);
        let mut out = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Navigate(url) => out.extend(self.navigate(url)),
                effect @ (Effect::ScheduleDebounce { .. }
                | Effect::FetchHover(_)
                | Effect::FetchJump(_)
                | Effect::Render(_)
                | Effect::Highlight(_)
                | Effect::ScrollToLine(_)
                | Effect::ReplaceUrl(_)
                | Effect::PushUrl(_)
                | Effect::SelectionChanged(_)) => out.push(effect),
            }
        }
        out
    }

    /// A definition in this same blob is shown in place; anything else
    /// leaves the page.
    fn navigate(&mut self, url: String) -> Vec<Effect> {
        match parse_location(&url) {
            Ok(position) if position.same_document(&self.base) => {
                tracing::debug!(%position, "definition is in this document");
                let mut effects = vec![Effect::PushUrl(position.encode())];
                effects.extend(self.select(position.selection, true));
                effects
            }
            Ok(_) | Err(_) => vec![Effect::Navigate(url)],
        }
    }

    fn click(
        &mut self,
        hit: Option<Hit>,
        line: Option<usize>,
        anchors: &impl AnchorSource,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(line) = hit.map(|hit| hit.line).or(line) {
            let selection = Some(Selection::line(line));
            if selection != self.selection {
                let position = self.base.clone().with_selection(selection);
                effects.extend(self.select(selection, false));
                effects.push(Effect::ReplaceUrl(position.encode()));
            }
        }
        let target = hit.map(|hit| self.target(hit));
        effects.extend(self.hover(Input::Click(target), anchors));
        effects
    }

    fn location_changed(&mut self, href: &str) -> Vec<Effect> {
        match parse_location(href) {
            Ok(position) if position.same_document(&self.base) => {
                if position.line() == self.selection.map(|s| s.start.line) {
                    tracing::trace!(href, "selected line unchanged");
                    self.selection = position.selection;
                    return Vec::new();
                }
                self.select(position.selection, true)
            }
            Ok(position) => {
                tracing::debug!(%position, "location left this document");
                Vec::new()
            }
            Err(error) => {
                tracing::warn!(%error, href, "ignoring malformed URL");
                self.select(None, false)
            }
        }
    }

    /// Highlight the selection's first line and announce it.
    fn select(&mut self, selection: Option<Selection>, scroll: bool) -> Vec<Effect> {
        let line = selection.map(|s| s.start.line);
        let mut effects = Vec::new();
        if let Some(change) = self.highlight.set_highlighted_line(&mut self.table, line) {
            effects.push(Effect::Highlight(change));
        }
        if line.is_some() && self.highlight.current() != line {
            // Out of range; the highlight was left untouched.
            return effects;
        }
        if selection == self.selection && effects.is_empty() {
            return effects;
        }
        self.selection = selection;
        if let Some(line) = line
            && scroll
            && self.options.scroll_on_select
        {
            effects.push(Effect::ScrollToLine(line));
        }
        effects.push(Effect::SelectionChanged(
            self.base.clone().with_selection(selection),
        ));
        effects
    }
}

fn parse_location(href: &str) -> Result<DocumentPosition, crate::error::ParseError> {
    if href.contains("://") {
        location::decode_href(href)
    } else {
        location::decode(href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{highlight::HighlightChange, hoverifier::NoLayout, markup, table::TokenId};
    use pretty_assertions::assert_eq;

    fn base() -> DocumentPosition {
        DocumentPosition::blob("github.com/a/b", Some("main".to_string()), "lib.go")
    }

    fn view() -> DocumentView {
        let nodes = markup::parse("package b\n\nfunc <span class=\"t\">F</span>() {}\n")
            .unwrap_or_default();
        DocumentView::new(base(), &nodes, None, ViewOptions::default())
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn url(fragment: &str) -> String {
        format!("/github.com/a/b@main/-/blob/lib.go{fragment}")
    }

    #[test]
    fn strict_view_rejects_mismatched_source() {
        let nodes = [Node::text("a\nb")];
        let strict = DocumentView::new(base(), &nodes, Some("a\nc"), ViewOptions::default());
        assert!(matches!(strict, Err(Error::BuildInconsistency(_))));
        let lenient = DocumentView::new(
            base(),
            &nodes,
            Some("a\nc"),
            ViewOptions::builder().lenient().build(),
        );
        assert!(lenient.is_ok());
    }

    #[test]
    fn restore_highlights_scrolls_and_announces() {
        let mut view = view();
        let effects = view.restore(&format!("https://example.com{}", url("#L3:6")));
        assert_eq!(
            effects,
            vec![
                Effect::Highlight(HighlightChange {
                    cleared: None,
                    applied: Some(3)
                }),
                Effect::ScrollToLine(3),
                Effect::SelectionChanged(base().with_line_column(3, 6)),
            ]
        );
        assert_eq!(view.table().highlighted_lines(), vec![3]);
    }

    #[test]
    fn click_selects_the_line_with_history_replacement() {
        let mut view = view();
        let effects = view.handle(
            ViewInput::Click {
                hit: None,
                line: Some(2),
            },
            &NoLayout,
        );
        assert_eq!(
            effects,
            vec![
                Effect::Highlight(HighlightChange {
                    cleared: None,
                    applied: Some(2)
                }),
                Effect::SelectionChanged(base().with_line(2)),
                Effect::ReplaceUrl(url("#L2")),
            ]
        );
    }

    #[test]
    fn location_change_to_the_same_line_is_ignored() {
        let mut view = view();
        view.handle(
            ViewInput::Click {
                hit: None,
                line: Some(3),
            },
            &NoLayout,
        );
        let effects = view.handle(ViewInput::LocationChanged(url("#L3")), &NoLayout);
        assert!(effects.is_empty());
        let effects = view.handle(ViewInput::LocationChanged(url("#L1")), &NoLayout);
        assert_eq!(effects.len(), 3);
        assert_eq!(view.table().highlighted_lines(), vec![1]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn malformed_location_clears_the_selection() {
        let mut view = view();
        view.restore(&url("#L2"));
        let effects = view.handle(ViewInput::LocationChanged(url("#L2:x")), &NoLayout);
        assert_eq!(
            effects,
            vec![
                Effect::Highlight(HighlightChange {
                    cleared: Some(2),
                    applied: None
                }),
                Effect::SelectionChanged(base()),
            ]
        );
        assert!(view.table().highlighted_lines().is_empty());
        assert!(logs_contain("ignoring malformed URL"));
    }

    #[test]
    fn out_of_range_selection_changes_nothing() {
        let mut view = view();
        assert!(view.restore(&url("#L40")).is_empty());
        assert_eq!(view.selection(), None);
    }

    #[test]
    fn other_document_locations_are_ignored() {
        let mut view = view();
        let effects = view.handle(
            ViewInput::LocationChanged("/github.com/a/b@main/-/blob/other.go#L1".to_string()),
            &NoLayout,
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn click_on_a_token_selects_and_pins() {
        let mut view = view();
        let hit = Hit {
            line: 3,
            column: 6,
            token: TokenId { line: 3, index: 1 },
        };
        let effects = view.handle(
            ViewInput::Click {
                hit: Some(hit),
                line: Some(3),
            },
            &NoLayout,
        );
        assert!(effects.contains(&Effect::ReplaceUrl(url("#L3"))));
        assert!(effects.iter().any(|e| matches!(e, Effect::FetchHover(r) if r.position == base().with_line_column(3, 6))));
        assert!(view.hoverifier().is_pinned());
    }

    #[test]
    fn outside_definitions_navigate_away() {
        let mut view = view();
        let effects = view.navigate("/github.com/x/y/-/blob/z.go#L1".to_string());
        assert_eq!(
            effects,
            vec![Effect::Navigate("/github.com/x/y/-/blob/z.go#L1".to_string())]
        );
    }

    #[test]
    fn rebuild_drops_a_vanished_selection() {
        let mut view = view();
        view.restore(&url("#L3"));
        view.rebuild(&[Node::text("one line")]);
        assert_eq!(view.selection(), None);
        assert!(view.table().highlighted_lines().is_empty());
    }
}
