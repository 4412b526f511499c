use crate::error::ParseError;

use super::{Position, Selection};

peg::parser! {
    grammar fragment_parser() for str {
        pub(crate) rule selection() -> Selection
            = "L" start:position() end:("-L" p:position() { p })? ![_] {
                Selection { start, end }
            }

        rule position() -> Position
            = line:number() column:(":" c:number() { c })? {
                Position { line, column }
            }

        rule number() -> usize
            = n:$(['0'..='9']+) {? n.parse().or(Err("line or column number")) }
    }
}

/// Parse a line fragment, without its leading `#`.
pub(super) fn parse_selection(fragment: &str) -> Result<Selection, ParseError> {
    let selection =
        fragment_parser::selection(fragment).map_err(|error| ParseError::InvalidFragment {
            fragment: fragment.to_string(),
            reason: format!("expected {} at column {}", error.expected, error.location.column),
        })?;
    let positions = std::iter::once(&selection.start).chain(selection.end.as_ref());
    for position in positions {
        if position.line == 0 || position.column == Some(0) {
            return Err(ParseError::ZeroPosition(fragment.to_string()));
        }
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::line("L12", Selection::line(12))]
    #[case::point("L12:4", Selection::point(12, 4))]
    #[case::range(
        "L12:4-L12:9",
        Selection { start: Position { line: 12, column: Some(4) }, end: Some(Position { line: 12, column: Some(9) }) }
    )]
    #[case::line_range(
        "L3-L7",
        Selection { start: Position { line: 3, column: None }, end: Some(Position { line: 7, column: None }) }
    )]
    fn parses_fragments(#[case] input: &str, #[case] expected: Selection) -> Result<(), ParseError> {
        assert_eq!(parse_selection(input)?, expected);
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("L")]
    #[case("12")]
    #[case("l12")]
    #[case("L12:")]
    #[case("L12-")]
    #[case("L12:4-12:9")]
    #[case("L1x")]
    #[case("L99999999999999999999999")]
    fn rejects_malformed_fragments(#[case] input: &str) {
        assert!(matches!(
            parse_selection(input),
            Err(ParseError::InvalidFragment { .. })
        ));
    }

    #[rstest]
    #[case("L0")]
    #[case("L3:0")]
    #[case("L3-L0:2")]
    fn rejects_zero(#[case] input: &str) {
        assert_eq!(
            parse_selection(input),
            Err(ParseError::ZeroPosition(input.to_string()))
        );
    }
}
