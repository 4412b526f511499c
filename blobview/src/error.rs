use std::fmt;

use serde::Serialize;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Markup parsing error: {0}")]
    Markup(#[from] peg::error::ParseError<peg::str::LineCol>),

    #[error("line table does not reproduce its source: {0}")]
    BuildInconsistency(Mismatch),

    #[error("URL error: {0}")]
    Url(#[from] ParseError),
}

impl Error {
    /// Get advice for this error if available.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::Markup(..) => Some(
                "Highlighted markup must be balanced: every `<span class=\"...\">` needs a matching `</span>`",
            ),
            Self::BuildInconsistency(..) => Some(
                "The highlighter must not add, drop or reorder characters of the file it tokenizes",
            ),
            Self::Url(error) => error.advice(),
        }
    }

    /// Byte offset into the markup where parsing failed, if this is a markup error.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Markup(error) => Some(error.location.offset),
            Self::BuildInconsistency(..) | Self::Url(..) => None,
        }
    }
}

/// Where a reconstructed line table first diverges from the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub expected_len: usize,
    pub actual_len: usize,
    /// 1-based line of the first difference.
    pub line: usize,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Mismatch {
            expected_len,
            actual_len,
            line,
        } = self;
        write!(
            f,
            "expected {expected_len} bytes, got {actual_len} bytes, first difference on line {line}"
        )
    }
}

/// Malformed URL path or fragment.
///
/// Decoding never guesses: anything that does not match the scheme exactly is
/// reported here and callers fall back to "no selection".
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("URL path must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("URL path has no repository")]
    EmptyRepository,

    #[error("revision after '@' is empty")]
    EmptyRevision,

    #[error("unsupported route: {0}")]
    UnsupportedRoute(String),

    #[error("blob URL has no file path")]
    EmptyFilePath,

    #[error("invalid line fragment '{fragment}': {reason}")]
    InvalidFragment { fragment: String, reason: String },

    #[error("line and column numbers start at 1: {0}")]
    ZeroPosition(String),

    #[error("tree URLs cannot carry a line selection")]
    SelectionOnTree,

    #[error("invalid percent-encoding in '{0}'")]
    InvalidEscape(String),

    #[error("invalid URL: {0}")]
    Href(#[from] ::url::ParseError),
}

impl ParseError {
    /// Get advice for this error if available.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFragment { .. } | Self::ZeroPosition(..) => Some(
                "Line fragments look like #L12, #L12:4 or #L12:4-L14:2; lines and columns are 1-based",
            ),
            Self::UnsupportedRoute(..) => {
                Some("Only /<repo>[@<rev>]/-/blob/<path> and /-/tree/<path> address documents")
            }
            Self::MissingLeadingSlash(..)
            | Self::EmptyRepository
            | Self::EmptyRevision
            | Self::EmptyFilePath
            | Self::SelectionOnTree
            | Self::InvalidEscape(..)
            | Self::Href(..) => None,
        }
    }
}

/// A hover or jump-target lookup failed.
///
/// Carried inside the overlay state as a user-visible message; lookups are
/// never retried automatically.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct LookupError {
    message: String,
}

impl LookupError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_display_names_the_line() {
        let error = Error::BuildInconsistency(Mismatch {
            expected_len: 10,
            actual_len: 9,
            line: 2,
        });
        assert_eq!(
            error.to_string(),
            "line table does not reproduce its source: expected 10 bytes, got 9 bytes, first difference on line 2"
        );
        assert!(error.advice().is_some());
        assert_eq!(error.offset(), None);
    }

    #[test]
    fn url_errors_forward_advice() {
        let error = Error::from(ParseError::ZeroPosition("L0".to_string()));
        assert!(error.advice().is_some_and(|a| a.contains("1-based")));
    }
}
