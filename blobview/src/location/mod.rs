//! Document positions and their URL form.
//!
//! Paths look like `/<repo>[@<rev>]/-/<kind>/<path>` and the selected lines
//! travel in the fragment: `#L<line>[:<col>][-L<line>[:<col>]]`. A bare
//! `/<repo>[@<rev>]` is the root tree of the repository.

mod grammar;

use std::{borrow::Cow, fmt};

use serde::Serialize;

use crate::error::ParseError;

/// Kind of object a URL addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
}

impl ObjectKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }
}

/// A 1-based line and optional 1-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: Option<usize>,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.line)?;
        if let Some(column) = self.column {
            write!(f, ":{column}")?;
        }
        Ok(())
    }
}

/// A selected point or range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    pub start: Position,
    pub end: Option<Position>,
}

impl Selection {
    #[must_use]
    pub fn line(line: usize) -> Self {
        Self {
            start: Position { line, column: None },
            end: None,
        }
    }

    #[must_use]
    pub fn point(line: usize, column: usize) -> Self {
        Self {
            start: Position {
                line,
                column: Some(column),
            },
            end: None,
        }
    }

    /// Build a selection from a zero-indexed range, as language servers
    /// report them. A zero-width range collapses to a point.
    #[must_use]
    pub fn from_zero_indexed(
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        let one_based = |line: u32, column: u32| Position {
            line: line as usize + 1,
            column: Some(column as usize + 1),
        };
        let start = one_based(start_line, start_column);
        let end = one_based(end_line, end_column);
        Self {
            start,
            end: (end != start).then_some(end),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        if let Some(end) = &self.end {
            write!(f, "-{end}")?;
        }
        Ok(())
    }
}

/// Repository, revision, object and optional selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentPosition {
    pub repo: String,
    /// `None` means the default branch.
    pub rev: Option<String>,
    pub kind: ObjectKind,
    /// Path inside the repository, without leading or trailing slashes.
    pub path: String,
    pub selection: Option<Selection>,
}

impl DocumentPosition {
    #[must_use]
    pub fn blob(repo: impl Into<String>, rev: Option<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            rev,
            kind: ObjectKind::Blob,
            path: path.into(),
            selection: None,
        }
    }

    #[must_use]
    pub fn tree(repo: impl Into<String>, rev: Option<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            rev,
            kind: ObjectKind::Tree,
            path: path.into(),
            selection: None,
        }
    }

    #[must_use]
    pub fn with_line(self, line: usize) -> Self {
        self.with_selection(Some(Selection::line(line)))
    }

    #[must_use]
    pub fn with_line_column(self, line: usize, column: usize) -> Self {
        self.with_selection(Some(Selection::point(line, column)))
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Option<Selection>) -> Self {
        self.selection = selection;
        self
    }

    /// First selected line, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        self.selection.map(|s| s.start.line)
    }

    /// Whether both positions address the same object, ignoring the selection.
    #[must_use]
    pub fn same_document(&self, other: &Self) -> bool {
        self.repo == other.repo
            && self.rev == other.rev
            && self.kind == other.kind
            && self.path == other.path
    }

    /// Path and fragment for this position.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }
}

impl fmt::Display for DocumentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

/// Serialize a position to a URL path and fragment.
///
/// Tree positions never carry a fragment; a selection on a tree is dropped.
#[must_use]
pub fn encode(position: &DocumentPosition) -> String {
    let mut out = String::from("/");
    out.push_str(&escape_path(&position.repo));
    if let Some(rev) = &position.rev {
        out.push('@');
        out.push_str(&escape_rev(rev));
    }
    if position.kind == ObjectKind::Blob || !position.path.is_empty() {
        out.push_str("/-/");
        out.push_str(position.kind.as_str());
        out.push('/');
        out.push_str(&escape_path(&position.path));
    }
    if position.kind == ObjectKind::Blob
        && let Some(selection) = &position.selection
    {
        out.push('#');
        out.push_str(&selection.to_string());
    }
    out
}

/// Parse a URL path with an optional query and fragment.
///
/// # Errors
///
/// Returns a [`ParseError`] for anything outside the path and fragment
/// scheme. An empty fragment means no selection.
#[tracing::instrument(level = "trace")]
pub fn decode(input: &str) -> Result<DocumentPosition, ParseError> {
    let (path, fragment) = match input.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (input, None),
    };
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| ParseError::MissingLeadingSlash(path.to_string()))?;
    let (repo_rev, route) = match rest.split_once("/-/") {
        Some((repo_rev, route)) => (repo_rev, Some(route)),
        None => (rest.trim_end_matches('/'), None),
    };
    let (repo, rev) = parse_repo_rev(repo_rev)?;
    let (kind, file_path) = match route {
        None | Some("tree" | "tree/") => (ObjectKind::Tree, String::new()),
        Some(route) => {
            if let Some(file_path) = route.strip_prefix("blob/") {
                (ObjectKind::Blob, unescape_path(file_path)?)
            } else if let Some(dir) = route.strip_prefix("tree/") {
                (ObjectKind::Tree, unescape_path(dir.trim_end_matches('/'))?)
            } else {
                return Err(ParseError::UnsupportedRoute(route.to_string()));
            }
        }
    };
    if kind == ObjectKind::Blob && file_path.is_empty() {
        return Err(ParseError::EmptyFilePath);
    }
    let selection = match fragment {
        None | Some("") => None,
        Some(fragment) => Some(grammar::parse_selection(fragment)?),
    };
    if kind == ObjectKind::Tree && selection.is_some() {
        return Err(ParseError::SelectionOnTree);
    }
    Ok(DocumentPosition {
        repo,
        rev,
        kind,
        path: file_path,
        selection,
    })
}

/// Parse an absolute URL, as reported by the browser on navigation.
///
/// # Errors
///
/// Returns [`ParseError::Href`] when `href` is not a URL, otherwise whatever
/// [`decode`] reports for its path and fragment.
pub fn decode_href(href: &str) -> Result<DocumentPosition, ParseError> {
    let url = ::url::Url::parse(href)?;
    let mut input = url.path().to_string();
    if let Some(fragment) = url.fragment() {
        input.push('#');
        input.push_str(fragment);
    }
    decode(&input)
}

/// Parse only a fragment, with or without its leading `#`.
///
/// # Errors
///
/// Returns a [`ParseError`] when the fragment is not a line selection.
pub fn decode_fragment(fragment: &str) -> Result<Option<Selection>, ParseError> {
    match fragment.strip_prefix('#').unwrap_or(fragment) {
        "" => Ok(None),
        fragment => grammar::parse_selection(fragment).map(Some),
    }
}

/// Shorten a full 40-character commit id to 7 characters for display.
///
/// Anything else (branch names, short ids) is returned unchanged.
#[must_use]
pub fn abbreviate_oid(rev: &str) -> &str {
    if rev.len() == 40 && rev.bytes().all(|b| b.is_ascii_hexdigit()) {
        rev.get(..7).unwrap_or(rev)
    } else {
        rev
    }
}

fn parse_repo_rev(repo_rev: &str) -> Result<(String, Option<String>), ParseError> {
    let (repo, rev) = match repo_rev.split_once('@') {
        Some((repo, "")) if !repo.is_empty() => return Err(ParseError::EmptyRevision),
        Some((repo, rev)) => (repo, Some(unescape(rev)?)),
        None => (repo_rev, None),
    };
    if repo.is_empty() {
        return Err(ParseError::EmptyRepository);
    }
    Ok((unescape_path(repo)?, rev))
}

/// Percent-escape each segment of a slash-separated path.
///
/// A segment that is exactly `-` becomes `%2D`: unescaped it would read as
/// the `/-/` route separator.
fn escape_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment {
            "-" => Cow::Borrowed("%2D"),
            segment => urlencoding::encode(segment),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-escape a revision, keeping slashes readable (`feature/x`).
fn escape_rev(rev: &str) -> String {
    escape_path(rev)
}

fn unescape(segment: &str) -> Result<String, ParseError> {
    urlencoding::decode(segment)
        .map(Cow::into_owned)
        .map_err(|_| ParseError::InvalidEscape(segment.to_string()))
}

fn unescape_path(path: &str) -> Result<String, ParseError> {
    path.split('/')
        .map(unescape)
        .collect::<Result<Vec<_>, _>>()
        .map(|segments| segments.join("/"))
}
