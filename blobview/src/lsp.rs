//! Conversions between document positions and language server types.
//!
//! Documents are addressed with `git://<repo>?<rev>#<path>` URIs.

use lsp_types::{
    GotoDefinitionResponse, Hover, HoverContents, Location, MarkedString, Position,
    TextDocumentIdentifier, TextDocumentPositionParams, Url,
};

use crate::{
    error::ParseError,
    location::{DocumentPosition, Selection},
};

/// Convert usize to u32 for LSP types, saturating at `u32::MAX`.
fn to_lsp_u32(val: usize) -> u32 {
    val.try_into().unwrap_or(u32::MAX)
}

/// The `git://` URI of the blob a position is in.
///
/// # Errors
///
/// Returns [`ParseError::Href`] when the repository name is not a valid host
/// and path.
pub fn document_uri(position: &DocumentPosition) -> Result<Url, ParseError> {
    let mut uri = Url::parse(&format!("git://{}", position.repo))?;
    uri.set_query(position.rev.as_deref());
    uri.set_fragment(Some(&position.path));
    Ok(uri)
}

/// The blob a `git://` URI names.
#[must_use]
pub fn position_from_uri(uri: &Url) -> Option<DocumentPosition> {
    if uri.scheme() != "git" {
        return None;
    }
    let repo = format!("{}{}", uri.host_str()?, uri.path().trim_end_matches('/'));
    let path = urlencoding::decode(uri.fragment()?).ok()?.into_owned();
    if path.is_empty() {
        return None;
    }
    let rev = uri
        .query()
        .filter(|rev| !rev.is_empty())
        .and_then(|rev| urlencoding::decode(rev).ok())
        .map(|rev| rev.into_owned());
    Some(DocumentPosition::blob(repo, rev, path))
}

/// Request parameters for the first selected line and column.
///
/// 1-based lines and columns become 0-based; a missing column is the start
/// of the line.
///
/// # Errors
///
/// Returns a [`ParseError`] when the document URI cannot be built.
pub fn text_document_position(
    position: &DocumentPosition,
) -> Result<TextDocumentPositionParams, ParseError> {
    let start = position.selection.map(|s| s.start);
    Ok(TextDocumentPositionParams {
        text_document: TextDocumentIdentifier {
            uri: document_uri(position)?,
        },
        position: Position {
            line: to_lsp_u32(start.map_or(0, |p| p.line.saturating_sub(1))),
            character: to_lsp_u32(
                start
                    .and_then(|p| p.column)
                    .map_or(0, |column| column.saturating_sub(1)),
            ),
        },
    })
}

/// Plain text of a hover response; `None` when it has no content.
#[must_use]
pub fn hover_text(hover: &Hover) -> Option<String> {
    let parts: Vec<String> = match &hover.contents {
        HoverContents::Scalar(marked) => vec![marked_string(marked)],
        HoverContents::Array(marked) => marked.iter().map(marked_string).collect(),
        HoverContents::Markup(markup) => vec![markup.value.clone()],
    };
    let text = parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!text.is_empty()).then_some(text)
}

fn marked_string(marked: &MarkedString) -> String {
    match marked {
        MarkedString::String(text) => text.clone(),
        MarkedString::LanguageString(code) => {
            format!("```{}\n{}\n```", code.language, code.value)
        }
    }
}

/// Blob URL of a definition location.
#[must_use]
pub fn location_url(location: &Location) -> Option<String> {
    let range = location.range;
    let selection = Selection::from_zero_indexed(
        range.start.line,
        range.start.character,
        range.end.line,
        range.end.character,
    );
    let position = position_from_uri(&location.uri)?.with_selection(Some(selection));
    Some(position.encode())
}

/// Jump target of a definition response: its first location.
#[must_use]
pub fn jump_url(response: &GotoDefinitionResponse) -> Option<String> {
    match response {
        GotoDefinitionResponse::Scalar(location) => location_url(location),
        GotoDefinitionResponse::Array(locations) => locations.first().and_then(location_url),
        GotoDefinitionResponse::Link(links) => links.first().and_then(|link| {
            location_url(&Location {
                uri: link.target_uri.clone(),
                range: link.target_selection_range,
            })
        }),
    }
}
