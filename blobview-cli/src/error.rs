use std::{error::Error, path::PathBuf, process::exit};

use blobview::{Error as ViewError, ParseError};
use miette::{Diagnostic, NamedSource, SourceSpan};

/// Rich error wrapper for miette display with source code
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("{message}")]
#[diagnostic()]
pub(crate) struct RichError {
    message: String,

    #[help]
    advice: String,

    #[source_code]
    src: NamedSource<String>,

    #[label("{position_advice}")]
    span: SourceSpan,
    position_advice: String,
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

pub(crate) fn display(e: &(dyn Error + 'static), source_context: Option<&(PathBuf, String)>) {
    let mut current: Option<&(dyn Error + 'static)> = Some(e);
    while let Some(error) = current {
        if let Some(view_error) = error.downcast_ref::<ViewError>() {
            if let (Some((path, source)), Some(offset)) = (source_context, view_error.offset()) {
                let (line, column) = line_column(source, offset);
                let rich_error = RichError {
                    message: view_error.to_string(),
                    advice: view_error.advice().unwrap_or_default().to_string(),
                    src: NamedSource::new(path.display().to_string(), source.clone()),
                    span: SourceSpan::new(offset.into(), 1),
                    position_advice: format!("error occurred here (line {line}, column {column})"),
                };
                eprint!("{:?}", miette::Report::new(rich_error));
                exit(1);
            }
            eprintln!("  × {view_error}");
            if let Some(advice) = view_error.advice() {
                eprintln!("  help: {advice}");
            }
            exit(1);
        }
        if let Some(parse_error) = error.downcast_ref::<ParseError>() {
            eprintln!("  × {parse_error}");
            if let Some(advice) = parse_error.advice() {
                eprintln!("  help: {advice}");
            }
            exit(1);
        }
        current = error.source();
    }
    eprintln!("Error: {e}");
    exit(1);
}
