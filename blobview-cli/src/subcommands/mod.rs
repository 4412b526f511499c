pub(crate) mod hover;
pub(crate) mod resolve;
pub(crate) mod table;
pub(crate) mod url;

use std::{fs, path::Path};

use anyhow::Context;
use blobview::{LineTable, markup};

/// Read highlighted markup and build its line table, checked against the
/// plain source text when one is given.
pub(crate) fn load_table(file: &Path, source: Option<&Path>) -> anyhow::Result<LineTable> {
    let input = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let nodes = markup::parse(&input)?;
    let table = match source {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            LineTable::build_checked(&nodes, &text)?
        }
        None => LineTable::build(&nodes),
    };
    tracing::debug!(lines = table.len(), file = %file.display(), "built line table");
    Ok(table)
}
