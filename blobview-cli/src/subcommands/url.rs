use blobview::{DocumentPosition, Position, Selection, location};
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a path, fragment or full URL into its parts
    Decode {
        url: String,
    },

    /// Encode a position as a URL path and fragment
    Encode {
        #[arg(long)]
        repo: String,

        #[arg(long)]
        rev: Option<String>,

        #[arg(long, default_value = "")]
        path: String,

        /// Address a directory instead of a file
        #[arg(long, conflicts_with_all = ["line", "column", "end_line", "end_column"])]
        tree: bool,

        #[arg(long)]
        line: Option<usize>,

        #[arg(long, requires = "line")]
        column: Option<usize>,

        #[arg(long, requires = "line")]
        end_line: Option<usize>,

        #[arg(long, requires = "end_line")]
        end_column: Option<usize>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum Decoded {
    Document {
        #[serde(flatten)]
        position: DocumentPosition,
        #[serde(skip_serializing_if = "Option::is_none")]
        short_rev: Option<String>,
    },
    /// A bare `#L..` fragment.
    Fragment { selection: Option<Selection> },
}

fn decode(url: &str) -> anyhow::Result<Decoded> {
    if url.starts_with('#') {
        return Ok(Decoded::Fragment {
            selection: location::decode_fragment(url)?,
        });
    }
    let position = if url.contains("://") {
        location::decode_href(url)?
    } else {
        location::decode(url)?
    };
    let short_rev = position
        .rev
        .as_deref()
        .map(|rev| location::abbreviate_oid(rev).to_string());
    Ok(Decoded::Document {
        position,
        short_rev,
    })
}

fn selection(
    line: Option<usize>,
    column: Option<usize>,
    end_line: Option<usize>,
    end_column: Option<usize>,
) -> anyhow::Result<Option<Selection>> {
    let Some(line) = line else {
        return Ok(None);
    };
    if line == 0 || column == Some(0) || end_line == Some(0) || end_column == Some(0) {
        anyhow::bail!("lines and columns start at 1");
    }
    let end = end_line.map(|line| Position {
        line,
        column: end_column,
    });
    Ok(Some(Selection {
        start: Position { line, column },
        end,
    }))
}

pub fn run(command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Decode { url } => {
            println!("{}", serde_json::to_string_pretty(&decode(url)?)?);
        }
        Command::Encode {
            repo,
            rev,
            path,
            tree,
            line,
            column,
            end_line,
            end_column,
        } => {
            let position = if *tree {
                DocumentPosition::tree(repo.clone(), rev.clone(), path.clone())
            } else {
                if path.is_empty() {
                    anyhow::bail!("a blob URL needs --path");
                }
                DocumentPosition::blob(repo.clone(), rev.clone(), path.clone())
                    .with_selection(selection(*line, *column, *end_line, *end_column)?)
            };
            println!("{}", position.encode());
        }
    }
    Ok(())
}
