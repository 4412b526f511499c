use std::path::PathBuf;

use blobview::{LineTable, location};
use clap::Args as ClapArgs;
use crossterm::style::Stylize;
use serde::Serialize;

/// Show the token covering a line and column
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Highlighted markup
    pub file: PathBuf,

    /// Plain source text the markup must reproduce
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// 1-based line
    #[arg(long)]
    pub line: usize,

    /// 1-based character column
    #[arg(long, default_value_t = 1)]
    pub column: usize,

    /// Blob URL of the file, to print a link to the position
    #[arg(long)]
    pub url: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct Resolved<'a> {
    line: usize,
    column: usize,
    index: usize,
    text: &'a str,
    classes: &'a [String],
    start_column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

fn resolve<'a>(
    table: &'a LineTable,
    line: usize,
    column: usize,
    base: Option<&str>,
) -> anyhow::Result<Resolved<'a>> {
    let Some((id, token)) = table.token_at(line, column) else {
        anyhow::bail!("no token at line {line}, column {column}");
    };
    let url = base
        .map(location::decode)
        .transpose()?
        .map(|base| base.with_line_column(line, column).encode());
    Ok(Resolved {
        line,
        column,
        index: id.index,
        text: token.text(),
        classes: token.classes(),
        start_column: token.start_column(),
        url,
    })
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let table = super::load_table(&args.file, args.source.as_deref())?;
    let resolved = resolve(&table, args.line, args.column, args.url.as_deref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }
    println!(
        "{} {}",
        format!("L{}:{}", resolved.line, resolved.column).bold(),
        format!("{:?}", resolved.text).green()
    );
    println!("  token:   #{} from column {}", resolved.index, resolved.start_column);
    if resolved.classes.is_empty() {
        println!("  classes: {}", "(none)".dark_grey());
    } else {
        println!("  classes: {}", resolved.classes.join(" ").cyan());
    }
    if let Some(url) = &resolved.url {
        println!("  url:     {url}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobview::markup;
    use pretty_assertions::assert_eq;

    fn table() -> anyhow::Result<LineTable> {
        let nodes = markup::parse("package mux\n\n<span class=\"kw\">func</span> NewRouter()")?;
        Ok(LineTable::build(&nodes))
    }

    #[test]
    fn column_inside_a_token() -> anyhow::Result<()> {
        let table = table()?;
        let resolved = resolve(&table, 3, 3, Some("/github.com/gorilla/mux/-/blob/mux.go"))?;
        assert_eq!(resolved.text, "func");
        assert_eq!(resolved.classes, ["kw".to_string()]);
        assert_eq!(resolved.start_column, 1);
        assert_eq!(
            resolved.url.as_deref(),
            Some("/github.com/gorilla/mux/-/blob/mux.go#L3:3")
        );
        Ok(())
    }

    #[test]
    fn past_the_end_of_a_line_is_an_error() -> anyhow::Result<()> {
        let table = table()?;
        assert!(resolve(&table, 1, 40, None).is_err());
        assert!(resolve(&table, 9, 1, None).is_err());
        Ok(())
    }
}
