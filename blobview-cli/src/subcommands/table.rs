use std::{
    hash::{Hash, Hasher},
    io::{self, Write},
    path::PathBuf,
};

use blobview::{HighlightController, Line, Token};
use clap::{Args as ClapArgs, ValueEnum};
use crossterm::style::{Color, Stylize};
use rustc_hash::FxHasher;

#[derive(Debug, ValueEnum, Clone, Copy, Default)]
pub enum Format {
    /// Colored rows with line numbers
    #[default]
    Text,
    /// The line table as JSON
    Json,
    /// The rendered table markup
    Html,
}

/// Build the line table of a highlighted file
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Highlighted markup (`<span class="...">` elements and text)
    pub file: PathBuf,

    /// Plain source text the markup must reproduce
    #[arg(long)]
    pub source: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Line to highlight
    #[arg(long)]
    pub highlight: Option<usize>,

    /// Class added to the highlighted line's code cell
    #[arg(long, default_value = "highlighted")]
    pub highlight_class: String,
}

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

/// Stable color for a token's innermost class.
fn class_color(class: &str) -> Color {
    let mut hasher = FxHasher::default();
    class.hash(&mut hasher);
    let len = u64::try_from(PALETTE.len()).unwrap_or(1);
    usize::try_from(hasher.finish() % len)
        .ok()
        .and_then(|index| PALETTE.get(index).copied())
        .unwrap_or(Color::Reset)
}

fn write_token<W: Write>(token: &Token, out: &mut W) -> io::Result<()> {
    match token.classes().last() {
        Some(class) => write!(out, "{}", token.text().with(class_color(class))),
        None => write!(out, "{}", token.text()),
    }
}

fn write_line<W: Write>(line: &Line, width: usize, out: &mut W) -> io::Result<()> {
    let number = format!("{:>width$}", line.number());
    if line.is_highlighted() {
        write!(out, "{} {} ", number.bold().reverse(), "│".dark_grey())?;
    } else {
        write!(out, "{} {} ", number.dark_grey(), "│".dark_grey())?;
    }
    for token in line.tokens() {
        write_token(token, out)?;
    }
    writeln!(out)
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let mut table = super::load_table(&args.file, args.source.as_deref())?;
    let mut highlight = HighlightController::new();
    if let Some(line) = args.highlight
        && highlight.set_highlighted_line(&mut table, Some(line)).is_none()
    {
        anyhow::bail!("line {line} is outside the table (1-{})", table.len());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Text => {
            let width = table.len().to_string().len();
            for line in table.lines() {
                write_line(line, width, &mut out)?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, &table)?;
            writeln!(out)?;
        }
        Format::Html => {
            writeln!(out, "{}", table.render(&args.highlight_class).to_html())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobview::{LineTable, markup};

    #[test]
    fn same_class_same_color() {
        assert_eq!(class_color("keyword"), class_color("keyword"));
    }

    #[test]
    fn highlighted_line_is_written_with_its_tokens() -> anyhow::Result<()> {
        let nodes = markup::parse("<span class=\"k\">fn</span> main")?;
        let table = LineTable::build(&nodes);
        let line = table.line(1).ok_or_else(|| anyhow::anyhow!("no line"))?;
        let mut out = Vec::new();
        write_line(line, 2, &mut out)?;
        let written = String::from_utf8(out)?;
        assert!(written.contains(" 1"));
        assert!(written.contains("fn"));
        assert!(written.contains(" main"));
        assert!(written.ends_with('\n'));
        Ok(())
    }
}
