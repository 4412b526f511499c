use std::{fs, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod error;
mod subcommands;

/// Inspect highlighted code the way the browser viewer sees it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the line table of a highlighted file and print it
    Table(subcommands::table::Args),

    /// Show the token at a line and column
    Resolve(subcommands::resolve::Args),

    /// Encode or decode line URLs
    #[command(subcommand)]
    Url(subcommands::url::Command),

    /// Hover a position against a JSON hover index
    Hover(subcommands::hover::Args),
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let result = match &args.command {
        Command::Table(args) => subcommands::table::run(args),
        Command::Resolve(args) => subcommands::resolve::run(args),
        Command::Url(command) => subcommands::url::run(command),
        Command::Hover(args) => subcommands::hover::run(args),
    };

    if let Err(e) = result {
        let source_context = markup_file(&args.command)
            .and_then(|path| fs::read_to_string(&path).ok().map(|source| (path, source)));
        error::display(e.as_ref(), source_context.as_ref());
    }
    Ok(())
}

/// The highlighted file a command reads, for error reports with source.
fn markup_file(command: &Command) -> Option<PathBuf> {
    match command {
        Command::Table(args) => Some(args.file.clone()),
        Command::Resolve(args) => Some(args.file.clone()),
        Command::Hover(args) => Some(args.file.clone()),
        Command::Url(_) => None,
    }
}
