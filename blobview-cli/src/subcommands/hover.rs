use std::{fs, path::PathBuf, time::Duration};

use anyhow::Context;
use blobview::{
    AnchorSource, DocumentPosition, DocumentView, Effect, HoverInfo, HoverProvider, Input,
    LineTable, LookupError, OverlayState, Placement, Rect, ScrollContainer, Size, Timer, TokenId,
    ViewHost, ViewInput, ViewOptions, hoverifier::driver, location, markup,
};
use clap::Args as ClapArgs;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Width of one character cell in the simulated layout.
const CHAR_WIDTH: f64 = 8.0;
const LINE_HEIGHT: f64 = 16.0;
const OVERLAY_SIZE: Size = Size {
    width: 320.0,
    height: 120.0,
};

/// Hover a position against a JSON hover index
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Highlighted markup
    pub file: PathBuf,

    /// JSON array of `{"line", "start", "end", "text"?, "definition"?}` entries
    #[arg(long)]
    pub index: PathBuf,

    /// Blob URL of the file
    #[arg(long, default_value = "/local/-/blob/file")]
    pub url: String,

    /// 1-based line
    #[arg(long)]
    pub line: usize,

    /// 1-based character column
    #[arg(long, default_value_t = 1)]
    pub column: usize,

    /// Click the token instead of resting the pointer on it
    #[arg(long)]
    pub click: bool,

    /// Follow the definition once the jump target is known
    #[arg(long, requires = "click")]
    pub go_to_definition: bool,

    /// Debounce delay in milliseconds
    #[arg(long, default_value_t = 50)]
    pub debounce: u64,

    /// Print every effect, not only the final overlay
    #[arg(long)]
    pub effects: bool,
}

/// Hover text and definition for a column range `[start, end)` of a line.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
}

/// Hover index loaded from JSON, by line.
#[derive(Debug, Default)]
pub struct Index {
    lines: FxHashMap<usize, Vec<Entry>>,
}

impl Index {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let entries: Vec<Entry> = serde_json::from_str(json)?;
        let mut lines: FxHashMap<usize, Vec<Entry>> = FxHashMap::default();
        for entry in entries {
            lines.entry(entry.line).or_default().push(entry);
        }
        Ok(Self { lines })
    }

    fn entry(&self, position: &DocumentPosition) -> Option<&Entry> {
        let start = position.selection?.start;
        let column = start.column.unwrap_or(1);
        self.lines
            .get(&start.line)?
            .iter()
            .find(|entry| (entry.start..entry.end).contains(&column))
    }
}

impl HoverProvider for Index {
    async fn fetch_hover(&self, position: DocumentPosition) -> Result<HoverInfo, LookupError> {
        self.entry(&position)
            .and_then(|entry| entry.text.clone())
            .map(HoverInfo::new)
            .ok_or_else(|| LookupError::new(format!("no hover information at {position}")))
    }

    async fn fetch_jump_target(
        &self,
        position: DocumentPosition,
    ) -> Result<Option<String>, LookupError> {
        Ok(self.entry(&position).and_then(|entry| entry.definition.clone()))
    }
}

struct TokioTimer;

impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Lays tokens out on a fixed monospace grid and records effects.
struct Terminal {
    table: LineTable,
    effects: Vec<Effect>,
}

impl AnchorSource for Terminal {
    fn token_rect(&self, token: TokenId) -> Option<Rect> {
        let t = self.table.token(token)?;
        Some(Rect::new(
            to_f64(t.start_column().saturating_sub(1)) * CHAR_WIDTH,
            to_f64(token.line.saturating_sub(1)) * LINE_HEIGHT,
            to_f64(t.char_len()) * CHAR_WIDTH,
            LINE_HEIGHT,
        ))
    }
}

impl ViewHost for Terminal {
    fn apply(&mut self, effect: Effect) {
        tracing::debug!(?effect, "applying effect");
        self.effects.push(effect);
    }
}

impl Terminal {
    fn last_overlay(&self) -> Option<&OverlayState> {
        self.effects.iter().rev().find_map(|effect| {
            if let Effect::Render(overlay) = effect {
                Some(overlay.as_ref())
            } else {
                None
            }
        })?
    }

    /// The whole file as the scroll container, unscrolled.
    fn container(&self) -> ScrollContainer {
        let width = self
            .table
            .lines()
            .iter()
            .map(blobview::Line::char_len)
            .max()
            .unwrap_or_default();
        ScrollContainer {
            rect: Rect::new(
                0.0,
                0.0,
                to_f64(width) * CHAR_WIDTH,
                to_f64(self.table.len()) * LINE_HEIGHT,
            ),
            scroll_left: 0.0,
            scroll_top: 0.0,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: usize) -> f64 {
    value as f64
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    overlay: Option<&'a OverlayState>,
    placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    navigated: Option<&'a str>,
}

fn inputs(args: &Args, view: &DocumentView) -> Vec<ViewInput> {
    let hit = view.table().hit(args.line, args.column);
    if hit.is_none() {
        tracing::warn!(line = args.line, column = args.column, "no token at position");
    }
    let mut inputs = Vec::new();
    if args.click {
        inputs.push(ViewInput::Click {
            hit,
            line: Some(args.line),
        });
        if args.go_to_definition {
            inputs.push(ViewInput::Hover(Input::GoToDefinition));
        }
    } else {
        inputs.push(ViewInput::PointerMove(hit));
    }
    inputs
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let input = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let nodes = markup::parse(&input)?;
    let index_json = fs::read_to_string(&args.index)
        .with_context(|| format!("failed to read {}", args.index.display()))?;
    let index = Index::from_json(&index_json).context("invalid hover index")?;

    let base = location::decode(&args.url)?.with_selection(None);
    let options = ViewOptions::builder()
        .with_debounce(Duration::from_millis(args.debounce))
        .build();
    let mut view = DocumentView::new(base, &nodes, None, options)?;
    let mut host = Terminal {
        table: view.table().clone(),
        effects: Vec::new(),
    };
    let inputs = futures::stream::iter(inputs(args, &view));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(driver::run(&mut view, &index, &TokioTimer, &mut host, inputs));

    if args.effects {
        for effect in &host.effects {
            println!("{}", serde_json::to_string(effect)?);
        }
    }
    let overlay = host.last_overlay();
    let report = Report {
        overlay,
        placement: overlay.and_then(|o| {
            o.placement(&host.container(), OVERLAY_SIZE, view.options().overlay_margin)
        }),
        navigated: host.effects.iter().rev().find_map(|effect| {
            if let Effect::Navigate(url) | Effect::PushUrl(url) = effect {
                Some(url.as_str())
            } else {
                None
            }
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobview::OverlayContent;
    use pretty_assertions::assert_eq;

    const INDEX: &str = r#"[
        {"line": 3, "start": 6, "end": 15, "text": "func NewRouter() *Router", "definition": "/github.com/gorilla/mux/-/blob/mux.go#L3:6"},
        {"line": 1, "start": 9, "end": 12, "text": "package mux"}
    ]"#;

    fn position(line: usize, column: usize) -> DocumentPosition {
        DocumentPosition::blob("github.com/gorilla/mux", None, "mux.go").with_line_column(line, column)
    }

    #[test]
    fn entries_cover_half_open_ranges() -> anyhow::Result<()> {
        let index = Index::from_json(INDEX)?;
        assert_eq!(
            index.entry(&position(3, 6)).and_then(|e| e.text.as_deref()),
            Some("func NewRouter() *Router")
        );
        assert_eq!(index.entry(&position(3, 15)), None);
        assert_eq!(index.entry(&position(2, 1)), None);
        Ok(())
    }

    #[test]
    fn missing_text_is_a_lookup_error() -> anyhow::Result<()> {
        let index = Index::from_json(r#"[{"line": 1, "start": 1, "end": 4}]"#)?;
        let result = futures::executor::block_on(index.fetch_hover(position(1, 2)));
        assert!(result.is_err());
        let jump = futures::executor::block_on(index.fetch_jump_target(position(1, 2)));
        assert_eq!(jump, Ok(None));
        Ok(())
    }

    #[test]
    fn click_with_definition_in_the_same_file_pushes_history() -> anyhow::Result<()> {
        let nodes = markup::parse("package mux\n\n<span class=\"kw\">func</span> NewRouter() *Router")?;
        let base = location::decode("/github.com/gorilla/mux/-/blob/mux.go")?;
        let mut view = DocumentView::new(base, &nodes, None, ViewOptions::default())?;
        let mut host = Terminal {
            table: view.table().clone(),
            effects: Vec::new(),
        };
        let args = Args {
            file: PathBuf::new(),
            index: PathBuf::new(),
            url: String::new(),
            line: 3,
            column: 6,
            click: true,
            go_to_definition: true,
            debounce: 0,
            effects: false,
        };
        let inputs = futures::stream::iter(inputs(&args, &view));
        let index = Index::from_json(INDEX)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(driver::run(&mut view, &index, &TokioTimer, &mut host, inputs));

        assert!(host.effects.contains(&Effect::PushUrl(
            "/github.com/gorilla/mux/-/blob/mux.go#L3:6".to_string()
        )));
        let overlay = host.last_overlay().ok_or_else(|| anyhow::anyhow!("no overlay"))?;
        assert!(overlay.pinned);
        assert_eq!(
            overlay.content,
            OverlayContent::Result {
                text: "func NewRouter() *Router".to_string(),
                jump: blobview::JumpTarget::Found(
                    "/github.com/gorilla/mux/-/blob/mux.go#L3:6".to_string()
                ),
            }
        );
        assert_eq!(overlay.anchor, Some(Rect::new(32.0, 32.0, 160.0, 16.0)));
        Ok(())
    }
}
