//! Core of a browser code viewer's token hover overlay.
//!
//! Highlighted markup is rebuilt into a [`LineTable`] with one row per source
//! line. Pointer targets in the rendered table resolve to line/column
//! positions ([`position`]), which drive the [`Hoverifier`] state machine and
//! the selected-line highlight. Selections round-trip through URLs
//! ([`location`]).
//!
//! # Example
//!
//! ```
//! use blobview::{DocumentPosition, LineTable, markup};
//!
//! let nodes = markup::parse("<span class=\"c\">// a\n// b</span>\n")?;
//! let table = LineTable::build(&nodes);
//! assert_eq!(table.len(), 3);
//! assert_eq!(table.text(), "// a\n// b\n");
//!
//! let position = blobview::location::decode("/github.com/a/b/-/blob/x.rs#L2:4")?;
//! assert_eq!(
//!     position,
//!     DocumentPosition::blob("github.com/a/b", None, "x.rs").with_line_column(2, 4)
//! );
//! # Ok::<(), blobview::Error>(())
//! ```

mod error;
pub mod highlight;
pub mod hoverifier;
pub mod location;
pub mod lsp;
pub mod markup;
mod options;
pub mod position;
mod table;
pub mod view;

pub use error::{Error, LookupError, Mismatch, ParseError};
pub use highlight::{HighlightChange, HighlightController};
pub use hoverifier::{
    AnchorSource, Effect, HoverInfo, HoverRequest, Hoverifier, Input, JumpTarget, NoLayout,
    OverlayContent, OverlayState, Placement, Rect, ScrollContainer, Size, Target,
    driver::{HoverProvider, Timer, ViewHost},
};
pub use location::{DocumentPosition, ObjectKind, Position, Selection};
pub use options::{ViewOptions, ViewOptionsBuilder};
pub use position::{CellPosition, NodeRole, ViewNode};
pub use table::{
    CODE_CELL_CLASS, Hit, LINE_NUMBER_CLASS, Line, LineTable, NodeId, NodeKind, NodeRef, TableDom,
    Token, TokenId,
};
pub use view::{DocumentView, ViewInput};
