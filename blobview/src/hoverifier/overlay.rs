use serde::Serialize;

use crate::{location::DocumentPosition, table::TokenId};

/// A rectangle in CSS pixels, relative to the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn vertical_center(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A scrollable element: its viewport rectangle and current scroll offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScrollContainer {
    pub rect: Rect,
    pub scroll_left: f64,
    pub scroll_top: f64,
}

impl ScrollContainer {
    /// The `scrollTop` that puts `cell` in the vertical middle of the container.
    #[must_use]
    pub fn centered_scroll_top(&self, cell: &Rect) -> f64 {
        self.scroll_top + cell.vertical_center() - self.rect.vertical_center()
    }
}

/// Top-left corner of the overlay, relative to the scroll container's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
}

/// Jump target of a hover result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "url", rename_all = "lowercase")]
pub enum JumpTarget {
    Loading,
    Found(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OverlayContent {
    Loading,
    Error { message: String },
    Result { text: String, jump: JumpTarget },
}

/// What the hover overlay shows. Replaced wholesale on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayState {
    pub visible: bool,
    /// Layout of the source token when the state was produced; `None` when
    /// the token is no longer laid out.
    pub anchor: Option<Rect>,
    pub content: OverlayContent,
    pub source: DocumentPosition,
    pub token: TokenId,
    pub pinned: bool,
}

impl OverlayState {
    /// Where to put an overlay of `size` inside `container`.
    ///
    /// Horizontally aligned with the token. Above the token when the space
    /// between the container's top and the token fits the overlay and the
    /// margin, below it otherwise.
    #[must_use]
    pub fn placement(
        &self,
        container: &ScrollContainer,
        size: Size,
        margin: f64,
    ) -> Option<Placement> {
        let anchor = self.anchor?;
        let left = anchor.left - container.rect.left + container.scroll_left;
        let room_above = anchor.top - container.rect.top;
        let top = if room_above >= size.height + margin {
            room_above - size.height - margin
        } else {
            anchor.bottom() - container.rect.top + margin
        };
        Some(Placement {
            left,
            top: top + container.scroll_top,
        })
    }
}
