//! Hover overlay state machine.
//!
//! A pure reducer: pointer, timer and lookup events go in through
//! [`Hoverifier::handle`], [`Effect`]s come out. Nothing here waits or
//! performs I/O; [`driver::run`] schedules the timers and lookups the effects
//! ask for and feeds their completions back in.
//!
//! Every request carries a sequence number. A lookup result is applied only
//! if its sequence number is the latest issued; anything older, or anything
//! arriving after the overlay was closed, is dropped.

pub mod driver;
mod overlay;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::LookupError, highlight::HighlightChange, location::DocumentPosition, table::TokenId,
};

pub use overlay::{
    JumpTarget, OverlayContent, OverlayState, Placement, Rect, ScrollContainer, Size,
};

/// A token under the pointer and the document position it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub position: DocumentPosition,
    pub token: TokenId,
}

/// A lookup keyed by position, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverRequest {
    pub seq: u64,
    pub position: DocumentPosition,
    pub token: TokenId,
}

/// Result of a hover lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverInfo {
    pub text: String,
}

impl HoverInfo {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Pointer moved; `None` when it is not over any token.
    PointerMove(Option<Target>),
    PointerLeave,
    /// Click on a token pins its overlay; a click elsewhere closes it.
    Click(Option<Target>),
    DebounceElapsed(u64),
    HoverFetched {
        seq: u64,
        result: Result<HoverInfo, LookupError>,
    },
    JumpFetched {
        seq: u64,
        result: Result<Option<String>, LookupError>,
    },
    /// Close button or Escape.
    Close,
    GoToDefinition,
}

/// Something for the host to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", content = "value", rename_all = "snake_case")]
pub enum Effect {
    /// Deliver `Input::DebounceElapsed(ticket)` after `delay`.
    ScheduleDebounce { ticket: u64, delay: Duration },
    FetchHover(HoverRequest),
    FetchJump(HoverRequest),
    /// Replace the overlay; `None` hides it.
    Render(Option<OverlayState>),
    Highlight(HighlightChange),
    ScrollToLine(usize),
    /// Replace the current history entry, without navigating.
    ReplaceUrl(String),
    /// Push a history entry for a location inside this document.
    PushUrl(String),
    /// Leave the document.
    Navigate(String),
    SelectionChanged(DocumentPosition),
}

/// Current layout of rendered tokens.
pub trait AnchorSource {
    fn token_rect(&self, token: TokenId) -> Option<Rect>;
}

/// A layout where nothing is measured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl AnchorSource for NoLayout {
    fn token_rect(&self, _token: TokenId) -> Option<Rect> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Active {
    request: HoverRequest,
    jump: JumpTarget,
    pinned: bool,
    /// Go-to-definition clicked while the jump target was still loading.
    go_to_queued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum HoverState {
    #[default]
    Idle,
    Pending(Active),
    Resolved(Active, HoverInfo),
    Error(Active, LookupError),
}

impl HoverState {
    fn active(&self) -> Option<&Active> {
        match self {
            Self::Idle => None,
            Self::Pending(active) | Self::Resolved(active, _) | Self::Error(active, _) => {
                Some(active)
            }
        }
    }

    fn active_mut(&mut self) -> Option<&mut Active> {
        match self {
            Self::Idle => None,
            Self::Pending(active) | Self::Resolved(active, _) | Self::Error(active, _) => {
                Some(active)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending(..) => "pending",
            Self::Resolved(..) => "resolved",
            Self::Error(..) => "error",
        }
    }
}

/// Hover state machine of one document view.
#[derive(Debug, Clone)]
pub struct Hoverifier {
    state: HoverState,
    debounce: Duration,
    /// Sequence number of the latest request issued.
    seq: u64,
    /// Latest debounce ticket; older tickets are ignored.
    ticket: u64,
    /// Target waiting for its debounce window to elapse.
    waiting: Option<Target>,
    /// Token currently under the pointer.
    hovered: Option<TokenId>,
}

impl Hoverifier {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: HoverState::Idle,
            debounce,
            seq: 0,
            ticket: 0,
            waiting: None,
            hovered: None,
        }
    }

    /// `idle`, `pending`, `resolved` or `error`.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == HoverState::Idle
    }

    #[must_use]
    pub fn request(&self) -> Option<&HoverRequest> {
        self.state.active().map(|active| &active.request)
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.state.active().is_some_and(|active| active.pinned)
    }

    /// Sequence number of the latest request issued, 0 before the first.
    #[must_use]
    pub fn latest_seq(&self) -> u64 {
        self.seq
    }

    /// The overlay for the current state, anchored on the current layout.
    #[must_use]
    pub fn overlay(&self, anchors: &impl AnchorSource) -> Option<OverlayState> {
        let (active, content) = match &self.state {
            HoverState::Idle => return None,
            HoverState::Pending(active) => (active, OverlayContent::Loading),
            HoverState::Resolved(active, info) => (
                active,
                OverlayContent::Result {
                    text: info.text.clone(),
                    jump: active.jump.clone(),
                },
            ),
            HoverState::Error(active, error) => (
                active,
                OverlayContent::Error {
                    message: error.message().to_string(),
                },
            ),
        };
        Some(OverlayState {
            visible: true,
            anchor: anchors.token_rect(active.request.token),
            content,
            source: active.request.position.clone(),
            token: active.request.token,
            pinned: active.pinned,
        })
    }

    #[tracing::instrument(level = "trace", skip_all, fields(state = self.state.name()))]
    pub fn handle(&mut self, input: Input, anchors: &impl AnchorSource) -> Vec<Effect> {
        match input {
            Input::PointerMove(Some(target)) => self.pointer_move(target),
            Input::PointerMove(None) | Input::PointerLeave => self.pointer_leave(),
            Input::Click(Some(target)) => self.click(target, anchors),
            Input::Click(None) | Input::Close => self.close(),
            Input::DebounceElapsed(ticket) => self.debounce_elapsed(ticket, anchors),
            Input::HoverFetched { seq, result } => self.hover_fetched(seq, result, anchors),
            Input::JumpFetched { seq, result } => self.jump_fetched(seq, result, anchors),
            Input::GoToDefinition => self.go_to_definition(),
        }
    }

    fn pointer_move(&mut self, target: Target) -> Vec<Effect> {
        if self.hovered == Some(target.token) {
            tracing::trace!("pointer moved within the same token");
            return Vec::new();
        }
        self.hovered = Some(target.token);
        self.cancel_debounce();
        if self.is_pinned() {
            tracing::trace!("overlay is pinned, ignoring pointer");
            return Vec::new();
        }
        if self.request().is_some_and(|r| r.token == target.token) {
            return Vec::new();
        }
        let mut effects = self.clear_unpinned();
        self.waiting = Some(target);
        effects.push(Effect::ScheduleDebounce {
            ticket: self.ticket,
            delay: self.debounce,
        });
        effects
    }

    fn pointer_leave(&mut self) -> Vec<Effect> {
        self.hovered = None;
        self.cancel_debounce();
        self.clear_unpinned()
    }

    fn click(&mut self, target: Target, anchors: &impl AnchorSource) -> Vec<Effect> {
        self.cancel_debounce();
        self.hovered = Some(target.token);
        let same_token = self.request().is_some_and(|r| r.token == target.token);
        match self.state.active_mut() {
            Some(active) if same_token => {
                if active.pinned {
                    return Vec::new();
                }
                active.pinned = true;
                vec![Effect::Render(self.overlay(anchors))]
            }
            Some(_) | None => self.issue(target, true, anchors),
        }
    }

    fn close(&mut self) -> Vec<Effect> {
        self.cancel_debounce();
        self.hovered = None;
        if self.is_idle() {
            return Vec::new();
        }
        tracing::debug!(seq = self.seq, "closing hover overlay");
        self.state = HoverState::Idle;
        vec![Effect::Render(None)]
    }

    fn debounce_elapsed(&mut self, ticket: u64, anchors: &impl AnchorSource) -> Vec<Effect> {
        if ticket != self.ticket {
            tracing::trace!(ticket, latest = self.ticket, "stale debounce ticket");
            return Vec::new();
        }
        match self.waiting.take() {
            Some(target) => self.issue(target, false, anchors),
            None => Vec::new(),
        }
    }

    fn issue(&mut self, target: Target, pinned: bool, anchors: &impl AnchorSource) -> Vec<Effect> {
        self.seq += 1;
        let request = HoverRequest {
            seq: self.seq,
            position: target.position,
            token: target.token,
        };
        tracing::debug!(seq = request.seq, position = %request.position, pinned, "issuing hover request");
        self.state = HoverState::Pending(Active {
            request: request.clone(),
            jump: JumpTarget::Loading,
            pinned,
            go_to_queued: false,
        });
        vec![
            Effect::FetchHover(request.clone()),
            Effect::FetchJump(request),
            Effect::Render(self.overlay(anchors)),
        ]
    }

    fn is_current(&self, seq: u64) -> bool {
        if self.is_idle() || seq != self.seq {
            tracing::debug!(seq, latest = self.seq, state = self.state.name(), "discarding stale lookup result");
            return false;
        }
        true
    }

    fn hover_fetched(
        &mut self,
        seq: u64,
        result: Result<HoverInfo, LookupError>,
        anchors: &impl AnchorSource,
    ) -> Vec<Effect> {
        if !self.is_current(seq) {
            return Vec::new();
        }
        let Some(active) = self.state.active().cloned() else {
            return Vec::new();
        };
        self.state = match result {
            Ok(info) => HoverState::Resolved(active, info),
            Err(error) => {
                tracing::debug!(seq, %error, "hover lookup failed");
                HoverState::Error(active, error)
            }
        };
        vec![Effect::Render(self.overlay(anchors))]
    }

    fn jump_fetched(
        &mut self,
        seq: u64,
        result: Result<Option<String>, LookupError>,
        anchors: &impl AnchorSource,
    ) -> Vec<Effect> {
        if !self.is_current(seq) {
            return Vec::new();
        }
        let jump = match result {
            Ok(Some(url)) => JumpTarget::Found(url),
            Ok(None) => JumpTarget::None,
            Err(error) => {
                tracing::debug!(seq, %error, "jump target lookup failed");
                JumpTarget::None
            }
        };
        let mut effects = Vec::new();
        if let Some(active) = self.state.active_mut() {
            if std::mem::take(&mut active.go_to_queued) {
                match &jump {
                    JumpTarget::Found(url) => effects.push(Effect::Navigate(url.clone())),
                    JumpTarget::None | JumpTarget::Loading => {
                        tracing::debug!(seq, "queued go-to-definition has no target");
                    }
                }
            }
            active.jump = jump;
        }
        if matches!(self.state, HoverState::Resolved(..)) {
            effects.push(Effect::Render(self.overlay(anchors)));
        }
        effects
    }

    fn go_to_definition(&mut self) -> Vec<Effect> {
        let Some(active) = self.state.active_mut() else {
            return Vec::new();
        };
        match &active.jump {
            JumpTarget::Found(url) => vec![Effect::Navigate(url.clone())],
            JumpTarget::Loading => {
                tracing::debug!(seq = active.request.seq, "jump target pending, queueing go-to-definition");
                active.go_to_queued = true;
                Vec::new()
            }
            JumpTarget::None => Vec::new(),
        }
    }

    fn cancel_debounce(&mut self) {
        self.ticket += 1;
        self.waiting = None;
    }

    /// Hide an overlay that is not pinned.
    fn clear_unpinned(&mut self) -> Vec<Effect> {
        if self.is_idle() || self.is_pinned() {
            return Vec::new();
        }
        self.state = HoverState::Idle;
        vec![Effect::Render(None)]
    }
}
