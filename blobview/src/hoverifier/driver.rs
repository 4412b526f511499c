//! Runs a [`DocumentView`] on a single task.
//!
//! Debounce timers and lookups are futures multiplexed with the input stream;
//! each one completes into another input for the view. There is no hard
//! cancellation: superseded lookups still complete and the view drops their
//! results by sequence number.

use std::time::Duration;

use futures::{
    FutureExt, Stream, StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};

use crate::{
    error::LookupError,
    location::DocumentPosition,
    view::{DocumentView, ViewInput},
};

use super::{AnchorSource, Effect, HoverInfo, HoverRequest, Input};

/// Backend answering hover and definition lookups.
#[allow(async_fn_in_trait)]
pub trait HoverProvider {
    async fn fetch_hover(&self, position: DocumentPosition) -> Result<HoverInfo, LookupError>;

    /// URL of the definition of the symbol at `position`, if it has one.
    async fn fetch_jump_target(
        &self,
        position: DocumentPosition,
    ) -> Result<Option<String>, LookupError>;
}

#[allow(async_fn_in_trait)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// Applies effects to whatever displays the view.
pub trait ViewHost: AnchorSource {
    fn apply(&mut self, effect: Effect);
}

/// Feed `inputs` to `view` until the stream ends, then let outstanding timers
/// and lookups finish.
///
/// A lookup that never completes keeps this future pending.
pub async fn run<'a, P, T, H, S>(
    view: &mut DocumentView,
    provider: &'a P,
    timer: &'a T,
    host: &mut H,
    inputs: S,
) where
    P: HoverProvider + 'a,
    T: Timer + 'a,
    H: ViewHost,
    S: Stream<Item = ViewInput> + Unpin,
{
    let mut tasks: FuturesUnordered<LocalBoxFuture<'a, ViewInput>> = FuturesUnordered::new();
    let mut inputs = inputs.fuse();
    loop {
        let next = futures::select_biased! {
            done = tasks.select_next_some() => Some(done),
            input = inputs.next() => input,
        };
        let Some(input) = next else {
            break;
        };
        let effects = view.handle(input, &*host);
        dispatch(effects, provider, timer, host, &tasks);
    }
    tracing::debug!(outstanding = tasks.len(), "input closed, draining");
    while let Some(input) = tasks.next().await {
        let effects = view.handle(input, &*host);
        dispatch(effects, provider, timer, host, &tasks);
    }
}

fn dispatch<'a, P, T, H>(
    effects: Vec<Effect>,
    provider: &'a P,
    timer: &'a T,
    host: &mut H,
    tasks: &FuturesUnordered<LocalBoxFuture<'a, ViewInput>>,
) where
    P: HoverProvider + 'a,
    T: Timer + 'a,
    H: ViewHost,
{
    for effect in effects {
        match effect {
            Effect::ScheduleDebounce { ticket, delay } => tasks.push(
                async move {
                    timer.sleep(delay).await;
                    ViewInput::Hover(Input::DebounceElapsed(ticket))
                }
                .boxed_local(),
            ),
            Effect::FetchHover(HoverRequest { seq, position, .. }) => tasks.push(
                async move {
                    let result = provider.fetch_hover(position).await;
                    ViewInput::Hover(Input::HoverFetched { seq, result })
                }
                .boxed_local(),
            ),
            Effect::FetchJump(HoverRequest { seq, position, .. }) => tasks.push(
                async move {
                    let result = provider.fetch_jump_target(position).await;
                    ViewInput::Hover(Input::JumpFetched { seq, result })
                }
                .boxed_local(),
            ),
            effect @ (Effect::Render(_)
            | Effect::Highlight(_)
            | Effect::ScrollToLine(_)
            | Effect::ReplaceUrl(_)
            | Effect::PushUrl(_)
            | Effect::Navigate(_)
            | Effect::SelectionChanged(_)) => host.apply(effect),
        }
    }
}
