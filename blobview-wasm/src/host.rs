//! Applies view effects to the page and answers lookups through the page's
//! JavaScript.

use std::time::Duration;

use blobview::{
    AnchorSource, DocumentPosition, Effect, HighlightChange, HoverInfo, HoverProvider, JumpTarget,
    LookupError, OverlayContent, OverlayState, Rect, ScrollContainer, Size, Timer, TokenId,
    ViewHost, markup::escape_html,
};
use wasm_bindgen::{JsCast, prelude::*};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CustomEvent, CustomEventInit, Document, DomRect, Element, Event, EventInit, HtmlElement, Window,
};

#[wasm_bindgen]
extern "C" {
    /// Hover text for a position URL; resolves to a string or `null`.
    #[wasm_bindgen(js_name = fetchHoverInfo)]
    fn fetch_hover_info(url: &str) -> js_sys::Promise;

    /// Definition URL for a position URL; resolves to a string or `null`.
    #[wasm_bindgen(js_name = fetchJumpTarget)]
    fn fetch_jump_target(url: &str) -> js_sys::Promise;
}

/// Event dispatched on the window whenever the selected line changes.
pub(crate) const SELECTION_EVENT: &str = "blobview:selection";

/// Event dispatched on the window once the line table is in the page.
pub(crate) const TABLE_READY_EVENT: &str = "syntaxHighlightingFinished";

fn rect(dom: &DomRect) -> Rect {
    Rect::new(dom.left(), dom.top(), dom.width(), dom.height())
}

fn lookup_error(error: &JsValue) -> LookupError {
    LookupError::new(
        error
            .as_string()
            .or_else(|| {
                error
                    .dyn_ref::<js_sys::Error>()
                    .map(|e| String::from(e.message()))
            })
            .unwrap_or_else(|| "lookup failed".to_string()),
    )
}

async fn call(promise: js_sys::Promise) -> Result<Option<String>, LookupError> {
    let value = JsFuture::from(promise).await.map_err(|e| lookup_error(&e))?;
    Ok(value.as_string().filter(|text| !text.trim().is_empty()))
}

/// Lookups through `fetchHoverInfo` and `fetchJumpTarget`.
pub(crate) struct PageProvider;

impl HoverProvider for PageProvider {
    async fn fetch_hover(&self, position: DocumentPosition) -> Result<HoverInfo, LookupError> {
        let url = position.encode();
        call(fetch_hover_info(&url))
            .await?
            .map(HoverInfo::new)
            .ok_or_else(|| LookupError::new("No hover information available."))
    }

    async fn fetch_jump_target(
        &self,
        position: DocumentPosition,
    ) -> Result<Option<String>, LookupError> {
        call(fetch_jump_target(&position.encode())).await
    }
}

/// `setTimeout` as a future.
pub(crate) struct WindowTimer(pub(crate) Window);

impl Timer for WindowTimer {
    async fn sleep(&self, duration: Duration) {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let window = self.0.clone();
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            if window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                .is_err()
            {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}

/// The page elements effects are applied to.
pub(crate) struct PageHost {
    pub(crate) window: Window,
    pub(crate) document: Document,
    /// Element holding the rendered table; also the scroll container.
    pub(crate) container: HtmlElement,
    pub(crate) overlay: HtmlElement,
    pub(crate) highlight_class: String,
    pub(crate) margin: f64,
}

impl PageHost {
    fn code_cell(&self, line: usize) -> Option<Element> {
        self.container
            .query_selector(&format!(
                "tr:nth-child({line}) > td.{}",
                blobview::CODE_CELL_CLASS
            ))
            .ok()
            .flatten()
    }

    fn scroll_container(&self) -> ScrollContainer {
        ScrollContainer {
            rect: rect(&self.container.get_bounding_client_rect()),
            scroll_left: f64::from(self.container.scroll_left()),
            scroll_top: f64::from(self.container.scroll_top()),
        }
    }

    fn highlight(&self, change: HighlightChange) {
        if let Some(cell) = change.cleared.and_then(|line| self.code_cell(line)) {
            let _ = cell.class_list().remove_1(&self.highlight_class);
        }
        if let Some(cell) = change.applied.and_then(|line| self.code_cell(line)) {
            let _ = cell.class_list().add_1(&self.highlight_class);
        }
    }

    fn scroll_to_line(&self, line: usize) {
        let Some(cell) = self.code_cell(line) else {
            return;
        };
        let top = self
            .scroll_container()
            .centered_scroll_top(&rect(&cell.get_bounding_client_rect()));
        #[allow(clippy::cast_possible_truncation)]
        self.container.set_scroll_top(top.max(0.0) as i32);
    }

    fn render(&self, overlay: Option<&OverlayState>) {
        let style = self.overlay.style();
        let Some(overlay) = overlay.filter(|o| o.visible) else {
            let _ = style.set_property("display", "none");
            return;
        };
        self.overlay.set_inner_html(&overlay_html(overlay));
        let _ = self.overlay.class_list().toggle_with_force("pinned", overlay.pinned);
        let _ = style.set_property("display", "block");
        let size = Size {
            width: f64::from(self.overlay.offset_width()),
            height: f64::from(self.overlay.offset_height()),
        };
        match overlay.placement(&self.scroll_container(), size, self.margin) {
            Some(placement) => {
                let _ = style.set_property("left", &format!("{}px", placement.left));
                let _ = style.set_property("top", &format!("{}px", placement.top));
            }
            None => {
                let _ = style.set_property("display", "none");
            }
        }
    }

    /// Tell the page the line table replaced the highlighted markup.
    pub(crate) fn table_rendered(&self) {
        let init = EventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        if let Ok(event) = Event::new_with_event_init_dict(TABLE_READY_EVENT, &init) {
            let _ = self.window.dispatch_event(&event);
        }
    }

    fn announce(&self, position: &DocumentPosition) {
        let init = CustomEventInit::new();
        init.set_detail(&JsValue::from_str(&position.encode()));
        if let Ok(event) = CustomEvent::new_with_event_init_dict(SELECTION_EVENT, &init) {
            let _ = self.window.dispatch_event(&event);
        }
    }
}

fn overlay_html(overlay: &OverlayState) -> String {
    let body = match &overlay.content {
        OverlayContent::Loading => r#"<div class="hover-loading">Loading…</div>"#.to_string(),
        OverlayContent::Error { message } => {
            format!(r#"<div class="hover-error">{}</div>"#, escape_html(message))
        }
        OverlayContent::Result { text, jump } => {
            let action = match jump {
                JumpTarget::Found(url) => format!(
                    r#"<a class="go-to-definition" href="{}">Go to definition</a>"#,
                    escape_html(url)
                ),
                JumpTarget::Loading => {
                    r#"<button class="go-to-definition" disabled>Go to definition</button>"#
                        .to_string()
                }
                JumpTarget::None => String::new(),
            };
            format!(
                r#"<div class="hover-text">{}</div><div class="hover-actions">{action}</div>"#,
                escape_html(text)
            )
        }
    };
    format!(r#"<button class="hover-close" aria-label="Close">×</button>{body}"#)
}

impl AnchorSource for PageHost {
    fn token_rect(&self, token: TokenId) -> Option<Rect> {
        let cell = self.code_cell(token.line)?;
        let node = cell.child_nodes().item(u32::try_from(token.index).ok()?)?;
        let range = self.document.create_range().ok()?;
        range.select_node(&node).ok()?;
        Some(rect(&range.get_bounding_client_rect()))
    }
}

impl ViewHost for PageHost {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Render(overlay) => self.render(overlay.as_ref()),
            Effect::Highlight(change) => self.highlight(change),
            Effect::ScrollToLine(line) => self.scroll_to_line(line),
            Effect::ReplaceUrl(url) => {
                if let Ok(history) = self.window.history() {
                    let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&url));
                }
            }
            Effect::PushUrl(url) => {
                if let Ok(history) = self.window.history() {
                    let _ = history.push_state_with_url(&JsValue::NULL, "", Some(&url));
                }
            }
            Effect::Navigate(url) => {
                let _ = self.window.location().set_href(&url);
            }
            Effect::SelectionChanged(position) => self.announce(&position),
            // Timers and lookups are run by the driver.
            Effect::ScheduleDebounce { .. } | Effect::FetchHover(_) | Effect::FetchJump(_) => {}
        }
    }
}
