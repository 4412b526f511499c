//! Page wiring: event listeners feed the view through a channel and a single
//! spawned task runs it.

use std::rc::Rc;

use blobview::{
    DocumentView, Input, LineTable, ViewHost, ViewInput, ViewOptions, hoverifier::driver,
    location, markup::escape_html, position,
};
use futures::channel::mpsc::{self, UnboundedSender};
use wasm_bindgen::{closure::Closure, convert::FromWasmAbi, prelude::*};
use web_sys::{Document, Element, EventTarget, HtmlElement, KeyboardEvent, MouseEvent, Node, Window};

use crate::{
    dom::{self, DomNode},
    host::{PageHost, PageProvider, WindowTimer},
};

/// The node and character offset under a viewport point.
///
/// Inside an element the caret offset is a child index; the caret then sits
/// at the start of that child, or at the end of the last one.
#[allow(clippy::cast_precision_loss)] // client coordinates are small integers
fn caret_at(document: &Document, event: &MouseEvent) -> Option<(Node, usize)> {
    let caret =
        document.caret_position_from_point(event.client_x() as f32, event.client_y() as f32)?;
    let node = caret.offset_node()?;
    let offset = caret.offset();
    if node.node_type() != Node::ELEMENT_NODE {
        return Some((node, usize::try_from(offset).ok()?));
    }
    let children = node.child_nodes();
    match children.item(offset) {
        Some(child) => Some((child, 0)),
        None => Some((children.item(children.length().checked_sub(1)?)?, usize::MAX)),
    }
}

/// Turn a mouse event into a cell position and a hit on a token.
fn pointer(
    document: &Document,
    table: &LineTable,
    event: &MouseEvent,
) -> (Option<blobview::Hit>, Option<usize>) {
    let target = event.target().and_then(|t| t.dyn_into::<Node>().ok());
    let row = target.clone().and_then(|t| position::resolve_row(&DomNode(t)));
    let (node, offset) = caret_at(document, event)
        .or_else(|| target.map(|t| (t, 0)))
        .map_or((None, 0), |(node, offset)| (Some(node), offset));
    let hit = node
        .and_then(|node| position::resolve(&DomNode(node), offset))
        .and_then(|p| table.hit(p.line, p.column));
    (hit, row)
}

fn listen<E: FromWasmAbi + 'static>(
    target: &EventTarget,
    event: &str,
    handler: impl Fn(E) + 'static,
) -> Result<(), JsValue> {
    let callback: Closure<dyn Fn(E)> = Closure::new(handler);
    target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

fn attach_table_listeners(
    document: &Document,
    container: &HtmlElement,
    table: &Rc<LineTable>,
    sender: &UnboundedSender<ViewInput>,
) -> Result<(), JsValue> {
    {
        let (document, table, sender) = (document.clone(), Rc::clone(table), sender.clone());
        listen(container, "mousemove", move |event: MouseEvent| {
            let (hit, _) = pointer(&document, &table, &event);
            let _ = sender.unbounded_send(ViewInput::PointerMove(hit));
        })?;
    }
    {
        let sender = sender.clone();
        listen(container, "mouseleave", move |_: MouseEvent| {
            let _ = sender.unbounded_send(ViewInput::PointerLeave);
        })?;
    }
    {
        let (document, table, sender) = (document.clone(), Rc::clone(table), sender.clone());
        listen(container, "click", move |event: MouseEvent| {
            let (hit, line) = pointer(&document, &table, &event);
            let _ = sender.unbounded_send(ViewInput::Click { hit, line });
        })?;
    }
    Ok(())
}

fn attach_overlay_listeners(
    overlay: &HtmlElement,
    sender: &UnboundedSender<ViewInput>,
) -> Result<(), JsValue> {
    let sender = sender.clone();
    listen(overlay, "click", move |event: MouseEvent| {
        event.stop_propagation();
        let Some(element) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };
        let input = if element.closest(".hover-close").ok().flatten().is_some() {
            Input::Close
        } else if element.closest(".go-to-definition").ok().flatten().is_some() {
            event.prevent_default();
            Input::GoToDefinition
        } else {
            return;
        };
        let _ = sender.unbounded_send(ViewInput::Hover(input));
    })
}

/// A click anywhere outside the table and the overlay closes the overlay.
fn attach_outside_click_listener(
    document: &Document,
    container: &HtmlElement,
    overlay: &HtmlElement,
    sender: &UnboundedSender<ViewInput>,
) -> Result<(), JsValue> {
    let (container, overlay, sender) = (container.clone(), overlay.clone(), sender.clone());
    listen(document, "click", move |event: MouseEvent| {
        let Some(target) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
            return;
        };
        if container.contains(Some(&target)) || overlay.contains(Some(&target)) {
            return;
        }
        let _ = sender.unbounded_send(ViewInput::Hover(Input::Close));
    })
}

fn attach_window_listeners(
    window: &Window,
    sender: &UnboundedSender<ViewInput>,
) -> Result<(), JsValue> {
    {
        let sender = sender.clone();
        listen(window, "keydown", move |event: KeyboardEvent| {
            if event.key() == "Escape" {
                let _ = sender.unbounded_send(ViewInput::Hover(Input::Close));
            }
        })?;
    }
    for name in ["hashchange", "popstate"] {
        let (page, sender) = (window.clone(), sender.clone());
        listen(window, name, move |_: web_sys::Event| {
            if let Ok(href) = page.location().href() {
                let _ = sender.unbounded_send(ViewInput::LocationChanged(href));
            }
        })?;
    }
    Ok(())
}

fn element_by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} is not an HTML element")))
}

/// Build the line table from `#blob`'s highlighted markup, render it into
/// `#blob-table` and start the view.
pub(crate) fn setup() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no global window")?;
    let document = window.document().ok_or("no document")?;
    let blob: HtmlElement = element_by_id(&document, "blob")?;
    let container: HtmlElement = element_by_id(&document, "blob-table")?;
    let overlay: HtmlElement = element_by_id(&document, "hover-overlay")?;

    let pathname = window.location().pathname()?;
    let base = location::decode(&pathname)
        .map_err(|e| JsValue::from_str(&e.to_string()))?
        .with_selection(None);
    let nodes = dom::markup_nodes(&blob);
    let source = blob.text_content().unwrap_or_default();
    let mut view = match DocumentView::new(base, &nodes, Some(&source), ViewOptions::default()) {
        Ok(view) => view,
        Err(error) => {
            container.set_inner_html(&format!(
                r#"<div class="blobview-error">{}</div>"#,
                escape_html(&error.to_string())
            ));
            return Err(JsValue::from_str(&error.to_string()));
        }
    };
    container.set_inner_html(&view.render().to_html());
    let _ = blob.style().set_property("display", "none");

    let mut host = PageHost {
        window: window.clone(),
        document: document.clone(),
        container: container.clone(),
        overlay: overlay.clone(),
        highlight_class: view.options().highlight_class.clone(),
        margin: view.options().overlay_margin,
    };
    host.table_rendered();
    for effect in view.restore(&window.location().href()?) {
        host.apply(effect);
    }

    let (sender, receiver) = mpsc::unbounded();
    let table = Rc::new(view.table().clone());
    attach_table_listeners(&document, &container, &table, &sender)?;
    attach_overlay_listeners(&overlay, &sender)?;
    attach_outside_click_listener(&document, &container, &overlay, &sender)?;
    attach_window_listeners(&window, &sender)?;

    wasm_bindgen_futures::spawn_local(async move {
        let timer = WindowTimer(window);
        driver::run(&mut view, &PageProvider, &timer, &mut host, receiver).await;
    });
    Ok(())
}
