use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

#[inline]
pub fn add_click_listener(
    document: &web::Document,
    element_id: &str,
    mut handler: impl FnMut() + 'static,
) {
    if let Some(el) = document.get_element_by_id(element_id) {
        let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

/// Listen for `event` anywhere in the document. Listeners live for the page.
pub fn add_document_listener(
    document: &web::Document,
    event: &str,
    mut handler: impl FnMut(&web::Event) + 'static,
) {
    let closure = Closure::wrap(Box::new(move |ev: web::Event| handler(&ev)) as Box<dyn FnMut(_)>);
    _ = document.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
    closure.forget();
}

pub fn event_within(ev: &web::Event, selector: &str) -> bool {
    ev.target()
        .and_then(|t| t.dyn_into::<web::Element>().ok())
        .and_then(|el| el.closest(selector).ok().flatten())
        .is_some()
}

fn closest_element(target: Option<web::EventTarget>, selector: &str) -> Option<web::Element> {
    target?
        .dyn_into::<web::Element>()
        .ok()?
        .closest(selector)
        .ok()?
}

/// The `attr`-carrying ancestors of a pointer event's target and of the
/// element the pointer came from.
pub fn pointer_anchors(
    ev: &web::Event,
    attr: &str,
) -> (Option<web::Element>, Option<web::Element>) {
    let selector = format!("[{}]", attr);
    let over = closest_element(ev.target(), &selector);
    let from = ev
        .dyn_ref::<web::MouseEvent>()
        .and_then(|m| closest_element(m.related_target(), &selector));
    (over, from)
}

/// Value of `attr` on the event target or its nearest ancestor carrying it.
pub fn closest_attribute(ev: &web::Event, attr: &str) -> Option<String> {
    let target = ev.target()?.dyn_into::<web::Element>().ok()?;
    let el = target.closest(&format!("[{}]", attr)).ok()??;
    el.get_attribute(attr)
}

#[inline]
pub fn set_class(document: &web::Document, element_id: &str, class: &str, on: bool) {
    if let Some(el) = document.get_element_by_id(element_id) {
        _ = el.class_list().toggle_with_force(class, on);
    }
}
