use std::any::Any;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use js_sys::Reflect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    window, Document, EventTarget, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, KeyboardEvent, MediaQueryListEvent,
    MouseEvent, ScrollBehavior, ScrollToOptions, Storage, VisibilityState, Window,
};

use super::{
    ConnectionInfo, DomEvent, Element, Environment, Handle, Intersection, IntersectionCallback,
    IntersectionWatch, KeyValueStore, Listener, Node, Rect, Viewport, WatchOptions,
};
use crate::error::{Result, ShellError};

fn js_err(err: JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

pub struct BrowserEnv {
    window: Window,
    document: Document,
}

impl BrowserEnv {
    pub fn new() -> Result<Self> {
        let window = window().ok_or_else(|| ShellError::Dom("no global window".to_string()))?;
        let document = window
            .document()
            .ok_or(ShellError::MissingElement("document"))?;
        Ok(Self { window, document })
    }
}

struct BrowserNode {
    element: web_sys::Element,
}

fn wrap(element: web_sys::Element) -> Element {
    Rc::new(BrowserNode { element })
}

fn downcast(node: &dyn Node) -> Option<&BrowserNode> {
    node.as_any().downcast_ref::<BrowserNode>()
}

impl BrowserNode {
    fn html(&self) -> Option<&HtmlElement> {
        self.element.dyn_ref::<HtmlElement>()
    }
}

impl Node for BrowserNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_node(&self, other: &dyn Node) -> bool {
        downcast(other)
            .map(|o| self.element.is_same_node(Some(o.element.as_ref())))
            .unwrap_or(false)
    }

    fn contains(&self, other: &dyn Node) -> bool {
        downcast(other)
            .map(|o| self.element.contains(Some(o.element.as_ref())))
            .unwrap_or(false)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.element.get_attribute(name)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let _ = self.element.set_attribute(name, value);
    }

    fn remove_attribute(&self, name: &str) {
        let _ = self.element.remove_attribute(name);
    }

    fn has_class(&self, class: &str) -> bool {
        self.element.class_list().contains(class)
    }

    fn add_class(&self, class: &str) {
        let _ = self.element.class_list().add_1(class);
    }

    fn remove_class(&self, class: &str) {
        let _ = self.element.class_list().remove_1(class);
    }

    fn toggle_class(&self, class: &str) -> bool {
        self.element.class_list().toggle(class).unwrap_or(false)
    }

    fn style(&self, property: &str) -> Option<String> {
        self.html()
            .and_then(|h| h.style().get_property_value(property).ok())
            .filter(|v| !v.is_empty())
    }

    fn set_style(&self, property: &str, value: &str) {
        if let Some(html) = self.html() {
            let _ = html.style().set_property(property, value);
        }
    }

    fn remove_style(&self, property: &str) {
        if let Some(html) = self.html() {
            let _ = html.style().remove_property(property);
        }
    }

    fn text(&self) -> String {
        self.element.text_content().unwrap_or_default()
    }

    fn append_child(&self, child: &Element) -> Result<()> {
        let child = downcast(child.as_ref())
            .ok_or_else(|| ShellError::Dom("foreign node".to_string()))?;
        self.element
            .append_child(child.element.as_ref())
            .map(|_| ())
            .map_err(|e| ShellError::Dom(js_err(e)))
    }

    fn remove(&self) {
        self.element.remove();
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.element.query_selector(selector).ok().flatten().map(wrap)
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        match self.element.query_selector_all(selector) {
            Ok(list) => collect_nodes(&list),
            Err(_) => Vec::new(),
        }
    }

    fn rect(&self) -> Rect {
        let r = self.element.get_bounding_client_rect();
        Rect {
            left: r.left(),
            top: r.top(),
            width: r.width(),
            height: r.height(),
        }
    }

    fn offset_height(&self) -> f64 {
        self.html().map(|h| h.offset_height() as f64).unwrap_or(0.0)
    }

    fn listen(&self, event: &str, handler: Listener) -> Handle {
        listen_on(self.element.as_ref(), event, handler)
    }
}

fn collect_nodes(list: &web_sys::NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|n| n.dyn_into::<web_sys::Element>().ok())
        .map(wrap)
        .collect()
}

fn convert_event(event: &web_sys::Event) -> DomEvent {
    let target = event
        .target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(wrap);
    let mut dom_event = DomEvent::new(target);
    if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
        dom_event = dom_event.with_key(&key.key());
    }
    if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
        dom_event = dom_event.with_pointer(mouse.client_x() as f64, mouse.client_y() as f64);
    }
    dom_event
}

fn listen_on(target: &EventTarget, event: &str, handler: Listener) -> Handle {
    let callback = Closure::wrap(Box::new(move |e: web_sys::Event| {
        let dom_event = convert_event(&e);
        handler(&dom_event);
        if dom_event.default_prevented() {
            e.prevent_default();
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    if target
        .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        .is_err()
    {
        log::warn!("failed to attach {} listener", event);
        return Handle::noop();
    }

    let target = target.clone();
    let event = event.to_string();
    Handle::new(move || {
        let _ = target
            .remove_event_listener_with_callback(&event, callback.as_ref().unchecked_ref());
    })
}

struct BrowserStorage(Storage);

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get_item(key).map_err(|e| ShellError::Storage(js_err(e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.0.set_item(key, value).map_err(|e| ShellError::Storage(js_err(e)))
    }
}

struct BrowserWatch {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
}

impl IntersectionWatch for BrowserWatch {
    fn observe(&self, target: &Element) {
        if let Some(node) = downcast(target.as_ref()) {
            self.observer.observe(&node.element);
        }
    }

    fn unobserve(&self, target: &Element) {
        if let Some(node) = downcast(target.as_ref()) {
            self.observer.unobserve(&node.element);
        }
    }

    fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for BrowserWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl Environment for BrowserEnv {
    fn root(&self) -> Option<Element> {
        self.document.document_element().map(wrap)
    }

    fn body(&self) -> Option<Element> {
        self.document.body().map(|b| wrap(b.into()))
    }

    fn head(&self) -> Option<Element> {
        self.document.head().map(|h| wrap(h.into()))
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten().map(wrap)
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        match self.document.query_selector_all(selector) {
            Ok(list) => collect_nodes(&list),
            Err(_) => Vec::new(),
        }
    }

    fn create_element(&self, tag: &str) -> Result<Element> {
        self.document
            .create_element(tag)
            .map(wrap)
            .map_err(|_| ShellError::CreateElement(tag.to_string()))
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0),
            height: self.window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0),
        }
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn scroll_to(&self, top: f64) {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(ScrollBehavior::Smooth);
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn media_matches(&self, query: &str) -> Option<bool> {
        self.window.match_media(query).ok().flatten().map(|m| m.matches())
    }

    fn watch_media(&self, query: &str, handler: Rc<dyn Fn(bool)>) -> Option<Handle> {
        let list = self.window.match_media(query).ok().flatten()?;
        let callback = Closure::wrap(Box::new(move |e: MediaQueryListEvent| {
            handler(e.matches());
        }) as Box<dyn FnMut(MediaQueryListEvent)>);
        list.add_event_listener_with_callback("change", callback.as_ref().unchecked_ref())
            .ok()?;
        Some(Handle::new(move || {
            let _ = list
                .remove_event_listener_with_callback("change", callback.as_ref().unchecked_ref());
        }))
    }

    fn storage(&self) -> Option<Rc<dyn KeyValueStore>> {
        self.window
            .local_storage()
            .ok()
            .flatten()
            .map(|s| Rc::new(BrowserStorage(s)) as Rc<dyn KeyValueStore>)
    }

    fn now_ms(&self) -> f64 {
        self.window
            .performance()
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    fn random_seed(&self) -> u64 {
        let high = (js_sys::Math::random() * u32::MAX as f64) as u64;
        let low = (js_sys::Math::random() * u32::MAX as f64) as u64;
        (high << 32) | low
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Handle {
        let timeout = Timeout::new(delay_ms, callback);
        Handle::new(move || drop(timeout))
    }

    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Handle {
        let closure: Closure<dyn FnMut(f64)> = Closure::once(move |ts: f64| callback(ts));
        match self.window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            Ok(id) => {
                let window = self.window.clone();
                Handle::new(move || {
                    let _ = window.cancel_animation_frame(id);
                    drop(closure);
                })
            }
            Err(e) => {
                log::warn!("requestAnimationFrame failed: {}", js_err(e));
                Handle::noop()
            }
        }
    }

    fn listen_window(&self, event: &str, handler: Listener) -> Handle {
        listen_on(self.window.as_ref(), event, handler)
    }

    fn listen_document(&self, event: &str, handler: Listener) -> Handle {
        listen_on(self.document.as_ref(), event, handler)
    }

    fn document_ready(&self) -> bool {
        self.document.ready_state() != "loading"
    }

    fn document_hidden(&self) -> bool {
        self.document.visibility_state() == VisibilityState::Hidden
    }

    fn intersection_watch(
        &self,
        options: WatchOptions,
        callback: IntersectionCallback,
    ) -> Option<Rc<dyn IntersectionWatch>> {
        let supported = Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver"))
            .unwrap_or(false);
        if !supported {
            return None;
        }

        let on_entries = move |entries: js_sys::Array, _: IntersectionObserver| {
            let batch = entries
                .iter()
                .filter_map(|e| e.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|e| Intersection {
                    target: wrap(e.target()),
                    is_intersecting: e.is_intersecting(),
                })
                .collect();
            callback(batch);
        };
        let js_callback = Closure::wrap(
            Box::new(on_entries) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>
        );

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(options.threshold));
        init.set_root_margin(&options.root_margin);
        let observer = IntersectionObserver::new_with_options(
            js_callback.as_ref().unchecked_ref(),
            &init,
        )
        .ok()?;

        Some(Rc::new(BrowserWatch {
            observer,
            _callback: js_callback,
        }))
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        let cores = self.window.navigator().hardware_concurrency();
        (cores > 0.0).then(|| cores as u32)
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        let navigator = self.window.navigator();
        let connection = Reflect::get(&navigator, &JsValue::from_str("connection")).ok()?;
        if connection.is_undefined() || connection.is_null() {
            return None;
        }
        let effective_type = Reflect::get(&connection, &JsValue::from_str("effectiveType"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        let save_data = Reflect::get(&connection, &JsValue::from_str("saveData"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Some(ConnectionInfo {
            effective_type,
            save_data,
        })
    }
}
