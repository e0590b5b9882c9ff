//! Capability layer between the page controllers and the browser.
//!
//! Controllers never touch `web_sys` directly. They receive an [`Env`] and
//! work with [`Element`] handles, which lets the whole shell run against the
//! in-memory fake in tests.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::error::Result;

pub mod browser;
#[cfg(test)]
pub mod fake;

pub type Env = Rc<dyn Environment>;
pub type Element = Rc<dyn Node>;
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// Registration returned by timers, frames, listeners and watches.
///
/// Dropping the handle cancels the registration. `forget` leaves it running.
pub struct Handle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Handle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn forget(mut self) {
        if let Some(cancel) = self.cancel.take() {
            // the cancel closure owns the registration, leak it
            std::mem::forget(cancel);
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionInfo {
    pub effective_type: String,
    pub save_data: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WatchOptions {
    pub threshold: f64,
    pub root_margin: String,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin: "0px 0px -50px 0px".to_string(),
        }
    }
}

pub struct Intersection {
    pub target: Element,
    pub is_intersecting: bool,
}

pub type IntersectionCallback = Rc<dyn Fn(Vec<Intersection>)>;

/// A viewport-intersection watch over any number of elements.
pub trait IntersectionWatch {
    fn observe(&self, target: &Element);
    fn unobserve(&self, target: &Element);
    fn disconnect(&self);
}

/// Event data handed to listeners, decoupled from the browser event type.
pub struct DomEvent {
    pub target: Option<Element>,
    pub key: Option<String>,
    pub client_x: f64,
    pub client_y: f64,
    default_prevented: Cell<bool>,
}

impl DomEvent {
    pub fn new(target: Option<Element>) -> Self {
        Self {
            target,
            key: None,
            client_x: 0.0,
            client_y: 0.0,
            default_prevented: Cell::new(false),
        }
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_pointer(mut self, x: f64, y: f64) -> Self {
        self.client_x = x;
        self.client_y = y;
        self
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Client key-value storage. Every access may fail (private mode, quota).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

pub trait Node {
    fn as_any(&self) -> &dyn Any;
    fn same_node(&self, other: &dyn Node) -> bool;
    /// True when `other` is this node or one of its descendants.
    fn contains(&self, other: &dyn Node) -> bool;

    fn attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&self, name: &str, value: &str);
    fn remove_attribute(&self, name: &str);

    fn has_class(&self, class: &str) -> bool;
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);
    /// Returns whether the class is present afterwards.
    fn toggle_class(&self, class: &str) -> bool;

    fn style(&self, property: &str) -> Option<String>;
    fn set_style(&self, property: &str, value: &str);
    fn remove_style(&self, property: &str);

    fn text(&self) -> String;

    fn append_child(&self, child: &Element) -> Result<()>;
    fn remove(&self);

    fn query(&self, selector: &str) -> Option<Element>;
    fn query_all(&self, selector: &str) -> Vec<Element>;

    /// Bounding box relative to the viewport.
    fn rect(&self) -> Rect;
    fn offset_height(&self) -> f64;

    fn listen(&self, event: &str, handler: Listener) -> Handle;
}

pub trait Environment {
    fn root(&self) -> Option<Element>;
    fn body(&self) -> Option<Element>;
    fn head(&self) -> Option<Element>;
    fn query(&self, selector: &str) -> Option<Element>;
    fn query_all(&self, selector: &str) -> Vec<Element>;
    fn create_element(&self, tag: &str) -> Result<Element>;

    fn viewport(&self) -> Viewport;
    fn scroll_y(&self) -> f64;
    /// Single smooth scroll to an absolute document offset.
    fn scroll_to(&self, top: f64);

    /// `None` when media queries are not supported.
    fn media_matches(&self, query: &str) -> Option<bool>;
    fn watch_media(&self, query: &str, handler: Rc<dyn Fn(bool)>) -> Option<Handle>;

    fn storage(&self) -> Option<Rc<dyn KeyValueStore>>;

    fn now_ms(&self) -> f64;
    fn random_seed(&self) -> u64;
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Handle;
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Handle;

    fn listen_window(&self, event: &str, handler: Listener) -> Handle;
    fn listen_document(&self, event: &str, handler: Listener) -> Handle;

    fn document_ready(&self) -> bool;
    fn document_hidden(&self) -> bool;

    /// `None` when the intersection primitive is not available.
    fn intersection_watch(
        &self,
        options: WatchOptions,
        callback: IntersectionCallback,
    ) -> Option<Rc<dyn IntersectionWatch>>;

    fn hardware_concurrency(&self) -> Option<u32>;
    fn connection(&self) -> Option<ConnectionInfo>;
}

pub fn contains_element(list: &[Element], element: &Element) -> bool {
    list.iter().any(|e| e.same_node(element.as_ref()))
}
