//! In-memory environment used by the unit tests.
//!
//! Keeps a small element tree, a virtual clock for timers, a manually ticked
//! frame queue and intersection watches that only fire when a test calls
//! [`FakeEnv::intersect`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use super::{
    ConnectionInfo, DomEvent, Element, Env, Environment, Handle, Intersection,
    IntersectionCallback, IntersectionWatch, KeyValueStore, Listener, Node, Rect, Viewport,
    WatchOptions,
};
use crate::error::{Result, ShellError};

pub struct FakeNode {
    tag: String,
    this: Weak<FakeNode>,
    attrs: RefCell<BTreeMap<String, String>>,
    classes: RefCell<Vec<String>>,
    styles: RefCell<BTreeMap<String, String>>,
    text: RefCell<String>,
    children: RefCell<Vec<Rc<FakeNode>>>,
    parent: RefCell<Weak<FakeNode>>,
    listeners: Rc<RefCell<Vec<(u64, String, Listener)>>>,
    next_listener: Cell<u64>,
    rect: Cell<Rect>,
    offset_height: Cell<f64>,
}

impl FakeNode {
    fn create(tag: &str) -> Rc<FakeNode> {
        Rc::new_cyclic(|this| FakeNode {
            tag: tag.to_ascii_lowercase(),
            this: this.clone(),
            attrs: RefCell::new(BTreeMap::new()),
            classes: RefCell::new(Vec::new()),
            styles: RefCell::new(BTreeMap::new()),
            text: RefCell::new(String::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(0),
            rect: Cell::new(Rect::default()),
            offset_height: Cell::new(0.0),
        })
    }

    fn rc(&self) -> Rc<FakeNode> {
        self.this.upgrade().expect("fake node alive")
    }

    fn parent(&self) -> Option<Rc<FakeNode>> {
        self.parent.borrow().upgrade()
    }

    pub fn set_rect(&self, rect: Rect) {
        self.rect.set(rect);
    }

    pub fn set_offset_height(&self, height: f64) {
        self.offset_height.set(height);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn descendants(&self, out: &mut Vec<Rc<FakeNode>>) {
        for child in self.children.borrow().iter() {
            out.push(child.clone());
            child.descendants(out);
        }
    }

    fn matches(&self, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .any(|compound| self.matches_compound(compound))
    }

    fn matches_compound(&self, compound: &str) -> bool {
        let mut rest = compound;
        let tag_end = rest.find(|c| c == '#' || c == '.' || c == '[').unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" && !tag.eq_ignore_ascii_case(&self.tag) {
            return false;
        }
        rest = &rest[tag_end..];

        while !rest.is_empty() {
            let kind = rest.as_bytes()[0];
            if kind == b'[' {
                let Some(close) = rest.find(']') else { return false };
                if !self.matches_attribute(&rest[1..close]) {
                    return false;
                }
                rest = &rest[close + 1..];
                continue;
            }
            let body = &rest[1..];
            let end = body.find(|c| c == '#' || c == '.' || c == '[').unwrap_or(body.len());
            let name = &body[..end];
            let ok = match kind {
                b'#' => self.attrs.borrow().get("id").map(String::as_str) == Some(name),
                b'.' => self.has_class(name),
                _ => false,
            };
            if !ok {
                return false;
            }
            rest = &body[end..];
        }
        true
    }

    fn matches_attribute(&self, expr: &str) -> bool {
        let attrs = self.attrs.borrow();
        if let Some((name, value)) = expr.split_once("^=") {
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            return attrs.get(name).map(|v| v.starts_with(value)).unwrap_or(false);
        }
        if let Some((name, value)) = expr.split_once('=') {
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            return attrs.get(name).map(|v| v == value).unwrap_or(false);
        }
        attrs.contains_key(expr) || (expr == "class" && !self.classes.borrow().is_empty())
    }
}

fn fake(node: &dyn Node) -> Option<&FakeNode> {
    node.as_any().downcast_ref::<FakeNode>()
}

pub fn as_fake(element: &Element) -> &FakeNode {
    fake(element.as_ref()).expect("fake element")
}

impl Node for FakeNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_node(&self, other: &dyn Node) -> bool {
        fake(other).map(|o| std::ptr::eq(self, o)).unwrap_or(false)
    }

    fn contains(&self, other: &dyn Node) -> bool {
        let Some(mut cursor) = fake(other).map(FakeNode::rc) else {
            return false;
        };
        loop {
            if std::ptr::eq(self, cursor.as_ref()) {
                return true;
            }
            match cursor.parent() {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            let classes = self.classes.borrow();
            return (!classes.is_empty()).then(|| classes.join(" "));
        }
        self.attrs.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if name == "class" {
            *self.classes.borrow_mut() = value.split_whitespace().map(String::from).collect();
            return;
        }
        self.attrs.borrow_mut().insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, name: &str) {
        if name == "class" {
            self.classes.borrow_mut().clear();
            return;
        }
        self.attrs.borrow_mut().remove(name);
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().iter().any(|c| c == class)
    }

    fn add_class(&self, class: &str) {
        if !self.has_class(class) {
            self.classes.borrow_mut().push(class.to_string());
        }
    }

    fn remove_class(&self, class: &str) {
        self.classes.borrow_mut().retain(|c| c != class);
    }

    fn toggle_class(&self, class: &str) -> bool {
        if self.has_class(class) {
            self.remove_class(class);
            false
        } else {
            self.add_class(class);
            true
        }
    }

    fn style(&self, property: &str) -> Option<String> {
        self.styles.borrow().get(property).cloned()
    }

    fn set_style(&self, property: &str, value: &str) {
        self.styles.borrow_mut().insert(property.to_string(), value.to_string());
    }

    fn remove_style(&self, property: &str) {
        self.styles.borrow_mut().remove(property);
    }

    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn append_child(&self, child: &Element) -> Result<()> {
        let child = fake(child.as_ref())
            .ok_or_else(|| ShellError::Dom("foreign node".to_string()))?
            .rc();
        child.remove();
        *child.parent.borrow_mut() = self.this.clone();
        self.children.borrow_mut().push(child);
        Ok(())
    }

    fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent.children.borrow_mut().retain(|c| !std::ptr::eq(c.as_ref(), self));
        }
        *self.parent.borrow_mut() = Weak::new();
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.query_all(selector).into_iter().next()
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        let mut all = Vec::new();
        self.descendants(&mut all);
        all.into_iter()
            .filter(|n| n.matches(selector))
            .map(|n| n as Element)
            .collect()
    }

    fn rect(&self) -> Rect {
        self.rect.get()
    }

    fn offset_height(&self) -> f64 {
        self.offset_height.get()
    }

    fn listen(&self, event: &str, handler: Listener) -> Handle {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, event.to_string(), handler));
        let listeners = Rc::downgrade(&self.listeners);
        Handle::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().retain(|(lid, _, _)| *lid != id);
            }
        })
    }
}

#[derive(Default)]
pub struct FakeStorage {
    items: RefCell<HashMap<String, String>>,
    failing: Cell<bool>,
}

impl FakeStorage {
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn check(&self) -> Result<()> {
        if self.failing.get() {
            Err(ShellError::StorageUnavailable)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FakeStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.item(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.insert(key, value);
        Ok(())
    }
}

pub struct FakeWatch {
    callback: IntersectionCallback,
    observed: RefCell<Vec<Element>>,
    disconnected: Cell<bool>,
}

impl FakeWatch {
    fn observes(&self, target: &Element) -> bool {
        !self.disconnected.get() && super::contains_element(&self.observed.borrow(), target)
    }
}

impl IntersectionWatch for FakeWatch {
    fn observe(&self, target: &Element) {
        if !super::contains_element(&self.observed.borrow(), target) {
            self.observed.borrow_mut().push(target.clone());
        }
    }

    fn unobserve(&self, target: &Element) {
        self.observed.borrow_mut().retain(|e| !e.same_node(target.as_ref()));
    }

    fn disconnect(&self) {
        self.disconnected.set(true);
        self.observed.borrow_mut().clear();
    }
}

struct FakeTimer {
    id: u64,
    due: f64,
    callback: Box<dyn FnOnce()>,
}

type MediaWatchers = Rc<RefCell<Vec<(u64, String, Rc<dyn Fn(bool)>)>>>;
type ListenerTable = Rc<RefCell<Vec<(u64, String, Listener)>>>;

pub struct FakeEnv {
    html: Rc<FakeNode>,
    head: Rc<FakeNode>,
    body: Rc<FakeNode>,
    has_root: Cell<bool>,
    viewport: Cell<Viewport>,
    scroll_y: Cell<f64>,
    scrolls: RefCell<Vec<f64>>,
    media: RefCell<HashMap<String, bool>>,
    media_supported: Cell<bool>,
    media_watchers: MediaWatchers,
    storage: Rc<FakeStorage>,
    storage_present: Cell<bool>,
    clock: Cell<f64>,
    next_id: Cell<u64>,
    timers: Rc<RefCell<Vec<FakeTimer>>>,
    frames: Rc<RefCell<Vec<(u64, Box<dyn FnOnce(f64)>)>>>,
    window_listeners: ListenerTable,
    document_listeners: ListenerTable,
    ready: Cell<bool>,
    hidden: Cell<bool>,
    intersection_supported: Cell<bool>,
    watches: RefCell<Vec<Rc<FakeWatch>>>,
    concurrency: Cell<Option<u32>>,
    connection: RefCell<Option<ConnectionInfo>>,
    seed: Cell<u64>,
    creations_left: Cell<Option<usize>>,
}

impl FakeEnv {
    pub fn new() -> Rc<FakeEnv> {
        let html = FakeNode::create("html");
        let head = FakeNode::create("head");
        let body = FakeNode::create("body");
        let _ = html.append_child(&(head.clone() as Element));
        let _ = html.append_child(&(body.clone() as Element));
        Rc::new(FakeEnv {
            html,
            head,
            body,
            has_root: Cell::new(true),
            viewport: Cell::new(Viewport {
                width: 1200.0,
                height: 800.0,
            }),
            scroll_y: Cell::new(0.0),
            scrolls: RefCell::new(Vec::new()),
            media: RefCell::new(HashMap::new()),
            media_supported: Cell::new(true),
            media_watchers: Rc::new(RefCell::new(Vec::new())),
            storage: Rc::new(FakeStorage::default()),
            storage_present: Cell::new(true),
            clock: Cell::new(0.0),
            next_id: Cell::new(0),
            timers: Rc::new(RefCell::new(Vec::new())),
            frames: Rc::new(RefCell::new(Vec::new())),
            window_listeners: Rc::new(RefCell::new(Vec::new())),
            document_listeners: Rc::new(RefCell::new(Vec::new())),
            ready: Cell::new(true),
            hidden: Cell::new(false),
            intersection_supported: Cell::new(true),
            watches: RefCell::new(Vec::new()),
            concurrency: Cell::new(Some(8)),
            connection: RefCell::new(None),
            seed: Cell::new(7),
            creations_left: Cell::new(None),
        })
    }

    pub fn env(self: &Rc<Self>) -> Env {
        self.clone()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Creates an element under `parent`. A `class` attribute sets the class list.
    pub fn add(&self, parent: &Element, tag: &str, attrs: &[(&str, &str)]) -> Element {
        let node = FakeNode::create(tag) as Element;
        for (name, value) in attrs {
            node.set_attribute(name, value);
        }
        parent.append_child(&node).expect("append fake child");
        node
    }

    pub fn add_to_body(&self, tag: &str, attrs: &[(&str, &str)]) -> Element {
        let body = self.body.clone() as Element;
        self.add(&body, tag, attrs)
    }

    pub fn html(&self) -> Element {
        self.html.clone()
    }

    pub fn body_el(&self) -> Element {
        self.body.clone()
    }

    pub fn head_el(&self) -> Element {
        self.head.clone()
    }

    pub fn remove_root(&self) {
        self.has_root.set(false);
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.viewport.set(Viewport { width, height });
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.scroll_y.set(y);
    }

    pub fn scrolls(&self) -> Vec<f64> {
        self.scrolls.borrow().clone()
    }

    pub fn set_media(&self, query: &str, matches: bool) {
        self.media.borrow_mut().insert(query.to_string(), matches);
        let watchers: Vec<_> = self
            .media_watchers
            .borrow()
            .iter()
            .filter(|(_, q, _)| q == query)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in watchers {
            handler(matches);
        }
    }

    pub fn disable_media_queries(&self) {
        self.media_supported.set(false);
    }

    pub fn storage(&self) -> Rc<FakeStorage> {
        self.storage.clone()
    }

    pub fn remove_storage(&self) {
        self.storage_present.set(false);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    pub fn disable_intersection(&self) {
        self.intersection_supported.set(false);
    }

    pub fn set_concurrency(&self, cores: Option<u32>) {
        self.concurrency.set(cores);
    }

    pub fn set_connection(&self, effective_type: &str, save_data: bool) {
        *self.connection.borrow_mut() = Some(ConnectionInfo {
            effective_type: effective_type.to_string(),
            save_data,
        });
    }

    pub fn set_seed(&self, seed: u64) {
        self.seed.set(seed);
    }

    /// `create_element` succeeds `count` more times, then fails.
    pub fn fail_element_creation_after(&self, count: usize) {
        self.creations_left.set(Some(count));
    }

    pub fn allow_element_creation(&self) {
        self.creations_left.set(None);
    }

    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn window_listener_count(&self) -> usize {
        self.window_listeners.borrow().len()
    }

    pub fn document_listener_count(&self) -> usize {
        self.document_listeners.borrow().len()
    }

    /// Moves the virtual clock forward, running every timer that comes due.
    pub fn advance(&self, ms: f64) {
        let target = self.clock.get() + ms;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let index = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
                    .map(|(i, _)| i);
                index.map(|i| timers.remove(i))
            };
            let Some(timer) = next else { break };
            self.clock.set(timer.due.max(self.clock.get()));
            (timer.callback)();
        }
        self.clock.set(target);
    }

    /// Runs every frame callback queued before this call.
    pub fn tick_frame(&self) {
        self.clock.set(self.clock.get() + 16.0);
        let frames: Vec<_> = self.frames.borrow_mut().drain(..).collect();
        let ts = self.clock.get();
        for (_, callback) in frames {
            callback(ts);
        }
    }

    /// Dispatches an event at `target`, bubbling to ancestors and then the document.
    pub fn dispatch(&self, target: &Element, name: &str, event: DomEvent) -> DomEvent {
        let mut cursor = Some(as_fake(target).rc());
        while let Some(node) = cursor {
            let handlers: Vec<Listener> = node
                .listeners
                .borrow()
                .iter()
                .filter(|(_, n, _)| n == name)
                .map(|(_, _, h)| h.clone())
                .collect();
            for handler in handlers {
                handler(&event);
            }
            cursor = node.parent();
        }
        self.dispatch_document(name, &event);
        event
    }

    pub fn click(&self, target: &Element) -> DomEvent {
        self.dispatch(target, "click", DomEvent::new(Some(target.clone())))
    }

    pub fn dispatch_document(&self, name: &str, event: &DomEvent) {
        let handlers: Vec<Listener> = self
            .document_listeners
            .borrow()
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn press_key(&self, key: &str) {
        let target = self.body.clone() as Element;
        self.dispatch(&target, "keydown", DomEvent::new(Some(target.clone())).with_key(key));
    }

    pub fn fire_window(&self, name: &str) {
        let event = DomEvent::new(None);
        let handlers: Vec<Listener> = self
            .window_listeners
            .borrow()
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }

    /// Reports `targets` as intersecting to every watch observing them.
    pub fn intersect(&self, targets: &[Element]) {
        let watches: Vec<_> = self.watches.borrow().clone();
        for watch in watches {
            let batch: Vec<Intersection> = targets
                .iter()
                .filter(|t| watch.observes(t))
                .map(|t| Intersection {
                    target: t.clone(),
                    is_intersecting: true,
                })
                .collect();
            if !batch.is_empty() {
                (watch.callback)(batch);
            }
        }
    }

    pub fn observed_count(&self) -> usize {
        self.watches
            .borrow()
            .iter()
            .filter(|w| !w.disconnected.get())
            .map(|w| w.observed.borrow().len())
            .sum()
    }

    fn listen_table(&self, table: &ListenerTable, event: &str, handler: Listener) -> Handle {
        let id = self.next_id();
        table.borrow_mut().push((id, event.to_string(), handler));
        let table = Rc::downgrade(table);
        Handle::new(move || {
            if let Some(table) = table.upgrade() {
                table.borrow_mut().retain(|(lid, _, _)| *lid != id);
            }
        })
    }
}

impl Environment for FakeEnv {
    fn root(&self) -> Option<Element> {
        self.has_root.get().then(|| self.html.clone() as Element)
    }

    fn body(&self) -> Option<Element> {
        Some(self.body.clone())
    }

    fn head(&self) -> Option<Element> {
        Some(self.head.clone())
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.query_all(selector).into_iter().next()
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        let mut matches = Vec::new();
        if self.html.matches(selector) {
            matches.push(self.html.clone() as Element);
        }
        matches.extend(self.html.query_all(selector));
        matches
    }

    fn create_element(&self, tag: &str) -> Result<Element> {
        match self.creations_left.get() {
            Some(0) => return Err(ShellError::CreateElement(tag.to_string())),
            Some(left) => self.creations_left.set(Some(left - 1)),
            None => {}
        }
        Ok(FakeNode::create(tag))
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn scroll_to(&self, top: f64) {
        self.scrolls.borrow_mut().push(top);
    }

    fn media_matches(&self, query: &str) -> Option<bool> {
        if !self.media_supported.get() {
            return None;
        }
        Some(self.media.borrow().get(query).copied().unwrap_or(false))
    }

    fn watch_media(&self, query: &str, handler: Rc<dyn Fn(bool)>) -> Option<Handle> {
        if !self.media_supported.get() {
            return None;
        }
        let id = self.next_id();
        self.media_watchers
            .borrow_mut()
            .push((id, query.to_string(), handler));
        let watchers = Rc::downgrade(&self.media_watchers);
        Some(Handle::new(move || {
            if let Some(watchers) = watchers.upgrade() {
                watchers.borrow_mut().retain(|(wid, _, _)| *wid != id);
            }
        }))
    }

    fn storage(&self) -> Option<Rc<dyn KeyValueStore>> {
        self.storage_present
            .get()
            .then(|| self.storage.clone() as Rc<dyn KeyValueStore>)
    }

    fn now_ms(&self) -> f64 {
        self.clock.get()
    }

    fn random_seed(&self) -> u64 {
        self.seed.get()
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Handle {
        let id = self.next_id();
        self.timers.borrow_mut().push(FakeTimer {
            id,
            due: self.clock.get() + delay_ms as f64,
            callback,
        });
        let timers = Rc::downgrade(&self.timers);
        Handle::new(move || {
            if let Some(timers) = timers.upgrade() {
                timers.borrow_mut().retain(|t| t.id != id);
            }
        })
    }

    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Handle {
        let id = self.next_id();
        self.frames.borrow_mut().push((id, callback));
        let frames = Rc::downgrade(&self.frames);
        Handle::new(move || {
            if let Some(frames) = frames.upgrade() {
                frames.borrow_mut().retain(|(fid, _)| *fid != id);
            }
        })
    }

    fn listen_window(&self, event: &str, handler: Listener) -> Handle {
        self.listen_table(&self.window_listeners, event, handler)
    }

    fn listen_document(&self, event: &str, handler: Listener) -> Handle {
        self.listen_table(&self.document_listeners, event, handler)
    }

    fn document_ready(&self) -> bool {
        self.ready.get()
    }

    fn document_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn intersection_watch(
        &self,
        _options: WatchOptions,
        callback: IntersectionCallback,
    ) -> Option<Rc<dyn IntersectionWatch>> {
        if !self.intersection_supported.get() {
            return None;
        }
        let watch = Rc::new(FakeWatch {
            callback,
            observed: RefCell::new(Vec::new()),
            disconnected: Cell::new(false),
        });
        self.watches.borrow_mut().push(watch.clone());
        Some(watch)
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        self.concurrency.get()
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.connection.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_ids_classes_and_attributes() {
        let env = FakeEnv::new();
        let a = env.add_to_body("a", &[("href", "#about"), ("class", "nav-link active")]);
        env.add_to_body("div", &[("id", "sidebar")]);

        assert_eq!(env.query_all(".nav-link").len(), 1);
        assert_eq!(env.query_all("a[href^='#']").len(), 1);
        assert_eq!(env.query_all("a.nav-link.active").len(), 1);
        assert!(env.query("#sidebar").is_some());
        assert_eq!(env.query_all("#sidebar, .nav-link").len(), 2);
        assert!(a.same_node(env.query("a").unwrap().as_ref()));
    }

    #[test]
    fn timers_run_in_due_order_and_cancel_on_drop() {
        let env = FakeEnv::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        env.set_timeout(200, Box::new(move || l.borrow_mut().push(200))).forget();
        let l = log.clone();
        env.set_timeout(100, Box::new(move || l.borrow_mut().push(100))).forget();
        let l = log.clone();
        let dropped = env.set_timeout(50, Box::new(move || l.borrow_mut().push(50)));
        drop(dropped);

        env.advance(150.0);
        assert_eq!(*log.borrow(), vec![100]);
        env.advance(100.0);
        assert_eq!(*log.borrow(), vec![100, 200]);
    }

    #[test]
    fn events_bubble_to_document() {
        let env = FakeEnv::new();
        let card = env.add_to_body("div", &[("class", "card")]);
        let inner = env.add(&card, "span", &[]);
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let _card = card.listen("click", Rc::new(move |_| h.set(h.get() + 1)));
        let h = hits.clone();
        let _doc = env.listen_document("click", Rc::new(move |_| h.set(h.get() + 10)));

        env.click(&inner);
        assert_eq!(hits.get(), 11);
    }
}
