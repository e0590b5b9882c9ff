use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ShellConfig;
use crate::env::{
    contains_element, Element, Env, Handle, Intersection, IntersectionWatch, WatchOptions,
};

pub const REVEALED_CLASS: &str = "revealed";
const STAGGER_MS: u32 = 100;

/// One-shot scroll reveal for every element matching the reveal marker.
pub struct RevealObserver {
    env: Env,
    selector: String,
    watch: RefCell<Option<Rc<dyn IntersectionWatch>>>,
    observed: RefCell<Vec<Element>>,
    timers: RefCell<Vec<Handle>>,
}

impl RevealObserver {
    pub fn new(env: Env, config: &ShellConfig) -> Rc<Self> {
        Rc::new(Self {
            env,
            selector: config.dom.reveal.clone(),
            watch: RefCell::new(None),
            observed: RefCell::new(Vec::new()),
            timers: RefCell::new(Vec::new()),
        })
    }

    pub fn init(self: &Rc<Self>) {
        let this = Rc::downgrade(self);
        let watch = self.env.intersection_watch(
            WatchOptions::default(),
            Rc::new(move |entries| {
                if let Some(this) = this.upgrade() {
                    this.on_intersections(entries);
                }
            }),
        );
        if watch.is_none() {
            log::debug!("intersection watching unavailable, revealing everything");
        }
        *self.watch.borrow_mut() = watch;
        self.observe_elements();
    }

    /// Picks up marked elements that are neither revealed nor already watched.
    /// Safe to call again after content is added. Returns how many were added.
    pub fn observe_elements(&self) -> usize {
        let pending: Vec<Element> = self
            .env
            .query_all(&self.selector)
            .into_iter()
            .filter(|el| !el.has_class(REVEALED_CLASS))
            .collect();

        let watch = self.watch.borrow().clone();
        let Some(watch) = watch else {
            let count = pending.len();
            pending.iter().for_each(reveal);
            return count;
        };

        let mut observed = self.observed.borrow_mut();
        let mut added = 0;
        for el in pending {
            if contains_element(&observed, &el) {
                continue;
            }
            watch.observe(&el);
            observed.push(el);
            added += 1;
        }
        added
    }

    /// Intersecting entries are staggered by their position within the batch.
    fn on_intersections(&self, entries: Vec<Intersection>) {
        let watch = self.watch.borrow().clone();
        let mut position = 0u32;
        for entry in entries.into_iter().filter(|e| e.is_intersecting) {
            let target = entry.target;
            {
                let mut observed = self.observed.borrow_mut();
                let before = observed.len();
                observed.retain(|el| !el.same_node(target.as_ref()));
                if observed.len() == before {
                    continue;
                }
            }
            if let Some(watch) = &watch {
                watch.unobserve(&target);
            }
            let delay = position * STAGGER_MS;
            position += 1;
            let timer = self.env.set_timeout(delay, Box::new(move || reveal(&target)));
            self.timers.borrow_mut().push(timer);
        }
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.observed.borrow().len()
    }

    pub fn destroy(&self) {
        if let Some(watch) = self.watch.borrow_mut().take() {
            watch.disconnect();
        }
        self.observed.borrow_mut().clear();
        self.timers.borrow_mut().clear();
    }
}

fn reveal(el: &Element) {
    el.add_class(REVEALED_CLASS);
}
