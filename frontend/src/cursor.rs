use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ShellConfig;
use crate::env::{DomEvent, Element, Env, Handle};
use crate::frame::FrameLoop;

const RING_RATE: f64 = 0.1;
const DOT_RATE: f64 = 0.15;
const HOVER_SCALE: &str = "translate(-50%, -50%) scale(1.5)";
const REST_SCALE: &str = "translate(-50%, -50%) scale(1)";
const HOVER_OPACITY: &str = "0.5";
const REST_OPACITY: &str = "1";

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Exponential smoothing step towards `target`.
    pub fn approach(self, target: Point, rate: f64) -> Point {
        Point {
            x: self.x + (target.x - self.x) * rate,
            y: self.y + (target.y - self.y) * rate,
        }
    }
}

#[derive(Default)]
struct Tracking {
    pointer: Point,
    ring: Point,
    dot: Point,
}

/// Custom cursor: a ring and a dot chasing the pointer at different rates.
pub struct CursorFollower {
    env: Env,
    ring: Option<Element>,
    dot: Option<Element>,
    interactive: String,
    breakpoint: f64,
    tracking: Rc<RefCell<Tracking>>,
    frames: FrameLoop,
    listeners: RefCell<Vec<Handle>>,
}

impl CursorFollower {
    pub fn new(env: Env, config: &ShellConfig) -> Self {
        Self {
            ring: env.query(&config.dom.cursor_ring),
            dot: env.query(&config.dom.cursor_dot),
            interactive: config.dom.interactive.clone(),
            breakpoint: config.mobile_breakpoint,
            tracking: Rc::new(RefCell::new(Tracking::default())),
            frames: FrameLoop::new(env.clone()),
            listeners: RefCell::new(Vec::new()),
            env,
        }
    }

    /// Returns false when the cursor stays disabled (touch-sized viewport or
    /// missing markers).
    pub fn init(&self) -> bool {
        let (Some(ring), Some(dot)) = (self.ring.clone(), self.dot.clone()) else {
            return false;
        };
        if self.env.viewport().width <= self.breakpoint {
            return false;
        }

        let mut listeners = self.listeners.borrow_mut();
        let tracking = self.tracking.clone();
        listeners.push(self.env.listen_document(
            "mousemove",
            Rc::new(move |e: &DomEvent| {
                tracking.borrow_mut().pointer = Point {
                    x: e.client_x,
                    y: e.client_y,
                };
            }),
        ));

        for target in self.env.query_all(&self.interactive) {
            let r = ring.clone();
            listeners.push(target.listen(
                "mouseenter",
                Rc::new(move |_: &DomEvent| {
                    r.set_style("transform", HOVER_SCALE);
                    r.set_style("opacity", HOVER_OPACITY);
                }),
            ));
            let r = ring.clone();
            listeners.push(target.listen(
                "mouseleave",
                Rc::new(move |_: &DomEvent| {
                    r.set_style("transform", REST_SCALE);
                    r.set_style("opacity", REST_OPACITY);
                }),
            ));
        }

        let tracking = self.tracking.clone();
        self.frames.start(move |_| {
            let mut t = tracking.borrow_mut();
            t.ring = t.ring.approach(t.pointer, RING_RATE);
            t.dot = t.dot.approach(t.pointer, DOT_RATE);
            place(&ring, t.ring);
            place(&dot, t.dot);
        });
        true
    }

    #[cfg(test)]
    pub fn positions(&self) -> (Point, Point) {
        let t = self.tracking.borrow();
        (t.ring, t.dot)
    }

    pub fn destroy(&self) {
        self.frames.stop();
        self.listeners.borrow_mut().clear();
    }
}

fn place(marker: &Element, at: Point) {
    marker.set_style("left", &format!("{:.2}px", at.x));
    marker.set_style("top", &format!("{:.2}px", at.y));
}
