use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::config::ShellConfig;
use crate::env::{DomEvent, Element, Env, Handle};
use crate::shell::ShellState;
use crate::theme::{theme_of, Theme};

const AUTO_CLOSE_MS: u32 = 300;
const SCROLL_THROTTLE_MS: u32 = 100;
const OPEN_CLASS: &str = "active";
const ACTIVE_LINK_CLASS: &str = "active";

struct HeaderStyle {
    background: &'static str,
    shadow: &'static str,
}

fn header_style(theme: Theme, scrolled: bool) -> HeaderStyle {
    match (theme, scrolled) {
        (Theme::Dark, true) => HeaderStyle {
            background: "rgba(15, 23, 42, 0.98)",
            shadow: "0 2px 20px rgba(0, 0, 0, 0.3)",
        },
        (Theme::Dark, false) => HeaderStyle {
            background: "rgba(15, 23, 42, 0.95)",
            shadow: "none",
        },
        (Theme::Light, true) => HeaderStyle {
            background: "rgba(255, 255, 255, 0.98)",
            shadow: "0 2px 20px rgba(0, 0, 0, 0.1)",
        },
        (Theme::Light, false) => HeaderStyle {
            background: "rgba(255, 255, 255, 0.95)",
            shadow: "none",
        },
    }
}

/// Slide-in menu, in-page anchor scrolling and the scroll-aware header.
pub struct NavigationController {
    env: Env,
    state: Rc<ShellState>,
    menu_button: Option<Element>,
    sidebar: Option<Element>,
    close_button: Option<Element>,
    header: Option<Element>,
    scroll_indicator: Option<Element>,
    nav_links: Vec<Element>,
    gutter: f64,
    threshold: f64,
    breakpoint: f64,
    saved_overflow: RefCell<Option<String>>,
    listeners: RefCell<Vec<Handle>>,
    close_timer: RefCell<Option<Handle>>,
    throttle: RefCell<Option<Handle>>,
    throttled: Cell<bool>,
    scroll_dirty: Cell<bool>,
}

impl NavigationController {
    pub fn new(env: Env, state: Rc<ShellState>, config: &ShellConfig) -> Rc<Self> {
        let dom = &config.dom;
        Rc::new(Self {
            menu_button: env.query(&dom.menu_button),
            sidebar: env.query(&dom.sidebar),
            close_button: env.query(&dom.sidebar_close),
            header: env.query(&dom.header),
            scroll_indicator: env.query(&dom.scroll_indicator),
            nav_links: env.query_all(&dom.nav_links),
            gutter: config.header_gutter,
            threshold: config.header_threshold,
            breakpoint: config.mobile_breakpoint,
            saved_overflow: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            close_timer: RefCell::new(None),
            throttle: RefCell::new(None),
            throttled: Cell::new(false),
            scroll_dirty: Cell::new(false),
            env,
            state,
        })
    }

    pub fn init(self: &Rc<Self>) {
        let mut listeners = Vec::new();

        if let (Some(button), Some(_)) = (&self.menu_button, &self.sidebar) {
            button.set_attribute("aria-expanded", "false");
            let this = Rc::downgrade(self);
            listeners.push(button.listen(
                "click",
                with_this(&this, |this, e| {
                    e.prevent_default();
                    this.toggle_menu();
                }),
            ));
        }

        if let Some(close) = &self.close_button {
            let this = Rc::downgrade(self);
            listeners.push(close.listen("click", with_this(&this, |this, _| this.close_menu())));
        }

        let this = Rc::downgrade(self);
        listeners.push(self.env.listen_document(
            "click",
            with_this(&this, |this, e| this.on_document_click(e)),
        ));
        listeners.push(self.env.listen_document(
            "keydown",
            with_this(&this, |this, e| {
                if e.key.as_deref() == Some("Escape") && this.is_open() {
                    this.close_menu();
                }
            }),
        ));

        for anchor in self.env.query_all("a[href^='#']") {
            let Some(href) = anchor.attribute("href") else { continue };
            if href.len() < 2 {
                continue;
            }
            listeners.push(anchor.listen(
                "click",
                with_this(&this, move |this, e| {
                    if this.scroll_to_anchor(&href) {
                        e.prevent_default();
                        this.schedule_auto_close();
                    }
                }),
            ));
        }

        if let Some(indicator) = &self.scroll_indicator {
            listeners.push(indicator.listen(
                "click",
                with_this(&this, |this, _| {
                    let viewport = this.env.viewport();
                    this.env.scroll_to(this.env.scroll_y() + viewport.height);
                }),
            ));
        }

        listeners.push(
            self.env
                .listen_window("scroll", with_this(&this, |this, _| this.on_scroll())),
        );

        self.listeners.borrow_mut().extend(listeners);
        self.update_scroll_state();
    }

    pub fn is_open(&self) -> bool {
        self.state.menu_open.get()
    }

    pub fn open_menu(&self) {
        let Some(sidebar) = &self.sidebar else { return };
        if self.is_open() {
            return;
        }
        self.state.menu_open.set(true);
        sidebar.add_class(OPEN_CLASS);
        sidebar.set_attribute("aria-hidden", "false");
        sidebar.set_attribute("aria-modal", "true");
        if let Some(button) = &self.menu_button {
            button.set_attribute("aria-expanded", "true");
            button.set_style("transform", "rotate(90deg)");
        }
        if let Some(body) = self.env.body() {
            *self.saved_overflow.borrow_mut() = body.style("overflow");
            body.set_style("overflow", "hidden");
        }
        log::debug!("menu opened");
    }

    pub fn close_menu(&self) {
        self.close_timer.borrow_mut().take();
        if !self.is_open() {
            return;
        }
        self.state.menu_open.set(false);
        if let Some(sidebar) = &self.sidebar {
            sidebar.remove_class(OPEN_CLASS);
            sidebar.set_attribute("aria-hidden", "true");
            sidebar.remove_attribute("aria-modal");
        }
        if let Some(button) = &self.menu_button {
            button.set_attribute("aria-expanded", "false");
            button.remove_style("transform");
        }
        if let Some(body) = self.env.body() {
            match self.saved_overflow.borrow_mut().take() {
                Some(previous) => body.set_style("overflow", &previous),
                None => body.remove_style("overflow"),
            }
        }
        log::debug!("menu closed");
    }

    pub fn toggle_menu(&self) {
        if self.is_open() {
            self.close_menu();
        } else {
            self.open_menu();
        }
    }

    fn on_document_click(&self, event: &DomEvent) {
        if !self.is_open() {
            return;
        }
        let Some(target) = &event.target else { return };
        let inside = |el: &Option<Element>| {
            el.as_ref()
                .map(|el| el.contains(target.as_ref()))
                .unwrap_or(false)
        };
        if !inside(&self.sidebar) && !inside(&self.menu_button) {
            self.close_menu();
        }
    }

    fn header_height(&self) -> f64 {
        self.header.as_ref().map(|h| h.offset_height()).unwrap_or(0.0)
    }

    /// Smooth-scrolls to `#id`, leaving room for the fixed header.
    /// Returns false when the target does not exist.
    pub fn scroll_to_anchor(&self, href: &str) -> bool {
        let Some(target) = self.env.query(href) else {
            return false;
        };
        let top = target.rect().top + self.env.scroll_y() - self.header_height() - self.gutter;
        self.env.scroll_to(top.max(0.0));
        true
    }

    fn schedule_auto_close(self: &Rc<Self>) {
        if !self.is_open() {
            return;
        }
        let this = Rc::downgrade(self);
        let timer = self.env.set_timeout(
            AUTO_CLOSE_MS,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    this.close_menu();
                }
            }),
        );
        *self.close_timer.borrow_mut() = Some(timer);
    }

    /// Runs at most once per throttle window, plus once on the trailing edge
    /// if more scroll events arrived in between.
    fn on_scroll(self: &Rc<Self>) {
        if self.throttled.get() {
            self.scroll_dirty.set(true);
            return;
        }
        self.update_scroll_state();
        self.throttled.set(true);
        let this = Rc::downgrade(self);
        let timer = self.env.set_timeout(
            SCROLL_THROTTLE_MS,
            Box::new(move || {
                let Some(this) = this.upgrade() else { return };
                this.throttled.set(false);
                if this.scroll_dirty.replace(false) {
                    this.on_scroll();
                }
            }),
        );
        *self.throttle.borrow_mut() = Some(timer);
    }

    pub fn update_scroll_state(&self) {
        let y = self.env.scroll_y();
        self.state.last_scroll_y.set(y);
        let scrolled = y > self.threshold;

        if let Some(header) = &self.header {
            let theme = self.env.root().map(|r| theme_of(&r)).unwrap_or_default();
            let style = header_style(theme, scrolled);
            header.set_style("background", style.background);
            header.set_style("box-shadow", style.shadow);
        }

        if let Some(indicator) = &self.scroll_indicator {
            indicator.set_style("opacity", if scrolled { "0" } else { "1" });
        }

        self.highlight_active_link();
    }

    fn highlight_active_link(&self) {
        let marker = self.header_height() + self.gutter + 1.0;
        let mut active = None;
        for (index, link) in self.nav_links.iter().enumerate() {
            let Some(href) = link.attribute("href").filter(|h| h.starts_with('#') && h.len() > 1)
            else {
                continue;
            };
            if let Some(section) = self.env.query(&href) {
                if section.rect().top <= marker {
                    active = Some(index);
                }
            }
        }
        for (index, link) in self.nav_links.iter().enumerate() {
            if Some(index) == active {
                link.add_class(ACTIVE_LINK_CLASS);
            } else {
                link.remove_class(ACTIVE_LINK_CLASS);
            }
        }
    }

    /// An open menu makes no sense once the layout is no longer mobile.
    pub fn handle_resize(&self) {
        if self.env.viewport().width > self.breakpoint && self.is_open() {
            self.close_menu();
        }
    }

    pub fn destroy(&self) {
        self.listeners.borrow_mut().clear();
        self.close_timer.borrow_mut().take();
        self.throttle.borrow_mut().take();
        self.throttled.set(false);
    }
}

fn with_this<T: 'static>(
    this: &Weak<T>,
    f: impl Fn(&Rc<T>, &DomEvent) + 'static,
) -> Rc<dyn Fn(&DomEvent)> {
    let this = this.clone();
    Rc::new(move |e: &DomEvent| {
        if let Some(this) = this.upgrade() {
            f(&this, e);
        }
    })
}
