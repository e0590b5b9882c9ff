use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::config::ShellConfig;
use crate::env::{DomEvent, Element, Env, Handle};
use crate::error::{Result, ShellError};
use crate::preferences::PreferenceStore;

pub const THEME_ATTRIBUTE: &str = "data-theme";
pub const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";
const TRANSITION_MS: u32 = 300;
const THEME_TRANSITION: &str = "background-color 0.3s ease, color 0.3s ease";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Theme> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Icon shown on the toggle: the theme you would switch to.
    fn icon_class(self) -> &'static str {
        match self {
            Theme::Light => "fas fa-moon",
            Theme::Dark => "fas fa-sun",
        }
    }

    fn meta_color(self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#0f172a",
        }
    }
}

/// Reads the active theme straight from the root attribute.
pub fn theme_of(root: &Element) -> Theme {
    root.attribute(THEME_ATTRIBUTE)
        .and_then(|v| Theme::parse(&v))
        .unwrap_or_default()
}

pub struct ThemeController {
    env: Env,
    store: Rc<PreferenceStore>,
    root: Element,
    toggle: Option<Element>,
    icon_selector: String,
    meta_selector: String,
    current: Cell<Theme>,
    transition: RefCell<Option<Handle>>,
    listeners: RefCell<Vec<Handle>>,
}

impl ThemeController {
    pub fn new(env: Env, store: Rc<PreferenceStore>, config: &ShellConfig) -> Result<Rc<Self>> {
        let root = env.root().ok_or(ShellError::MissingElement("document root"))?;
        let toggle = env.query(&config.dom.theme_toggle);
        Ok(Rc::new(Self {
            env,
            store,
            root,
            toggle,
            icon_selector: config.dom.theme_icon.clone(),
            meta_selector: config.dom.theme_color_meta.clone(),
            current: Cell::new(Theme::Light),
            transition: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    pub fn init(self: &Rc<Self>) {
        self.apply_theme(self.initial_theme());

        let mut listeners = self.listeners.borrow_mut();
        if let Some(toggle) = &self.toggle {
            let this = Rc::downgrade(self);
            listeners.push(toggle.listen(
                "click",
                Rc::new(move |_: &DomEvent| {
                    if let Some(this) = this.upgrade() {
                        this.toggle_theme();
                    }
                }),
            ));
        }

        let this: Weak<Self> = Rc::downgrade(self);
        let watch = self.env.watch_media(
            DARK_SCHEME_QUERY,
            Rc::new(move |prefers_dark| {
                if let Some(this) = this.upgrade() {
                    this.on_system_change(prefers_dark);
                }
            }),
        );
        if let Some(watch) = watch {
            listeners.push(watch);
        }
        log::debug!("theme initialised as {}", self.current.get().as_str());
    }

    /// Stored preference, then system preference, then light.
    pub fn initial_theme(&self) -> Theme {
        if let Some(theme) = self.store.stored().and_then(|v| Theme::parse(&v)) {
            return theme;
        }
        match self.env.media_matches(DARK_SCHEME_QUERY) {
            Some(true) => Theme::Dark,
            _ => Theme::Light,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Theme {
        self.current.get()
    }

    pub fn apply_theme(&self, theme: Theme) {
        self.current.set(theme);
        self.root.set_attribute(THEME_ATTRIBUTE, theme.as_str());

        if let Some(toggle) = &self.toggle {
            let pressed = if theme == Theme::Dark { "true" } else { "false" };
            toggle.set_attribute("aria-pressed", pressed);
            toggle.set_attribute(
                "aria-label",
                &format!("Switch to {} theme", theme.toggled().as_str()),
            );
            if let Some(icon) = toggle.query(&self.icon_selector) {
                icon.set_attribute("class", theme.icon_class());
            }
        }

        if let Some(meta) = self.env.query(&self.meta_selector) {
            meta.set_attribute("content", theme.meta_color());
        }

        self.root.set_style("transition", THEME_TRANSITION);
        let root = self.root.clone();
        let timer = self.env.set_timeout(
            TRANSITION_MS,
            Box::new(move || root.remove_style("transition")),
        );
        // a newer transition supersedes the pending clear
        *self.transition.borrow_mut() = Some(timer);
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.current.get().toggled();
        self.apply_theme(next);
        if let Err(e) = self.store.write(next.as_str()) {
            log::debug!("theme not persisted: {}", e);
        }
        next
    }

    fn on_system_change(&self, prefers_dark: bool) {
        if self.store.stored().is_some() {
            return;
        }
        self.apply_theme(if prefers_dark { Theme::Dark } else { Theme::Light });
    }

    pub fn destroy(&self) {
        self.listeners.borrow_mut().clear();
        if let Some(timer) = self.transition.borrow_mut().take() {
            // let the pending clear run so no transition style is left behind
            timer.forget();
        }
    }
}
