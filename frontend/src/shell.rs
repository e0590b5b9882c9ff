use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::ShellConfig;
use crate::cursor::CursorFollower;
use crate::env::{DomEvent, Env, Handle};
use crate::error::Result;
use crate::navigation::NavigationController;
use crate::particles::ParticleField;
use crate::performance::PerformanceGuard;
use crate::polish::InteractionPolish;
use crate::preferences::PreferenceStore;
use crate::reveal::{RevealObserver, REVEALED_CLASS};
use crate::theme::{theme_of, ThemeController, THEME_ATTRIBUTE};
use crate::video::VideoCardController;

const RESIZE_DEBOUNCE_MS: u32 = 16;
const ORIENTATION_DELAY_MS: u32 = 100;
const LOADING_HIDDEN_CLASS: &str = "hidden";
const MENU_OPEN_CLASS: &str = "active";

/// Flags shared between the shell and the controllers that mutate them.
#[derive(Debug, Default)]
pub struct ShellState {
    pub menu_open: Cell<bool>,
    pub last_scroll_y: Cell<f64>,
    pub loading: Cell<bool>,
}

struct Components {
    theme: Rc<ThemeController>,
    nav: Rc<NavigationController>,
    reveal: Rc<RevealObserver>,
    particles: ParticleField,
    cursor: CursorFollower,
    videos: Rc<VideoCardController>,
    polish: InteractionPolish,
}

impl Components {
    fn destroy(&self) {
        self.polish.destroy();
        self.videos.destroy();
        self.cursor.destroy();
        self.particles.destroy();
        self.reveal.destroy();
        self.nav.destroy();
        self.theme.destroy();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellMode {
    Pending,
    Full,
    Degraded,
    Destroyed,
}

/// Owns every component and the page lifecycle around them.
pub struct AppShell {
    env: Env,
    config: ShellConfig,
    state: Rc<ShellState>,
    mode: Cell<ShellMode>,
    started_at: Cell<f64>,
    components: RefCell<Option<Components>>,
    listeners: RefCell<Vec<Handle>>,
    ready_listener: RefCell<Option<Handle>>,
    resize_timer: RefCell<Option<Handle>>,
    orientation_timer: RefCell<Option<Handle>>,
    loading_timer: RefCell<Option<Handle>>,
}

impl AppShell {
    pub fn new(env: Env, config: ShellConfig) -> Rc<Self> {
        Rc::new(Self {
            env,
            config,
            state: Rc::new(ShellState::default()),
            mode: Cell::new(ShellMode::Pending),
            started_at: Cell::new(0.0),
            components: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            ready_listener: RefCell::new(None),
            resize_timer: RefCell::new(None),
            orientation_timer: RefCell::new(None),
            loading_timer: RefCell::new(None),
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &Rc<ShellState> {
        &self.state
    }

    #[cfg(test)]
    pub fn mode(&self) -> ShellMode {
        self.mode.get()
    }

    /// Boots now if the document is parsed, otherwise on `DOMContentLoaded`.
    pub fn start(self: &Rc<Self>) {
        if self.env.document_ready() {
            self.boot();
            return;
        }
        let this = Rc::downgrade(self);
        let handle = self.env.listen_document(
            "DOMContentLoaded",
            Rc::new(move |_: &DomEvent| {
                if let Some(this) = this.upgrade() {
                    this.ready_listener.borrow_mut().take();
                    this.boot();
                }
            }),
        );
        *self.ready_listener.borrow_mut() = Some(handle);
    }

    fn boot(self: &Rc<Self>) {
        if self.mode.get() != ShellMode::Pending {
            return;
        }
        self.state.loading.set(true);
        self.started_at.set(self.env.now_ms());

        match self.initialize_components() {
            Ok(components) => {
                *self.components.borrow_mut() = Some(components);
                self.install_window_listeners();
                self.schedule_loading_hide();
                self.mode.set(ShellMode::Full);
                log::info!("{} ready", self.config.brand);
            }
            Err(e) => {
                log::error!("startup failed, falling back to minimal mode: {}", e);
                self.degrade();
            }
        }
    }

    fn initialize_components(&self) -> Result<Components> {
        self.config.validate()?;
        let env = &self.env;
        let config = &self.config;

        let store = Rc::new(PreferenceStore::new(&**env, &config.storage_key));

        let theme = ThemeController::new(env.clone(), store, config)?;
        theme.init();

        let nav = NavigationController::new(env.clone(), self.state.clone(), config);
        nav.init();

        let reveal = RevealObserver::new(env.clone(), config);
        reveal.init();

        let particles = ParticleField::new(env.clone(), config);
        particles.init()?;

        let cursor = CursorFollower::new(env.clone(), config);
        if !cursor.init() {
            log::debug!("custom cursor disabled");
        }

        let videos = VideoCardController::new(env.clone(), config);
        videos.init();

        PerformanceGuard::new(env.clone(), config).init();

        let polish = InteractionPolish::new(env.clone(), nav.clone(), config);
        polish.init();

        Ok(Components {
            theme,
            nav,
            reveal,
            particles,
            cursor,
            videos,
            polish,
        })
    }

    fn install_window_listeners(self: &Rc<Self>) {
        let mut listeners = self.listeners.borrow_mut();

        let this = Rc::downgrade(self);
        listeners.push(self.env.listen_window(
            "resize",
            Rc::new(move |_: &DomEvent| {
                let Some(this) = this.upgrade() else { return };
                let shell = Rc::downgrade(&this);
                let timer = this.env.set_timeout(
                    RESIZE_DEBOUNCE_MS,
                    Box::new(move || {
                        if let Some(shell) = shell.upgrade() {
                            shell.handle_resize();
                        }
                    }),
                );
                // replacing the pending timer cancels it
                *this.resize_timer.borrow_mut() = Some(timer);
            }),
        ));

        let this = Rc::downgrade(self);
        listeners.push(self.env.listen_window(
            "orientationchange",
            Rc::new(move |_: &DomEvent| {
                let Some(this) = this.upgrade() else { return };
                let shell = Rc::downgrade(&this);
                let timer = this.env.set_timeout(
                    ORIENTATION_DELAY_MS,
                    Box::new(move || {
                        if let Some(shell) = shell.upgrade() {
                            shell.handle_resize();
                        }
                    }),
                );
                *this.orientation_timer.borrow_mut() = Some(timer);
            }),
        ));

        let this = Rc::downgrade(self);
        listeners.push(self.env.listen_document(
            "visibilitychange",
            Rc::new(move |_: &DomEvent| {
                if let Some(this) = this.upgrade() {
                    this.handle_visibility();
                }
            }),
        ));

        let this = Rc::downgrade(self);
        listeners.push(self.env.listen_window(
            "beforeunload",
            Rc::new(move |_: &DomEvent| {
                if let Some(this) = this.upgrade() {
                    this.destroy();
                }
            }),
        ));
    }

    /// Rebuilds the particle field for the new viewport and lets navigation
    /// drop an open mobile menu.
    pub fn handle_resize(&self) {
        let components = self.components.borrow();
        let Some(components) = components.as_ref() else { return };
        match components.particles.rebuild() {
            Ok(count) => log::debug!("particle field rebuilt with {} particles", count),
            Err(e) => log::warn!("particle rebuild failed: {}", e),
        }
        components.nav.handle_resize();
    }

    pub fn handle_visibility(&self) {
        let components = self.components.borrow();
        let Some(components) = components.as_ref() else { return };
        if self.env.document_hidden() {
            components.particles.pause();
        } else {
            components.particles.resume();
        }
    }

    fn schedule_loading_hide(self: &Rc<Self>) {
        let elapsed = self.env.now_ms() - self.started_at.get();
        let wait = (self.config.min_loading_ms as f64 - elapsed).max(0.0) as u32;
        let this = Rc::downgrade(self);
        let timer = self.env.set_timeout(
            wait,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    this.hide_loading();
                }
            }),
        );
        *self.loading_timer.borrow_mut() = Some(timer);
    }

    /// Fades the loading overlay out, then removes it once the fade is over.
    /// Does nothing once loading has already finished.
    pub fn hide_loading(&self) {
        if !self.state.loading.replace(false) {
            return;
        }
        let Some(overlay) = self.env.query(&self.config.dom.loading_overlay) else {
            return;
        };
        overlay.add_class(LOADING_HIDDEN_CLASS);
        overlay.set_style("opacity", "0");
        self.env
            .set_timeout(self.config.loading_fade_ms, Box::new(move || overlay.remove()))
            .forget();
    }

    /// Minimal wiring used when full startup fails: the page stays scrollable
    /// and the menu and theme toggles keep working.
    fn degrade(&self) {
        if let Some(components) = self.components.borrow_mut().take() {
            components.destroy();
        }
        self.mode.set(ShellMode::Degraded);
        self.state.loading.set(false);

        if let Some(overlay) = self.env.query(&self.config.dom.loading_overlay) {
            overlay.add_class(LOADING_HIDDEN_CLASS);
            overlay.set_style("display", "none");
        }
        if let Some(body) = self.env.body() {
            body.remove_style("overflow");
        }
        for el in self.env.query_all(&self.config.dom.reveal) {
            el.add_class(REVEALED_CLASS);
        }

        let mut listeners = self.listeners.borrow_mut();
        let dom = &self.config.dom;
        if let (Some(button), Some(sidebar)) =
            (self.env.query(&dom.menu_button), self.env.query(&dom.sidebar))
        {
            let state = self.state.clone();
            listeners.push(button.listen(
                "click",
                Rc::new(move |e: &DomEvent| {
                    e.prevent_default();
                    state.menu_open.set(sidebar.toggle_class(MENU_OPEN_CLASS));
                }),
            ));
        }

        if let Some(toggle) = self.env.query(&dom.theme_toggle) {
            let env = self.env.clone();
            let store = PreferenceStore::new(&*env, &self.config.storage_key);
            listeners.push(toggle.listen(
                "click",
                Rc::new(move |_: &DomEvent| {
                    let Some(root) = env.root() else { return };
                    let next = theme_of(&root).toggled();
                    root.set_attribute(THEME_ATTRIBUTE, next.as_str());
                    if let Err(e) = store.write(next.as_str()) {
                        log::debug!("theme not persisted: {}", e);
                    }
                }),
            ));
        }
    }

    /// Tears down every component and listener. Safe to call repeatedly.
    pub fn destroy(&self) {
        if let Some(components) = self.components.borrow_mut().take() {
            components.destroy();
            log::info!("{} torn down", self.config.brand);
        }
        self.listeners.borrow_mut().clear();
        self.ready_listener.borrow_mut().take();
        self.resize_timer.borrow_mut().take();
        self.orientation_timer.borrow_mut().take();
        self.loading_timer.borrow_mut().take();
        self.mode.set(ShellMode::Destroyed);
    }
}
