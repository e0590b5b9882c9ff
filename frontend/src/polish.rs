use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ShellConfig;
use crate::env::{DomEvent, Element, Env, Handle};
use crate::navigation::NavigationController;

const RIPPLE_CLASS: &str = "ripple";
const RIPPLE_MS: u32 = 600;
pub const KEYBOARD_CLASS: &str = "keyboard-navigation";
const OVERLAY_OPEN_CLASS: &str = "active";

/// Click ripples, keyboard focus styling and the global Escape key.
pub struct InteractionPolish {
    env: Env,
    nav: Rc<NavigationController>,
    ripple_targets: String,
    overlays: String,
    listeners: RefCell<Vec<Handle>>,
}

impl InteractionPolish {
    pub fn new(env: Env, nav: Rc<NavigationController>, config: &ShellConfig) -> Self {
        Self {
            env,
            nav,
            ripple_targets: config.dom.ripple_targets.clone(),
            overlays: config.dom.overlays.clone(),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn init(&self) {
        let mut listeners = self.listeners.borrow_mut();

        for target in self.env.query_all(&self.ripple_targets) {
            let env = self.env.clone();
            let host = target.clone();
            listeners.push(target.listen(
                "click",
                Rc::new(move |e: &DomEvent| {
                    if let Err(err) = spawn_ripple(&env, &host, e) {
                        log::debug!("ripple skipped: {}", err);
                    }
                }),
            ));
        }

        let env = self.env.clone();
        let nav = self.nav.clone();
        let overlays = self.overlays.clone();
        listeners.push(self.env.listen_document(
            "keydown",
            Rc::new(move |e: &DomEvent| match e.key.as_deref() {
                Some("Tab") => {
                    if let Some(body) = env.body() {
                        body.add_class(KEYBOARD_CLASS);
                    }
                }
                Some("Escape") => {
                    nav.close_menu();
                    for overlay in env.query_all(&overlays) {
                        overlay.remove_class(OVERLAY_OPEN_CLASS);
                    }
                }
                _ => {}
            }),
        ));

        let env = self.env.clone();
        listeners.push(self.env.listen_document(
            "mousedown",
            Rc::new(move |_: &DomEvent| {
                if let Some(body) = env.body() {
                    body.remove_class(KEYBOARD_CLASS);
                }
            }),
        ));
    }

    pub fn destroy(&self) {
        self.listeners.borrow_mut().clear();
    }
}

fn spawn_ripple(env: &Env, host: &Element, event: &DomEvent) -> crate::error::Result<()> {
    let rect = host.rect();
    let size = rect.width.max(rect.height);
    let ripple = env.create_element("span")?;
    ripple.add_class(RIPPLE_CLASS);
    ripple.set_style("width", &format!("{}px", size));
    ripple.set_style("height", &format!("{}px", size));
    ripple.set_style("left", &format!("{}px", event.client_x - rect.left - size / 2.0));
    ripple.set_style("top", &format!("{}px", event.client_y - rect.top - size / 2.0));
    host.append_child(&ripple)?;

    env.set_timeout(RIPPLE_MS, Box::new(move || ripple.remove()))
        .forget();
    Ok(())
}
