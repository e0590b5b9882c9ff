use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{window, Event};

mod config;
mod cursor;
mod env;
mod error;
mod frame;
mod navigation;
mod particles;
mod performance;
mod polish;
mod preferences;
mod reveal;
mod shell;
mod theme;
mod video;

use config::ShellConfig;
use env::browser::BrowserEnv;
use env::Env;
use shell::AppShell;

thread_local! {
    static SHELL: RefCell<Option<Rc<AppShell>>> = RefCell::new(None);
}

/// Uncaught errors and rejected promises end up in the console, never on the page.
fn install_error_logging() {
    let Some(window) = window() else { return };

    let on_error = Closure::wrap(Box::new(move |e: Event| {
        gloo_console::error!("uncaught error:", e);
    }) as Box<dyn FnMut(_)>);
    let on_rejection = Closure::wrap(Box::new(move |e: Event| {
        gloo_console::error!("unhandled promise rejection:", e);
    }) as Box<dyn FnMut(_)>);

    if window
        .add_event_listener_with_callback("error", on_error.as_ref().unchecked_ref())
        .is_err()
        || window
            .add_event_listener_with_callback(
                "unhandledrejection",
                on_rejection.as_ref().unchecked_ref(),
            )
            .is_err()
    {
        log::warn!("could not install global error logging");
    }

    // both listeners live as long as the page
    on_error.forget();
    on_rejection.forget();
}

fn main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(config::log_level()).expect("error initializing log");

    info!("Starting landing shell");
    install_error_logging();

    let browser = match BrowserEnv::new() {
        Ok(browser) => browser,
        Err(e) => {
            gloo_console::error!(format!("no browser environment: {}", e));
            return;
        }
    };
    let env: Env = Rc::new(browser);
    let config = ShellConfig::from_document(&*env);
    info!("Loaded config for {}", config.brand);

    let shell = AppShell::new(env, config);
    shell.start();
    SHELL.with(|slot| *slot.borrow_mut() = Some(shell));
}
