use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::env::{Env, Handle};

type Tick = Rc<RefCell<dyn FnMut(f64)>>;

/// A self-rescheduling animation-frame loop.
///
/// Each tick requests the next frame only after it has run, so ticks of one
/// loop never overlap. The pending frame's handle is kept so `stop` can
/// cancel it.
pub struct FrameLoop {
    env: Env,
    pending: Rc<RefCell<Option<Handle>>>,
    running: Rc<Cell<bool>>,
}

impl FrameLoop {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            pending: Rc::new(RefCell::new(None)),
            running: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Starts the loop. A loop that is already running is restarted with the new tick.
    pub fn start(&self, tick: impl FnMut(f64) + 'static) {
        self.stop();
        self.running.set(true);
        let tick: Tick = Rc::new(RefCell::new(tick));
        schedule(self.env.clone(), self.pending.clone(), self.running.clone(), tick);
    }

    pub fn stop(&self) {
        self.running.set(false);
        if let Some(handle) = self.pending.borrow_mut().take() {
            handle.cancel();
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn schedule(env: Env, pending: Rc<RefCell<Option<Handle>>>, running: Rc<Cell<bool>>, tick: Tick) {
    let next_env = env.clone();
    let slot = pending.clone();
    let handle = env.request_frame(Box::new(move |ts| {
        if !running.get() {
            return;
        }
        (&mut *tick.borrow_mut())(ts);
        if running.get() {
            schedule(next_env, slot, running, tick);
        }
    }));
    *pending.borrow_mut() = Some(handle);
}
