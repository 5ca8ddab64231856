//! Cancellable, self-rescheduling task on top of one-shot timers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by a [`TimerHost`] for a pending callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub i32);

/// One-shot timers on the host event loop (`setTimeout` in the browser).
///
/// A host must drop the callback once it has fired or been cleared.
pub trait TimerHost {
    fn set_timeout(&self, delay_secs: f64, callback: Box<dyn FnOnce()>) -> Option<TimerId>;
    fn clear_timeout(&self, id: TimerId);
}

type TaskBody = Rc<RefCell<dyn FnMut() -> Option<f64>>>;

struct TaskState {
    timers: Rc<dyn TimerHost>,
    cancelled: Cell<bool>,
    pending: Cell<Option<TimerId>>,
    ticks: Cell<u64>,
}

/// Runs a body immediately and then again after every delay it returns.
///
/// The body stops the loop by returning `None`. After [`cancel`] returns the
/// body is never invoked again, even if the host fires a stale timer.
///
/// [`cancel`]: RepeatingTask::cancel
pub struct RepeatingTask {
    state: Rc<TaskState>,
}

impl RepeatingTask {
    pub fn start<F>(timers: Rc<dyn TimerHost>, body: F) -> Self
    where
        F: FnMut() -> Option<f64> + 'static,
    {
        let state = Rc::new(TaskState {
            timers,
            cancelled: Cell::new(false),
            pending: Cell::new(None),
            ticks: Cell::new(0),
        });
        let body: TaskBody = Rc::new(RefCell::new(body));
        run(&state, &body);
        Self { state }
    }

    pub fn cancel(&self) {
        if self.state.cancelled.replace(true) {
            return;
        }
        if let Some(id) = self.state.pending.take() {
            self.state.timers.clear_timeout(id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending.get().is_some()
    }

    /// How many times the body has run.
    pub fn ticks(&self) -> u64 {
        self.state.ticks.get()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run(state: &Rc<TaskState>, body: &TaskBody) {
    state.pending.set(None);
    if state.cancelled.get() {
        return;
    }
    state.ticks.set(state.ticks.get() + 1);
    let next = {
        let mut f = body.borrow_mut();
        (&mut *f)()
    };
    let Some(delay) = next else {
        return;
    };
    let st = Rc::clone(state);
    let b = Rc::clone(body);
    let id = state
        .timers
        .set_timeout(delay, Box::new(move || run(&st, &b)));
    if id.is_none() {
        log::debug!("timer host refused a {:.2}s timeout; task stopped", delay);
    }
    state.pending.set(id);
}
