// Host-side tests for the cancellable repeating task.

mod common;

use common::{Clock, ManualTimers};
use oracle_sound::core::*;
use std::cell::Cell;
use std::rc::Rc;

fn counter_task(timers: &Rc<ManualTimers>, every: f64) -> (RepeatingTask, Rc<Cell<u32>>) {
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let task = RepeatingTask::start(timers.clone(), move || {
        h.set(h.get() + 1);
        Some(every)
    });
    (task, hits)
}

#[test]
fn body_runs_immediately_then_on_each_delay() {
    let clock = Rc::new(Clock::default());
    let timers = Rc::new(ManualTimers::new(&clock));
    let (task, hits) = counter_task(&timers, 1.0);
    assert_eq!(hits.get(), 1);
    timers.advance(3.5);
    assert_eq!(hits.get(), 4);
    assert_eq!(task.ticks(), 4);
    assert!(task.is_pending());
}

#[test]
fn cancel_prevents_any_further_invocation() {
    let clock = Rc::new(Clock::default());
    let timers = Rc::new(ManualTimers::new(&clock));
    let (task, hits) = counter_task(&timers, 1.0);
    timers.advance(1.0);
    task.cancel();
    assert!(task.is_cancelled());
    assert!(!task.is_pending());
    assert_eq!(timers.pending(), 0);
    timers.advance(10.0);
    assert_eq!(hits.get(), 2);
}

#[test]
fn stale_timer_after_cancel_is_ignored() {
    let clock = Rc::new(Clock::default());
    let timers = Rc::new(ManualTimers::new(&clock));
    // A host that fails to clear still must not re-enter the body
    timers.honour_clear.set(false);
    let (task, hits) = counter_task(&timers, 0.5);
    task.cancel();
    timers.advance(5.0);
    assert_eq!(hits.get(), 1);
    assert_eq!(timers.pending(), 0, "stale callback fires once and does not rearm");
}

#[test]
fn returning_none_ends_the_loop() {
    let clock = Rc::new(Clock::default());
    let timers = Rc::new(ManualTimers::new(&clock));
    let runs = Rc::new(Cell::new(0));
    let r = Rc::clone(&runs);
    let task = RepeatingTask::start(timers.clone(), move || {
        r.set(r.get() + 1);
        (r.get() < 3).then_some(0.25)
    });
    timers.advance(5.0);
    assert_eq!(runs.get(), 3);
    assert!(!task.is_pending());
    assert!(!task.is_cancelled());
}

#[test]
fn dropping_the_handle_cancels() {
    let clock = Rc::new(Clock::default());
    let timers = Rc::new(ManualTimers::new(&clock));
    let (task, hits) = counter_task(&timers, 1.0);
    drop(task);
    assert_eq!(timers.pending(), 0);
    timers.advance(5.0);
    assert_eq!(hits.get(), 1);
}
