// Host-side doubles for the audio backend and the event-loop timers.
#![allow(dead_code)]

use oracle_sound::core::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared simulated audio clock, in seconds.
#[derive(Default)]
pub struct Clock(Cell<f64>);

impl Clock {
    pub fn now(&self) -> f64 {
        self.0.get()
    }

    pub fn set(&self, t: f64) {
        self.0.set(t);
    }
}

type ResumeDone = Box<dyn FnOnce(Result<(), AudioError>)>;

/// Everything a [`MockBackend`] was asked to do.
pub struct Recorder {
    pub contexts_opened: Cell<usize>,
    pub resumes: Cell<usize>,
    pub closed: Cell<bool>,
    pub state: Cell<ContextState>,
    pub resume_runs: Cell<bool>,
    pending_resume: RefCell<Option<ResumeDone>>,
    pub fail_schedule: Cell<bool>,
    pub master_level: Cell<Option<f32>>,
    pub graphs: RefCell<Vec<SubGraph>>,
    pub ramps: RefCell<Vec<(f32, f64, f64)>>,
    pub drones_started: Cell<usize>,
    pub drones_stopped: Cell<usize>,
    pub drone_releases: RefCell<Vec<(f64, f64)>>,
    pub drone_specs: RefCell<Vec<DroneSpec>>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            contexts_opened: Cell::new(0),
            resumes: Cell::new(0),
            closed: Cell::new(false),
            state: Cell::new(ContextState::Suspended),
            resume_runs: Cell::new(true),
            pending_resume: RefCell::new(None),
            fail_schedule: Cell::new(false),
            master_level: Cell::new(None),
            graphs: RefCell::new(Vec::new()),
            ramps: RefCell::new(Vec::new()),
            drones_started: Cell::new(0),
            drones_stopped: Cell::new(0),
            drone_releases: RefCell::new(Vec::new()),
            drone_specs: RefCell::new(Vec::new()),
        }
    }
}

impl Recorder {
    pub fn resume_pending(&self) -> bool {
        self.pending_resume.borrow().is_some()
    }

    /// Settle a resume held back by `resume_runs = false`.
    pub fn finish_resume(&self, ok: bool) {
        let Some(done) = self.pending_resume.borrow_mut().take() else {
            return;
        };
        if ok {
            self.state.set(ContextState::Running);
            done(Ok(()));
        } else {
            done(Err(AudioError::ResumeFailed));
        }
    }

    pub fn graphs_labelled(&self, label: &str) -> Vec<SubGraph> {
        self.graphs
            .borrow()
            .iter()
            .filter(|g| g.label == label)
            .cloned()
            .collect()
    }

    /// Sub-graphs other than ambient melody notes.
    pub fn effect_graphs(&self) -> Vec<SubGraph> {
        self.graphs
            .borrow()
            .iter()
            .filter(|g| g.label != "melody")
            .cloned()
            .collect()
    }

    pub fn effect_node_count(&self) -> usize {
        self.effect_graphs().iter().map(SubGraph::node_count).sum()
    }

    pub fn melody_notes(&self) -> usize {
        self.graphs_labelled("melody").len()
    }

    pub fn last_ramp_target(&self) -> Option<f32> {
        self.ramps.borrow().last().map(|r| r.0)
    }
}

pub struct MockBackend {
    pub rec: Rc<Recorder>,
    pub clock: Rc<Clock>,
}

impl MockBackend {
    pub fn open(rec: &Rc<Recorder>, clock: &Rc<Clock>) -> Result<Self, AudioError> {
        rec.contexts_opened.set(rec.contexts_opened.get() + 1);
        Ok(Self {
            rec: Rc::clone(rec),
            clock: Rc::clone(clock),
        })
    }
}

impl AudioBackend for MockBackend {
    type Bus = u32;
    type Drone = usize;

    fn state(&self) -> ContextState {
        self.rec.state.get()
    }

    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn sample_rate(&self) -> f32 {
        8000.0
    }

    fn resume(&self, done: Box<dyn FnOnce(Result<(), AudioError>)>) {
        self.rec.resumes.set(self.rec.resumes.get() + 1);
        if self.rec.resume_runs.get() {
            self.rec.state.set(ContextState::Running);
            done(Ok(()));
        } else {
            *self.rec.pending_resume.borrow_mut() = Some(done);
        }
    }

    fn close(&self) {
        self.rec.closed.set(true);
        self.rec.state.set(ContextState::Closed);
    }

    fn create_master_bus(&self, level: f32) -> Result<u32, AudioError> {
        self.rec.master_level.set(Some(level));
        Ok(1)
    }

    fn ramp_bus(&self, _bus: &u32, target: f32, at: f64, window: f64) {
        self.rec.ramps.borrow_mut().push((target, at, window));
    }

    fn schedule(&self, graph: &SubGraph, _destination: &u32) -> Result<(), AudioError> {
        if self.rec.fail_schedule.get() {
            return Err(AudioError::Scheduling("mock"));
        }
        self.rec.graphs.borrow_mut().push(graph.clone());
        Ok(())
    }

    fn start_drone(&self, spec: &DroneSpec, _destination: &u32) -> Result<usize, AudioError> {
        let n = self.rec.drones_started.get() + 1;
        self.rec.drones_started.set(n);
        self.rec.drone_specs.borrow_mut().push(spec.clone());
        Ok(n)
    }

    fn stop_drone(&self, _drone: usize, release_secs: f64) {
        self.rec.drones_stopped.set(self.rec.drones_stopped.get() + 1);
        self.rec
            .drone_releases
            .borrow_mut()
            .push((self.clock.now(), release_secs));
    }
}

type Pending = (f64, i32, Box<dyn FnOnce()>);

/// Timers driven by hand: callbacks fire only inside [`ManualTimers::advance`].
pub struct ManualTimers {
    clock: Rc<Clock>,
    next_id: Cell<i32>,
    queue: RefCell<Vec<Pending>>,
    pub honour_clear: Cell<bool>,
}

impl ManualTimers {
    pub fn new(clock: &Rc<Clock>) -> Self {
        Self {
            clock: Rc::clone(clock),
            next_id: Cell::new(1),
            queue: RefCell::new(Vec::new()),
            honour_clear: Cell::new(true),
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Move the clock forward, firing due callbacks in time order.
    pub fn advance(&self, secs: f64) {
        let target = self.clock.now() + secs;
        loop {
            let next = {
                let mut q = self.queue.borrow_mut();
                let earliest = q
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.0 <= target)
                    .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                    .map(|(i, _)| i);
                earliest.map(|i| q.remove(i))
            };
            let Some((due, _, cb)) = next else {
                break;
            };
            self.clock.set(due);
            cb();
        }
        self.clock.set(target);
    }
}

impl TimerHost for ManualTimers {
    fn set_timeout(&self, delay_secs: f64, callback: Box<dyn FnOnce()>) -> Option<TimerId> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.queue
            .borrow_mut()
            .push((self.clock.now() + delay_secs, id, callback));
        Some(TimerId(id))
    }

    fn clear_timeout(&self, id: TimerId) {
        if self.honour_clear.get() {
            self.queue.borrow_mut().retain(|p| p.1 != id.0);
        }
    }
}

pub struct Harness {
    pub clock: Rc<Clock>,
    pub timers: Rc<ManualTimers>,
    pub rec: Rc<Recorder>,
    pub session: AudioSession<MockBackend>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SoundConfig::default())
    }

    pub fn with_config(config: SoundConfig) -> Self {
        let clock = Rc::new(Clock::default());
        let timers = Rc::new(ManualTimers::new(&clock));
        let session = AudioSession::with_seed(config, timers.clone(), 7);
        Self {
            clock,
            timers,
            rec: Rc::new(Recorder::default()),
            session,
        }
    }

    pub fn activate(&mut self) {
        let rec = Rc::clone(&self.rec);
        let clock = Rc::clone(&self.clock);
        self.session.activate(move || MockBackend::open(&rec, &clock));
    }
}

pub fn tone_context<'a>(
    start: f64,
    noise: &'a mut NoiseCache,
    rng: &'a mut rand::rngs::StdRng,
) -> ToneContext<'a> {
    ToneContext {
        start,
        sample_rate: 8000.0,
        noise,
        rng,
    }
}
