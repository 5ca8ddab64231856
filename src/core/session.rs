//! The one audio session per page: gesture-gated activation, master bus,
//! mute, and effect dispatch.

use crate::core::composer::{AmbientComposer, ComposerParams};
use crate::core::constants::{MASTER_LEVEL, MUTE_RAMP_SECS};
use crate::core::error::AudioError;
use crate::core::graph::{AudioBackend, ContextState};
use crate::core::noise::NoiseCache;
use crate::core::task::TimerHost;
use crate::core::tones::{generate, EffectKind, EffectRequest, ToneContext};
use rand::prelude::*;
use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct SoundConfig {
    /// Master gain when unmuted.
    pub master_level: f32,
    /// Length of the mute/unmute fade.
    pub mute_ramp_secs: f64,
    /// Start the ambient bed on activation.
    pub ambient: bool,
    pub composer: ComposerParams,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            master_level: MASTER_LEVEL,
            mute_ramp_secs: MUTE_RAMP_SECS,
            ambient: true,
            composer: ComposerParams::default(),
        }
    }
}

/// What UI bindings need to mirror after an asynchronous change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionStatus {
    pub ready: bool,
    pub muted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Resuming,
    Ready,
}

type StatusListener = Box<dyn Fn(SessionStatus)>;

// Written by the resume callback, which outlives any borrow of the session
struct Shared {
    phase: Cell<Phase>,
    muted: Cell<bool>,
    // Bumped per activation so a late resume from a torn-down context is ignored
    attempt: Cell<u32>,
    listener: RefCell<Option<StatusListener>>,
}

impl Shared {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            ready: self.phase.get() == Phase::Ready,
            muted: self.muted.get(),
        }
    }

    fn notify(&self) {
        if let Some(listener) = self.listener.borrow().as_ref() {
            listener(self.status());
        }
    }
}

struct Active<B: AudioBackend + 'static> {
    backend: Rc<B>,
    master: B::Bus,
    composer: Rc<RefCell<AmbientComposer<B>>>,
}

/// Owns the audio backend once a user gesture has activated it.
///
/// Every operation is safe to call in any state; anything that cannot run
/// (no platform audio, not yet resumed, muted) is a silent no-op.
pub struct AudioSession<B: AudioBackend + 'static> {
    config: SoundConfig,
    timers: Rc<dyn TimerHost>,
    active: Option<Active<B>>,
    shared: Rc<Shared>,
    noise: NoiseCache,
    rng: StdRng,
}

impl<B: AudioBackend + 'static> AudioSession<B> {
    pub fn new(config: SoundConfig, timers: Rc<dyn TimerHost>) -> Self {
        Self::with_rng(config, timers, StdRng::from_entropy())
    }

    pub fn with_seed(config: SoundConfig, timers: Rc<dyn TimerHost>, seed: u64) -> Self {
        Self::with_rng(config, timers, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SoundConfig, timers: Rc<dyn TimerHost>, rng: StdRng) -> Self {
        Self {
            config,
            timers,
            active: None,
            shared: Rc::new(Shared {
                phase: Cell::new(Phase::Idle),
                // Nothing is audible before activation
                muted: Cell::new(true),
                attempt: Cell::new(0),
                listener: RefCell::new(None),
            }),
            noise: NoiseCache::new(),
            rng,
        }
    }

    /// True once the context has resumed and the ambient bed is up.
    pub fn is_ready(&self) -> bool {
        self.active.is_some() && self.shared.phase.get() == Phase::Ready
    }

    pub fn is_muted(&self) -> bool {
        self.shared.muted.get()
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    /// Called whenever readiness or mute changes outside a direct call,
    /// i.e. when a pending resume settles.
    pub fn on_status_change(&self, listener: impl Fn(SessionStatus) + 'static) {
        *self.shared.listener.borrow_mut() = Some(Box::new(listener));
    }

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    // The open context, unless its resume failed
    fn live(&self) -> Option<&Active<B>> {
        match self.shared.phase.get() {
            Phase::Idle => None,
            Phase::Resuming | Phase::Ready => self.active.as_ref(),
        }
    }

    pub fn backend(&self) -> Option<&Rc<B>> {
        self.live().map(|a| &a.backend)
    }

    pub fn master_bus(&self) -> Option<&B::Bus> {
        self.live().map(|a| &a.master)
    }

    pub fn composer_running(&self) -> bool {
        self.live()
            .map(|a| a.composer.borrow().is_running())
            .unwrap_or(false)
    }

    pub fn composer_mut(&mut self) -> Option<RefMut<'_, AmbientComposer<B>>> {
        self.live().map(|a| a.composer.borrow_mut())
    }

    /// Open the audio output, resume it, then start the ambient bed. Must be
    /// called from a user gesture handler. `open` is only invoked when no
    /// session exists or the previous attempt failed to resume.
    pub fn activate<F>(&mut self, open: F)
    where
        F: FnOnce() -> Result<B, AudioError>,
    {
        if self.active.is_some() {
            if self.shared.phase.get() != Phase::Idle {
                return;
            }
            // Previous context never resumed; it is already closed
            self.active = None;
        }
        let backend = match open() {
            Ok(b) => Rc::new(b),
            Err(e) => {
                log::warn!("audio disabled: {}", e);
                return;
            }
        };
        let master = match backend.create_master_bus(self.config.master_level) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("audio disabled: {}", e);
                backend.close();
                return;
            }
        };
        let composer = Rc::new(RefCell::new(AmbientComposer::new(
            Rc::clone(&backend),
            master.clone(),
            Rc::clone(&self.timers),
            self.config.composer.clone(),
            StdRng::seed_from_u64(self.rng.gen()),
        )));

        let attempt = self.shared.attempt.get().wrapping_add(1);
        self.shared.attempt.set(attempt);
        self.shared.phase.set(Phase::Resuming);
        self.active = Some(Active {
            backend: Rc::clone(&backend),
            master,
            composer: Rc::clone(&composer),
        });

        let finish = resume_handler(
            Rc::clone(&self.shared),
            attempt,
            Rc::clone(&backend),
            composer,
            self.config.ambient,
        );
        match backend.state() {
            ContextState::Running => finish(Ok(())),
            ContextState::Suspended => backend.resume(finish),
            ContextState::Closed => finish(Err(AudioError::Unavailable)),
        }
    }

    /// Flip mute and fade the master bus accordingly. Before activation only
    /// the flag changes.
    pub fn toggle_mute(&mut self) {
        let muted = !self.shared.muted.get();
        self.shared.muted.set(muted);
        if let Some(active) = self.live() {
            let target = if muted {
                0.0
            } else {
                self.config.master_level
            };
            let now = active.backend.current_time();
            active
                .backend
                .ramp_bus(&active.master, target, now, self.config.mute_ramp_secs);
        }
        log::debug!("audio muted: {}", muted);
    }

    pub fn play_effect(&mut self, kind: EffectKind) {
        if !self.is_ready() || self.shared.muted.get() {
            return;
        }
        // Same as `self.live()`, but borrows only `self.active` so the noise
        // cache and rng can be borrowed mutably alongside it
        let live = match self.shared.phase.get() {
            Phase::Idle => None,
            Phase::Resuming | Phase::Ready => self.active.as_ref(),
        };
        let Some(active) = live else {
            return;
        };
        if active.backend.state() != ContextState::Running {
            return;
        }
        let request = EffectRequest::new(kind, active.backend.current_time());
        let mut ctx = ToneContext::for_request(
            &request,
            active.backend.sample_rate(),
            &mut self.noise,
            &mut self.rng,
        );
        let graph = generate(request.kind, &mut ctx);
        if let Err(e) = active.backend.schedule(&graph, &active.master) {
            log::debug!("{} at {:.3}s dropped: {}", kind, request.requested_at, e);
        }
    }

    /// Stop the ambient bed and release the audio output. A later
    /// [`activate`](Self::activate) opens a fresh one.
    pub fn teardown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let was_ready = self.shared.phase.get() == Phase::Ready;
        self.shared.phase.set(Phase::Idle);
        self.shared.muted.set(true);
        self.shared.attempt.set(self.shared.attempt.get().wrapping_add(1));
        active.composer.borrow_mut().stop();
        if active.backend.state() != ContextState::Closed {
            active.backend.close();
        }
        if was_ready {
            log::info!("audio session closed");
        }
    }
}

// Completes activation once the context reports it is running
fn resume_handler<B: AudioBackend + 'static>(
    shared: Rc<Shared>,
    attempt: u32,
    backend: Rc<B>,
    composer: Rc<RefCell<AmbientComposer<B>>>,
    ambient: bool,
) -> Box<dyn FnOnce(Result<(), AudioError>)> {
    Box::new(move |result| {
        if shared.attempt.get() != attempt || shared.phase.get() != Phase::Resuming {
            return;
        }
        match result {
            Ok(()) => {
                shared.phase.set(Phase::Ready);
                shared.muted.set(false);
                if ambient {
                    composer.borrow_mut().start();
                }
                log::info!(
                    "audio session active ({} Hz, {:?})",
                    backend.sample_rate(),
                    backend.state()
                );
            }
            Err(e) => {
                log::warn!("audio disabled: {}", e);
                shared.phase.set(Phase::Idle);
                backend.close();
            }
        }
        shared.notify();
    })
}

impl<B: AudioBackend + 'static> Drop for AudioSession<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
