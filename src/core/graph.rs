//! Value-like descriptions of short-lived audio sub-graphs and the backend
//! seam that turns them into real nodes.
//!
//! A generator only ever produces a [`SubGraph`]; the [`AudioBackend`] that
//! schedules it is responsible for creating, starting, stopping and finally
//! disconnecting every node it builds from the description.

use crate::core::constants::SILENCE;
use crate::core::error::AudioError;
use crate::core::noise::NoiseBuffer;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
}

/// One scheduled change of an audio parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamEvent {
    Set { value: f32, at: f64 },
    Linear { value: f32, at: f64 },
    Exponential { value: f32, at: f64 },
}

impl ParamEvent {
    pub fn at(&self) -> f64 {
        match *self {
            ParamEvent::Set { at, .. }
            | ParamEvent::Linear { at, .. }
            | ParamEvent::Exponential { at, .. } => at,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            ParamEvent::Set { value, .. }
            | ParamEvent::Linear { value, .. }
            | ParamEvent::Exponential { value, .. } => value,
        }
    }
}

/// Time-ordered parameter curve, e.g. a gain envelope or a frequency sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Automation {
    events: SmallVec<[ParamEvent; 4]>,
}

impl Automation {
    pub fn constant(value: f32, at: f64) -> Self {
        let mut events = SmallVec::new();
        events.push(ParamEvent::Set { value, at });
        Self { events }
    }

    pub fn linear_to(mut self, value: f32, at: f64) -> Self {
        self.events.push(ParamEvent::Linear { value, at });
        self
    }

    /// Exponential ramps are undefined at zero, so targets are floored at
    /// [`SILENCE`].
    pub fn exp_to(mut self, value: f32, at: f64) -> Self {
        self.events.push(ParamEvent::Exponential {
            value: value.max(SILENCE),
            at,
        });
        self
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    pub fn end_time(&self) -> f64 {
        self.events.iter().map(ParamEvent::at).fold(f64::MIN, f64::max)
    }

    pub fn peak(&self) -> f32 {
        self.events.iter().map(ParamEvent::value).fold(0.0, f32::max)
    }
}

/// Sine LFO added onto an oscillator's frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vibrato {
    pub rate_hz: f32,
    pub depth_hz: f32,
}

#[derive(Clone, Debug)]
pub enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: Automation,
        vibrato: Option<Vibrato>,
    },
    Noise {
        buffer: NoiseBuffer,
        offset: f64,
    },
}

#[derive(Clone, Debug)]
pub struct Filter {
    pub kind: FilterKind,
    pub frequency: Automation,
    pub q: f32,
}

/// generator -> [filter] -> gain envelope -> destination, live from
/// `start` until `stop`.
#[derive(Clone, Debug)]
pub struct Voice {
    pub source: Source,
    pub filter: Option<Filter>,
    pub envelope: Automation,
    pub start: f64,
    pub stop: f64,
}

impl Voice {
    pub fn tone(waveform: Waveform, frequency: Automation, start: f64, stop: f64) -> Self {
        Self {
            source: Source::Oscillator {
                waveform,
                frequency,
                vibrato: None,
            },
            filter: None,
            envelope: Automation::constant(0.0, start),
            start,
            stop,
        }
    }

    pub fn noise(buffer: NoiseBuffer, offset: f64, start: f64, stop: f64) -> Self {
        Self {
            source: Source::Noise { buffer, offset },
            filter: None,
            envelope: Automation::constant(0.0, start),
            start,
            stop,
        }
    }

    pub fn with_envelope(mut self, envelope: Automation) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_filter(mut self, kind: FilterKind, frequency: Automation, q: f32) -> Self {
        self.filter = Some(Filter { kind, frequency, q });
        self
    }

    pub fn with_vibrato(mut self, rate_hz: f32, depth_hz: f32) -> Self {
        if let Source::Oscillator { vibrato, .. } = &mut self.source {
            *vibrato = Some(Vibrato { rate_hz, depth_hz });
        }
        self
    }

    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }

    pub fn is_noise(&self) -> bool {
        matches!(self.source, Source::Noise { .. })
    }

    pub fn filter_kind(&self) -> Option<FilterKind> {
        self.filter.as_ref().map(|f| f.kind)
    }

    /// Number of audio nodes a backend builds for this voice.
    pub fn node_count(&self) -> usize {
        let vibrato = match &self.source {
            Source::Oscillator {
                vibrato: Some(_), ..
            } => 2,
            _ => 0,
        };
        2 + vibrato + usize::from(self.filter.is_some())
    }
}

/// A labelled set of voices making up one discrete sound.
#[derive(Clone, Debug)]
pub struct SubGraph {
    pub label: &'static str,
    pub voices: SmallVec<[Voice; 3]>,
}

impl SubGraph {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            voices: SmallVec::new(),
        }
    }

    pub fn push(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    pub fn start(&self) -> f64 {
        self.voices.iter().map(|v| v.start).fold(f64::MAX, f64::min)
    }

    pub fn end(&self) -> f64 {
        self.voices.iter().map(|v| v.stop).fold(f64::MIN, f64::max)
    }

    pub fn node_count(&self) -> usize {
        self.voices.iter().map(Voice::node_count).sum()
    }
}

/// The composer's sustained tone. Lives until explicitly stopped.
#[derive(Clone, Debug, PartialEq)]
pub struct DroneSpec {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    pub level: f32,
    pub fade_in_secs: f64,
    pub wobble: Vibrato,
    pub start: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// A concrete audio graph (WebAudio in the browser, a recorder in tests).
///
/// Methods take `&self`: the graph is shared between the session and the
/// composer's timer callbacks on a single event loop.
pub trait AudioBackend {
    /// Long-lived gain node that sounds are routed into.
    type Bus: Clone;
    /// Handle to a running drone, consumed when it is stopped.
    type Drone;

    fn state(&self) -> ContextState;
    fn current_time(&self) -> f64;
    fn sample_rate(&self) -> f32;
    /// Ask a suspended context to run. `done` is called exactly once with
    /// the outcome, possibly before `resume` returns.
    fn resume(&self, done: Box<dyn FnOnce(Result<(), AudioError>)>);
    fn close(&self);

    /// Gain node connected to the hardware destination.
    fn create_master_bus(&self, level: f32) -> Result<Self::Bus, AudioError>;
    /// Linear gain ramp to `target`, starting at `at` and lasting `window`.
    fn ramp_bus(&self, bus: &Self::Bus, target: f32, at: f64, window: f64);

    /// Build, start and arrange teardown of every voice in `graph`.
    fn schedule(&self, graph: &SubGraph, destination: &Self::Bus) -> Result<(), AudioError>;

    fn start_drone(&self, spec: &DroneSpec, destination: &Self::Bus)
        -> Result<Self::Drone, AudioError>;
    /// Fade the drone out over `release_secs`, then stop and disconnect it.
    fn stop_drone(&self, drone: Self::Drone, release_secs: f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_targets_are_floored() {
        let env = Automation::constant(0.3, 0.0).exp_to(0.0, 0.1);
        assert_eq!(env.events()[1].value(), SILENCE);
        assert!((env.end_time() - 0.1).abs() < 1e-12);
        assert!((env.peak() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn vibrato_is_ignored_for_noise() {
        let buf = crate::core::noise::create_noise_buffer(8000.0, 0.01);
        let v = Voice::noise(buf, 0.0, 0.0, 0.01).with_vibrato(4.0, 2.0);
        assert_eq!(v.node_count(), 2);
    }
}
