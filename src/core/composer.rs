use crate::core::constants::*;
use crate::core::graph::{
    AudioBackend, Automation, ContextState, DroneSpec, SubGraph, Vibrato, Voice, Waveform,
};
use crate::core::task::{RepeatingTask, TimerHost};
use crate::core::tones::midi_to_hz;
use rand::prelude::*;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct ComposerParams {
    pub drone_midi: f32,
    pub drone_level: f32,
    pub drone_fade_in_secs: f64,
    pub drone_wobble: Vibrato,
    /// Fade-out applied when the drone is stopped.
    pub drone_release_secs: f64,
    pub root_midi: i32,
    pub scale: &'static [i32],
    pub octaves: i32,
    pub note_secs: (f64, f64),
    pub interval_secs: (f64, f64),
    pub level: f32,
    pub vibrato: Vibrato,
    pub echo_delay_secs: f64,
    pub echo_ratio: f32,
}

impl Default for ComposerParams {
    fn default() -> Self {
        Self {
            drone_midi: DRONE_MIDI,
            drone_level: DRONE_LEVEL,
            drone_fade_in_secs: DRONE_FADE_IN_SECS,
            drone_wobble: Vibrato {
                rate_hz: DRONE_LFO_HZ,
                depth_hz: DRONE_LFO_DEPTH_HZ,
            },
            drone_release_secs: DRONE_RELEASE_SECS,
            root_midi: MELODY_ROOT_MIDI,
            scale: MINOR_PENTATONIC,
            octaves: MELODY_OCTAVES,
            note_secs: (MELODY_NOTE_MIN_SECS, MELODY_NOTE_MAX_SECS),
            interval_secs: (MELODY_INTERVAL_MIN_SECS, MELODY_INTERVAL_MAX_SECS),
            level: MELODY_LEVEL,
            vibrato: Vibrato {
                rate_hz: MELODY_VIBRATO_HZ,
                depth_hz: MELODY_VIBRATO_DEPTH_HZ,
            },
            echo_delay_secs: ECHO_DELAY_SECS,
            echo_ratio: ECHO_LEVEL_RATIO,
        }
    }
}

impl ComposerParams {
    /// Every scale degree across `octaves` octaves above the root, low to high.
    pub fn pentatonic_set(&self) -> Vec<f32> {
        (0..self.octaves)
            .flat_map(|oct| {
                self.scale
                    .iter()
                    .map(move |deg| midi_to_hz((self.root_midi + oct * 12 + deg) as f32))
            })
            .collect()
    }

    pub fn drone(&self, start: f64) -> DroneSpec {
        DroneSpec {
            waveform: Waveform::Sine,
            frequency_hz: midi_to_hz(self.drone_midi),
            level: self.drone_level,
            fade_in_secs: self.drone_fade_in_secs,
            wobble: self.drone_wobble,
            start,
        }
    }
}

/// One melody note: a vibrato sine with a slow attack and long decay, plus a
/// quieter echo entering shortly after and ending with the note.
pub fn melody_note(params: &ComposerParams, frequency_hz: f32, start: f64, duration: f64) -> SubGraph {
    let end = start + duration;
    let attack = (duration * 0.15).min(0.4);
    let mut g = SubGraph::new("melody");
    g.push(
        Voice::tone(Waveform::Sine, Automation::constant(frequency_hz, start), start, end)
            .with_vibrato(params.vibrato.rate_hz, params.vibrato.depth_hz)
            .with_envelope(
                Automation::constant(0.0, start)
                    .linear_to(params.level, start + attack)
                    .exp_to(SILENCE, end),
            ),
    );
    let echo_start = start + params.echo_delay_secs;
    if echo_start + attack < end {
        g.push(
            Voice::tone(
                Waveform::Sine,
                Automation::constant(frequency_hz, echo_start),
                echo_start,
                end,
            )
            .with_envelope(
                Automation::constant(0.0, echo_start)
                    .linear_to(params.level * params.echo_ratio, echo_start + attack)
                    .exp_to(SILENCE, end),
            ),
        );
    }
    g
}

pub fn note_duration<R: Rng>(rng: &mut R, params: &ComposerParams) -> f64 {
    rng.gen_range(params.note_secs.0..=params.note_secs.1)
}

pub fn next_interval<R: Rng>(rng: &mut R, params: &ComposerParams) -> f64 {
    rng.gen_range(params.interval_secs.0..=params.interval_secs.1)
}

struct Running<B: AudioBackend> {
    drone: B::Drone,
    melody: RepeatingTask,
}

/// Generative ambient bed: a drone plus a randomly timed pentatonic melody.
///
/// Two states only, idle and running. The drone and the melody task are the
/// only nodes in the engine without a fixed stop time; both are torn down by
/// [`stop`](AmbientComposer::stop) or when the composer is dropped.
pub struct AmbientComposer<B: AudioBackend + 'static> {
    backend: Rc<B>,
    destination: B::Bus,
    timers: Rc<dyn TimerHost>,
    params: ComposerParams,
    rng: StdRng,
    running: Option<Running<B>>,
}

impl<B: AudioBackend + 'static> AmbientComposer<B> {
    pub fn new(
        backend: Rc<B>,
        destination: B::Bus,
        timers: Rc<dyn TimerHost>,
        params: ComposerParams,
        rng: StdRng,
    ) -> Self {
        Self {
            backend,
            destination,
            timers,
            params,
            rng,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn params(&self) -> &ComposerParams {
        &self.params
    }

    /// Whether a further melody tick is queued.
    pub fn has_pending_tick(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| r.melody.is_pending())
            .unwrap_or(false)
    }

    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let spec = self.params.drone(self.backend.current_time());
        let drone = match self.backend.start_drone(&spec, &self.destination) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("ambient drone not started: {}", e);
                return;
            }
        };

        let backend = Rc::clone(&self.backend);
        let destination = self.destination.clone();
        let params = self.params.clone();
        let notes = params.pentatonic_set();
        let mut rng = StdRng::seed_from_u64(self.rng.gen());
        let melody = RepeatingTask::start(Rc::clone(&self.timers), move || {
            if backend.state() == ContextState::Running {
                if let Some(&hz) = notes.choose(&mut rng) {
                    let start = backend.current_time() + SCHEDULE_LEAD_SECS;
                    let note = melody_note(&params, hz, start, note_duration(&mut rng, &params));
                    if let Err(e) = backend.schedule(&note, &destination) {
                        log::debug!("melody note dropped: {}", e);
                    }
                }
            }
            Some(next_interval(&mut rng, &params))
        });

        log::info!(
            "ambient composer started (drone {:.1} Hz)",
            spec.frequency_hz
        );
        self.running = Some(Running { drone, melody });
    }

    pub fn stop(&mut self) {
        let Some(Running { drone, melody }) = self.running.take() else {
            return;
        };
        melody.cancel();
        self.backend
            .stop_drone(drone, self.params.drone_release_secs);
        log::info!("ambient composer stopped after {} notes", melody.ticks());
    }
}

impl<B: AudioBackend + 'static> Drop for AmbientComposer<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pentatonic_set_spans_octaves_in_order() {
        let p = ComposerParams::default();
        let set = p.pentatonic_set();
        assert_eq!(set.len(), MINOR_PENTATONIC.len() * MELODY_OCTAVES as usize);
        assert!(set.windows(2).all(|w| w[0] < w[1]));
        let span = set[set.len() - 1] / set[0];
        assert!(span > 4.0, "expected more than two octaves, got ratio {span}");
    }

    #[test]
    fn note_envelope_ends_with_the_note() {
        let p = ComposerParams::default();
        let g = melody_note(&p, 440.0, 1.0, 3.0);
        assert_eq!(g.voices.len(), 2);
        for v in &g.voices {
            assert!((v.stop - 4.0).abs() < 1e-9);
            assert!(v.envelope.end_time() <= v.stop + 1e-9);
        }
        assert!(g.voices[1].envelope.peak() < g.voices[0].envelope.peak());
    }
}
