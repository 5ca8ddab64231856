//! Sound effect catalogue. Each generator describes one short sound starting
//! at `ToneContext::start`; nothing here touches a live audio graph, so a
//! generator can be called whatever state the context is in.

use crate::core::constants::{SCHEDULE_LEAD_SECS, SILENCE};
use crate::core::error::AudioError;
use crate::core::graph::{Automation, FilterKind, SubGraph, Voice, Waveform};
use crate::core::noise::NoiseCache;
use rand::rngs::StdRng;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Click,
    Hover,
    Whoosh,
    Bell,
    Shake,
    Fire,
    Success,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Click,
        EffectKind::Hover,
        EffectKind::Whoosh,
        EffectKind::Bell,
        EffectKind::Shake,
        EffectKind::Fire,
        EffectKind::Success,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Click => "click",
            EffectKind::Hover => "hover",
            EffectKind::Whoosh => "whoosh",
            EffectKind::Bell => "bell",
            EffectKind::Shake => "shake",
            EffectKind::Fire => "fire",
            EffectKind::Success => "success",
        }
    }

    /// Upper bound on how long any node of this effect stays alive, measured
    /// from the request time.
    pub fn max_duration(self) -> f64 {
        match self {
            EffectKind::Click => 0.1,
            EffectKind::Hover => 0.15,
            EffectKind::Whoosh => 0.45,
            EffectKind::Bell => 3.1,
            EffectKind::Shake => 0.15,
            EffectKind::Fire => 1.6,
            EffectKind::Success => 0.8,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        EffectKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AudioError::UnknownEffect(wanted.to_string()))
    }
}

/// A single dispatch of an effect; lives only as long as the dispatch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectRequest {
    pub kind: EffectKind,
    pub requested_at: f64,
}

impl EffectRequest {
    pub fn new(kind: EffectKind, requested_at: f64) -> Self {
        Self { kind, requested_at }
    }
}

pub struct ToneContext<'a> {
    pub start: f64,
    pub sample_rate: f32,
    pub noise: &'a mut NoiseCache,
    pub rng: &'a mut StdRng,
}

impl<'a> ToneContext<'a> {
    pub fn for_request(
        request: &EffectRequest,
        sample_rate: f32,
        noise: &'a mut NoiseCache,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            start: request.requested_at + SCHEDULE_LEAD_SECS,
            sample_rate,
            noise,
            rng,
        }
    }
}

pub fn generate(kind: EffectKind, ctx: &mut ToneContext<'_>) -> SubGraph {
    match kind {
        EffectKind::Click => click(ctx),
        EffectKind::Hover => hover(ctx),
        EffectKind::Whoosh => whoosh(ctx),
        EffectKind::Bell => bell(ctx),
        EffectKind::Shake => shake(ctx),
        EffectKind::Fire => fire(ctx),
        EffectKind::Success => success(ctx),
    }
}

pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}

// Attack to `peak`, then exponential decay to silence at `end`
fn pluck(t0: f64, attack: f64, peak: f32, end: f64) -> Automation {
    Automation::constant(0.0, t0)
        .linear_to(peak, t0 + attack)
        .exp_to(SILENCE, end)
}

/// Short bright descending sine, ~80 ms.
pub fn click(ctx: &mut ToneContext<'_>) -> SubGraph {
    let t0 = ctx.start;
    let end = t0 + 0.08;
    let mut g = SubGraph::new("click");
    g.push(
        Voice::tone(
            Waveform::Sine,
            Automation::constant(1200.0, t0).exp_to(600.0, end),
            t0,
            end,
        )
        .with_envelope(pluck(t0, 0.005, 0.25, end)),
    );
    g
}

/// Faint steady triangle, ~120 ms.
pub fn hover(ctx: &mut ToneContext<'_>) -> SubGraph {
    let t0 = ctx.start;
    let end = t0 + 0.12;
    let mut g = SubGraph::new("hover");
    g.push(
        Voice::tone(Waveform::Triangle, Automation::constant(660.0, t0), t0, end).with_envelope(
            Automation::constant(0.0, t0)
                .linear_to(0.04, t0 + 0.02)
                .linear_to(0.04, t0 + 0.09)
                .linear_to(0.0, end),
        ),
    );
    g
}

/// Band-passed noise whose centre rises then falls, ~400 ms.
pub fn whoosh(ctx: &mut ToneContext<'_>) -> SubGraph {
    let t0 = ctx.start;
    let end = t0 + 0.4;
    let buffer = ctx.noise.get(ctx.rng, ctx.sample_rate, 0.4);
    let mut g = SubGraph::new("whoosh");
    g.push(
        Voice::noise(buffer, 0.0, t0, end)
            .with_filter(
                FilterKind::Bandpass,
                Automation::constant(300.0, t0)
                    .exp_to(2400.0, t0 + 0.2)
                    .exp_to(400.0, end),
                1.2,
            )
            .with_envelope(
                Automation::constant(0.0, t0)
                    .linear_to(0.3, t0 + 0.15)
                    .exp_to(SILENCE, end),
            ),
    );
    g
}

/// Three stacked partials, each with its own slow wobble, ~3 s decay.
pub fn bell(ctx: &mut ToneContext<'_>) -> SubGraph {
    const PARTIALS: [(f32, f32, f32, f32); 3] = [
        // (hz, level, wobble hz, wobble depth hz)
        (528.0, 0.12, 0.5, 3.0),
        (792.0, 0.07, 0.7, 4.0),
        (1056.0, 0.05, 0.9, 5.0),
    ];
    let t0 = ctx.start;
    let end = t0 + 3.0;
    let mut g = SubGraph::new("bell");
    for (hz, level, rate, depth) in PARTIALS {
        g.push(
            Voice::tone(Waveform::Sine, Automation::constant(hz, t0), t0, end)
                .with_vibrato(rate, depth)
                .with_envelope(pluck(t0, 0.01, level, end)),
        );
    }
    g
}

/// Three quick band-passed noise bursts, 40 ms apart.
pub fn shake(ctx: &mut ToneContext<'_>) -> SubGraph {
    const BURST: f64 = 0.04;
    let t0 = ctx.start;
    let buffer = ctx.noise.get(ctx.rng, ctx.sample_rate, BURST);
    let mut g = SubGraph::new("shake");
    for i in 0..3 {
        let s = t0 + i as f64 * BURST;
        let e = s + BURST;
        let centre = 2500.0 + i as f32 * 500.0;
        g.push(
            Voice::noise(buffer.clone(), 0.0, s, e)
                .with_filter(FilterKind::Bandpass, Automation::constant(centre, s), 3.0)
                .with_envelope(pluck(s, 0.002, 0.25, e)),
        );
    }
    g
}

pub const FIRE_CRACKLES: usize = 6;

/// Low-passed noise bed with six random high-passed crackles on top, ~1.5 s.
pub fn fire(ctx: &mut ToneContext<'_>) -> SubGraph {
    const BED: f64 = 1.5;
    let t0 = ctx.start;
    let end = t0 + BED;
    let buffer = ctx.noise.get(ctx.rng, ctx.sample_rate, BED);
    let mut g = SubGraph::new("fire");
    g.push(
        Voice::noise(buffer.clone(), 0.0, t0, end)
            .with_filter(FilterKind::Lowpass, Automation::constant(800.0, t0), 0.7)
            .with_envelope(
                Automation::constant(0.0, t0)
                    .linear_to(0.12, t0 + 0.2)
                    .linear_to(0.12, t0 + 1.1)
                    .linear_to(0.0, end),
            ),
    );
    for _ in 0..FIRE_CRACKLES {
        let len = ctx.rng.gen_range(0.02..0.05);
        let s = t0 + ctx.rng.gen_range(0.0..BED - len);
        let e = s + len;
        let level = ctx.rng.gen_range(0.1_f32..0.3);
        // Each crackle reads from a different spot of the shared bed buffer
        let offset = ctx.rng.gen_range(0.0..BED - len);
        g.push(
            Voice::noise(buffer.clone(), offset, s, e)
                .with_filter(FilterKind::Highpass, Automation::constant(3000.0, s), 1.0)
                .with_envelope(pluck(s, 0.002, level, e)),
        );
    }
    g
}

/// C5, E5, G5 in quick succession, ~0.7 s.
pub fn success(ctx: &mut ToneContext<'_>) -> SubGraph {
    const STEP: f64 = 0.12;
    const NOTE: f64 = 0.45;
    let t0 = ctx.start;
    let mut g = SubGraph::new("success");
    for (i, midi) in [72.0, 76.0, 79.0].into_iter().enumerate() {
        let s = t0 + i as f64 * STEP;
        let e = s + NOTE;
        g.push(
            Voice::tone(Waveform::Sine, Automation::constant(midi_to_hz(midi), s), s, e)
                .with_envelope(pluck(s, 0.01, 0.18, e)),
        );
    }
    g
}
