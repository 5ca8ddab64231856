//! Uniform white-noise buffers, the raw material for wind, crackle and
//! percussive effects.

use fnv::FnvHashMap;
use rand::Rng;
use std::rc::Rc;

/// Mono block of samples in \[-1, 1\]. Immutable once built, so clones share
/// the same storage.
#[derive(Clone, Debug)]
pub struct NoiseBuffer {
    pub sample_rate: f32,
    pub samples: Rc<[f32]>,
}

impl NoiseBuffer {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn shares_storage(&self, other: &NoiseBuffer) -> bool {
        Rc::ptr_eq(&self.samples, &other.samples)
    }
}

pub fn sample_count(sample_rate: f32, duration_secs: f64) -> usize {
    ((sample_rate as f64 * duration_secs).round() as usize).max(1)
}

pub fn create_noise_buffer(sample_rate: f32, duration_secs: f64) -> NoiseBuffer {
    create_noise_buffer_with(&mut rand::thread_rng(), sample_rate, duration_secs)
}

pub fn create_noise_buffer_with<R: Rng>(
    rng: &mut R,
    sample_rate: f32,
    duration_secs: f64,
) -> NoiseBuffer {
    let len = sample_count(sample_rate, duration_secs);
    let samples: Rc<[f32]> = (0..len).map(|_| rng.gen_range(-1.0_f32..=1.0)).collect();
    NoiseBuffer {
        sample_rate,
        samples,
    }
}

/// Reuses one buffer per sample count instead of resynthesizing it for
/// every effect.
#[derive(Default)]
pub struct NoiseCache {
    buffers: FnvHashMap<usize, NoiseBuffer>,
}

impl NoiseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<R: Rng>(
        &mut self,
        rng: &mut R,
        sample_rate: f32,
        duration_secs: f64,
    ) -> NoiseBuffer {
        let len = sample_count(sample_rate, duration_secs);
        self.buffers
            .entry(len)
            .or_insert_with(|| create_noise_buffer_with(rng, sample_rate, duration_secs))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
