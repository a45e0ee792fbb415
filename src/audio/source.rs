//! Synthetic sample sources for running the scope without a capture device.
//! A `Sampler` walks a `SignalSource` at consecutive absolute indices, one
//! fixed-size batch per step.

use std::f64::consts::PI;

/// Deterministic signal addressed by absolute sample index.
pub trait SignalSource: Send {
    fn value_at(&self, n: u64) -> f64;
    fn sample_rate(&self) -> u32;
}

#[derive(Debug, Clone, Copy)]
pub struct Sine {
    pub frequency: f64,
    pub amplitude: f64,
    pub sample_rate: u32,
}

impl Sine {
    pub fn new(frequency: f64, amplitude: f64, sample_rate: u32) -> Self {
        Self {
            frequency,
            amplitude,
            sample_rate,
        }
    }
}

impl SignalSource for Sine {
    fn value_at(&self, n: u64) -> f64 {
        let t = n as f64 / f64::from(self.sample_rate);
        self.amplitude * (2.0 * PI * self.frequency * t).sin()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Produces contiguous batches from a source, tracking the next absolute index.
pub struct Sampler<S> {
    source: S,
    next_index: u64,
}

impl<S: SignalSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            next_index: 0,
        }
    }

    /// Fill `out` with the next `out.len()` samples and advance.
    pub fn step(&mut self, out: &mut [f64]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.source.value_at(self.next_index + i as u64);
        }
        self.next_index += out.len() as u64;
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }
}
