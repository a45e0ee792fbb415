//! Extracted sweeps and their post-extraction conditioning.
//! Filters run in place on the acquisition thread and degrade to no-ops on
//! degenerate input instead of failing.

use std::f64::consts::PI;

use crate::config::FilterConfig;

/// One fixed-length sweep aligned on a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub samples: Vec<f64>,
    /// Position of the trigger within `samples` (always the pre-trigger length).
    pub trigger_index: usize,
    /// Sub-sample crossing position after `trigger_index`, in `[0, 1)`.
    pub trigger_offset: f64,
    /// Absolute ring index of `samples[0]`.
    pub start_index: u64,
}

impl Record {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Absolute index of the sample preceding the crossing.
    pub fn absolute_trigger_index(&self) -> u64 {
        self.start_index + self.trigger_index as u64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0, |acc, &s| acc.max(s.abs()))
    }
}

/// One-pole high-pass (DC and drift removal), in place.
pub fn high_pass(samples: &mut [f64], sample_rate: f64, cutoff_hz: f64) {
    if samples.len() < 2 || !(cutoff_hz > 0.0) {
        return;
    }

    let dt = 1.0 / sample_rate;
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let alpha = rc / (rc + dt);

    let mut prev_x = samples[0];
    let mut prev_y = samples[0];
    for s in samples.iter_mut().skip(1) {
        let x = *s;
        let y = alpha * (prev_y + x - prev_x);
        *s = y;
        prev_x = x;
        prev_y = y;
    }
}

/// One-pole low-pass (noise smoothing), in place.
pub fn low_pass(samples: &mut [f64], sample_rate: f64, cutoff_hz: f64) {
    if samples.len() < 2 || !(cutoff_hz > 0.0) {
        return;
    }

    let dt = 1.0 / sample_rate;
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let alpha = dt / (rc + dt);

    let mut y = samples[0];
    for s in samples.iter_mut().skip(1) {
        y += alpha * (*s - y);
        *s = y;
    }
}

/// Scale by `1 + gain` and hard-clip to `[-1, 1]`. No-op for `gain <= 0`.
pub fn boost(samples: &mut [f64], gain: f64) {
    if samples.is_empty() || !(gain > 0.0) {
        return;
    }
    let multiplier = 1.0 + gain;
    for s in samples.iter_mut() {
        *s = (*s * multiplier).clamp(-1.0, 1.0);
    }
}

/// Ordered conditioning chain: high-pass, low-pass, then optional boost.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    sample_rate: f64,
    high_pass_hz: f64,
    low_pass_hz: f64,
    boost: f64,
}

impl RecordFilter {
    pub fn new(sample_rate: f64, config: &FilterConfig) -> Self {
        Self {
            sample_rate,
            high_pass_hz: config.high_pass_hz,
            low_pass_hz: config.low_pass_hz,
            boost: config.boost,
        }
    }

    pub fn apply(&self, record: &mut Record) {
        high_pass(&mut record.samples, self.sample_rate, self.high_pass_hz);
        low_pass(&mut record.samples, self.sample_rate, self.low_pass_hz);
        boost(&mut record.samples, self.boost);
    }
}
