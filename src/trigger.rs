//! Edge trigger with hysteresis and sub-sample interpolation.
//!
//! Samples are scaled by the polarity so a falling edge is detected as a
//! rising edge of the negated signal. A sample at or below `lower` arms the
//! detector; while armed, the zero crossing (`prev <= 0 < curr`, slope at
//! least `epsilon`) is latched, and the first sample at or above `upper`
//! qualifies it. Dropping back to `lower` re-arms and forgets the latch, so
//! noise wandering around zero never qualifies on its own.

use serde::Deserialize;

use crate::audio::ring_buffer::RingBuffer;
use crate::config::TriggerConfig;

/// Largest offset below one. `-prev / (curr - prev)` rounds up to exactly 1.0
/// when `curr` is tiny next to a large negative `prev`.
const MAX_OFFSET: f64 = 1.0 - f64::EPSILON / 2.0;

/// Edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Rising,
    Falling,
}

impl Polarity {
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Polarity::Rising => 1.0,
            Polarity::Falling => -1.0,
        }
    }
}

/// A qualifying crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerEvent {
    /// Absolute index of the sample immediately before the crossing.
    pub index: u64,
    /// Fractional crossing position between `index` and `index + 1`, in `[0, 1)`.
    pub offset: f64,
}

#[derive(Debug, Clone)]
pub struct TriggerDetector {
    polarity: Polarity,
    lower: f64,
    upper: f64,
    epsilon: f64,
}

impl TriggerDetector {
    pub fn new(polarity: Polarity, lower: f64, upper: f64, epsilon: f64) -> Self {
        Self {
            polarity,
            lower: lower.min(upper),
            upper: lower.max(upper),
            epsilon,
        }
    }

    pub fn from_config(config: &TriggerConfig) -> Self {
        Self::new(config.polarity, config.lower, config.upper, config.epsilon)
    }

    /// First qualifying event in `[start, end)` of the ring. `end` is clamped
    /// to the newest retained sample; `None` if `start` is no longer readable
    /// or nothing qualifies.
    pub fn find(&self, ring: &RingBuffer, start: u64, end: u64) -> Option<TriggerEvent> {
        let mut window = Vec::new();
        self.find_with_scratch(ring, start, end, &mut window)
    }

    /// Same as [`find`](Self::find), copying the window into a caller-owned
    /// scratch buffer.
    pub fn find_with_scratch(
        &self,
        ring: &RingBuffer,
        start: u64,
        end: u64,
        window: &mut Vec<f64>,
    ) -> Option<TriggerEvent> {
        if end <= start.saturating_add(1) {
            return None;
        }
        let (_, newest) = ring.bounds()?;
        let end = end.min(newest + 1);
        if end <= start + 1 {
            return None;
        }
        ring.read_range_into(start, end, window).ok()?;
        self.scan(window, start)
    }

    /// Scan a contiguous window whose first sample sits at absolute index
    /// `first_index`.
    pub fn scan(&self, samples: &[f64], first_index: u64) -> Option<TriggerEvent> {
        let sign = self.polarity.sign();
        let (&first, rest) = samples.split_first()?;

        let mut prev = sign * first;
        let mut armed = false;
        let mut latched: Option<TriggerEvent> = None;

        for (i, &raw) in rest.iter().enumerate() {
            let curr = sign * raw;
            let prev_index = first_index + i as u64;

            if prev <= self.lower {
                armed = true;
                latched = None;
            }

            if armed {
                let slope = curr - prev;
                if prev <= 0.0 && curr > 0.0 && slope >= self.epsilon {
                    latched = Some(TriggerEvent {
                        index: prev_index,
                        offset: (-prev / slope).min(MAX_OFFSET),
                    });
                }
                if curr >= self.upper {
                    if let Some(event) = latched {
                        return Some(event);
                    }
                }
            }

            prev = curr;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(samples: &[f64]) -> RingBuffer {
        let ring = RingBuffer::new(samples.len().next_power_of_two()).unwrap();
        ring.write_batch(0, samples);
        ring
    }

    fn detector(polarity: Polarity, lower: f64, upper: f64) -> TriggerDetector {
        TriggerDetector::new(polarity, lower, upper, 1e-9)
    }

    #[test]
    fn rising_edge() {
        let ring = ring_with(&[-0.5, -0.2, 0.2, 0.5]);
        let event = detector(Polarity::Rising, -0.01, 0.01)
            .find(&ring, 0, 4)
            .expect("expected rising trigger");

        assert_eq!(event.index, 1);
        assert!(event.offset > 0.0 && event.offset < 1.0, "offset = {}", event.offset);
        assert!((event.offset - 0.5).abs() < 1e-12);
    }

    #[test]
    fn falling_edge_mirrors_rising() {
        let ring = ring_with(&[0.5, 0.2, -0.2, -0.5]);
        let event = detector(Polarity::Falling, -0.01, 0.01)
            .find(&ring, 0, 4)
            .expect("expected falling trigger");

        assert_eq!(event.index, 1);
        assert!((event.offset - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rising_detector_ignores_falling_edge() {
        let ring = ring_with(&[0.5, 0.2, -0.2, -0.5]);
        assert!(detector(Polarity::Rising, -0.01, 0.01).find(&ring, 0, 4).is_none());
    }

    #[test]
    fn interpolates_sub_sample_offset() {
        let mut samples = [0.0; 16];
        samples[6] = -0.2;
        samples[7] = 0.3;
        samples[8] = 0.5;
        let ring = ring_with(&samples);

        let event = detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 15).unwrap();
        assert_eq!(event.index, 6);
        assert!((event.offset - 0.4).abs() < 1e-9, "offset = {}", event.offset);
    }

    #[test]
    fn requires_arming_below_lower() {
        // Crosses zero but never dips to the lower threshold.
        let ring = ring_with(&[-0.05, 0.2, -0.05, 0.2]);
        assert!(detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 4).is_none());
    }

    #[test]
    fn requires_reaching_upper() {
        let ring = ring_with(&[-0.5, 0.05, -0.5, 0.05]);
        assert!(detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 4).is_none());
    }

    #[test]
    fn slow_edge_reports_zero_crossing() {
        // Crossing happens below `upper`; qualification comes two samples later.
        let ring = ring_with(&[-0.3, -0.1, 0.02, 0.06, 0.12, 0.3]);
        let event = detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 6).unwrap();
        assert_eq!(event.index, 1);
        assert!((event.offset - 0.1 / 0.12).abs() < 1e-9);
    }

    #[test]
    fn shallow_slope_is_noise() {
        let shallow = TriggerDetector::new(Polarity::Rising, -0.1, 0.1, 0.5);
        // Slope at the crossing is 0.4; the later steep step never crosses zero.
        let ring = ring_with(&[-0.2, 0.2, 0.9]);
        assert!(shallow.find(&ring, 0, 3).is_none());

        // Same detector still fires on a steep crossing after re-arming.
        let ring = ring_with(&[-0.2, 0.2, -0.5, 0.5]);
        let event = shallow.find(&ring, 0, 4).unwrap();
        assert_eq!(event.index, 2);
    }

    #[test]
    fn returns_first_event_only() {
        let ring = ring_with(&[-0.5, 0.5, -0.5, 0.5]);
        let event = detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 4).unwrap();
        assert_eq!(event.index, 0);
    }

    #[test]
    fn degenerate_windows() {
        let ring = ring_with(&[-0.5, 0.5, -0.5, 0.5]);
        let det = detector(Polarity::Rising, -0.1, 0.1);
        assert!(det.find(&ring, 2, 3).is_none());
        assert!(det.find(&ring, 3, 1).is_none());

        let empty = RingBuffer::new(4).unwrap();
        assert!(det.find(&empty, 0, 4).is_none());
    }

    #[test]
    fn evicted_start_is_not_found() {
        let ring = RingBuffer::new(4).unwrap();
        ring.write_batch(0, &[-0.5, 0.5, -0.5, 0.5, -0.5, 0.5]);
        let det = detector(Polarity::Rising, -0.1, 0.1);
        assert!(det.find(&ring, 0, 6).is_none());
        assert_eq!(det.find(&ring, 2, 6).map(|e| e.index), Some(2));
    }

    #[test]
    fn end_is_clamped_to_newest() {
        let ring = ring_with(&[0.0, -0.5, 0.5]);
        let event = detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 100).unwrap();
        assert_eq!(event.index, 1);
    }

    #[test]
    fn offset_stays_below_one() {
        let ring = ring_with(&[-0.5, 1e-12, 0.5]);
        let event = detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 3).unwrap();
        assert!(event.offset >= 0.0 && event.offset < 1.0);
    }

    #[test]
    fn tiny_positive_sample_after_deep_negative_stays_below_one() {
        // 0.5 + 1e-17 rounds to 0.5, so the raw quotient is exactly 1.0.
        let ring = ring_with(&[-0.5, 1e-17, 0.5]);
        let event = detector(Polarity::Rising, -0.1, 0.1).find(&ring, 0, 3).unwrap();
        assert_eq!(event.index, 0);
        assert!(event.offset < 1.0, "offset = {}", event.offset);
        assert!(event.offset > 0.999_999);

        let falling = ring_with(&[0.5, -1e-17, -0.5]);
        let event = detector(Polarity::Falling, -0.1, 0.1).find(&falling, 0, 3).unwrap();
        assert!(event.offset < 1.0, "offset = {}", event.offset);
    }
}
