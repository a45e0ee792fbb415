//! Sweep acquisition: finds the next qualifying trigger in the retained
//! history, enforces hold-off, and extracts a fixed-length record aligned on
//! it. Every failure mode collapses into `Acquisition::NotReady`; the caller
//! just waits for the next producer batch.

pub mod runner;

use crate::audio::ring_buffer::RingBuffer;
use crate::config::AcquisitionConfig;
use crate::record::Record;
use crate::trigger::TriggerDetector;

pub use runner::AcquisitionRunner;

/// Outcome of one build attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    Ready(Record),
    /// Not enough history, no trigger, hold-off, or the window was evicted.
    NotReady,
}

impl Acquisition {
    pub fn is_ready(&self) -> bool {
        matches!(self, Acquisition::Ready(_))
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Acquisition::Ready(record) => Some(record),
            Acquisition::NotReady => None,
        }
    }
}

pub struct Acquirer {
    detector: TriggerDetector,
    pre_samples: usize,
    record_length: usize,
    hold_off: u64,
    last_trigger: Option<u64>,
    /// Trigger search scratch, reused across builds.
    window: Vec<f64>,
}

impl Acquirer {
    pub fn new(
        detector: TriggerDetector,
        pre_samples: usize,
        record_length: usize,
        hold_off: u64,
    ) -> Self {
        Self {
            detector,
            pre_samples,
            record_length,
            hold_off,
            last_trigger: None,
            window: Vec::new(),
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            TriggerDetector::from_config(&config.trigger),
            config.pre_samples,
            config.record_length,
            config.hold_off,
        )
    }

    /// Absolute index of the last accepted trigger.
    pub fn last_trigger(&self) -> Option<u64> {
        self.last_trigger
    }

    /// Whether a trigger at `index` lies past the last accepted trigger by at
    /// least the hold-off.
    fn clears_hold_off(&self, index: u64) -> bool {
        self.last_trigger
            .map_or(true, |last| index > last && index - last >= self.hold_off)
    }

    /// One acquisition attempt against the current ring contents.
    pub fn build(&mut self, ring: &RingBuffer) -> Acquisition {
        match self.try_build(ring) {
            Some(record) => Acquisition::Ready(record),
            None => Acquisition::NotReady,
        }
    }

    fn try_build(&mut self, ring: &RingBuffer) -> Option<Record> {
        if ring.count() < self.record_length {
            return None;
        }
        let (oldest, newest) = ring.bounds()?;

        // The lower bound leaves room for the pre-trigger history. After an
        // accepted trigger the search also skips the hold-off span, so a
        // suppressed retrigger cannot shadow later events.
        let mut search_start = oldest + self.pre_samples as u64;
        if let Some(last) = self.last_trigger {
            search_start = search_start.max(last.saturating_add(self.hold_off.max(1)));
        }

        let event = self
            .detector
            .find_with_scratch(ring, search_start, newest, &mut self.window)?;

        if !self.clears_hold_off(event.index) {
            return None;
        }

        let record_start = event.index.checked_sub(self.pre_samples as u64)?;
        let record_end = record_start + self.record_length as u64;

        // The producer keeps writing; the window may have been evicted since
        // the scan, or the post-trigger part may not exist yet.
        if !ring.has_range(record_start, record_end) {
            return None;
        }
        let samples = ring.read_range(record_start, record_end).ok()?;

        self.last_trigger = Some(event.index);
        Some(Record {
            samples,
            trigger_index: self.pre_samples,
            trigger_offset: event.offset,
            start_index: record_start,
        })
    }
}
