//! Acquisition thread: one build attempt per producer wakeup, filtered and
//! published through the latest-wins output slot.
//!
//! The only blocking point is the wait for producer activity. Publishing
//! never blocks, and a ready record is never retried in a tight loop: the
//! next attempt waits for the next broadcast.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::{debug, info, trace};

use super::{Acquirer, Acquisition};
use crate::audio::ring_buffer::RingBuffer;
use crate::cancellation::{Shutdown, Wake, WakeSignal};
use crate::config::AcquisitionConfig;
use crate::error::ScopeResult;
use crate::metrics::{elapsed_us, metric_names, MetricsRegistry};
use crate::output::{Published, RecordPublisher};
use crate::record::{Record, RecordFilter};
use crate::state_machine::RunnerState;

pub struct AcquisitionRunner {
    ring: Arc<RingBuffer>,
    acquirer: Acquirer,
    filter: RecordFilter,
    wake: Arc<WakeSignal>,
    shutdown: Shutdown,
    output: RecordPublisher,
    metrics: Arc<MetricsRegistry>,
}

impl AcquisitionRunner {
    pub fn new(
        ring: Arc<RingBuffer>,
        acquirer: Acquirer,
        filter: RecordFilter,
        wake: Arc<WakeSignal>,
        shutdown: Shutdown,
        output: RecordPublisher,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            ring,
            acquirer,
            filter,
            wake,
            shutdown,
            output,
            metrics,
        }
    }

    /// Runner with acquirer and filter built from `config`.
    pub fn from_config(
        config: &AcquisitionConfig,
        ring: Arc<RingBuffer>,
        wake: Arc<WakeSignal>,
        shutdown: Shutdown,
        output: RecordPublisher,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self::new(
            ring,
            Acquirer::from_config(config),
            RecordFilter::new(f64::from(config.sample_rate), &config.filter),
            wake,
            shutdown,
            output,
            metrics,
        )
    }

    /// Run on a dedicated `acquisition` thread.
    pub fn spawn(self) -> ScopeResult<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Blocking loop; returns once shutdown is observed.
    pub fn run(mut self) {
        info!("acquisition loop started");

        let mut state = RunnerState::Wait;
        let mut seen = 0u64;
        let mut pending: Option<Record> = None;

        while !state.is_terminal() {
            let next = match state {
                RunnerState::Wait => match self.wake.wait_past(seen, &self.shutdown) {
                    Wake::Activity(generation) => {
                        seen = generation;
                        self.metrics.increment(metric_names::WAKEUPS);
                        RunnerState::CheckShutdown
                    }
                    Wake::Shutdown => RunnerState::Stopped,
                },
                RunnerState::CheckShutdown => {
                    if self.shutdown.is_triggered() {
                        RunnerState::Stopped
                    } else {
                        RunnerState::Build
                    }
                }
                RunnerState::Build => {
                    self.metrics.increment(metric_names::BUILDS);
                    let started = Instant::now();
                    match self.acquirer.build(&self.ring) {
                        Acquisition::Ready(record) => {
                            self.metrics.record(metric_names::BUILD_US, elapsed_us(started));
                            pending = Some(record);
                            RunnerState::Ready
                        }
                        Acquisition::NotReady => RunnerState::NotReady,
                    }
                }
                RunnerState::NotReady => RunnerState::Wait,
                RunnerState::Ready => {
                    self.metrics.increment(metric_names::RECORDS_READY);
                    RunnerState::Filter
                }
                RunnerState::Filter => {
                    if let Some(record) = pending.as_mut() {
                        let filter = &self.filter;
                        self.metrics.time(metric_names::FILTER_US, || filter.apply(record));
                    }
                    RunnerState::Publish
                }
                RunnerState::Publish => {
                    if let Some(record) = pending.take() {
                        let trigger = record.absolute_trigger_index();
                        match self.output.publish(record) {
                            Published::Delivered => {
                                trace!(trigger, "record published");
                            }
                            Published::ReplacedStale => {
                                self.metrics.increment(metric_names::RECORDS_REPLACED);
                                debug!(trigger, "record replaced unconsumed predecessor");
                            }
                        }
                    }
                    RunnerState::Wait
                }
                RunnerState::Stopped => RunnerState::Stopped,
            };

            debug_assert!(
                state.can_transition_to(next),
                "invalid runner transition: {state} -> {next}"
            );
            state = next;
        }

        info!(
            wakeups = self.metrics.counter(metric_names::WAKEUPS),
            records = self.metrics.counter(metric_names::RECORDS_READY),
            "acquisition loop stopped"
        );
    }
}
