//! Audio pipeline coordinator.
//! Manages: sample producer → ring buffer → wake signal → acquisition thread → output slot.
//! Producers are either a cpal input stream (callback thread) or a paced
//! synthetic sampler thread. Both only write fixed-size batches and broadcast;
//! all trigger work happens on the acquisition thread.

pub mod ring_buffer;
pub mod source;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::acquisition::AcquisitionRunner;
use crate::cancellation::{Shutdown, WakeSignal};
use crate::config::{AcquisitionConfig, ScopeConfig, SourceConfig};
use crate::error::{ScopeError, ScopeResult};
use crate::metrics::MetricsRegistry;
use crate::output::{latest_slot, RecordReceiver};
use ring_buffer::RingBuffer;
use source::{Sampler, Sine, SignalSource};

/// Producer end of the pipeline: writes batches into the ring and wakes the
/// acquisition thread. Never allocates.
pub struct SampleWriter {
    ring: Arc<RingBuffer>,
    wake: Arc<WakeSignal>,
    next_index: u64,
}

impl SampleWriter {
    pub fn new(ring: Arc<RingBuffer>, wake: Arc<WakeSignal>) -> Self {
        Self {
            ring,
            wake,
            next_index: 0,
        }
    }

    /// Append a batch at the next absolute index, then broadcast.
    #[inline]
    pub fn push(&mut self, samples: &[f64]) {
        self.write_batch(self.next_index, samples);
        self.next_index += samples.len() as u64;
    }

    /// Write a batch at an explicit absolute index, then broadcast.
    #[inline]
    pub fn write_batch(&self, start_index: u64, samples: &[f64]) {
        self.ring.write_batch(start_index, samples);
        self.wake.notify();
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }
}

/// Keeps the pipeline alive. Dropping it shuts everything down and joins
/// the worker threads.
pub struct ScopeHandle {
    records: RecordReceiver,
    shutdown: Shutdown,
    metrics: Arc<MetricsRegistry>,
    ring: Arc<RingBuffer>,
    stream: Option<cpal::Stream>,
    threads: Vec<JoinHandle<()>>,
}

impl ScopeHandle {
    /// Latest-wins stream of filtered records.
    pub fn records(&self) -> &RecordReceiver {
        &self.records
    }

    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_triggered()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

impl Drop for ScopeHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
        // Stop the device callback before joining.
        drop(self.stream.take());
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("pipeline thread panicked");
            }
        }
    }
}

/// Start the acquisition side only. The caller drives the returned writer.
pub fn start_acquisition(config: &AcquisitionConfig) -> ScopeResult<(ScopeHandle, SampleWriter)> {
    config.validate()?;

    let ring = Arc::new(RingBuffer::new(config.ring_capacity)?);
    let wake = Arc::new(WakeSignal::new());
    let shutdown = Shutdown::new(Arc::clone(&wake));
    let metrics = Arc::new(MetricsRegistry::new());
    let (publisher, records) = latest_slot();

    let runner = AcquisitionRunner::from_config(
        config,
        Arc::clone(&ring),
        Arc::clone(&wake),
        shutdown.clone(),
        publisher,
        Arc::clone(&metrics),
    );
    let acquisition_thread = runner.spawn()?;

    info!(
        sample_rate = config.sample_rate,
        ring_capacity = ring.capacity(),
        record_length = config.record_length,
        pre_samples = config.pre_samples,
        hold_off = config.hold_off,
        "acquisition started"
    );

    let handle = ScopeHandle {
        records,
        shutdown,
        metrics,
        ring: Arc::clone(&ring),
        stream: None,
        threads: vec![acquisition_thread],
    };
    Ok((handle, SampleWriter::new(ring, wake)))
}

/// Start the full pipeline: acquisition plus the configured sample source.
pub fn start_pipeline(config: &ScopeConfig) -> ScopeResult<ScopeHandle> {
    config.validate()?;
    let acquisition = &config.acquisition;
    // On any error below, dropping `handle` stops the acquisition thread.
    let (mut handle, writer) = start_acquisition(acquisition)?;

    match &config.source {
        SourceConfig::Sine {
            frequency,
            amplitude,
            buffer_size,
        } => {
            let sampler = Sampler::new(Sine::new(*frequency, *amplitude, acquisition.sample_rate));
            let thread = spawn_sampler(sampler, *buffer_size, writer, handle.shutdown.clone())?;
            handle.threads.push(thread);
            info!(frequency, amplitude, "sine source started");
        }
        SourceConfig::Device { name, buffer_size } => {
            let stream = start_capture_stream(
                name.as_deref(),
                acquisition.sample_rate,
                *buffer_size,
                writer,
            )?;
            handle.stream = Some(stream);
        }
    }

    Ok(handle)
}

/// Run a sampler on its own thread, one batch per `buffer_size / sample_rate`.
fn spawn_sampler<S: SignalSource + 'static>(
    mut sampler: Sampler<S>,
    buffer_size: usize,
    mut writer: SampleWriter,
    shutdown: Shutdown,
) -> ScopeResult<JoinHandle<()>> {
    let step = Duration::from_secs_f64(buffer_size as f64 / f64::from(sampler.sample_rate()));
    let handle = std::thread::Builder::new()
        .name("sampler".into())
        .spawn(move || {
            let mut buf = vec![0.0; buffer_size];
            let mut deadline = Instant::now();
            while !shutdown.is_triggered() {
                sampler.step(&mut buf);
                writer.push(&buf);

                deadline += step;
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                } else {
                    // Fell behind; resynchronize instead of bursting.
                    deadline = now;
                }
            }
            info!(samples = sampler.next_index(), "sampler stopped");
        })?;
    Ok(handle)
}

/// Start cpal audio capture stream (mono f32).
fn start_capture_stream(
    device_name: Option<&str>,
    sample_rate: u32,
    buffer_size: usize,
    mut writer: SampleWriter,
) -> ScopeResult<cpal::Stream> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let host = cpal::default_host();
    let device = match device_name {
        Some(wanted) => host
            .input_devices()
            .map_err(|e| ScopeError::Device(format!("failed to list input devices: {e}")))?
            .find(|d| d.name().map(|n| n.contains(wanted)).unwrap_or(false))
            .ok_or_else(|| ScopeError::Device(format!("input device matching {wanted:?} not found")))?,
        None => host
            .default_input_device()
            .ok_or_else(|| ScopeError::Device("no audio input device available".into()))?,
    };

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    // Conversion buffer is sized once here; the callback only slices it.
    let mut scratch = vec![0.0f64; buffer_size];
    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for chunk in data.chunks(scratch.len()) {
                    let buf = &mut scratch[..chunk.len()];
                    for (dst, &src) in buf.iter_mut().zip(chunk) {
                        *dst = f64::from(src);
                    }
                    writer.push(buf);
                }
            },
            |err| {
                error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| ScopeError::Device(format!("failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| ScopeError::Device(format!("failed to start audio stream: {e}")))?;

    let name = device.name().unwrap_or_else(|_| "<unknown>".into());
    info!(device = %name, sample_rate, "audio capture stream started");

    Ok(stream)
}
