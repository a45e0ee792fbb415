//! End-to-end tests through the public API with real threads.

use std::f64::consts::PI;
use std::time::Duration;

use trigscope::metrics::metric_names;
use trigscope::{
    start_acquisition, start_pipeline, AcquisitionConfig, FilterConfig, Polarity, RingBuffer,
    ScopeConfig, SourceConfig, TriggerConfig, TriggerDetector,
};

const RATE: u32 = 48_000;

fn unfiltered_config() -> AcquisitionConfig {
    AcquisitionConfig {
        sample_rate: RATE,
        ring_capacity: 8192,
        pre_samples: 256,
        record_length: 1024,
        hold_off: 400,
        trigger: TriggerConfig::default(),
        filter: FilterConfig {
            high_pass_hz: 0.0,
            low_pass_hz: 0.0,
            boost: 0.0,
        },
    }
}

fn sine_wave(freq: f64, amplitude: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| amplitude * (2.0 * PI * freq * n as f64 / f64::from(RATE)).sin())
        .collect()
}

#[test]
fn synthetic_edge_in_sixteen_sample_ring() {
    let ring = RingBuffer::new(16).unwrap();
    for i in 0..16u64 {
        let value = match i {
            0..=5 => 0.0,
            6 => -0.2,
            7 => 0.3,
            _ => 0.5,
        };
        ring.write_at(i, value);
    }

    let detector = TriggerDetector::new(Polarity::Rising, -0.1, 0.1, 1e-9);
    let event = detector.find(&ring, 0, 15).expect("edge");
    assert_eq!(event.index, 6);
    assert!((event.offset - 0.4).abs() < 1e-9, "offset = {}", event.offset);
}

#[test]
fn falling_polarity_mirrors_rising() {
    let rising = [-0.5, -0.2, 0.2, 0.5];
    let falling: Vec<f64> = rising.iter().map(|v| -v).collect();

    let up = RingBuffer::new(4).unwrap();
    up.write_batch(0, &rising);
    let down = RingBuffer::new(4).unwrap();
    down.write_batch(0, &falling);

    let a = TriggerDetector::new(Polarity::Rising, -0.01, 0.01, 1e-9)
        .find(&up, 0, 4)
        .unwrap();
    let b = TriggerDetector::new(Polarity::Falling, -0.01, 0.01, 1e-9)
        .find(&down, 0, 4)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn sine_records_are_aligned_on_rising_zero_crossing() {
    let config = unfiltered_config();
    let (handle, mut writer) = start_acquisition(&config).unwrap();

    // 100 Hz: one period every 480 samples.
    let signal = sine_wave(100.0, 0.8, 24_000);
    for batch in signal.chunks(256) {
        writer.push(batch);
        std::thread::sleep(Duration::from_micros(200));
    }

    let record = handle
        .records()
        .recv_timeout(Duration::from_secs(2))
        .expect("at least one record");

    assert_eq!(record.len(), config.record_length);
    assert_eq!(record.trigger_index, config.pre_samples);
    assert!(record.trigger_offset >= 0.0 && record.trigger_offset < 1.0);
    assert!(record.samples[record.trigger_index] <= 0.0);
    assert!(record.samples[record.trigger_index + 1] > 0.0);

    let trigger = record.absolute_trigger_index();
    assert!(trigger % 480 == 0 || trigger % 480 == 479, "trigger = {trigger}");
    assert_eq!(record.samples, signal[record.start_index as usize..][..1024].to_vec());

    handle.shutdown();
    assert!(handle.is_shutdown());
}

#[test]
fn accepted_triggers_respect_hold_off() {
    let config = AcquisitionConfig {
        hold_off: 1_000,
        ..unfiltered_config()
    };
    let (handle, mut writer) = start_acquisition(&config).unwrap();

    let mut triggers = Vec::new();
    let signal = sine_wave(100.0, 0.8, 48_000);
    for batch in signal.chunks(512) {
        writer.push(batch);
        while let Ok(record) = handle
            .records()
            .recv_timeout(Duration::from_millis(5))
        {
            triggers.push(record.absolute_trigger_index());
        }
    }

    assert!(triggers.len() >= 2, "triggers = {triggers:?}");
    assert!(triggers.windows(2).all(|w| w[1] - w[0] >= 1_000), "triggers = {triggers:?}");
}

#[test]
fn burst_of_batches_coalesces_builds() {
    let config = unfiltered_config();
    let (handle, mut writer) = start_acquisition(&config).unwrap();

    let signal = sine_wave(100.0, 0.8, 16_384);
    let batches = signal.chunks(64).count() as u64;
    for batch in signal.chunks(64) {
        writer.push(batch);
    }

    handle
        .records()
        .recv_timeout(Duration::from_secs(2))
        .expect("record from burst");
    std::thread::sleep(Duration::from_millis(50));
    handle.shutdown();

    let builds = handle.metrics().counter(metric_names::BUILDS);
    assert!(builds >= 1 && builds <= batches, "builds = {builds}");
}

#[test]
fn sine_pipeline_publishes_filtered_records() {
    let config = ScopeConfig {
        acquisition: AcquisitionConfig::default(),
        source: SourceConfig::Sine {
            frequency: 200.0,
            amplitude: 0.5,
            buffer_size: 512,
        },
        run_secs: None,
    };
    let handle = start_pipeline(&config).unwrap();

    let record = handle
        .records()
        .recv_timeout(Duration::from_secs(3))
        .expect("record from sine source");
    assert_eq!(record.len(), config.acquisition.record_length);
    assert_eq!(record.trigger_index, config.acquisition.pre_samples);
    assert!(record.peak() > 0.1 && record.peak() <= 1.0);

    handle.shutdown();
    drop(handle);
}

#[test]
fn invalid_capacity_fails_before_start() {
    let config = ScopeConfig {
        acquisition: AcquisitionConfig {
            ring_capacity: 48_000,
            ..AcquisitionConfig::default()
        },
        ..ScopeConfig::default()
    };
    assert!(start_pipeline(&config).is_err());
}
