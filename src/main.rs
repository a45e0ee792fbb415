//! trigscope demo binary: runs the acquisition pipeline and logs a summary of
//! every sweep it receives. Rendering lives elsewhere.
//!
//! Usage: `trigscope [config.json]`

use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, error, info};

use trigscope::metrics::metric_names;
use trigscope::{start_pipeline, ScopeConfig, ScopeResult};

fn main() -> ExitCode {
    trigscope::init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "trigscope failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> ScopeResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ScopeConfig::load_from_file(Path::new(&path))?,
        None => {
            info!("no config file given, using defaults");
            ScopeConfig::default()
        }
    };

    let handle = start_pipeline(&config)?;
    let deadline = config.run_secs.map(|secs| Instant::now() + Duration::from_secs(secs));

    let mut received = 0u64;
    let mut last_report = Instant::now();
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("run time elapsed");
            break;
        }

        match handle.records().recv_timeout(Duration::from_millis(250)) {
            Ok(record) => {
                received += 1;
                debug!(
                    trigger = record.absolute_trigger_index(),
                    offset = record.trigger_offset,
                    peak = record.peak(),
                    "sweep"
                );
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let metrics = handle.metrics();
            info!(
                received,
                ready = metrics.counter(metric_names::RECORDS_READY),
                replaced = metrics.counter(metric_names::RECORDS_REPLACED),
                build_p95_us = metrics.percentile(metric_names::BUILD_US, 95.0),
                "acquisition status"
            );
            last_report = Instant::now();
        }
    }

    handle.shutdown();
    let summary = serde_json::to_string(&handle.metrics().summary())?;
    info!(metrics = %summary, "final timing summary");
    Ok(())
}
