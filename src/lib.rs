//! trigscope: triggered sweep acquisition for an audio-rate software oscilloscope.
//! Samples stream into a lossy ring buffer; an acquisition thread finds
//! hysteresis edge triggers, extracts aligned records, conditions them, and
//! hands the newest one to the display side through a single-slot output.

pub mod acquisition;
pub mod audio;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod record;
pub mod state_machine;
pub mod trigger;

pub use acquisition::{Acquirer, Acquisition, AcquisitionRunner};
pub use audio::ring_buffer::RingBuffer;
pub use audio::{start_acquisition, start_pipeline, SampleWriter, ScopeHandle};
pub use cancellation::{Shutdown, WakeSignal};
pub use config::{AcquisitionConfig, FilterConfig, ScopeConfig, SourceConfig, TriggerConfig};
pub use error::{ScopeError, ScopeResult};
pub use output::{latest_slot, Published, RecordPublisher, RecordReceiver};
pub use record::{Record, RecordFilter};
pub use trigger::{Polarity, TriggerDetector, TriggerEvent};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `trigscope=info` directive; setting `TRIGSCOPE_LOG_JSON` switches to JSON
/// lines. Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trigscope=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let _ = if std::env::var_os("TRIGSCOPE_LOG_JSON").is_some() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
