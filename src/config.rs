//! Run configuration: acquisition geometry, trigger and filter settings, and
//! the sample source. Fixed for the lifetime of a run; loaded from JSON or
//! taken from defaults.

use serde::Deserialize;
use std::path::Path;

use crate::error::{ScopeError, ScopeResult};
use crate::trigger::Polarity;

/// Default capture buffer size in frames (one producer batch).
pub const DEFAULT_BUFFER_SIZE: usize = 512;
/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

const SAMPLES_PER_RECORD: usize = DEFAULT_BUFFER_SIZE * 8;
const DEFAULT_PRE_SAMPLES: usize = SAMPLES_PER_RECORD / 3;

/// Top-level configuration file format.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub acquisition: AcquisitionConfig,
    pub source: SourceConfig,
    /// Stop after this many seconds; run until interrupted when absent.
    pub run_secs: Option<u64>,
}

impl ScopeConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file(path: &Path) -> ScopeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScopeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ScopeResult<()> {
        self.acquisition.validate()?;
        self.source.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub sample_rate: u32,
    /// Ring history in samples; must be a power of two.
    pub ring_capacity: usize,
    /// Samples kept before the trigger point in every record.
    pub pre_samples: usize,
    /// Total samples per record.
    pub record_length: usize,
    /// Minimum distance in samples between accepted triggers.
    pub hold_off: u64,
    pub trigger: TriggerConfig,
    pub filter: FilterConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            ring_capacity: 1 << 15,
            pre_samples: DEFAULT_PRE_SAMPLES,
            record_length: SAMPLES_PER_RECORD + DEFAULT_PRE_SAMPLES,
            hold_off: u64::from(DEFAULT_SAMPLE_RATE / 90),
            trigger: TriggerConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> ScopeResult<()> {
        if self.ring_capacity == 0 || !self.ring_capacity.is_power_of_two() {
            return Err(ScopeError::InvalidCapacity(self.ring_capacity));
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate must be > 0"));
        }
        if self.record_length == 0 {
            return Err(invalid("record_length must be > 0"));
        }
        if self.pre_samples >= self.record_length {
            return Err(invalid(format!(
                "pre_samples ({}) must be less than record_length ({})",
                self.pre_samples, self.record_length
            )));
        }
        if self.record_length > self.ring_capacity {
            return Err(invalid(format!(
                "record_length ({}) exceeds ring_capacity ({})",
                self.record_length, self.ring_capacity
            )));
        }
        self.trigger.validate()
    }
}

/// Edge trigger settings. Thresholds are expressed for a rising edge and
/// mirrored by the polarity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub polarity: Polarity,
    pub lower: f64,
    pub upper: f64,
    /// Minimum sample-to-sample slope for a crossing to count.
    pub epsilon: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::Rising,
            lower: -0.01,
            upper: 0.01,
            epsilon: 1e-9,
        }
    }
}

impl TriggerConfig {
    pub fn validate(&self) -> ScopeResult<()> {
        if !(self.lower < self.upper) {
            return Err(invalid(format!(
                "trigger lower ({}) must be below upper ({})",
                self.lower, self.upper
            )));
        }
        if !(self.epsilon >= 0.0) {
            return Err(invalid("trigger epsilon must be a non-negative number"));
        }
        Ok(())
    }
}

/// Record conditioning applied after extraction. Zero disables a stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub high_pass_hz: f64,
    pub low_pass_hz: f64,
    pub boost: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            high_pass_hz: 10.0,
            low_pass_hz: 2_000.0,
            boost: 0.0,
        }
    }
}

/// Where samples come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic sine generator paced in real time.
    Sine {
        frequency: f64,
        amplitude: f64,
        #[serde(default = "default_buffer_size")]
        buffer_size: usize,
    },
    /// cpal input device. `name` is a substring match; the default input
    /// device is used when absent.
    Device {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_buffer_size")]
        buffer_size: usize,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Sine {
            frequency: 20.0,
            amplitude: 0.8,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl SourceConfig {
    pub fn buffer_size(&self) -> usize {
        match self {
            SourceConfig::Sine { buffer_size, .. } | SourceConfig::Device { buffer_size, .. } => {
                *buffer_size
            }
        }
    }

    pub fn validate(&self) -> ScopeResult<()> {
        if self.buffer_size() == 0 {
            return Err(invalid("source buffer_size must be > 0"));
        }
        if let SourceConfig::Sine { frequency, .. } = self {
            if !(*frequency > 0.0) {
                return Err(invalid("sine frequency must be > 0"));
            }
        }
        Ok(())
    }
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn invalid(msg: impl Into<String>) -> ScopeError {
    ScopeError::InvalidConfig(msg.into())
}
