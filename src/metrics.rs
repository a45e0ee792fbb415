//! Acquisition observability: timing histograms and event counters.
//! Histograms keep the last N samples and report p50/p95/p99.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Samples retained per histogram.
const HISTOGRAM_WINDOW: usize = 1024;

/// Microseconds elapsed since `started`.
#[inline]
pub fn elapsed_us(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1e6
}

/// Sliding window over the most recent samples of one metric.
struct Histogram {
    window: VecDeque<f64>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(HISTOGRAM_WINDOW),
        }
    }

    fn push(&mut self, value: f64) {
        if self.window.len() == HISTOGRAM_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(value);
    }

    fn len(&self) -> usize {
        self.window.len()
    }

    /// Nearest-rank percentile; 0.0 when nothing has been recorded.
    fn percentile(&self, p: f64) -> f64 {
        let len = self.window.len();
        if len == 0 {
            return 0.0;
        }
        let mut values: Vec<f64> = self.window.iter().copied().collect();
        let rank = (((p / 100.0) * (len as f64 - 1.0)).round() as usize).min(len - 1);
        let (_, value, _) = values.select_nth_unstable_by(rank, |a, b| a.total_cmp(b));
        *value
    }
}

/// Stores histograms and counters for all named metrics.
pub struct MetricsRegistry {
    histograms: Mutex<HashMap<&'static str, Histogram>>,
    counters: Mutex<HashMap<&'static str, u64>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            histograms: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Record a sample (in microseconds) for the named histogram.
    pub fn record(&self, name: &'static str, value_us: f64) {
        self.histograms
            .lock()
            .entry(name)
            .or_insert_with(Histogram::new)
            .push(value_us);
    }

    /// Bump the named counter by one.
    pub fn increment(&self, name: &'static str) {
        *self.counters.lock().entry(name).or_insert(0) += 1;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// Run `f`, recording its duration under `name`.
    pub fn time<T>(&self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record(name, elapsed_us(started));
        out
    }

    /// Percentile (0-100) for a histogram, in microseconds.
    pub fn percentile(&self, name: &str, p: f64) -> f64 {
        let hists = self.histograms.lock();
        hists
            .get(name)
            .map(|hist| hist.percentile(p))
            .unwrap_or(0.0)
    }

    /// p50/p95/p99 for every histogram.
    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        let hists = self.histograms.lock();
        hists
            .iter()
            .map(|(&name, hist)| {
                (
                    name.to_string(),
                    MetricSummary {
                        p50_us: hist.percentile(50.0),
                        p95_us: hist.percentile(95.0),
                        p99_us: hist.percentile(99.0),
                        count: hist.len(),
                    },
                )
            })
            .collect()
    }

    /// Snapshot of every counter.
    pub fn counters(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .iter()
            .map(|(&name, &value)| (name.to_string(), value))
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: usize,
}

/// Well-known metric names (constants to avoid typos).
pub mod metric_names {
    /// Wakeups observed by the acquisition thread.
    pub const WAKEUPS: &str = "acq_wakeups";
    pub const BUILDS: &str = "acq_builds";
    pub const RECORDS_READY: &str = "acq_records_ready";
    /// Published records that displaced an unconsumed one.
    pub const RECORDS_REPLACED: &str = "acq_records_replaced";
    /// Duration of builds that produced a record.
    pub const BUILD_US: &str = "acq_build_us";
    pub const FILTER_US: &str = "acq_filter_us";
}
