//! Internal observability metrics for rJMX-Bridge
//!
//! Metrics about the bridge's own operation, appended to every exposition.
//!
//! # Metrics
//!
//! ## Per-endpoint metrics
//! - `rjmx_bridge_check_success_total{endpoint="..."}` - Counter of successful check cycles
//! - `rjmx_bridge_check_failure_total{endpoint="..."}` - Counter of failed check cycles
//! - `rjmx_bridge_reconnect_total{endpoint="..."}` - Counter of dead connectors replaced
//! - `rjmx_bridge_dump_duration_seconds{endpoint="..."}` - Histogram of dump durations
//! - `rjmx_bridge_samples{endpoint="..."}` - Samples emitted by the last successful cycle
//!
//! ## Process metrics
//! - `rjmx_bridge_connectors` - Gauge of cached connector slots
//! - `rjmx_bridge_start_timestamp` - Unix timestamp of process start

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::MetricType;
use crate::exposition::{ExpositionMetric, TextFormatter};

/// Histogram buckets for dump durations (in seconds)
///
/// A full jmxterm dump of a busy JVM takes seconds, not milliseconds.
pub const DUMP_DURATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0];

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Self {
            value: AtomicU64::new(self.get()),
        }
    }
}

/// Thread-safe gauge using atomic operations
#[derive(Debug, Default)]
pub struct Gauge {
    /// Stored as bits of f64 for atomic operations
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Set the gauge to a specific value
    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Set the gauge to the current Unix timestamp
    pub fn set_to_current_time(&self) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.set(timestamp);
    }
}

impl Clone for Gauge {
    fn clone(&self) -> Self {
        Self {
            value: AtomicU64::new(self.value.load(Ordering::Relaxed)),
        }
    }
}

/// Thread-safe histogram for measuring distributions
#[derive(Debug)]
pub struct Histogram {
    /// Bucket boundaries (upper bounds)
    buckets: Vec<f64>,
    /// Bucket counters (count of observations <= bucket boundary)
    bucket_counts: Vec<AtomicU64>,
    /// Sum of all observed values
    sum: AtomicU64,
    /// Total count of observations
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with the given bucket boundaries
    pub fn new(buckets: &[f64]) -> Self {
        let mut sorted_buckets: Vec<f64> = buckets.to_vec();
        sorted_buckets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // Add +Inf bucket if not present
        if sorted_buckets.last().map_or(true, |v| !v.is_infinite()) {
            sorted_buckets.push(f64::INFINITY);
        }

        let bucket_counts = (0..sorted_buckets.len())
            .map(|_| AtomicU64::new(0))
            .collect();

        Self {
            buckets: sorted_buckets,
            bucket_counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value
    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        loop {
            let current = self.sum.load(Ordering::Relaxed);
            let new = f64::from_bits(current) + v;
            if self
                .sum
                .compare_exchange_weak(current, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        for (i, &bound) in self.buckets.iter().enumerate() {
            if v <= bound {
                self.bucket_counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get the sum of all observations
    pub fn get_sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Get the total count of observations
    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get bucket boundaries and their cumulative counts
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(self.bucket_counts.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Clone for Histogram {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            bucket_counts: self
                .bucket_counts
                .iter()
                .map(|c| AtomicU64::new(c.load(Ordering::Relaxed)))
                .collect(),
            sum: AtomicU64::new(self.sum.load(Ordering::Relaxed)),
            count: AtomicU64::new(self.count.load(Ordering::Relaxed)),
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(DUMP_DURATION_BUCKETS)
    }
}

/// Per-endpoint metrics
#[derive(Debug, Clone, Default)]
pub struct EndpointMetrics {
    pub check_success_total: Counter,
    pub check_failure_total: Counter,
    pub reconnect_total: Counter,
    pub dump_duration_seconds: Histogram,
    pub samples: Gauge,
}

/// Internal metrics registry
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct InternalMetrics {
    /// Keyed by `host:port`, sorted for stable output
    endpoints: Arc<RwLock<BTreeMap<String, EndpointMetrics>>>,
    pub connectors: Arc<Gauge>,
    pub start_timestamp: Arc<Gauge>,
}

impl Default for InternalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalMetrics {
    /// Create a new internal metrics registry
    pub fn new() -> Self {
        let metrics = Self {
            endpoints: Arc::new(RwLock::new(BTreeMap::new())),
            connectors: Arc::new(Gauge::new()),
            start_timestamp: Arc::new(Gauge::new()),
        };
        metrics.start_timestamp.set_to_current_time();
        metrics
    }

    /// Snapshot of one endpoint's metrics
    pub fn endpoint(&self, endpoint: &str) -> EndpointMetrics {
        let endpoints = self.endpoints.read().expect("RwLock poisoned");
        endpoints.get(endpoint).cloned().unwrap_or_default()
    }

    fn with_endpoint(&self, endpoint: &str, f: impl FnOnce(&EndpointMetrics)) {
        {
            let endpoints = self.endpoints.read().expect("RwLock poisoned");
            if let Some(metrics) = endpoints.get(endpoint) {
                f(metrics);
                return;
            }
        }

        let mut endpoints = self.endpoints.write().expect("RwLock poisoned");
        f(endpoints.entry(endpoint.to_string()).or_default());
    }

    /// Record a successful check cycle
    pub fn record_check_success(&self, endpoint: &str, samples: usize) {
        self.with_endpoint(endpoint, |m| {
            m.check_success_total.inc();
            m.samples.set(samples as f64);
        });
    }

    /// Record a failed check cycle
    pub fn record_check_failure(&self, endpoint: &str) {
        self.with_endpoint(endpoint, |m| m.check_failure_total.inc());
    }

    /// Record a dead connector being replaced
    pub fn record_reconnect(&self, endpoint: &str) {
        self.with_endpoint(endpoint, |m| m.reconnect_total.inc());
    }

    /// Record how long a dump took
    pub fn observe_dump(&self, endpoint: &str, duration_seconds: f64) {
        self.with_endpoint(endpoint, |m| m.dump_duration_seconds.observe(duration_seconds));
    }

    /// Update the cached connector count
    pub fn set_connectors(&self, count: usize) {
        self.connectors.set(count as f64);
    }

    /// All internal metrics as exposition lines
    pub fn to_exposition_metrics(&self) -> Vec<ExpositionMetric> {
        let mut metrics = Vec::new();

        {
            let endpoints = self.endpoints.read().expect("RwLock poisoned");
            for (endpoint, m) in endpoints.iter() {
                metrics.push(
                    ExpositionMetric::new("rjmx_bridge_check_success_total", m.check_success_total.get() as f64)
                        .with_type(MetricType::Counter)
                        .with_help("Total number of successful check cycles")
                        .with_label("endpoint", endpoint),
                );
                metrics.push(
                    ExpositionMetric::new("rjmx_bridge_check_failure_total", m.check_failure_total.get() as f64)
                        .with_type(MetricType::Counter)
                        .with_help("Total number of failed check cycles")
                        .with_label("endpoint", endpoint),
                );
                metrics.push(
                    ExpositionMetric::new("rjmx_bridge_reconnect_total", m.reconnect_total.get() as f64)
                        .with_type(MetricType::Counter)
                        .with_help("Total number of dead connectors replaced")
                        .with_label("endpoint", endpoint),
                );

                let histogram = &m.dump_duration_seconds;
                for (bound, count) in histogram.get_buckets() {
                    let le = if bound.is_infinite() {
                        "+Inf".to_string()
                    } else {
                        format!("{}", bound)
                    };
                    metrics.push(
                        ExpositionMetric::new("rjmx_bridge_dump_duration_seconds_bucket", count as f64)
                            .with_help("Histogram of dump durations")
                            .with_label("endpoint", endpoint)
                            .with_label("le", le),
                    );
                }
                metrics.push(
                    ExpositionMetric::new("rjmx_bridge_dump_duration_seconds_sum", histogram.get_sum())
                        .with_help("Total sum of dump durations")
                        .with_label("endpoint", endpoint),
                );
                metrics.push(
                    ExpositionMetric::new(
                        "rjmx_bridge_dump_duration_seconds_count",
                        histogram.get_count() as f64,
                    )
                    .with_help("Total count of dumps")
                    .with_label("endpoint", endpoint),
                );
                metrics.push(
                    ExpositionMetric::new("rjmx_bridge_samples", m.samples.get())
                        .with_help("Samples emitted by the last successful check cycle")
                        .with_label("endpoint", endpoint),
                );
            }
        }

        metrics.push(
            ExpositionMetric::new("rjmx_bridge_connectors", self.connectors.get())
                .with_help("Number of cached connector slots"),
        );
        metrics.push(
            ExpositionMetric::new("rjmx_bridge_start_timestamp", self.start_timestamp.get())
                .with_help("Unix timestamp of process start"),
        );

        metrics
    }

    /// Format internal metrics as text exposition
    pub fn format(&self) -> String {
        TextFormatter::new().format(&self.to_exposition_metrics())
    }
}

static INTERNAL_METRICS: OnceLock<InternalMetrics> = OnceLock::new();

/// Get the global internal metrics instance
pub fn internal_metrics() -> &'static InternalMetrics {
    INTERNAL_METRICS.get_or_init(InternalMetrics::new)
}
