//! Performance metric windows
//!
//! [`MetricsRecorder`] accumulates monotonically increasing counters plus
//! two bounded ring buffers: the last 1,000 operation samples and the last
//! 100 error timestamps (only the 60-second tail of either is considered
//! "recent"). Derived figures are recomputed on demand from those windows,
//! so a long-running manager never drifts on stale averages.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ring buffer bound for recent operation samples
const OPERATION_WINDOW: usize = 1_000;
/// Ring buffer bound for recent error timestamps
const ERROR_WINDOW: usize = 100;
/// How far back a sample still counts as "recent", in seconds
const RELEVANCE_SECS: i64 = 60;
/// How many of the newest samples feed the average-latency figure
const LATENCY_SAMPLE_COUNT: usize = 100;

/// Kind of memory operation, for the read/write counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
    Delete,
}

#[derive(Debug, Clone, Copy)]
struct OperationSample {
    latency_ms: f64,
    at: DateTime<Utc>,
}

/// Snapshot of a manager's performance counters and windowed figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// All operations since the manager started
    pub total_operations: u64,
    /// Read operations
    pub read_ops: u64,
    /// Write operations
    pub write_ops: u64,
    /// Cache hits
    pub cache_hits: u64,
    /// Cache misses
    pub cache_misses: u64,
    /// Average latency over the newest samples, in milliseconds
    pub avg_latency: f64,
    /// Errors in the last minute / operations in that same window
    pub error_rate: f64,
    /// Recent operations per second
    pub throughput: f64,
}

/// Cache occupancy summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Resident entries
    pub entries: usize,
    /// Sum of entry sizes
    pub total_size_bytes: usize,
    /// Cache hits
    pub hits: u64,
    /// Cache misses
    pub misses: u64,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_ratio: f64,
    /// entries / capacity
    pub utilization: f64,
}

/// Result of a health check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// False when a latency or error-rate threshold is exceeded
    pub healthy: bool,
    /// Human-readable descriptions of the thresholds exceeded
    pub issues: Vec<String>,
    /// The metrics snapshot the verdict was computed from
    pub metrics: PerformanceMetrics,
}

/// Accumulates operation and error samples and derives windowed metrics
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    total_operations: u64,
    read_ops: u64,
    write_ops: u64,
    cache_hits: u64,
    cache_misses: u64,
    operations: VecDeque<OperationSample>,
    errors: VecDeque<DateTime<Utc>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed operation and its latency
    pub fn record_operation(&mut self, kind: OperationKind, latency_ms: f64) {
        self.total_operations += 1;
        match kind {
            OperationKind::Read => self.read_ops += 1,
            OperationKind::Write | OperationKind::Delete => self.write_ops += 1,
        }

        if self.operations.len() == OPERATION_WINDOW {
            self.operations.pop_front();
        }
        self.operations.push_back(OperationSample {
            latency_ms,
            at: Utc::now(),
        });
    }

    /// Record a cache hit
    pub fn record_hit(&mut self) {
        self.cache_hits += 1;
    }

    /// Record a cache miss
    pub fn record_miss(&mut self) {
        self.cache_misses += 1;
    }

    /// Record a failed operation
    pub fn record_error(&mut self) {
        if self.errors.len() == ERROR_WINDOW {
            self.errors.pop_front();
        }
        self.errors.push_back(Utc::now());
    }

    /// Cache hits so far
    pub fn hits(&self) -> u64 {
        self.cache_hits
    }

    /// Cache misses so far
    pub fn misses(&self) -> u64 {
        self.cache_misses
    }

    /// hits / (hits + misses), 0.0 before any lookup
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Recompute the derived figures from the current windows
    pub fn snapshot(&self) -> PerformanceMetrics {
        let now = Utc::now();
        let cutoff = now - Duration::seconds(RELEVANCE_SECS);

        let avg_latency = {
            let newest: Vec<f64> = self
                .operations
                .iter()
                .rev()
                .take(LATENCY_SAMPLE_COUNT)
                .map(|s| s.latency_ms)
                .collect();
            if newest.is_empty() {
                0.0
            } else {
                newest.iter().sum::<f64>() / newest.len() as f64
            }
        };

        let recent_ops = self.operations.iter().filter(|s| s.at >= cutoff).count();
        let recent_errors = self.errors.iter().filter(|&&at| at >= cutoff).count();

        let error_rate = if recent_ops == 0 {
            0.0
        } else {
            recent_errors as f64 / recent_ops as f64
        };

        PerformanceMetrics {
            total_operations: self.total_operations,
            read_ops: self.read_ops,
            write_ops: self.write_ops,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            avg_latency,
            error_rate,
            throughput: recent_ops as f64 / RELEVANCE_SECS as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut recorder = MetricsRecorder::new();
        recorder.record_operation(OperationKind::Read, 2.0);
        recorder.record_operation(OperationKind::Write, 4.0);
        recorder.record_operation(OperationKind::Delete, 1.0);

        let metrics = recorder.snapshot();
        assert_eq!(metrics.total_operations, 3);
        assert_eq!(metrics.read_ops, 1);
        assert_eq!(metrics.write_ops, 2);
    }

    #[test]
    fn test_avg_latency_over_newest_samples() {
        let mut recorder = MetricsRecorder::new();
        // 150 samples at 10ms, then 100 at 30ms: only the newest 100 count
        for _ in 0..150 {
            recorder.record_operation(OperationKind::Read, 10.0);
        }
        for _ in 0..100 {
            recorder.record_operation(OperationKind::Read, 30.0);
        }

        let metrics = recorder.snapshot();
        assert!((metrics.avg_latency - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_operation_window_is_bounded() {
        let mut recorder = MetricsRecorder::new();
        for _ in 0..1_500 {
            recorder.record_operation(OperationKind::Read, 1.0);
        }
        assert_eq!(recorder.operations.len(), 1_000);
        // Counters keep the full total
        assert_eq!(recorder.snapshot().total_operations, 1_500);
    }

    #[test]
    fn test_error_rate_over_recent_window() {
        let mut recorder = MetricsRecorder::new();
        for _ in 0..10 {
            recorder.record_operation(OperationKind::Read, 1.0);
        }
        recorder.record_error();

        let metrics = recorder.snapshot();
        assert!((metrics.error_rate - 0.1).abs() < 1e-9);
        assert!(metrics.throughput > 0.0);
    }

    #[test]
    fn test_error_rate_zero_without_operations() {
        let mut recorder = MetricsRecorder::new();
        recorder.record_error();
        assert_eq!(recorder.snapshot().error_rate, 0.0);
    }

    #[test]
    fn test_hit_ratio() {
        let mut recorder = MetricsRecorder::new();
        assert_eq!(recorder.hit_ratio(), 0.0);

        recorder.record_hit();
        recorder.record_hit();
        recorder.record_miss();
        assert!((recorder.hit_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_field_names() {
        let recorder = MetricsRecorder::new();
        let value = serde_json::to_value(recorder.snapshot()).unwrap();
        assert!(value.get("totalOperations").is_some());
        assert!(value.get("cacheHits").is_some());
        assert!(value.get("avgLatency").is_some());
        assert!(value.get("errorRate").is_some());
    }
}
