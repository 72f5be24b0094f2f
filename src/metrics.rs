//! Request counters and latency statistics for the decision service.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all request handlers
pub struct ServiceMetrics {
    /// Requests that produced a decision
    pub decisions: AtomicU64,
    /// Decisions with `is_fraud == 1`
    pub flagged: AtomicU64,
    /// Rejected requests by error kind
    rejections: RwLock<HashMap<String, u64>>,
    /// Decision latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            decisions: AtomicU64::new(0),
            flagged: AtomicU64::new(0),
            rejections: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed decision
    pub fn record_decision(&self, latency: Duration, probability: f64, flagged: bool) {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        if flagged {
            self.flagged.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only the most recent window
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a rejected request
    pub fn record_rejection(&self, kind: &str) {
        if let Ok(mut by_kind) = self.rejections.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Decisions per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.decisions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn rejections(&self) -> HashMap<String, u64> {
        self.rejections
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Point-in-time copy for the metrics endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decisions: self.decisions.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
            rejections: self.rejections(),
            throughput: self.throughput(),
            latency: self.latency_stats(),
            probability_distribution: self.probability_distribution(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log a summary of everything recorded so far
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let flag_rate = if snapshot.decisions > 0 {
            snapshot.flagged as f64 / snapshot.decisions as f64 * 100.0
        } else {
            0.0
        };

        info!(
            decisions = snapshot.decisions,
            flagged = snapshot.flagged,
            flag_rate = format!("{:.1}%", flag_rate),
            throughput = format!("{:.1} req/s", snapshot.throughput),
            "Decision summary"
        );
        info!(
            mean_us = snapshot.latency.mean_us,
            p50_us = snapshot.latency.p50_us,
            p95_us = snapshot.latency.p95_us,
            p99_us = snapshot.latency.p99_us,
            "Decision latency"
        );
        for (kind, count) in &snapshot.rejections {
            info!(kind = %kind, count = count, "Rejected requests");
        }

        let total: u64 = snapshot.probability_distribution.iter().sum();
        for (i, &count) in snapshot.probability_distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = count as f64 / total as f64 * 100.0;
            info!(
                "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 2.0) as usize).min(20))
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics over the retained window
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view of [`ServiceMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub decisions: u64,
    pub flagged: u64,
    pub rejections: HashMap<String, u64>,
    pub throughput: f64,
    pub latency: LatencyStats,
    pub probability_distribution: [u64; 10],
    pub uptime_secs: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Run until the task is dropped
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_decision(Duration::from_micros(100), 0.2, false);
        metrics.record_decision(Duration::from_micros(300), 0.95, true);
        metrics.record_decision(Duration::from_micros(200), 1.0, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decisions, 3);
        assert_eq!(snapshot.flagged, 2);
        assert_eq!(snapshot.probability_distribution[2], 1);
        assert_eq!(snapshot.probability_distribution[9], 2);
        assert_eq!(snapshot.latency.p50_us, 200);
        assert_eq!(snapshot.latency.max_us, 300);
    }

    #[test]
    fn test_rejections_by_kind() {
        let metrics = ServiceMetrics::new();
        metrics.record_rejection("unauthorized");
        metrics.record_rejection("unauthorized");
        metrics.record_rejection("feature_count_mismatch");

        let rejections = metrics.rejections();
        assert_eq!(rejections.get("unauthorized"), Some(&2));
        assert_eq!(rejections.get("feature_count_mismatch"), Some(&1));
        assert_eq!(metrics.snapshot().decisions, 0);
    }

    #[test]
    fn test_empty_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.latency_stats().count, 0);
    }
}
