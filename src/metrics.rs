//! Request and inference statistics for the classification service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Samples kept per latency window
const MAX_SAMPLES: usize = 10_000;

/// Metrics collector shared by all request handlers
pub struct ServiceMetrics {
    /// Total classification requests received
    pub requests_total: AtomicU64,
    /// Requests answered with a prediction
    pub predictions_total: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// End-to-end request times (in microseconds)
    request_times: RwLock<Vec<u64>>,
    /// Model call times (in microseconds)
    inference_times: RwLock<Vec<u64>>,
    /// Confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Predictions per class index
    class_counts: RwLock<HashMap<usize, u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            predictions_total: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            request_times: RwLock::new(Vec::with_capacity(1000)),
            inference_times: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            class_counts: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a successful classification
    pub fn record_prediction(&self, elapsed: Duration, class_index: usize, confidence: f64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.predictions_total.fetch_add(1, Ordering::Relaxed);
        push_sample(&self.request_times, elapsed);

        let bucket = (confidence.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut counts) = self.class_counts.write() {
            *counts.entry(class_index).or_insert(0) += 1;
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &'static str, elapsed: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        push_sample(&self.request_times, elapsed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Record time spent inside the model
    pub fn record_inference(&self, elapsed: Duration) {
        push_sample(&self.inference_times, elapsed);
    }

    /// End-to-end request time statistics
    pub fn get_request_stats(&self) -> LatencyStats {
        self.request_times
            .read()
            .map(|times| LatencyStats::from_samples(&times))
            .unwrap_or_default()
    }

    /// Model call time statistics
    pub fn get_inference_stats(&self) -> LatencyStats {
        self.inference_times
            .read()
            .map(|times| LatencyStats::from_samples(&times))
            .unwrap_or_default()
    }

    /// Current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_total.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Confidence distribution in ten equal buckets over `[0, 1]`
    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Failures by error kind
    pub fn get_failures_by_kind(&self) -> HashMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Most frequently predicted classes, highest count first, ties by index
    pub fn top_classes(&self, n: usize) -> Vec<(usize, u64)> {
        let mut counts: Vec<(usize, u64)> = self
            .class_counts
            .read()
            .map(|m| m.iter().map(|(&k, &v)| (k, v)).collect())
            .unwrap_or_default();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts.truncate(n);
        counts
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let predictions = self.predictions_total.load(Ordering::Relaxed);
        let failures = requests - predictions.min(requests);
        let failure_rate = if requests > 0 {
            (failures as f64 / requests as f64) * 100.0
        } else {
            0.0
        };

        let request_stats = self.get_request_stats();
        let inference_stats = self.get_inference_stats();
        let throughput = self.get_throughput();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          TRAFFIC SIGN SERVICE - METRICS SUMMARY              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests: {:>8}  │  Throughput: {:>6.2} req/s               ║",
            requests, throughput
        );
        info!(
            "║ Failures: {:>8}  │  Failure Rate: {:>5.1}%                   ║",
            failures, failure_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Request Time (μs):   mean={:>6} p50={:>6} p95={:>6} p99={:>6}",
            request_stats.mean_us, request_stats.p50_us, request_stats.p95_us, request_stats.p99_us
        );
        info!(
            "║ Inference Time (μs): mean={:>6} p50={:>6} p95={:>6} p99={:>6}",
            inference_stats.mean_us,
            inference_stats.p50_us,
            inference_stats.p95_us,
            inference_stats.p99_us
        );

        let by_kind = self.get_failures_by_kind();
        if !by_kind.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Failures by Kind:                                            ║");
            for (kind, count) in &by_kind {
                info!("║   {:24}: {:>6}", kind, count);
            }
        }

        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Confidence Distribution:                                     ║");
        let dist = self.get_confidence_distribution();
        let total: u64 = dist.iter().sum();
        for (i, &count) in dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let top = self.top_classes(5);
        if !top.is_empty() {
            info!("Most predicted classes:");
            for (class_index, count) in top {
                info!("  class {}: {} predictions", class_index, count);
            }
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_sample(window: &RwLock<Vec<u64>>, elapsed: Duration) {
    if let Ok(mut times) = window.write() {
        times.push(elapsed.as_micros() as u64);
        if times.len() > MAX_SAMPLES {
            times.drain(0..MAX_SAMPLES / 2);
        }
    }
}

/// Latency statistics over the retained window
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl LatencyStats {
    fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        Self {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }
}

/// Periodic metrics reporter
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

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
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
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 3, 0.95);
        metrics.record_prediction(Duration::from_micros(300), 3, 0.4);
        metrics.record_failure("invalid_image", Duration::from_micros(50));

        assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.predictions_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.get_failures_by_kind().get("invalid_image"), Some(&1));
        assert_eq!(metrics.get_request_stats().count, 3);
    }

    #[test]
    fn test_confidence_buckets() {
        let metrics = ServiceMetrics::new();

        metrics.record_prediction(Duration::ZERO, 0, 0.0);
        metrics.record_prediction(Duration::ZERO, 0, 0.55);
        metrics.record_prediction(Duration::ZERO, 0, 1.0);

        let dist = metrics.get_confidence_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
    }

    #[test]
    fn test_top_classes_ordering() {
        let metrics = ServiceMetrics::new();
        for class_index in [7, 2, 7, 2, 9, 7] {
            metrics.record_prediction(Duration::ZERO, class_index, 0.9);
        }

        assert_eq!(metrics.top_classes(2), vec![(7, 3), (2, 2)]);
    }

    #[test]
    fn test_latency_stats() {
        let samples: Vec<u64> = (1..=100).collect();
        let stats = LatencyStats::from_samples(&samples);

        assert_eq!(stats.count, 100);
        assert_eq!(stats.mean_us, 50);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.max_us, 100);
        assert_eq!(LatencyStats::from_samples(&[]), LatencyStats::default());
    }

    #[test]
    fn test_sample_window_is_bounded() {
        let metrics = ServiceMetrics::new();
        for _ in 0..(MAX_SAMPLES + 10) {
            metrics.record_inference(Duration::from_micros(1));
        }
        assert!(metrics.get_inference_stats().count as usize <= MAX_SAMPLES);
    }
}
