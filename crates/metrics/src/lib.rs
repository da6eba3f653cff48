//! Thread-safe metrics registry for AgentWorld extensions.
//!
//! Each extension owns one [`ExtensionMetrics`] instance guarding monotonic
//! counters, lazily-created per-endpoint counters, named event counters, and
//! a bounded ring of request durations. Two output formats are served by the
//! standard endpoints: a flat JSON snapshot and Prometheus text exposition.
//! Counter names are identical across both formats.

use agentworld_core::MetricsSink;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Instant;

/// Number of request-duration samples retained for percentile computation.
const DURATION_RING_CAPACITY: usize = 1024;

/// Quantiles reported in the latency summary.
const SUMMARY_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Per-extension metrics registry.
pub struct ExtensionMetrics {
    extension_name: String,
    requests_received: AtomicU64,
    errors: AtomicU64,
    rate_limited: AtomicU64,
    auth_failures: AtomicU64,
    /// Per-endpoint request counters, created on first observation.
    endpoints: RwLock<BTreeMap<String, u64>>,
    /// Domain event counters (e.g. `movements_queued`).
    events: RwLock<BTreeMap<String, u64>>,
    /// Last N request durations in milliseconds.
    durations: Mutex<DurationRing>,
    server_running: AtomicBool,
    start_time: Mutex<Option<Instant>>,
}

struct DurationRing {
    samples: Vec<f64>,
    next: usize,
    total_count: u64,
    total_sum: f64,
}

impl DurationRing {
    fn new() -> Self {
        Self {
            samples: Vec::with_capacity(DURATION_RING_CAPACITY),
            next: 0,
            total_count: 0,
            total_sum: 0.0,
        }
    }

    fn record(&mut self, value: f64) {
        if self.samples.len() < DURATION_RING_CAPACITY {
            self.samples.push(value);
        } else {
            self.samples[self.next] = value;
            self.next = (self.next + 1) % DURATION_RING_CAPACITY;
        }
        self.total_count += 1;
        self.total_sum += value;
    }

    fn summary(&self) -> DurationSummary {
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mean = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };
        let quantile = |q: f64| -> f64 {
            if sorted.is_empty() {
                return 0.0;
            }
            let idx = (q * (sorted.len() - 1) as f64).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        DurationSummary {
            count: self.total_count,
            sum: self.total_sum,
            mean,
            quantiles: SUMMARY_QUANTILES.map(|q| (q, quantile(q))),
        }
    }
}

struct DurationSummary {
    count: u64,
    sum: f64,
    mean: f64,
    quantiles: [(f64, f64); 3],
}

impl ExtensionMetrics {
    pub fn new(extension_name: impl Into<String>) -> Self {
        Self {
            extension_name: extension_name.into(),
            requests_received: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            endpoints: RwLock::new(BTreeMap::new()),
            events: RwLock::new(BTreeMap::new()),
            durations: Mutex::new(DurationRing::new()),
            server_running: AtomicBool::new(false),
            start_time: Mutex::new(None),
        }
    }

    /// Mark server start for uptime computation.
    pub fn start_server(&self) {
        self.server_running.store(true, Ordering::Relaxed);
        *self.start_time.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        tracing::debug!(extension = %self.extension_name, "Metrics lifecycle started");
    }

    /// Mark server stop.
    pub fn stop_server(&self) {
        self.server_running.store(false, Ordering::Relaxed);
    }

    /// Increment a named domain event counter, creating it on first use.
    pub fn increment_event(&self, name: &str) {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        *events.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn requests_received(&self) -> u64 {
        self.requests_received.load(Ordering::Relaxed)
    }

    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    pub fn auth_failures(&self) -> u64 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn uptime_seconds(&self) -> f64 {
        self.start_time
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl MetricsSink for ExtensionMetrics {
    fn increment_requests(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_auth_failures(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_endpoint(&self, endpoint: &str) {
        let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
        *endpoints.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    fn record_request_duration_ms(&self, duration_ms: f64) {
        self.durations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(duration_ms);
    }

    fn json_snapshot(&self) -> Value {
        let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        let summary = self
            .durations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .summary();

        let mut snapshot = Map::new();
        snapshot.insert("success".into(), json!(true));
        snapshot.insert("extension".into(), json!(self.extension_name));
        snapshot.insert("requests_received".into(), json!(self.requests_received()));
        snapshot.insert("errors".into(), json!(self.errors()));
        snapshot.insert("rate_limited".into(), json!(self.rate_limited()));
        snapshot.insert("auth_failures".into(), json!(self.auth_failures()));
        snapshot.insert("uptime_seconds".into(), json!(self.uptime_seconds()));
        snapshot.insert(
            "server_running".into(),
            json!(self.server_running.load(Ordering::Relaxed)),
        );
        for (name, count) in events.iter() {
            snapshot.insert(name.clone(), json!(count));
        }
        snapshot.insert(
            "endpoints".into(),
            Value::Object(endpoints.iter().map(|(k, v)| (k.clone(), json!(v))).collect()),
        );
        snapshot.insert(
            "request_duration_ms".into(),
            json!({
                "count": summary.count,
                "sum": summary.sum,
                "mean": summary.mean,
                "p50": summary.quantiles[0].1,
                "p90": summary.quantiles[1].1,
                "p99": summary.quantiles[2].1,
            }),
        );
        Value::Object(snapshot)
    }

    fn prometheus_text(&self) -> String {
        let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        let summary = self
            .durations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .summary();
        let ext = &self.extension_name;

        let mut out = String::new();
        let mut counter = |name: &str, value: u64| {
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name}{{extension=\"{ext}\"}} {value}");
        };
        counter("requests_received", self.requests_received());
        counter("errors", self.errors());
        counter("rate_limited", self.rate_limited());
        counter("auth_failures", self.auth_failures());
        for (name, value) in events.iter() {
            counter(name, *value);
        }

        let _ = writeln!(out, "# TYPE endpoint_requests counter");
        for (endpoint, count) in endpoints.iter() {
            let _ = writeln!(
                out,
                "endpoint_requests{{extension=\"{ext}\",endpoint=\"{endpoint}\"}} {count}"
            );
        }

        let _ = writeln!(out, "# TYPE uptime_seconds gauge");
        let _ = writeln!(
            out,
            "uptime_seconds{{extension=\"{ext}\"}} {:.3}",
            self.uptime_seconds()
        );
        let _ = writeln!(out, "# TYPE server_running gauge");
        let _ = writeln!(
            out,
            "server_running{{extension=\"{ext}\"}} {}",
            u8::from(self.server_running.load(Ordering::Relaxed))
        );

        let _ = writeln!(out, "# TYPE request_duration_ms summary");
        for (q, value) in summary.quantiles {
            let _ = writeln!(
                out,
                "request_duration_ms{{extension=\"{ext}\",quantile=\"{q}\"}} {value:.3}"
            );
        }
        let _ = writeln!(
            out,
            "request_duration_ms_sum{{extension=\"{ext}\"}} {:.3}",
            summary.sum
        );
        let _ = writeln!(
            out,
            "request_duration_ms_count{{extension=\"{ext}\"}} {}",
            summary.count
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = ExtensionMetrics::new("worldviewer");
        metrics.increment_requests();
        metrics.increment_requests();
        metrics.increment_rate_limited();
        metrics.increment_auth_failures();
        metrics.increment_errors();

        let snapshot = metrics.json_snapshot();
        assert_eq!(snapshot["requests_received"], 2);
        assert_eq!(snapshot["rate_limited"], 1);
        assert_eq!(snapshot["auth_failures"], 1);
        assert_eq!(snapshot["errors"], 1);
    }

    #[test]
    fn endpoint_counters_created_lazily() {
        let metrics = ExtensionMetrics::new("worldviewer");
        metrics.increment_endpoint("health");
        metrics.increment_endpoint("health");
        metrics.increment_endpoint("camera/status");
        let snapshot = metrics.json_snapshot();
        assert_eq!(snapshot["endpoints"]["health"], 2);
        assert_eq!(snapshot["endpoints"]["camera/status"], 1);
    }

    #[test]
    fn event_counters_appear_in_both_formats() {
        let metrics = ExtensionMetrics::new("worldviewer");
        metrics.increment_event("movements_queued");
        metrics.increment_event("movements_queued");

        let snapshot = metrics.json_snapshot();
        assert_eq!(snapshot["movements_queued"], 2);

        let text = metrics.prometheus_text();
        assert!(text.contains("movements_queued{extension=\"worldviewer\"} 2"));
    }

    #[test]
    fn duration_summary_tracks_samples() {
        let metrics = ExtensionMetrics::new("worldviewer");
        for ms in [1.0, 2.0, 3.0, 4.0] {
            metrics.record_request_duration_ms(ms);
        }
        let snapshot = metrics.json_snapshot();
        let summary = &snapshot["request_duration_ms"];
        assert_eq!(summary["count"], 4);
        assert_eq!(summary["sum"], 10.0);
        assert_eq!(summary["mean"], 2.5);
    }

    #[test]
    fn duration_ring_is_bounded() {
        let metrics = ExtensionMetrics::new("worldviewer");
        for i in 0..(DURATION_RING_CAPACITY + 100) {
            metrics.record_request_duration_ms(i as f64);
        }
        let snapshot = metrics.json_snapshot();
        // Total count keeps growing, but percentiles come from the ring.
        assert_eq!(
            snapshot["request_duration_ms"]["count"],
            (DURATION_RING_CAPACITY + 100) as u64
        );
        let p50 = snapshot["request_duration_ms"]["p50"].as_f64().unwrap();
        assert!(p50 >= 100.0, "old samples should have been evicted");
    }

    #[test]
    fn prometheus_names_match_json_keys() {
        let metrics = ExtensionMetrics::new("worldviewer");
        metrics.increment_requests();
        metrics.increment_endpoint("health");
        metrics.record_request_duration_ms(5.0);

        let snapshot = metrics.json_snapshot();
        let text = metrics.prometheus_text();
        for key in ["requests_received", "errors", "rate_limited", "auth_failures", "uptime_seconds"] {
            assert!(snapshot.get(key).is_some(), "missing JSON key {key}");
            assert!(text.contains(key), "missing prometheus metric {key}");
        }
    }

    #[test]
    fn prometheus_lines_parse_as_exposition() {
        let metrics = ExtensionMetrics::new("worldviewer");
        metrics.start_server();
        metrics.increment_requests();
        metrics.increment_endpoint("camera/status");
        metrics.record_request_duration_ms(2.5);

        for line in metrics.prometheus_text().lines() {
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let (name_part, value_part) = line.rsplit_once(' ').expect("name value pair");
            assert!(value_part.parse::<f64>().is_ok(), "bad value in `{line}`");
            let name = name_part.split('{').next().unwrap();
            assert!(
                name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "bad metric name in `{line}`"
            );
        }
    }

    #[test]
    fn lifecycle_controls_uptime() {
        let metrics = ExtensionMetrics::new("worldviewer");
        assert_eq!(metrics.json_snapshot()["uptime_seconds"], 0.0);
        metrics.start_server();
        assert_eq!(metrics.json_snapshot()["server_running"], true);
        metrics.stop_server();
        assert_eq!(metrics.json_snapshot()["server_running"], false);
    }
}
