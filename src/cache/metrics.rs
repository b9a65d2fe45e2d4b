//! Per-origin probe metrics.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Probe counters for one origin. Observation only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OriginMetric {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_latency_ms: u64,
    /// `total_latency_ms / attempts`
    pub average_latency_ms: f64,
    /// Unix milliseconds of the last probe.
    pub last_used: u64,
}

/// Origin identifier → metric, ordered for stable output.
pub type MetricsTable = BTreeMap<String, OriginMetric>;

impl OriginMetric {
    /// Account one settled probe.
    pub fn record(&mut self, elapsed: Duration, success: bool, now: u64) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_latency_ms += elapsed.as_millis() as u64;
        self.average_latency_ms = self.total_latency_ms as f64 / self.attempts as f64;
        self.last_used = now;
    }

    /// Fraction of successful probes, `0.0` before the first probe.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_average() {
        let mut metric = OriginMetric::default();
        metric.record(Duration::from_millis(100), true, 1);
        metric.record(Duration::from_millis(300), false, 2);

        assert_eq!(metric.attempts, 2);
        assert_eq!(metric.successes, 1);
        assert_eq!(metric.failures, 1);
        assert_eq!(metric.total_latency_ms, 400);
        assert_eq!(metric.average_latency_ms, 200.0);
        assert_eq!(metric.last_used, 2);
        assert_eq!(metric.success_rate(), 0.5);
    }

    #[test]
    fn test_camel_case_serialization() {
        let mut metric = OriginMetric::default();
        metric.record(Duration::from_millis(10), true, 42);
        let json = serde_json::to_string(&metric).unwrap();
        assert!(json.contains("\"totalLatencyMs\":10"));
        assert!(json.contains("\"averageLatencyMs\":10.0"));
        assert!(json.contains("\"lastUsed\":42"));
    }
}
