//! Process-wide pipeline counters
//!
//! Atomics for the hot counters, a mutex-protected map for per-handler
//! statistics. The orchestrator reports into the global collector returned by
//! [`metrics()`]; tests construct their own [`MetricsCollector`].

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

const MAX_SAMPLES: usize = 1000;

pub struct MetricsCollector {
    cases_received: AtomicU64,
    cases_closed: AtomicU64,
    cases_errored: AtomicU64,
    cases_stalled: AtomicU64,
    cases_exhausted: AtomicU64,
    responses_sent: AtomicU64,
    cases_escalated: AtomicU64,
    passes: AtomicU64,

    // milliseconds per processed case
    processing_times: Mutex<Vec<u64>>,

    handler_stats: Mutex<HashMap<String, HandlerStats>>,

    started_at: u64,
}

#[derive(Debug, Default)]
struct HandlerStats {
    executions: u64,
    failures: u64,
    execution_times: Vec<u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            cases_received: AtomicU64::new(0),
            cases_closed: AtomicU64::new(0),
            cases_errored: AtomicU64::new(0),
            cases_stalled: AtomicU64::new(0),
            cases_exhausted: AtomicU64::new(0),
            responses_sent: AtomicU64::new(0),
            cases_escalated: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            processing_times: Mutex::new(Vec::new()),
            handler_stats: Mutex::new(HashMap::new()),
            started_at: current_timestamp(),
        }
    }

    pub fn case_received(&self) {
        self.cases_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn case_closed(&self) {
        self.cases_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn case_errored(&self) {
        self.cases_errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn case_stalled(&self) {
        self.cases_stalled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn case_step_budget_exhausted(&self) {
        self.cases_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn response_sent(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn case_escalated(&self) {
        self.cases_escalated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pass_completed(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn case_processing_time(&self, duration: Duration) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(duration.as_millis() as u64);
            if times.len() > MAX_SAMPLES {
                times.remove(0);
            }
        }
    }

    pub fn handler_executed(&self, handler: &str, duration: Duration, success: bool) {
        if let Ok(mut stats) = self.handler_stats.lock() {
            let entry = stats.entry(handler.to_string()).or_default();
            entry.executions += 1;
            if !success {
                entry.failures += 1;
            }
            entry.execution_times.push(duration.as_micros() as u64);
            if entry.execution_times.len() > MAX_SAMPLES {
                entry.execution_times.remove(0);
            }
        }
    }

    /// Number of recorded runs for one handler
    pub fn handler_executions(&self, handler: &str) -> u64 {
        self.handler_stats
            .lock()
            .ok()
            .and_then(|stats| stats.get(handler).map(|s| s.executions))
            .unwrap_or(0)
    }

    /// Clear every counter (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.cases_received,
            &self.cases_closed,
            &self.cases_errored,
            &self.cases_stalled,
            &self.cases_exhausted,
            &self.responses_sent,
            &self.cases_escalated,
            &self.passes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut times) = self.processing_times.lock() {
            times.clear();
        }
        if let Ok(mut stats) = self.handler_stats.lock() {
            stats.clear();
        }
    }

    fn processing_time_statistics(&self) -> (f64, f64, f64) {
        let Ok(times) = self.processing_times.lock() else {
            return (0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        (avg, percentile(&sorted, 50.0), percentile(&sorted, 95.0))
    }

    fn handler_snapshots(&self) -> HashMap<String, HandlerStatsSnapshot> {
        let Ok(stats) = self.handler_stats.lock() else {
            return HashMap::new();
        };

        stats
            .iter()
            .map(|(name, s)| {
                let avg_execution_time_us = if s.execution_times.is_empty() {
                    0.0
                } else {
                    s.execution_times.iter().sum::<u64>() as f64 / s.execution_times.len() as f64
                };
                (
                    name.clone(),
                    HandlerStatsSnapshot {
                        executions: s.executions,
                        failures: s.failures,
                        avg_execution_time_us,
                    },
                )
            })
            .collect()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95) = self.processing_time_statistics();

        MetricsSnapshot {
            cases: CaseMetrics {
                received: self.cases_received.load(Ordering::Relaxed),
                closed: self.cases_closed.load(Ordering::Relaxed),
                errored: self.cases_errored.load(Ordering::Relaxed),
                stalled: self.cases_stalled.load(Ordering::Relaxed),
                step_budget_exhausted: self.cases_exhausted.load(Ordering::Relaxed),
                sent: self.responses_sent.load(Ordering::Relaxed),
                escalated: self.cases_escalated.load(Ordering::Relaxed),
                passes: self.passes.load(Ordering::Relaxed),
                avg_processing_time_ms: avg,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
            },
            handlers: self.handler_snapshots(),
            uptime_seconds: now.saturating_sub(self.started_at),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cases: CaseMetrics,
    pub handlers: HashMap<String, HandlerStatsSnapshot>,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseMetrics {
    pub received: u64,
    pub closed: u64,
    pub errored: u64,
    pub stalled: u64,
    pub step_budget_exhausted: u64,
    pub sent: u64,
    pub escalated: u64,
    pub passes: u64,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandlerStatsSnapshot {
    pub executions: u64,
    pub failures: u64,
    pub avg_execution_time_us: f64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Nearest-rank percentile over sorted samples
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)] as f64
}
