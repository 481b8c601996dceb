//! Run statistics
//!
//! Counters are lock-free; only the latency window takes a mutex, and only
//! for the duration of a push or a sum.

use crate::config::defaults::DEFAULT_LATENCY_WINDOW;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Request counters and a bounded latency history
#[derive(Debug)]
pub struct RunStats {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    latencies: Mutex<VecDeque<u64>>,
    window: usize,
}

/// Point-in-time view of [`RunStats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    /// Mean over the latency window, rounded to 2 decimals
    pub average_processing_time_ms: f64,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl RunStats {
    /// Collector keeping at most `window` latency samples (minimum 1)
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(window)),
            window,
        }
    }

    /// Count a new request
    pub fn record_request(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a successful request and its latency
    pub fn record_success(&self, elapsed_ms: u64) {
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.record_latency(elapsed_ms);
    }

    /// Count a failed request
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request answered from the cache
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, elapsed_ms: u64) {
        // A poisoned window only loses samples
        if let Ok(mut latencies) = self.latencies.lock() {
            if latencies.len() == self.window {
                latencies.pop_front();
            }
            latencies.push_back(elapsed_ms);
        }
    }

    /// Number of latency samples currently held
    pub fn latency_samples(&self) -> usize {
        self.latencies.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);

        let average = self
            .latencies
            .lock()
            .ok()
            .filter(|l| !l.is_empty())
            .map(|l| l.iter().sum::<u64>() as f64 / l.len() as f64)
            .unwrap_or(0.0);

        StatsSnapshot {
            total_requests: total,
            successful_requests: successful,
            failed_requests: self.failed.load(Ordering::Relaxed),
            cache_hits,
            average_processing_time_ms: (average * 100.0).round() / 100.0,
            success_rate: ratio(successful, total),
            cache_hit_rate: ratio(cache_hits, total),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_WINDOW)
    }
}
