use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const UNSET_TS: u64 = 0;

#[derive(Debug)]
pub struct AtomicMetric {
    success: AtomicU64,
    failure: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct AtomicSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
}

impl AtomicMetric {
    pub const fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(UNSET_TS),
            last_failure_ms: AtomicU64::new(UNSET_TS),
        }
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
        self.last_success_ms
            .store(current_unix_ms(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failure.fetch_add(1, Ordering::Relaxed);
        self.last_failure_ms
            .store(current_unix_ms(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AtomicSnapshot {
        AtomicSnapshot {
            successes: self.success.load(Ordering::Relaxed),
            failures: self.failure.load(Ordering::Relaxed),
            last_success_ms: timestamp_to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: timestamp_to_option(self.last_failure_ms.load(Ordering::Relaxed)),
        }
    }
}

impl Default for AtomicMetric {
    fn default() -> Self {
        Self::new()
    }
}

/// フィード読み込み経路ごとの稼働カウンタ。エクスポートはしない。
#[derive(Debug, Default)]
pub struct FeedMetrics {
    pub initial_loads: AtomicMetric,
    pub more_loads: AtomicMetric,
    stale_discards: AtomicU64,
    like_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedMetricsSnapshot {
    pub initial_loads: AtomicSnapshot,
    pub more_loads: AtomicSnapshot,
    pub stale_discards: u64,
    pub like_failures: u64,
}

impl FeedMetrics {
    pub const fn new() -> Self {
        Self {
            initial_loads: AtomicMetric::new(),
            more_loads: AtomicMetric::new(),
            stale_discards: AtomicU64::new(0),
            like_failures: AtomicU64::new(0),
        }
    }

    pub fn record_stale_discard(&self) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_like_failure(&self) {
        self.like_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FeedMetricsSnapshot {
        FeedMetricsSnapshot {
            initial_loads: self.initial_loads.snapshot(),
            more_loads: self.more_loads.snapshot(),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
            like_failures: self.like_failures.load(Ordering::Relaxed),
        }
    }
}

#[inline]
pub fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(UNSET_TS)
}

#[inline]
fn timestamp_to_option(value: u64) -> Option<u64> {
    if value == UNSET_TS {
        None
    } else {
        Some(value)
    }
}
