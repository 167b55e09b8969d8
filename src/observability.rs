//! Crawl counters

use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

/// Counters recorded by the request and flush loops
#[derive(Debug)]
pub struct CrawlStats {
    started_at: OffsetDateTime,
    requests_enqueued: AtomicU64,
    requests_completed: AtomicU64,
    requests_retried: AtomicU64,
    fetch_failures: AtomicU64,
    parse_failures: AtomicU64,
    callback_failures: AtomicU64,
    unknown_rules: AtomicU64,
    request_passes: AtomicU64,
    records_recorded: AtomicU64,
    records_flushed: AtomicU64,
    flush_failures: AtomicU64,
    flush_passes: AtomicU64,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            requests_enqueued: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            requests_retried: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            unknown_rules: AtomicU64::new(0),
            request_passes: AtomicU64::new(0),
            records_recorded: AtomicU64::new(0),
            records_flushed: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            flush_passes: AtomicU64::new(0),
        }
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "requests_enqueued", "Metric incremented");
    }

    pub fn request_completed(&self) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "requests_completed", "Metric incremented");
    }

    pub fn request_retried(&self) {
        self.requests_retried.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "requests_retried", "Metric incremented");
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "fetch_failures", "Metric incremented");
    }

    pub fn parse_failed(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "parse_failures", "Metric incremented");
    }

    pub fn callback_failed(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "callback_failures", "Metric incremented");
    }

    pub fn unknown_rule(&self) {
        self.unknown_rules.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "unknown_rules", "Metric incremented");
    }

    pub fn request_pass(&self) {
        self.request_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_added(&self) {
        self.records_recorded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "records_recorded", "Metric incremented");
    }

    pub fn records_flushed(&self, count: usize) {
        self.records_flushed.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(counter = "records_flushed", count, "Metric incremented");
    }

    pub fn flush_failed(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "flush_failures", "Metric incremented");
    }

    pub fn flush_pass(&self) {
        self.flush_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.started_at,
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_retried: self.requests_retried.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            unknown_rules: self.unknown_rules.load(Ordering::Relaxed),
            request_passes: self.request_passes.load(Ordering::Relaxed),
            records_recorded: self.records_recorded.load(Ordering::Relaxed),
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            flush_passes: self.flush_passes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub started_at: OffsetDateTime,
    pub requests_enqueued: u64,
    pub requests_completed: u64,
    pub requests_retried: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub callback_failures: u64,
    pub unknown_rules: u64,
    pub request_passes: u64,
    pub records_recorded: u64,
    pub records_flushed: u64,
    pub flush_failures: u64,
    pub flush_passes: u64,
}

impl StatsSnapshot {
    /// Seconds since the counters were created
    pub fn elapsed_secs(&self) -> i64 {
        (OffsetDateTime::now_utc() - self.started_at).whole_seconds()
    }
}
