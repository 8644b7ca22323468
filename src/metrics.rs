// Activity metrics
//
// Lightweight counters shared by the edition tracker and the provider registry

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Activity counters
///
/// Uses atomic operations so a single instance can be shared through an
/// `Arc` by the [`EditionTracker`](crate::edition::EditionTracker) and the
/// [`ProviderRegistry`](crate::io::ProviderRegistry). Counters are logged on
/// shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Working copies created from an origin or from scratch
    pub duplications: AtomicU64,

    /// Calls to `check_edition_status`
    pub status_checks: AtomicU64,

    /// Status transitions delivered to consumers (one per consumer)
    pub notifications: AtomicU64,

    /// Items returned by provider reads
    pub items_read: AtomicU64,

    /// Write or delete operations that returned `ProviderCode::Ok`
    pub writes_ok: AtomicU64,

    /// Write or delete operations that returned any other code
    pub writes_failed: AtomicU64,

    /// Export attempts that produced a buffer or file
    pub exports_ok: AtomicU64,

    /// Export attempts that ended with no provider or a provider error
    pub exports_failed: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            duplications: AtomicU64::new(0),
            status_checks: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            items_read: AtomicU64::new(0),
            writes_ok: AtomicU64::new(0),
            writes_failed: AtomicU64::new(0),
            exports_ok: AtomicU64::new(0),
            exports_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_duplication(&self) {
        self.duplications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_check(&self) {
        self.status_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_items_read(&self, count: usize) {
        self.items_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record the outcome of a write or delete
    pub fn record_write(&self, ok: bool) {
        if ok {
            self.writes_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.writes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of an export
    pub fn record_export(&self, ok: bool) {
        if ok {
            self.exports_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.exports_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Activity Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Edition: {} duplications, {} status checks, {} notifications",
            self.duplications.load(Ordering::Relaxed),
            self.status_checks.load(Ordering::Relaxed),
            self.notifications.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Providers: {} items read, {} writes ok, {} writes failed",
            self.items_read.load(Ordering::Relaxed),
            self.writes_ok.load(Ordering::Relaxed),
            self.writes_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Exports: {} ok, {} failed",
            self.exports_ok.load(Ordering::Relaxed),
            self.exports_failed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
