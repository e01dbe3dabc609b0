//! Bundle load metrics.
//!
//! Each state manager owns one [`LoadMetrics`]; counters only ever grow.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for bundle loading.
#[derive(Debug, Default)]
pub struct LoadMetrics {
    /// Fetches spawned by a locale change
    fetches_started: AtomicUsize,

    /// Fetches that completed and installed their bundle
    bundles_installed: AtomicUsize,

    /// Installs whose locale no longer matched the current locale
    stale_installs: AtomicUsize,

    /// Fetches that failed after all retries
    fetch_failures: AtomicUsize,

    /// Locale changes that cleared the bundle instead of fetching
    bundles_cleared: AtomicUsize,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch_started(&self) {
        self.fetches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundle_installed(&self) {
        self.bundles_installed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_install(&self) {
        self.stale_installs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundle_cleared(&self) {
        self.bundles_cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetches_started(&self) -> usize {
        self.fetches_started.load(Ordering::Relaxed)
    }

    pub fn bundles_installed(&self) -> usize {
        self.bundles_installed.load(Ordering::Relaxed)
    }

    pub fn stale_installs(&self) -> usize {
        self.stale_installs.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> usize {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn bundles_cleared(&self) -> usize {
        self.bundles_cleared.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let started = self.fetches_started();
        let installed = self.bundles_installed();
        let failures = self.fetch_failures();

        let finished = installed + failures;
        let fetch_success_rate = if finished > 0 {
            (installed as f64 / finished as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            fetches_started: started,
            bundles_installed: installed,
            stale_installs: self.stale_installs(),
            fetch_failures: failures,
            bundles_cleared: self.bundles_cleared(),
            fetch_success_rate,
        }
    }
}

/// Snapshot of [`LoadMetrics`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub fetches_started: usize,
    pub bundles_installed: usize,
    pub stale_installs: usize,
    pub fetch_failures: usize,
    pub bundles_cleared: usize,

    /// Installed / (installed + failed) as a percentage (0-100)
    pub fetch_success_rate: f64,
}
