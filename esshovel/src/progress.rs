//! Shared progress meter for export and import.
//!
//! Counting is exact (atomics, safe to update from every worker);
//! rendering is indicatif's throttled best-effort draw to stderr and
//! may skip frames under load.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct TransferProgress {
    bar: ProgressBar,
    docs: AtomicU64,
    bytes: AtomicU64,
    start: Instant,
}

impl TransferProgress {
    /// A meter with a known document total; renders a bar with ETA.
    pub fn with_total(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ETA: {eta}",
            )
            .expect("static template")
            .progress_chars("#>-"),
        );
        Self::wrap(bar)
    }

    /// A meter without a known total; renders a spinner.
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {pos} docs ({per_sec})",
            )
            .expect("static template"),
        );
        Self::wrap(bar)
    }

    fn wrap(bar: ProgressBar) -> Self {
        Self {
            bar,
            docs: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Record one processed document of `size` payload bytes.
    pub fn add(&self, size: u64) {
        self.docs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
        self.bar.inc(1);
    }

    pub fn docs(&self) -> u64 {
        self.docs.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        let docs = self.docs();
        let bytes = self.bytes();
        let elapsed = self.start.elapsed().as_secs_f64();
        self.bar.finish_with_message(format!(
            "complete: {} docs in {:.1}s ({} bytes)",
            docs, elapsed, bytes
        ));
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}
