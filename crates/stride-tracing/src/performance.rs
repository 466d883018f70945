//! Timing spans for bulk element traversals
//!
//! A [`PerformanceSpan`] wraps a `tracing` span and reports how long it lived
//! when dropped. Reporting can be switched off process-wide, and short spans
//! can be filtered out with a microsecond threshold.
//!
//! ```rust
//! use stride_tracing::performance::{record_traversal, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("copy", Some(100));
//! let elapsed = span.elapsed_us();
//! drop(span); // reported only after 100us or more
//!
//! record_traversal("copy", 1024, elapsed);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Stored in [`GLOBAL_THRESHOLD_US`] when no threshold is set
const NO_THRESHOLD: u64 = u64::MAX;

static ENABLED: AtomicBool = AtomicBool::new(true);
static GLOBAL_THRESHOLD_US: AtomicU64 = AtomicU64::new(NO_THRESHOLD);

/// Apply process-wide settings. Spans created without their own threshold
/// use `threshold_us`.
pub fn configure(enabled: bool, threshold_us: Option<u64>) {
    ENABLED.store(enabled, Ordering::Relaxed);
    GLOBAL_THRESHOLD_US.store(threshold_us.unwrap_or(NO_THRESHOLD), Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

fn global_threshold() -> Option<u64> {
    Some(GLOBAL_THRESHOLD_US.load(Ordering::Relaxed)).filter(|&t| t != NO_THRESHOLD)
}

/// Guard that times a traversal and reports it on drop
pub struct PerformanceSpan {
    label: String,
    threshold: Option<u64>,
    started: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Debug-level span named `label`
    pub fn new(label: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let label = label.into();
        let span = tracing::debug_span!("perf", name = %label);
        Self::from_span(label, span, threshold_us)
    }

    /// Time a span built by the caller, e.g. one carrying extra fields
    pub fn from_span(label: impl Into<String>, span: tracing::Span, threshold_us: Option<u64>) -> Self {
        Self {
            label: label.into(),
            threshold: threshold_us.or_else(global_threshold),
            started: Instant::now(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.label
    }

    pub fn threshold_us(&self) -> Option<u64> {
        self.threshold
    }

    pub fn elapsed_us(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    fn should_report(&self, elapsed_us: u64) -> bool {
        is_enabled() && self.threshold.map_or(true, |t| elapsed_us >= t)
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();
        if self.should_report(elapsed_us) {
            self.span.in_scope(|| {
                tracing::debug!(
                    operation = %self.label,
                    duration_us = elapsed_us,
                    "span complete"
                );
            });
        }
    }
}

/// Report an element traversal and its throughput
pub fn record_traversal(operation: &str, elements: usize, duration_us: u64) {
    let per_sec = match duration_us {
        0 => 0.0,
        us => elements as f64 * 1e6 / us as f64,
    };
    tracing::debug!(
        event = "traversal",
        operation,
        elements,
        duration_us,
        elements_per_sec = per_sec,
        "element traversal"
    );
}

/// Report a region allocation and the arena state after it
pub fn record_allocation(size_bytes: usize, region_count: usize, cursor: usize) {
    tracing::debug!(
        event = "allocation",
        size_bytes,
        region_count,
        cursor,
        "region allocated"
    );
}
