//! Shorthand for performance spans and events

/// Start a [`PerformanceSpan`](crate::performance::PerformanceSpan), optionally
/// attaching fields to the underlying debug span.
///
/// ```rust
/// use stride_tracing::perf_span;
///
/// let _plain = perf_span!("fill");
/// let _span = perf_span!("copy", elements = 1024, item_size = 4);
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {
        $crate::performance::PerformanceSpan::new($name, None)
    };
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {
        $crate::performance::PerformanceSpan::from_span(
            $name,
            $crate::__tracing::debug_span!("perf", name = $name, $($field = $value),+),
            None,
        )
    };
}

/// Emit a debug event tagged with `event = $name`.
///
/// ```rust
/// use stride_tracing::perf_event;
///
/// perf_event!("gather_done", elements = 24, index_arrays = 1);
/// ```
#[macro_export]
macro_rules! perf_event {
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {
        $crate::__tracing::debug!(event = $name, $($field = $value),+)
    };
}
