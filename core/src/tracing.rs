//! Tracing utilities for statement and loader observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// rowgate_trace_query!(&statement.sql, statement.params.len());
/// ```
#[macro_export]
macro_rules! rowgate_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(sql = %$sql, params = $param_count, "rowgate.query");
    };
}

/// Emit a debug-level tracing event when a loader flushes a batch.
///
/// ```ignore
/// rowgate_trace_batch!(&self.table, keys.len());
/// ```
#[macro_export]
macro_rules! rowgate_trace_batch {
    ($table:expr, $keys:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(table = %$table, keys = $keys, "rowgate.batch");
    };
}

/// Emit a warn-level tracing event.
#[macro_export]
macro_rules! rowgate_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)+);
    };
}
