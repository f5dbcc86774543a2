//! Tracing utilities for transaction and prefetch observability.
//!
//! Enable the `tracing` feature to emit spans and events via the `tracing`
//! crate. These macros no-op when the feature is disabled, avoiding
//! `#[cfg]` boilerplate at every call site.

/// Emit an info-level tracing event for transaction/savepoint/manual frame
/// lifecycle (begin, commit, rollback, savepoint, release).
///
/// ```ignore
/// quarry_trace_tx!("begin", depth);
/// quarry_trace_tx!("commit", depth);
/// ```
#[macro_export]
macro_rules! quarry_trace_tx {
    ($event:literal, $depth:expr) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, depth = $depth, "quarry.transaction");
    };
}

/// Emit a debug-level tracing event at `execute_sql` dispatch time.
///
/// ```ignore
/// quarry_trace_execute!(&sql_str, param_count);
/// ```
#[macro_export]
macro_rules! quarry_trace_execute {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "quarry.execute");
    };
}

/// Emit a debug-level tracing event when the prefetch engine issues one of
/// its extra per-relation queries.
///
/// ```ignore
/// quarry_trace_prefetch!("children", target_model_name);
/// ```
#[macro_export]
macro_rules! quarry_trace_prefetch {
    ($relation:literal, $model:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(relation = $relation, model = %$model, "quarry.prefetch");
    };
}
