//! Prometheus instrumentation for the logship WAL tailing subsystem.
//!
//! A config reload tears the watcher down and rebuilds it while the process
//! registry lives on, so registration here is idempotent: a name conflict
//! rebinds to the collector registered first and counters keep accumulating
//! across watcher restarts instead of resetting to zero.

mod errors;
pub use errors::RegisterError;

mod registry;
pub use registry::MetricsRegistry;

mod watcher_metrics;
pub use watcher_metrics::WatcherMetrics;
