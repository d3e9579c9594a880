use std::any::Any;
use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{IntCounterVec, IntGauge, IntGaugeVec, Opts};
use tracing::warn;

use crate::errors::RegisterError;
use crate::registry::MetricsRegistry;

const NAMESPACE: &str = "logship";
const SUBSYSTEM: &str = "wal_watcher";

/// Fixed identity of one collector. Names, help text and label keys never
/// vary at runtime; conflict recovery assumes same name means same schema,
/// so changing a label set requires a new metric name.
struct MetricSpec {
    name: &'static str,
    help: &'static str,
    labels: &'static [&'static str],
}

const RECORDS_READ: MetricSpec = MetricSpec {
    name: "records_read_total",
    help: "Number of records read by the WAL watcher from the WAL.",
    labels: &["id"],
};

const RECORD_DECODE_FAILURES: MetricSpec = MetricSpec {
    name: "record_decode_failures_total",
    help: "Number of records read by the WAL watcher that failed to decode.",
    labels: &["id"],
};

const DROPPED_WRITE_NOTIFICATIONS: MetricSpec = MetricSpec {
    name: "dropped_write_notifications_total",
    help: "Number of write notifications dropped because one was already buffered.",
    labels: &["id"],
};

const SEGMENT_READ: MetricSpec = MetricSpec {
    name: "segment_read_total",
    help: "Number of segment reads triggered by the backup timer firing, by reason.",
    labels: &["id", "reason"],
};

const CURRENT_SEGMENT: MetricSpec = MetricSpec {
    name: "current_segment",
    help: "Segment the WAL watcher is currently reading records from.",
    labels: &["id"],
};

const WATCHERS_RUNNING: MetricSpec = MetricSpec {
    name: "running",
    help: "Number of WAL watchers running.",
    labels: &[],
};

/// Instrumentation handles for one WAL watcher lifecycle.
///
/// Constructed every time the watcher is (re)started. When the supplied
/// registry already holds a collector under one of the six names, the set
/// rebinds to that instance, so counts survive reconfiguration. Handles are
/// clones of the registered collectors and safe for concurrent use.
#[derive(Clone)]
pub struct WatcherMetrics {
    /// Records successfully read from the WAL, per watcher `id`.
    pub records_read: IntCounterVec,
    /// Read records that failed to decode, per watcher `id`.
    pub record_decode_failures: IntCounterVec,
    /// Write-available notifications discarded because one was already
    /// pending, per watcher `id`.
    pub dropped_write_notifications: IntCounterVec,
    /// Segment re-reads forced by the backup timer, per `id` and `reason`.
    pub segment_read: IntCounterVec,
    /// Index of the segment currently being read, per watcher `id`.
    pub current_segment: IntGaugeVec,
    /// Watcher instances currently active, process-wide.
    pub watchers_running: IntGauge,
}

impl WatcherMetrics {
    /// Build the six watcher collectors and register them with `registry`.
    ///
    /// With `None` the handles still work but are never exposed for
    /// collection, which keeps tests free of registry plumbing. Conflicts
    /// are resolved by adopting the already registered collector; nothing
    /// is surfaced to the caller and construction never fails.
    ///
    /// # Panics
    ///
    /// If the registry holds a collector of a different kind under one of
    /// the six names. The names are owned exclusively by this module, so
    /// that is a naming collision elsewhere in the process.
    pub fn new(registry: Option<&MetricsRegistry>) -> Self {
        let mut metrics = Self {
            records_read: counter_vec(&RECORDS_READ),
            record_decode_failures: counter_vec(&RECORD_DECODE_FAILURES),
            dropped_write_notifications: counter_vec(&DROPPED_WRITE_NOTIFICATIONS),
            segment_read: counter_vec(&SEGMENT_READ),
            current_segment: gauge_vec(&CURRENT_SEGMENT),
            watchers_running: gauge(&WATCHERS_RUNNING),
        };

        // Collectors get re-registered when the watcher is rebuilt on
        // reload; rebind to the old instances instead of erroring out.
        if let Some(registry) = registry {
            metrics.records_read = bind(registry, metrics.records_read);
            metrics.record_decode_failures = bind(registry, metrics.record_decode_failures);
            metrics.dropped_write_notifications =
                bind(registry, metrics.dropped_write_notifications);
            metrics.segment_read = bind(registry, metrics.segment_read);
            metrics.current_segment = bind(registry, metrics.current_segment);
            metrics.watchers_running = bind(registry, metrics.watchers_running);
        }

        metrics
    }
}

fn opts(spec: &MetricSpec) -> Opts {
    Opts::new(spec.name, spec.help)
        .namespace(NAMESPACE)
        .subsystem(SUBSYSTEM)
}

fn counter_vec(spec: &MetricSpec) -> IntCounterVec {
    IntCounterVec::new(opts(spec), spec.labels).expect("fixed descriptor is valid")
}

fn gauge_vec(spec: &MetricSpec) -> IntGaugeVec {
    IntGaugeVec::new(opts(spec), spec.labels).expect("fixed descriptor is valid")
}

fn gauge(spec: &MetricSpec) -> IntGauge {
    IntGauge::with_opts(opts(spec)).expect("fixed descriptor is valid")
}

/// Register `collector`, rebinding to the previously registered instance on
/// a name conflict. Panics when the prior instance is of a different kind;
/// same name means same kind for the names this module owns.
fn bind<C>(registry: &MetricsRegistry, collector: C) -> C
where
    C: Collector + Clone + Send + Sync + 'static,
{
    match registry.register(collector.clone()) {
        Ok(()) => collector,
        Err(RegisterError::AlreadyRegistered { name, existing }) => rebind(&name, existing),
        Err(RegisterError::Registry(err)) => {
            // Unreachable for these fixed descriptors; keep the watcher
            // running on an unexported handle rather than failing it.
            warn!(error = %err, "failed to register WAL watcher collector");
            collector
        }
    }
}

fn rebind<C>(name: &str, existing: Arc<dyn Any + Send + Sync>) -> C
where
    C: Clone + Send + Sync + 'static,
{
    match existing.downcast::<C>() {
        Ok(prior) => prior.as_ref().clone(),
        Err(_) => panic!("collector `{name}` was previously registered with a different type"),
    }
}
