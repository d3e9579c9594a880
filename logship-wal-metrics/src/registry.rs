use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::Registry;

use crate::errors::RegisterError;

/// Registration front for a shared Prometheus registry.
///
/// `prometheus::Registry` reports a duplicate registration as a bare
/// `Error::AlreadyReg`, which is useless for a watcher that gets rebuilt on
/// config reload: the fresh collectors would stay unregistered and the
/// rebuilt watcher would increment series nobody collects. This wrapper
/// remembers every collector it has accepted, keyed by fully-qualified
/// metric name, so a conflicting registration hands the original instance
/// back to the caller for rebinding.
///
/// Cheap to clone; clones share the underlying registry and bookkeeping.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    collectors: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl MetricsRegistry {
    /// A registry of its own, isolated from the rest of the process.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Wrap an existing registry, e.g. the process-wide one the exposition
    /// endpoint scrapes. All registrations must flow through the wrapper:
    /// collectors placed into `registry` out-of-band cannot be recovered on
    /// conflict and surface as [`RegisterError::Registry`] instead.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                collectors: DashMap::new(),
            }),
        }
    }

    /// Register `collector` under its fully-qualified metric name.
    ///
    /// A name already accepted by this wrapper yields
    /// [`RegisterError::AlreadyRegistered`] carrying the instance accepted
    /// back then; the underlying registry is left untouched in that case.
    pub fn register<C>(&self, collector: C) -> Result<(), RegisterError>
    where
        C: Collector + Clone + Send + Sync + 'static,
    {
        // Vec-style collectors expose exactly one descriptor; keying on the
        // first is enough for everything this crate registers.
        let fq_name = collector
            .desc()
            .first()
            .map(|desc| desc.fq_name.clone())
            .unwrap_or_default();

        match self.inner.collectors.entry(fq_name) {
            Entry::Occupied(slot) => Err(RegisterError::AlreadyRegistered {
                name: slot.key().clone(),
                existing: Arc::clone(slot.get()),
            }),
            Entry::Vacant(slot) => {
                self.inner.registry.register(Box::new(collector.clone()))?;
                slot.insert(Arc::new(collector));
                Ok(())
            }
        }
    }

    /// Snapshot of all registered metric families, for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner.registry.gather()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("collectors", &self.inner.collectors.len())
            .finish()
    }
}
