use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Failure modes of [`crate::MetricsRegistry::register`].
#[derive(Error)]
pub enum RegisterError {
    /// A collector with the same fully-qualified name was accepted earlier.
    /// Carries that instance so the caller can rebind to it instead of
    /// failing. Same name implies same collector kind and label schema;
    /// that contract belongs to whoever owns the metric names.
    #[error("collector `{name}` is already registered")]
    AlreadyRegistered {
        name: String,
        existing: Arc<dyn Any + Send + Sync>,
    },
    /// Anything else the underlying registry rejects, e.g. a malformed
    /// descriptor or a collector it already holds that was registered
    /// out-of-band. Unreachable for the fixed descriptors this crate
    /// declares.
    #[error(transparent)]
    Registry(#[from] prometheus::Error),
}

// Manual impl: the adopted collector is type-erased and not Debug.
impl fmt::Debug for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered { name, .. } => f
                .debug_struct("AlreadyRegistered")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::Registry(err) => f.debug_tuple("Registry").field(err).finish(),
        }
    }
}
