//! In-memory aggregate storage.
//!
//! The store keeps one aggregate per `(kind, id)`. Counters accumulate,
//! gauges are replaced. All points are retained for the life of the process.

use metric::{Kind, Metric, Value};
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::sync::Mutex;

/// Storage errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The backing storage cannot be reached or is in an inconsistent state.
    Unavailable(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Unavailable(ref reason) => write!(f, "storage unavailable: {}", reason),
        }
    }
}

impl error::Error for Error {}

/// A keyed collection of aggregates with merge-on-write semantics.
///
/// Implementations must be safe to share between request threads.
pub trait Storage: Send + Sync {
    /// Merge `metric` into the stored aggregate for its key.
    fn upsert(&self, metric: Metric) -> Result<(), Error>;
    /// Look up the aggregate for `(kind, id)`. Must not mutate.
    fn get(&self, kind: Kind, id: &str) -> Result<Option<Metric>, Error>;
    /// Snapshot every stored aggregate. Order is unspecified.
    fn list(&self) -> Result<Vec<Metric>, Error>;
}

/// The in-memory store
///
/// A single mutex guards the whole map. Expected cardinality is a few dozen
/// keys per agent, so per-key locking buys nothing.
#[derive(Debug, Default)]
pub struct MemStore {
    metrics: Mutex<HashMap<(Kind, String), Metric>>,
}

impl MemStore {
    /// An empty store.
    pub fn new() -> MemStore {
        MemStore::default()
    }

    /// Total stored aggregates
    pub fn len(&self) -> usize {
        self.metrics.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Is nothing stored yet?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemStore {
    fn upsert(&self, mut metric: Metric) -> Result<(), Error> {
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| Error::Unavailable("store lock poisoned".to_string()))?;
        let key = metric.key();
        if let Value::Counter(incoming) = metric.value {
            if let Some(&Metric {
                value: Value::Counter(existing),
                ..
            }) = metrics.get(&key)
            {
                metric.value = Value::Counter(existing.saturating_add(incoming));
            }
        }
        trace!("stored {}", metric);
        metrics.insert(key, metric);
        Ok(())
    }

    fn get(&self, kind: Kind, id: &str) -> Result<Option<Metric>, Error> {
        let metrics = self
            .metrics
            .lock()
            .map_err(|_| Error::Unavailable("store lock poisoned".to_string()))?;
        Ok(metrics.get(&(kind, id.to_string())).cloned())
    }

    fn list(&self) -> Result<Vec<Metric>, Error> {
        let metrics = self
            .metrics
            .lock()
            .map_err(|_| Error::Unavailable("store lock poisoned".to_string()))?;
        Ok(metrics.values().cloned().collect())
    }
}
