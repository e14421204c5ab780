//! Aggregation service
//!
//! Translates primitive wire inputs into typed metrics and hands them to a
//! `Storage` for merging.

use metric::{self, Kind, Metric, Value};
use std::error;
use std::fmt;
use std::sync::Arc;
use store::{self, Storage};

/// Errors produced by the aggregation service
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The type token is not a known metric type.
    InvalidType(String),
    /// The value token does not parse for the requested type.
    InvalidValue(String),
    /// No aggregate is stored under the requested key.
    NotFound(Kind, String),
    /// The backing store failed.
    Storage(store::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidType(ref t) => write!(f, "invalid metric type {:?}", t),
            Error::InvalidValue(ref reason) => write!(f, "invalid metric value: {}", reason),
            Error::NotFound(kind, ref id) => write!(f, "metric {}/{} not found", kind, id),
            Error::Storage(ref e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for Error {}

impl From<metric::Error> for Error {
    fn from(e: metric::Error) -> Error {
        match e {
            metric::Error::InvalidType(t) => Error::InvalidType(t),
            e @ metric::Error::InvalidValue(..) => Error::InvalidValue(e.to_string()),
        }
    }
}

impl From<store::Error> for Error {
    fn from(e: store::Error) -> Error {
        Error::Storage(e)
    }
}

/// Fail with `InvalidType` unless `token` is exactly "counter" or "gauge".
pub fn validate_type(token: &str) -> Result<Kind, Error> {
    Ok(token.parse::<Kind>()?)
}

/// Parse a value token for the given kind.
pub fn parse_value(kind: Kind, token: &str) -> Result<Value, Error> {
    Ok(Value::parse(kind, token)?)
}

/// The aggregation service
///
/// Cheap to share: the storage sits behind an `Arc` and every method takes
/// `&self`.
pub struct Aggregator<S> {
    storage: Arc<S>,
}

impl<S> Clone for Aggregator<S> {
    fn clone(&self) -> Self {
        Aggregator {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S> Aggregator<S>
where
    S: Storage,
{
    /// An aggregator merging into `storage`.
    pub fn new(storage: Arc<S>) -> Aggregator<S> {
        Aggregator { storage: storage }
    }

    /// Validate, parse and merge a path-encoded update.
    pub fn update_metric(&self, mtype: &str, id: &str, value: &str) -> Result<(), Error> {
        let kind = validate_type(mtype)?;
        let value = parse_value(kind, value)?;
        debug!("update {}/{} with {}", kind, id, value);
        self.storage.upsert(Metric {
            id: id.to_string(),
            value: value,
            hash: None,
        })?;
        Ok(())
    }

    /// Merge an already typed metric and return the aggregate now stored
    /// under its key.
    pub fn update(&self, metric: Metric) -> Result<Metric, Error> {
        let kind = metric.kind();
        let id = metric.id.clone();
        debug!("update {}", metric);
        self.storage.upsert(metric)?;
        match self.storage.get(kind, &id)? {
            Some(stored) => Ok(stored),
            None => Err(Error::Storage(store::Error::Unavailable(format!(
                "{}/{} vanished after write",
                kind, id
            )))),
        }
    }

    /// Look up one aggregate by its wire type token and id.
    pub fn get_metric(&self, mtype: &str, id: &str) -> Result<Metric, Error> {
        let kind = validate_type(mtype)?;
        match self.storage.get(kind, id)? {
            Some(metric) => Ok(metric),
            None => Err(Error::NotFound(kind, id.to_string())),
        }
    }

    /// Snapshot all aggregates. Order is unspecified.
    pub fn get_all_metrics(&self) -> Result<Vec<Metric>, Error> {
        Ok(self.storage.list()?)
    }
}
