//! The tallyd data model.
//!
//! A `Metric` is a named, typed sample. Its numeric part is a tagged
//! `Value`: counters carry an integer delta, gauges a floating point
//! reading. The flat `delta` / `value` pair that travels over JSON lives in
//! `metric::wire` and is converted at the boundary.

use std::error;
use std::fmt;
use std::str::FromStr;

pub mod wire;

pub use self::wire::WireMetric;

/// Type token for counters, as it appears in paths and JSON.
pub const COUNTER: &str = "counter";
/// Type token for gauges, as it appears in paths and JSON.
pub const GAUGE: &str = "gauge";

/// The kind of a metric
///
/// Kind, together with the metric id, forms the identity of a stored
/// aggregate. A counter and a gauge may share an id without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Additive. Stored deltas are summed.
    Counter,
    /// Last write wins.
    Gauge,
}

impl Kind {
    /// The wire token for this kind.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Kind::Counter => COUNTER,
            Kind::Gauge => GAUGE,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    /// Only the exact lowercase tokens are accepted. "Counter",
    /// "counter_extra" and the empty string are all rejected.
    fn from_str(token: &str) -> Result<Kind, Error> {
        match token {
            COUNTER => Ok(Kind::Counter),
            GAUGE => Ok(Kind::Gauge),
            _ => Err(Error::InvalidType(token.to_string())),
        }
    }
}

/// The numeric payload of a metric, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A counter delta.
    Counter(i64),
    /// A gauge reading.
    Gauge(f64),
}

impl Value {
    /// Parse a textual token into a `Value` of the given kind.
    ///
    /// Counters take base-10 signed 64-bit integers. Gauges take any finite
    /// 64-bit float in decimal or scientific notation.
    pub fn parse(kind: Kind, token: &str) -> Result<Value, Error> {
        match kind {
            Kind::Counter => token
                .parse::<i64>()
                .map(Value::Counter)
                .map_err(|_| Error::InvalidValue(kind, token.to_string())),
            Kind::Gauge => match token.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Value::Gauge(v)),
                _ => Err(Error::InvalidValue(kind, token.to_string())),
            },
        }
    }

    /// The kind this value belongs to.
    pub fn kind(&self) -> Kind {
        match *self {
            Value::Counter(_) => Kind::Counter,
            Value::Gauge(_) => Kind::Gauge,
        }
    }
}

/// Renders counters as plain integers and gauges with the shortest
/// representation that round-trips. Rust never switches to scientific
/// notation here, so `1e21` renders with all of its digits.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Counter(d) => write!(f, "{}", d),
            Value::Gauge(v) => write!(f, "{}", v),
        }
    }
}

/// A typed sample with identity
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// The metric name, unique per kind.
    pub id: String,
    /// The numeric payload.
    pub value: Value,
    /// Integrity hash. Carried along, never checked.
    pub hash: Option<String>,
}

impl Metric {
    /// Create a counter sample.
    pub fn counter<S>(id: S, delta: i64) -> Metric
    where
        S: Into<String>,
    {
        Metric {
            id: id.into(),
            value: Value::Counter(delta),
            hash: None,
        }
    }

    /// Create a gauge sample.
    pub fn gauge<S>(id: S, value: f64) -> Metric
    where
        S: Into<String>,
    {
        Metric {
            id: id.into(),
            value: Value::Gauge(value),
            hash: None,
        }
    }

    /// Attach an integrity hash.
    pub fn hash<S>(mut self, hash: S) -> Metric
    where
        S: Into<String>,
    {
        self.hash = Some(hash.into());
        self
    }

    /// The kind of the payload.
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// The storage key of this metric.
    pub fn key(&self) -> (Kind, String) {
        (self.kind(), self.id.clone())
    }

    /// The counter delta, if this is a counter.
    pub fn delta(&self) -> Option<i64> {
        match self.value {
            Value::Counter(d) => Some(d),
            Value::Gauge(_) => None,
        }
    }

    /// The gauge reading, if this is a gauge.
    pub fn gauge_value(&self) -> Option<f64> {
        match self.value {
            Value::Gauge(v) => Some(v),
            Value::Counter(_) => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}: {}", self.kind(), self.id, self.value)
    }
}

/// Errors raised while interpreting wire tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The type token is neither "counter" nor "gauge".
    InvalidType(String),
    /// The value token does not parse for the given kind.
    InvalidValue(Kind, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidType(ref t) => write!(f, "invalid metric type {:?}", t),
            Error::InvalidValue(Kind::Counter, ref v) => {
                write!(f, "counter value must be integer, got {:?}", v)
            }
            Error::InvalidValue(Kind::Gauge, ref v) => {
                write!(f, "gauge value must be float, got {:?}", v)
            }
        }
    }
}

impl error::Error for Error {}
