//! Wire formats understood by tallyd.
//!
//! Three forms are supported: path-encoded updates and lookups, JSON bodies
//! and gzip framing, which is orthogonal to the other two.

use metric;
use std::error;
use std::fmt;

pub mod gzip;
pub mod json;
pub mod path;

/// Decoding errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A required path segment is absent or empty.
    MissingSegment(String),
    /// The payload cannot be decoded at all: bad JSON syntax, bad gzip
    /// framing, an empty body.
    Malformed(String),
    /// The payload decodes but is not acceptable: wrong declared content
    /// type, missing id or type, unknown type.
    Invalid(String),
    /// The payload is well formed but its numeric field does not fit its
    /// type.
    InvalidValue(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MissingSegment(ref p) => write!(f, "missing path segment in {:?}", p),
            Error::Malformed(ref r) => write!(f, "malformed request: {}", r),
            Error::Invalid(ref r) => write!(f, "invalid request: {}", r),
            Error::InvalidValue(ref r) => write!(f, "invalid metric value: {}", r),
        }
    }
}

impl error::Error for Error {}

impl From<metric::Error> for Error {
    fn from(e: metric::Error) -> Error {
        match e {
            metric::Error::InvalidType(_) => Error::Invalid(e.to_string()),
            metric::Error::InvalidValue(..) => Error::InvalidValue(e.to_string()),
        }
    }
}
