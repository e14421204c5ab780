//! Path-encoded metrics
//!
//! Updates look like `/update/{type}/{id}/{value}`, lookups like
//! `/value/{type}/{id}`. The shape of the path is checked here; whether the
//! type and value tokens make sense is the aggregation service's business.
//!
//! Segments are split on the raw path and percent-decoded afterwards, so an
//! id may contain an encoded `/`.

use metric::{Metric, Value};
use protocols::Error;
use std::borrow::Cow;
use url::percent_encoding::{percent_decode, utf8_percent_encode, PATH_SEGMENT_ENCODE_SET};

/// The segments of a path-encoded update
#[derive(Debug, PartialEq)]
pub struct Update<'a> {
    /// The type token.
    pub mtype: Cow<'a, str>,
    /// The metric id, percent-decoded.
    pub id: Cow<'a, str>,
    /// The value token.
    pub value: Cow<'a, str>,
}

/// The segments of a path-encoded lookup
#[derive(Debug, PartialEq)]
pub struct Lookup<'a> {
    /// The type token.
    pub mtype: Cow<'a, str>,
    /// The metric id, percent-decoded.
    pub id: Cow<'a, str>,
}

/// Split `rest` into exactly `count` non-empty segments.
fn segments<'a>(rest: &'a str, count: usize) -> Result<Vec<Cow<'a, str>>, Error> {
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.len() != count || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::MissingSegment(rest.to_string()));
    }
    parts
        .into_iter()
        .map(|p| {
            percent_decode(p.as_bytes())
                .decode_utf8()
                .map_err(|_| Error::Malformed(format!("segment {:?} is not UTF-8", p)))
        })
        .collect()
}

/// Decode the part of an update path following `/update/`.
pub fn decode_update(rest: &str) -> Result<Update, Error> {
    let mut parts = segments(rest, 3)?.into_iter();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(mtype), Some(id), Some(value)) => Ok(Update {
            mtype: mtype,
            id: id,
            value: value,
        }),
        _ => Err(Error::MissingSegment(rest.to_string())),
    }
}

/// Decode the part of a lookup path following `/value/`.
pub fn decode_lookup(rest: &str) -> Result<Lookup, Error> {
    let mut parts = segments(rest, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(mtype), Some(id)) => Ok(Lookup {
            mtype: mtype,
            id: id,
        }),
        _ => Err(Error::MissingSegment(rest.to_string())),
    }
}

/// Encode `metric` as an update path below `base`.
///
/// Gauges are written with six decimals. The id is percent-encoded. `base`
/// may or may not end in a slash.
pub fn encode_update(base: &str, metric: &Metric) -> String {
    let value = match metric.value {
        Value::Counter(d) => d.to_string(),
        Value::Gauge(v) => format!("{:.6}", v),
    };
    let sep = if base.ends_with('/') { "" } else { "/" };
    format!(
        "{}{}{}/{}/{}",
        base,
        sep,
        metric.kind(),
        utf8_percent_encode(&metric.id, PATH_SEGMENT_ENCODE_SET),
        value
    )
}
