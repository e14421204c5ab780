//! JSON encoded metrics
//!
//! Bodies are single `WireMetric` objects. Decoding is layered: the declared
//! content type is checked first, then syntax, then the identity fields, and
//! last of all, for updates, the numeric field.

use metric::{Kind, Metric, WireMetric};
use protocols::Error;
use serde_json;

/// The only media type accepted on JSON endpoints.
pub const CONTENT_TYPE: &str = "application/json";

/// Check a declared `Content-Type` against `application/json`.
///
/// Parameters such as `charset` are ignored and the media type is compared
/// case-insensitively. A missing declaration is rejected like any other
/// mismatch.
pub fn check_content_type(declared: Option<&str>) -> Result<(), Error> {
    let media_type = declared
        .and_then(|ct| ct.split(';').next())
        .map(|mt| mt.trim());
    match media_type {
        Some(mt) if mt.eq_ignore_ascii_case(CONTENT_TYPE) => Ok(()),
        Some(mt) => Err(Error::Invalid(format!("unsupported content type {:?}", mt))),
        None => Err(Error::Invalid("no content type declared".to_string())),
    }
}

/// Decode a body into a wire metric with a valid identity.
pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<WireMetric, Error> {
    check_content_type(content_type)?;
    if body.is_empty() {
        return Err(Error::Malformed("empty body".to_string()));
    }
    let wire: WireMetric =
        serde_json::from_slice(body).map_err(|e| Error::Malformed(e.to_string()))?;
    if wire.id.is_empty() && wire.mtype.is_empty() {
        return Err(Error::Invalid("metric has neither id nor type".to_string()));
    }
    if wire.id.is_empty() {
        return Err(Error::Invalid("metric has no id".to_string()));
    }
    wire.kind()?;
    Ok(wire)
}

/// Decode an update body into a typed metric.
pub fn decode_update(content_type: Option<&str>, body: &[u8]) -> Result<Metric, Error> {
    let wire = decode(content_type, body)?;
    Ok(wire.into_metric()?)
}

/// Decode a lookup body into the key it asks for. Numeric fields, if any,
/// are ignored.
pub fn decode_query(content_type: Option<&str>, body: &[u8]) -> Result<(Kind, String), Error> {
    let wire = decode(content_type, body)?;
    let kind = wire.kind()?;
    Ok((kind, wire.id))
}

/// Encode a metric as a JSON body.
pub fn encode(metric: &Metric) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&WireMetric::from(metric))
}
