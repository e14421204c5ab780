//! The collector's HTTP surface.
//!
//! `Endpoint` routes requests to the aggregation service. Every request runs
//! through the same steps in order: gzip request decoding, method check,
//! decode, type and value validation, service call, gzip response encoding
//! and a single access log line.
//!
//! | Method | Path                          | Success                      |
//! |--------|-------------------------------|------------------------------|
//! | POST   | `/update/{type}/{id}/{value}` | 200                          |
//! | POST   | `/update`                     | 200, JSON merged aggregate   |
//! | GET    | `/value/{type}/{id}`          | 200, rendered value          |
//! | POST   | `/value`                      | 200, JSON aggregate          |
//! | GET    | `/`                           | 200, text listing            |

use constants::{ACCEPT_ENCODING_HEADER, CONTENT_ENCODING_HEADER, CONTENT_TYPE_HEADER,
                CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, ROOT_PATH, UPDATE_PATH, VALUE_PATH,
                VARY_HEADER};
use http::{Handler, Request, Response};
use metric::{Metric, WireMetric};
use protocols::{self, gzip, json, path};
use service::{self, Aggregator};
use std::fmt;
use std::time::Instant;
use store::Storage;

/// Why a request was refused
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The type token is unknown.
    InvalidType(String),
    /// The value does not parse for its type.
    InvalidValue(String),
    /// The request is well formed but unusable.
    InvalidRequest(String),
    /// The body could not be decoded.
    MalformedRequest(String),
    /// The path does not have the required segments.
    MissingSegment(String),
    /// Nothing is stored under the requested key, or no route matches.
    NotFound(String),
    /// The route exists but not for this method.
    MethodNotAllowed(String),
    /// Storage failed. The reason is logged, not sent.
    Internal(String),
}

impl Rejection {
    /// The HTTP status for this rejection.
    pub fn status(&self) -> u16 {
        match *self {
            Rejection::InvalidType(_)
            | Rejection::InvalidValue(_)
            | Rejection::InvalidRequest(_)
            | Rejection::MalformedRequest(_) => 400,
            Rejection::MissingSegment(_) | Rejection::NotFound(_) => 404,
            Rejection::MethodNotAllowed(_) => 405,
            Rejection::Internal(_) => 500,
        }
    }

    fn into_response(self) -> Response {
        match self {
            Rejection::Internal(ref reason) => error!("Internal error: {}", reason),
            ref other => debug!("Rejected request: {}", other),
        }
        let body = match self {
            Rejection::Internal(_) => "Internal server error\n".to_string(),
            ref other => format!("{}\n", other),
        };
        Response::new(self.status())
            .with_header(CONTENT_TYPE_HEADER, CONTENT_TYPE_TEXT)
            .with_body(body)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rejection::InvalidType(ref r)
            | Rejection::InvalidValue(ref r)
            | Rejection::InvalidRequest(ref r)
            | Rejection::MalformedRequest(ref r)
            | Rejection::MissingSegment(ref r)
            | Rejection::NotFound(ref r)
            | Rejection::Internal(ref r) => f.write_str(r),
            Rejection::MethodNotAllowed(ref m) => write!(f, "method {} not allowed", m),
        }
    }
}

impl From<service::Error> for Rejection {
    fn from(e: service::Error) -> Rejection {
        let reason = e.to_string();
        match e {
            service::Error::InvalidType(_) => Rejection::InvalidType(reason),
            service::Error::InvalidValue(_) => Rejection::InvalidValue(reason),
            service::Error::NotFound(..) => Rejection::NotFound(reason),
            service::Error::Storage(_) => Rejection::Internal(reason),
        }
    }
}

impl From<protocols::Error> for Rejection {
    fn from(e: protocols::Error) -> Rejection {
        let reason = e.to_string();
        match e {
            protocols::Error::MissingSegment(_) => Rejection::MissingSegment(reason),
            protocols::Error::Malformed(_) => Rejection::MalformedRequest(reason),
            protocols::Error::Invalid(_) => Rejection::InvalidRequest(reason),
            protocols::Error::InvalidValue(_) => Rejection::InvalidValue(reason),
        }
    }
}

/// Decompress a gzip-framed request body in place and drop the
/// `Content-Encoding` header so later stages see plain bytes.
pub fn gunzip_request(mut request: Request) -> Result<Request, Rejection> {
    let gzipped = request
        .header(CONTENT_ENCODING_HEADER)
        .map_or(false, |ce| ce.trim() == gzip::GZIP);
    if gzipped {
        let body = gzip::decompress(&request.body)?;
        trace!(
            "Decompressed request body {} -> {} bytes",
            request.body.len(),
            body.len()
        );
        request.body = body;
        request.remove_header(CONTENT_ENCODING_HEADER);
    }
    Ok(request)
}

/// Compress `response` when the client accepts gzip, marking it with
/// `Content-Encoding` and `Vary`. Otherwise the response passes through
/// untouched, with neither header set.
pub fn gzip_response(response: Response, accepts_gzip: bool) -> Response {
    if !accepts_gzip {
        return response;
    }
    match gzip::compress(&response.body) {
        Ok(body) => response
            .with_header(CONTENT_ENCODING_HEADER, gzip::GZIP)
            .with_header(VARY_HEADER, ACCEPT_ENCODING_HEADER)
            .with_body(body),
        Err(e) => {
            warn!("Failed to compress response, sending plain: {}", e);
            response
        }
    }
}

fn require_method(request: &Request, method: &str) -> Result<(), Rejection> {
    if request.method == method {
        Ok(())
    } else {
        Err(Rejection::MethodNotAllowed(request.method.clone()))
    }
}

fn json_response(metric: &Metric) -> Result<Response, Rejection> {
    let body = json::encode(metric).map_err(|e| Rejection::Internal(e.to_string()))?;
    Ok(Response::new(200)
        .with_header(CONTENT_TYPE_HEADER, CONTENT_TYPE_JSON)
        .with_body(body))
}

/// Render the listing: one `type/id: value` line per aggregate, sorted for
/// stable output.
pub fn render_listing(metrics: &[Metric]) -> String {
    render_wire_listing(metrics.iter().map(WireMetric::from).collect())
}

/// Render wire metrics as listing lines. An entry whose numeric field
/// does not match its type renders as `n/a`.
pub fn render_wire_listing(mut wires: Vec<WireMetric>) -> String {
    wires.sort_by(|l, r| (&l.mtype, &l.id).cmp(&(&r.mtype, &r.id)));
    let mut out = String::with_capacity(wires.len() * 32);
    for wire in &wires {
        out.push_str(&wire.mtype);
        out.push('/');
        out.push_str(&wire.id);
        out.push_str(": ");
        out.push_str(&wire.render_value());
        out.push('\n');
    }
    out
}

/// The HTTP entry point into aggregation
pub struct Endpoint<S> {
    aggregator: Aggregator<S>,
}

impl<S> Endpoint<S>
where
    S: Storage,
{
    /// Serve requests against `aggregator`.
    pub fn new(aggregator: Aggregator<S>) -> Endpoint<S> {
        Endpoint {
            aggregator: aggregator,
        }
    }

    fn route(&self, request: &Request) -> Result<Response, Rejection> {
        let path = request.path();
        let update_prefix = format!("{}/", UPDATE_PATH);
        let value_prefix = format!("{}/", VALUE_PATH);

        if path == ROOT_PATH {
            require_method(request, "GET")?;
            self.list()
        } else if path == UPDATE_PATH || path == update_prefix {
            require_method(request, "POST")?;
            self.update_by_json(request)
        } else if path.starts_with(&update_prefix) {
            require_method(request, "POST")?;
            self.update_by_path(&path[update_prefix.len()..])
        } else if path == VALUE_PATH || path == value_prefix {
            require_method(request, "POST")?;
            self.value_by_json(request)
        } else if path.starts_with(&value_prefix) {
            require_method(request, "GET")?;
            self.value_by_path(&path[value_prefix.len()..])
        } else {
            Err(Rejection::NotFound(format!("no route for {}", path)))
        }
    }

    fn update_by_path(&self, rest: &str) -> Result<Response, Rejection> {
        let update = path::decode_update(rest)?;
        self.aggregator
            .update_metric(&update.mtype, &update.id, &update.value)?;
        Ok(Response::new(200).with_header(CONTENT_TYPE_HEADER, CONTENT_TYPE_TEXT))
    }

    fn update_by_json(&self, request: &Request) -> Result<Response, Rejection> {
        let metric = json::decode_update(request.header(CONTENT_TYPE_HEADER), &request.body)?;
        let stored = self.aggregator.update(metric)?;
        json_response(&stored)
    }

    fn value_by_path(&self, rest: &str) -> Result<Response, Rejection> {
        let lookup = path::decode_lookup(rest)?;
        let metric = match self.aggregator.get_metric(&lookup.mtype, &lookup.id) {
            Ok(metric) => metric,
            // an unknown type can never have been stored
            Err(service::Error::InvalidType(t)) => {
                return Err(Rejection::NotFound(format!("unknown metric type {:?}", t)))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Response::new(200)
            .with_header(CONTENT_TYPE_HEADER, CONTENT_TYPE_TEXT)
            .with_body(metric.value.to_string()))
    }

    fn value_by_json(&self, request: &Request) -> Result<Response, Rejection> {
        let (kind, id) = json::decode_query(request.header(CONTENT_TYPE_HEADER), &request.body)?;
        let metric = self.aggregator.get_metric(kind.as_str(), &id)?;
        json_response(&metric)
    }

    fn list(&self) -> Result<Response, Rejection> {
        let metrics = self.aggregator.get_all_metrics()?;
        Ok(Response::new(200)
            .with_header(CONTENT_TYPE_HEADER, CONTENT_TYPE_TEXT)
            .with_body(render_listing(&metrics)))
    }
}

impl<S> Handler for Endpoint<S>
where
    S: Storage,
{
    fn handle(&self, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method.clone();
        let url = request.url.clone();
        let remote = request
            .remote_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let accepts_gzip = request
            .header(ACCEPT_ENCODING_HEADER)
            .map_or(false, gzip::accepts_gzip);

        let response = match gunzip_request(request) {
            Ok(request) => self.route(&request),
            Err(rejection) => Err(rejection),
        };
        let response = response.unwrap_or_else(Rejection::into_response);
        let response = gzip_response(response, accepts_gzip);

        info!(
            "HTTP Request: method={} url={} status={} size={} duration={:?} remote={}",
            method,
            url,
            response.status,
            response.body.len(),
            start.elapsed(),
            remote
        );
        response
    }
}
