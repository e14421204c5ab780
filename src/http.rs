//! Tiny, unassuming HTTP server
//!
//! Requests are read fully into memory and handed to a `Handler` as plain
//! values, which keeps handlers testable without a socket. A fixed pool of
//! worker threads pulls from one shared listener so requests are served
//! independently of each other.

use std::error;
use std::fmt;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thread::{self, Poll, Stoppable, ThreadHandle};
use tiny_http;

/// An inbound HTTP request, body included.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// The request method, e.g. `POST`.
    pub method: String,
    /// The request target, query string included.
    pub url: String,
    /// Header name and value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// The body, fully read.
    pub body: Vec<u8>,
    /// The peer, when known.
    pub remote_addr: Option<SocketAddr>,
}

impl Request {
    /// A request with no headers and an empty body.
    pub fn new<S>(method: S, url: S) -> Request
    where
        S: Into<String>,
    {
        Request {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Append a header.
    pub fn with_header<S>(mut self, name: S, value: S) -> Request
    where
        S: Into<String>,
    {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    pub fn with_body<B>(mut self, body: B) -> Request
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self
    }

    /// The request path with any query string removed.
    pub fn path(&self) -> &str {
        match self.url.find('?') {
            Some(idx) => &self.url[..idx],
            None => &self.url,
        }
    }

    /// First value of the named header. Names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| v.as_str())
    }

    /// Drop every value of the named header.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|&(ref n, _)| !n.eq_ignore_ascii_case(name));
    }
}

/// An outbound HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// Header name and value pairs.
    pub headers: Vec<(String, String)>,
    /// The body, already encoded.
    pub body: Vec<u8>,
}

impl Response {
    /// An empty response with the given status.
    pub fn new(status: u16) -> Response {
        Response {
            status: status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set a header, replacing any previous value with the same name.
    pub fn with_header<S>(mut self, name: &str, value: S) -> Response
    where
        S: Into<String>,
    {
        self.headers.retain(|&(ref n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Replace the body.
    pub fn with_body<B>(mut self, body: B) -> Response
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self
    }

    /// First value of the named header. Names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| v.as_str())
    }
}

/// Request handler shared by all worker threads.
pub trait Handler: Sync + Send {
    /// Answer `request`. Must not panic.
    fn handle(&self, request: Request) -> Response;
}

impl<H> Handler for Arc<H>
where
    H: Handler,
{
    fn handle(&self, request: Request) -> Response {
        (**self).handle(request)
    }
}

/// HTTP server errors
#[derive(Debug)]
pub enum Error {
    /// The listening socket could not be set up.
    Bind(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Bind(ref e) => write!(f, "could not bind HTTP listener: {}", e),
        }
    }
}

impl error::Error for Error {}

/// Multi-threaded HTTP server.
pub struct Server {
    workers: Vec<ThreadHandle>,
    poll: Poll,
    local_addr: Option<SocketAddr>,
}

fn serve<H>(handler: &H, mut request: tiny_http::Request)
where
    H: Handler,
{
    let mut body = Vec::new();
    if let Err(e) = request.as_reader().read_to_end(&mut body) {
        warn!("Failed to read request body: {}", e);
        let response = tiny_http::Response::from_data(Vec::new())
            .with_status_code(tiny_http::StatusCode(400));
        let _ = request.respond(response);
        return;
    }
    let incoming = Request {
        method: request.method().to_string(),
        url: request.url().to_string(),
        headers: request
            .headers()
            .iter()
            .map(|h| (h.field.to_string(), h.value.to_string()))
            .collect(),
        body: body,
        remote_addr: request.remote_addr().cloned(),
    };

    let response = handler.handle(incoming);

    let mut outgoing = tiny_http::Response::from_data(response.body)
        .with_status_code(tiny_http::StatusCode(response.status));
    for (name, value) in response.headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => outgoing.add_header(header),
            Err(()) => warn!("Dropping unencodable response header {:?}", name),
        }
    }
    if let Err(e) = request.respond(outgoing) {
        warn!("Failed to send response! {:?}", e);
    }
}

/// Pause after a failed accept before trying again.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Pull requests from `recv` and hand them to `serve` until shutdown.
/// Accept errors are logged and retried; they never end the loop.
fn accept_loop<T, R, S>(poll: &Poll, mut recv: R, mut serve: S)
where
    R: FnMut() -> io::Result<Option<T>>,
    S: FnMut(T),
{
    while !poll.is_shutdown() {
        match recv() {
            Ok(Some(request)) => serve(request),
            Ok(None) => continue,
            Err(e) => {
                error!("Failed during recv_timeout {:?}", e);
                poll.sleep(RECV_ERROR_BACKOFF);
            }
        }
    }
}

fn http_server<H>(poll: Poll, listener: Arc<tiny_http::Server>, handler: Arc<H>)
where
    H: Handler,
{
    accept_loop(
        &poll,
        || listener.recv_timeout(Duration::from_millis(100)),
        |request| serve(&*handler, request),
    )
}

impl Server {
    /// Bind `host_port` and start `workers` threads serving `handler`.
    pub fn new<H>(host_port: &str, workers: usize, handler: H) -> Result<Server, Error>
    where
        H: Handler + 'static,
    {
        let listener =
            tiny_http::Server::http(host_port).map_err(|e| Error::Bind(e.to_string()))?;
        let local_addr = listener.server_addr().to_ip();
        let listener = Arc::new(listener);
        let handler = Arc::new(handler);
        let poll = Poll::new();

        let workers = (0..workers.max(1))
            .map(|_| {
                let listener = Arc::clone(&listener);
                let handler = Arc::clone(&handler);
                thread::spawn_with(poll.clone(), move |poll| {
                    http_server(poll, listener, handler)
                })
            })
            .collect();

        Ok(Server {
            workers: workers,
            poll: poll,
            local_addr: local_addr,
        })
    }

    /// The address actually bound. Useful when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// Graceful shutdown support for Server.
impl Stoppable for Server {
    fn join(self) {
        for worker in self.workers {
            worker.join();
        }
    }

    fn shutdown(self) {
        self.poll.shutdown();
        self.join();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hyper;
    use hyper::header::ContentType;

    struct Echo;

    impl Handler for Echo {
        fn handle(&self, request: Request) -> Response {
            let body = format!(
                "{} {} {}",
                request.method,
                request.path(),
                String::from_utf8_lossy(&request.body)
            );
            Response::new(201)
                .with_header("Content-Type", "text/plain")
                .with_body(body)
        }
    }

    #[test]
    fn request_helpers() {
        let mut req = Request::new("POST", "/update?x=1")
            .with_header("content-encoding", "gzip")
            .with_header("Content-Type", "application/json");
        assert_eq!("/update", req.path());
        assert_eq!(Some("gzip"), req.header("Content-Encoding"));
        req.remove_header("CONTENT-ENCODING");
        assert_eq!(None, req.header("Content-Encoding"));
        assert_eq!(Some("application/json"), req.header("content-type"));
    }

    #[test]
    fn response_header_replaces() {
        let resp = Response::new(200)
            .with_header("Vary", "a")
            .with_header("vary", "Accept-Encoding");
        assert_eq!(1, resp.headers.len());
        assert_eq!(Some("Accept-Encoding"), resp.header("Vary"));
    }

    #[test]
    fn accept_errors_do_not_end_the_worker() {
        let poll = Poll::new();
        let mut calls = 0;
        let mut served = Vec::new();
        {
            let stop = poll.clone();
            accept_loop(
                &poll,
                || {
                    calls += 1;
                    if calls <= 3 {
                        Err(io::Error::new(io::ErrorKind::Other, "accept failed"))
                    } else if calls == 4 {
                        Ok(None)
                    } else {
                        Ok(Some(calls))
                    }
                },
                |request| {
                    served.push(request);
                    stop.shutdown();
                },
            );
        }
        assert_eq!(vec![5], served);
        assert_eq!(5, calls);
    }

    #[test]
    fn serves_requests_until_shutdown() {
        let server = Server::new("127.0.0.1:0", 2, Echo).unwrap();
        let addr = server.local_addr().unwrap();

        let client = hyper::Client::new();
        let url = format!("http://{}/echo?q=1", addr);
        let mut res = client
            .post(url.as_str())
            .header(ContentType::plaintext())
            .body("hello")
            .send()
            .unwrap();
        let mut body = String::new();
        res.read_to_string(&mut body).unwrap();
        assert_eq!(hyper::status::StatusCode::Created, res.status);
        assert_eq!("POST /echo hello", body);

        server.shutdown();
    }
}
