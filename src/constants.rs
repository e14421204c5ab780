//! Library level constants

/// Root of the path-encoded and JSON update endpoints.
pub const UPDATE_PATH: &str = "/update";
/// Root of the path-encoded and JSON lookup endpoints.
pub const VALUE_PATH: &str = "/value";
/// The listing endpoint.
pub const ROOT_PATH: &str = "/";

/// Declared media type of a body.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
/// Compression applied to a body.
pub const CONTENT_ENCODING_HEADER: &str = "Content-Encoding";
/// Compressions the client understands.
pub const ACCEPT_ENCODING_HEADER: &str = "Accept-Encoding";
/// Headers a response varies on.
pub const VARY_HEADER: &str = "Vary";

/// Media type of JSON bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Media type of text bodies.
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Default collector address, for both the server and the agent.
pub const DEFAULT_ADDRESS: &str = "localhost:8080";
/// Default agent poll interval, in seconds.
pub const DEFAULT_POLL_INTERVAL: u64 = 2;
/// Default agent report interval, in seconds.
pub const DEFAULT_REPORT_INTERVAL: u64 = 10;
/// Default number of HTTP worker threads in the server.
pub const DEFAULT_WORKERS: usize = 4;

/// Environment overrides, applied last.
pub const ADDRESS_ENV: &str = "ADDRESS";
/// Overrides the agent poll interval.
pub const POLL_INTERVAL_ENV: &str = "POLL_INTERVAL";
/// Overrides the agent report interval.
pub const REPORT_INTERVAL_ENV: &str = "REPORT_INTERVAL";
/// Overrides the log level.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
