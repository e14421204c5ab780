//! Delivery of samples to the collector.

use constants::UPDATE_PATH;
use hyper;
use hyper::header::{ContentEncoding, ContentType, Encoding};
use hyper::status::StatusCode;
use metric::Metric;
use protocols::{gzip, json, path};
use std::error;
use std::fmt;
use std::io;
use std::str::FromStr;
use url::Url;

/// Delivery errors. None of these are fatal to the agent.
#[derive(Debug)]
pub enum Error {
    /// The collector address does not form a valid URL.
    Url(String),
    /// The metric could not be encoded.
    Encode(String),
    /// The request could not be sent or the response not read.
    Http(String),
    /// The collector answered with something other than 200.
    Status(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Url(ref e) => write!(f, "bad collector address: {}", e),
            Error::Encode(ref e) => write!(f, "could not encode metric: {}", e),
            Error::Http(ref e) => write!(f, "request failed: {}", e),
            Error::Status(s) => write!(f, "collector answered {}", s),
        }
    }
}

impl error::Error for Error {}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Error {
        Error::Http(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Http(e.to_string())
    }
}

/// Sends one metric at a time to the collector.
pub trait Transport {
    /// Deliver `metric`. Anything but an accepted update is an error.
    fn send(&mut self, metric: &Metric) -> Result<(), Error>;
}

/// How samples are put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `POST /update` with a JSON body.
    Json,
    /// `POST /update/{type}/{id}/{value}` with an empty body.
    Path,
}

impl Default for Format {
    fn default() -> Format {
        Format::Json
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Format, String> {
        match s {
            "json" => Ok(Format::Json),
            "path" => Ok(Format::Path),
            other => Err(format!("unknown report format {:?}", other)),
        }
    }
}

/// Build the update URL for a collector address. Addresses without a
/// scheme are taken to be plain HTTP.
pub fn update_url(address: &str) -> Result<Url, Error> {
    let address = address.trim_end_matches('/');
    let raw = if address.contains("://") {
        format!("{}{}", address, UPDATE_PATH)
    } else {
        format!("http://{}{}", address, UPDATE_PATH)
    };
    Url::parse(&raw).map_err(|e| Error::Url(format!("{}: {}", raw, e)))
}

/// The hyper backed transport
pub struct HttpTransport {
    client: hyper::Client,
    update_url: Url,
    format: Format,
    compress: bool,
}

impl HttpTransport {
    /// Create a transport reporting to the collector at `address`.
    ///
    /// `compress` only affects the JSON format; path-encoded updates have
    /// no body to compress.
    pub fn new(address: &str, format: Format, compress: bool) -> Result<HttpTransport, Error> {
        Ok(HttpTransport {
            client: hyper::Client::new(),
            update_url: update_url(address)?,
            format: format,
            compress: compress,
        })
    }

    fn finish(mut response: hyper::client::Response) -> Result<(), Error> {
        // drain so the connection can be reused
        io::copy(&mut response, &mut io::sink())?;
        debug!("Response: {}", response.status);
        if response.status == StatusCode::Ok {
            Ok(())
        } else {
            Err(Error::Status(response.status.to_u16()))
        }
    }

    fn send_json(&mut self, metric: &Metric) -> Result<(), Error> {
        let payload = json::encode(metric).map_err(|e| Error::Encode(e.to_string()))?;
        let response = if self.compress {
            let compressed = gzip::compress(&payload)?;
            debug!(
                "Sending {} via compressed JSON, {} -> {} bytes",
                metric,
                payload.len(),
                compressed.len()
            );
            self.client
                .post(self.update_url.clone())
                .header(ContentType::json())
                .header(ContentEncoding(vec![Encoding::Gzip]))
                .body(&compressed[..])
                .send()?
        } else {
            debug!("Sending {} via JSON", metric);
            self.client
                .post(self.update_url.clone())
                .header(ContentType::json())
                .body(&payload[..])
                .send()?
        };
        HttpTransport::finish(response)
    }

    fn send_path(&mut self, metric: &Metric) -> Result<(), Error> {
        let url = path::encode_update(self.update_url.as_str(), metric);
        debug!("Sending {} to {}", metric, url);
        let response = self.client
            .post(url.as_str())
            .header(ContentType::plaintext())
            .body("")
            .send()?;
        HttpTransport::finish(response)
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, metric: &Metric) -> Result<(), Error> {
        match self.format {
            Format::Json => self.send_json(metric),
            Format::Path => self.send_path(metric),
        }
    }
}
