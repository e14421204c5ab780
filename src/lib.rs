//! tallyd is a small metrics pipeline. An agent periodically samples process
//! statistics and reports them over HTTP to a collector, which aggregates
//! them in memory and serves them back out.
//!
//! Two kinds of telemetry are understood:
//!
//!  * counters, whose reported deltas are summed on ingestion
//!  * gauges, whose reported values replace whatever was stored before
//!
//! Metrics travel either path-encoded (`/update/{type}/{id}/{value}`) or as
//! JSON bodies, optionally gzip compressed in both directions.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate fern;
extern crate flate2;
extern crate hyper;
extern crate libc;
extern crate rand;
extern crate serde;
extern crate serde_json;
extern crate tiny_http;
extern crate toml;
extern crate url;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

pub mod agent;
pub mod config;
pub mod constants;
pub mod http;
pub mod ingest;
pub mod metric;
pub mod protocols;
pub mod service;
pub mod store;
pub mod thread;
pub mod util;
