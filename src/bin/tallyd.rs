#![allow(unknown_lints)]

extern crate chan_signal;
extern crate tallyd;

#[macro_use]
extern crate log;

use chan_signal::Signal;
use std::env;
use std::process;
use std::sync::Arc;
use tallyd::constants::LOG_LEVEL_ENV;
use tallyd::http;
use tallyd::ingest::Endpoint;
use tallyd::service::Aggregator;
use tallyd::store::MemStore;
use tallyd::thread::Stoppable;
use tallyd::util;

fn main() {
    let args = match tallyd::config::parse_server_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let env_level = env::var(LOG_LEVEL_ENV).ok();
    let level = match util::log_level(args.verbose, env_level.as_ref().map(|s| s.as_str())) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    // must happen before any thread is spawned
    let signal = chan_signal::notify(&[Signal::INT, Signal::TERM]);

    if let Err(e) = util::setup_logging(level) {
        eprintln!("could not set up logging: {}", e);
        process::exit(1);
    }

    info!("tallyd - {}", args.version);

    let aggregator = Aggregator::new(Arc::new(MemStore::new()));
    let endpoint = Endpoint::new(aggregator);
    let server = match http::Server::new(&args.address, args.workers, endpoint) {
        Ok(server) => server,
        Err(e) => {
            error!("{}: {}", args.address, e);
            process::exit(1);
        }
    };
    match server.local_addr() {
        Some(addr) => info!("listening on {} with {} workers", addr, args.workers),
        None => info!("listening on {} with {} workers", args.address, args.workers),
    }

    if let Some(sig) = signal.recv() {
        info!("received {:?}, shutting down", sig);
    }
    server.shutdown();
    info!("tallyd stopped");
}
