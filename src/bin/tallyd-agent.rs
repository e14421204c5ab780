#![allow(unknown_lints)]

extern crate chan_signal;
extern crate tallyd;

#[macro_use]
extern crate log;

use chan_signal::Signal;
use std::env;
use std::process;
use tallyd::agent::{Agent, HttpTransport, RuntimeCollector};
use tallyd::constants::LOG_LEVEL_ENV;
use tallyd::thread::{self, Stoppable};
use tallyd::util;

fn main() {
    let args = match tallyd::config::parse_agent_args() {
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

    info!("tallyd-agent - {}", args.version);

    let transport = match HttpTransport::new(&args.address, args.format, args.compress) {
        Ok(transport) => transport,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    info!(
        "reporting to {} as {:?} (compress={})",
        args.address, args.format, args.compress
    );

    let mut agent = Agent::new(
        RuntimeCollector::new(),
        transport,
        args.poll_interval(),
        args.report_interval(),
    );
    let worker = thread::spawn(move |poll| agent.run(&poll));

    if let Some(sig) = signal.recv() {
        info!("received {:?}, shutting down", sig);
    }
    worker.shutdown();
    info!("tallyd-agent stopped");
}
