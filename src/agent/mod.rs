//! The reporting agent.
//!
//! An agent polls a `Collector` every poll interval and, once every
//! `report_interval / poll_interval` polls, hands the most recent sample to a
//! `Transport`. Samples taken between reports are superseded; only the last
//! one is ever sent.

pub mod collector;
pub mod transport;

pub use self::collector::{Collector, GaugeValue, RuntimeCollector};
pub use self::transport::{Format, HttpTransport, Transport};

use metric::Metric;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thread::Poll;

lazy_static! {
    /// Total metrics accepted by the collector
    pub static ref REPORT_SUCCESS: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total metrics the collector did not accept
    pub static ref REPORT_ERROR: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

fn millis(d: Duration) -> u64 {
    d.as_secs()
        .saturating_mul(1_000)
        .saturating_add(u64::from(d.subsec_millis()))
}

/// Poll, sample and report.
pub struct Agent<C, T>
where
    C: Collector,
    T: Transport,
{
    collector: C,
    transport: T,
    poll_interval: Duration,
    report_interval: Duration,
}

impl<C, T> Agent<C, T>
where
    C: Collector,
    T: Transport,
{
    /// An agent sampling `collector` and reporting through `transport`.
    pub fn new(
        collector: C,
        transport: T,
        poll_interval: Duration,
        report_interval: Duration,
    ) -> Agent<C, T> {
        Agent {
            collector: collector,
            transport: transport,
            poll_interval: poll_interval,
            report_interval: report_interval,
        }
    }

    /// Number of polls per report. Never less than one.
    pub fn ticks_per_report(&self) -> u64 {
        let poll = millis(self.poll_interval);
        if poll == 0 {
            return 1;
        }
        (millis(self.report_interval) / poll).max(1)
    }

    /// The sampling source.
    pub fn collector(&self) -> &C {
        &self.collector
    }

    /// The delivery channel.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run until `poll` is shut down.
    ///
    /// Shutdown is checked before every poll. A cycle that is interrupted
    /// before completing sends nothing.
    pub fn run(&mut self, poll: &Poll) {
        let ticks = self.ticks_per_report();
        info!(
            "agent started: collector={} poll_interval={:?} report_interval={:?} ticks={}",
            self.collector.name(),
            self.poll_interval,
            self.report_interval,
            ticks
        );
        loop {
            let mut last = None;
            for _ in 0..ticks {
                if poll.is_shutdown() {
                    info!("agent stopped");
                    return;
                }
                last = Some(self.collector.collect());
                poll.sleep(self.poll_interval);
            }
            if let Some(sample) = last {
                self.report(&sample);
            }
        }
    }

    /// Send every metric of `sample`, returning how many were accepted.
    /// Failures are logged and counted, never propagated.
    pub fn report(&mut self, sample: &[Metric]) -> usize {
        let mut sent = 0;
        for metric in sample {
            match self.transport.send(metric) {
                Ok(()) => {
                    sent += 1;
                    REPORT_SUCCESS.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    REPORT_ERROR.fetch_add(1, Ordering::Relaxed);
                    error!("failed to report {}: {}", metric, e);
                }
            }
        }
        debug!(
            "reported {}/{} metrics (total success={} error={})",
            sent,
            sample.len(),
            REPORT_SUCCESS.load(Ordering::Relaxed),
            REPORT_ERROR.load(Ordering::Relaxed)
        );
        sent
    }
}
