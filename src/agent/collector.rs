//! Sampling sources for the agent.

use libc;
use metric::Metric;
use rand::{self, Rng};
use std::mem;

/// A source of metric samples
///
/// `collect` is called once per poll tick. Each call returns a complete,
/// fresh sample set.
pub trait Collector {
    /// A short name for logging.
    fn name(&self) -> &str;
    /// Take one sample.
    fn collect(&mut self) -> Vec<Metric>;
}

/// Conversion of a raw source reading into a gauge reading.
///
/// Implemented once per source type so that every conversion is spelled
/// out rather than discovered at runtime.
pub trait GaugeValue {
    /// The reading as a gauge value.
    fn as_gauge(&self) -> f64;
}

impl GaugeValue for f64 {
    fn as_gauge(&self) -> f64 {
        *self
    }
}

impl GaugeValue for f32 {
    fn as_gauge(&self) -> f64 {
        f64::from(*self)
    }
}

impl GaugeValue for u64 {
    fn as_gauge(&self) -> f64 {
        *self as f64
    }
}

impl GaugeValue for i64 {
    fn as_gauge(&self) -> f64 {
        *self as f64
    }
}

impl GaugeValue for u32 {
    fn as_gauge(&self) -> f64 {
        f64::from(*self)
    }
}

impl GaugeValue for i32 {
    fn as_gauge(&self) -> f64 {
        f64::from(*self)
    }
}

/// CPU time as fractional seconds.
impl GaugeValue for libc::timeval {
    fn as_gauge(&self) -> f64 {
        self.tv_sec as f64 + (self.tv_usec as f64 / 1_000_000.0)
    }
}

fn gauge<S, V>(id: S, raw: V) -> Metric
where
    S: Into<String>,
    V: GaugeValue,
{
    Metric::gauge(id, raw.as_gauge())
}

/// Samples resource usage of the current process.
///
/// Besides the resource gauges every sample carries `PollCount`, a counter
/// with delta 1, and `RandomValue`, a gauge with a fresh pseudo-random
/// value in `[0, 1)`.
#[derive(Debug, Default)]
pub struct RuntimeCollector {
    polls: u64,
}

impl RuntimeCollector {
    /// A collector that has not polled yet.
    pub fn new() -> RuntimeCollector {
        RuntimeCollector::default()
    }

    /// Total calls to `collect` so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    fn rusage() -> Option<libc::rusage> {
        let mut usage: libc::rusage = unsafe { mem::zeroed() };
        let res = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
        if res == 0 {
            Some(usage)
        } else {
            None
        }
    }
}

impl Collector for RuntimeCollector {
    fn name(&self) -> &str {
        "runtime"
    }

    fn collect(&mut self) -> Vec<Metric> {
        self.polls += 1;
        let mut metrics = Vec::with_capacity(13);
        match RuntimeCollector::rusage() {
            Some(usage) => {
                metrics.push(gauge("MaxRSS", usage.ru_maxrss));
                metrics.push(gauge("MinorFaults", usage.ru_minflt));
                metrics.push(gauge("MajorFaults", usage.ru_majflt));
                metrics.push(gauge("BlockInputs", usage.ru_inblock));
                metrics.push(gauge("BlockOutputs", usage.ru_oublock));
                metrics.push(gauge("VoluntaryContextSwitches", usage.ru_nvcsw));
                metrics.push(gauge("InvoluntaryContextSwitches", usage.ru_nivcsw));
                metrics.push(gauge("UserCPUSeconds", usage.ru_utime));
                metrics.push(gauge("SystemCPUSeconds", usage.ru_stime));
            }
            None => warn!("getrusage failed, skipping resource gauges"),
        }
        metrics.push(Metric::counter("PollCount", 1));
        metrics.push(Metric::gauge("RandomValue", rand::thread_rng().gen::<f64>()));
        trace!("{} collector produced {} metrics", self.name(), metrics.len());
        metrics
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use metric::{Kind, Value};

    #[test]
    fn conversion_table() {
        assert_eq!(1.5, 1.5f64.as_gauge());
        assert_eq!(3.0, 3u64.as_gauge());
        assert_eq!(-3.0, (-3i64).as_gauge());
        assert_eq!(7.0, 7u32.as_gauge());
        assert_eq!(-7.0, (-7i32).as_gauge());
        let tv = libc::timeval {
            tv_sec: 2,
            tv_usec: 500_000,
        };
        assert_eq!(2.5, tv.as_gauge());
    }

    #[test]
    fn always_present_metrics() {
        let mut collector = RuntimeCollector::new();
        let first = collector.collect();
        let second = collector.collect();
        assert_eq!(2, collector.polls());

        for sample in &[&first, &second] {
            let poll_count: Vec<&Metric> =
                sample.iter().filter(|m| m.id == "PollCount").collect();
            assert_eq!(1, poll_count.len());
            assert_eq!(Value::Counter(1), poll_count[0].value);

            let random: Vec<&Metric> = sample.iter().filter(|m| m.id == "RandomValue").collect();
            assert_eq!(1, random.len());
            assert_eq!(Kind::Gauge, random[0].kind());
            let v = random[0].gauge_value().unwrap();
            assert!(v >= 0.0 && v < 1.0);
        }
    }

    #[test]
    fn resource_gauges_present() {
        let mut collector = RuntimeCollector::new();
        let sample = collector.collect();
        for id in &["MaxRSS", "UserCPUSeconds", "SystemCPUSeconds"] {
            let m = sample.iter().find(|m| m.id == *id).expect("missing gauge");
            assert_eq!(Kind::Gauge, m.kind());
        }
    }
}
