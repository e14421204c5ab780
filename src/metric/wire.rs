//! The flat JSON shape of a metric.
//!
//! On the wire a metric is `{"id", "type", "delta"?, "value"?, "hash"?}`,
//! with the populated numeric field chosen by `type`. Absent optionals are
//! omitted when encoding.

use metric::{Error, Kind, Metric, Value};
use std::str::FromStr;

/// A metric as it travels in JSON bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMetric {
    /// The metric name.
    #[serde(default)]
    pub id: String,
    /// The type token, `counter` or `gauge`.
    #[serde(rename = "type", default)]
    pub mtype: String,
    /// Counter delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    /// Gauge reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Integrity hash, passed through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl WireMetric {
    /// A query for the stored aggregate of `(kind, id)`.
    pub fn query<S>(kind: Kind, id: S) -> WireMetric
    where
        S: Into<String>,
    {
        WireMetric {
            id: id.into(),
            mtype: kind.as_str().to_string(),
            ..Default::default()
        }
    }

    /// Validate the type token.
    pub fn kind(&self) -> Result<Kind, Error> {
        Kind::from_str(&self.mtype)
    }

    /// Convert into a typed metric.
    ///
    /// The field that does not belong to the kind is ignored. A missing
    /// field that does belong to it is an `InvalidValue`.
    pub fn into_metric(self) -> Result<Metric, Error> {
        let kind = self.kind()?;
        let value = match kind {
            Kind::Counter => self.delta.map(Value::Counter),
            Kind::Gauge => self.value.map(Value::Gauge),
        };
        match value {
            Some(value) => Ok(Metric {
                id: self.id,
                value: value,
                hash: self.hash,
            }),
            None => Err(Error::InvalidValue(kind, String::new())),
        }
    }

    /// Render the populated numeric field for display, or `n/a` when the
    /// field that matters for this type is absent.
    pub fn render_value(&self) -> String {
        let rendered = match self.kind() {
            Ok(Kind::Counter) => self.delta.map(|d| Value::Counter(d).to_string()),
            Ok(Kind::Gauge) => self.value.map(|v| Value::Gauge(v).to_string()),
            Err(_) => None,
        };
        rendered.unwrap_or_else(|| "n/a".to_string())
    }
}

impl<'a> From<&'a Metric> for WireMetric {
    fn from(metric: &'a Metric) -> WireMetric {
        WireMetric {
            id: metric.id.clone(),
            mtype: metric.kind().as_str().to_string(),
            delta: metric.delta(),
            value: metric.gauge_value(),
            hash: metric.hash.clone(),
        }
    }
}

impl From<Metric> for WireMetric {
    fn from(metric: Metric) -> WireMetric {
        WireMetric::from(&metric)
    }
}
