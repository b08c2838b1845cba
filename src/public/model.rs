use std::fmt;

/// Seconds since the epoch, with a fractional part. Used for exemplar timestamps.
pub type Timestamp = f64;

/// A single label name/value pair. Label sets keep their insertion order, which is
/// also the order they are rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Label {
        Label {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An OpenMetrics Exemplar
/// https://github.com/OpenObservability/OpenMetrics/blob/main/specification/OpenMetrics.md#exemplars
/// Exemplars are references to data outside of the MetricSet. A common use case are IDs of program traces.
/// Exemplars MUST consist of a LabelSet and a value, and MAY have a timestamp. They MAY each be different from the
/// MetricPoints' LabelSet and timestamp.
/// Exemplars only exist in the OpenMetrics format; the Prometheus text format drops them.
#[derive(Debug, Clone)]
pub struct Exemplar {
    pub labels: Vec<Label>,
    pub value: f64,
    pub timestamp: Option<Timestamp>,
}

impl Exemplar {
    pub fn new(labels: Vec<Label>, value: f64, timestamp: Option<Timestamp>) -> Exemplar {
        Exemplar {
            labels,
            value,
            timestamp,
        }
    }
}

impl PartialEq for Exemplar {
    fn eq(&self, other: &Self) -> bool {
        same_elements(&self.labels, &other.labels)
            && same_float(self.value, other.value)
            && match (self.timestamp, other.timestamp) {
                (Some(a), Some(b)) => same_float(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// A Counter that only goes up
    /// Counters measure discrete events. Common examples are the number of HTTP requests received,
    /// CPU seconds spent, or bytes sent. A Counter MetricPoint MAY have an exemplar.
    Counter,

    /// A Gauge that can go up or down
    /// Gauges are current measurements, such as bytes of memory currently used or the number of items in a queue.
    Gauge,

    /// Summaries measure distributions of discrete events with precomputed quantiles, plus a _sum and _count.
    /// Quantiles MUST be between 0 and 1 inclusive. A Summary's LabelSet MUST NOT have a "quantile" label name.
    Summary,

    /// A Histogram that has a number of buckets that count events, and a _sum and _count
    /// Buckets MUST be cumulative, and a Histogram MUST have a bucket with an +Inf threshold (synthesized on
    /// encode if the producer left it out). A Histogram's LabelSet MUST NOT have an "le" label name.
    /// Bucket values MAY have exemplars.
    Histogram,

    /// Untyped (rendered as `unknown` in OpenMetrics) is for metrics whose type can't be determined.
    Untyped,
}

impl Default for MetricType {
    fn default() -> Self {
        MetricType::Untyped
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
            MetricType::Histogram => "histogram",
            MetricType::Untyped => "untyped",
        })
    }
}

#[derive(Debug, Clone)]
pub struct CounterValue {
    pub value: f64,
    pub exemplar: Option<Exemplar>,
}

impl PartialEq for CounterValue {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.value, other.value) && self.exemplar == other.exemplar
    }
}

#[derive(Debug, Clone)]
pub struct Quantile {
    pub quantile: f64,
    pub value: f64,
}

impl PartialEq for Quantile {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.quantile, other.quantile) && same_float(self.value, other.value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SummaryValue {
    pub sample_count: u64,
    pub sample_sum: f64,
    pub quantiles: Vec<Quantile>,
}

impl PartialEq for SummaryValue {
    fn eq(&self, other: &Self) -> bool {
        self.sample_count == other.sample_count
            && same_float(self.sample_sum, other.sample_sum)
            && same_elements(&self.quantiles, &other.quantiles)
    }
}

#[derive(Debug, Clone)]
pub struct HistogramBucket {
    pub upper_bound: f64,
    pub cumulative_count: u64,
    pub exemplar: Option<Exemplar>,
}

impl HistogramBucket {
    pub fn new(upper_bound: f64, cumulative_count: u64) -> HistogramBucket {
        HistogramBucket {
            upper_bound,
            cumulative_count,
            exemplar: None,
        }
    }
}

impl PartialEq for HistogramBucket {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.upper_bound, other.upper_bound)
            && self.cumulative_count == other.cumulative_count
            && self.exemplar == other.exemplar
    }
}

/// Buckets are ordered by ascending upper bound. The `+Inf` bucket may be left out, in which case the encoders
/// synthesize one holding `sample_count`. Equality treats a left out `+Inf` bucket the same as that
/// synthesized one.
#[derive(Debug, Clone, Default)]
pub struct HistogramValue {
    pub sample_count: u64,
    pub sample_sum: f64,
    pub buckets: Vec<HistogramBucket>,
}

impl HistogramValue {
    fn implicit_inf_bucket(&self) -> Option<HistogramBucket> {
        if self.buckets.iter().any(|b| b.upper_bound == f64::INFINITY) {
            None
        } else {
            Some(HistogramBucket::new(f64::INFINITY, self.sample_count))
        }
    }
}

impl PartialEq for HistogramValue {
    fn eq(&self, other: &Self) -> bool {
        let (inf, other_inf) = (self.implicit_inf_bucket(), other.implicit_inf_bucket());

        self.sample_count == other.sample_count
            && same_float(self.sample_sum, other.sample_sum)
            && self
                .buckets
                .iter()
                .chain(inf.iter())
                .eq(other.buckets.iter().chain(other_inf.iter()))
    }
}

/// The payload of a metric. Which variant is valid is decided by the type of the family the metric lives in.
#[derive(Debug, Clone)]
pub enum MetricValue {
    Counter(CounterValue),
    Gauge(f64),
    Untyped(f64),
    Summary(SummaryValue),
    Histogram(HistogramValue),
}

impl MetricValue {
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Untyped(_) => MetricType::Untyped,
            MetricValue::Summary(_) => MetricType::Summary,
            MetricValue::Histogram(_) => MetricType::Histogram,
        }
    }
}

impl PartialEq for MetricValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetricValue::Counter(a), MetricValue::Counter(b)) => a == b,
            (MetricValue::Gauge(a), MetricValue::Gauge(b)) => same_float(*a, *b),
            (MetricValue::Untyped(a), MetricValue::Untyped(b)) => same_float(*a, *b),
            (MetricValue::Summary(a), MetricValue::Summary(b)) => a == b,
            (MetricValue::Histogram(a), MetricValue::Histogram(b)) => a == b,
            _ => false,
        }
    }
}

/// One labelled observation inside a family. `timestamp_ms` is milliseconds since the epoch.
#[derive(Debug, Clone)]
pub struct Metric {
    pub labels: Vec<Label>,
    pub timestamp_ms: Option<i64>,
    pub value: MetricValue,
}

impl Metric {
    pub fn new(labels: Vec<Label>, timestamp_ms: Option<i64>, value: MetricValue) -> Metric {
        Metric {
            labels,
            timestamp_ms,
            value,
        }
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Self) -> bool {
        same_elements(&self.labels, &other.labels)
            && self.timestamp_ms == other.timestamp_ms
            && self.value == other.value
    }
}

/// A MetricFamily is a collection of metrics with the same type, name, and help
/// https://github.com/OpenObservability/OpenMetrics/blob/main/specification/OpenMetrics.md#metricfamily
/// An empty `help` or `unit` means the family has none, and no metadata line is written for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub unit: String,
    pub family_type: MetricType,
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, family_type: MetricType) -> MetricFamily {
        MetricFamily {
            name: name.into(),
            family_type,
            ..Default::default()
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> MetricFamily {
        self.help = help.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> MetricFamily {
        self.unit = unit.into();
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> MetricFamily {
        self.metrics.push(metric);
        self
    }
}

/// Exposition is the top level object of the codec: an ordered collection of metric families that makes up
/// one complete document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsExposition {
    pub families: Vec<MetricFamily>,
}

impl MetricsExposition {
    pub fn new() -> MetricsExposition {
        MetricsExposition {
            families: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }
}

// NaN is equal to NaN here, so that decoded families compare equal to the ones they were encoded from.
fn same_float(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

// Label sets and quantiles are compared regardless of order.
fn same_elements<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|item| b.contains(item))
}
