use std::collections::HashSet;
use std::marker::PhantomData;

use crate::{
    CounterValue, Format, HistogramBucket, HistogramValue, Label, Metric, MetricFamily,
    MetricType, MetricValue, ParseError, Quantile, SummaryValue,
};

use super::utils::{find_duplicate_label, parse_count, parse_float, same_labelset};
use super::{ExpositionFormat, Line, SampleKind, SampleLine};

#[derive(Debug, Default)]
struct SummaryMarshal {
    sum: Option<f64>,
    count: Option<u64>,
    quantiles: Vec<Quantile>,
}

#[derive(Debug, Default)]
struct HistogramMarshal {
    sum: Option<f64>,
    count: Option<u64>,
    buckets: Vec<HistogramBucket>,
}

#[derive(Debug)]
enum MetricValueMarshal {
    Counter(CounterValue),
    Gauge(f64),
    Untyped(f64),
    Summary(SummaryMarshal),
    Histogram(HistogramMarshal),
}

#[derive(Debug)]
struct MetricMarshal {
    labels: Vec<Label>,
    timestamp_ms: Option<i64>,
    value: MetricValueMarshal,
}

impl MetricMarshal {
    fn new(
        labels: Vec<Label>,
        timestamp_ms: Option<i64>,
        value: MetricValueMarshal,
    ) -> MetricMarshal {
        MetricMarshal {
            labels,
            timestamp_ms,
            value,
        }
    }

    fn has_labels(&self, labels: &[Label]) -> bool {
        same_labelset(&self.labels, labels)
    }

    fn into_metric<F: ExpositionFormat>(self, line: usize) -> Result<Metric, ParseError> {
        let value = match self.value {
            MetricValueMarshal::Counter(counter) => MetricValue::Counter(counter),
            MetricValueMarshal::Gauge(value) => MetricValue::Gauge(value),
            MetricValueMarshal::Untyped(value) => MetricValue::Untyped(value),
            MetricValueMarshal::Summary(summary) => {
                let (sum, count) = sum_and_count(line, summary.sum, summary.count, 0)?;
                MetricValue::Summary(SummaryValue {
                    sample_count: count,
                    sample_sum: sum,
                    quantiles: summary.quantiles,
                })
            }
            MetricValueMarshal::Histogram(histogram) => {
                let inf_bucket = histogram
                    .buckets
                    .iter()
                    .find(|b| b.upper_bound == f64::INFINITY);

                if F::REQUIRES_INF_BUCKET && inf_bucket.is_none() {
                    return Err(ParseError::invalid(
                        line,
                        "Histograms must have a +Inf bucket",
                    ));
                }

                let default_count = inf_bucket.map(|b| b.cumulative_count).unwrap_or(0);
                let (sum, count) =
                    sum_and_count(line, histogram.sum, histogram.count, default_count)?;
                MetricValue::Histogram(HistogramValue {
                    sample_count: count,
                    sample_sum: sum,
                    buckets: histogram.buckets,
                })
            }
        };

        Ok(Metric::new(self.labels, self.timestamp_ms, value))
    }
}

fn sum_and_count(
    line: usize,
    sum: Option<f64>,
    count: Option<u64>,
    default_count: u64,
) -> Result<(f64, u64), ParseError> {
    match (sum, count) {
        (Some(sum), Some(count)) => Ok((sum, count)),
        (None, None) => Ok((0., default_count)),
        (Some(_), None) => Err(ParseError::invalid(
            line,
            "Count must be present if sum is present",
        )),
        (None, Some(_)) => Err(ParseError::invalid(
            line,
            "Sum must be present if count is present",
        )),
    }
}

enum Metadata {
    Help(String),
    Type(MetricType),
    Unit(String),
}

/// A family that is still being read.
#[derive(Debug)]
struct FamilyMarshal {
    name: String,
    family_type: Option<MetricType>,
    help: Option<String>,
    unit: Option<String>,
    metrics: Vec<MetricMarshal>,
    sample_name: Option<String>,
    has_samples: bool,
}

impl FamilyMarshal {
    fn empty(name: String) -> FamilyMarshal {
        FamilyMarshal {
            name,
            family_type: None,
            help: None,
            unit: None,
            metrics: Vec::new(),
            sample_name: None,
            has_samples: false,
        }
    }

    fn metric_type(&self) -> MetricType {
        self.family_type.unwrap_or_default()
    }

    fn try_add_metadata(&mut self, line: usize, metadata: Metadata) -> Result<(), ParseError> {
        match metadata {
            Metadata::Help(help) => {
                if self.help.is_some() {
                    return Err(ParseError::invalid(
                        line,
                        "Got two help lines in the same metric family",
                    ));
                }
                self.help = Some(help);
            }
            Metadata::Type(family_type) => {
                if self.family_type.is_some() {
                    return Err(ParseError::invalid(
                        line,
                        "Got two type lines in the same metric family",
                    ));
                }
                self.family_type = Some(family_type);
            }
            Metadata::Unit(unit) => {
                if self.unit.is_some() {
                    return Err(ParseError::invalid(
                        line,
                        "Got two unit lines in the same metric family",
                    ));
                }
                self.unit = Some(unit);
            }
        }

        Ok(())
    }

    fn get_metric_by_labelset_mut(&mut self, labels: &[Label]) -> Option<&mut MetricMarshal> {
        self.metrics.iter_mut().find(|m| m.has_labels(labels))
    }

    /// Finds the summary or histogram metric a sample belongs to, creating it on first sight.
    fn get_or_add_group(
        &mut self,
        line: usize,
        labels: Vec<Label>,
        timestamp_ms: Option<i64>,
    ) -> Result<&mut MetricMarshal, ParseError> {
        let index = match self.metrics.iter().position(|m| m.has_labels(&labels)) {
            Some(index) => {
                if self.metrics[index].timestamp_ms != timestamp_ms {
                    return Err(ParseError::invalid(
                        line,
                        "Samples of the same metric have different timestamps",
                    ));
                }
                index
            }
            None => {
                let value = match self.metric_type() {
                    MetricType::Summary => MetricValueMarshal::Summary(SummaryMarshal::default()),
                    _ => MetricValueMarshal::Histogram(HistogramMarshal::default()),
                };
                self.metrics.push(MetricMarshal::new(labels, timestamp_ms, value));
                self.metrics.len() - 1
            }
        };

        Ok(&mut self.metrics[index])
    }

    fn process_new_metric(
        &mut self,
        line: usize,
        kind: SampleKind,
        sample: SampleLine,
    ) -> Result<(), ParseError> {
        let metric_type = self.metric_type();
        self.has_samples = true;

        if sample.exemplar.is_some() && !matches!(kind, SampleKind::Total | SampleKind::Bucket) {
            return Err(ParseError::invalid(
                line,
                format!("Metric Type {} is not allowed exemplars", metric_type),
            ));
        }

        if let Some(name) = find_duplicate_label(&sample.labels) {
            return Err(ParseError::invalid(
                line,
                format!("Found label `{}` twice in the same labelset", name),
            ));
        }

        let SampleLine {
            name,
            labels,
            value,
            timestamp_ms,
            exemplar,
        } = sample;

        match kind {
            SampleKind::Value | SampleKind::Total => {
                let value = parse_value(line, &value)?;
                if self.get_metric_by_labelset_mut(&labels).is_some() {
                    return Err(ParseError::DuplicateMetric { line });
                }

                let value = match metric_type {
                    MetricType::Counter => {
                        self.sample_name.get_or_insert(name);
                        MetricValueMarshal::Counter(CounterValue { value, exemplar })
                    }
                    MetricType::Gauge => MetricValueMarshal::Gauge(value),
                    _ => MetricValueMarshal::Untyped(value),
                };
                self.metrics.push(MetricMarshal::new(labels, timestamp_ms, value));
            }
            SampleKind::Quantile => {
                let (labels, quantile) = take_label(line, labels, "quantile")?;
                let quantile = match parse_float(&quantile) {
                    Some(q) if (0. ..=1.).contains(&q) => q,
                    _ => {
                        return Err(ParseError::invalid(
                            line,
                            format!(
                                "Summary quantiles must be between 0 and 1 (got: {})",
                                quantile
                            ),
                        ))
                    }
                };
                let value = parse_value(line, &value)?;

                let metric = self.get_or_add_group(line, labels, timestamp_ms)?;
                if let MetricValueMarshal::Summary(summary) = &mut metric.value {
                    if summary.quantiles.iter().any(|q| q.quantile == quantile) {
                        return Err(ParseError::DuplicateMetric { line });
                    }
                    summary.quantiles.push(Quantile { quantile, value });
                }
            }
            SampleKind::Bucket => {
                let (labels, bound) = take_label(line, labels, "le")?;
                let upper_bound = match parse_float(&bound) {
                    Some(b) if !b.is_nan() => b,
                    _ => {
                        return Err(ParseError::invalid(
                            line,
                            format!("Invalid histogram bound: {}", bound),
                        ))
                    }
                };
                let cumulative_count = parse_integer(line, &value, "Histogram bucket counts")?;

                let metric = self.get_or_add_group(line, labels, timestamp_ms)?;
                if let MetricValueMarshal::Histogram(histogram) = &mut metric.value {
                    if let Some(last) = histogram.buckets.last() {
                        if upper_bound <= last.upper_bound {
                            return Err(ParseError::invalid(
                                line,
                                format!(
                                    "Histogram buckets must be in ascending order ({} after {})",
                                    bound, last.upper_bound
                                ),
                            ));
                        }
                        if cumulative_count < last.cumulative_count {
                            return Err(ParseError::invalid(line, "Histograms must be cumulative"));
                        }
                    }

                    histogram.buckets.push(HistogramBucket {
                        upper_bound,
                        cumulative_count,
                        exemplar,
                    });
                }
            }
            SampleKind::Sum => {
                let sum = parse_value(line, &value)?;
                let metric = self.get_or_add_group(line, labels, timestamp_ms)?;
                let slot = match &mut metric.value {
                    MetricValueMarshal::Summary(summary) => &mut summary.sum,
                    MetricValueMarshal::Histogram(histogram) => &mut histogram.sum,
                    _ => {
                        return Err(ParseError::invalid(
                            line,
                            format!("Unexpected sample {}", name),
                        ))
                    }
                };
                if slot.is_some() {
                    return Err(ParseError::DuplicateMetric { line });
                }
                *slot = Some(sum);
            }
            SampleKind::Count => {
                let count = parse_integer(line, &value, "Counts")?;
                let metric = self.get_or_add_group(line, labels, timestamp_ms)?;
                let slot = match &mut metric.value {
                    MetricValueMarshal::Summary(summary) => &mut summary.count,
                    MetricValueMarshal::Histogram(histogram) => &mut histogram.count,
                    _ => {
                        return Err(ParseError::invalid(
                            line,
                            format!("Unexpected sample {}", name),
                        ))
                    }
                };
                if slot.is_some() {
                    return Err(ParseError::DuplicateMetric { line });
                }
                *slot = Some(count);
            }
        }

        Ok(())
    }

    fn into_family<F: ExpositionFormat>(self, line: usize) -> Result<MetricFamily, ParseError> {
        let family_type = self.metric_type();
        let name = F::family_name(family_type, &self.name, self.sample_name.as_deref());
        let metrics = self
            .metrics
            .into_iter()
            .map(|m| m.into_metric::<F>(line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetricFamily {
            name,
            help: self.help.unwrap_or_default(),
            unit: self.unit.unwrap_or_default(),
            family_type,
            metrics,
        })
    }
}

fn parse_value(line: usize, value: &str) -> Result<f64, ParseError> {
    parse_float(value).ok_or_else(|| {
        ParseError::invalid(line, format!("Metric Value must be a number (got: {})", value))
    })
}

fn parse_integer(line: usize, value: &str, what: &str) -> Result<u64, ParseError> {
    parse_count(value).ok_or_else(|| {
        ParseError::invalid(
            line,
            format!("{} must be non-negative integers (got: {})", what, value),
        )
    })
}

/// Splits a mandatory label (`le`, `quantile`) off a label set.
fn take_label(
    line: usize,
    mut labels: Vec<Label>,
    name: &str,
) -> Result<(Vec<Label>, String), ParseError> {
    match labels.iter().position(|l| l.name == name) {
        Some(index) => {
            let label = labels.remove(index);
            Ok((labels, label.value))
        }
        None => Err(ParseError::invalid(
            line,
            format!("Missing mandatory label for metric: {}", name),
        )),
    }
}

/// Folds tokenized lines into metric families, handing each family out as soon as it is complete.
#[derive(Debug)]
pub struct ExpositionMarshal<F> {
    current: Option<FamilyMarshal>,
    finished: HashSet<String>,
    eof_line: Option<usize>,
    last_line: usize,
    format: PhantomData<F>,
}

impl<F: ExpositionFormat> ExpositionMarshal<F> {
    pub fn new() -> ExpositionMarshal<F> {
        ExpositionMarshal {
            current: None,
            finished: HashSet::new(),
            eof_line: None,
            last_line: 0,
            format: PhantomData,
        }
    }

    pub fn format(&self) -> Format {
        F::FORMAT
    }

    pub fn process_line(
        &mut self,
        line: usize,
        text: &str,
    ) -> Result<Option<MetricFamily>, ParseError> {
        self.last_line = line;
        if let Some(eof_line) = self.eof_line {
            return Err(ParseError::invalid(
                line,
                format!("Found text after the EOF token on line {}", eof_line),
            ));
        }

        match F::parse_line(text).map_err(|e| e.at(line))? {
            Line::Empty => Ok(None),
            Line::Eof => {
                self.eof_line = Some(line);
                self.finish_current(line)
            }
            Line::Help { name, text } => self.add_metadata(line, name, Metadata::Help(text)),
            Line::Type { name, family_type } => {
                self.add_metadata(line, name, Metadata::Type(family_type))
            }
            Line::Unit { name, unit } => self.add_metadata(line, name, Metadata::Unit(unit)),
            Line::Sample(sample) => self.add_sample(line, sample),
        }
    }

    /// Called once the input is exhausted. Hands out the last family, if any.
    pub fn finish(&mut self) -> Result<Option<MetricFamily>, ParseError> {
        if F::REQUIRES_EOF && self.eof_line.is_none() {
            return Err(ParseError::MissingEof {
                line: self.last_line,
            });
        }

        self.finish_current(self.last_line)
    }

    fn add_metadata(
        &mut self,
        line: usize,
        name: String,
        metadata: Metadata,
    ) -> Result<Option<MetricFamily>, ParseError> {
        if let Some(family) = self.current.as_mut() {
            if family.name == name {
                if family.has_samples {
                    return Err(ParseError::invalid(
                        line,
                        format!("Metric Descriptor for {} after its samples", name),
                    ));
                }
                family.try_add_metadata(line, metadata)?;
                return Ok(None);
            }
        }

        let finished = self.finish_current(line)?;
        let family = self.start_family(line, name)?;
        family.try_add_metadata(line, metadata)?;
        Ok(finished)
    }

    fn add_sample(
        &mut self,
        line: usize,
        sample: SampleLine,
    ) -> Result<Option<MetricFamily>, ParseError> {
        if let Some(family) = self.current.as_mut() {
            if family.family_type.is_some() || !F::REQUIRES_TYPE {
                if let Some(kind) = F::classify(family.metric_type(), &family.name, &sample.name) {
                    family.process_new_metric(line, kind, sample)?;
                    return Ok(None);
                }
            }
        }

        if F::REQUIRES_TYPE {
            let message = match &self.current {
                Some(family) if family.family_type.is_none() => {
                    format!("Metric family {} has no TYPE line", family.name)
                }
                Some(family) => format!(
                    "Invalid Name in metric family: {} doesn't belong to the {} family {}",
                    sample.name,
                    family.metric_type(),
                    family.name
                ),
                None => format!("Sample {} appears before any TYPE line", sample.name),
            };
            return Err(ParseError::invalid(line, message));
        }

        // Samples without metadata start an untyped family of their own.
        let finished = self.finish_current(line)?;
        let family = self.start_family(line, sample.name.clone())?;
        family.process_new_metric(line, SampleKind::Value, sample)?;
        Ok(finished)
    }

    fn start_family(
        &mut self,
        line: usize,
        name: String,
    ) -> Result<&mut FamilyMarshal, ParseError> {
        if self.finished.contains(&name) {
            return Err(ParseError::invalid(
                line,
                format!(
                    "Found a metric family called {}, after that family was finalised",
                    name
                ),
            ));
        }

        Ok(self.current.insert(FamilyMarshal::empty(name)))
    }

    fn finish_current(&mut self, line: usize) -> Result<Option<MetricFamily>, ParseError> {
        match self.current.take() {
            Some(family) => {
                self.finished.insert(family.name.clone());
                family.into_family::<F>(line).map(Some)
            }
            None => Ok(None),
        }
    }
}
