use std::cmp::Ordering;
use std::io::{self, ErrorKind};

use crate::{EncodeError, Exemplar, Label, Metric, MetricFamily, MetricValue};

use super::utils::{
    escape_str, find_duplicate_label, format_float, is_valid_legacy_name, render_label_values,
    same_labelset, write_name,
};
use super::ExpositionFormat;

/// Writes a rendered family, counting the bytes the sink accepts even if it fails part way.
pub fn write_rendered<W: io::Write>(sink: &mut W, rendered: &[u8]) -> Result<usize, EncodeError> {
    let mut written = 0;
    while written < rendered.len() {
        match sink.write(&rendered[written..]) {
            Ok(0) => {
                return Err(EncodeError::Io {
                    written,
                    source: ErrorKind::WriteZero.into(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(source) => return Err(EncodeError::Io { written, source }),
        }
    }

    Ok(written)
}

/// Validates a family and renders it completely. Nothing is returned unless the whole family could be rendered.
pub fn render_family<F: ExpositionFormat>(family: &MetricFamily) -> Result<String, EncodeError> {
    if family.name.is_empty() {
        return Err(EncodeError::NoName);
    }

    F::check_family(family)?;
    for (i, metric) in family.metrics.iter().enumerate() {
        validate_metric(family, metric)?;

        // Points of the same series may repeat, but only at distinct timestamps.
        let repeated = family.metrics[..i].iter().any(|m| {
            m.timestamp_ms == metric.timestamp_ms && same_labelset(&m.labels, &metric.labels)
        });
        if repeated {
            let labels = match render_label_values(&metric.labels) {
                labels if labels.is_empty() => String::from("{}"),
                labels => labels,
            };
            return Err(EncodeError::InvalidMetric {
                family: family.name.clone(),
                reason: format!("found two metrics with the same labelset {}", labels),
            });
        }
    }

    let mut out = String::with_capacity(64 + family.metrics.len() * 64);
    let (metadata_name, type_keyword) = F::metadata(family);

    if !family.help.is_empty() {
        out.push_str("# HELP ");
        write_name(&mut out, metadata_name);
        out.push(' ');
        out.push_str(&F::escape_help(&family.help));
        out.push('\n');
    }

    out.push_str("# TYPE ");
    write_name(&mut out, metadata_name);
    out.push(' ');
    out.push_str(type_keyword);
    out.push('\n');

    if F::writes_unit() && !family.unit.is_empty() {
        out.push_str("# UNIT ");
        write_name(&mut out, metadata_name);
        out.push(' ');
        out.push_str(&escape_str(&family.unit, true));
        out.push('\n');
    }

    let exemplars = F::writes_exemplars(family);
    let name = family.name.as_str();
    for metric in family.metrics.iter() {
        match &metric.value {
            MetricValue::Counter(counter) => {
                let exemplar = counter.exemplar.as_ref().filter(|_| exemplars);
                let value = format_float(counter.value);
                write_sample::<F>(&mut out, name, "", metric, None, &value, exemplar);
            }
            MetricValue::Gauge(value) | MetricValue::Untyped(value) => {
                write_sample::<F>(&mut out, name, "", metric, None, &format_float(*value), None);
            }
            MetricValue::Summary(summary) => {
                let mut quantiles: Vec<_> = summary.quantiles.iter().collect();
                quantiles.sort_by(|a, b| {
                    a.quantile
                        .partial_cmp(&b.quantile)
                        .unwrap_or(Ordering::Equal)
                });

                for quantile in quantiles {
                    write_sample::<F>(
                        &mut out,
                        name,
                        "",
                        metric,
                        Some(("quantile", quantile.quantile)),
                        &format_float(quantile.value),
                        None,
                    );
                }

                let sum = format_float(summary.sample_sum);
                write_sample::<F>(&mut out, name, "_sum", metric, None, &sum, None);
                let count = summary.sample_count.to_string();
                write_sample::<F>(&mut out, name, "_count", metric, None, &count, None);
            }
            MetricValue::Histogram(histogram) => {
                let mut inf_seen = false;
                for bucket in histogram.buckets.iter() {
                    if bucket.upper_bound == f64::INFINITY {
                        inf_seen = true;
                    }

                    let exemplar = bucket.exemplar.as_ref().filter(|_| exemplars);
                    write_sample::<F>(
                        &mut out,
                        name,
                        "_bucket",
                        metric,
                        Some(("le", bucket.upper_bound)),
                        &bucket.cumulative_count.to_string(),
                        exemplar,
                    );
                }

                if !inf_seen {
                    write_sample::<F>(
                        &mut out,
                        name,
                        "_bucket",
                        metric,
                        Some(("le", f64::INFINITY)),
                        &histogram.sample_count.to_string(),
                        None,
                    );
                }

                let sum = format_float(histogram.sample_sum);
                write_sample::<F>(&mut out, name, "_sum", metric, None, &sum, None);
                let count = histogram.sample_count.to_string();
                write_sample::<F>(&mut out, name, "_count", metric, None, &count, None);
            }
        }
    }

    Ok(out)
}

fn validate_metric(family: &MetricFamily, metric: &Metric) -> Result<(), EncodeError> {
    let invalid = |reason: String| EncodeError::InvalidMetric {
        family: family.name.clone(),
        reason,
    };

    if metric.value.metric_type() != family.family_type {
        return Err(EncodeError::TypeMismatch {
            expected: family.family_type.to_string(),
            family: family.name.clone(),
            labels: render_label_values(&metric.labels),
        });
    }

    if let Some(name) = find_duplicate_label(&metric.labels) {
        return Err(invalid(format!(
            "label `{}` appears twice in the same labelset",
            name
        )));
    }

    let reserved = match &metric.value {
        MetricValue::Summary(_) => Some("quantile"),
        MetricValue::Histogram(_) => Some("le"),
        _ => None,
    };
    if let Some(reserved) = reserved {
        if metric.labels.iter().any(|l| l.name == reserved) {
            return Err(invalid(format!(
                "{} metrics can't have a `{}` label",
                family.family_type, reserved
            )));
        }
    }

    match &metric.value {
        MetricValue::Counter(counter) => {
            if let Some(exemplar) = &counter.exemplar {
                validate_exemplar(exemplar).map_err(invalid)?;
            }
        }
        MetricValue::Summary(summary) => {
            for quantile in summary.quantiles.iter() {
                if !(0. ..=1.).contains(&quantile.quantile) {
                    return Err(invalid(format!(
                        "Summary quantiles must be between 0 and 1 (got: {})",
                        quantile.quantile
                    )));
                }
            }
        }
        MetricValue::Histogram(histogram) => {
            let mut last: Option<(f64, u64)> = None;
            for bucket in histogram.buckets.iter() {
                if bucket.upper_bound.is_nan() {
                    return Err(invalid("Histogram bucket bounds can't be NaN".to_owned()));
                }

                if let Some((bound, count)) = last {
                    if bucket.upper_bound <= bound {
                        return Err(invalid(format!(
                            "Histogram buckets must be in ascending order ({} after {})",
                            bucket.upper_bound, bound
                        )));
                    }
                    if bucket.cumulative_count < count {
                        return Err(invalid("Histograms must be cumulative".to_owned()));
                    }
                }

                if let Some(exemplar) = &bucket.exemplar {
                    validate_exemplar(exemplar).map_err(invalid)?;
                }

                last = Some((bucket.upper_bound, bucket.cumulative_count));
            }

            // The synthesized `+Inf` bucket holds `sample_count`, so it has to keep the buckets cumulative.
            if let Some((bound, count)) = last {
                if bound != f64::INFINITY && histogram.sample_count < count {
                    return Err(invalid("Histograms must be cumulative".to_owned()));
                }
            }
        }
        MetricValue::Gauge(_) | MetricValue::Untyped(_) => {}
    }

    Ok(())
}

fn validate_exemplar(exemplar: &Exemplar) -> Result<(), String> {
    match find_duplicate_label(&exemplar.labels) {
        Some(name) => Err(format!(
            "exemplar label `{}` appears twice in the same labelset",
            name
        )),
        None => Ok(()),
    }
}

fn write_sample<F: ExpositionFormat>(
    out: &mut String,
    name: &str,
    suffix: &str,
    metric: &Metric,
    extra_label: Option<(&str, f64)>,
    value: &str,
    exemplar: Option<&Exemplar>,
) {
    if suffix.is_empty() {
        write_series(out, name, &metric.labels, extra_label);
    } else {
        write_series(out, &format!("{}{}", name, suffix), &metric.labels, extra_label);
    }

    out.push(' ');
    out.push_str(value);

    if let Some(timestamp_ms) = metric.timestamp_ms {
        out.push(' ');
        F::write_timestamp(out, timestamp_ms);
    }

    if let Some(exemplar) = exemplar {
        F::write_exemplar(out, exemplar);
    }

    out.push('\n');
}

/// Writes `name{labels}`. A name that doesn't fit the legacy grammar moves inside the braces as a quoted string
/// (`{"name.with.dots",label="value"}`), and an empty name writes only the label set.
pub fn write_series(
    out: &mut String,
    name: &str,
    labels: &[Label],
    extra_label: Option<(&str, f64)>,
) {
    let mut separator = '{';
    let mut name_inside_braces = false;

    if !name.is_empty() {
        if !is_valid_legacy_name(name) {
            name_inside_braces = true;
            out.push(separator);
            separator = ',';
        }
        write_name(out, name);
    }

    if labels.is_empty() && extra_label.is_none() {
        if name_inside_braces {
            out.push('}');
        }
        return;
    }

    for label in labels.iter() {
        out.push(separator);
        write_name(out, &label.name);
        out.push_str("=\"");
        out.push_str(&escape_str(&label.value, true));
        out.push('"');
        separator = ',';
    }

    if let Some((label_name, bound)) = extra_label {
        out.push(separator);
        out.push_str(label_name);
        out.push_str("=\"");
        out.push_str(&format_float(bound));
        out.push('"');
    }

    out.push('}');
}
