use std::borrow::Cow;
use std::io;

use crate::internal::utils::{escape_str, format_float};
use crate::internal::{render_family, write_rendered, write_series};
use crate::{EncodeError, Exemplar, MetricFamily, MetricType, MetricValue};

use super::OpenMetricsFormat;

/// Writes one family in the OpenMetrics format, returning the number of bytes written. The `# EOF` line that
/// ends a document is left to the caller (see [`write_eof`]).
///
/// A counter named `*_total` is described under its name without the suffix and sampled under the full name,
/// as OpenMetrics requires. Any other counter can't be written as an OpenMetrics counter, so it is described as
/// `unknown` and sampled under its own name. `unknown` samples can't carry exemplars, so such a counter is
/// rejected with [`EncodeError::InvalidMetric`] if any of its values has one.
pub fn write_openmetrics<W: io::Write>(
    sink: &mut W,
    family: &MetricFamily,
) -> Result<usize, EncodeError> {
    let rendered = render_family::<OpenMetricsFormat>(family)?;
    write_rendered(sink, rendered.as_bytes())
}

/// Terminates an OpenMetrics document.
pub fn write_eof<W: io::Write>(sink: &mut W) -> io::Result<usize> {
    const EOF: &[u8] = b"# EOF\n";
    sink.write_all(EOF)?;
    Ok(EOF.len())
}

fn is_counter_total(family: &MetricFamily) -> bool {
    family.family_type == MetricType::Counter && family.name.ends_with("_total")
}

// Anything can be quoted, so only exemplars on counters written as `unknown` are refused.
pub(super) fn check_family(family: &MetricFamily) -> Result<(), EncodeError> {
    if family.family_type != MetricType::Counter || is_counter_total(family) {
        return Ok(());
    }

    let has_exemplar = family.metrics.iter().any(|metric| match &metric.value {
        MetricValue::Counter(counter) => counter.exemplar.is_some(),
        _ => false,
    });
    if has_exemplar {
        return Err(EncodeError::InvalidMetric {
            family: family.name.clone(),
            reason: "exemplars are only written on counters named `*_total`".to_owned(),
        });
    }

    Ok(())
}

pub(super) fn metadata(family: &MetricFamily) -> (&str, &'static str) {
    match family.family_type {
        MetricType::Counter => match family.name.strip_suffix("_total") {
            Some(stripped) => (stripped, "counter"),
            None => (family.name.as_str(), "unknown"),
        },
        MetricType::Untyped => (family.name.as_str(), "unknown"),
        MetricType::Gauge => (family.name.as_str(), "gauge"),
        MetricType::Summary => (family.name.as_str(), "summary"),
        MetricType::Histogram => (family.name.as_str(), "histogram"),
    }
}

pub(super) fn escape_help(help: &str) -> Cow<'_, str> {
    escape_str(help, true)
}

pub(super) fn writes_exemplars(family: &MetricFamily) -> bool {
    match family.family_type {
        MetricType::Counter => is_counter_total(family),
        MetricType::Histogram => true,
        _ => false,
    }
}

/// OpenMetrics timestamps are seconds.
pub(super) fn write_timestamp(out: &mut String, timestamp_ms: i64) {
    out.push_str(&format_float(timestamp_ms as f64 / 1000.));
}

/// ` # {labels} value [timestamp]`
pub(super) fn write_exemplar(out: &mut String, exemplar: &Exemplar) {
    out.push_str(" # ");
    if exemplar.labels.is_empty() {
        out.push_str("{}");
    } else {
        write_series(out, "", &exemplar.labels, None);
    }
    out.push(' ');
    out.push_str(&format_float(exemplar.value));
    if let Some(timestamp) = exemplar.timestamp {
        out.push(' ');
        out.push_str(&format_float(timestamp));
    }
}
