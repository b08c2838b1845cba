use std::io;

use crate::internal::{render_family, write_rendered};
use crate::internal::utils::is_valid_legacy_name;
use crate::{EncodeError, MetricFamily};

use super::PrometheusFormat;

/// Writes one family in the Prometheus text format, returning the number of bytes written.
///
/// Names are written verbatim, so counters keep whatever name they were given. Units and exemplars can't be
/// expressed in this format and are dropped.
pub fn write_prometheus<W: io::Write>(
    sink: &mut W,
    family: &MetricFamily,
) -> Result<usize, EncodeError> {
    let rendered = render_family::<PrometheusFormat>(family)?;
    write_rendered(sink, rendered.as_bytes())
}

/// The legacy format has no quoting, so every name has to fit the legacy grammar.
pub(super) fn check_family(family: &MetricFamily) -> Result<(), EncodeError> {
    let invalid = |reason: String| EncodeError::InvalidMetric {
        family: family.name.clone(),
        reason,
    };

    if !is_valid_legacy_name(&family.name) {
        return Err(invalid(format!("{:?} is not a valid metric name", family.name)));
    }

    for metric in family.metrics.iter() {
        if let Some(label) = metric.labels.iter().find(|l| !is_valid_legacy_name(&l.name)) {
            return Err(invalid(format!("{:?} is not a valid label name", label.name)));
        }
    }

    Ok(())
}
