mod encoder;
mod parsers;

#[cfg(test)]
mod tests;

use std::borrow::Cow;

use crate::internal::{classify_common, ExpositionFormat, Line, LineError, SampleKind};
use crate::{EncodeError, Exemplar, Format, MetricFamily, MetricType};

pub use encoder::{write_eof, write_openmetrics};
pub use parsers::parse_openmetrics;

#[derive(Debug)]
pub(crate) struct OpenMetricsFormat;

impl ExpositionFormat for OpenMetricsFormat {
    const FORMAT: Format = Format::OpenMetrics;
    const REQUIRES_TYPE: bool = true;
    const REQUIRES_EOF: bool = true;
    const REQUIRES_INF_BUCKET: bool = true;

    fn check_family(family: &MetricFamily) -> Result<(), EncodeError> {
        encoder::check_family(family)
    }

    fn metadata(family: &MetricFamily) -> (&str, &'static str) {
        encoder::metadata(family)
    }

    fn escape_help(help: &str) -> Cow<'_, str> {
        encoder::escape_help(help)
    }

    fn writes_unit() -> bool {
        true
    }

    fn write_timestamp(out: &mut String, timestamp_ms: i64) {
        encoder::write_timestamp(out, timestamp_ms)
    }

    fn writes_exemplars(family: &MetricFamily) -> bool {
        encoder::writes_exemplars(family)
    }

    fn write_exemplar(out: &mut String, exemplar: &Exemplar) {
        encoder::write_exemplar(out, exemplar)
    }

    fn parse_line(line: &str) -> Result<Line, LineError> {
        parsers::parse_line(line)
    }

    fn classify(
        family_type: MetricType,
        family_name: &str,
        sample_name: &str,
    ) -> Option<SampleKind> {
        match family_type {
            MetricType::Counter => {
                let total = sample_name
                    .strip_prefix(family_name)
                    .map_or(false, |suffix| suffix == "_total");
                if total || (family_name.ends_with("_total") && sample_name == family_name) {
                    Some(SampleKind::Total)
                } else {
                    None
                }
            }
            _ => classify_common(family_type, family_name, sample_name),
        }
    }

    fn family_name(
        family_type: MetricType,
        header_name: &str,
        sample_name: Option<&str>,
    ) -> String {
        match (family_type, sample_name) {
            (MetricType::Counter, Some(sample_name)) => sample_name.to_owned(),
            (MetricType::Counter, None) => format!("{}_total", header_name),
            _ => header_name.to_owned(),
        }
    }
}
