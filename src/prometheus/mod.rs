mod encoder;
mod parsers;


use std::borrow::Cow;

use crate::internal::utils::escape_str;
use crate::internal::{classify_common, ExpositionFormat, Line, LineError, SampleKind};
use crate::{EncodeError, Format, MetricFamily, MetricType};

pub use encoder::write_prometheus;
pub use parsers::parse_prometheus;

#[derive(Debug)]
pub(crate) struct PrometheusFormat;

impl ExpositionFormat for PrometheusFormat {
    const FORMAT: Format = Format::Prometheus;
    const REQUIRES_TYPE: bool = false;
    const REQUIRES_EOF: bool = false;
    const REQUIRES_INF_BUCKET: bool = false;

    fn check_family(family: &MetricFamily) -> Result<(), EncodeError> {
        encoder::check_family(family)
    }

    fn metadata(family: &MetricFamily) -> (&str, &'static str) {
        let keyword = match family.family_type {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
            MetricType::Histogram => "histogram",
            MetricType::Untyped => "untyped",
        };

        (family.name.as_str(), keyword)
    }

    // Double quotes are left alone in HELP text.
    fn escape_help(help: &str) -> Cow<'_, str> {
        escape_str(help, false)
    }

    fn writes_unit() -> bool {
        false
    }

    fn write_timestamp(out: &mut String, timestamp_ms: i64) {
        out.push_str(&timestamp_ms.to_string());
    }

    fn writes_exemplars(_family: &MetricFamily) -> bool {
        false
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
            MetricType::Counter if family_name == sample_name => Some(SampleKind::Total),
            MetricType::Counter => None,
            _ => classify_common(family_type, family_name, sample_name),
        }
    }

    fn family_name(
        _family_type: MetricType,
        header_name: &str,
        _sample_name: Option<&str>,
    ) -> String {
        header_name.to_owned()
    }
}
