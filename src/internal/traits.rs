use std::borrow::Cow;

use crate::{EncodeError, Exemplar, Format, MetricFamily, MetricType};

use super::{Line, LineError, SampleKind};

/// The places where the Prometheus text format and OpenMetrics disagree. Expanding a family into sample lines,
/// and folding sample lines back into families, is shared and driven through this trait.
pub trait ExpositionFormat {
    const FORMAT: Format;

    /// Samples are only accepted once their family has a TYPE line.
    const REQUIRES_TYPE: bool;

    /// A document is only complete once it has an EOF line.
    const REQUIRES_EOF: bool;

    /// Every histogram has to carry a `+Inf` bucket.
    const REQUIRES_INF_BUCKET: bool;

    /// Rejects a family that can't be written in this format, such as names it can't express.
    fn check_family(family: &MetricFamily) -> Result<(), EncodeError>;

    /// The name written on the HELP/TYPE/UNIT lines, and the type keyword.
    fn metadata(family: &MetricFamily) -> (&str, &'static str);

    fn escape_help(help: &str) -> Cow<'_, str>;

    fn writes_unit() -> bool;

    fn write_timestamp(out: &mut String, timestamp_ms: i64);

    /// Whether exemplars attached to this family's samples can be written.
    fn writes_exemplars(family: &MetricFamily) -> bool;

    fn write_exemplar(_out: &mut String, _exemplar: &Exemplar) {}

    /// Tokenizes one line of text (without its newline).
    fn parse_line(line: &str) -> Result<Line, LineError>;

    /// Works out which part of a family a sample line fills in, if the sample belongs to the family at all.
    fn classify(
        family_type: MetricType,
        family_name: &str,
        sample_name: &str,
    ) -> Option<SampleKind>;

    /// The name a decoded family ends up with. `sample_name` is the name its counter samples were written with.
    fn family_name(family_type: MetricType, header_name: &str, sample_name: Option<&str>) -> String;
}

/// The sample suffixes that both formats agree on. Counters are the exception and are left to the formats.
pub fn classify_common(
    family_type: MetricType,
    family_name: &str,
    sample_name: &str,
) -> Option<SampleKind> {
    let suffix = sample_name.strip_prefix(family_name)?;
    match (family_type, suffix) {
        (MetricType::Gauge, "") | (MetricType::Untyped, "") => Some(SampleKind::Value),
        (MetricType::Summary, "") => Some(SampleKind::Quantile),
        (MetricType::Histogram, "_bucket") => Some(SampleKind::Bucket),
        (MetricType::Summary, "_sum") | (MetricType::Histogram, "_sum") => Some(SampleKind::Sum),
        (MetricType::Summary, "_count") | (MetricType::Histogram, "_count") => {
            Some(SampleKind::Count)
        }
        _ => None,
    }
}
