use std::io;

use crate::internal::{render_family, write_rendered};
use crate::openmetrics::{write_eof, OpenMetricsFormat};
use crate::prometheus::PrometheusFormat;
use crate::{EncodeError, Format, MetricFamily, MetricsExposition};

/// Writes one family to `sink` in the given format, returning the number of bytes written. The family is
/// validated and rendered before anything is written, so an invalid family writes nothing. If the sink fails,
/// the error carries the bytes it took (see [`EncodeError::bytes_written`]).
pub fn encode<W: io::Write>(
    sink: &mut W,
    family: &MetricFamily,
    format: Format,
) -> Result<usize, EncodeError> {
    let rendered = render(family, format)?;
    write_rendered(sink, rendered.as_bytes())
}

/// Renders one family to a string.
pub fn render(family: &MetricFamily, format: Format) -> Result<String, EncodeError> {
    match format {
        Format::OpenMetrics => render_family::<OpenMetricsFormat>(family),
        Format::Prometheus => render_family::<PrometheusFormat>(family),
    }
}

impl MetricsExposition {
    /// Writes every family, followed by `# EOF` for OpenMetrics. All families are rendered before the first
    /// write, so an invalid family writes nothing. If the sink fails, [`EncodeError::bytes_written`] counts
    /// everything it took, earlier families included.
    pub fn encode<W: io::Write>(&self, sink: &mut W, format: Format) -> Result<usize, EncodeError> {
        let rendered = self
            .families
            .iter()
            .map(|family| render(family, format))
            .collect::<Result<Vec<_>, _>>()?;

        let mut written = 0;
        for family in rendered.iter() {
            written += write_rendered(sink, family.as_bytes()).map_err(|e| e.after(written))?;
        }

        if format == Format::OpenMetrics {
            written += write_eof(sink).map_err(|source| EncodeError::Io { written, source })?;
        }

        Ok(written)
    }
}
