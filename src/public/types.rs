use std::fmt;

/// The two text encodings the codec speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// The legacy line-oriented Prometheus text format (version 0.0.4)
    Prometheus,
    /// OpenMetrics 1.0, with quoted names, exemplars and a mandatory `# EOF`
    OpenMetrics,
}

impl Format {
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Prometheus => "text/plain; version=0.0.4; charset=utf-8",
            Format::OpenMetrics => "application/openmetrics-text; version=1.0.0; charset=utf-8",
        }
    }

    /// Picks the format a content type names, ignoring its parameters.
    pub fn from_content_type(content_type: &str) -> Option<Format> {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        if media_type.eq_ignore_ascii_case("application/openmetrics-text") {
            Some(Format::OpenMetrics)
        } else if media_type.eq_ignore_ascii_case("text/plain") {
            Some(Format::Prometheus)
        } else {
            None
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Prometheus => f.write_str("prometheus"),
            Format::OpenMetrics => f.write_str("openmetrics"),
        }
    }
}
