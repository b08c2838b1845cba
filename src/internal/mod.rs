mod marshals;
mod render;
mod traits;
pub mod utils;


use crate::{Exemplar, Label, MetricType, ParseError};

pub use marshals::ExpositionMarshal;
pub use render::{render_family, write_rendered, write_series};
pub use traits::{classify_common, ExpositionFormat};

/// One tokenized line of an exposition.
#[derive(Debug)]
pub enum Line {
    Help { name: String, text: String },
    Type { name: String, family_type: MetricType },
    Unit { name: String, unit: String },
    Sample(SampleLine),
    Eof,
    /// Blank lines and comments, which only the Prometheus format has.
    Empty,
}

#[derive(Debug)]
pub struct SampleLine {
    pub name: String,
    pub labels: Vec<Label>,
    /// Kept as text, since counts have to be read as integers and everything else as floats.
    pub value: String,
    pub timestamp_ms: Option<i64>,
    pub exemplar: Option<Exemplar>,
}

/// What a sample line contributes to its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// The whole value of a gauge or untyped metric
    Value,
    /// The whole value of a counter
    Total,
    Quantile,
    Bucket,
    Sum,
    Count,
}

#[derive(Debug)]
pub enum LineError {
    Syntax { column: usize, message: String },
    Invalid(String),
}

impl LineError {
    pub fn at(self, line: usize) -> ParseError {
        match self {
            LineError::Syntax { column, message } => ParseError::Syntax {
                line,
                column,
                message,
            },
            LineError::Invalid(message) => ParseError::InvalidMetric { line, message },
        }
    }
}

impl<R: pest::RuleType> From<pest::error::Error<R>> for LineError {
    fn from(err: pest::error::Error<R>) -> Self {
        let column = match err.line_col {
            pest::error::LineColLocation::Pos((_, column)) => column,
            pest::error::LineColLocation::Span((_, column), _) => column,
        };

        LineError::Syntax {
            column,
            message: err.variant.message().into_owned(),
        }
    }
}
