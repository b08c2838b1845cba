use pest::iterators::{Pair, Pairs};
use pest::Parser;

use crate::internal::utils::{parse_float, unescape_str};
use crate::internal::{Line, LineError, SampleLine};
use crate::{Exemplar, Format, Label, MetricType, MetricsExposition, ParseError};

#[derive(Parser)]
#[grammar = "openmetrics/openmetrics.pest"]
struct OpenMetricsParser;

/// Parses a complete OpenMetrics document, which has to end with `# EOF`.
pub fn parse_openmetrics(exposition_bytes: &str) -> Result<MetricsExposition, ParseError> {
    crate::decoder::parse_str(exposition_bytes, Format::OpenMetrics)
}

pub(crate) fn parse_type(family_type: &str) -> Result<MetricType, String> {
    match family_type {
        "counter" => Ok(MetricType::Counter),
        "gauge" => Ok(MetricType::Gauge),
        "histogram" => Ok(MetricType::Histogram),
        "summary" => Ok(MetricType::Summary),
        "unknown" => Ok(MetricType::Untyped),
        "gaugehistogram" | "stateset" | "info" => {
            Err(format!("Unsupported metric type: {}", family_type))
        }
        _ => Err(format!("Invalid metric type: {}", family_type)),
    }
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>, LineError> {
    pairs
        .next()
        .ok_or_else(|| LineError::Invalid("Truncated line".to_owned()))
}

fn parse_name(pair: Pair<Rule>) -> Result<String, LineError> {
    match pair.as_rule() {
        Rule::metricname => Ok(pair.as_str().to_owned()),
        Rule::quoted_name => {
            let escaped = next_pair(&mut pair.into_inner())?;
            unescape_str(escaped.as_str(), true).map_err(LineError::Invalid)
        }
        rule => Err(LineError::Invalid(format!("Expected a name, got {:?}", rule))),
    }
}

fn parse_label(pair: Pair<Rule>) -> Result<Label, LineError> {
    let mut inner = pair.into_inner();
    let name = parse_name(next_pair(&mut inner)?)?;
    let value = unescape_str(next_pair(&mut inner)?.as_str(), true).map_err(LineError::Invalid)?;

    Ok(Label { name, value })
}

fn parse_labels(pairs: Pairs<Rule>) -> Result<Vec<Label>, LineError> {
    pairs
        .filter(|p| p.as_rule() == Rule::label)
        .map(parse_label)
        .collect()
}

fn parse_seconds(timestamp: &str) -> Result<f64, LineError> {
    match parse_float(timestamp) {
        Some(seconds) if seconds.is_finite() => Ok(seconds),
        _ => Err(LineError::Invalid(format!(
            "Timestamps must be finite numbers (got: {})",
            timestamp
        ))),
    }
}

fn parse_exemplar(pair: Pair<Rule>) -> Result<Exemplar, LineError> {
    let mut inner = pair.into_inner();
    let labels = parse_labels(next_pair(&mut inner)?.into_inner())?;

    let value = next_pair(&mut inner)?.as_str();
    let value = parse_float(value).ok_or_else(|| {
        LineError::Invalid(format!("Exemplar value must be a number (got: {})", value))
    })?;

    let timestamp = match inner.next() {
        Some(timestamp) => Some(parse_seconds(timestamp.as_str())?),
        None => None,
    };

    Ok(Exemplar::new(labels, value, timestamp))
}

fn parse_sample(pair: Pair<Rule>) -> Result<SampleLine, LineError> {
    let mut descriptor = pair.into_inner().peekable();

    let head = descriptor
        .next()
        .ok_or_else(|| LineError::Invalid("Truncated line".to_owned()))?;
    let (name, labels) = match head.as_rule() {
        Rule::quoted_series => {
            let mut inner = head.into_inner();
            let name = parse_name(next_pair(&mut inner)?)?;
            (name, parse_labels(inner)?)
        }
        _ => {
            let name = parse_name(head)?;
            let labels = match descriptor.peek().map(|p| p.as_rule()) {
                Some(Rule::labels) => match descriptor.next() {
                    Some(labels) => parse_labels(labels.into_inner())?,
                    None => Vec::new(),
                },
                _ => Vec::new(),
            };
            (name, labels)
        }
    };

    let value = descriptor
        .next()
        .ok_or_else(|| LineError::Invalid("Missing sample value".to_owned()))?
        .as_str()
        .to_owned();

    let mut timestamp_ms = None;
    let mut exemplar = None;
    for pair in descriptor {
        match pair.as_rule() {
            Rule::timestamp => {
                let seconds = parse_seconds(pair.as_str())?;
                timestamp_ms = Some((seconds * 1000.).round() as i64);
            }
            Rule::exemplar => exemplar = Some(parse_exemplar(pair)?),
            _ => {}
        }
    }

    Ok(SampleLine {
        name,
        labels,
        value,
        timestamp_ms,
        exemplar,
    })
}

pub(crate) fn parse_line(text: &str) -> Result<Line, LineError> {
    let mut line = OpenMetricsParser::parse(Rule::line, text)?;
    let statement = next_pair(&mut next_pair(&mut line)?.into_inner())?;

    match statement.as_rule() {
        Rule::kw_eof => Ok(Line::Eof),
        Rule::kw_help => {
            let mut descriptor = statement.into_inner();
            let name = parse_name(next_pair(&mut descriptor)?)?;
            let text = match descriptor.next() {
                Some(text) => unescape_str(text.as_str(), true).map_err(LineError::Invalid)?,
                None => String::new(),
            };
            Ok(Line::Help { name, text })
        }
        Rule::kw_type => {
            let mut descriptor = statement.into_inner();
            let name = parse_name(next_pair(&mut descriptor)?)?;
            let family_type =
                parse_type(next_pair(&mut descriptor)?.as_str()).map_err(LineError::Invalid)?;
            Ok(Line::Type { name, family_type })
        }
        Rule::kw_unit => {
            let mut descriptor = statement.into_inner();
            let name = parse_name(next_pair(&mut descriptor)?)?;
            let unit = match descriptor.next() {
                Some(unit) => unescape_str(unit.as_str(), true).map_err(LineError::Invalid)?,
                None => String::new(),
            };
            Ok(Line::Unit { name, unit })
        }
        Rule::sample => Ok(Line::Sample(parse_sample(statement)?)),
        rule => Err(LineError::Invalid(format!("Unexpected {:?}", rule))),
    }
}
