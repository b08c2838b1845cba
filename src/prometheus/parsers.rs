use pest::iterators::{Pair, Pairs};
use pest::Parser;

use crate::internal::utils::unescape_str;
use crate::internal::{Line, LineError, SampleLine};
use crate::{Format, Label, MetricType, MetricsExposition, ParseError};

#[derive(Parser)]
#[grammar = "prometheus/prometheus.pest"]
struct PrometheusParser;

/// Parses a complete document in the Prometheus text format. Comments and blank lines are skipped, and samples
/// that have no TYPE line are read as untyped.
pub fn parse_prometheus(exposition_bytes: &str) -> Result<MetricsExposition, ParseError> {
    crate::decoder::parse_str(exposition_bytes, Format::Prometheus)
}

pub(crate) fn parse_type(family_type: &str) -> Result<MetricType, String> {
    match family_type {
        "counter" => Ok(MetricType::Counter),
        "gauge" => Ok(MetricType::Gauge),
        "histogram" => Ok(MetricType::Histogram),
        "summary" => Ok(MetricType::Summary),
        "untyped" => Ok(MetricType::Untyped),
        _ => Err(format!("Invalid metric type: {}", family_type)),
    }
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>, LineError> {
    pairs
        .next()
        .ok_or_else(|| LineError::Invalid("Truncated line".to_owned()))
}

fn parse_labels(pair: Pair<Rule>) -> Result<Vec<Label>, LineError> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::label)
        .map(|label| {
            let mut inner = label.into_inner();
            let name = next_pair(&mut inner)?.as_str().to_owned();
            let value = unescape_str(next_pair(&mut inner)?.as_str(), true)
                .map_err(LineError::Invalid)?;
            Ok(Label { name, value })
        })
        .collect()
}

fn parse_sample(pair: Pair<Rule>) -> Result<SampleLine, LineError> {
    let mut descriptor = pair.into_inner().peekable();
    let name = match descriptor.next() {
        Some(name) => name.as_str().to_owned(),
        None => return Err(LineError::Invalid("Truncated line".to_owned())),
    };

    let mut labels = Vec::new();
    let mut value = None;
    let mut timestamp_ms = None;
    for pair in descriptor {
        match pair.as_rule() {
            Rule::labels => labels = parse_labels(pair)?,
            Rule::number => value = Some(pair.as_str().to_owned()),
            Rule::timestamp => {
                let timestamp = pair.as_str();
                timestamp_ms = Some(timestamp.parse().map_err(|_| {
                    LineError::Invalid(format!("Invalid timestamp: {}", timestamp))
                })?);
            }
            _ => {}
        }
    }

    let value = value.ok_or_else(|| LineError::Invalid("Missing sample value".to_owned()))?;
    Ok(SampleLine {
        name,
        labels,
        value,
        timestamp_ms,
        exemplar: None,
    })
}

pub(crate) fn parse_line(text: &str) -> Result<Line, LineError> {
    let mut line = PrometheusParser::parse(Rule::line, text)?;
    let statement = match next_pair(&mut line)?.into_inner().next() {
        Some(statement) => statement,
        None => return Ok(Line::Empty),
    };

    match statement.as_rule() {
        Rule::comment | Rule::EOI => Ok(Line::Empty),
        Rule::kw_help => {
            let mut descriptor = statement.into_inner();
            let name = next_pair(&mut descriptor)?.as_str().to_owned();
            let text = match descriptor.next() {
                Some(text) => unescape_str(text.as_str(), false).map_err(LineError::Invalid)?,
                None => String::new(),
            };
            Ok(Line::Help { name, text })
        }
        Rule::kw_type => {
            let mut descriptor = statement.into_inner();
            let name = next_pair(&mut descriptor)?.as_str().to_owned();
            let family_type =
                parse_type(next_pair(&mut descriptor)?.as_str()).map_err(LineError::Invalid)?;
            Ok(Line::Type { name, family_type })
        }
        Rule::metric => Ok(Line::Sample(parse_sample(statement)?)),
        rule => Err(LineError::Invalid(format!("Unexpected {:?}", rule))),
    }
}
