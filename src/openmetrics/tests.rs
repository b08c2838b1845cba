use std::{fs, path::PathBuf};

use serde::Deserialize;

use super::{parse_openmetrics, write_eof, write_openmetrics};
use crate::{
    render, CounterValue, EncodeError, Exemplar, Format, HistogramBucket, HistogramValue, Label,
    Metric, MetricFamily, MetricType, MetricValue, MetricsExposition, ParseError, Quantile,
    SummaryValue,
};

#[derive(Deserialize, Debug)]
struct TestMeta {
    #[serde(alias = "type")]
    exposition_format: String,
    file: String,
    #[serde(alias = "shouldParse")]
    should_parse: bool,
}

fn read_child_file(parent: &PathBuf, filename: &str) -> String {
    let mut child_path = PathBuf::new();
    child_path.push(parent);
    child_path.push(filename);

    assert!(child_path.exists());
    assert!(child_path.is_file());

    let child_str = fs::read_to_string(child_path);
    assert!(child_str.is_ok());

    child_str.unwrap()
}

fn labels(pairs: &[(&str, &str)]) -> Vec<Label> {
    pairs.iter().map(|(name, value)| Label::new(*name, *value)).collect()
}

fn counter(value: f64) -> MetricValue {
    MetricValue::Counter(CounterValue {
        value,
        exemplar: None,
    })
}

fn assert_encodes(family: &MetricFamily, expected: &str) {
    let mut out = Vec::new();
    let written = write_openmetrics(&mut out, family).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(written, expected.len());
}

fn latency_histogram(with_inf: bool) -> MetricFamily {
    let mut buckets = vec![
        HistogramBucket::new(100., 123),
        HistogramBucket::new(120., 412),
        HistogramBucket::new(144., 592),
        HistogramBucket::new(172.8, 1524),
    ];
    if with_inf {
        buckets.push(HistogramBucket::new(f64::INFINITY, 2693));
    }

    MetricFamily::new("request_duration_microseconds", MetricType::Histogram)
        .with_help("The response latency.")
        .with_metric(Metric::new(
            vec![],
            None,
            MetricValue::Histogram(HistogramValue {
                sample_count: 2693,
                sample_sum: 1756047.3,
                buckets,
            }),
        ))
}

const LATENCY_HISTOGRAM: &str = r#"# HELP request_duration_microseconds The response latency.
# TYPE request_duration_microseconds histogram
request_duration_microseconds_bucket{le="100.0"} 123
request_duration_microseconds_bucket{le="120.0"} 412
request_duration_microseconds_bucket{le="144.0"} 592
request_duration_microseconds_bucket{le="172.8"} 1524
request_duration_microseconds_bucket{le="+Inf"} 2693
request_duration_microseconds_sum 1.7560473e+06
request_duration_microseconds_count 2693
"#;

fn summary() -> MetricFamily {
    let quantiles = |values: [f64; 3]| {
        [0.5, 0.9, 0.99]
            .iter()
            .zip(values.iter())
            .map(|(q, v)| Quantile {
                quantile: *q,
                value: *v,
            })
            .collect()
    };

    MetricFamily::new("summary_name", MetricType::Summary)
        .with_help("summary docstring")
        .with_metric(Metric::new(
            vec![],
            None,
            MetricValue::Summary(SummaryValue {
                sample_count: 42,
                sample_sum: -3.4567,
                quantiles: quantiles([-1.23, 0.2342354, 0.]),
            }),
        ))
        .with_metric(Metric::new(
            labels(&[("name_1", "value 1"), ("name_2", "value 2")]),
            None,
            MetricValue::Summary(SummaryValue {
                sample_count: 4711,
                sample_sum: 2010.1971,
                quantiles: quantiles([1., 2., 3.]),
            }),
        ))
}

#[test]
fn test_counter_without_total_suffix() {
    let family = MetricFamily::new("name", MetricType::Counter)
        .with_help("two-line\n doc  str\\ing")
        .with_metric(Metric::new(
            labels(&[("labelname", "val1"), ("basename", "basevalue")]),
            None,
            counter(42.),
        ))
        .with_metric(Metric::new(
            labels(&[("labelname", "val2"), ("basename", "basevalue")]),
            Some(1234567890),
            counter(0.23),
        ));

    assert_encodes(
        &family,
        r#"# HELP name two-line\n doc  str\\ing
# TYPE name unknown
name{labelname="val1",basename="basevalue"} 42.0
name{labelname="val2",basename="basevalue"} 0.23 1.23456789e+06
"#,
    );
}

#[test]
fn test_dots_in_name() {
    let family = MetricFamily::new("name.with.dots", MetricType::Counter)
        .with_help("boring help")
        .with_metric(Metric::new(
            labels(&[("labelname", "val1"), ("basename", "basevalue")]),
            None,
            counter(42.),
        ))
        .with_metric(Metric::new(
            labels(&[("labelname", "val2"), ("basename", "basevalue")]),
            Some(1234567890),
            counter(0.23),
        ));

    assert_encodes(
        &family,
        r#"# HELP "name.with.dots" boring help
# TYPE "name.with.dots" unknown
{"name.with.dots",labelname="val1",basename="basevalue"} 42.0
{"name.with.dots",labelname="val2",basename="basevalue"} 0.23 1.23456789e+06
"#,
    );
}

#[test]
fn test_dots_in_name_without_labels() {
    let family = MetricFamily::new("name.with.dots", MetricType::Counter)
        .with_help("boring help")
        .with_metric(Metric::new(vec![], None, counter(42.)))
        .with_metric(Metric::new(vec![], Some(1234567890), counter(0.23)));

    assert_encodes(
        &family,
        r#"# HELP "name.with.dots" boring help
# TYPE "name.with.dots" unknown
{"name.with.dots"} 42.0
{"name.with.dots"} 0.23 1.23456789e+06
"#,
    );
}

#[test]
fn test_gauge_escaping() {
    let family = MetricFamily::new("gauge_name", MetricType::Gauge)
        .with_help("gauge\ndoc\nstr\"ing")
        .with_metric(Metric::new(
            labels(&[
                ("name_1", "val with\nnew line"),
                ("name_2", "val with \\backslash and \"quotes\""),
            ]),
            None,
            MetricValue::Gauge(f64::INFINITY),
        ))
        .with_metric(Metric::new(
            labels(&[("name_1", "Björn"), ("name_2", "佖佥")]),
            None,
            MetricValue::Gauge(3.14e42),
        ));

    assert_encodes(
        &family,
        r#"# HELP gauge_name gauge\ndoc\nstr\"ing
# TYPE gauge_name gauge
gauge_name{name_1="val with\nnew line",name_2="val with \\backslash and \"quotes\""} +Inf
gauge_name{name_1="Björn",name_2="佖佥"} 3.14e+42
"#,
    );
}

#[test]
fn test_gauge_quoted_label_names() {
    let family = MetricFamily::new("gauge.name\"", MetricType::Gauge)
        .with_help("gauge\ndoc\nstr\"ing")
        .with_metric(Metric::new(
            labels(&[
                ("name.1", "val with\nnew line"),
                ("name*2", "val with \\backslash and \"quotes\""),
            ]),
            None,
            MetricValue::Gauge(f64::INFINITY),
        ))
        .with_metric(Metric::new(
            labels(&[("name.1", "Björn"), ("name*2", "佖佥")]),
            None,
            MetricValue::Gauge(3.14e42),
        ));

    assert_encodes(
        &family,
        r#"# HELP "gauge.name\"" gauge\ndoc\nstr\"ing
# TYPE "gauge.name\"" gauge
{"gauge.name\"","name.1"="val with\nnew line","name*2"="val with \\backslash and \"quotes\""} +Inf
{"gauge.name\"","name.1"="Björn","name*2"="佖佥"} 3.14e+42
"#,
    );
}

#[test]
fn test_untyped_without_help() {
    let family = MetricFamily::new("unknown_name", MetricType::Untyped)
        .with_metric(Metric::new(vec![], None, MetricValue::Untyped(f64::NEG_INFINITY)))
        .with_metric(Metric::new(
            labels(&[("name_1", "value 1")]),
            None,
            MetricValue::Untyped(-1.23e-45),
        ));

    assert_encodes(
        &family,
        r#"# TYPE unknown_name unknown
unknown_name -Inf
unknown_name{name_1="value 1"} -1.23e-45
"#,
    );
}

#[test]
fn test_summary() {
    assert_encodes(
        &summary(),
        r#"# HELP summary_name summary docstring
# TYPE summary_name summary
summary_name{quantile="0.5"} -1.23
summary_name{quantile="0.9"} 0.2342354
summary_name{quantile="0.99"} 0.0
summary_name_sum -3.4567
summary_name_count 42
summary_name{name_1="value 1",name_2="value 2",quantile="0.5"} 1.0
summary_name{name_1="value 1",name_2="value 2",quantile="0.9"} 2.0
summary_name{name_1="value 1",name_2="value 2",quantile="0.99"} 3.0
summary_name_sum{name_1="value 1",name_2="value 2"} 2010.1971
summary_name_count{name_1="value 1",name_2="value 2"} 4711
"#,
    );
}

#[test]
fn test_summary_quantiles_are_sorted() {
    let family = MetricFamily::new("rpc_seconds", MetricType::Summary).with_metric(Metric::new(
        vec![],
        Some(1500),
        MetricValue::Summary(SummaryValue {
            sample_count: 3,
            sample_sum: 1.5,
            quantiles: vec![
                Quantile {
                    quantile: 0.99,
                    value: 0.9,
                },
                Quantile {
                    quantile: 0.5,
                    value: 0.2,
                },
            ],
        }),
    ));

    assert_encodes(
        &family,
        r#"# TYPE rpc_seconds summary
rpc_seconds{quantile="0.5"} 0.2 1.5
rpc_seconds{quantile="0.99"} 0.9 1.5
rpc_seconds_sum 1.5 1.5
rpc_seconds_count 3 1.5
"#,
    );
}

#[test]
fn test_histogram() {
    assert_encodes(&latency_histogram(true), LATENCY_HISTOGRAM);
}

#[test]
fn test_histogram_without_inf_bucket() {
    assert_encodes(&latency_histogram(false), LATENCY_HISTOGRAM);
}

#[test]
fn test_histogram_exemplars() {
    let mut family = latency_histogram(false);
    if let MetricValue::Histogram(histogram) = &mut family.metrics[0].value {
        histogram.buckets[1].exemplar = Some(Exemplar::new(
            labels(&[("foo", "bar")]),
            119.9,
            Some(12345.6),
        ));
        histogram.buckets[2].exemplar = Some(Exemplar::new(
            labels(&[("foo", "baz"), ("dings", "bums")]),
            140.14,
            None,
        ));
    }

    assert_encodes(
        &family,
        r#"# HELP request_duration_microseconds The response latency.
# TYPE request_duration_microseconds histogram
request_duration_microseconds_bucket{le="100.0"} 123
request_duration_microseconds_bucket{le="120.0"} 412 # {foo="bar"} 119.9 12345.6
request_duration_microseconds_bucket{le="144.0"} 592 # {foo="baz",dings="bums"} 140.14
request_duration_microseconds_bucket{le="172.8"} 1524
request_duration_microseconds_bucket{le="+Inf"} 2693
request_duration_microseconds_sum 1.7560473e+06
request_duration_microseconds_count 2693
"#,
    );
}

#[test]
fn test_simple_counter() {
    let family = MetricFamily::new("foos_total", MetricType::Counter)
        .with_help("Number of foos.")
        .with_metric(Metric::new(vec![], None, counter(42.)));

    assert_encodes(
        &family,
        "# HELP foos Number of foos.\n# TYPE foos counter\nfoos_total 42.0\n",
    );
}

#[test]
fn test_counter_exemplars() {
    let family = MetricFamily::new("foos_total", MetricType::Counter)
        .with_unit("requests")
        .with_metric(Metric::new(
            vec![],
            None,
            MetricValue::Counter(CounterValue {
                value: 17.,
                exemplar: Some(Exemplar::new(vec![], 1., Some(1520879607.789))),
            }),
        ));

    assert_encodes(
        &family,
        "# TYPE foos counter\n# UNIT foos requests\nfoos_total 17.0 # {} 1.0 1.520879607789e+09\n",
    );

    // Without the suffix the counter is written as `unknown`, which can't carry an exemplar.
    let mut unsuffixed = family.clone();
    unsuffixed.name = String::from("foos");
    let mut out = Vec::new();
    match write_openmetrics(&mut out, &unsuffixed) {
        Err(EncodeError::InvalidMetric { family, reason }) => {
            assert_eq!(family, "foos");
            assert!(reason.contains("_total"), "{}", reason);
        }
        other => panic!("expected an invalid metric, got {:?}", other),
    }
    assert!(out.is_empty());

    if let MetricValue::Counter(value) = &mut unsuffixed.metrics[0].value {
        value.exemplar = None;
    }
    unsuffixed.unit = String::new();
    assert_encodes(&unsuffixed, "# TYPE foos unknown\nfoos 17.0\n");
}

#[test]
fn test_no_metrics() {
    let family = MetricFamily::new("name_total", MetricType::Counter).with_help("doc string");
    assert_encodes(&family, "# HELP name doc string\n# TYPE name counter\n");
}

#[test]
fn test_eof() {
    let mut out = Vec::new();
    assert_eq!(write_eof(&mut out).unwrap(), 6);
    assert_eq!(out, b"# EOF\n");
}

#[test]
fn test_encode_exposition() {
    let exposition = MetricsExposition {
        families: vec![
            MetricFamily::new("a_total", MetricType::Counter)
                .with_metric(Metric::new(vec![], None, counter(1.))),
            MetricFamily::new("b", MetricType::Gauge)
                .with_metric(Metric::new(vec![], Some(2500), MetricValue::Gauge(-2.))),
        ],
    };

    let mut out = Vec::new();
    let written = exposition.encode(&mut out, Format::OpenMetrics).unwrap();
    let expected = "# TYPE a counter\na_total 1.0\n# TYPE b gauge\nb -2.0 2.5\n# EOF\n";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(written, expected.len());

    let mut out = Vec::new();
    exposition.encode(&mut out, Format::Prometheus).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "# TYPE a_total counter\na_total 1.0\n# TYPE b gauge\nb -2.0 2500\n"
    );

    assert_eq!(
        render(&exposition.families[1], Format::OpenMetrics).unwrap(),
        "# TYPE b gauge\nb -2.0 2.5\n"
    );
}

// Accepts `limit` bytes, then fails.
struct Choke {
    accepted: Vec<u8>,
    limit: usize,
}

impl std::io::Write for Choke {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let room = self.limit - self.accepted.len();
        if room == 0 {
            return Err(std::io::ErrorKind::BrokenPipe.into());
        }

        let n = room.min(buf.len());
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_failing_sink_reports_bytes_written() {
    let exposition = MetricsExposition {
        families: vec![
            MetricFamily::new("a_total", MetricType::Counter)
                .with_metric(Metric::new(vec![], None, counter(1.))),
            MetricFamily::new("b", MetricType::Gauge)
                .with_metric(Metric::new(vec![], None, MetricValue::Gauge(2.))),
        ],
    };

    // "# TYPE a counter\na_total 1.0\n" is 29 bytes, the rest is cut off inside the second family.
    let mut sink = Choke {
        accepted: Vec::new(),
        limit: 35,
    };
    match exposition.encode(&mut sink, Format::OpenMetrics) {
        Err(err @ EncodeError::Io { .. }) => assert_eq!(err.bytes_written(), 35),
        other => panic!("expected an io error, got {:?}", other),
    }
    assert_eq!(sink.accepted, b"# TYPE a counter\na_total 1.0\n# TYPE");

    let mut sink = Choke {
        accepted: Vec::new(),
        limit: 10,
    };
    let err = write_openmetrics(&mut sink, &exposition.families[0]).unwrap_err();
    assert_eq!(err.bytes_written(), 10);

    // Every family is checked before the first write.
    let mut invalid = exposition.clone();
    invalid.families.push(MetricFamily::new("", MetricType::Gauge));
    let mut out = Vec::new();
    let err = invalid.encode(&mut out, Format::OpenMetrics).unwrap_err();
    assert!(matches!(err, EncodeError::NoName));
    assert_eq!(err.bytes_written(), 0);
    assert!(out.is_empty());
}

#[test]
fn test_encode_errors() {
    let mut out = Vec::new();

    let nameless = MetricFamily::new("", MetricType::Untyped)
        .with_help("doc string")
        .with_metric(Metric::new(vec![], None, MetricValue::Untyped(f64::NEG_INFINITY)));
    let err = write_openmetrics(&mut out, &nameless).unwrap_err();
    assert!(matches!(err, EncodeError::NoName));
    assert!(err.to_string().starts_with("MetricFamily has no name"));

    let mismatched = MetricFamily::new("name", MetricType::Counter)
        .with_help("doc string")
        .with_metric(Metric::new(vec![], None, MetricValue::Untyped(f64::NEG_INFINITY)));
    let err = write_openmetrics(&mut out, &mismatched).unwrap_err();
    assert!(err.to_string().starts_with("expected counter in metric"), "{}", err);

    let duplicate_labels = MetricFamily::new("g", MetricType::Gauge).with_metric(Metric::new(
        labels(&[("a", "1"), ("a", "2")]),
        None,
        MetricValue::Gauge(1.),
    ));
    assert!(matches!(
        write_openmetrics(&mut out, &duplicate_labels),
        Err(EncodeError::InvalidMetric { .. })
    ));

    let mut reserved = latency_histogram(true);
    reserved.metrics[0].labels = labels(&[("le", "1")]);
    assert!(matches!(
        write_openmetrics(&mut out, &reserved),
        Err(EncodeError::InvalidMetric { .. })
    ));

    let mut descending = latency_histogram(true);
    if let MetricValue::Histogram(histogram) = &mut descending.metrics[0].value {
        histogram.buckets.swap(0, 1);
    }
    assert!(matches!(
        write_openmetrics(&mut out, &descending),
        Err(EncodeError::InvalidMetric { .. })
    ));

    // The synthesized +Inf bucket would hold fewer observations than the last bucket.
    let short_count = MetricFamily::new("h", MetricType::Histogram).with_metric(Metric::new(
        vec![],
        None,
        MetricValue::Histogram(HistogramValue {
            sample_count: 5,
            sample_sum: 1.,
            buckets: vec![HistogramBucket::new(1., 10)],
        }),
    ));
    match write_openmetrics(&mut out, &short_count) {
        Err(EncodeError::InvalidMetric { reason, .. }) => {
            assert_eq!(reason, "Histograms must be cumulative")
        }
        other => panic!("expected an invalid metric, got {:?}", other),
    }

    let repeated = MetricFamily::new("g", MetricType::Gauge)
        .with_metric(Metric::new(vec![], None, MetricValue::Gauge(1.)))
        .with_metric(Metric::new(vec![], None, MetricValue::Gauge(2.)));
    match write_openmetrics(&mut out, &repeated) {
        Err(EncodeError::InvalidMetric { reason, .. }) => {
            assert_eq!(reason, "found two metrics with the same labelset {}")
        }
        other => panic!("expected an invalid metric, got {:?}", other),
    }

    let reordered = MetricFamily::new("g", MetricType::Gauge)
        .with_metric(Metric::new(
            labels(&[("a", "1"), ("b", "2")]),
            None,
            MetricValue::Gauge(1.),
        ))
        .with_metric(Metric::new(
            labels(&[("b", "2"), ("a", "1")]),
            None,
            MetricValue::Gauge(2.),
        ));
    assert!(matches!(
        write_openmetrics(&mut out, &reordered),
        Err(EncodeError::InvalidMetric { .. })
    ));

    // Nothing is written for a family that fails validation.
    assert!(out.is_empty());
}

#[test]
fn test_encoder_output_decodes() {
    let families = vec![
        MetricFamily::new("h", MetricType::Histogram).with_metric(Metric::new(
            vec![],
            None,
            MetricValue::Histogram(HistogramValue {
                sample_count: 10,
                sample_sum: 1.,
                buckets: vec![HistogramBucket::new(1., 10)],
            }),
        )),
        MetricFamily::new("g", MetricType::Gauge)
            .with_metric(Metric::new(labels(&[("a", "1")]), None, MetricValue::Gauge(1.)))
            .with_metric(Metric::new(labels(&[("a", "2")]), None, MetricValue::Gauge(2.))),
    ];

    for family in families {
        let mut out = Vec::new();
        write_openmetrics(&mut out, &family).unwrap();
        write_eof(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(parse_openmetrics(&text).is_ok(), "{}", text);
    }
}

#[test]
fn test_parse_counter() {
    let exposition = parse_openmetrics(
        r#"# TYPE foo counter
# HELP foo Number of foos.
foo_total{route="/"} 17.0 1520879607.789 # {id="counter-test"} 5
# EOF
"#,
    )
    .unwrap();

    assert_eq!(exposition.families.len(), 1);
    let family = &exposition.families[0];
    assert_eq!(family.name, "foo_total");
    assert_eq!(family.help, "Number of foos.");
    assert_eq!(family.family_type, MetricType::Counter);

    let metric = &family.metrics[0];
    assert_eq!(metric.labels, labels(&[("route", "/")]));
    assert_eq!(metric.timestamp_ms, Some(1520879607789));
    assert_eq!(
        metric.value,
        MetricValue::Counter(CounterValue {
            value: 17.,
            exemplar: Some(Exemplar::new(labels(&[("id", "counter-test")]), 5., None)),
        })
    );
}

#[test]
fn test_parse_histogram_sum_and_count_are_optional() {
    let exposition = parse_openmetrics(
        r#"# TYPE h histogram
h_bucket{le="1.0"} 2
h_bucket{le="+Inf"} 3
# EOF"#,
    )
    .unwrap();

    let family = exposition.get("h").unwrap();
    assert_eq!(
        family.metrics[0].value,
        MetricValue::Histogram(HistogramValue {
            sample_count: 3,
            sample_sum: 0.,
            buckets: vec![
                HistogramBucket::new(1., 2),
                HistogramBucket::new(f64::INFINITY, 3)
            ],
        })
    );
}

#[test]
fn test_parse_errors() {
    let cases: &[(&str, Option<usize>)] = &[
        // No EOF
        ("# TYPE a gauge\na 1\n", Some(2)),
        // Text after EOF
        ("# EOF\n# TYPE a gauge\n", Some(2)),
        // Sample without a TYPE line
        ("a 1\n# EOF\n", Some(1)),
        // Blank lines aren't allowed
        ("# TYPE a gauge\n\na 1\n# EOF\n", Some(2)),
        // Exemplars only go on counters and buckets
        ("# TYPE g gauge\ng 1 # {a=\"b\"} 1\n# EOF\n", Some(2)),
        // Histograms need a +Inf bucket
        ("# TYPE h histogram\nh_bucket{le=\"1.0\"} 0\nh_sum 0\nh_count 0\n# EOF\n", Some(5)),
        // Descriptors go before samples
        ("# TYPE g gauge\ng 1\n# HELP g help\n# EOF\n", Some(3)),
        // Families can't be split up
        ("# TYPE a gauge\na 1\n# TYPE b gauge\nb 1\n# TYPE a gauge\n# EOF\n", Some(5)),
        // Unsupported types
        ("# TYPE s stateset\n# EOF\n", Some(1)),
        // Quantiles are between 0 and 1
        ("# TYPE s summary\ns{quantile=\"1.5\"} 1\n# EOF\n", Some(2)),
        // Counts are integers
        ("# TYPE h histogram\nh_bucket{le=\"+Inf\"} 1.5\n# EOF\n", Some(2)),
    ];

    for (text, line) in cases {
        match parse_openmetrics(text) {
            Ok(exposition) => panic!("{:?} should not parse, got {:?}", text, exposition),
            Err(err) => assert_eq!(err.line(), *line, "{:?}: {}", text, err),
        }
    }
}

#[test]
fn test_parse_duplicate_metric() {
    let result = parse_openmetrics("# TYPE g gauge\ng 1\ng 2\n# EOF\n");
    assert!(matches!(result, Err(ParseError::DuplicateMetric { line: 3 })));

    let result = parse_openmetrics("# TYPE g gauge\n");
    assert!(matches!(result, Err(ParseError::MissingEof { line: 1 })));
}

#[test]
fn test_parse_syntax_error_position() {
    match parse_openmetrics("# TYPE g gauge\ng  1\n# EOF\n") {
        Err(ParseError::Syntax { line, column, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, 3);
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_round_trip() {
    let families = vec![
        MetricFamily::new("foos_total", MetricType::Counter)
            .with_help("Number of foos.")
            .with_unit("foos")
            .with_metric(Metric::new(
                labels(&[("path", "/a\"b")]),
                Some(1234567890),
                MetricValue::Counter(CounterValue {
                    value: 42.,
                    exemplar: Some(Exemplar::new(labels(&[("trace", "abc")]), 0.5, Some(12345.6))),
                }),
            )),
        MetricFamily::new("gauge.name\"", MetricType::Gauge)
            .with_help("gauge\ndoc\nstr\"ing")
            .with_metric(Metric::new(
                labels(&[("name.1", "Björn"), ("name*2", "佖佥")]),
                None,
                MetricValue::Gauge(f64::NAN),
            )),
        MetricFamily::new("unknown_name", MetricType::Untyped)
            .with_metric(Metric::new(vec![], None, MetricValue::Untyped(-1.23e-45))),
        summary(),
        latency_histogram(true),
    ];

    for family in families {
        let mut out = Vec::new();
        write_openmetrics(&mut out, &family).unwrap();
        write_eof(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let exposition = parse_openmetrics(&text).unwrap();
        assert_eq!(exposition.families, vec![family], "{}", text);
    }
}

#[test]
fn test_round_trip_synthesizes_inf_bucket() {
    let mut out = Vec::new();
    write_openmetrics(&mut out, &latency_histogram(false)).unwrap();
    write_eof(&mut out).unwrap();

    let exposition = parse_openmetrics(std::str::from_utf8(&out).unwrap()).unwrap();
    assert_eq!(exposition.families, vec![latency_histogram(false)]);
    assert_eq!(exposition.families, vec![latency_histogram(true)]);

    // The decoded +Inf bucket is explicit.
    match &exposition.families[0].metrics[0].value {
        MetricValue::Histogram(histogram) => {
            assert_eq!(histogram.buckets.len(), 5);
            assert_eq!(histogram.buckets[4].upper_bound, f64::INFINITY);
        }
        other => panic!("expected a histogram, got {:?}", other),
    }
}

#[test]
fn test_round_trip_unsorted_quantiles() {
    let mut family = summary();
    if let MetricValue::Summary(summary) = &mut family.metrics[0].value {
        summary.quantiles.reverse();
    }

    let mut out = Vec::new();
    write_openmetrics(&mut out, &family).unwrap();
    write_eof(&mut out).unwrap();

    let exposition = parse_openmetrics(std::str::from_utf8(&out).unwrap()).unwrap();
    assert_eq!(exposition.families, vec![family]);
}

#[test]
fn run_openmetrics_validation() {
    let tests = fs::read_dir("./src/openmetrics/testdata");
    assert!(tests.is_ok());

    for test in tests.unwrap() {
        assert!(test.is_ok());
        let test = test.unwrap();
        let path = test.path();
        let test_name = path.file_name().unwrap();

        assert!(path.is_dir());

        let test_meta_str = read_child_file(&path, "test.json");
        let meta = serde_json::from_str::<TestMeta>(&test_meta_str);
        assert!(meta.is_ok());
        let meta = meta.unwrap();
        assert_eq!(meta.exposition_format, "text");

        let metrics_str = read_child_file(&path, &meta.file);

        println!("\n[TEST{:?}]", test_name);
        let parsed = parse_openmetrics(&metrics_str);
        let metrics_str = metrics_str.replace(' ', ".").replace('\t', "->");

        if meta.should_parse {
            assert!(
                parsed.is_ok(),
                "\n{}\n Test should parse, but didn't ({:?})",
                metrics_str,
                parsed
            );
        } else {
            assert!(
                parsed.is_err(),
                "\n{}\n Test shouldn't parse, but did ({:?})",
                metrics_str,
                parsed
            );
        }
    }
}
