use std::io::{self, BufReader, Read};

use super::{decode, Decoded, Decoder};
use crate::{Format, MetricType, ParseError};

fn expect_family(decoder: &mut Decoder, name: &str) {
    match decoder.poll() {
        Ok(Decoded::Family(family)) => assert_eq!(family.name, name),
        other => panic!("expected family {}, got {:?}", name, other),
    }
}

#[test]
fn test_families_are_handed_out_as_they_complete() {
    let mut decoder = Decoder::new(Format::OpenMetrics);
    assert_eq!(decoder.format(), Format::OpenMetrics);
    assert_eq!(decoder.poll().unwrap(), Decoded::NeedMore);

    decoder.feed(b"# TYPE a gauge\na 1\n# TY");
    assert_eq!(decoder.poll().unwrap(), Decoded::NeedMore);

    decoder.feed(b"PE b gauge\n");
    expect_family(&mut decoder, "a");
    assert_eq!(decoder.poll().unwrap(), Decoded::NeedMore);

    decoder.feed(b"b 2\n# EOF\n");
    expect_family(&mut decoder, "b");
    assert_eq!(decoder.poll().unwrap(), Decoded::NeedMore);

    decoder.close();
    assert_eq!(decoder.poll().unwrap(), Decoded::End);
    assert_eq!(decoder.poll().unwrap(), Decoded::End);
}

#[test]
fn test_last_family_is_handed_out_on_close() {
    let mut decoder = Decoder::new(Format::Prometheus);
    decoder.feed(b"# TYPE a counter\na 1");
    assert_eq!(decoder.poll().unwrap(), Decoded::NeedMore);

    decoder.close();
    expect_family(&mut decoder, "a");
    assert_eq!(decoder.poll().unwrap(), Decoded::End);
}

#[test]
fn test_errors_are_final() {
    let mut decoder = Decoder::new(Format::OpenMetrics);
    decoder.feed(b"# TYPE a gauge\na 1\na 2\n# EOF\n");
    decoder.close();

    assert!(matches!(
        decoder.poll(),
        Err(ParseError::DuplicateMetric { line: 3 })
    ));
    assert_eq!(decoder.poll().unwrap(), Decoded::End);
}

#[test]
fn test_truncated_openmetrics() {
    let mut decoder = Decoder::new(Format::OpenMetrics);
    decoder.feed(b"# TYPE a gauge\na 1\n");
    decoder.close();

    assert!(matches!(decoder.poll(), Err(ParseError::MissingEof { line: 2 })));
}

#[test]
fn test_invalid_utf8() {
    let mut decoder = Decoder::new(Format::Prometheus);
    decoder.feed(b"a 1\nb{c=\"\xff\"} 1\n");
    decoder.close();

    assert!(matches!(decoder.poll(), Err(ParseError::InvalidUtf8 { line: 2 })));
}

/// Hands out its input a few bytes at a time, failing with `Interrupted` before every read.
struct Trickle<'a> {
    data: &'a [u8],
    interrupt: bool,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "try again"));
        }

        let n = buf.len().min(self.data.len()).min(5);
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[test]
fn test_family_reader() {
    let text = concat!(
        "# HELP a_total Things.\n# TYPE a_total counter\n",
        "a_total{x=\"1\"} 1\na_total{x=\"2\"} 2\n",
        "# TYPE b summary\nb_sum 1\nb_count 2\n",
    )
    .as_bytes();
    let source = BufReader::new(Trickle {
        data: text,
        interrupt: false,
    });

    let reader = decode(source, Format::Prometheus);
    assert_eq!(reader.format(), Format::Prometheus);

    let families: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(families.len(), 2);
    assert_eq!(families[0].name, "a_total");
    assert_eq!(families[0].family_type, MetricType::Counter);
    assert_eq!(families[0].metrics.len(), 2);
    assert_eq!(families[1].name, "b");
    assert_eq!(families[1].family_type, MetricType::Summary);
}

#[test]
fn test_family_reader_stops_after_error() {
    let text: &[u8] = b"# TYPE a gauge\na 1\n# TYPE b gauge\nb{ 1\n# TYPE c gauge\nc 1\n";
    let mut reader = decode(text, Format::Prometheus);

    assert_eq!(reader.next().unwrap().unwrap().name, "a");
    match reader.next() {
        Some(Err(ParseError::Syntax { line, .. })) => assert_eq!(line, 4),
        other => panic!("expected a syntax error, got {:?}", other),
    }
    assert!(reader.next().is_none());
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }
}

#[test]
fn test_family_reader_source_error() {
    let mut reader = decode(BufReader::new(Broken), Format::OpenMetrics);
    match reader.next() {
        Some(Err(ParseError::Io(err))) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected an io error, got {:?}", other),
    }
    assert!(reader.next().is_none());
}
