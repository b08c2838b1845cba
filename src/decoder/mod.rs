//! Incremental decoding. [`Decoder`] is a push/poll state machine that can be fed bytes as they arrive, and
//! [`FamilyReader`] drives one over any [`BufRead`] source as a lazy iterator of families.

#[cfg(test)]
mod tests;

use std::io::{self, BufRead};
use std::str;

use crate::internal::ExpositionMarshal;
use crate::openmetrics::OpenMetricsFormat;
use crate::prometheus::PrometheusFormat;
use crate::{Format, MetricFamily, MetricsExposition, ParseError};

/// The outcome of a successful [`Decoder::poll`].
#[derive(Debug, PartialEq)]
pub enum Decoded {
    /// A family was completed.
    Family(MetricFamily),
    /// Nothing can be decoded until more bytes are fed, or the decoder is closed.
    NeedMore,
    /// The input has been fully decoded.
    End,
}

#[derive(Debug)]
enum Marshal {
    OpenMetrics(ExpositionMarshal<OpenMetricsFormat>),
    Prometheus(ExpositionMarshal<PrometheusFormat>),
}

impl Marshal {
    fn new(format: Format) -> Marshal {
        match format {
            Format::OpenMetrics => Marshal::OpenMetrics(ExpositionMarshal::new()),
            Format::Prometheus => Marshal::Prometheus(ExpositionMarshal::new()),
        }
    }

    fn format(&self) -> Format {
        match self {
            Marshal::OpenMetrics(marshal) => marshal.format(),
            Marshal::Prometheus(marshal) => marshal.format(),
        }
    }

    fn process_line(
        &mut self,
        line: usize,
        text: &str,
    ) -> Result<Option<MetricFamily>, ParseError> {
        match self {
            Marshal::OpenMetrics(marshal) => marshal.process_line(line, text),
            Marshal::Prometheus(marshal) => marshal.process_line(line, text),
        }
    }

    fn finish(&mut self) -> Result<Option<MetricFamily>, ParseError> {
        match self {
            Marshal::OpenMetrics(marshal) => marshal.finish(),
            Marshal::Prometheus(marshal) => marshal.finish(),
        }
    }
}

/// Decodes an exposition one line at a time. A family is handed out as soon as the first line that doesn't
/// belong to it is seen, so memory use is bounded by the largest family rather than the whole document.
///
/// Any error is final: once `poll` has returned one, every later call returns [`Decoded::End`].
#[derive(Debug)]
pub struct Decoder {
    marshal: Marshal,
    buffer: Vec<u8>,
    start: usize,
    line: usize,
    closed: bool,
    done: bool,
}

impl Decoder {
    pub fn new(format: Format) -> Decoder {
        Decoder {
            marshal: Marshal::new(format),
            buffer: Vec::new(),
            start: 0,
            line: 0,
            closed: false,
            done: false,
        }
    }

    pub fn format(&self) -> Format {
        self.marshal.format()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Signals that the source is exhausted. A final line without a trailing newline is decoded as is.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn poll(&mut self) -> Result<Decoded, ParseError> {
        if self.done {
            return Ok(Decoded::End);
        }

        let result = self.advance();
        if result.is_err() {
            self.done = true;
        }

        result
    }

    fn advance(&mut self) -> Result<Decoded, ParseError> {
        loop {
            let end = match self.buffer[self.start..].iter().position(|&b| b == b'\n') {
                Some(offset) => self.start + offset,
                None if !self.closed => {
                    self.buffer.drain(..self.start);
                    self.start = 0;
                    return Ok(Decoded::NeedMore);
                }
                None if self.start < self.buffer.len() => self.buffer.len(),
                None => {
                    self.done = true;
                    return Ok(match self.marshal.finish()? {
                        Some(family) => Decoded::Family(family),
                        None => Decoded::End,
                    });
                }
            };

            self.line += 1;
            let line = self.line;
            let bytes = &self.buffer[self.start..end];
            self.start = (end + 1).min(self.buffer.len());

            let text = str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8 { line })?;
            if let Some(family) = self.marshal.process_line(line, text)? {
                return Ok(Decoded::Family(family));
            }
        }
    }

    fn fail(&mut self) {
        self.done = true;
    }
}

/// A lazy iterator over the families of an exposition, reading from its source only as needed. Iteration stops
/// after the first error.
#[derive(Debug)]
pub struct FamilyReader<R> {
    source: R,
    decoder: Decoder,
}

impl<R: BufRead> FamilyReader<R> {
    pub fn new(source: R, format: Format) -> FamilyReader<R> {
        FamilyReader {
            source,
            decoder: Decoder::new(format),
        }
    }

    pub fn format(&self) -> Format {
        self.decoder.format()
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn fill(&mut self) -> io::Result<()> {
        let read = loop {
            match self.source.fill_buf() {
                Ok(buf) => {
                    self.decoder.feed(buf);
                    break buf.len();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if read == 0 {
            self.decoder.close();
        } else {
            self.source.consume(read);
        }

        Ok(())
    }
}

impl<R: BufRead> Iterator for FamilyReader<R> {
    type Item = Result<MetricFamily, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.decoder.poll() {
                Ok(Decoded::Family(family)) => return Some(Ok(family)),
                Ok(Decoded::End) => return None,
                Ok(Decoded::NeedMore) => {
                    if let Err(e) = self.fill() {
                        self.decoder.fail();
                        return Some(Err(e.into()));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Decodes families from `source` lazily, in the order they appear.
pub fn decode<R: BufRead>(source: R, format: Format) -> FamilyReader<R> {
    FamilyReader::new(source, format)
}

pub(crate) fn parse_str(text: &str, format: Format) -> Result<MetricsExposition, ParseError> {
    let mut decoder = Decoder::new(format);
    decoder.feed(text.as_bytes());
    decoder.close();

    let mut exposition = MetricsExposition::new();
    loop {
        match decoder.poll()? {
            Decoded::Family(family) => exposition.families.push(family),
            Decoded::End => return Ok(exposition),
            // Everything was fed up front.
            Decoded::NeedMore => return Ok(exposition),
        }
    }
}
