//! An encoder and decoder for the Prometheus text exposition format and OpenMetrics.
//!
//! ```
//! use expfmt::{encode, CounterValue, Format, Metric, MetricFamily, MetricType, MetricValue};
//!
//! let family = MetricFamily::new("requests_total", MetricType::Counter)
//!     .with_help("Requests served.")
//!     .with_metric(Metric::new(
//!         vec![],
//!         None,
//!         MetricValue::Counter(CounterValue { value: 3., exemplar: None }),
//!     ));
//!
//! let mut out = Vec::new();
//! encode(&mut out, &family, Format::OpenMetrics).unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "# HELP requests Requests served.\n# TYPE requests counter\nrequests_total 3.0\n"
//! );
//! ```

extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod decoder;
mod encoder;
mod internal;
pub mod logging;
pub mod openmetrics;
pub mod prometheus;
mod public;

pub use decoder::{decode, Decoded, Decoder, FamilyReader};
pub use encoder::{encode, render};
pub use openmetrics::{parse_openmetrics, write_eof, write_openmetrics};
pub use prometheus::{parse_prometheus, write_prometheus};
pub use public::*;
