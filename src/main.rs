use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};

use expfmt::logging::{logger_init, LogFormat, LogLevel, LoggerConfig};
use expfmt::{decode, encode, write_eof, Format};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WireFormat {
    /// The Prometheus text format (version 0.0.4)
    Prometheus,
    /// OpenMetrics 1.0
    Openmetrics,
}

impl From<WireFormat> for Format {
    fn from(format: WireFormat) -> Format {
        match format {
            WireFormat::Prometheus => Format::Prometheus,
            WireFormat::Openmetrics => Format::OpenMetrics,
        }
    }
}

/// Converts a metrics exposition between the Prometheus text format and OpenMetrics.
#[derive(Parser)]
#[command(name = "expfmt", version)]
struct Cli {
    /// Exposition to read (default: stdin)
    file: Option<PathBuf>,

    /// Format of the input
    #[arg(long, value_enum, default_value = "prometheus")]
    from: WireFormat,

    /// Format to write to stdout
    #[arg(long, value_enum, default_value = "openmetrics")]
    to: WireFormat,

    /// Only log entries at or above this level: debug, info, warn, error
    #[arg(long = "log.level")]
    log_level: Option<LogLevel>,

    /// Output format of log entries: logfmt, json
    #[arg(long = "log.format", default_value = "logfmt")]
    log_format: LogFormat,

    #[arg(long = "log.color", default_value_t = true, action = ArgAction::Set)]
    log_color: bool,
}

fn convert<R: BufRead, W: Write>(
    source: R,
    sink: &mut W,
    from: Format,
    to: Format,
) -> anyhow::Result<()> {
    let mut families = 0;
    let mut written = 0;

    for family in decode(source, from) {
        let family = family.with_context(|| format!("Failed to decode {} input", from))?;
        written += encode(sink, &family, to)
            .with_context(|| format!("Failed to encode metric family {}", family.name))?;

        tracing::debug!(
            family = %family.name,
            kind = %family.family_type,
            metrics = family.metrics.len(),
            "Converted family"
        );
        families += 1;
    }

    if to == Format::OpenMetrics {
        written += write_eof(sink)?;
    }
    sink.flush()?;

    tracing::info!(families, bytes = written, from = %from, to = %to, "Conversion finished");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logger = logger_init(&LoggerConfig {
        level: cli.log_level,
        format: cli.log_format,
        color: cli.log_color,
    })?;

    let stdout = io::stdout();
    let mut sink = BufWriter::new(stdout.lock());
    let (from, to) = (Format::from(cli.from), Format::from(cli.to));

    match &cli.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            convert(BufReader::new(file), &mut sink, from, to)
        }
        None => convert(io::stdin().lock(), &mut sink, from, to),
    }
}
