//! Log output for the `purge` binary.
//!
//! Every output (stderr and each `--output` file) gets its own `fmt` layer;
//! all of them share one level filter.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Verbosity accepted by `--level`.
///
/// Either a name (`error`, `warn`, `info`, `debug`, `trace`) or a numeric
/// level on the 10 (debug) to 50 (critical) scale; numbers outside that
/// range are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel(pub LevelFilter);

impl Default for LogLevel {
    fn default() -> Self {
        Self(LevelFilter::WARN)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<i64>() {
            let level = match n {
                ..=10 => LevelFilter::DEBUG,
                11..=20 => LevelFilter::INFO,
                21..=30 => LevelFilter::WARN,
                _ => LevelFilter::ERROR,
            };
            return Ok(Self(level));
        }

        match s.to_ascii_lowercase().as_str() {
            "error" | "critical" => Ok(Self(LevelFilter::ERROR)),
            "warn" | "warning" => Ok(Self(LevelFilter::WARN)),
            "info" => Ok(Self(LevelFilter::INFO)),
            "debug" => Ok(Self(LevelFilter::DEBUG)),
            "trace" => Ok(Self(LevelFilter::TRACE)),
            _ => Err(format!(
                "\"{s}\" is not a log level (expected error, warn, info, debug, trace or 10..50)"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `[time] LEVEL message`, with continuation lines prefixed by `| `.
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();
        ctx.format_fields(Writer::new(&mut message), event)?;

        write!(writer, "[")?;
        SystemTime.format_time(&mut writer)?;
        write!(writer, "] {:<5} ", event.metadata().level())?;

        let mut lines = message.lines();
        writeln!(writer, "{}", lines.next().unwrap_or_default())?;
        for line in lines {
            writeln!(writer, "| {line}")?;
        }
        Ok(())
    }
}

/// A log file that could not be opened.
#[derive(Debug)]
pub struct LogFileError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for LogFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.source.kind() {
            io::ErrorKind::PermissionDenied => "permission denied".to_owned(),
            _ => format!("I/O error: {}", self.source),
        };
        write!(
            f,
            "cannot initialize logging file handler for \"{}\": {reason}",
            self.path.display()
        )
    }
}

fn file_layer(path: &Path) -> io::Result<BoxedLayer> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .boxed())
}

/// Install the global subscriber.
///
/// Log files that cannot be opened are skipped and reported at error level
/// once the remaining outputs are in place.
pub fn init(
    level: LogLevel,
    files: &[PathBuf],
    stderr: bool,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(files.len() + 1);
    let mut errors = Vec::new();

    if stderr {
        layers.push(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(io::stderr)
                .boxed(),
        );
    }

    for path in files {
        match file_layer(path) {
            Ok(layer) => layers.push(layer),
            Err(source) => errors.push(LogFileError {
                path: path.clone(),
                source,
            }),
        }
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(level.0))
        .try_init()?;

    report_parameters(files, stderr);

    if !errors.is_empty() {
        let report = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        tracing::error!("{report}");
    }

    Ok(())
}

fn report_parameters(files: &[PathBuf], stderr: bool) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let mut lines = vec!["logging parameters:".to_owned()];
    lines.push(format!("stderr: {}", if stderr { "yes" } else { "no" }));
    lines.push("log files:".to_owned());
    if files.is_empty() {
        lines.push("    (none)".to_owned());
    }
    for path in files {
        lines.push(format!("    {}", path.display()));
    }
    tracing::debug!("{}", lines.join("\n"));
}
