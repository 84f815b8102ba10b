//! purge - size-triggered log rotation
//!
//! Copies a log file to a backup atomically once it reaches a size threshold,
//! then truncates it. Powered by the purge library.

mod logging;

use clap::Parser;
use clap::builder::RangedU64ValueParser;
use dialoguer::Confirm;
use purge::{
    CopyOptions, DEFAULT_CHUNK_SIZE, DestinationPolicy, Diagnostics, Error as PurgeError,
    ErrorCode, Event, ProgressDiagnostics, RotateOptions, RotationPlan, RotationReport, SizeUnit,
    TracingDiagnostics, create_progress_bar, plan_rotation,
};
use serde_json::{Value, json};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use logging::LogLevel;

/// purge - rotate a file once it grows past a size threshold
///
/// The file is copied to a backup (atomically: the backup is either absent or
/// complete) and then truncated to zero bytes.
///
/// Usage:
///   purge -t FILE -s SIZE [-u UNIT]
///   purge -t FILE -s SIZE -c BACKUP
///   purge -t FILE -s SIZE -n --force
#[derive(Parser, Debug)]
#[command(name = "purge", version, about, long_about = None)]
struct Args {
    /// Path to the file to rotate
    #[arg(short = 't', long, value_name = "PATH")]
    target: PathBuf,

    /// Minimum size that triggers a rotation
    #[arg(short = 's', long, value_name = "N", value_parser = parse_size)]
    size: u64,

    /// Unit of --size: B, KB, MB or GB (binary)
    #[arg(short = 'u', long, default_value_t = SizeUnit::Kilobytes)]
    units: SizeUnit,

    /// Copy the target to this path before truncating
    #[arg(short = 'c', long, value_name = "PATH", conflicts_with = "nocopy")]
    copy: Option<PathBuf>,

    /// Truncate without making a copy
    #[arg(short = 'n', long)]
    nocopy: bool,

    /// Log level: error, warn, info, debug, trace, or 10..50
    #[arg(short = 'l', long, default_value = "warn")]
    level: LogLevel,

    /// Also write logs to these files (appended)
    #[arg(short = 'o', long, value_name = "PATH", num_args = 1..)]
    output: Vec<PathBuf>,

    /// Do not write logs to stderr
    #[arg(long)]
    nostderr: bool,

    /// Never ask for confirmation
    #[arg(long, conflicts_with = "safe")]
    force: bool,

    /// Ask before generating a backup name
    #[arg(long)]
    safe: bool,

    /// Bytes moved per read/write while copying
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE,
          value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    chunk_size: usize,

    /// Do not call fsync on the backup (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Do not preserve file timestamps on the backup
    #[arg(long)]
    no_times: bool,

    /// Do not preserve file permissions on the backup
    #[arg(long)]
    no_perms: bool,

    /// Show a progress bar while copying
    #[arg(long)]
    progress: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn parse_size(s: &str) -> Result<u64, String> {
    if s.trim_start().starts_with('-') {
        return Err("size cannot be negative".to_owned());
    }
    s.parse::<u64>().map_err(|e| e.to_string())
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
enum CliError {
    #[error("{source}")]
    Target { source: PurgeError },

    #[error("Failed to rotate {path}: {source}")]
    Rotate { path: PathBuf, source: PurgeError },

    #[error("Cannot ask for confirmation: {source}")]
    Prompt { source: dialoguer::Error },

    #[error("Failed to initialize logging: {source}")]
    Logging {
        source: tracing_subscriber::util::TryInitError,
    },

    #[error("Failed to serialize JSON output: {source}")]
    JsonSerialize { source: serde_json::Error },
}

impl CliError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Target { source } | Self::Rotate { source, .. } => source.code(),
            Self::Prompt { .. } => ErrorCode::IoError,
            Self::Logging { .. } | Self::JsonSerialize { .. } => ErrorCode::Unexpected,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Target { source } | Self::Rotate { source, .. } => match source {
                PurgeError::TargetNotFound(_) => 1,
                PurgeError::IsADirectory(_) => 2,
                PurgeError::IsASymlink(_) | PurgeError::NotAFile(_) => 3,
                PurgeError::Truncate { .. } => 5,
                _ if matches!(self, Self::Rotate { .. }) => 4,
                _ => 1,
            },
            _ => 1,
        }
    }
}

/// How a run ended when it did not fail.
#[derive(Debug)]
enum Outcome {
    Report(RotationReport),
    Declined { size: u64 },
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(outcome) => {
            if !args.json {
                return;
            }
            if let Err(error) = print_json_value(&outcome_json(&args, &outcome)) {
                eprintln!("error[{}]: {}", error.code(), error);
                std::process::exit(error.exit_code());
            }
        }
        Err(error) => {
            if matches!(error, CliError::Logging { .. }) {
                eprintln!("error[{}]: {}", error.code(), error);
            } else {
                tracing::error!("error[{}]: {}", error.code(), error);
            }
            if args.json {
                let value = json!({
                    "status": "error",
                    "target": display_path(&args.target),
                    "code": error.code().as_str(),
                    "message": error.to_string(),
                });
                // Exit status already reports the failure
                let _ = print_json_value(&value);
            }
            std::process::exit(error.exit_code());
        }
    }
}

fn run(args: &Args) -> CliResult<Outcome> {
    logging::init(args.level, &args.output, !args.nostderr)
        .map_err(|source| CliError::Logging { source })?;

    let mut options = build_options(args);

    let pending = match plan_rotation(&args.target, &options)
        .map_err(|source| CliError::Target { source })?
    {
        RotationPlan::NotRequired { size, threshold } => {
            return Ok(Outcome::Report(RotationReport::NotRequired { size, threshold }));
        }
        RotationPlan::Required(pending) => pending,
    };
    let size = pending.size();
    tracing::debug!(
        "\"{}\" is {}, threshold {}",
        display_path(&args.target),
        format_bytes(size),
        format_bytes(options.threshold_bytes())
    );

    options.destination = if args.nocopy {
        let prompt = format!(
            "purge \"{}\" without copying may lead to losing data. Are you sure?",
            display_path(&args.target)
        );
        if !args.force && !confirm(&prompt)? {
            return Ok(declined(size));
        }
        DestinationPolicy::NoCopy
    } else if let Some(ref path) = args.copy {
        DestinationPolicy::Explicit(path.clone())
    } else {
        if args.safe && !confirm("destination file not specified. Generate?")? {
            return Ok(declined(size));
        }
        DestinationPolicy::Generated
    };

    let pb = (args.progress && options.destination != DestinationPolicy::NoCopy)
        .then(|| create_progress_bar(size));
    let mut sink: Arc<dyn Diagnostics> = Arc::new(TracingDiagnostics);
    if let Some(ref pb) = pb {
        sink = Arc::new(ProgressDiagnostics::new(pb.clone(), sink));
    }

    let staging = Arc::new(StagingGuard::default());
    {
        let staging = staging.clone();
        ctrlc::set_handler(move || {
            if let Some(path) = staging.take() {
                // Already renamed or removed if this fails
                let _ = fs::remove_file(path);
            }
            eprintln!("\nInterrupted.");
            std::process::exit(130);
        })
        .ok();
    }
    options.copy = options.copy.with_diagnostics(Arc::new(GuardedSink {
        staging,
        inner: sink,
    }));

    let result = pending.execute(&options);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    result
        .map(Outcome::Report)
        .map_err(|source| CliError::Rotate {
            path: args.target.clone(),
            source,
        })
}

/// Staging file of the copy in flight, if any.
#[derive(Debug, Default)]
struct StagingGuard(Mutex<Option<PathBuf>>);

impl StagingGuard {
    fn set(&self, path: Option<PathBuf>) {
        if let Ok(mut current) = self.0.lock() {
            *current = path;
        }
    }

    fn take(&self) -> Option<PathBuf> {
        self.0.lock().ok().and_then(|mut current| current.take())
    }
}

/// Tracks the staging file for the interrupt handler, then forwards.
struct GuardedSink {
    staging: Arc<StagingGuard>,
    inner: Arc<dyn Diagnostics>,
}

impl Diagnostics for GuardedSink {
    fn event(&self, event: &Event<'_>) {
        match event {
            Event::StagingCreated { path } => self.staging.set(Some(path.to_path_buf())),
            Event::Published { .. }
            | Event::StagingRemoved { .. }
            | Event::CleanupFailed { .. }
            | Event::Failed { .. } => self.staging.set(None),
            _ => {}
        }
        self.inner.event(event);
    }
}

fn build_options(args: &Args) -> RotateOptions {
    let mut copy = CopyOptions::default().with_chunk_size(args.chunk_size);
    if args.no_sync {
        copy = copy.without_fsync();
    }
    if args.no_times {
        copy = copy.without_timestamps();
    }
    if args.no_perms {
        copy = copy.without_permissions();
    }
    RotateOptions::new(args.size, args.units).with_copy_options(copy)
}

fn declined(size: u64) -> Outcome {
    tracing::info!("canceling the process by user's decision");
    Outcome::Declined { size }
}

/// Ask a yes/no question; a non-interactive stdin counts as "no".
fn confirm(prompt: &str) -> CliResult<bool> {
    if !io::stdin().is_terminal() {
        tracing::warn!("cannot confirm \"{prompt}\": stdin is not a terminal");
        return Ok(false);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|source| CliError::Prompt { source })
}

fn outcome_json(args: &Args, outcome: &Outcome) -> Value {
    let target = display_path(&args.target);
    let threshold = args.size.saturating_mul(args.units.bytes());

    match outcome {
        Outcome::Declined { size } => json!({
            "status": "declined",
            "target": target,
            "size": size,
            "threshold": threshold,
            "backup": Value::Null,
            "bytes_copied": Value::Null,
        }),
        Outcome::Report(RotationReport::NotRequired { size, threshold }) => json!({
            "status": "not_required",
            "target": target,
            "size": size,
            "threshold": threshold,
            "backup": Value::Null,
            "bytes_copied": Value::Null,
        }),
        Outcome::Report(RotationReport::Rotated { size, backup }) => json!({
            "status": "rotated",
            "target": target,
            "size": size,
            "threshold": threshold,
            "backup": backup.as_ref().map(|b| display_path(&b.destination)),
            "bytes_copied": backup.as_ref().map(|b| b.bytes_copied),
        }),
    }
}

fn print_json_value(value: &Value) -> CliResult<()> {
    let serialized =
        serde_json::to_string(value).map_err(|source| CliError::JsonSerialize { source })?;
    println!("{serialized}");
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
