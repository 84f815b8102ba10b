//! Diagnostics reported by the copy engine.
//!
//! The engine never logs through global state. Every notable point of the
//! copy protocol is described by an [`Event`] and handed to the
//! [`Diagnostics`] sink configured in [`CopyOptions`](crate::CopyOptions).
//!
//! # Example
//!
//! ```
//! use purge::{CopyOptions, Diagnostics, Event};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<String>>);
//!
//! impl Diagnostics for Recorder {
//!     fn event(&self, event: &Event<'_>) {
//!         if let Ok(mut lines) = self.0.lock() {
//!             lines.push(event.to_string());
//!         }
//!     }
//! }
//!
//! let options = CopyOptions::default().with_diagnostics(Arc::new(Recorder::default()));
//! ```

use std::fmt;
use std::path::Path;

use crate::error::Error;

/// Severity attached to an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fine-grained progress (chunks, staging bookkeeping)
    Debug,
    /// Milestones a user may want to see
    Info,
    /// Something went wrong but the operation result is unaffected
    Warn,
    /// The operation failed
    Error,
}

/// A notable point in the copy protocol.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event<'a> {
    /// Preflight finished
    SpaceChecked {
        /// Source size in bytes
        required: u64,
        /// Free space at the destination in bytes
        available: u64,
    },
    /// Staging file created
    StagingCreated {
        /// Path of the staging file
        path: &'a Path,
    },
    /// One chunk was written to the staging file
    ChunkWritten {
        /// Size of this chunk
        bytes: usize,
        /// Bytes written so far
        total: u64,
        /// Size of the source at preflight
        expected: u64,
    },
    /// Permissions and timestamps were copied to the staging file
    MetadataCopied {
        /// Path of the staging file
        path: &'a Path,
    },
    /// Staging file renamed over the destination
    Published {
        /// Source path
        source: &'a Path,
        /// Destination path
        destination: &'a Path,
        /// Bytes copied
        bytes: u64,
    },
    /// Staging file removed after a failure
    StagingRemoved {
        /// Path of the staging file
        path: &'a Path,
    },
    /// Staging file could not be removed
    CleanupFailed {
        /// Path of the staging file
        path: &'a Path,
        /// Reason
        error: &'a std::io::Error,
    },
    /// Rotation target is below its threshold; nothing was done
    RotationSkipped {
        /// Target path
        path: &'a Path,
        /// Target size in bytes
        size: u64,
        /// Threshold in bytes
        threshold: u64,
    },
    /// Destination name picked for a backup
    DestinationGenerated {
        /// Generated path
        path: &'a Path,
    },
    /// Rotation target is about to be truncated without a backup
    NoBackup {
        /// Target path
        path: &'a Path,
    },
    /// Rotation target truncated to zero bytes
    Truncated {
        /// Target path
        path: &'a Path,
    },
    /// Copy failed
    Failed {
        /// Destination path
        destination: &'a Path,
        /// Reason
        error: &'a Error,
    },
}

impl Event<'_> {
    /// Severity of this event.
    pub fn severity(&self) -> Severity {
        match self {
            Self::SpaceChecked { .. }
            | Self::StagingCreated { .. }
            | Self::ChunkWritten { .. }
            | Self::MetadataCopied { .. }
            | Self::StagingRemoved { .. }
            | Self::DestinationGenerated { .. } => Severity::Debug,
            Self::Published { .. } | Self::RotationSkipped { .. } | Self::Truncated { .. } => {
                Severity::Info
            }
            Self::NoBackup { .. } => Severity::Warn,
            Self::CleanupFailed { .. } | Self::Failed { .. } => Severity::Error,
        }
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpaceChecked {
                required,
                available,
            } => write!(
                f,
                "space required: {required} bytes, available: {available} bytes"
            ),
            Self::StagingCreated { path } => {
                write!(f, "created staging file \"{}\"", path.display())
            }
            Self::ChunkWritten { bytes, .. } => write!(f, "wrote {bytes} bytes"),
            Self::MetadataCopied { path } => {
                write!(f, "copied metadata to \"{}\"", path.display())
            }
            Self::Published {
                source,
                destination,
                ..
            } => write!(
                f,
                "\"{}\" copied to \"{}\"",
                source.display(),
                destination.display()
            ),
            Self::StagingRemoved { path } => {
                write!(f, "removed staging file \"{}\"", path.display())
            }
            Self::CleanupFailed { path, error } => write!(
                f,
                "cannot remove staging file \"{}\": {error}",
                path.display()
            ),
            Self::RotationSkipped {
                path,
                size,
                threshold,
            } => write!(
                f,
                "\"{}\" is {size} bytes, below {threshold}: no actions required",
                path.display()
            ),
            Self::DestinationGenerated { path } => {
                write!(f, "generated destination path \"{}\"", path.display())
            }
            Self::NoBackup { path } => {
                write!(f, "purging \"{}\" without copying", path.display())
            }
            Self::Truncated { path } => write!(f, "\"{}\" purged", path.display()),
            Self::Failed { destination, error } => {
                write!(f, "copying to \"{}\" failed: {error}", destination.display())
            }
        }
    }
}

/// Receiver of copy [`Event`]s.
///
/// Implementations must not panic; the engine calls the sink while it
/// still owns the staging file.
pub trait Diagnostics: Send + Sync {
    /// Handle one event.
    fn event(&self, event: &Event<'_>);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn event(&self, _event: &Event<'_>) {}
}

/// Sink that forwards events to `tracing` (requires `tracing` feature).
#[cfg(feature = "tracing")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

#[cfg(feature = "tracing")]
impl Diagnostics for TracingDiagnostics {
    fn event(&self, event: &Event<'_>) {
        match event.severity() {
            Severity::Debug => tracing::debug!(target: "purge::copy", "{event}"),
            Severity::Info => tracing::info!(target: "purge::copy", "{event}"),
            Severity::Warn => tracing::warn!(target: "purge::copy", "{event}"),
            Severity::Error => tracing::error!(target: "purge::copy", "{event}"),
        }
    }
}

/// The sink used when none is configured.
pub(crate) fn default_sink() -> &'static dyn Diagnostics {
    #[cfg(feature = "tracing")]
    {
        &TracingDiagnostics
    }
    #[cfg(not(feature = "tracing"))]
    {
        &NoopDiagnostics
    }
}
