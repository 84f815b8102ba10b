//! Configuration options for copy and rotation operations.
//!
//! This module provides [`CopyOptions`] for configuring the atomic copy
//! engine, [`RotateOptions`] for the rotation workflow, and the
//! [`SizeUnit`] / [`DestinationPolicy`] values they are built from.
//!
//! # Example
//!
//! ```
//! use purge::{CopyOptions, RotateOptions, SizeUnit};
//!
//! let copy = CopyOptions::default()
//!     .with_chunk_size(64 * 1024)
//!     .without_fsync();
//!
//! let rotate = RotateOptions::new(10, SizeUnit::Megabytes).with_copy_options(copy);
//! assert_eq!(rotate.threshold_bytes(), 10 * 1024 * 1024);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::diagnostics::{Diagnostics, default_sink};

/// Default number of bytes moved per read/write during a copy.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Options for the atomic copy engine.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `chunk_size` | 8192 | Bytes per read/write |
/// | `fsync` | `true` | Sync staging file before publishing |
/// | `preserve_permissions` | `true` | Copy permission bits |
/// | `preserve_timestamps` | `true` | Copy mtime/atime |
/// | `check_free_space` | `true` | Preflight free-space check |
/// | `diagnostics` | `None` | Use the default sink |
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct CopyOptions {
    /// Bytes moved per read/write (default: 8192)
    ///
    /// Bounds peak memory independently of the source size.
    pub chunk_size: usize,

    /// Whether to sync the staging file to disk before the rename (default: true)
    pub fsync: bool,

    /// Whether to copy source permission bits (default: true)
    pub preserve_permissions: bool,

    /// Whether to copy source access and modification times (default: true)
    pub preserve_timestamps: bool,

    /// Whether to compare source size with destination free space first (default: true)
    pub check_free_space: bool,

    /// Sink for copy events (optional)
    ///
    /// If not set and the `tracing` feature is enabled, events are logged via
    /// tracing. Otherwise they are discarded.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fsync: true,
            preserve_permissions: true,
            preserve_timestamps: true,
            check_free_space: true,
            diagnostics: None,
        }
    }
}

impl fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("chunk_size", &self.chunk_size)
            .field("fsync", &self.fsync)
            .field("preserve_permissions", &self.preserve_permissions)
            .field("preserve_timestamps", &self.preserve_timestamps)
            .field("check_free_space", &self.check_free_space)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl CopyOptions {
    /// Set the chunk size
    ///
    /// Value is clamped to at least 1.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the diagnostics sink
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Disable fsync for faster (but less durable) copies
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Disable permission preservation
    #[must_use]
    pub fn without_permissions(mut self) -> Self {
        self.preserve_permissions = false;
        self
    }

    /// Disable timestamp preservation
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.preserve_timestamps = false;
        self
    }

    /// Skip the free-space preflight
    ///
    /// Running out of space mid-copy still fails cleanly; this only removes
    /// the early check.
    #[must_use]
    pub fn without_space_check(mut self) -> Self {
        self.check_free_space = false;
        self
    }

    pub(crate) fn sink(&self) -> &dyn Diagnostics {
        match self.diagnostics.as_deref() {
            Some(sink) => sink,
            None => default_sink(),
        }
    }
}

/// Unit of the rotation threshold.
///
/// Units are binary: one kilobyte is 1024 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeUnit {
    /// Bytes
    Bytes,
    /// 2^10 bytes (default)
    #[default]
    Kilobytes,
    /// 2^20 bytes
    Megabytes,
    /// 2^30 bytes
    Gigabytes,
}

impl SizeUnit {
    /// Number of bytes in one unit.
    pub fn bytes(self) -> u64 {
        match self {
            Self::Bytes => 1,
            Self::Kilobytes => 1 << 10,
            Self::Megabytes => 1 << 20,
            Self::Gigabytes => 1 << 30,
        }
    }

    /// Short name (`B`, `KB`, `MB`, `GB`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bytes => "B",
            Self::Kilobytes => "KB",
            Self::Megabytes => "MB",
            Self::Gigabytes => "GB",
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`SizeUnit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a size unit (expected B, KB, MB or GB)")]
pub struct ParseSizeUnitError(String);

impl FromStr for SizeUnit {
    type Err = ParseSizeUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Ok(Self::Bytes),
            "KB" => Ok(Self::Kilobytes),
            "MB" => Ok(Self::Megabytes),
            "GB" => Ok(Self::Gigabytes),
            _ => Err(ParseSizeUnitError(s.to_owned())),
        }
    }
}

/// Where the backup of a rotated file goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DestinationPolicy {
    /// Next free `<stem>_copy<n><ext>` next to the target (default)
    #[default]
    Generated,
    /// This exact path, replaced atomically if it exists
    Explicit(PathBuf),
    /// No backup; the target is only truncated
    NoCopy,
}

/// Options for the rotation workflow.
///
/// # Default Values
///
/// | Field | Default |
/// |-------|---------|
/// | `size` | 0 |
/// | `unit` | `KB` |
/// | `destination` | `Generated` |
/// | `copy` | [`CopyOptions::default()`] |
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotateOptions {
    /// Threshold amount, in `unit`s
    pub size: u64,

    /// Threshold unit
    pub unit: SizeUnit,

    /// Backup destination
    pub destination: DestinationPolicy,

    /// Options forwarded to the copy engine
    pub copy: CopyOptions,
}

impl RotateOptions {
    /// Create options rotating at `size` `unit`s.
    pub fn new(size: u64, unit: SizeUnit) -> Self {
        Self {
            size,
            unit,
            ..Self::default()
        }
    }

    /// Threshold in bytes, saturating at `u64::MAX`.
    pub fn threshold_bytes(&self) -> u64 {
        self.size.saturating_mul(self.unit.bytes())
    }

    /// Copy the target to this path before truncating
    #[must_use]
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = DestinationPolicy::Explicit(path.into());
        self
    }

    /// Truncate without making a backup
    #[must_use]
    pub fn without_copy(mut self) -> Self {
        self.destination = DestinationPolicy::NoCopy;
        self
    }

    /// Replace the copy engine options
    #[must_use]
    pub fn with_copy_options(mut self, copy: CopyOptions) -> Self {
        self.copy = copy;
        self
    }
}
