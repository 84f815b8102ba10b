//! Builder API for rotations.
//!
//! The builder pattern provides a fluent interface for configuring and
//! running a rotation. This is often more convenient than constructing
//! [`RotateOptions`] manually.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use purge::{RotationBuilder, SizeUnit};
//!
//! // Back up to app_copy<n>.log and truncate once app.log reaches 10 MB
//! let report = RotationBuilder::new("app.log")
//!     .threshold(10, SizeUnit::Megabytes)
//!     .run()?;
//! # Ok::<(), purge::Error>(())
//! ```
//!
//! ## Explicit Backup Path
//!
//! ```no_run
//! use purge::RotationBuilder;
//!
//! let report = RotationBuilder::new("/var/log/app.log")
//!     .threshold_bytes(4096)
//!     .copy_to("/backup/app.log")
//!     .chunk_size(64 * 1024)
//!     .run()?;
//! # Ok::<(), purge::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::options::{RotateOptions, SizeUnit};
use crate::rotate::{RotationReport, rotate};

/// A builder for configuring and running a rotation.
///
/// # Example
///
/// ```no_run
/// use purge::{RotationBuilder, SizeUnit};
///
/// let report = RotationBuilder::new("app.log")
///     .threshold(1, SizeUnit::Gigabytes)
///     .no_copy()
///     .run()?;
/// # Ok::<(), purge::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RotationBuilder {
    target: PathBuf,
    options: RotateOptions,
}

impl RotationBuilder {
    /// Create a new `RotationBuilder` for `target`.
    ///
    /// Uses default options (threshold 0 KB, generated backup name, 8 KiB chunks).
    pub fn new<P: AsRef<Path>>(target: P) -> Self {
        Self {
            target: target.as_ref().to_path_buf(),
            options: RotateOptions::default(),
        }
    }

    /// Rotate once the target reaches `size` `unit`s.
    #[must_use]
    pub fn threshold(mut self, size: u64, unit: SizeUnit) -> Self {
        self.options.size = size;
        self.options.unit = unit;
        self
    }

    /// Rotate once the target reaches `bytes` bytes.
    #[must_use]
    pub fn threshold_bytes(self, bytes: u64) -> Self {
        self.threshold(bytes, SizeUnit::Bytes)
    }

    /// Back the target up to `path` instead of a generated name.
    #[must_use]
    pub fn copy_to<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.options = self.options.with_destination(path.as_ref());
        self
    }

    /// Truncate without making a backup.
    #[must_use]
    pub fn no_copy(mut self) -> Self {
        self.options = self.options.without_copy();
        self
    }

    /// Set the copy chunk size (clamped to at least 1).
    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.options.copy = self.options.copy.with_chunk_size(bytes);
        self
    }

    /// Disable fsync of the backup before it is published.
    ///
    /// Faster, but a crash shortly after the rotation may lose the backup
    /// contents even though its name is visible.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.options.copy = self.options.copy.without_fsync();
        self
    }

    /// Disable timestamp preservation on the backup.
    #[must_use]
    pub fn no_timestamps(mut self) -> Self {
        self.options.copy = self.options.copy.without_timestamps();
        self
    }

    /// Disable permission preservation on the backup.
    #[must_use]
    pub fn no_permissions(mut self) -> Self {
        self.options.copy = self.options.copy.without_permissions();
        self
    }

    /// Send copy and rotation events to `sink`.
    #[must_use]
    pub fn diagnostics(mut self, sink: Arc<dyn Diagnostics>) -> Self {
        self.options.copy = self.options.copy.with_diagnostics(sink);
        self
    }

    /// Get a reference to the current options.
    pub fn options(&self) -> &RotateOptions {
        &self.options
    }

    /// Run the rotation.
    ///
    /// # Errors
    ///
    /// See [`rotate`].
    pub fn run(self) -> Result<RotationReport> {
        rotate(&self.target, &self.options)
    }
}
