//! Size-triggered rotation of a single file.
//!
//! A rotation checks the target's size against a threshold and, when the
//! threshold is reached, backs the target up with [`atomic_copy`] and then
//! truncates it. A failed backup aborts the rotation before the target is
//! touched.

use std::ffi::OsString;
use std::fs::{self, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::copy::{CopyOutcome, atomic_copy};
use crate::diagnostics::Event;
use crate::error::{Error, Result, Step};
use crate::options::{DestinationPolicy, RotateOptions};

/// What a rotation did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RotationReport {
    /// Target is smaller than the threshold; nothing was touched
    NotRequired {
        /// Target size in bytes
        size: u64,
        /// Threshold in bytes
        threshold: u64,
    },
    /// Target was (optionally backed up and) truncated
    Rotated {
        /// Target size before truncation
        size: u64,
        /// The backup, unless copying was disabled
        backup: Option<CopyOutcome>,
    },
}

impl RotationReport {
    /// Whether the target was truncated.
    pub fn rotated(&self) -> bool {
        matches!(self, Self::Rotated { .. })
    }
}

/// Check that `target` is an existing regular file.
///
/// Symlinks are rejected without being followed.
///
/// # Errors
///
/// [`Error::TargetNotFound`], [`Error::IsADirectory`], [`Error::IsASymlink`],
/// [`Error::NotAFile`], or [`Error::Io`] if the metadata query itself fails.
pub fn validate_target(target: &Path) -> Result<Metadata> {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::TargetNotFound(target.to_path_buf()));
        }
        Err(e) => return Err(Error::at(Step::Stat, target, e)),
    };

    let ft = meta.file_type();
    if ft.is_symlink() {
        Err(Error::IsASymlink(target.to_path_buf()))
    } else if ft.is_dir() {
        Err(Error::IsADirectory(target.to_path_buf()))
    } else if !ft.is_file() {
        Err(Error::NotAFile(target.to_path_buf()))
    } else {
        Ok(meta)
    }
}

/// Pick the first free `<stem>_copy<n><ext>` next to `target`, counting from 1.
///
/// A name is taken if anything, including a dangling symlink, exists there.
///
/// # Example
///
/// ```no_run
/// use purge::generate_destination;
/// use std::path::Path;
///
/// // "logs/app_copy1.log" if no copy exists yet
/// let dst = generate_destination(Path::new("logs/app.log"));
/// ```
pub fn generate_destination(target: &Path) -> PathBuf {
    let stem = target.file_stem().unwrap_or(target.as_os_str());
    let ext = target.extension();

    let candidate = |n: u64| {
        let mut name = OsString::from(stem);
        name.push(format!("_copy{n}"));
        if let Some(ext) = ext {
            name.push(".");
            name.push(ext);
        }
        target.with_file_name(name)
    };

    let mut n = 1;
    let mut destination = candidate(n);
    while fs::symlink_metadata(&destination).is_ok() {
        n += 1;
        destination = candidate(n);
    }
    destination
}

/// Truncate `target` to zero bytes.
///
/// # Errors
///
/// [`Error::Truncate`] if the file cannot be opened for writing.
pub fn truncate(target: &Path) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(target)
        .map(drop)
        .map_err(|source| Error::Truncate {
            path: target.to_path_buf(),
            source,
        })
}

/// The decision a rotation makes before touching anything.
#[derive(Debug)]
pub enum RotationPlan<'a> {
    /// Target is smaller than the threshold
    NotRequired {
        /// Target size in bytes
        size: u64,
        /// Threshold in bytes
        threshold: u64,
    },
    /// Target reached the threshold
    Required(PendingRotation<'a>),
}

/// A validated target that reached its threshold.
///
/// Nothing has been copied or truncated yet; callers may still ask for
/// confirmation or change the destination before [`execute`](Self::execute).
#[derive(Debug)]
pub struct PendingRotation<'a> {
    target: &'a Path,
    meta: Metadata,
}

impl<'a> PendingRotation<'a> {
    /// The file to rotate.
    pub fn target(&self) -> &'a Path {
        self.target
    }

    /// Target size in bytes at planning time.
    pub fn size(&self) -> u64 {
        self.meta.len()
    }

    /// Back the target up according to `options.destination`, then truncate it.
    ///
    /// # Errors
    ///
    /// - [`Error::SameFile`] if the backup destination is the target itself
    /// - Any [`atomic_copy`] error; the target is left untouched
    /// - [`Error::Truncate`] if truncation fails after a successful backup
    pub fn execute(self, options: &RotateOptions) -> Result<RotationReport> {
        let sink = options.copy.sink();
        let target = self.target;

        let destination = match &options.destination {
            DestinationPolicy::Generated => {
                let path = generate_destination(target);
                sink.event(&Event::DestinationGenerated { path: &path });
                Some(path)
            }
            DestinationPolicy::Explicit(path) => Some(path.clone()),
            DestinationPolicy::NoCopy => None,
        };

        let backup = match destination {
            Some(dst) => {
                if is_same_file(target, &self.meta, &dst) {
                    return Err(Error::SameFile(dst));
                }
                Some(atomic_copy(target, &dst, &options.copy)?)
            }
            None => {
                sink.event(&Event::NoBackup { path: target });
                None
            }
        };

        truncate(target)?;
        sink.event(&Event::Truncated { path: target });

        Ok(RotationReport::Rotated {
            size: self.size(),
            backup,
        })
    }
}

/// Validate `target` and compare it against the threshold of `options`.
///
/// Reports [`Event::RotationSkipped`] when the target is below the threshold.
///
/// # Errors
///
/// Validation errors from [`validate_target`].
pub fn plan_rotation<'a>(target: &'a Path, options: &RotateOptions) -> Result<RotationPlan<'a>> {
    let meta = validate_target(target)?;

    let size = meta.len();
    let threshold = options.threshold_bytes();
    if size < threshold {
        options.copy.sink().event(&Event::RotationSkipped {
            path: target,
            size,
            threshold,
        });
        return Ok(RotationPlan::NotRequired { size, threshold });
    }

    Ok(RotationPlan::Required(PendingRotation { target, meta }))
}

/// Rotate `target` according to `options`.
///
/// Equivalent to [`plan_rotation`] followed by [`PendingRotation::execute`].
///
/// # Errors
///
/// - Validation errors from [`validate_target`]
/// - [`Error::SameFile`] if the backup destination is the target itself
/// - Any [`atomic_copy`] error; the target is left untouched
/// - [`Error::Truncate`] if truncation fails after a successful backup
///
/// # Example
///
/// ```no_run
/// use purge::{RotateOptions, SizeUnit, rotate};
/// use std::path::Path;
///
/// let report = rotate(Path::new("app.log"), &RotateOptions::new(10, SizeUnit::Megabytes))?;
/// if report.rotated() {
///     println!("rotated");
/// }
/// # Ok::<(), purge::Error>(())
/// ```
pub fn rotate(target: &Path, options: &RotateOptions) -> Result<RotationReport> {
    match plan_rotation(target, options)? {
        RotationPlan::NotRequired { size, threshold } => {
            Ok(RotationReport::NotRequired { size, threshold })
        }
        RotationPlan::Required(pending) => pending.execute(options),
    }
}

/// Whether `dst` names the same file as `target`.
#[cfg(unix)]
fn is_same_file(_target: &Path, target_meta: &Metadata, dst: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(dst)
        .map(|m| m.dev() == target_meta.dev() && m.ino() == target_meta.ino())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_same_file(target: &Path, _target_meta: &Metadata, dst: &Path) -> bool {
    match (target.canonicalize(), dst.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================
