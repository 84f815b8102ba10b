//! Error types for purge.
//!
//! This module provides the [`Error`] enum containing every failure the
//! copy engine and the rotation workflow can report, the [`Step`] at which a
//! copy failure happened, and the [`ErrorCode`] used for machine-readable
//! output.
//!
//! # Error Categories
//!
//! | Category | Errors |
//! |----------|--------|
//! | Preflight | [`Error::SpaceCheck`], [`Error::InsufficientSpace`] |
//! | Copy steps | [`Error::PermissionDenied`], [`Error::Io`], [`Error::Unexpected`] |
//! | Validation | [`Error::TargetNotFound`], [`Error::IsADirectory`], [`Error::IsASymlink`], [`Error::NotAFile`], [`Error::SameFile`] |
//! | Rotation | [`Error::Truncate`] |

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for purge operations.
///
/// This is a type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Check if an IO error indicates "no space left on device".
///
/// # Platform Support
///
/// | Platform | Error Detection |
/// |----------|-----------------|
/// | Unix | `ENOSPC` |
/// | Windows | `ERROR_DISK_FULL` (0x70) |
///
/// # Example
///
/// ```
/// use std::io;
/// use purge::is_no_space_error;
///
/// let error = io::Error::new(io::ErrorKind::StorageFull, "disk full");
/// assert!(is_no_space_error(&error));
/// ```
pub fn is_no_space_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            return raw_error == libc::ENOSPC;
        }
    }

    #[cfg(windows)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ERROR_DISK_FULL: i32 = 112;
            return raw_error == ERROR_DISK_FULL;
        }
    }

    false
}

/// The step of the copy protocol at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Step {
    /// Querying source metadata or destination free space
    Stat,
    /// Creating the staging file
    Create,
    /// Reading from the source
    Read,
    /// Writing to (or syncing) the staging file
    Write,
    /// Copying permissions and timestamps onto the staging file
    Metadata,
    /// Renaming the staging file over the destination
    Rename,
}

impl Step {
    /// Stable lowercase name of the step.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Create => "create",
            Self::Read => "read",
            Self::Write => "write",
            Self::Metadata => "metadata",
            Self::Rename => "rename",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Source size or destination free space could not be queried
    SpaceCheckFailed,
    /// Destination filesystem has less free space than the source size
    InsufficientSpace,
    /// The OS refused access at some step
    PermissionDenied,
    /// An OS-level I/O failure at some step
    IoError,
    /// A failure that does not originate from the OS
    Unexpected,
    /// The rotation target does not exist
    TargetNotFound,
    /// The path is not something purge operates on
    InvalidInput,
    /// Truncating the target failed after the backup was made
    TruncateFailed,
}

impl ErrorCode {
    /// Stable snake_case name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpaceCheckFailed => "space_check_failed",
            Self::InsufficientSpace => "insufficient_space",
            Self::PermissionDenied => "permission_denied",
            Self::IoError => "io_error",
            Self::Unexpected => "unexpected",
            Self::TargetNotFound => "target_not_found",
            Self::InvalidInput => "invalid_input",
            Self::TruncateFailed => "truncate_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during copy and rotation operations.
///
/// All errors include the path involved and, where the OS reported one, the
/// underlying [`io::Error`] as their source.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Source size or destination free space could not be queried
    #[error("Cannot check available space for {path}: {source}")]
    SpaceCheck {
        /// Path whose query failed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Not enough free space at the destination
    ///
    /// Reported before any staging file is created.
    #[error("Not enough space to copy to {path}: {required} bytes required, {available} available")]
    InsufficientSpace {
        /// Destination path
        path: PathBuf,
        /// Size of the source in bytes
        required: u64,
        /// Free space of the destination filesystem in bytes
        available: u64,
    },

    /// Permission denied at a copy step
    #[error("Permission denied during {step} of {path}: {source}")]
    PermissionDenied {
        /// Step that failed
        step: Step,
        /// Path involved in the failing call
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// I/O error at a copy step
    #[error("I/O error during {step} of {path}: {source}")]
    Io {
        /// Step that failed
        step: Step,
        /// Path involved in the failing call
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Failure that does not come from the OS, such as a short write
    #[error("Unexpected error during {step} of {path}: {source}")]
    Unexpected {
        /// Step that failed
        step: Step,
        /// Path involved in the failing call
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Target path does not exist
    #[error("Target does not exist: {0}")]
    TargetNotFound(PathBuf),

    /// Path is a directory
    #[error("Path is a directory: {0}")]
    IsADirectory(PathBuf),

    /// Path is a symbolic link
    #[error("Path is a symbolic link: {0}")]
    IsASymlink(PathBuf),

    /// Path is neither a regular file, a directory nor a symlink
    #[error("Path is not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Backup destination refers to the rotation target itself
    #[error("Backup destination is the target itself: {0}")]
    SameFile(PathBuf),

    /// Truncating the target failed
    #[error("Cannot truncate {path}: {source}")]
    Truncate {
        /// Target path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
}

impl Error {
    /// Classify an IO error raised at `step` of the copy protocol.
    pub(crate) fn at(step: Step, path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { step, path, source }
        } else if source.raw_os_error().is_some() || is_os_io_kind(source.kind()) {
            Self::Io { step, path, source }
        } else {
            Self::Unexpected { step, path, source }
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SpaceCheck { .. } => ErrorCode::SpaceCheckFailed,
            Self::InsufficientSpace { .. } => ErrorCode::InsufficientSpace,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::Io { .. } => ErrorCode::IoError,
            Self::Unexpected { .. } => ErrorCode::Unexpected,
            Self::TargetNotFound(_) => ErrorCode::TargetNotFound,
            Self::IsADirectory(_) | Self::IsASymlink(_) | Self::NotAFile(_) | Self::SameFile(_) => {
                ErrorCode::InvalidInput
            }
            Self::Truncate { .. } => ErrorCode::TruncateFailed,
        }
    }

    /// The copy step at which this error occurred, if it is a step failure.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::SpaceCheck { .. } | Self::InsufficientSpace { .. } => Some(Step::Stat),
            Self::PermissionDenied { step, .. }
            | Self::Io { step, .. }
            | Self::Unexpected { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Whether this error was produced by the atomic copy engine.
    ///
    /// Copy failures leave the destination untouched, so a rotation that
    /// hits one must not go on to truncate the target.
    pub fn is_copy_failure(&self) -> bool {
        self.step().is_some()
    }

    /// Whether the underlying OS error is "no space left on device".
    pub fn is_no_space(&self) -> bool {
        match self {
            Self::InsufficientSpace { .. } => true,
            Self::Io { source, .. } | Self::Truncate { source, .. } => is_no_space_error(source),
            _ => false,
        }
    }
}

/// IO error kinds that denote a genuine filesystem failure even when the
/// error carries no raw OS code.
fn is_os_io_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::NotFound
            | io::ErrorKind::AlreadyExists
            | io::ErrorKind::StorageFull
            | io::ErrorKind::ReadOnlyFilesystem
            | io::ErrorKind::CrossesDevices
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}
