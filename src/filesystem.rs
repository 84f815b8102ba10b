//! Filesystem collaborator used by the copy engine.
//!
//! Every call the engine makes across the process boundary goes through the
//! [`Filesystem`] trait. [`StdFs`] is the real implementation; tests wrap it
//! to inject failures at chosen steps.

use std::fs::{self, File, Permissions};
use std::io::{self, Read, Write};
use std::path::Path;

use filetime::{FileTime, set_file_times};
use tempfile::{NamedTempFile, PersistError};

/// Suffix of staging files.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Metadata of a source file, captured once during preflight.
#[derive(Debug, Clone)]
pub struct FileStat {
    /// Size in bytes
    pub len: u64,
    /// Whether the path is a directory
    pub is_dir: bool,
    /// Permission bits
    pub permissions: Permissions,
    /// Last modification time
    pub modified: FileTime,
    /// Last access time
    pub accessed: FileTime,
}

impl From<&fs::Metadata> for FileStat {
    fn from(meta: &fs::Metadata) -> Self {
        Self {
            len: meta.len(),
            is_dir: meta.is_dir(),
            permissions: meta.permissions(),
            modified: FileTime::from_last_modification_time(meta),
            accessed: FileTime::from_last_access_time(meta),
        }
    }
}

/// Filesystem operations needed by the atomic copy protocol.
///
/// All methods take `&self`; implementations must be usable from several
/// threads at once.
pub trait Filesystem: Send + Sync {
    /// Metadata of `path`, following symlinks.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Device identifier of `path` without following symlinks.
    ///
    /// `Ok(None)` when the platform has no such notion.
    fn device(&self, path: &Path) -> io::Result<Option<u64>>;

    /// Free space available to unprivileged users on the filesystem of `dir`.
    fn available_space(&self, dir: &Path) -> io::Result<u64>;

    /// Open `path` for reading.
    fn open_source(&self, path: &Path) -> io::Result<File>;

    /// Create a new, uniquely named staging file in `dir`.
    fn create_staging(&self, dir: &Path) -> io::Result<NamedTempFile>;

    /// Read up to `buf.len()` bytes; `Ok(0)` means end of file.
    fn read_chunk(&self, src: &mut File, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf`.
    fn write_chunk(&self, dst: &mut File, buf: &[u8]) -> io::Result<()>;

    /// Flush file data and metadata to disk.
    fn sync(&self, file: &File) -> io::Result<()>;

    /// Set permission bits of `path`.
    fn set_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()>;

    /// Set access and modification times of `path`.
    fn set_times(&self, path: &Path, accessed: FileTime, modified: FileTime) -> io::Result<()>;

    /// Atomically rename `staging` over `dst`, replacing any existing file.
    ///
    /// On failure the staging file is handed back in the error.
    fn persist(&self, staging: NamedTempFile, dst: &Path) -> Result<(), PersistError>;

    /// Delete a staging file that will not be published.
    fn remove_staging(&self, staging: NamedTempFile) -> io::Result<()>;
}

/// [`Filesystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl Filesystem for StdFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        fs::metadata(path).map(|meta| FileStat::from(&meta))
    }

    #[cfg(unix)]
    fn device(&self, path: &Path) -> io::Result<Option<u64>> {
        use std::os::unix::fs::MetadataExt;
        fs::symlink_metadata(path).map(|meta| Some(meta.dev()))
    }

    #[cfg(not(unix))]
    fn device(&self, path: &Path) -> io::Result<Option<u64>> {
        fs::symlink_metadata(path).map(|_| None)
    }

    fn available_space(&self, dir: &Path) -> io::Result<u64> {
        fs2::available_space(dir)
    }

    fn open_source(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn create_staging(&self, dir: &Path) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .suffix(STAGING_SUFFIX)
            .tempfile_in(dir)
    }

    fn read_chunk(&self, src: &mut File, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match src.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    fn write_chunk(&self, dst: &mut File, buf: &[u8]) -> io::Result<()> {
        dst.write_all(buf)
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    fn set_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()> {
        fs::set_permissions(path, permissions)
    }

    fn set_times(&self, path: &Path, accessed: FileTime, modified: FileTime) -> io::Result<()> {
        set_file_times(path, accessed, modified)
    }

    fn persist(&self, staging: NamedTempFile, dst: &Path) -> Result<(), PersistError> {
        staging.persist(dst).map(drop)
    }

    fn remove_staging(&self, staging: NamedTempFile) -> io::Result<()> {
        staging.close()
    }
}

/// Directory a path lives in; a bare file name lives in the current directory.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
