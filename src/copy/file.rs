//! Atomic single-file copy.
//!
//! The destination is only ever touched by one call: the final rename of a
//! fully written staging file. Every earlier failure leaves the destination
//! exactly as it was and removes the staging file.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result, Step};
use crate::filesystem::{FileStat, Filesystem, StdFs, parent_dir};
use crate::options::CopyOptions;

use super::utils::{copy_in_chunks, copy_metadata};

/// Result of a successful copy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CopyOutcome {
    /// Where the copy was published
    pub destination: PathBuf,
    /// Number of bytes copied
    pub bytes_copied: u64,
}

/// Copy a single file atomically
///
/// Stages the copy in a temporary file next to `dst`, copies permissions and
/// timestamps onto it, then renames it over `dst`. An existing `dst` is
/// replaced only by that rename.
///
/// # Arguments
///
/// * `src` - Source file path
/// * `dst` - Destination file path
/// * `options` - Copy options
///
/// # Errors
///
/// Returns an error if:
/// - Source size or free space cannot be queried ([`Error::SpaceCheck`])
/// - Destination has less free space than the source size ([`Error::InsufficientSpace`])
/// - Source is a directory ([`Error::IsADirectory`])
/// - Any later step fails ([`Error::PermissionDenied`], [`Error::Io`], [`Error::Unexpected`])
///
/// On every error the destination is unchanged and no staging file remains.
///
/// # Example
///
/// ```no_run
/// use purge::{CopyOptions, atomic_copy};
/// use std::path::Path;
///
/// let outcome = atomic_copy(
///     Path::new("/var/log/app.log"),
///     Path::new("/var/log/app_copy1.log"),
///     &CopyOptions::default(),
/// )?;
/// println!("copied {} bytes", outcome.bytes_copied);
/// # Ok::<(), purge::Error>(())
/// ```
pub fn atomic_copy(src: &Path, dst: &Path, options: &CopyOptions) -> Result<CopyOutcome> {
    atomic_copy_with(&StdFs, src, dst, options)
}

/// Copy a single file atomically through the given [`Filesystem`].
///
/// Same contract as [`atomic_copy`].
pub fn atomic_copy_with(
    fs: &dyn Filesystem,
    src: &Path,
    dst: &Path,
    options: &CopyOptions,
) -> Result<CopyOutcome> {
    let sink = options.sink();
    let result = copy_internal(fs, src, dst, options, sink);

    match &result {
        Ok(outcome) => sink.event(&Event::Published {
            source: src,
            destination: dst,
            bytes: outcome.bytes_copied,
        }),
        Err(error) => sink.event(&Event::Failed {
            destination: dst,
            error,
        }),
    }

    result
}

fn copy_internal(
    fs: &dyn Filesystem,
    src: &Path,
    dst: &Path,
    options: &CopyOptions,
    sink: &dyn Diagnostics,
) -> Result<CopyOutcome> {
    let dst_parent = parent_dir(dst);

    // Preflight: nothing is created before these pass
    let src_stat = fs.stat(src).map_err(|source| Error::SpaceCheck {
        path: src.to_path_buf(),
        source,
    })?;
    if src_stat.is_dir {
        return Err(Error::IsADirectory(src.to_path_buf()));
    }

    if options.check_free_space {
        let available = fs
            .available_space(dst_parent)
            .map_err(|source| Error::SpaceCheck {
                path: dst_parent.to_path_buf(),
                source,
            })?;
        sink.event(&Event::SpaceChecked {
            required: src_stat.len,
            available,
        });
        if available < src_stat.len {
            return Err(Error::InsufficientSpace {
                path: dst.to_path_buf(),
                required: src_stat.len,
                available,
            });
        }
    }

    ensure_same_filesystem(fs, dst_parent, dst)?;

    // Stage. From here on the staging file is removed on drop, including
    // during unwinding, unless it is persisted.
    let mut staging = fs
        .create_staging(dst_parent)
        .map_err(|e| Error::at(Step::Create, dst_parent, e))?;
    sink.event(&Event::StagingCreated {
        path: staging.path(),
    });

    let bytes_copied = match fill_staging(fs, src, &src_stat, &mut staging, options, sink) {
        Ok(bytes) => bytes,
        Err(error) => {
            discard(fs, staging, sink);
            return Err(error);
        }
    };

    // Publish
    if let Err(e) = fs.persist(staging, dst) {
        discard(fs, e.file, sink);
        return Err(Error::at(Step::Rename, dst, e.error));
    }

    Ok(CopyOutcome {
        destination: dst.to_path_buf(),
        bytes_copied,
    })
}

/// Transfer bytes and metadata into the staging file.
fn fill_staging(
    fs: &dyn Filesystem,
    src: &Path,
    src_stat: &FileStat,
    staging: &mut NamedTempFile,
    options: &CopyOptions,
    sink: &dyn Diagnostics,
) -> Result<u64> {
    let staging_path = staging.path().to_path_buf();
    let mut src_file = fs
        .open_source(src)
        .map_err(|e| Error::at(Step::Read, src, e))?;

    let bytes = copy_in_chunks(
        fs,
        &mut src_file,
        src,
        staging.as_file_mut(),
        &staging_path,
        options.chunk_size,
        src_stat.len,
        sink,
    )?;

    if options.fsync {
        fs.sync(staging.as_file())
            .map_err(|e| Error::at(Step::Write, &staging_path, e))?;
    }

    copy_metadata(
        fs,
        src_stat,
        &staging_path,
        options.preserve_permissions,
        options.preserve_timestamps,
    )?;
    if options.preserve_permissions || options.preserve_timestamps {
        sink.event(&Event::MetadataCopied {
            path: &staging_path,
        });
    }

    Ok(bytes)
}

/// Delete an unpublished staging file, reporting rather than returning errors.
fn discard(fs: &dyn Filesystem, staging: NamedTempFile, sink: &dyn Diagnostics) {
    let path = staging.path().to_path_buf();
    match fs.remove_staging(staging) {
        Ok(()) => sink.event(&Event::StagingRemoved { path: &path }),
        Err(error) => sink.event(&Event::CleanupFailed {
            path: &path,
            error: &error,
        }),
    }
}

/// Refuse destinations that sit on a different filesystem than their
/// directory (a bind-mounted file, for instance): the rename could not
/// replace them atomically.
fn ensure_same_filesystem(fs: &dyn Filesystem, dst_parent: &Path, dst: &Path) -> Result<()> {
    let dst_dev = match fs.device(dst) {
        Ok(dev) => dev,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::at(Step::Stat, dst, e)),
    };
    let parent_dev = fs
        .device(dst_parent)
        .map_err(|e| Error::at(Step::Stat, dst_parent, e))?;

    match (dst_dev, parent_dev) {
        (Some(a), Some(b)) if a != b => Err(Error::Io {
            step: Step::Rename,
            path: dst.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::CrossesDevices,
                "destination is on a different filesystem than its directory",
            ),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Tests
// =============================================================================
