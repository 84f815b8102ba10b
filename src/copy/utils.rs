//! Helpers for the copy engine: chunked transfer and metadata propagation.

use std::fs::File;
use std::path::Path;

use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result, Step};
use crate::filesystem::{FileStat, Filesystem};

// =============================================================================
// File content copying
// =============================================================================

/// Copy `src_file` into `dst_file` in chunks of `chunk_size` bytes.
///
/// Returns the number of bytes copied. Peak memory is one chunk regardless of
/// the source size.
#[allow(clippy::too_many_arguments)]
pub(crate) fn copy_in_chunks(
    fs: &dyn Filesystem,
    src_file: &mut File,
    src: &Path,
    dst_file: &mut File,
    dst: &Path,
    chunk_size: usize,
    expected: u64,
    sink: &dyn Diagnostics,
) -> Result<u64> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut copied: u64 = 0;

    loop {
        let n = fs
            .read_chunk(src_file, &mut buf)
            .map_err(|e| Error::at(Step::Read, src, e))?;
        if n == 0 {
            break;
        }

        fs.write_chunk(dst_file, &buf[..n])
            .map_err(|e| Error::at(Step::Write, dst, e))?;
        copied += n as u64;

        sink.event(&Event::ChunkWritten {
            bytes: n,
            total: copied,
            expected,
        });
    }

    Ok(copied)
}

// =============================================================================
// Metadata
// =============================================================================

/// Copy permission bits and timestamps of the source onto `staging`.
///
/// Permissions go first; changing them does not touch mtime, so the
/// timestamps set afterwards are the ones the destination ends up with.
pub(crate) fn copy_metadata(
    fs: &dyn Filesystem,
    src_stat: &FileStat,
    staging: &Path,
    preserve_permissions: bool,
    preserve_timestamps: bool,
) -> Result<()> {
    if preserve_permissions {
        fs.set_permissions(staging, src_stat.permissions.clone())
            .map_err(|e| Error::at(Step::Metadata, staging, e))?;
    }

    if preserve_timestamps {
        fs.set_times(staging, src_stat.accessed, src_stat.modified)
            .map_err(|e| Error::at(Step::Metadata, staging, e))?;
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
