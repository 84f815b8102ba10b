//! # purge
//!
//! Size-triggered log rotation with crash-safe atomic backups.
//!
//! ## Core Features
//!
//! - **Atomic copies**: Bytes are staged in a temporary file next to the
//!   destination and published with a single rename; the destination is either
//!   the old file or the complete new one, never a partial write
//! - **Always cleans up**: The staging file is removed on every failure path,
//!   including panics
//! - **Space preflight**: Free space is checked before anything is created
//! - **Bounded memory**: Data moves in fixed-size chunks (8 KiB by default)
//! - **Metadata preserving**: Permission bits and timestamps follow the copy
//! - **Rotation**: Back a file up once it reaches a size threshold, then truncate it
//! - **Pluggable diagnostics**: Every step is reported to an injected sink
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use purge::{RotationBuilder, SizeUnit};
//!
//! // Copy app.log to app_copy<n>.log and truncate it once it reaches 10 MB
//! let report = RotationBuilder::new("app.log")
//!     .threshold(10, SizeUnit::Megabytes)
//!     .run()?;
//! println!("rotated: {}", report.rotated());
//! # Ok::<(), purge::Error>(())
//! ```
//!
//! ## Function API
//!
//! The copy engine can be used on its own:
//!
//! ```no_run
//! use purge::{CopyOptions, atomic_copy};
//! use std::path::Path;
//!
//! let options = CopyOptions::default()
//!     .with_chunk_size(64 * 1024)
//!     .without_fsync(); // Faster but less durable
//!
//! let outcome = atomic_copy(Path::new("app.log"), Path::new("backup/app.log"), &options)?;
//! println!("copied {} bytes", outcome.bytes_copied);
//! # Ok::<(), purge::Error>(())
//! ```
//!
//! ## Safety Guarantees
//!
//! ### Atomic Writes
//!
//! The staging file is created in the destination's directory, so the final
//! rename never crosses filesystems. A destination that is itself a mount point
//! on another device is refused before staging.
//!
//! ### Truncate Only After Backup
//!
//! [`rotate`] truncates the target only after its backup has been published.
//! Any copy error leaves the target untouched.
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `progress` | Progress bar support with indicatif |
//! | `tracing` | Structured logging with tracing crate |
//! | `serde` | Serialize/Deserialize for options and reports |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod copy;
mod diagnostics;
mod error;
mod filesystem;
mod options;
mod rotate;

#[cfg(feature = "progress")]
mod progress;

pub use builder::RotationBuilder;
pub use copy::{CopyOutcome, atomic_copy, atomic_copy_with};
pub use diagnostics::{Diagnostics, Event, NoopDiagnostics, Severity};
pub use error::{Error, ErrorCode, Result, Step, is_no_space_error};
pub use filesystem::{FileStat, Filesystem, STAGING_SUFFIX, StdFs};
pub use options::{
    CopyOptions, DEFAULT_CHUNK_SIZE, DestinationPolicy, ParseSizeUnitError, RotateOptions,
    SizeUnit,
};
pub use rotate::{
    PendingRotation, RotationPlan, RotationReport, generate_destination, plan_rotation, rotate,
    truncate, validate_target,
};

#[cfg(feature = "tracing")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
pub use diagnostics::TracingDiagnostics;

#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
pub use progress::{ProgressDiagnostics, create_progress_bar};
