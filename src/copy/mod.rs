//! Atomic copy engine.
//!
//! This module provides [`atomic_copy`], which copies one file so that the
//! destination is either untouched or a complete copy, never a partial one.

mod file;
mod utils;

// Re-export public API
pub use file::{CopyOutcome, atomic_copy, atomic_copy_with};
