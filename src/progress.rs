//! Progress reporting support (requires `progress` feature)

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::diagnostics::{Diagnostics, Event};

/// Create a default progress bar for copying `total` bytes
#[must_use]
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Sink that advances a progress bar as chunks are written.
///
/// Every event is also passed on to the wrapped sink.
///
/// # Example
///
/// ```no_run
/// use purge::{CopyOptions, NoopDiagnostics, ProgressDiagnostics, atomic_copy, create_progress_bar};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let bar = create_progress_bar(std::fs::metadata("app.log")?.len());
/// let sink = ProgressDiagnostics::new(bar.clone(), Arc::new(NoopDiagnostics));
/// let options = CopyOptions::default().with_diagnostics(Arc::new(sink));
/// atomic_copy(Path::new("app.log"), Path::new("app_copy1.log"), &options)?;
/// bar.finish();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ProgressDiagnostics {
    bar: ProgressBar,
    inner: Arc<dyn Diagnostics>,
}

impl ProgressDiagnostics {
    /// Wrap `inner`, reporting written bytes on `bar`.
    pub fn new(bar: ProgressBar, inner: Arc<dyn Diagnostics>) -> Self {
        Self { bar, inner }
    }

    /// The progress bar being advanced.
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl std::fmt::Debug for ProgressDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDiagnostics")
            .field("position", &self.bar.position())
            .finish_non_exhaustive()
    }
}

impl Diagnostics for ProgressDiagnostics {
    fn event(&self, event: &Event<'_>) {
        match event {
            Event::ChunkWritten {
                bytes, expected, ..
            } => {
                if self.bar.length() != Some(*expected) {
                    self.bar.set_length(*expected);
                }
                self.bar.inc(*bytes as u64);
            }
            Event::Failed { .. } => self.bar.abandon(),
            _ => {}
        }
        self.inner.event(event);
    }
}
