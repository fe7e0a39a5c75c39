//! Typed build failures.
//!
//! Everything else travels as `anyhow::Error` with path context attached.
//! These variants are the failures a caller may want to tell apart, so they
//! are wrapped into the `anyhow::Error` and recovered with `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A text marker the patch relies on is absent (template or theme drift).
    #[error("expected marker {marker:?} not found in '{}'", file.display())]
    MarkerNotFound { file: PathBuf, marker: String },

    #[error("packager failed for {variant} (exit code {status}): {stderr}")]
    PackagerFailed {
        variant: String,
        status: i32,
        stderr: String,
    },

    #[error("packager timed out after {timeout_secs}s for {variant}")]
    PackagerTimedOut { variant: String, timeout_secs: u64 },

    #[error("packager '{program}' not found on PATH")]
    PackagerNotFound { program: String },

    #[error("packager succeeded but produced no artifact at '{}'", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("archive entry '{name}' escapes the extraction directory")]
    UnsafeArchiveEntry { name: String },
}
