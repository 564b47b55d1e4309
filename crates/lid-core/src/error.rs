//! Error taxonomy for model resolution and detection.
//!
//! Every failure class callers may want to branch on gets its own
//! variant. Fallback logic in the detector matches on these kinds
//! rather than inspecting message strings.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Errors raised by model resolution, loading, and detection.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Invalid configuration, raised at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Model file absent and no way to obtain it.
    #[error("model file not found: {path}")]
    ModelNotFound { path: PathBuf },

    /// Caller-supplied cache directory does not exist.
    ///
    /// Only the default cache root may be auto-created; arbitrary
    /// caller paths are never written to implicitly.
    #[error("cache directory not found: {path}")]
    CacheDirNotFound { path: PathBuf },

    /// Download retries exhausted, network unreachable, or proxy rejected.
    #[error("download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The classifier rejected the model binary after all load
    /// strategies were exhausted.
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Insufficient memory to hold the model. Recoverable via the
    /// lite-tier fallback when the caller permits it.
    #[error("model too large for available memory: {reason}")]
    OutOfMemory { reason: String },

    /// Tier argument was none of `auto`, `lite`, `full`.
    #[error("unknown model selector `{0}` (expected auto, lite, or full)")]
    InvalidModelSelector(String),

    /// The classifier rejected the input text. Distinct from model
    /// loading failures: the handle was obtained, the predict call failed.
    #[error("language detection failed: {0}")]
    Detection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DetectError {
    /// Whether resolving the lite tier instead may succeed.
    ///
    /// Detection-call failures and configuration errors are excluded:
    /// substituting a smaller model cannot fix either.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            DetectError::ModelNotFound { .. }
                | DetectError::DownloadFailed { .. }
                | DetectError::ModelLoad { .. }
                | DetectError::OutOfMemory { .. }
        )
    }
}
