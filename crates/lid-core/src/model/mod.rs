//! Model Management Module
//!
//! This module provides download, verification, and loading utilities
//! for the language identification models.
//!
//! # Architecture
//!
//! ```text
//! ModelTier
//!   ├── Lite  - compact bundled artifact, no network access
//!   └── Full  - large artifact in the cache directory, downloaded on demand
//!
//! Operations
//!   ├── download::fetch()       - bounded-retry download, skip if present
//!   ├── verify::verify()        - chunked MD5 check (warn-only at call sites)
//!   └── loader::ModelLoader     - strategy-based load with download support
//! ```

pub mod download;
pub mod loader;
pub mod verify;

use std::path::{Path, PathBuf};

pub use loader::{ModelHandle, ModelLoader};

/// Download URL for the full model artifact
pub const FULL_MODEL_URL: &str =
    "https://dl.fbaipublicfiles.com/fasttext/supervised-models/lid.176.bin";

/// Well-known filename of the full model inside the cache directory
pub const FULL_MODEL_NAME: &str = "lid.176.bin";

/// Published MD5 of the full model, checked as a warning only
pub const FULL_MODEL_MD5: &str = "01810bc59c6a3d2b79c79e6336612f65";

/// Filename of the compact model shipped with the crate
pub const LITE_MODEL_NAME: &str = "lid.176.ftz";

/// Environment variable overriding the cache directory
pub const CACHE_ENV: &str = "LID_CACHE";

/// Environment variable overriding the lite model location
pub const LITE_MODEL_ENV: &str = "LID_LITE_MODEL";

/// Model tiers available to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Compact, bundled, lower accuracy
    Lite,
    /// Large, cached/downloaded, higher accuracy
    Full,
}

impl ModelTier {
    /// Get the string identifier for this tier
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Lite => "lite",
            ModelTier::Full => "full",
        }
    }
}

/// Description of a known model artifact
pub struct ModelInfo {
    pub tier: ModelTier,
    pub name: &'static str,
    pub description: &'static str,
    pub size_mb: Option<u64>,
    pub url: Option<&'static str>,
}

/// Known model artifacts
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        tier: ModelTier::Lite,
        name: LITE_MODEL_NAME,
        description: "~1 MB - Compressed model, bundled, lower accuracy",
        size_mb: Some(1),
        url: None,
    },
    ModelInfo {
        tier: ModelTier::Full,
        name: FULL_MODEL_NAME,
        description: "~126 MB - Original model, downloaded on first use",
        size_mb: Some(126),
        url: Some(FULL_MODEL_URL),
    },
];

/// Get the default cache directory for the full model.
///
/// Resolution order: `LID_CACHE` environment override, else a
/// well-known directory under the system temp root so the artifact is
/// reused across process restarts.
pub fn default_cache_dir() -> PathBuf {
    match std::env::var_os(CACHE_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join("fasttext-langdetect"),
    }
}

/// Get the path of the compact model shipped alongside the crate.
///
/// `LID_LITE_MODEL` overrides the bundled location.
pub fn lite_model_path() -> PathBuf {
    match std::env::var_os(LITE_MODEL_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("resources")
            .join(LITE_MODEL_NAME),
    }
}

/// Get the full model path inside a cache directory
pub fn full_model_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(FULL_MODEL_NAME)
}

/// Check if a model exists at the given path
pub fn model_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}
