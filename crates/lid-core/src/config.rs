//! Detector configuration and tier selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DetectError, Result};
use crate::model;

/// Model tier selection for a detection call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelector {
    /// Attempt the full model, substituting the lite model for this
    /// call only when full-tier resolution fails and fallback is allowed
    #[default]
    Auto,
    /// Compact bundled model, no network access
    Lite,
    /// Large cached model, downloaded on first use
    Full,
}

impl ModelSelector {
    /// Get the string identifier for this selector
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::Auto => "auto",
            ModelSelector::Lite => "lite",
            ModelSelector::Full => "full",
        }
    }

    /// List all recognized selectors
    pub fn all() -> &'static [ModelSelector] {
        &[ModelSelector::Auto, ModelSelector::Lite, ModelSelector::Full]
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelSelector {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ModelSelector::Auto),
            "lite" | "low" | "small" => Ok(ModelSelector::Lite),
            "full" | "high" | "large" => Ok(ModelSelector::Full),
            _ => Err(DetectError::InvalidModelSelector(s.to_string())),
        }
    }
}

/// Bounds applied to each model download
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Per-attempt connection timeout
    pub connect_timeout: Duration,
    /// Per-attempt stall timeout while reading the body
    pub read_timeout: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            connect_timeout: Duration::from_secs(7),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Immutable configuration for a [`LangDetector`](crate::LangDetector).
///
/// Construct with [`DetectConfig::new`] and the `with_*` setters.
/// Values are fixed once the detector is created.
#[derive(Debug, Clone)]
pub struct DetectConfig {
    pub(crate) cache_dir: PathBuf,
    pub(crate) cache_dir_is_default: bool,
    pub(crate) custom_model_path: Option<PathBuf>,
    pub(crate) proxy: Option<String>,
    pub(crate) verify_hash: Option<String>,
    pub(crate) allow_fallback: bool,
    pub(crate) normalize_input: bool,
    pub(crate) max_input_len: Option<usize>,
    pub(crate) default_selector: ModelSelector,
    pub(crate) download: DownloadOptions,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectConfig {
    /// Create a configuration with default values: cache directory
    /// from `LID_CACHE` (else the system temp directory), checksum
    /// verification on, fallback allowed, input normalization on.
    pub fn new() -> Self {
        Self {
            cache_dir: model::default_cache_dir(),
            cache_dir_is_default: true,
            custom_model_path: None,
            proxy: None,
            verify_hash: Some(model::FULL_MODEL_MD5.to_string()),
            allow_fallback: true,
            normalize_input: true,
            max_input_len: None,
            default_selector: ModelSelector::Auto,
            download: DownloadOptions::default(),
        }
    }

    /// Use a caller-supplied cache directory for the full model.
    ///
    /// Unlike the default cache root, this directory is never created
    /// implicitly; a missing path fails the download step with
    /// [`DetectError::CacheDirNotFound`].
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self.cache_dir_is_default = false;
        self
    }

    /// Use a custom model file instead of the lite/full artifacts.
    ///
    /// The path must exist; this is the only setter that can fail.
    pub fn with_custom_model(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(DetectError::Config(format!(
                "custom model file not found: {}",
                path.display()
            )));
        }
        self.custom_model_path = Some(path);
        Ok(self)
    }

    /// HTTP/HTTPS proxy for model downloads
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Override the expected checksum of the full model, or pass
    /// `None` to disable the (warn-only) integrity check entirely.
    pub fn with_verify_hash(mut self, hash: Option<String>) -> Self {
        self.verify_hash = hash;
        self
    }

    /// Allow or forbid substituting the lite model when full-tier
    /// resolution fails.
    pub fn with_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }

    /// Enable or disable uppercase-input normalization.
    pub fn with_normalize_input(mut self, normalize: bool) -> Self {
        self.normalize_input = normalize;
        self
    }

    /// Truncate inputs longer than `chars` characters before
    /// prediction (logged, never an error).
    pub fn with_max_input_len(mut self, chars: usize) -> Self {
        self.max_input_len = Some(chars);
        self
    }

    /// Default tier used when a call does not specify one.
    pub fn with_default_selector(mut self, selector: ModelSelector) -> Self {
        self.default_selector = selector;
        self
    }

    /// Adjust download retry/timeout bounds.
    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.download = options;
        self
    }

    /// The resolved cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
