//! Model loading with platform-aware path strategies.
//!
//! The actual binary parse is delegated to the fastText library; this
//! module's job is getting a path that library can open. Some
//! platforms (Windows in particular) fail on paths with non-ASCII
//! characters, so loading runs through an ordered list of strategies
//! with uniform success/failure signaling instead of a hard-coded
//! platform branch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fasttext::FastText;

use crate::config::DownloadOptions;
use crate::error::{DetectError, Result};
use crate::model::{download, verify};

/// A single ranked (label, score) pair as produced by the classifier,
/// before any post-processing.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// Opaque loaded classifier instance.
///
/// Implementations must be safe to share for concurrent predict calls;
/// the handle is published once into a detector's cache and read-only
/// afterwards.
pub trait Classifier: Send + Sync {
    /// Predict up to `k` labels above `threshold` for a single line of text.
    fn predict(
        &self,
        text: &str,
        k: i32,
        threshold: f32,
    ) -> std::result::Result<Vec<Prediction>, String>;
}

impl Classifier for FastText {
    fn predict(
        &self,
        text: &str,
        k: i32,
        threshold: f32,
    ) -> std::result::Result<Vec<Prediction>, String> {
        let predictions = FastText::predict(self, text, k, threshold)?;
        Ok(predictions
            .into_iter()
            .map(|p| Prediction {
                label: p.label,
                score: p.prob,
            })
            .collect())
    }
}

/// Shared handle to a loaded classifier
pub type ModelHandle = Arc<dyn Classifier>;

/// Resolution seam between the detector's cache and the filesystem.
///
/// The production implementation is [`ModelLoader`]; tests substitute
/// stub resolvers to exercise fallback and cache behavior without
/// model artifacts.
pub(crate) trait ModelResolver: Send + Sync {
    fn load_local(&self, path: &Path, verify_hash: Option<&str>) -> Result<ModelHandle>;

    fn load_with_download(
        &self,
        path: &Path,
        url: &str,
        proxy: Option<&str>,
        options: &DownloadOptions,
        verify_hash: Option<&str>,
    ) -> Result<ModelHandle>;
}

/// Ordered path strategies attempted by [`ModelLoader::load_local`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadStrategy {
    /// Absolute path, as given
    Direct,
    /// Path relative to the current working directory
    RelativeToCwd,
    /// Copy to a temp file with a guaranteed-safe name, load from there
    TempCopy,
}

fn load_strategies() -> &'static [LoadStrategy] {
    if cfg!(windows) {
        &[
            LoadStrategy::Direct,
            LoadStrategy::RelativeToCwd,
            LoadStrategy::TempCopy,
        ]
    } else {
        &[LoadStrategy::Direct]
    }
}

/// Loads model files into classifier handles.
///
/// Keeps a count of successful loads so callers can assert the
/// at-most-one-load-per-tier cache property.
pub struct ModelLoader {
    load_count: AtomicUsize,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader {
    pub fn new() -> Self {
        Self {
            load_count: AtomicUsize::new(0),
        }
    }

    /// Number of successful model loads performed by this loader
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Load a model from a local file.
    ///
    /// An optional expected checksum is compared first; a mismatch is
    /// logged as a warning and the load still proceeds.
    pub fn load_local(&self, path: &Path, verify_hash: Option<&str>) -> Result<ModelHandle> {
        if !super::model_exists(path) {
            return Err(DetectError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        if let Some(expected) = verify_hash {
            match verify::verify(path, expected) {
                Ok(true) => {}
                Ok(false) => eprintln!(
                    "Warning: checksum mismatch for {}. This may affect prediction accuracy.",
                    path.display()
                ),
                Err(e) => eprintln!(
                    "Warning: could not verify {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        let mut last_reason = String::new();
        for strategy in load_strategies() {
            match self.try_strategy(*strategy, path) {
                Ok(handle) => {
                    self.load_count.fetch_add(1, Ordering::SeqCst);
                    return Ok(handle);
                }
                Err(reason) => {
                    crate::verbose!(
                        "Load strategy {:?} failed for {}: {}",
                        strategy,
                        path.display(),
                        reason
                    );
                    last_reason = reason;
                }
            }
        }

        Err(classify_load_error(path, last_reason))
    }

    /// Download the model first if absent, then load it.
    pub fn load_with_download(
        &self,
        path: &Path,
        url: &str,
        proxy: Option<&str>,
        options: &DownloadOptions,
        verify_hash: Option<&str>,
    ) -> Result<ModelHandle> {
        if !path.exists() {
            download::fetch(url, path, proxy, options)?;
        }
        self.load_local(path, verify_hash)
    }

    fn try_strategy(
        &self,
        strategy: LoadStrategy,
        path: &Path,
    ) -> std::result::Result<ModelHandle, String> {
        match strategy {
            LoadStrategy::Direct => load_fasttext(path),
            LoadStrategy::RelativeToCwd => {
                let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
                let relative = relative_to(path, &cwd)
                    .ok_or_else(|| "no relative form for path".to_string())?;
                load_fasttext(&relative)
            }
            LoadStrategy::TempCopy => {
                let copy = TempCopy::create(path)?;
                // Guard cleans up on every exit path, including errors
                load_fasttext(copy.path())
            }
        }
    }
}

impl ModelResolver for ModelLoader {
    fn load_local(&self, path: &Path, verify_hash: Option<&str>) -> Result<ModelHandle> {
        ModelLoader::load_local(self, path, verify_hash)
    }

    fn load_with_download(
        &self,
        path: &Path,
        url: &str,
        proxy: Option<&str>,
        options: &DownloadOptions,
        verify_hash: Option<&str>,
    ) -> Result<ModelHandle> {
        ModelLoader::load_with_download(self, path, url, proxy, options, verify_hash)
    }
}

fn load_fasttext(path: &Path) -> std::result::Result<ModelHandle, String> {
    let path_str = path
        .to_str()
        .ok_or_else(|| "model path is not valid UTF-8".to_string())?;
    let mut model = FastText::new();
    model.load_model(path_str)?;
    Ok(Arc::new(model))
}

/// Express `path` relative to `base` when `path` sits below it
fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Map the library's final load failure onto a typed error kind.
///
/// fastText reports failures as strings, so the memory class has to be
/// recognized here, once, at the boundary; everything downstream
/// branches on the typed variant.
fn classify_load_error(path: &Path, reason: String) -> DetectError {
    let lower = reason.to_lowercase();
    if lower.contains("memory") || lower.contains("alloc") {
        DetectError::OutOfMemory { reason }
    } else {
        DetectError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        }
    }
}

/// Scoped temp copy of a model file under a guaranteed-safe name.
///
/// Removal runs on drop; a failed removal is logged and the file left
/// behind in the temp directory.
struct TempCopy {
    path: PathBuf,
}

impl TempCopy {
    fn create(source: &Path) -> std::result::Result<Self, String> {
        let file = tempfile::Builder::new()
            .prefix("lid-model-")
            .suffix(".bin")
            .tempfile()
            .map_err(|e| format!("failed to create temp file: {}", e))?;
        // Detach from NamedTempFile so the library can reopen the path
        let (_, path) = file
            .keep()
            .map_err(|e| format!("failed to persist temp file: {}", e))?;
        if let Err(e) = std::fs::copy(source, &path) {
            let guard = Self { path };
            drop(guard);
            return Err(format!("failed to copy model to temp file: {}", e));
        }
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCopy {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if self.path.exists() {
                // TODO: on Windows, schedule delete-on-reboot via
                // MoveFileExW(MOVEFILE_DELAY_UNTIL_REBOOT) when the
                // file is still mapped by the classifier.
                eprintln!(
                    "Warning: failed to delete temporary model file {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_model_not_found() {
        let loader = ModelLoader::new();
        let missing = std::env::temp_dir().join("lid-loader-missing.bin");
        let err = loader.load_local(&missing, None).err().unwrap();
        assert!(matches!(err, DetectError::ModelNotFound { path } if path == missing));
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn garbage_file_is_model_load_error() {
        let loader = ModelLoader::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a fasttext model").unwrap();
        let err = loader.load_local(file.path(), None).err().unwrap();
        assert!(matches!(
            err,
            DetectError::ModelLoad { .. } | DetectError::OutOfMemory { .. }
        ));
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn memory_errors_are_classified() {
        let path = Path::new("/tmp/model.bin");
        assert!(matches!(
            classify_load_error(path, "std::bad_alloc".into()),
            DetectError::OutOfMemory { .. }
        ));
        assert!(matches!(
            classify_load_error(path, "cannot allocate memory".into()),
            DetectError::OutOfMemory { .. }
        ));
        assert!(matches!(
            classify_load_error(path, "has wrong file format".into()),
            DetectError::ModelLoad { .. }
        ));
    }

    #[test]
    fn temp_copy_cleans_up() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        source.write_all(b"model bytes").unwrap();

        let copied_path;
        {
            let copy = TempCopy::create(source.path()).unwrap();
            copied_path = copy.path().to_path_buf();
            assert!(copied_path.exists());
        }
        assert!(!copied_path.exists());
    }

    #[test]
    fn relative_form_requires_shared_prefix() {
        let base = Path::new("/home/user/project");
        assert_eq!(
            relative_to(Path::new("/home/user/project/models/lid.bin"), base),
            Some(PathBuf::from("models/lid.bin"))
        );
        assert_eq!(relative_to(Path::new("/var/models/lid.bin"), base), None);
    }
}
