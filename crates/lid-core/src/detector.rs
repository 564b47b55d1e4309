//! Language detection facade.
//!
//! Owns the per-tier model cache, resolves configuration, prepares
//! input for the classifier, and post-processes its output. Model
//! resolution (verify/download/load) is delegated to
//! [`ModelLoader`](crate::model::ModelLoader).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::{DetectConfig, ModelSelector};
use crate::error::{DetectError, Result};
use crate::model::loader::{ModelHandle, ModelLoader, ModelResolver};
use crate::model::{self, ModelTier};

/// Label prefix the classifier attaches to every prediction
const LABEL_PREFIX: &str = "__label__";

/// Inputs longer than this are statistically unreliable; logged only
const LONG_INPUT_HINT: usize = 100;

/// A detected language with its confidence score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    /// Bare language code, e.g. `en`, `zh`
    pub lang: String,
    /// Confidence in `[0, 1]`
    pub score: f32,
}

/// Per-call detection options
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Tier selection; `None` uses the configured default
    pub model: Option<ModelSelector>,
    /// Number of top languages to return (0 means 1)
    pub k: usize,
    /// Minimum confidence threshold
    pub threshold: f32,
}

impl DetectOptions {
    fn k(&self) -> usize {
        self.k.max(1)
    }
}

/// Language detector with a per-instance model cache.
///
/// Each detector owns its tier→handle map; handles are loaded at most
/// once per tier per instance and live until the detector is dropped.
/// The shared default instance used by the top-level functions lives
/// for the whole process.
pub struct LangDetector {
    config: DetectConfig,
    loader: Arc<dyn ModelResolver>,
    models: Mutex<HashMap<ModelTier, ModelHandle>>,
}

impl Default for LangDetector {
    fn default() -> Self {
        Self::new(DetectConfig::new())
    }
}

impl LangDetector {
    /// Create a detector with the given configuration
    pub fn new(config: DetectConfig) -> Self {
        Self {
            config,
            loader: Arc::new(ModelLoader::new()),
            models: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_resolver(config: DetectConfig, loader: Arc<dyn ModelResolver>) -> Self {
        Self {
            config,
            loader,
            models: Mutex::new(HashMap::new()),
        }
    }

    /// Detect the language(s) of `text`.
    ///
    /// Returns up to `k` results sorted by descending score. Scores
    /// are clamped to `[0, 1]`; the classifier's internal label prefix
    /// is stripped.
    pub fn detect(&self, text: &str, options: &DetectOptions) -> Result<Vec<Detection>> {
        let text = self.preprocess(text);
        let text = self.normalize(text);

        let handle = self.resolve(options.model.unwrap_or(self.config.default_selector))?;

        let predictions = handle
            .predict(&text, options.k() as i32, options.threshold)
            .map_err(DetectError::Detection)?;

        let mut results: Vec<Detection> = predictions
            .into_iter()
            .map(|p| Detection {
                lang: p
                    .label
                    .strip_prefix(LABEL_PREFIX)
                    .unwrap_or(&p.label)
                    .to_string(),
                score: p.score.clamp(0.0, 1.0),
            })
            .collect();

        // Stable sort keeps the classifier's own order on ties
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(options.k());
        Ok(results)
    }

    /// Convenience wrapper returning up to `k` languages
    pub fn detect_multilingual(&self, text: &str, k: usize) -> Result<Vec<Detection>> {
        self.detect(
            text,
            &DetectOptions {
                k,
                ..DetectOptions::default()
            },
        )
    }

    /// Detect the dominant language as an uppercase two-letter code.
    ///
    /// Returns `EN` when the classifier produces no result. A `JA`
    /// verdict over text containing no kana is reported as `ZH`: the
    /// two scripts share han characters and kana is the distinguishing
    /// signal.
    pub fn detect_language(&self, text: &str) -> Result<String> {
        let results = self.detect(text, &DetectOptions::default())?;
        let code = match results.first() {
            Some(detection) => detection.lang.to_uppercase(),
            None => "EN".to_string(),
        };
        if code == "JA" && !contains_kana(text) {
            return Ok("ZH".to_string());
        }
        Ok(code)
    }

    /// Resolve a handle for the selector, applying fallback policy.
    fn resolve(&self, selector: ModelSelector) -> Result<ModelHandle> {
        match selector {
            ModelSelector::Lite => self.get_or_load(ModelTier::Lite),
            ModelSelector::Full | ModelSelector::Auto => {
                match self.get_or_load(ModelTier::Full) {
                    Ok(handle) => Ok(handle),
                    Err(e) if self.config.allow_fallback && e.is_fallback_eligible() => {
                        // One-shot substitution: the failure is not cached,
                        // the next full-tier request retries the full model.
                        crate::verbose!("Falling back to lite model: {}", e);
                        self.get_or_load(ModelTier::Lite)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Return the cached handle for a tier, loading it on first use.
    ///
    /// The lock is held across check-resolve-insert so concurrent
    /// first uses of one tier perform exactly one load.
    fn get_or_load(&self, tier: ModelTier) -> Result<ModelHandle> {
        let mut models = self.models.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = models.get(&tier) {
            return Ok(handle.clone());
        }

        let handle = self.load_tier(tier)?;
        models.insert(tier, handle.clone());
        Ok(handle)
    }

    fn load_tier(&self, tier: ModelTier) -> Result<ModelHandle> {
        // A custom model path overrides tier selection entirely
        if let Some(custom) = &self.config.custom_model_path {
            crate::verbose!("Loading custom model from {}", custom.display());
            return self.loader.load_local(custom, None);
        }

        match tier {
            ModelTier::Lite => {
                // Bundled artifact, never verified, never downloaded
                self.loader.load_local(&model::lite_model_path(), None)
            }
            ModelTier::Full => {
                model::download::ensure_cache_dir(
                    &self.config.cache_dir,
                    self.config.cache_dir_is_default,
                )?;
                let path = model::full_model_path(&self.config.cache_dir);
                self.loader.load_with_download(
                    &path,
                    model::FULL_MODEL_URL,
                    self.config.proxy.as_deref(),
                    &self.config.download,
                    self.config.verify_hash.as_deref(),
                )
            }
        }
    }

    /// Replace newlines and apply the configured length bound.
    fn preprocess(&self, text: &str) -> String {
        let mut text = if text.contains(['\n', '\r']) {
            // The classifier treats input as a single line
            text.replace(['\n', '\r'], " ")
        } else {
            text.to_string()
        };

        if let Some(max) = self.config.max_input_len {
            let count = text.chars().count();
            if count > max {
                crate::verbose!("Input truncated from {} to {} characters", count, max);
                text = text.chars().take(max).collect();
            }
        } else if text.chars().count() > LONG_INPUT_HINT {
            crate::verbose!(
                "Input is long; prediction is most reliable on single sentences"
            );
        }
        text
    }

    /// Lowercase all-caps Latin input.
    ///
    /// Uppercase Latin text is frequently misclassified as Japanese
    /// because the classifier's token statistics are case-sensitive.
    fn normalize(&self, text: String) -> String {
        if !self.config.normalize_input {
            return text;
        }
        if is_mostly_uppercase(&text) {
            return text.to_lowercase();
        }
        text
    }
}

/// All cased characters uppercase, or more than 80% of the Latin
/// letters uppercase in a string longer than five characters.
fn is_mostly_uppercase(text: &str) -> bool {
    let mut has_cased = false;
    let mut all_upper = true;
    for c in text.chars() {
        if c.is_lowercase() {
            has_cased = true;
            all_upper = false;
        } else if c.is_uppercase() {
            has_cased = true;
        }
    }
    if has_cased && all_upper {
        return true;
    }

    let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let upper = text.chars().filter(|c| c.is_ascii_uppercase()).count();
    latin > 0 && upper as f64 > 0.8 * latin as f64 && text.chars().count() > 5
}

/// Whether the text contains any kana codepoint
fn contains_kana(text: &str) -> bool {
    text.chars()
        .any(|c| ('\u{3041}'..='\u{30FE}').contains(&c))
}

pub(crate) fn default_detector() -> &'static LangDetector {
    static DETECTOR: OnceLock<LangDetector> = OnceLock::new();
    DETECTOR.get_or_init(LangDetector::default)
}

/// Detect the dominant language of `text` using the shared default detector
pub fn detect(text: &str) -> Result<Vec<Detection>> {
    default_detector().detect(text, &DetectOptions::default())
}

/// Detect with explicit options using the shared default detector
pub fn detect_with(text: &str, options: &DetectOptions) -> Result<Vec<Detection>> {
    default_detector().detect(text, options)
}

/// Detect up to `k` candidate languages using the shared default detector
pub fn detect_multilingual(text: &str, k: usize) -> Result<Vec<Detection>> {
    default_detector().detect_multilingual(text, k)
}

/// Detect the dominant language as an uppercase two-letter code
pub fn detect_language(text: &str) -> Result<String> {
    default_detector().detect_language(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DownloadOptions;
    use crate::model::loader::{Classifier, Prediction};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Classifier stub returning canned predictions and recording inputs
    pub(crate) struct StubClassifier {
        pub predictions: Vec<Prediction>,
        pub seen: Mutex<Vec<String>>,
    }

    impl StubClassifier {
        pub fn new(predictions: Vec<(&str, f32)>) -> Self {
            Self {
                predictions: predictions
                    .into_iter()
                    .map(|(label, score)| Prediction {
                        label: format!("{}{}", LABEL_PREFIX, label),
                        score,
                    })
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for StubClassifier {
        fn predict(
            &self,
            text: &str,
            k: i32,
            threshold: f32,
        ) -> std::result::Result<Vec<Prediction>, String> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self
                .predictions
                .iter()
                .filter(|p| p.score >= threshold)
                .take(k as usize)
                .cloned()
                .collect())
        }
    }

    /// Resolver stub: lite loads succeed, full-tier behavior injectable
    pub(crate) struct StubResolver {
        pub lite: Arc<StubClassifier>,
        pub full: Option<Arc<StubClassifier>>,
        pub full_error: Option<fn() -> DetectError>,
        pub loads: AtomicUsize,
    }

    impl StubResolver {
        pub fn lite_only(lite: StubClassifier) -> Self {
            Self {
                lite: Arc::new(lite),
                full: None,
                full_error: Some(|| DetectError::OutOfMemory {
                    reason: "injected".into(),
                }),
                loads: AtomicUsize::new(0),
            }
        }

        pub fn with_full(lite: StubClassifier, full: StubClassifier) -> Self {
            Self {
                lite: Arc::new(lite),
                full: Some(Arc::new(full)),
                full_error: None,
                loads: AtomicUsize::new(0),
            }
        }
    }

    impl ModelResolver for StubResolver {
        fn load_local(
            &self,
            _path: &Path,
            _verify_hash: Option<&str>,
        ) -> crate::error::Result<ModelHandle> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.lite.clone())
        }

        fn load_with_download(
            &self,
            _path: &Path,
            _url: &str,
            _proxy: Option<&str>,
            _options: &DownloadOptions,
            _verify_hash: Option<&str>,
        ) -> crate::error::Result<ModelHandle> {
            if let Some(make_error) = self.full_error {
                return Err(make_error());
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.full.clone().expect("full handle configured"))
        }
    }

    pub(crate) fn lite_detector(predictions: Vec<(&str, f32)>) -> LangDetector {
        let config = DetectConfig::new().with_default_selector(ModelSelector::Lite);
        LangDetector::with_resolver(
            config,
            Arc::new(StubResolver::lite_only(StubClassifier::new(predictions))),
        )
    }

    #[test]
    fn newlines_are_replaced_before_prediction() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector = LangDetector::with_resolver(
            DetectConfig::new().with_default_selector(ModelSelector::Lite),
            resolver.clone(),
        );

        detector
            .detect("hello\nworld\r\nagain", &DetectOptions::default())
            .unwrap();
        let seen = resolver.lite.seen.lock().unwrap();
        assert_eq!(seen[0], "hello world  again");
    }

    #[test]
    fn uppercase_latin_input_is_lowercased() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector = LangDetector::with_resolver(
            DetectConfig::new().with_default_selector(ModelSelector::Lite),
            resolver.clone(),
        );

        detector
            .detect("HELLO WORLD", &DetectOptions::default())
            .unwrap();
        detector
            .detect("THIS IS MOSTLY UPPER x", &DetectOptions::default())
            .unwrap();
        detector.detect("Hello World", &DetectOptions::default()).unwrap();

        let seen = resolver.lite.seen.lock().unwrap();
        assert_eq!(seen[0], "hello world");
        assert_eq!(seen[1], "this is mostly upper x");
        assert_eq!(seen[2], "Hello World");
    }

    #[test]
    fn normalization_can_be_disabled() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector = LangDetector::with_resolver(
            DetectConfig::new()
                .with_default_selector(ModelSelector::Lite)
                .with_normalize_input(false),
            resolver.clone(),
        );

        detector.detect("HELLO WORLD", &DetectOptions::default()).unwrap();
        assert_eq!(resolver.lite.seen.lock().unwrap()[0], "HELLO WORLD");
    }

    #[test]
    fn long_input_is_truncated_when_configured() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector = LangDetector::with_resolver(
            DetectConfig::new()
                .with_default_selector(ModelSelector::Lite)
                .with_max_input_len(5),
            resolver.clone(),
        );

        detector.detect("hello world", &DetectOptions::default()).unwrap();
        assert_eq!(resolver.lite.seen.lock().unwrap()[0], "hello");
    }

    #[test]
    fn results_are_sorted_clamped_and_prefix_stripped() {
        let detector = lite_detector(vec![("en", 0.4), ("fr", 1.0000001), ("de", 0.6)]);
        let results = detector
            .detect(
                "some text",
                &DetectOptions {
                    k: 3,
                    ..DetectOptions::default()
                },
            )
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].lang, "fr");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].lang, "de");
        assert_eq!(results[2].lang, "en");
        // Non-increasing scores
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn threshold_filters_results() {
        let detector = lite_detector(vec![("en", 0.9), ("de", 0.05)]);
        let results = detector
            .detect(
                "some text",
                &DetectOptions {
                    k: 5,
                    threshold: 0.5,
                    ..DetectOptions::default()
                },
            )
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lang, "en");
    }

    #[test]
    fn detection_is_deterministic_with_cached_handle() {
        let detector = lite_detector(vec![("en", 0.9)]);
        let first = detector.detect("hello world", &DetectOptions::default()).unwrap();
        let second = detector.detect("hello world", &DetectOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cache_reuse_loads_at_most_once_per_tier() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector = LangDetector::with_resolver(
            DetectConfig::new().with_default_selector(ModelSelector::Lite),
            resolver.clone(),
        );

        detector.detect("first", &DetectOptions::default()).unwrap();
        detector.detect("second", &DetectOptions::default()).unwrap();
        detector.detect("third", &DetectOptions::default()).unwrap();
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_tier_memory_failure_falls_back_when_allowed() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector =
            LangDetector::with_resolver(DetectConfig::new().with_fallback(true), resolver);

        let results = detector
            .detect(
                "hello world",
                &DetectOptions {
                    model: Some(ModelSelector::Full),
                    ..DetectOptions::default()
                },
            )
            .unwrap();
        assert_eq!(results[0].lang, "en");
    }

    #[test]
    fn full_tier_memory_failure_propagates_when_fallback_disallowed() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector =
            LangDetector::with_resolver(DetectConfig::new().with_fallback(false), resolver);

        let err = detector
            .detect(
                "hello world",
                &DetectOptions {
                    model: Some(ModelSelector::Full),
                    ..DetectOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DetectError::OutOfMemory { .. }));
    }

    #[test]
    fn fallback_is_not_a_persistent_downgrade() {
        let resolver = Arc::new(StubResolver::lite_only(StubClassifier::new(vec![(
            "en", 0.9,
        )])));
        let detector = LangDetector::with_resolver(
            DetectConfig::new().with_fallback(true),
            resolver.clone(),
        );

        let full_options = DetectOptions {
            model: Some(ModelSelector::Full),
            ..DetectOptions::default()
        };
        detector.detect("first", &full_options).unwrap();
        detector.detect("second", &full_options).unwrap();

        // Lite was cached after the first fallback; the full tier was
        // retried (and failed) on the second call without erroring out.
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_full_handle_is_used_when_available() {
        let resolver = Arc::new(StubResolver::with_full(
            StubClassifier::new(vec![("en", 0.5)]),
            StubClassifier::new(vec![("fr", 0.99)]),
        ));
        let detector = LangDetector::with_resolver(DetectConfig::new(), resolver);

        let results = detector
            .detect(
                "bonjour le monde",
                &DetectOptions {
                    model: Some(ModelSelector::Full),
                    ..DetectOptions::default()
                },
            )
            .unwrap();
        assert_eq!(results[0].lang, "fr");
    }

    #[test]
    fn detect_language_maps_kana_free_ja_to_zh() {
        let detector = lite_detector(vec![("ja", 0.8)]);
        assert_eq!(detector.detect_language("你好世界").unwrap(), "ZH");
        assert_eq!(detector.detect_language("こんにちは").unwrap(), "JA");
    }

    #[test]
    fn detect_language_defaults_to_en_on_empty_result() {
        let detector = lite_detector(vec![]);
        assert_eq!(detector.detect_language("???").unwrap(), "EN");
    }

    #[test]
    fn uppercase_heuristic_boundaries() {
        assert!(is_mostly_uppercase("HELLO"));
        assert!(is_mostly_uppercase("ABCDEF g"));
        assert!(!is_mostly_uppercase("Hello World"));
        assert!(!is_mostly_uppercase("你好世界"));
        // Short strings only qualify via the all-cased-uppercase rule
        assert!(is_mostly_uppercase("HI"));
    }
}
