//! Mixed-language segmentation.
//!
//! Partitions a paragraph into contiguous per-language cells: cut into
//! sentence-like chunks, bound chunk length, detect each chunk, then
//! merge adjacent chunks sharing a language in a single left-to-right
//! pass.

pub mod cut;

use serde::{Deserialize, Serialize};

use crate::config::ModelSelector;
use crate::detector::{DetectOptions, LangDetector};
use crate::error::Result;

/// A contiguous span of text carrying one dominant detected language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub text: String,
    /// `None` when detection produced no result for the span
    pub lang: Option<String>,
    /// Span length in characters
    pub length: usize,
}

/// Options for [`segment`]
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Hard upper bound on the characters fed to one detection call;
    /// longer chunks are sliced into windows of exactly this size
    pub cell_limit: usize,
    /// Coalesce consecutive chunks with the same detected language
    pub merge_same: bool,
    /// Drop chunks whose detection produced no result
    pub filter_empty: bool,
    /// Tier used for the per-chunk detection calls
    pub model: ModelSelector,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            cell_limit: 150,
            merge_same: true,
            filter_empty: true,
            model: ModelSelector::Lite,
        }
    }
}

impl LangDetector {
    /// Segment `text` into language-homogeneous cells.
    ///
    /// Concatenating the returned cell texts in order reconstructs the
    /// chunked input (exactly, when `filter_empty` is off or every
    /// chunk produced a detection).
    pub fn segment(&self, text: &str, options: &SegmentOptions) -> Result<Vec<Cell>> {
        let chunks = bounded_chunks(text, options.cell_limit);

        let detect_options = DetectOptions {
            model: Some(options.model),
            ..DetectOptions::default()
        };

        let mut cells = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let lang = self
                .detect(&chunk, &detect_options)?
                .into_iter()
                .next()
                .map(|d| d.lang);
            if options.filter_empty && lang.is_none() {
                continue;
            }
            let length = chunk.chars().count();
            cells.push(Cell {
                text: chunk,
                lang,
                length,
            });
        }

        if options.merge_same {
            cells = merge_cells(cells);
        }
        Ok(cells)
    }
}

/// Cut into sentence-like chunks, then hard-slice anything longer than
/// `cell_limit` characters into fixed-size windows.
fn bounded_chunks(text: &str, cell_limit: usize) -> Vec<String> {
    let cell_limit = cell_limit.max(1);
    let mut bounded = Vec::new();
    for chunk in cut::cut_sentences(text) {
        if chunk.chars().count() <= cell_limit {
            bounded.push(chunk);
            continue;
        }
        let chars: Vec<char> = chunk.chars().collect();
        for window in chars.chunks(cell_limit) {
            bounded.push(window.iter().collect());
        }
    }
    bounded
}

/// Coalesce consecutive cells carrying the identical language label.
///
/// Single pass with O(1) lookahead; a cell without a language never
/// merges and breaks any run in progress.
fn merge_cells(cells: Vec<Cell>) -> Vec<Cell> {
    let mut merged: Vec<Cell> = Vec::new();
    for cell in cells {
        match merged.last_mut() {
            Some(prev) if prev.lang.is_some() && prev.lang == cell.lang => {
                prev.text.push_str(&cell.text);
                prev.length += cell.length;
            }
            _ => merged.push(cell),
        }
    }
    merged
}

/// Segment `text` using the shared default detector
pub fn segment(text: &str, options: &SegmentOptions) -> Result<Vec<Cell>> {
    crate::detector::default_detector().segment(text, options)
}
