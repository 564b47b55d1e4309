//! Sentence-boundary cutter.
//!
//! Splits text into sentence-like chunks on terminal punctuation, both
//! ASCII and wide CJK forms. The cut is lossless: concatenating the
//! chunks in order reconstructs the input exactly, which the segmenter
//! relies on for its partition property.

/// Characters that terminate a sentence-like chunk
const ENDERS: &[char] = &[
    '。', '．', '！', '？', '；', '…', '.', '!', '?', ';', '\n',
];

/// Closing quotes/brackets that stay attached to the sentence they close
const CLOSERS: &[char] = &[
    '」', '』', '”', '’', '"', '\'', '）', ')', '】', ']', '〉', '>',
];

/// Cut `text` into sentence-like chunks.
///
/// A chunk ends after a run of terminal punctuation, any closing
/// quotes/brackets that follow it, and any trailing spaces. Text after
/// the last terminator forms a final chunk.
pub fn cut_sentences(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !ENDERS.contains(&c) {
            continue;
        }

        // Absorb the rest of the terminator run, closers, and spaces
        while let Some(&next) = chars.peek() {
            if ENDERS.contains(&next) || CLOSERS.contains(&next) || next == ' ' || next == '\t' {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        chunks.push(std::mem::take(&mut current));
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
