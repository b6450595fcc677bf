//! Sentence segmentation for reply post-processing.
//!
//! A punctuation heuristic tuned for Vietnamese chat replies. It does not try
//! to understand abbreviations or nested quotes; it only has to split the same
//! text the same way every time and never lose non-whitespace content.

/// Characters that end a sentence.
const TERMINATORS: &[char] = &['.', '!', '?', '…', '。', '！', '？'];

/// Closing quotes and brackets that stay with the sentence they close.
const CLOSERS: &[char] = &['"', '\'', '”', '’', '»', ')', '」', '』'];

/// Splits reply text into sentence-like segments.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Default splitter backed by [`segment_sentences`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSplitter;

impl SentenceSplitter for PunctuationSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        segment_sentences(text)
    }
}

/// Split `text` into trimmed, non-empty segments.
///
/// A segment ends at a newline, or at a run of terminators (plus any closers
/// right after it) that is followed by whitespace or the end of the text.
/// "150.000đ" and "shop.com" therefore stay whole.
pub fn segment_sentences(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            flush(&mut current, &mut segments);
            continue;
        }

        current.push(c);
        if !TERMINATORS.contains(&c) {
            continue;
        }

        while let Some(&next) = chars.peek() {
            if TERMINATORS.contains(&next) || CLOSERS.contains(&next) {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }

        match chars.peek() {
            None => flush(&mut current, &mut segments),
            Some(next) if next.is_whitespace() => flush(&mut current, &mut segments),
            Some(_) => {}
        }
    }
    flush(&mut current, &mut segments);

    segments
}

fn flush(current: &mut String, segments: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}
