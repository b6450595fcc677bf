//! Address-term post-processing of model replies.
//!
//! The persona opens every reply formally ("Sensei") and switches to the
//! familiar form ("thầy") for the rest of it. Models drift from this, so the
//! reply is rewritten sentence by sentence:
//! - the first sentence must contain the formal term
//! - later sentences must not contain it, and never "(Sensei)" glued to "thầy"

pub mod segment;

use regex::{Captures, NoExpand, Regex};
use serde::{Deserialize, Serialize};

pub use segment::{segment_sentences, PunctuationSplitter, SentenceSplitter};

/// The two address terms the persona alternates between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressTerms {
    /// Used in the first sentence of a reply
    pub first: String,
    /// Used in every sentence after the first
    pub rest: String,
}

impl Default for AddressTerms {
    fn default() -> Self {
        Self {
            first: "Sensei".to_string(),
            rest: "thầy".to_string(),
        }
    }
}

impl AddressTerms {
    /// Phrase prepended to an opening sentence that has no address term at all.
    pub fn opening_phrase(&self) -> String {
        format!("{} ơi, ", self.first)
    }
}

/// Rewrites reply text so it follows the address-term policy.
pub struct AddressRewriter {
    terms: AddressTerms,
    splitter: Box<dyn SentenceSplitter>,
    first: Regex,
    rest: Regex,
    paren_first: Regex,
    paren_rest: Regex,
    spaces: Regex,
}

impl AddressRewriter {
    pub fn new(terms: AddressTerms) -> Result<Self, regex::Error> {
        Self::with_splitter(terms, Box::new(PunctuationSplitter))
    }

    pub fn with_splitter(
        terms: AddressTerms,
        splitter: Box<dyn SentenceSplitter>,
    ) -> Result<Self, regex::Error> {
        let first = regex::escape(&terms.first);
        let rest = regex::escape(&terms.rest);

        Ok(Self {
            first: Regex::new(&format!("(?i){first}"))?,
            rest: Regex::new(&format!("(?i){rest}"))?,
            paren_first: Regex::new(&format!(r"(?i)\s*\(\s*{first}\s*\)"))?,
            paren_rest: Regex::new(&format!(r"(?i)\s*\(\s*{rest}\s*\)"))?,
            spaces: Regex::new(" {2,}")?,
            terms,
            splitter,
        })
    }

    pub fn terms(&self) -> &AddressTerms {
        &self.terms
    }

    /// Apply the policy to a whole reply. Pure and idempotent.
    pub fn rewrite(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let segments = self.splitter.split(text);
        let Some((opening, rest)) = segments.split_first() else {
            return text.to_string();
        };

        let mut out = Vec::with_capacity(segments.len());
        out.push(self.rewrite_opening(opening));
        out.extend(
            rest.iter()
                .map(|s| self.rewrite_following(s))
                .filter(|s| !s.is_empty()),
        );
        out.join(" ")
    }

    fn rewrite_opening(&self, segment: &str) -> String {
        if self.first.is_match(segment) {
            return segment.to_string();
        }

        if self.rest.is_match(segment) {
            let promoted = self.rest.replace(segment, NoExpand(&self.terms.first));
            // "thầy (thầy)" became "Sensei (thầy)"; drop the leftover pairing.
            return self.paren_rest.replace_all(&promoted, "").into_owned();
        }

        format!("{}{}", self.terms.opening_phrase(), segment)
    }

    fn rewrite_following(&self, segment: &str) -> String {
        let cleaned = self.paren_first.replace_all(segment, "");
        let replaced = self.first.replace_all(&cleaned, |caps: &Captures| {
            // Sentence-initial position keeps its capital letter.
            match caps.get(0) {
                Some(m) if m.start() == 0 => capitalize(&self.terms.rest),
                _ => self.terms.rest.clone(),
            }
        });
        self.spaces.replace_all(&replaced, " ").trim().to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
