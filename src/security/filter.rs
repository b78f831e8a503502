//! Static content filter.
//!
//! Two checks are applied to relayed content:
//!
//! - [`ContentFilter::censor`] masks tokens whose normalized form is on the
//!   bad-word list, keeping the token's character count.
//! - [`ContentFilter::is_dangerous_file`] refuses documents with a denylisted
//!   extension anywhere after the first dot (`invoice.exe.pdf` is refused).
//!
//! # Normalization
//!
//! Per whitespace-separated token:
//!
//! 1. Non-ASCII homoglyphs fold to their ASCII prototype (Cyrillic `е` -> `e`).
//! 2. Unicode NFD, then every non-ASCII char is dropped (strips accents).
//! 3. Leetspeak digits map to letters: `1 i`, `3 e`, `4 a`, `0 o`, `7 t`, `5 s`.
//! 4. Lowercase, then drop everything that is not a letter.

use crate::config::FilterConfig;
use confusables::Confusable;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

pub struct ContentFilter {
    bad_words: HashSet<String>,
    dangerous_extensions: HashSet<String>,
}

impl ContentFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            bad_words: config
                .bad_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            dangerous_extensions: config
                .dangerous_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Reduce a token to the form compared against the bad-word list.
    pub fn normalize(token: &str) -> String {
        let folded: String = token
            .chars()
            .map(|c| {
                let single = c.to_string();
                if c.is_ascii() {
                    single
                } else {
                    single.as_str().detect_replace_confusable().into_owned()
                }
            })
            .collect();

        folded
            .nfd()
            .filter(char::is_ascii)
            .map(|c| match c {
                '1' => 'i',
                '3' => 'e',
                '4' => 'a',
                '0' => 'o',
                '7' => 't',
                '5' => 's',
                other => other,
            })
            .map(|c| c.to_ascii_lowercase())
            .filter(char::is_ascii_lowercase)
            .collect()
    }

    pub fn is_bad_word(&self, token: &str) -> bool {
        self.bad_words.contains(&Self::normalize(token))
    }

    /// Mask bad words. Tokens are re-joined with single spaces.
    pub fn censor(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| {
                if self.is_bad_word(token) {
                    "*".repeat(token.chars().count())
                } else {
                    token.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_dangerous_file(&self, file_name: &str) -> bool {
        file_name
            .split('.')
            .skip(1)
            .any(|ext| self.dangerous_extensions.contains(&format!(".{}", ext.to_lowercase())))
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
