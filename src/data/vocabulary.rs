// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Word ↔ integer id mapping with the reserved symbols the rest
// of the pipeline depends on:
//
//   0 = <PAD>   padding; index 0 by contract, masked from loss
//   1 = <UNK>   out-of-vocabulary words
//   2 = <GO>    decoder start symbol
//   3 = <EOS>   end-of-sequence symbol
//
// The vocabulary file itself is a plain newline-delimited word
// list; building it is out of scope. Tokenization is the shared
// word/punctuation splitter below — the SAME function must be
// used for sentences and for concept patterns, or span indices
// stop lining up.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

pub const PAD_SYMBOL: &str = "<PAD>";
pub const UNK_SYMBOL: &str = "<UNK>";
pub const GO_SYMBOL: &str = "<GO>";
pub const EOS_SYMBOL: &str = "<EOS>";

const SPECIALS: [&str; 4] = [PAD_SYMBOL, UNK_SYMBOL, GO_SYMBOL, EOS_SYMBOL];

/// Split a sentence into words and single-character punctuation
/// tokens. "what's france?" → ["what", "'", "s", "france", "?"]
pub fn split_words_punctuation(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            word.push(c);
        } else {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }

    tokens
}

pub struct Vocabulary {
    word2index: HashMap<String, u32>,
    index2word: Vec<String>,
}

impl Vocabulary {
    /// Load a newline-delimited word list. Reserved symbols come
    /// first; file order fixes the ids of everything else.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read vocabulary file '{}'", path.display()))?;

        let vocab = Self::from_words(raw.lines().map(|l| l.trim()).filter(|l| !l.is_empty()));
        tracing::info!(
            "Loaded vocabulary '{}' ({} entries)",
            path.display(),
            vocab.len()
        );
        Ok(vocab)
    }

    /// Build a vocabulary from an iterator of words (tests, demos).
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut word2index = HashMap::new();
        let mut index2word = Vec::new();

        for symbol in SPECIALS {
            word2index.insert(symbol.to_string(), index2word.len() as u32);
            index2word.push(symbol.to_string());
        }
        for word in words {
            let word = word.as_ref();
            if !word2index.contains_key(word) {
                word2index.insert(word.to_string(), index2word.len() as u32);
                index2word.push(word.to_string());
            }
        }

        Self { word2index, index2word }
    }

    pub fn len(&self) -> usize {
        self.index2word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index2word.is_empty()
    }

    pub fn pad_id(&self) -> u32 {
        0
    }

    pub fn unk_id(&self) -> u32 {
        1
    }

    pub fn go_id(&self) -> u32 {
        2
    }

    pub fn eos_id(&self) -> u32 {
        3
    }

    pub fn word2index(&self, word: &str) -> Option<u32> {
        self.word2index.get(word).copied()
    }

    /// Tokenize and index a sentence; unknown words map to <UNK>.
    pub fn sentence2indices(&self, text: &str) -> Vec<u32> {
        split_words_punctuation(text)
            .iter()
            .map(|tok| self.word2index(tok).unwrap_or_else(|| self.unk_id()))
            .collect()
    }

    /// Turn generated ids back into text, dropping reserved symbols.
    pub fn indices2sentence(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter_map(|&id| self.index2word.get(id as usize))
            .filter(|w| !SPECIALS.contains(&w.as_str()))
            .map(|w| w.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
