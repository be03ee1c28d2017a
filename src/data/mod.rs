// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a raw knowledge-base record and the id
// sequences the ml layer trains on:
//
//   KB JSON
//      │
//      ▼
//   KbLoader      → parses records            (loader)
//      │
//      ▼
//   SpanAligner   → locates concept spans     (aligner)
//      │
//      ▼
//   TagEncoder    → per-token boundary labels (tagger)
//      │
//      ▼
//   Vocabulary    → words → integer ids       (vocabulary)
//      │
//      ▼
//   Splitter      → train / dev / test        (splitter)
//      │
//      ▼
//   Bucketer      → padded length buckets     (bucketer)
//
// Each module does exactly one step and is testable on its own.

/// Knowledge-base JSON loading
pub mod loader;

/// Word/punctuation tokenizer and word↔id vocabulary
pub mod vocabulary;

/// Locates the token span a concept occupies in a sentence
pub mod aligner;

/// Converts spans into per-token boundary-tag categories
pub mod tagger;

/// Length-bucketed padding and source reversal
pub mod bucketer;

/// Deterministic contiguous train/dev/test split
pub mod splitter;
