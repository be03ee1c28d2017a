// ============================================================
// Layer 3 — Span Domain Type
// ============================================================
// The token range a concept occupies inside a tokenized
// sentence. One sum type replaces the original scattering of
// -1 sentinels and silently-defaulted index variables: a span
// is either Present with inclusive [start, end] indices, or
// Absent.
//
// The aligner never clamps; tolerating malformed knowledge-base
// offsets is the tag encoder's job, via `clamped`.

use serde::{Deserialize, Serialize};

/// Inclusive token span, or the explicit absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Span {
    /// The concept covers tokens start..=end (start <= end).
    Present { start: usize, end: usize },
    /// The concept does not occur in the sentence.
    Absent,
}

impl Span {
    /// Build a present span, normalising a reversed pair.
    pub fn present(start: usize, end: usize) -> Self {
        if start <= end {
            Span::Present { start, end }
        } else {
            Span::Present { start: end, end: start }
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Span::Present { .. })
    }

    /// Clamp both indices into [0, token_count - 1].
    /// Returns None for absent spans or empty sentences.
    pub fn clamped(&self, token_count: usize) -> Option<(usize, usize)> {
        match *self {
            Span::Absent => None,
            Span::Present { .. } if token_count == 0 => None,
            Span::Present { start, end } => {
                let last = token_count - 1;
                Some((start.min(last), end.min(last)))
            }
        }
    }
}
