// ============================================================
// Layer 4 — Tag Encoder
// ============================================================
// Boundary tagging: each token gets exactly one category out of
// three per tracked concept plus a shared "Other":
//
//   concept k → 3k   Begin+End (single-token span)
//               3k+1 Begin-only
//               3k+2 End-only
//   last       Other
//
// Question tagging tracks 2 concepts → 7 categories; answer
// tagging tracks 1 → 4. Interior tokens of a multi-token span
// stay "Other": there is no Inside category. That is a design
// choice carried over from the labelling scheme, not an
// omission.
//
// Spans are clamped into [0, token_count - 1] here; the aligner
// hands them over unclamped.

use crate::domain::span::Span;

pub struct TagEncoder {
    concepts: usize,
}

impl TagEncoder {
    /// A tag encoder tracking `concepts` (>= 1) concepts per sentence.
    pub fn new(concepts: usize) -> Self {
        assert!(concepts >= 1, "a tag encoder must track at least one concept");
        Self { concepts }
    }

    /// Total number of categories, including "Other".
    pub fn categories(&self) -> usize {
        3 * self.concepts + 1
    }

    /// Index of the shared "Other" category.
    pub fn other(&self) -> usize {
        3 * self.concepts
    }

    /// Per-token category indices for a sentence of `token_count`
    /// tokens. `spans[k]` is concept k's span; absent spans tag
    /// nothing. At most `self.concepts` spans are accepted.
    pub fn encode(&self, token_count: usize, spans: &[Span]) -> Vec<usize> {
        assert!(
            spans.len() <= self.concepts,
            "got {} spans for a {}-concept encoder",
            spans.len(),
            self.concepts,
        );

        let mut labels = vec![self.other(); token_count];

        for (k, span) in spans.iter().enumerate() {
            let Some((start, end)) = span.clamped(token_count) else {
                continue;
            };
            let base = 3 * k;
            if start == end {
                labels[start] = base; // Begin+End
            } else {
                labels[start] = base + 1; // Begin-only
                labels[end] = base + 2; // End-only
            }
        }

        labels
    }

    /// One-hot view of a category, for callers that need the
    /// label-vector form.
    pub fn one_hot(&self, category: usize) -> Vec<f32> {
        let mut v = vec![0.0; self.categories()];
        v[category] = 1.0;
        v
    }
}
