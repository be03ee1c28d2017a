// ============================================================
// Layer 4 — Span Aligner
// ============================================================
// Locates the inclusive token span a concept occupies inside a
// tokenized sentence. The resolution ladder, in order:
//
//   Hybrid "w::bn:--"  → the literal prefix is the pattern;
//                        the resolver is never consulted
//   Identifier "bn:--" → resolver maps the id to a lemma;
//                        failure skips the example
//   Literal "w"        → used only if it occurs as a substring
//                        of the untokenized sentence (cheap
//                        pre-filter before tokenizing it)
//
// The pattern is tokenized with the same splitter as the
// sentence, then matched as the LEFTMOST contiguous token run.
// No run → Span::Absent. The aligner never clamps indices; the
// tag encoder does, to tolerate malformed KB entries.

use crate::data::vocabulary::split_words_punctuation;
use crate::domain::concept::ConceptRef;
use crate::domain::errors::ExampleError;
use crate::domain::span::Span;
use crate::domain::traits::LexicalResolver;

pub struct SpanAligner;

impl SpanAligner {
    /// Find the token span `concept` occupies in `sentence`.
    ///
    /// `tokens` must be `split_words_punctuation(sentence)` — it is
    /// passed in so callers tokenize each sentence exactly once.
    pub fn align<R: LexicalResolver>(
        sentence: &str,
        tokens: &[String],
        concept: &ConceptRef,
        resolver: &mut R,
    ) -> Result<Span, ExampleError> {
        let pattern: String = match concept {
            ConceptRef::Hybrid { literal, .. } => literal.clone(),
            ConceptRef::Identifier(id) => resolver.resolve(id)?,
            ConceptRef::Literal(lit) => {
                if !sentence.contains(lit.as_str()) {
                    return Ok(Span::Absent);
                }
                lit.clone()
            }
        };

        Ok(find_pattern(tokens, &split_words_punctuation(&pattern)))
    }
}

/// Leftmost contiguous occurrence of `pattern` in `tokens`,
/// token for token.
fn find_pattern(tokens: &[String], pattern: &[String]) -> Span {
    if pattern.is_empty() || pattern.len() > tokens.len() {
        return Span::Absent;
    }

    match tokens.windows(pattern.len()).position(|w| w == pattern) {
        Some(start) => Span::present(start, start + pattern.len() - 1),
        None => Span::Absent,
    }
}
