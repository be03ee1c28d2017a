// ============================================================
// Layer 3 — Concept References
// ============================================================
// A knowledge-base record names its concepts in one of three
// surface forms:
//
//   "france"                 literal surface string
//   "bn:00012345n"           lexical-graph identifier
//   "france::bn:00012345n"   hybrid: literal + identifier
//
// A reference with two or more identifier markers is malformed
// and rejected here, before any alignment work happens.

use crate::domain::errors::ExampleError;

/// Marker that introduces a lexical-graph identifier.
pub const ID_MARKER: &str = "bn:";

/// Separator between the literal part and the identifier in a hybrid.
const HYBRID_MARKER: &str = "::bn:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConceptRef {
    /// Plain surface string, matched directly against the sentence.
    Literal(String),
    /// Identifier to be resolved to a lemma by the lexical resolver.
    Identifier(String),
    /// Literal prefix with an attached identifier; the literal wins,
    /// the resolver is never consulted.
    Hybrid { literal: String, identifier: String },
}

impl ConceptRef {
    /// Parse a raw concept field from a knowledge-base record.
    pub fn parse(raw: &str) -> Result<ConceptRef, ExampleError> {
        let trimmed = raw.trim();

        // Two or more markers means the KB glued references together.
        if trimmed.matches(ID_MARKER).count() >= 2 {
            return Err(ExampleError::MalformedConcept(trimmed.to_string()));
        }

        if let Some(idx) = trimmed.find(HYBRID_MARKER) {
            let literal = trimmed[..idx].trim().to_string();
            let identifier = trimmed[idx + 2..].to_string(); // keep the "bn:" prefix
            return Ok(ConceptRef::Hybrid { literal, identifier });
        }

        if let Some(idx) = trimmed.find(ID_MARKER) {
            return Ok(ConceptRef::Identifier(trimmed[idx..].to_string()));
        }

        Ok(ConceptRef::Literal(trimmed.to_string()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            ConceptRef::parse(" france "),
            Ok(ConceptRef::Literal("france".to_string())),
        );
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(
            ConceptRef::parse("bn:00012345n"),
            Ok(ConceptRef::Identifier("bn:00012345n".to_string())),
        );
    }

    #[test]
    fn test_parse_hybrid_keeps_marker_prefix() {
        assert_eq!(
            ConceptRef::parse("new york::bn:00041611n"),
            Ok(ConceptRef::Hybrid {
                literal: "new york".to_string(),
                identifier: "bn:00041611n".to_string(),
            }),
        );
    }

    #[test]
    fn test_two_markers_is_malformed() {
        let got = ConceptRef::parse("bn:00012345n bn:00054321n");
        assert!(matches!(got, Err(ExampleError::MalformedConcept(_))));
    }

    #[test]
    fn test_identifier_with_leading_garbage() {
        // The marker may start mid-string; everything from "bn:" onward is the id
        assert_eq!(
            ConceptRef::parse("xx bn:00012345n"),
            Ok(ConceptRef::Identifier("bn:00012345n".to_string())),
        );
    }
}
