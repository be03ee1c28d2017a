// ============================================================
// Layer 3 — Example Error Taxonomy
// ============================================================
// Failures raised while turning one knowledge-base record into
// a training example. Every variant here is skippable: the
// scanner drops the record, counts it, and keeps going.
//
// Fatal conditions (missing hyperparameter key, unreadable
// checkpoint on an explicit resume) are NOT in this enum —
// those stay anyhow errors and propagate out of startup.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExampleError {
    /// The concept reference carries two or more identifier markers.
    #[error("malformed concept reference '{0}': multiple identifier markers")]
    MalformedConcept(String),

    /// The lexical resolver could not map the identifier to a lemma.
    #[error("cannot resolve lexical identifier '{id}': {reason}")]
    Resolution { id: String, reason: String },

    /// The relation label is not in the known relation table.
    #[error("unknown relation label '{0}'")]
    UnknownRelation(String),

    /// The answer concept aligned to no token span.
    #[error("concept aligned to no span in the sentence")]
    SpanAbsent,

    /// Yes/no answers carry no extractable concept span.
    #[error("yes/no answer has no concept span to tag")]
    YesNoAnswer,

    /// The text tokenized to nothing, leaving no sequence to encode.
    #[error("text has no tokens")]
    EmptySentence,
}
