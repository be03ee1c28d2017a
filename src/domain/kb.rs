// ============================================================
// Layer 3 — Knowledge-Base Records
// ============================================================
// One KB record is a question/answer pair plus the two concept
// references the question connects and the relation between
// them. The JSON loader in the data layer deserialises straight
// into this struct.

use serde::{Deserialize, Serialize};

use crate::domain::errors::ExampleError;

/// A single knowledge-base entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbRecord {
    /// Natural-language question mentioning both concepts
    pub question: String,

    /// Natural-language answer (may be a bare "yes"/"no")
    pub answer: String,

    /// Relation label connecting c1 and c2
    pub relation: String,

    /// First concept reference (literal, identifier, or hybrid)
    pub c1: String,

    /// Second concept reference
    pub c2: String,
}

/// The fixed relation inventory of the knowledge base.
/// The classifier head has exactly one logit per entry.
pub const RELATIONS: [&str; 16] = [
    "activity",
    "atlocation",
    "capableof",
    "color",
    "generalization",
    "hasa",
    "hasproperty",
    "isa",
    "madeof",
    "partof",
    "place",
    "purpose",
    "shape",
    "similarto",
    "size",
    "specialization",
];

/// Map a relation label to its class index, case-insensitively.
/// Unknown labels skip the record rather than aborting the scan.
pub fn relation_to_int(label: &str) -> Result<usize, ExampleError> {
    let needle = label.trim().to_lowercase();
    RELATIONS
        .iter()
        .position(|r| *r == needle)
        .ok_or_else(|| ExampleError::UnknownRelation(label.to_string()))
}
