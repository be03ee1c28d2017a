// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure types shared by every other layer: no burn tensors,
// no file I/O, no framework types. The data layer produces
// these, the ml layer consumes their indexed form.

// Token span of a concept inside a sentence (Present / Absent)
pub mod span;

// Concept references: literal, lexical identifier, or hybrid
pub mod concept;

// Knowledge-base records and the relation label table
pub mod kb;

// Error taxonomy: which failures skip an example, which abort
pub mod errors;

// Abstractions implemented by the infra layer
pub mod traits;
