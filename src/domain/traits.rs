// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the pipeline and its external collaborators.
// The data layer is written against these traits; the infra
// layer provides the concrete, persistent implementations.

use crate::domain::errors::ExampleError;

// ─── LexicalResolver ──────────────────────────────────────────
/// Maps a lexical-graph identifier to a surface lemma.
///
/// Lookups are blocking, synchronous, and individually failable:
/// a failed resolution skips one example, never the whole scan.
///
/// Implementations:
///   - ResolverCache → persistent TSV-backed table (infra)
///   - in test code → a plain HashMap wrapper
pub trait LexicalResolver {
    fn resolve(&mut self, id: &str) -> Result<String, ExampleError>;
}
