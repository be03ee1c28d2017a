// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns used by several layers:
//
//   resolver.rs   — TSV-backed lexical identifier → lemma cache;
//                   the only implementation of LexicalResolver
//   checkpoint.rs — burn records for model/optimizer state plus
//                   the {epoch, iter, best_acc} resume metadata
//   metrics.rs    — per-epoch CSV training metrics

/// Persistent lexical resolver cache
pub mod resolver;

/// Model/optimizer checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
