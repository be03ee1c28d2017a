// ============================================================
// Layer 5 — ML / Model Layer (burn)
// ============================================================
// All burn-specific code lives here; the layers above deal in
// plain id sequences and label indices.
//
//   model.rs      — recurrent building blocks and the three
//                   model families: RelationClassifier,
//                   ConceptTagger, Seq2Seq encoder/decoder
//   batcher.rs    — padded id sequences → Int tensors
//   trainer.rs    — the SupervisedModel capability trait, the
//                   shared fit/evaluate pair, and the bucketed
//                   encoder-decoder training loop (free-running
//                   decoding, masked loss, resume, early stop)
//   inferencer.rs — checkpoint → greedy answer generation

/// Recurrent encoder/decoder building blocks and model families
pub mod model;

/// Converts padded id sequences into tensor batches
pub mod batcher;

/// Training loops: generic fit + the encoder-decoder trainer
pub mod trainer;

/// Loads a generator checkpoint and decodes answers
pub mod inferencer;
