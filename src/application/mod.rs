// ============================================================
// Layer 2 — Application Layer
// ============================================================
// Use cases orchestrate the lower layers; no tensor math and no
// CLI types live here.
//
//   example_builder.rs — KB records → per-model training examples
//   train_use_case.rs  — hparams parsing + the four training
//                        pipelines (classifier, two extractors,
//                        generator)
//   ask_use_case.rs    — checkpoint → answer for one question

/// Builds training examples out of knowledge-base records
pub mod example_builder;

/// Training orchestration and hyperparameter configuration
pub mod train_use_case;

/// Question answering against a trained generator
pub mod ask_use_case;
