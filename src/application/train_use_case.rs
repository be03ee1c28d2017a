// ============================================================
// Layer 2 — Train Use Case
// ============================================================
// Orchestrates a training run for one model family (or all four)
// in order:
//
//   Step 1: Parse hyperparameters      (this layer)
//   Step 2: Load the knowledge base    (Layer 4 - data)
//   Step 3: Load the resolver cache    (Layer 6 - infra)
//   Step 4: Build examples             (this layer)
//   Step 5: Split train/dev/test       (Layer 4 - data)
//   Step 6: Pad/bucket into batches    (Layer 4/5)
//   Step 7: Train + evaluate           (Layer 5 - ml)
//   Step 8: Save checkpoints           (Layer 6 - infra)
//
// Hyperparameters come from a JSON file with one camelCase
// section per model. Every section key without a #[serde(default)]
// is required — a missing key is a startup error, not a silent
// fallback.

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::example_builder::{
    self, kb_slice, ExampleCounts,
};
use crate::data::bucketer::{bucket, generator_dims, Bucket};
use crate::data::loader::KbLoader;
use crate::data::splitter::split_dataset;
use crate::data::tagger::TagEncoder;
use crate::data::vocabulary::Vocabulary;
use crate::domain::kb::{KbRecord, RELATIONS};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::MetricsLogger;
use crate::infra::resolver::ResolverCache;
use crate::ml::batcher::{
    pad_tags_to_longest, pad_to_longest, ClassifierBatch, TaggerBatch, TokenBatcher,
};
use crate::ml::model::{ConceptTaggerConfig, RelationClassifierConfig, Seq2SeqConfig};
use crate::ml::trainer::{
    evaluate, evaluate_generator, fit, EncoderDecoderTrainer, EvalBackend,
    GeneratorTrainOptions, TrainBackend, TrainOutcome,
};

// ─── Hyperparameters ──────────────────────────────────────────

fn default_embedding_dim() -> usize {
    300
}

fn default_learning_rate() -> f64 {
    1e-3
}

fn default_resolver_cache() -> String {
    "data/resolver_cache.tsv".to_string()
}

/// One JSON file, one section per trainable model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HParams {
    pub relation_classifier:        ClassifierHParams,
    pub concept_extractor_question: TaggerHParams,
    pub concept_extractor_answer:   TaggerHParams,
    pub answer_generator:           GeneratorHParams,
    #[serde(default = "default_resolver_cache")]
    pub resolver_cache_path:        String,
}

impl HParams {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read hyperparameters '{path}'"))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("hyperparameters '{path}' are missing keys or malformed"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierHParams {
    pub vocabulary_path:   String,
    pub kb_len_percentage: f64,
    pub kb_split:          f64,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub hidden_size:       usize,
    pub n_layers:          usize,
    pub bidirectional:     bool,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim:     usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate:     f64,
}

/// Shared by the question and answer concept extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggerHParams {
    pub vocabulary_path:   String,
    pub kb_len_percentage: f64,
    pub kb_split:          f64,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub hidden_size:       usize,
    pub n_layers:          usize,
    pub bidirectional:     bool,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim:     usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate:     f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorHParams {
    pub encoder_vocabulary_path: String,
    pub decoder_vocabulary_path: String,
    pub kb_len_percentage:       f64,
    pub kb_split:                f64,
    pub batch_size:              usize,
    pub epochs:                  usize,
    pub encoder_hidden_size:     usize,
    pub decoder_hidden_size:     usize,
    pub n_layers:                usize,
    /// Directory of a previous run to resume from; empty = fresh start
    pub checkpoint:              String,
    pub early_stopping_max:      usize,
    #[serde(default)]
    pub teacher_forcing:         bool,
    #[serde(default)]
    pub checkpoint_every:        Option<usize>,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim:           usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate:           f64,
}

/// Which model(s) a `train` invocation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    RelationClassifier,
    ConceptExtractorQuestion,
    ConceptExtractorAnswer,
    AnswerGenerator,
    All,
}

// ─── TrainUseCase ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub hparams_path:   String,
    pub kb_path:        String,
    pub checkpoint_dir: String,
    pub model:          ModelKind,
}

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let hparams = HParams::from_file(&self.config.hparams_path)?;
        let records = KbLoader::load(&self.config.kb_path)?;
        let mut resolver = ResolverCache::load(&hparams.resolver_cache_path)?;

        let model = self.config.model;
        let all = model == ModelKind::All;

        if all || model == ModelKind::RelationClassifier {
            self.train_relation_classifier(&hparams.relation_classifier, &records)?;
        }
        if all || model == ModelKind::ConceptExtractorQuestion {
            self.train_concept_extractor(
                &hparams.concept_extractor_question,
                &records,
                &mut resolver,
                QUESTION_CONCEPTS,
            )?;
        }
        if all || model == ModelKind::ConceptExtractorAnswer {
            self.train_concept_extractor(
                &hparams.concept_extractor_answer,
                &records,
                &mut resolver,
                ANSWER_CONCEPTS,
            )?;
        }
        if all || model == ModelKind::AnswerGenerator {
            self.train_answer_generator(&hparams.answer_generator, &records)?;
        }

        // New lemmas may have landed in the cache during alignment
        resolver.save()?;
        Ok(())
    }

    // ── Relation classifier ───────────────────────────────────

    fn train_relation_classifier(&self, hp: &ClassifierHParams, records: &[KbRecord]) -> Result<()> {
        tracing::info!("=== Training relation classifier ===");
        let vocab = Vocabulary::from_file(&hp.vocabulary_path)?;
        let (xs, ys, counts) = example_builder::classifier_examples(
            kb_slice(records, hp.kb_len_percentage),
            &vocab,
        );
        report_counts("relation classifier", &counts);

        let split = split_dataset(xs, ys, hp.kb_split);
        let pad = vocab.pad_id();
        let train = classifier_batches::<TrainBackend>(&split.x_train, &split.y_train, hp.batch_size, pad);
        let dev   = classifier_batches::<EvalBackend>(&split.x_dev, &split.y_dev, hp.batch_size, pad);
        let test  = classifier_batches::<EvalBackend>(&split.x_test, &split.y_test, hp.batch_size, pad);

        let device = <TrainBackend as Backend>::Device::default();
        let model = RelationClassifierConfig::new(
            vocab.len(), hp.embedding_dim, hp.hidden_size,
            hp.n_layers, hp.bidirectional, RELATIONS.len(),
        )
        .init::<TrainBackend>(&device);

        let (model, _) = fit(model, &train, &dev, hp.epochs, hp.learning_rate);
        let report = evaluate(&model.valid(), &test);
        tracing::info!(
            "Relation classifier test: loss={:.4} acc={:.1}%",
            report.loss, report.accuracy * 100.0,
        );

        CheckpointManager::new(&self.config.checkpoint_dir)
            .save_module("relation_classifier", model)
    }

    // ── Concept extractors (question: 2 concepts, answer: 1) ──

    fn train_concept_extractor(
        &self,
        hp:       &TaggerHParams,
        records:  &[KbRecord],
        resolver: &mut ResolverCache,
        concepts: usize,
    ) -> Result<()> {
        let (name, ckpt_name) = if concepts == QUESTION_CONCEPTS {
            ("question concept extractor", "concept_extractor_question")
        } else {
            ("answer concept extractor", "concept_extractor_answer")
        };
        tracing::info!("=== Training {name} ===");

        let vocab = Vocabulary::from_file(&hp.vocabulary_path)?;
        let slice = kb_slice(records, hp.kb_len_percentage);
        let (xs, ys, counts) = if concepts == QUESTION_CONCEPTS {
            example_builder::question_tagger_examples(slice, &vocab, resolver)
        } else {
            example_builder::answer_tagger_examples(slice, &vocab, resolver)
        };
        report_counts(name, &counts);

        let encoder = TagEncoder::new(concepts);
        let split = split_dataset(xs, ys, hp.kb_split);
        let pad = vocab.pad_id();
        let train = tagger_batches::<TrainBackend>(
            &split.x_train, &split.y_train, hp.batch_size, pad, encoder.other(),
        );
        let dev = tagger_batches::<EvalBackend>(
            &split.x_dev, &split.y_dev, hp.batch_size, pad, encoder.other(),
        );
        let test = tagger_batches::<EvalBackend>(
            &split.x_test, &split.y_test, hp.batch_size, pad, encoder.other(),
        );

        let device = <TrainBackend as Backend>::Device::default();
        let model = ConceptTaggerConfig::new(
            vocab.len(), hp.embedding_dim, hp.hidden_size,
            hp.n_layers, hp.bidirectional, encoder.categories(), pad as usize,
        )
        .init::<TrainBackend>(&device);

        let (model, _) = fit(model, &train, &dev, hp.epochs, hp.learning_rate);
        let report = evaluate(&model.valid(), &test);
        tracing::info!(
            "{name} test: loss={:.4} acc={:.1}% (non-PAD tokens)",
            report.loss, report.accuracy * 100.0,
        );

        CheckpointManager::new(&self.config.checkpoint_dir).save_module(ckpt_name, model)
    }

    // ── Answer generator ──────────────────────────────────────

    fn train_answer_generator(&self, hp: &GeneratorHParams, records: &[KbRecord]) -> Result<()> {
        tracing::info!("=== Training answer generator ===");
        let source_vocab = Vocabulary::from_file(&hp.encoder_vocabulary_path)?;
        let target_vocab = Vocabulary::from_file(&hp.decoder_vocabulary_path)?;

        let (xs, ys, counts) = example_builder::generator_examples(
            kb_slice(records, hp.kb_len_percentage),
            &source_vocab,
            &target_vocab,
        );
        report_counts("answer generator", &counts);

        // Bucket dimensions come from the full dataset so train,
        // dev and test share one bucket geometry
        let dims = generator_dims(&ys);
        let source_pad = source_vocab.pad_id();
        let target_pad = target_vocab.pad_id();
        let split = split_dataset(xs, ys, hp.kb_split);
        let train_buckets = bucket_pairs(split.x_train, split.y_train, &dims, source_pad, target_pad);
        let dev_buckets   = bucket_pairs(split.x_dev, split.y_dev, &dims, source_pad, target_pad);
        let test_buckets  = bucket_pairs(split.x_test, split.y_test, &dims, source_pad, target_pad);

        // A non-empty `checkpoint` names the run to continue; a
        // fresh run writes into the CLI checkpoint directory
        let resume = !hp.checkpoint.is_empty();
        let ckpt_dir = if resume { hp.checkpoint.clone() } else { self.config.checkpoint_dir.clone() };
        let checkpoints = CheckpointManager::new(&ckpt_dir);
        let metrics = MetricsLogger::new(&ckpt_dir)?;

        let model_config = Seq2SeqConfig::new(
            source_vocab.len(), target_vocab.len(), hp.embedding_dim,
            hp.encoder_hidden_size, hp.decoder_hidden_size, hp.n_layers,
        );
        checkpoints.save_json("generator_config.json", &model_config)?;

        let device = <TrainBackend as Backend>::Device::default();
        let generator = model_config.init::<TrainBackend>(&device);

        let trainer = EncoderDecoderTrainer {
            options: GeneratorTrainOptions {
                batch_size:         hp.batch_size,
                epochs:             hp.epochs,
                learning_rate:      hp.learning_rate,
                early_stopping_max: hp.early_stopping_max,
                teacher_forcing:    hp.teacher_forcing,
                checkpoint_every:   hp.checkpoint_every,
                // the loss mask runs over target positions
                pad_id:             target_pad,
                go_id:              target_vocab.go_id(),
            },
            checkpoints: &checkpoints,
            metrics:     &metrics,
        };
        let (generator, outcome) = trainer.train(generator, &train_buckets, &dev_buckets, resume)?;

        match outcome {
            TrainOutcome::Converged { epoch } => {
                tracing::info!("Generator converged at epoch {epoch}")
            }
            TrainOutcome::Exhausted => tracing::info!("Generator ran the full epoch budget"),
        }

        let report = evaluate_generator(
            &generator.valid(), &test_buckets,
            hp.batch_size, target_pad, target_vocab.go_id(),
            &<EvalBackend as Backend>::Device::default(),
        );
        tracing::info!(
            "Answer generator test: loss={:.4} acc={:.1}% (non-PAD tokens)",
            report.loss, report.accuracy * 100.0,
        );
        Ok(())
    }
}

const QUESTION_CONCEPTS: usize = 2;
const ANSWER_CONCEPTS: usize = 1;

fn report_counts(name: &str, counts: &ExampleCounts) {
    tracing::info!(
        "Built {} examples for the {name} ({} records skipped)",
        counts.kept, counts.skipped,
    );
}

// ── Batch assembly ────────────────────────────────────────────

fn classifier_batches<B: Backend>(
    xs:         &[Vec<u32>],
    ys:         &[usize],
    batch_size: usize,
    pad:        u32,
) -> Vec<ClassifierBatch<B>> {
    let batcher = TokenBatcher::<B>::new(Default::default());
    let batch_size = batch_size.max(1);

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < xs.len() {
        let end = (start + batch_size).min(xs.len());
        let mut chunk = xs[start..end].to_vec();
        pad_to_longest(&mut chunk, pad);
        out.push(batcher.classifier_batch(&chunk, &ys[start..end]));
        start = end;
    }
    out
}

fn tagger_batches<B: Backend>(
    xs:         &[Vec<u32>],
    ys:         &[Vec<usize>],
    batch_size: usize,
    pad:        u32,
    other:      usize,
) -> Vec<TaggerBatch<B>> {
    let batcher = TokenBatcher::<B>::new(Default::default());
    let batch_size = batch_size.max(1);

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < xs.len() {
        let end = (start + batch_size).min(xs.len());
        let mut inputs = xs[start..end].to_vec();
        let mut tags = ys[start..end].to_vec();
        pad_to_longest(&mut inputs, pad);
        // PAD positions get the Other tag; the loss mask drops them anyway
        pad_tags_to_longest(&mut tags, other);
        out.push(batcher.tagger_batch(&inputs, &tags));
        start = end;
    }
    out
}

fn bucket_pairs(
    xs:         Vec<Vec<u32>>,
    ys:         Vec<Vec<u32>>,
    dims:       &[usize],
    source_pad: u32,
    target_pad: u32,
) -> Vec<Bucket> {
    let pairs: Vec<(Vec<u32>, Vec<u32>)> = xs.into_iter().zip(ys).collect();
    bucket(&pairs, dims, source_pad, target_pad)
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hparams_parse_camel_case_sections() {
        let json = r#"{
            "relationClassifier": {
                "vocabularyPath": "data/vocab_big.txt",
                "kbLenPercentage": 1.0,
                "kbSplit": 0.8,
                "batchSize": 32,
                "epochs": 5,
                "hiddenSize": 128,
                "nLayers": 2,
                "bidirectional": true
            },
            "conceptExtractorQuestion": {
                "vocabularyPath": "data/vocab_big.txt",
                "kbLenPercentage": 1.0,
                "kbSplit": 0.8,
                "batchSize": 32,
                "epochs": 5,
                "hiddenSize": 128,
                "nLayers": 2,
                "bidirectional": true
            },
            "conceptExtractorAnswer": {
                "vocabularyPath": "data/vocab_small.txt",
                "kbLenPercentage": 1.0,
                "kbSplit": 0.8,
                "batchSize": 32,
                "epochs": 5,
                "hiddenSize": 64,
                "nLayers": 1,
                "bidirectional": false
            },
            "answerGenerator": {
                "encoderVocabularyPath": "data/vocab_big.txt",
                "decoderVocabularyPath": "data/vocab_small.txt",
                "kbLenPercentage": 0.9,
                "kbSplit": 0.8,
                "batchSize": 16,
                "epochs": 40,
                "encoderHiddenSize": 256,
                "decoderHiddenSize": 256,
                "nLayers": 2,
                "bidirectional": true,
                "checkpoint": "",
                "earlyStoppingMax": 5
            }
        }"#;

        // The generator section may carry `bidirectional` (its encoder
        // is always unidirectional); the key is accepted and unused
        let hp: HParams = serde_json::from_str(json).unwrap();
        assert_eq!(hp.answer_generator.early_stopping_max, 5);
        assert!(!hp.answer_generator.teacher_forcing); // default off
        assert_eq!(hp.relation_classifier.embedding_dim, 300); // default
        assert!(hp.answer_generator.checkpoint.is_empty());
    }

    #[test]
    fn test_missing_required_key_is_an_error() {
        // answerGenerator lacks earlyStoppingMax
        let json = r#"{
            "relationClassifier": {
                "vocabularyPath": "v", "kbLenPercentage": 1.0, "kbSplit": 0.8,
                "batchSize": 1, "epochs": 1, "hiddenSize": 4, "nLayers": 1,
                "bidirectional": false
            },
            "conceptExtractorQuestion": {
                "vocabularyPath": "v", "kbLenPercentage": 1.0, "kbSplit": 0.8,
                "batchSize": 1, "epochs": 1, "hiddenSize": 4, "nLayers": 1,
                "bidirectional": false
            },
            "conceptExtractorAnswer": {
                "vocabularyPath": "v", "kbLenPercentage": 1.0, "kbSplit": 0.8,
                "batchSize": 1, "epochs": 1, "hiddenSize": 4, "nLayers": 1,
                "bidirectional": false
            },
            "answerGenerator": {
                "encoderVocabularyPath": "v", "decoderVocabularyPath": "v",
                "kbLenPercentage": 1.0, "kbSplit": 0.8, "batchSize": 1,
                "epochs": 1, "encoderHiddenSize": 4, "decoderHiddenSize": 4,
                "nLayers": 1, "checkpoint": ""
            }
        }"#;
        assert!(serde_json::from_str::<HParams>(json).is_err());
    }

    #[test]
    fn test_classifier_batches_pad_per_chunk() {
        let xs = vec![vec![4, 5], vec![6, 7, 8], vec![9]];
        let ys = vec![0, 1, 2];
        let batches = classifier_batches::<EvalBackend>(&xs, &ys, 2, 0);

        assert_eq!(batches.len(), 2);
        // First chunk pads to 3, second (the partial batch) to 1
        assert_eq!(batches[0].input_ids.dims(), [2, 3]);
        assert_eq!(batches[1].input_ids.dims(), [1, 1]);
    }
}
