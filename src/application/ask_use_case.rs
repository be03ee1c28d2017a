// ============================================================
// Layer 2 — Ask Use Case
// ============================================================
// Inference path: load the trained generator, index the question
// against the encoder vocabulary (EOS appended, exactly as in
// training), decode greedily until EOS, detokenize against the
// decoder vocabulary.

use anyhow::Result;

use crate::application::train_use_case::HParams;
use crate::data::vocabulary::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::GeneratorInferencer;

/// Longest answer the decoder may produce before being cut off.
const MAX_ANSWER_LEN: usize = 50;

pub struct AskUseCase {
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
    inferencer:   GeneratorInferencer,
}

impl AskUseCase {
    pub fn new(hparams_path: &str, checkpoint_dir: &str) -> Result<Self> {
        let hparams = HParams::from_file(hparams_path)?;
        let hp = &hparams.answer_generator;

        let source_vocab = Vocabulary::from_file(&hp.encoder_vocabulary_path)?;
        let target_vocab = Vocabulary::from_file(&hp.decoder_vocabulary_path)?;

        let checkpoints = CheckpointManager::new(checkpoint_dir);
        let inferencer = GeneratorInferencer::from_checkpoint(&checkpoints)?;

        Ok(Self { source_vocab, target_vocab, inferencer })
    }

    pub fn answer(&self, question: &str) -> Result<String> {
        let mut question_ids = self
            .source_vocab
            .sentence2indices(&question.trim().to_lowercase());
        question_ids.push(self.source_vocab.eos_id());

        let answer_ids = self.inferencer.generate(
            &question_ids,
            self.target_vocab.go_id(),
            self.target_vocab.eos_id(),
            MAX_ANSWER_LEN,
        );

        let answer = self.target_vocab.indices2sentence(&answer_ids);
        if answer.is_empty() {
            return Ok("I don't know.".to_string());
        }
        Ok(answer)
    }
}
