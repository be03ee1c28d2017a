// ============================================================
// Layer 5 — Generator Inference
// ============================================================
// Rebuilds the answer generator from a checkpoint directory
// (architecture from generator_config.json, weights from the
// burn record) and decodes greedily until EOS.

use anyhow::Result;
use burn::prelude::*;

use crate::data::bucketer;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{AnswerGenerator, Seq2SeqConfig};
use crate::ml::trainer::EvalBackend;

/// Greedy free-running decode. `source_ids` must already carry
/// the same transform as training inputs (EOS appended, then
/// reversed). Stops at EOS or after `max_len` tokens; the EOS
/// itself is not part of the returned answer.
pub fn greedy_decode<B: Backend>(
    generator:  &AnswerGenerator<B>,
    source_ids: &[u32],
    go_id:      u32,
    eos_id:     u32,
    max_len:    usize,
    device:     &B::Device,
) -> Vec<u32> {
    let ints: Vec<i32> = source_ids.iter().map(|&id| id as i32).collect();
    let source = Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device).reshape([1, ints.len()]);

    let mut hidden = generator.encoder.forward(source);
    let mut input = Tensor::<B, 1, Int>::from_ints([go_id as i32].as_slice(), device);

    let mut answer = Vec::new();
    for _ in 0..max_len {
        let log_probs = generator.decoder.step(input, &mut hidden);
        let next = log_probs.argmax(1).into_scalar().elem::<i64>() as u32;
        if next == eos_id {
            break;
        }
        answer.push(next);
        input = Tensor::from_ints([next as i32].as_slice(), device);
    }
    answer
}

pub struct GeneratorInferencer {
    generator: AnswerGenerator<EvalBackend>,
    device:    <EvalBackend as Backend>::Device,
}

impl GeneratorInferencer {
    /// Load architecture and weights from a training checkpoint.
    /// Missing or corrupt files are fatal — there is nothing
    /// sensible to answer with an untrained model.
    pub fn from_checkpoint(checkpoints: &CheckpointManager) -> Result<Self> {
        let config: Seq2SeqConfig = checkpoints.load_json("generator_config.json")?;
        let device = <EvalBackend as Backend>::Device::default();

        let generator = config.init::<EvalBackend>(&device);
        let generator = checkpoints.load_module("generator", generator, &device)?;

        tracing::info!(
            "Generator loaded: {} source / {} target words, {} layers",
            config.source_vocab_size, config.target_vocab_size, config.n_layers,
        );
        Ok(Self { generator, device })
    }

    /// `question_ids` is the plain id sequence (EOS already
    /// appended); reversal happens here to match training.
    pub fn generate(&self, question_ids: &[u32], go_id: u32, eos_id: u32, max_len: usize) -> Vec<u32> {
        let reversed = bucketer::unreverse(question_ids);
        greedy_decode(&self.generator, &reversed, go_id, eos_id, max_len, &self.device)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_decode_respects_max_len() {
        let device = Default::default();
        let generator = Seq2SeqConfig::new(20, 12, 8, 6, 6, 1).init::<EvalBackend>(&device);

        let answer = greedy_decode(&generator, &[3, 5, 4], 2, 3, 6, &device);
        assert!(answer.len() <= 6);
        // Neither EOS nor ids beyond the target vocabulary appear
        assert!(answer.iter().all(|&id| id != 3 && id < 12));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let device = Default::default();
        let generator = Seq2SeqConfig::new(20, 12, 8, 6, 6, 1).init::<EvalBackend>(&device);

        let a = greedy_decode(&generator, &[3, 5, 4], 2, 3, 8, &device);
        let b = greedy_decode(&generator, &[3, 5, 4], 2, 3, 8, &device);
        assert_eq!(a, b);
    }
}
