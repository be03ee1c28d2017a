// ============================================================
// Layer 5 — Token Batcher
// ============================================================
// Turns padded id sequences into Int tensors on a device. All
// rows inside one call must already share a length — buckets
// guarantee that for the generator, and `pad_to_longest` does it
// for the classifier/tagger batches.

use burn::prelude::*;

#[derive(Clone)]
pub struct TokenBatcher<B: Backend> {
    device: B::Device,
}

/// Question ids + one relation label per row.
#[derive(Clone, Debug)]
pub struct ClassifierBatch<B: Backend> {
    pub input_ids: Tensor<B, 2, Int>,
    pub labels:    Tensor<B, 1, Int>,
}

/// Question ids + one tag category per token.
#[derive(Clone, Debug)]
pub struct TaggerBatch<B: Backend> {
    pub input_ids: Tensor<B, 2, Int>,
    pub labels:    Tensor<B, 2, Int>,
}

/// Reversed source ids + gold target ids for the generator.
#[derive(Clone, Debug)]
pub struct SeqPairBatch<B: Backend> {
    pub source_ids: Tensor<B, 2, Int>,
    pub target_ids: Tensor<B, 2, Int>,
}

impl<B: Backend> TokenBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn classifier_batch(&self, sequences: &[Vec<u32>], labels: &[usize]) -> ClassifierBatch<B> {
        let label_ints: Vec<i32> = labels.iter().map(|&l| l as i32).collect();
        ClassifierBatch {
            input_ids: self.id_tensor(sequences),
            labels:    Tensor::from_ints(label_ints.as_slice(), &self.device),
        }
    }

    pub fn tagger_batch(&self, sequences: &[Vec<u32>], tags: &[Vec<usize>]) -> TaggerBatch<B> {
        let rows: Vec<Vec<u32>> = tags
            .iter()
            .map(|row| row.iter().map(|&t| t as u32).collect())
            .collect();
        TaggerBatch {
            input_ids: self.id_tensor(sequences),
            labels:    self.id_tensor(&rows),
        }
    }

    pub fn seq_pair_batch(&self, sources: &[Vec<u32>], targets: &[Vec<u32>]) -> SeqPairBatch<B> {
        SeqPairBatch {
            source_ids: self.id_tensor(sources),
            target_ids: self.id_tensor(targets),
        }
    }

    /// [rows][cols] of ids → Int tensor [rows, cols]. Rows must be uniform.
    fn id_tensor(&self, rows: &[Vec<u32>]) -> Tensor<B, 2, Int> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == n_cols));

        let flat: Vec<i32> = rows
            .iter()
            .flat_map(|row| row.iter().map(|&id| id as i32))
            .collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([n_rows, n_cols])
    }
}

/// Tail-pad every row to the longest row in the slice.
pub fn pad_to_longest(rows: &mut [Vec<u32>], pad: u32) {
    let longest = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(longest, pad);
    }
}

/// Same, for usize tag rows (filled with the Other category).
pub fn pad_tags_to_longest(rows: &mut [Vec<usize>], fill: usize) {
    let longest = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(longest, fill);
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn test_classifier_batch_shapes() {
        let batcher = TokenBatcher::<B>::new(Default::default());
        let batch = batcher.classifier_batch(
            &[vec![4, 5, 6, 0], vec![7, 8, 0, 0]],
            &[3, 11],
        );
        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);

        let labels = batch.labels.into_data().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![3, 11]);
    }

    #[test]
    fn test_tagger_batch_keeps_token_alignment() {
        let batcher = TokenBatcher::<B>::new(Default::default());
        let batch = batcher.tagger_batch(
            &[vec![4, 5, 6], vec![7, 8, 0]],
            &[vec![0, 6, 6], vec![3, 6, 6]],
        );
        assert_eq!(batch.input_ids.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(), [2, 3]);
    }

    #[test]
    fn test_pad_to_longest_tail_pads() {
        let mut rows = vec![vec![4, 5], vec![6, 7, 8, 9], vec![10]];
        pad_to_longest(&mut rows, 0);
        assert_eq!(rows[0], vec![4, 5, 0, 0]);
        assert_eq!(rows[1], vec![6, 7, 8, 9]);
        assert_eq!(rows[2], vec![10, 0, 0, 0]);
    }
}
