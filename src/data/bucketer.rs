// ============================================================
// Layer 4 — Sequence Bucketer
// ============================================================
// Groups (source, target) id-sequence pairs into fixed-width
// buckets by target length so each batch pads to its bucket's
// maxima instead of the global maximum.
//
// Assignment: first dimension d (ascending) with len(target) <= d.
// An example longer than the largest dimension is DROPPED — the
// caller declares a final catch-all dimension equal to the
// dataset maximum when it wants to keep everything.
//
// After padding, every source sequence is reversed in place.
// Reversing the source shortens the distance between the
// decoder's early outputs and the matching source tokens
// (Sutskever et al. 2014). Targets are never reversed.

/// One length bucket: a target-length ceiling and two parallel
/// lists of equal-length padded sequences.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Target-length ceiling this bucket was declared with
    pub dim: usize,
    /// Padded, REVERSED source sequences
    pub sources: Vec<Vec<u32>>,
    /// Padded target sequences (original order)
    pub targets: Vec<Vec<u32>>,
}

impl Bucket {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Partition `examples` into buckets by `dims` (ascending length
/// ceilings), pad to per-bucket maxima, and reverse sources.
/// Sources and targets index into different vocabularies, so each
/// side pads with its own id. Buckets come back in `dims` order;
/// empty ones stay in the list so bucket index keeps meaning
/// dimension index.
pub fn bucket(
    examples:   &[(Vec<u32>, Vec<u32>)],
    dims:       &[usize],
    source_pad: u32,
    target_pad: u32,
) -> Vec<Bucket> {
    debug_assert!(dims.windows(2).all(|w| w[0] <= w[1]), "dims must be ascending");

    let mut buckets: Vec<Bucket> = dims
        .iter()
        .map(|&dim| Bucket { dim, sources: Vec::new(), targets: Vec::new() })
        .collect();

    let mut dropped = 0usize;
    for (source, target) in examples {
        match dims.iter().position(|&d| target.len() <= d) {
            Some(idx) => {
                buckets[idx].sources.push(source.clone());
                buckets[idx].targets.push(target.clone());
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(
            "Dropped {} examples longer than the largest bucket dimension",
            dropped
        );
    }

    for bucket in &mut buckets {
        if bucket.is_empty() {
            continue;
        }
        let max_len_x = bucket.sources.iter().map(Vec::len).max().unwrap_or(0);
        let max_len_y = bucket.targets.iter().map(Vec::len).max().unwrap_or(0);

        for x in &mut bucket.sources {
            x.resize(max_len_x, source_pad);
            x.reverse();
        }
        for y in &mut bucket.targets {
            y.resize(max_len_y, target_pad);
        }
    }

    buckets
}

/// The bucket dimension list used for generator training: three
/// fixed ceilings plus a catch-all equal to the longest target.
pub fn generator_dims(targets: &[Vec<u32>]) -> Vec<usize> {
    let max_len = targets.iter().map(Vec::len).max().unwrap_or(0);
    let mut dims = vec![10, 20, 50];
    dims.retain(|&d| d < max_len);
    dims.push(max_len);
    dims
}

/// Reverse an already-padded source back into reading order.
/// Used at inference time to undo the training-side transform,
/// and in tests for the round-trip law.
pub fn unreverse(padded_source: &[u32]) -> Vec<u32> {
    padded_source.iter().rev().copied().collect()
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn seq(len: usize, fill: u32) -> Vec<u32> {
        vec![fill; len]
    }

    #[test]
    fn test_first_fit_assignment() {
        // Target length 7 lands in the dimension-10 bucket, nowhere else
        let examples = vec![(seq(4, 1), seq(7, 2))];
        let buckets = bucket(&examples, &[10, 20, 50, 70], 0, 0);
        assert_eq!(buckets[0].len(), 1);
        assert!(buckets[1].is_empty());
        assert!(buckets[2].is_empty());
        assert!(buckets[3].is_empty());
    }

    #[test]
    fn test_too_long_example_is_dropped() {
        let examples = vec![(seq(5, 1), seq(71, 2))];
        let buckets = bucket(&examples, &[10, 20, 50, 70], 0, 0);
        assert!(buckets.iter().all(Bucket::is_empty));
    }

    #[test]
    fn test_padded_lengths_uniform_within_bucket() {
        let examples = vec![
            (seq(3, 1), seq(5, 2)),
            (seq(8, 1), seq(9, 2)),
            (seq(6, 1), seq(2, 2)),
        ];
        let buckets = bucket(&examples, &[10], 0, 0);
        let b = &buckets[0];
        assert_eq!(b.len(), 3);
        assert!(b.sources.iter().all(|x| x.len() == 8));
        assert!(b.targets.iter().all(|y| y.len() == 9));
    }

    #[test]
    fn test_padding_is_at_source_head_after_reversal() {
        // Tail padding then reversal puts PAD ids at the front
        let examples = vec![(vec![1, 2, 3], seq(4, 9)), (seq(5, 7), seq(4, 9))];
        let buckets = bucket(&examples, &[10], 0, 0);
        assert_eq!(buckets[0].sources[0], vec![0, 0, 3, 2, 1]);
    }

    #[test]
    fn test_each_side_pads_with_its_own_id() {
        let examples = vec![(vec![1, 2], vec![5]), (vec![1, 2, 3], vec![5, 6])];
        let buckets = bucket(&examples, &[10], 0, 9);
        assert_eq!(buckets[0].sources[0], vec![0, 2, 1]);
        assert_eq!(buckets[0].targets[0], vec![5, 9]);
    }

    #[test]
    fn test_targets_are_never_reversed() {
        let examples = vec![(vec![1, 2], vec![5, 6, 7])];
        let buckets = bucket(&examples, &[10], 0, 0);
        assert_eq!(buckets[0].targets[0], vec![5, 6, 7]);
    }

    #[test]
    fn test_reversal_round_trip() {
        let examples = vec![(vec![1, 2, 3, 4], vec![5, 6])];
        let buckets = bucket(&examples, &[10], 0, 0);
        let padded_reversed = &buckets[0].sources[0];
        assert_eq!(unreverse(&unreverse(padded_reversed)), *padded_reversed);
        assert_eq!(unreverse(padded_reversed), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_input_order_preserved_within_bucket() {
        let examples = vec![
            (vec![1], vec![1]),
            (vec![2], vec![2]),
            (vec![3], vec![3]),
        ];
        let buckets = bucket(&examples, &[5], 0, 0);
        assert_eq!(buckets[0].targets, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_generator_dims_appends_catch_all() {
        let targets = vec![seq(64, 1), seq(12, 1)];
        assert_eq!(generator_dims(&targets), vec![10, 20, 50, 64]);
    }

    #[test]
    fn test_generator_dims_short_dataset() {
        // Ceilings not below the max are replaced by the catch-all
        let targets = vec![seq(8, 1)];
        assert_eq!(generator_dims(&targets), vec![8]);
    }
}
