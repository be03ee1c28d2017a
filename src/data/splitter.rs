// ============================================================
// Layer 4 — Train/Dev/Test Splitter
// ============================================================
// Deterministic, contiguous, order-preserving partition — NOT a
// random sample. Reproducibility across runs matters more here
// than shuffling: checkpoint resume must see the same example
// order it saw before the restart.
//
// Boundaries use integer-floor arithmetic:
//   b1 = floor(n * p)              train = [0, b1)
//   b2 = floor(n * (p + 1) / 2)    dev   = [b1, b2)
//                                  test  = [b2, n)
// so the tail after the training slice splits into two equal
// halves. On tiny datasets dev and test may come out empty;
// callers must tolerate that.

/// Split one ordered list into contiguous (train, dev, test) slices.
pub fn split3<T>(items: Vec<T>, p_split: f64) -> (Vec<T>, Vec<T>, Vec<T>) {
    let n = items.len();
    let b1 = ((n as f64) * p_split) as usize;
    let b2 = ((n as f64) * (p_split + 1.0) / 2.0) as usize;
    let (b1, b2) = (b1.min(n), b2.clamp(b1.min(n), n));

    let mut train = items;
    let mut dev = train.split_off(b1);
    let test = dev.split_off(b2 - b1);

    tracing::debug!(
        "Dataset split: {} train, {} dev, {} test",
        train.len(),
        dev.len(),
        test.len(),
    );

    (train, dev, test)
}

/// The six parallel slices of a paired (X, Y) dataset.
pub struct DatasetSplit<X, Y> {
    pub x_train: Vec<X>,
    pub y_train: Vec<Y>,
    pub x_dev: Vec<X>,
    pub y_dev: Vec<Y>,
    pub x_test: Vec<X>,
    pub y_test: Vec<Y>,
}

/// Split parallel X/Y lists with the same boundaries.
pub fn split_dataset<X, Y>(xs: Vec<X>, ys: Vec<Y>, p_split: f64) -> DatasetSplit<X, Y> {
    debug_assert_eq!(xs.len(), ys.len(), "X and Y must be parallel");
    let (x_train, x_dev, x_test) = split3(xs, p_split);
    let (y_train, y_dev, y_test) = split3(ys, p_split);
    DatasetSplit { x_train, y_train, x_dev, y_dev, x_test, y_test }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eighty_ten_ten() {
        let items: Vec<usize> = (0..100).collect();
        let (train, dev, test) = split3(items, 0.8);
        assert_eq!(train.len(), 80);
        assert_eq!(dev.len(), 10);
        assert_eq!(test.len(), 10);
    }

    #[test]
    fn test_partition_preserves_order_and_elements() {
        let items: Vec<usize> = (0..100).collect();
        let (train, dev, test) = split3(items, 0.8);
        let rebuilt: Vec<usize> = train.into_iter().chain(dev).chain(test).collect();
        assert_eq!(rebuilt, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_floor_arithmetic_on_odd_sizes() {
        // n=7, p=0.6: b1 = floor(4.2) = 4, b2 = floor(7*0.8) = 5
        let (train, dev, test) = split3((0..7).collect::<Vec<usize>>(), 0.6);
        assert_eq!(train, vec![0, 1, 2, 3]);
        assert_eq!(dev, vec![4]);
        assert_eq!(test, vec![5, 6]);
    }

    #[test]
    fn test_tiny_dataset_may_have_empty_slices() {
        let (train, dev, test) = split3(vec![1], 0.8);
        assert_eq!(train, vec![1]);
        assert!(dev.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_empty_dataset() {
        let (train, dev, test) = split3(Vec::<usize>::new(), 0.8);
        assert!(train.is_empty() && dev.is_empty() && test.is_empty());
    }

    #[test]
    fn test_paired_split_keeps_xy_aligned() {
        let xs: Vec<usize> = (0..10).collect();
        let ys: Vec<usize> = (100..110).collect();
        let split = split_dataset(xs, ys, 0.8);
        assert_eq!(split.x_train.len(), split.y_train.len());
        assert_eq!(split.x_dev.len(), split.y_dev.len());
        assert_eq!(split.x_test.len(), split.y_test.len());
        assert_eq!(split.x_train[3] + 100, split.y_train[3]);
    }
}
