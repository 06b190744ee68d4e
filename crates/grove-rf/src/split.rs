use rand::Rng;

use crate::dataset::{BinaryLabel, Table};
use crate::node::{FeatureIndex, Gini};

/// Gini impurity of one side from its `[zeros, ones]` counts: `1 - p0² - p1²`.
///
/// Returns 0.0 for an empty side.
#[must_use]
pub fn gini_impurity(counts: [usize; 2], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    let sum_sq: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// Size-weighted Gini impurity of a two-sided partition.
fn weighted_gini(left: [usize; 2], right: [usize; 2]) -> Gini {
    let n_left = left[0] + left[1];
    let n_right = right[0] + right[1];
    let n = (n_left + n_right) as f64;
    Gini::new(
        (n_left as f64 / n) * gini_impurity(left, n_left)
            + (n_right as f64 / n) * gini_impurity(right, n_right),
    )
}

/// Result of evaluating candidate splits for one node.
///
/// Both sides are non-empty and disjoint; together they hold every row the
/// node was given, each side in the node's original row order.
#[derive(Debug, Clone)]
pub(crate) struct DataSplit {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Rows with `value < threshold` go left.
    pub(crate) threshold: f64,
    /// Weighted Gini impurity of the partition.
    pub(crate) gini: Gini,
    /// Table rows going to the left child.
    pub(crate) left: Vec<usize>,
    /// Table rows going to the right child.
    pub(crate) right: Vec<usize>,
}

/// Find the split with the lowest weighted Gini among a random feature subset.
///
/// Draws `min(max_features, n_features)` distinct feature columns with a
/// partial Fisher-Yates shuffle. For each, every distinct value among `rows`
/// above the column minimum is a candidate threshold; the column is sorted
/// once and scanned with incremental class counts. A candidate replaces the
/// incumbent only when its score is strictly lower, so the first minimum in
/// scan order wins.
///
/// Returns `None` when every sampled column is constant over `rows`, i.e.
/// no threshold leaves both sides non-empty.
pub(crate) fn find_best_split(
    table: &Table,
    rows: &[usize],
    max_features: usize,
    rng: &mut impl Rng,
) -> Option<DataSplit> {
    let n_samples = rows.len();
    let n_features = table.n_features();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent_counts = [0usize; 2];
    for &r in rows {
        parent_counts[table.label(r).index()] += 1;
    }

    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best: Option<(Gini, FeatureIndex, f64)> = None;
    let mut sorted: Vec<(f64, BinaryLabel)> = Vec::with_capacity(n_samples);

    for &feat_idx in &feature_order[..take] {
        sorted.clear();
        sorted.extend(rows.iter().map(|&r| (table.value(r, feat_idx), table.label(r))));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = [0usize; 2];
        let mut right_counts = parent_counts;

        for i in 0..(n_samples - 1) {
            let (val_i, label_i) = sorted[i];
            left_counts[label_i.index()] += 1;
            right_counts[label_i.index()] -= 1;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let score = weighted_gini(left_counts, right_counts);
            if best.is_none_or(|(best_score, _, _)| score < best_score) {
                best = Some((score, FeatureIndex::new(feat_idx), val_next));
            }
        }
    }

    let (gini, feature, threshold) = best?;

    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .partition(|&&r| table.value(r, feature.index()) < threshold);

    Some(DataSplit {
        feature,
        threshold,
        gini,
        left,
        right,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn table(rows: &[[f64; 2]]) -> Table {
        Table::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn gini_pure() {
        assert!(gini_impurity([10, 0], 10).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_balanced() {
        assert!((gini_impurity([5, 5], 10) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_empty_side() {
        assert_eq!(gini_impurity([0, 0], 0), 0.0);
    }

    #[test]
    fn separable_data_finds_clean_split() {
        let t = table(&[
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [10.0, 1.0],
            [11.0, 1.0],
            [12.0, 1.0],
        ]);
        let rows: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&t, &rows, 1, &mut rng).expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert_eq!(split.threshold, 10.0);
        assert_eq!(split.left, vec![0, 1, 2]);
        assert_eq!(split.right, vec![3, 4, 5]);
        assert!(split.gini.value().abs() < f64::EPSILON);
    }

    #[test]
    fn constant_feature_returns_none() {
        let t = table(&[[5.0, 0.0], [5.0, 0.0], [5.0, 1.0], [5.0, 1.0]]);
        let rows: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(find_best_split(&t, &rows, 1, &mut rng).is_none());
    }

    #[test]
    fn single_row_returns_none() {
        let t = table(&[[1.0, 0.0], [2.0, 1.0]]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(find_best_split(&t, &[1], 1, &mut rng).is_none());
    }

    #[test]
    fn ties_resolve_to_first_threshold_in_scan() {
        // Thresholds 2.0 and 4.0 both score 1/3; 2.0 is scanned first.
        let t = table(&[[1.0, 0.0], [2.0, 1.0], [3.0, 1.0], [4.0, 0.0]]);
        let rows: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let split = find_best_split(&t, &rows, 1, &mut rng).unwrap();
        assert_eq!(split.threshold, 2.0);
        assert!((split.gini.value() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(split.left, vec![0]);
    }

    #[test]
    fn partitions_only_given_rows() {
        let t = table(&[
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 1.0],
            [4.0, 1.0],
            [5.0, 0.0],
        ]);
        let rows = vec![0, 2, 3];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let split = find_best_split(&t, &rows, 1, &mut rng).unwrap();
        let mut all: Vec<usize> = split.left.iter().chain(&split.right).copied().collect();
        all.sort_unstable();
        assert_eq!(all, rows);
    }

    #[test]
    fn max_features_above_feature_count_is_clamped() {
        let t = table(&[[1.0, 0.0], [2.0, 1.0]]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let split = find_best_split(&t, &[0, 1], 20, &mut rng).unwrap();
        assert_eq!(split.feature.index(), 0);
    }
}
