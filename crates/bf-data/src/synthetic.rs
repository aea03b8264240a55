//! Synthetic binary classification tables for smoke tests and demos.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bf_types::{validation_error, BfResult};

use crate::dataset::TabularDataset;

/// Name of the label column produced by [`make_classification`].
pub const SYNTHETIC_LABEL: &str = "label";

/// Generate `rows` rows of `features` uniform features in `[-1, 1]` named
/// `f0..fN` and a binary `label` from a noisy linear rule.
///
/// The rule alternates the sign of each feature's weight so every column
/// carries signal. Both classes are guaranteed to appear when `rows >= 2`.
pub fn make_classification(rows: usize, features: usize, seed: u64) -> BfResult<TabularDataset> {
    if features == 0 {
        return Err(validation_error!("synthetic table needs at least one feature"));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let weights: Vec<f64> = (0..features)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign * (1.0 + i as f64 * 0.25)
        })
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(rows); features];
    let mut labels = Vec::with_capacity(rows);

    for _ in 0..rows {
        let mut score = rng.gen_range(-0.25..0.25);
        for (column, weight) in columns.iter_mut().zip(&weights) {
            let x: f64 = rng.gen_range(-1.0..=1.0);
            score += weight * x;
            column.push(x);
        }
        labels.push(if score > 0.0 { 1.0 } else { 0.0 });
    }

    // Force both classes so metrics like AUC are always defined.
    if rows >= 2 {
        labels[0] = 0.0;
        labels[rows - 1] = 1.0;
    }

    let mut named: Vec<(String, Vec<f64>)> = columns
        .into_iter()
        .enumerate()
        .map(|(i, values)| (format!("f{i}"), values))
        .collect();
    named.push((SYNTHETIC_LABEL.to_string(), labels));

    TabularDataset::from_columns(SYNTHETIC_LABEL, named)
}
