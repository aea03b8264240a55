//! Classification metrics and their conversion into a search loss.
//!
//! Every metric is a score in `[0, 1]` where higher is better; the search
//! minimizes `1 - score`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use bf_types::{BfError, BfResult};

/// Metric used to score eval-set predictions during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Accuracy; the loss is the error rate.
    #[default]
    Error,
    /// Binary precision of the positive label `1`. Labels must be 0 or 1.
    Precision,
    /// Binary recall of the positive label `1`. Labels must be 0 or 1.
    Recall,
    /// Unweighted mean of per-class F1.
    MacroF1,
    /// F1 over global counts.
    MicroF1,
    /// Area under the ROC curve. Expects scores, not hard labels.
    Auc,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Error,
        Metric::Precision,
        Metric::Recall,
        Metric::MacroF1,
        Metric::MicroF1,
        Metric::Auc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Error => "error",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::MacroF1 => "macro_f1",
            Metric::MicroF1 => "micro_f1",
            Metric::Auc => "auc",
        }
    }

    /// Ranking metrics are scored on raw probabilities instead of thresholded labels.
    pub fn uses_scores(&self) -> bool {
        matches!(self, Metric::Auc)
    }

    pub fn score(&self, y_true: &[f32], y_pred: &[f32]) -> BfResult<f64> {
        check_inputs(y_true, y_pred)?;
        match self {
            Metric::Error => Ok(accuracy(y_true, y_pred)),
            Metric::Precision => {
                check_binary(y_true, y_pred)?;
                let counts = BinaryCounts::new(y_true, y_pred, 1.0);
                Ok(ratio(counts.tp, counts.tp + counts.fp))
            }
            Metric::Recall => {
                check_binary(y_true, y_pred)?;
                let counts = BinaryCounts::new(y_true, y_pred, 1.0);
                Ok(ratio(counts.tp, counts.tp + counts.fn_))
            }
            Metric::MacroF1 => Ok(macro_f1(y_true, y_pred)),
            Metric::MicroF1 => Ok(micro_f1(y_true, y_pred)),
            Metric::Auc => roc_auc(y_true, y_pred),
        }
    }

    /// `1 - score`, the value minimized by the search.
    pub fn loss(&self, y_true: &[f32], y_pred: &[f32]) -> BfResult<f64> {
        Ok(1.0 - self.score(y_true, y_pred)?)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| BfError::UnknownMetric(s.to_string()))
    }
}

fn check_inputs(y_true: &[f32], y_pred: &[f32]) -> BfResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(BfError::Metric(format!(
            "{} labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(BfError::Metric("no samples to score".to_string()));
    }
    Ok(())
}

fn check_binary(y_true: &[f32], y_pred: &[f32]) -> BfResult<()> {
    match y_true
        .iter()
        .chain(y_pred)
        .find(|&&v| v != 0.0 && v != 1.0)
    {
        Some(v) => Err(BfError::Metric(format!(
            "binary metric got label {v}; expected 0 or 1"
        ))),
        None => Ok(()),
    }
}

/// Zero denominators score 0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Default)]
struct BinaryCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl BinaryCounts {
    fn new(y_true: &[f32], y_pred: &[f32], positive: f32) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == positive, p == positive) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }

    fn f1(&self) -> f64 {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }
}

fn accuracy(y_true: &[f32], y_pred: &[f32]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Sorted distinct labels seen in either input.
fn label_union(y_true: &[f32], y_pred: &[f32]) -> Vec<f32> {
    let mut labels: Vec<f32> = y_true.iter().chain(y_pred).copied().collect();
    labels.sort_by(f32::total_cmp);
    labels.dedup();
    labels
}

fn macro_f1(y_true: &[f32], y_pred: &[f32]) -> f64 {
    let labels = label_union(y_true, y_pred);
    let total: f64 = labels
        .iter()
        .map(|&label| BinaryCounts::new(y_true, y_pred, label).f1())
        .sum();
    total / labels.len() as f64
}

fn micro_f1(y_true: &[f32], y_pred: &[f32]) -> f64 {
    let mut pooled = BinaryCounts::default();
    for label in label_union(y_true, y_pred) {
        let counts = BinaryCounts::new(y_true, y_pred, label);
        pooled.tp += counts.tp;
        pooled.fp += counts.fp;
        pooled.fn_ += counts.fn_;
    }
    pooled.f1()
}

/// ROC AUC from the Mann-Whitney rank statistic; tied scores share their
/// average rank. The larger of the two labels is the positive class.
fn roc_auc(y_true: &[f32], scores: &[f32]) -> BfResult<f64> {
    let mut classes: Vec<f32> = y_true.to_vec();
    classes.sort_by(f32::total_cmp);
    classes.dedup();
    if classes.len() != 2 {
        return Err(BfError::Metric(format!(
            "ROC AUC needs exactly two classes in y_true, found {}",
            classes.len()
        )));
    }
    let positive = classes[1];

    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(BfError::Metric(format!(
            "ROC AUC needs finite scores, got {bad}"
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0f64; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }

    let n_pos = y_true.iter().filter(|&&t| t == positive).count() as f64;
    let n_neg = y_true.len() as f64 - n_pos;
    let rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|&(&t, _)| t == positive)
        .map(|(_, &r)| r)
        .sum();

    Ok((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
