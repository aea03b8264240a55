//! Handle to a trained booster.

use std::fmt;
use std::path::Path;

use xgboost::{Booster, DMatrix};

use bf_data::{FeatureMatrix, TabularDataset};
use bf_types::{BfError, BfResult, DataError, TrainingError};

/// A trained XGBoost model together with the feature layout it expects.
pub struct TrainedModel {
    booster: Booster,
    feature_names: Vec<String>,
    rounds: u32,
    best_iteration: Option<u32>,
    best_score: Option<f32>,
}

impl TrainedModel {
    pub(crate) fn new(
        booster: Booster,
        feature_names: Vec<String>,
        rounds: u32,
        best_iteration: Option<u32>,
        best_score: Option<f32>,
    ) -> Self {
        Self {
            booster,
            feature_names,
            rounds,
            best_iteration,
            best_score,
        }
    }

    /// Load a booster written by [`TrainedModel::save`]. The binary format does
    /// not carry column names, so the caller supplies them.
    pub fn load(path: impl AsRef<Path>, feature_names: Vec<String>) -> BfResult<Self> {
        let booster = Booster::load(path.as_ref()).map_err(booster_error)?;
        Ok(Self::new(booster, feature_names, 0, None, None))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Boosting rounds actually run, including the ones after the best round.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Zero-based round with the best eval score.
    pub fn best_iteration(&self) -> Option<u32> {
        self.best_iteration
    }

    pub fn best_score(&self) -> Option<f32> {
        self.best_score
    }

    /// Positive-class probabilities, one per row. The label column is ignored
    /// when present; the remaining columns must match the training features.
    pub fn predict(&self, data: &TabularDataset) -> BfResult<Vec<f32>> {
        let matrix = data.feature_matrix()?;
        if matrix.feature_names != self.feature_names {
            return Err(DataError::SchemaMismatch {
                expected: self.feature_names.clone(),
                actual: matrix.feature_names,
            }
            .into());
        }
        if matrix.num_rows == 0 {
            return Ok(Vec::new());
        }

        let dmat = to_dmatrix(&matrix, None)?;
        self.booster.predict(&dmat).map_err(booster_error)
    }

    /// Hard labels: `1` where the probability exceeds `threshold`, else `0`.
    pub fn predict_labels(&self, data: &TabularDataset, threshold: f32) -> BfResult<Vec<f32>> {
        Ok(threshold_labels(&self.predict(data)?, threshold))
    }

    /// Write the booster in XGBoost's binary model format.
    pub fn save(&self, path: impl AsRef<Path>) -> BfResult<()> {
        self.booster.save(path.as_ref()).map_err(booster_error)
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("feature_names", &self.feature_names)
            .field("rounds", &self.rounds)
            .field("best_iteration", &self.best_iteration)
            .field("best_score", &self.best_score)
            .finish_non_exhaustive()
    }
}

pub(crate) fn threshold_labels(probabilities: &[f32], threshold: f32) -> Vec<f32> {
    probabilities
        .iter()
        .map(|&p| if p > threshold { 1.0 } else { 0.0 })
        .collect()
}

pub(crate) fn to_dmatrix(matrix: &FeatureMatrix, labels: Option<&[f32]>) -> BfResult<DMatrix> {
    let mut dmat = DMatrix::from_dense(&matrix.values, matrix.num_rows).map_err(booster_error)?;
    if let Some(labels) = labels {
        dmat.set_labels(labels).map_err(booster_error)?;
    }
    Ok(dmat)
}

pub(crate) fn booster_error(err: impl fmt::Display) -> BfError {
    TrainingError::Booster {
        message: err.to_string(),
    }
    .into()
}
