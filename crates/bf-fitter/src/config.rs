//! Fitter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use bf_types::{validation_error, BfResult};

use crate::metrics::Metric;

/// Settings for [`crate::XgbFitter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Name of the label column in train and eval tables.
    pub label: String,

    /// Metric turned into the search loss.
    pub metric: Metric,

    /// Number of configurations evaluated by one search.
    pub max_eval: usize,

    /// Probabilities above this become the positive label for non-ranking metrics.
    pub threshold: f32,

    /// Seed for the search strategy; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            label: "label".to_string(),
            metric: Metric::Error,
            max_eval: 100,
            threshold: 0.5,
            seed: None,
        }
    }
}

impl FitterConfig {
    /// Read a JSON config; absent fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> BfResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = max_eval;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> BfResult<()> {
        if self.label.is_empty() {
            return Err(validation_error!("label column name is empty"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(validation_error!(
                "threshold {} outside [0, 1]",
                self.threshold
            ));
        }
        Ok(())
    }
}
