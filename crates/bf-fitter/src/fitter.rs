//! XGBoost training and TPE hyperparameter search.

use tracing::{debug, info, warn};
use xgboost::Booster;

use bf_data::TabularDataset;
use bf_optimizer::{ParameterSet, Study, StudyConfig, Trial};
use bf_types::{BfResult, DataError, TrainingError};

use crate::config::FitterConfig;
use crate::metrics::Metric;
use crate::model::{booster_error, threshold_labels, to_dmatrix, TrainedModel};
use crate::params::XgbParams;
use crate::space::XgbSearchSpace;

/// Trains boosted-tree binary classifiers and searches their hyperparameters.
///
/// The fitter owns the most recently trained model and the best parameters
/// found by the last [`XgbFitter::search`]. Every mutating call takes
/// `&mut self`, so one fitter never trains two models at once.
pub struct XgbFitter {
    config: FitterConfig,
    space: XgbSearchSpace,
    model: Option<TrainedModel>,
    opt_params: ParameterSet,
    trials: Vec<Trial>,
}

impl XgbFitter {
    pub fn new(config: FitterConfig) -> Self {
        Self::with_space(config, XgbSearchSpace::default())
    }

    pub fn with_space(config: FitterConfig, space: XgbSearchSpace) -> Self {
        Self {
            config,
            space,
            model: None,
            opt_params: ParameterSet::new(),
            trials: Vec::new(),
        }
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    pub fn space(&self) -> &XgbSearchSpace {
        &self.space
    }

    /// Latest trained model, if any.
    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    /// Best configuration from the last search; empty until one succeeds.
    pub fn opt_params(&self) -> &ParameterSet {
        &self.opt_params
    }

    /// Every trial of the last search, in evaluation order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Lowest loss among the last search's completed trials.
    pub fn best_loss(&self) -> Option<f64> {
        self.trials
            .iter()
            .filter_map(|t| t.result.as_ref())
            .map(|r| r.objective)
            .reduce(f64::min)
    }

    /// Loss of `y_pred` against `y_true` under the configured metric.
    pub fn loss(&self, y_true: &[f32], y_pred: &[f32]) -> BfResult<f64> {
        self.config.metric.loss(y_true, y_pred)
    }

    /// Draw one configuration uniformly from the search space.
    pub fn random_params(&self) -> BfResult<ParameterSet> {
        self.space
            .to_search_space()
            .sample(&mut rand::thread_rng())
    }

    /// Train on `train`, watching `eval` for early stopping, and keep the
    /// result as the current model.
    pub fn train(
        &mut self,
        train: &TabularDataset,
        eval: &TabularDataset,
        params: &ParameterSet,
    ) -> BfResult<()> {
        let params = XgbParams::try_from(params)?;
        let train = self.labeled(train)?;
        let eval = self.labeled(eval)?;

        let train_x = train.feature_matrix()?;
        let train_y = train.labels()?;
        let eval_x = eval.feature_matrix()?;
        let eval_y = eval.labels()?;
        if eval_x.feature_names != train_x.feature_names {
            return Err(DataError::SchemaMismatch {
                expected: train_x.feature_names,
                actual: eval_x.feature_names,
            }
            .into());
        }

        let dtrain = to_dmatrix(&train_x, Some(&train_y))?;
        let deval = to_dmatrix(&eval_x, Some(&eval_y))?;
        let booster_params = params.booster_parameters()?;
        let mut booster = Booster::new_with_cached_dmats(&booster_params, &[&dtrain, &deval])
            .map_err(booster_error)?;

        let metric = params.eval_metric;
        let patience = params.early_stopping_rounds;
        let mut best: Option<(u32, f32)> = None;
        let mut rounds = 0;

        for round in 0..params.num_round {
            booster
                .update(&dtrain, round as i32)
                .map_err(booster_error)?;
            rounds = round + 1;

            let scores = booster.evaluate(&deval).map_err(booster_error)?;
            let score = scores
                .get(metric.as_str())
                .or_else(|| scores.values().next())
                .copied()
                .ok_or_else(|| booster_error(format!("no {} score for eval set", metric)))?;

            match best {
                Some((best_round, best_score)) if !metric.improves(score, best_score) => {
                    // zero patience disables early stopping
                    if patience > 0 && round - best_round >= patience {
                        debug!(
                            "Early stopping at round {}: best {} {:.5} at round {}",
                            round, metric, best_score, best_round
                        );
                        break;
                    }
                }
                _ => best = Some((round, score)),
            }
        }

        self.model = Some(TrainedModel::new(
            booster,
            train_x.feature_names,
            rounds,
            best.map(|(round, _)| round),
            best.map(|(_, score)| score),
        ));
        Ok(())
    }

    /// Run a TPE search of `max_eval` trials and store the best configuration
    /// in [`XgbFitter::opt_params`]. Any failed trial aborts the search.
    pub fn search(&mut self, train: &TabularDataset, eval: &TabularDataset) -> BfResult<()> {
        self.opt_params = ParameterSet::new();
        self.trials.clear();

        let eval = self.labeled(eval)?;
        let eval_y = eval.labels()?;
        let eval_features = eval.without_label()?;

        let metric = self.config.metric;
        let threshold = self.config.threshold;
        let study_config = StudyConfig::new(
            format!("xgboost-{}", metric),
            self.space.to_search_space(),
            "tpe",
        )
        .with_max_trials(self.config.max_eval)
        .with_seed(self.config.seed);
        let mut study = Study::new(study_config)?;

        info!(
            "Searching {} XGBoost configurations on {} train / {} eval rows, metric {}",
            self.config.max_eval,
            train.num_rows(),
            eval.num_rows(),
            metric
        );

        let outcome = study.run(|params| {
            self.train(train, &eval, params)?;
            let model = self.model.as_ref().ok_or(TrainingError::NotTrained)?;
            let probabilities = model.predict(&eval_features)?;
            score_predictions(metric, threshold, &eval_y, probabilities)
        });
        self.trials = study.into_trials();

        let best = outcome?;
        info!(
            "Search finished after {} trials, best loss {:.5}",
            self.trials.len(),
            best.objective
        );
        self.opt_params = best.parameters;
        Ok(())
    }

    /// Positive-class probabilities from the latest model.
    pub fn predict(&self, data: &TabularDataset) -> BfResult<Vec<f32>> {
        let model = self.model.as_ref().ok_or(TrainingError::NotTrained)?;
        model.predict(&self.labeled(data)?)
    }

    /// View `data` with the configured label column, so it never leaks into features.
    fn labeled(&self, data: &TabularDataset) -> BfResult<TabularDataset> {
        if data.label() == self.config.label {
            Ok(data.clone())
        } else {
            TabularDataset::new(data.batch().clone(), self.config.label.clone())
        }
    }
}

fn score_predictions(
    metric: Metric,
    threshold: f32,
    y_true: &[f32],
    probabilities: Vec<f32>,
) -> BfResult<f64> {
    if metric.uses_scores() {
        if probabilities.iter().all(|&p| p == 0.0 || p == 1.0) {
            warn!("{} is scoring hard 0/1 predictions instead of probabilities", metric);
        }
        metric.loss(y_true, &probabilities)
    } else {
        metric.loss(y_true, &threshold_labels(&probabilities, threshold))
    }
}
