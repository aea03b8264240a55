//! Sequential optimization loop.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use bf_types::{BfResult, SearchError};

use crate::search::{ParameterSet, SearchStrategy};
use crate::trial::{StudyConfig, StudyStatus, Trial, TrialResult};

/// One optimization run: a strategy, a trial budget and the trials produced.
///
/// Trials run one at a time; the first failing objective aborts the study.
pub struct Study {
    status: StudyStatus,
    strategy: Box<dyn SearchStrategy>,
    trials: Vec<Trial>,
}

impl Study {
    /// Create a study using the strategy named in `config`.
    pub fn new(config: StudyConfig) -> BfResult<Self> {
        let strategy = config.build_strategy()?;
        Ok(Self::with_strategy(config, strategy))
    }

    pub fn with_strategy(config: StudyConfig, strategy: Box<dyn SearchStrategy>) -> Self {
        Self {
            status: StudyStatus::new(config),
            strategy,
            trials: Vec::new(),
        }
    }

    pub fn status(&self) -> &StudyStatus {
        &self.status
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn into_trials(self) -> Vec<Trial> {
        self.trials
    }

    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.status.best_trial.as_ref()
    }

    /// Evaluate `objective` for up to `max_trials` suggestions and return the
    /// best result. Every suggestion's loss is reported back to the strategy.
    pub fn run<F>(&mut self, mut objective: F) -> BfResult<TrialResult>
    where
        F: FnMut(&ParameterSet) -> BfResult<f64>,
    {
        let max_trials = self.status.config.max_trials;
        info!(
            "Starting study '{}' with {} strategy ({} trials)",
            self.status.config.name,
            self.strategy.name(),
            max_trials
        );
        self.status.mark_running();

        for trial_number in 0..max_trials {
            let params = match self.strategy.suggest(1) {
                Ok(mut batch) => match batch.pop() {
                    Some(params) => params,
                    None => {
                        warn!("Strategy exhausted after {} trials", trial_number);
                        break;
                    }
                },
                Err(e) => {
                    self.status.mark_failed(e.to_string());
                    return Err(e);
                }
            };

            let mut trial = Trial::new(self.status.id, trial_number, params);
            trial.mark_running();
            let started = Instant::now();

            let outcome = objective(&trial.parameters)
                .and_then(|loss| self.strategy.report(&trial.parameters, loss).map(|_| loss));

            match outcome {
                Ok(loss) => {
                    let result = TrialResult {
                        trial_id: trial.id,
                        objective: loss,
                        metrics: HashMap::new(),
                        parameters: trial.parameters.clone(),
                        duration_ms: Some(started.elapsed().as_millis() as u64),
                    };
                    debug!("Trial {} finished with objective {:.6}", trial_number, loss);
                    if self.status.update_best(&result) {
                        info!("Trial {} is the new best: {:.6}", trial_number, loss);
                    }
                    trial.mark_completed(result);
                    self.status.trials_completed += 1;
                    self.trials.push(trial);
                }
                Err(e) => {
                    warn!("Trial {} failed: {}", trial_number, e);
                    trial.mark_failed(e.to_string());
                    self.status.trials_failed += 1;
                    self.trials.push(trial);
                    self.status.mark_failed(e.to_string());
                    return Err(e);
                }
            }
        }

        self.status.mark_completed();
        let best = self
            .status
            .best_trial
            .clone()
            .ok_or(SearchError::NoTrials)?;
        info!(
            "Study '{}' completed: {} trials, best objective {:.6}",
            self.status.config.name, self.status.trials_completed, best.objective
        );
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{RandomSearch, SearchSpace};
    use crate::trial::{ObjectiveDirection, StudyState, TrialStatus};
    use bf_types::{internal_error, BfError};

    fn config(strategy: &str, trials: usize) -> StudyConfig {
        let space = SearchSpace::new()
            .add_uniform("x", -1.0, 1.0)
            .add_int("k", 1, 3);
        StudyConfig::new("unit".into(), space, strategy)
            .with_max_trials(trials)
            .with_seed(Some(17))
    }

    #[test]
    fn runs_exactly_the_budget() {
        let mut study = Study::new(config("tpe", 7)).unwrap();
        let mut calls = 0;
        study
            .run(|params| {
                calls += 1;
                Ok(params["x"].as_f64().unwrap().abs())
            })
            .unwrap();

        assert_eq!(calls, 7);
        assert_eq!(study.trials().len(), 7);
        assert_eq!(study.status().trials_completed, 7);
        assert_eq!(study.status().state, StudyState::Completed);
        assert!(study
            .trials()
            .iter()
            .all(|t| t.status == TrialStatus::Completed));
    }

    #[test]
    fn best_is_minimum_of_history() {
        let mut study = Study::new(config("random", 25)).unwrap();
        let best = study
            .run(|params| Ok(params["x"].as_f64().unwrap().powi(2)))
            .unwrap();

        let min = study
            .trials()
            .iter()
            .filter_map(|t| t.result.as_ref())
            .map(|r| r.objective)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(best.objective, min);
        assert_eq!(study.best_trial().unwrap().objective, min);
    }

    #[test]
    fn maximize_direction_keeps_largest() {
        let cfg = config("random", 10).with_direction(ObjectiveDirection::Maximize);
        let mut study = Study::new(cfg).unwrap();
        let best = study.run(|params| Ok(params["x"].as_f64().unwrap())).unwrap();

        let max = study
            .trials()
            .iter()
            .filter_map(|t| t.result.as_ref())
            .map(|r| r.objective)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.objective, max);
    }

    #[test]
    fn failing_objective_aborts_study() {
        let mut study = Study::new(config("tpe", 10)).unwrap();
        let mut calls = 0;
        let result = study.run(|_| {
            calls += 1;
            if calls == 3 {
                Err(internal_error!("training blew up"))
            } else {
                Ok(0.5)
            }
        });

        assert!(matches!(result, Err(BfError::Internal(_))));
        assert_eq!(calls, 3);
        assert_eq!(study.trials().len(), 3);
        assert_eq!(study.trials()[2].status, TrialStatus::Failed);
        assert_eq!(study.status().state, StudyState::Failed);
        assert_eq!(study.status().trials_failed, 1);
    }

    struct TwoPoints {
        served: usize,
    }

    impl SearchStrategy for TwoPoints {
        fn suggest(&mut self, _count: usize) -> BfResult<Vec<ParameterSet>> {
            if self.served == 2 {
                return Ok(Vec::new());
            }
            self.served += 1;
            let mut params = ParameterSet::new();
            params.insert("x".into(), crate::ParameterValue::Int(self.served as i64));
            Ok(vec![params])
        }

        fn name(&self) -> &str {
            "two-points"
        }
    }

    #[test]
    fn exhausted_strategy_ends_study_early() {
        let mut study =
            Study::with_strategy(config("random", 10), Box::new(TwoPoints { served: 0 }));
        let best = study
            .run(|params| Ok(params["x"].as_f64().unwrap()))
            .unwrap();

        assert_eq!(study.trials().len(), 2);
        assert_eq!(study.status().state, StudyState::Completed);
        assert_eq!(best.objective, 1.0);
    }

    #[test]
    fn zero_budget_has_no_best() {
        let mut study = Study::with_strategy(
            config("random", 0),
            Box::new(RandomSearch::new(SearchSpace::new())),
        );
        assert!(matches!(
            study.run(|_| Ok(0.0)),
            Err(BfError::Search(SearchError::NoTrials))
        ));
    }
}
