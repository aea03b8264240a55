//! Default XGBoost search space for binary classification.

use serde::{Deserialize, Serialize};
use serde_json::json;

use bf_optimizer::{ParameterDef, ParameterKind, SearchSpace};

/// Hyperparameter names the fitter reads from every configuration.
pub const XGB_PARAMETER_NAMES: [&str; 10] = [
    "nthread",
    "eval_metric",
    "objective",
    "max_depth",
    "early_stopping_rounds",
    "num_round",
    "eta",
    "subsample",
    "colsample_bytree",
    "gamma",
];

/// One search dimension per XGBoost hyperparameter.
///
/// Fields can be replaced individually to narrow or widen the search; the
/// default covers depth, learning rate, row/column sampling and split gain
/// while pinning the objective, evaluation metric and round limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgbSearchSpace {
    pub nthread: ParameterKind,
    pub eval_metric: ParameterKind,
    pub objective: ParameterKind,
    pub max_depth: ParameterKind,
    pub early_stopping_rounds: ParameterKind,
    pub num_round: ParameterKind,
    pub eta: ParameterKind,
    pub subsample: ParameterKind,
    pub colsample_bytree: ParameterKind,
    pub gamma: ParameterKind,
}

impl Default for XgbSearchSpace {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            nthread: choice(vec![json!(cpus)]),
            eval_metric: choice(vec![json!("error")]),
            objective: choice(vec![json!("binary:logistic")]),
            max_depth: choice(vec![json!(4), json!(5), json!(6), json!(7), json!(8)]),
            early_stopping_rounds: choice(vec![json!(50)]),
            num_round: choice(vec![json!(1000)]),
            eta: ParameterKind::Uniform {
                low: 0.1,
                high: 1.0,
            },
            subsample: ParameterKind::Uniform {
                low: 0.8,
                high: 1.0,
            },
            colsample_bytree: ParameterKind::Uniform {
                low: 0.3,
                high: 1.0,
            },
            gamma: choice(vec![json!(0), json!(1), json!(5)]),
        }
    }
}

fn choice(values: Vec<serde_json::Value>) -> ParameterKind {
    ParameterKind::Choice { values }
}

impl XgbSearchSpace {
    /// Cap training rounds, e.g. for quick smoke runs.
    pub fn with_num_round(mut self, rounds: u32, early_stopping_rounds: u32) -> Self {
        self.num_round = choice(vec![json!(rounds)]);
        self.early_stopping_rounds = choice(vec![json!(early_stopping_rounds)]);
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.nthread = choice(vec![json!(threads)]);
        self
    }

    /// Flatten into the generic space consumed by search strategies, in
    /// [`XGB_PARAMETER_NAMES`] order.
    pub fn to_search_space(&self) -> SearchSpace {
        let kinds = [
            &self.nthread,
            &self.eval_metric,
            &self.objective,
            &self.max_depth,
            &self.early_stopping_rounds,
            &self.num_round,
            &self.eta,
            &self.subsample,
            &self.colsample_bytree,
            &self.gamma,
        ];

        SearchSpace {
            parameters: XGB_PARAMETER_NAMES
                .iter()
                .zip(kinds)
                .map(|(name, kind)| ParameterDef {
                    name: name.to_string(),
                    kind: kind.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_space_has_all_ten_names() {
        let space = XgbSearchSpace::default().to_search_space();
        assert_eq!(space.names(), XGB_PARAMETER_NAMES.to_vec());
    }

    #[test]
    fn default_domains() {
        let space = XgbSearchSpace::default().to_search_space();
        assert_eq!(
            space.get("max_depth").unwrap().kind,
            choice(vec![json!(4), json!(5), json!(6), json!(7), json!(8)])
        );
        assert_eq!(
            space.get("eta").unwrap().kind,
            ParameterKind::Uniform {
                low: 0.1,
                high: 1.0
            }
        );
        assert_eq!(
            space.get("gamma").unwrap().kind,
            choice(vec![json!(0), json!(1), json!(5)])
        );
        assert_eq!(
            space.get("objective").unwrap().kind,
            choice(vec![json!("binary:logistic")])
        );
    }

    #[test]
    fn random_samples_land_in_declared_domains() {
        let space = XgbSearchSpace::default().to_search_space();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let params = space.sample(&mut rng).unwrap();
            assert_eq!(params.len(), 10);
            assert!(space.contains(&params), "out of domain: {params:?}");

            let eta = params["eta"].as_f64().unwrap();
            assert!((0.1..=1.0).contains(&eta));
            let subsample = params["subsample"].as_f64().unwrap();
            assert!((0.8..=1.0).contains(&subsample));
            let colsample = params["colsample_bytree"].as_f64().unwrap();
            assert!((0.3..=1.0).contains(&colsample));
            let depth = params["max_depth"].as_i64().unwrap();
            assert!((4..=8).contains(&depth));
        }
    }

    #[test]
    fn overrides_replace_single_dimensions() {
        let space = XgbSearchSpace::default()
            .with_num_round(20, 5)
            .with_threads(2)
            .to_search_space();
        assert_eq!(space.get("num_round").unwrap().kind, choice(vec![json!(20)]));
        assert_eq!(
            space.get("early_stopping_rounds").unwrap().kind,
            choice(vec![json!(5)])
        );
        assert_eq!(space.get("nthread").unwrap().kind, choice(vec![json!(2)]));
    }

    #[test]
    fn json_round_trip() {
        let space = XgbSearchSpace::default();
        let json = serde_json::to_string(&space).unwrap();
        let back: XgbSearchSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(space, back);
    }
}
