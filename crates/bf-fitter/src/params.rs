//! Typed view of one XGBoost configuration and its booster parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xgboost::parameters::learning::{
    EvaluationMetric, LearningTaskParametersBuilder, Metrics, Objective,
};
use xgboost::parameters::tree::TreeBoosterParametersBuilder;
use xgboost::parameters::{BoosterParameters, BoosterParametersBuilder, BoosterType};

use bf_optimizer::{ParameterSet, ParameterValue};
use bf_types::{BfError, BfResult, SearchError, TrainingError};

/// Binary objectives the fitter can train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XgbObjective {
    /// `binary:logistic`, probabilities in `[0, 1]`.
    BinaryLogistic,
    /// `reg:logistic`
    RegLogistic,
}

impl XgbObjective {
    pub fn as_str(&self) -> &'static str {
        match self {
            XgbObjective::BinaryLogistic => "binary:logistic",
            XgbObjective::RegLogistic => "reg:logistic",
        }
    }

    fn to_xgb(self) -> Objective {
        match self {
            XgbObjective::BinaryLogistic => Objective::BinaryLogistic,
            XgbObjective::RegLogistic => Objective::RegLogistic,
        }
    }
}

impl FromStr for XgbObjective {
    type Err = BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary:logistic" => Ok(XgbObjective::BinaryLogistic),
            "reg:logistic" => Ok(XgbObjective::RegLogistic),
            other => Err(TrainingError::UnsupportedObjective {
                objective: other.to_string(),
            }
            .into()),
        }
    }
}

/// Metric XGBoost evaluates on the eval set after every round; it drives
/// early stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XgbEvalMetric {
    /// Binary error rate at threshold 0.5.
    Error,
    LogLoss,
    Auc,
}

impl XgbEvalMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            XgbEvalMetric::Error => "error",
            XgbEvalMetric::LogLoss => "logloss",
            XgbEvalMetric::Auc => "auc",
        }
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, XgbEvalMetric::Auc)
    }

    /// Whether `score` beats `best` in this metric's direction.
    pub fn improves(&self, score: f32, best: f32) -> bool {
        if self.higher_is_better() {
            score > best
        } else {
            score < best
        }
    }

    fn to_xgb(self) -> EvaluationMetric {
        match self {
            XgbEvalMetric::Error => EvaluationMetric::BinaryErrorRate(0.5),
            XgbEvalMetric::LogLoss => EvaluationMetric::LogLoss,
            XgbEvalMetric::Auc => EvaluationMetric::AUC,
        }
    }
}

impl fmt::Display for XgbEvalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XgbEvalMetric {
    type Err = BfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(XgbEvalMetric::Error),
            "logloss" => Ok(XgbEvalMetric::LogLoss),
            "auc" => Ok(XgbEvalMetric::Auc),
            other => Err(TrainingError::UnsupportedEvalMetric {
                metric: other.to_string(),
            }
            .into()),
        }
    }
}

/// Concrete hyperparameters for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgbParams {
    pub nthread: u32,
    pub eval_metric: XgbEvalMetric,
    pub objective: XgbObjective,
    pub max_depth: u32,
    pub early_stopping_rounds: u32,
    pub num_round: u32,
    pub eta: f32,
    pub subsample: f32,
    pub colsample_bytree: f32,
    pub gamma: f32,
}

impl TryFrom<&ParameterSet> for XgbParams {
    type Error = BfError;

    fn try_from(params: &ParameterSet) -> Result<Self, Self::Error> {
        let parsed = Self {
            nthread: get_u32(params, "nthread")?,
            eval_metric: get_str(params, "eval_metric")?.parse()?,
            objective: get_str(params, "objective")?.parse()?,
            max_depth: get_u32(params, "max_depth")?,
            early_stopping_rounds: get_u32(params, "early_stopping_rounds")?,
            num_round: get_u32(params, "num_round")?,
            eta: get_f32(params, "eta")?,
            subsample: get_f32(params, "subsample")?,
            colsample_bytree: get_f32(params, "colsample_bytree")?,
            gamma: get_f32(params, "gamma")?,
        };

        if parsed.num_round == 0 {
            return Err(invalid("num_round", "at least one boosting round is required"));
        }
        Ok(parsed)
    }
}

impl XgbParams {
    /// Tree booster, learning task and thread settings for the XGBoost backend.
    pub fn booster_parameters(&self) -> BfResult<BoosterParameters> {
        let tree_params = TreeBoosterParametersBuilder::default()
            .eta(self.eta)
            .gamma(self.gamma)
            .max_depth(self.max_depth)
            .subsample(self.subsample)
            .colsample_bytree(self.colsample_bytree)
            .build()
            .map_err(invalid_booster)?;

        let learning_params = LearningTaskParametersBuilder::default()
            .objective(self.objective.to_xgb())
            .eval_metrics(Metrics::Custom(vec![self.eval_metric.to_xgb()]))
            .build()
            .map_err(invalid_booster)?;

        BoosterParametersBuilder::default()
            .booster_type(BoosterType::Tree(tree_params))
            .learning_params(learning_params)
            .threads(Some(self.nthread))
            .verbose(false)
            .build()
            .map_err(invalid_booster)
    }
}

fn get<'a>(params: &'a ParameterSet, name: &str) -> BfResult<&'a ParameterValue> {
    params.get(name).ok_or_else(|| {
        SearchError::MissingParameter {
            parameter: name.to_string(),
        }
        .into()
    })
}

fn get_u32(params: &ParameterSet, name: &str) -> BfResult<u32> {
    let value = get(params, name)?;
    value
        .as_i64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| invalid(name, format!("expected a non-negative integer, got {value}")))
}

fn get_f32(params: &ParameterSet, name: &str) -> BfResult<f32> {
    let value = get(params, name)?;
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| invalid(name, format!("expected a number, got {value}")))
}

fn get_str<'a>(params: &'a ParameterSet, name: &str) -> BfResult<&'a str> {
    let value = get(params, name)?;
    value
        .as_str()
        .ok_or_else(|| invalid(name, format!("expected a string, got {value}")))
}

fn invalid(parameter: &str, message: impl Into<String>) -> BfError {
    SearchError::InvalidParameter {
        parameter: parameter.to_string(),
        message: message.into(),
    }
    .into()
}

fn invalid_booster(message: impl ToString) -> BfError {
    TrainingError::InvalidParameters {
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_params() -> ParameterSet {
        let mut params = ParameterSet::new();
        params.insert("nthread".into(), ParameterValue::Json(json!(2)));
        params.insert("eval_metric".into(), ParameterValue::Json(json!("error")));
        params.insert(
            "objective".into(),
            ParameterValue::Json(json!("binary:logistic")),
        );
        params.insert("max_depth".into(), ParameterValue::Json(json!(4)));
        params.insert("early_stopping_rounds".into(), ParameterValue::Json(json!(5)));
        params.insert("num_round".into(), ParameterValue::Json(json!(20)));
        params.insert("eta".into(), ParameterValue::Float(0.3));
        params.insert("subsample".into(), ParameterValue::Float(0.9));
        params.insert("colsample_bytree".into(), ParameterValue::Float(0.8));
        params.insert("gamma".into(), ParameterValue::Json(json!(1)));
        params
    }

    #[test]
    fn parses_typed_values() {
        let params = XgbParams::try_from(&sample_params()).unwrap();
        assert_eq!(params.nthread, 2);
        assert_eq!(params.eval_metric, XgbEvalMetric::Error);
        assert_eq!(params.objective, XgbObjective::BinaryLogistic);
        assert_eq!(params.max_depth, 4);
        assert_eq!(params.num_round, 20);
        assert!((params.eta - 0.3).abs() < 1e-6);
        assert_eq!(params.gamma, 1.0);
    }

    #[test]
    fn missing_entry_is_reported_by_name() {
        let mut raw = sample_params();
        raw.remove("eta");
        match XgbParams::try_from(&raw) {
            Err(BfError::Search(SearchError::MissingParameter { parameter })) => {
                assert_eq!(parameter, "eta")
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn mistyped_entries_are_invalid() {
        let mut raw = sample_params();
        raw.insert("max_depth".into(), ParameterValue::Float(4.5));
        assert!(matches!(
            XgbParams::try_from(&raw),
            Err(BfError::Search(SearchError::InvalidParameter { .. }))
        ));

        let mut raw = sample_params();
        raw.insert("objective".into(), ParameterValue::Int(3));
        assert!(matches!(
            XgbParams::try_from(&raw),
            Err(BfError::Search(SearchError::InvalidParameter { .. }))
        ));

        let mut raw = sample_params();
        raw.insert("num_round".into(), ParameterValue::Int(0));
        assert!(XgbParams::try_from(&raw).is_err());
    }

    #[test]
    fn unsupported_objective_and_metric() {
        let mut raw = sample_params();
        raw.insert(
            "objective".into(),
            ParameterValue::Json(json!("multi:softmax")),
        );
        assert!(matches!(
            XgbParams::try_from(&raw),
            Err(BfError::Training(TrainingError::UnsupportedObjective { .. }))
        ));

        let mut raw = sample_params();
        raw.insert("eval_metric".into(), ParameterValue::Json(json!("rmse")));
        assert!(matches!(
            XgbParams::try_from(&raw),
            Err(BfError::Training(TrainingError::UnsupportedEvalMetric { .. }))
        ));
    }

    #[test]
    fn eval_metric_direction() {
        assert!(XgbEvalMetric::Auc.improves(0.9, 0.8));
        assert!(!XgbEvalMetric::Auc.improves(0.7, 0.8));
        assert!(XgbEvalMetric::Error.improves(0.1, 0.2));
        assert!(XgbEvalMetric::LogLoss.improves(0.3, 0.4));
        assert!(!XgbEvalMetric::LogLoss.improves(0.4, 0.4));
    }

    #[test]
    fn booster_parameters_build() {
        let params = XgbParams::try_from(&sample_params()).unwrap();
        assert!(params.booster_parameters().is_ok());
    }
}
