//! Search space definitions and the random sweep strategy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use bf_types::{BfResult, SearchError};

/// One concrete point in a search space, keyed by parameter name.
pub type ParameterSet = HashMap<String, ParameterValue>;

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as the trainer expects it (e.g. "max_depth").
    pub name: String,
    /// The kind of search range.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// A single constant value.
    Fixed { value: serde_json::Value },
    /// Categorical choices.
    Choice { values: Vec<serde_json::Value> },
    /// Continuous uniform range [low, high].
    Uniform { low: f64, high: f64 },
    /// Log-uniform range (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64 },
}

/// A concrete parameter value produced by a search strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Json(serde_json::Value),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Json(v) => v.as_f64(),
        }
    }

    /// Integer view; floats only convert when they have no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Float(_) => None,
            Self::Json(v) => v
                .as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(v) => v.as_str(),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl ParameterDef {
    /// Draw one value from this dimension.
    ///
    /// Malformed dimensions (empty choices, inverted ranges, non-positive
    /// log bounds) are only detected here.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BfResult<ParameterValue> {
        let value = match &self.kind {
            ParameterKind::Fixed { value } => ParameterValue::Json(value.clone()),
            ParameterKind::Choice { values } => {
                if values.is_empty() {
                    return Err(self.sampling_error("empty choice set"));
                }
                let idx = rng.gen_range(0..values.len());
                ParameterValue::Json(values[idx].clone())
            }
            ParameterKind::Uniform { low, high } => {
                if !(low <= high) {
                    return Err(self.sampling_error(format!("low {low} > high {high}")));
                }
                ParameterValue::Float(rng.gen_range(*low..=*high))
            }
            ParameterKind::LogUniform { low, high } => {
                if !(*low > 0.0 && low <= high) {
                    return Err(self.sampling_error(format!("invalid log range [{low}, {high}]")));
                }
                let log_val: f64 = rng.gen_range(low.ln()..=high.ln());
                ParameterValue::Float(log_val.exp().clamp(*low, *high))
            }
            ParameterKind::IntRange { low, high } => {
                if low > high {
                    return Err(self.sampling_error(format!("low {low} > high {high}")));
                }
                ParameterValue::Int(rng.gen_range(*low..=*high))
            }
        };
        Ok(value)
    }

    /// Whether `value` lies in this dimension's declared domain.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match &self.kind {
            ParameterKind::Fixed { value: fixed } => json_matches(fixed, value),
            ParameterKind::Choice { values } => values.iter().any(|v| json_matches(v, value)),
            ParameterKind::Uniform { low, high } | ParameterKind::LogUniform { low, high } => value
                .as_f64()
                .map(|v| v >= *low && v <= *high)
                .unwrap_or(false),
            ParameterKind::IntRange { low, high } => value
                .as_i64()
                .map(|v| v >= *low && v <= *high)
                .unwrap_or(false),
        }
    }

    fn sampling_error(&self, message: impl Into<String>) -> bf_types::BfError {
        SearchError::Sampling {
            parameter: self.name.clone(),
            message: message.into(),
        }
        .into()
    }
}

pub(crate) fn json_matches(expected: &serde_json::Value, value: &ParameterValue) -> bool {
    if let ParameterValue::Json(v) = value {
        if v == expected {
            return true;
        }
    }
    // 5 and 5.0 name the same choice
    match (expected.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_fixed(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Fixed { value },
        });
        self
    }

    pub fn add_choice(mut self, name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Choice { values },
        });
        self
    }

    pub fn add_uniform(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Uniform { low, high },
        });
        self
    }

    pub fn add_log_uniform(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::LogUniform { low, high },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::IntRange { low, high },
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Draw one random configuration, independent of any optimization.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BfResult<ParameterSet> {
        let mut params = HashMap::with_capacity(self.parameters.len());
        for param in &self.parameters {
            params.insert(param.name.clone(), param.sample(rng)?);
        }
        Ok(params)
    }

    /// Every declared parameter is present in `params` and inside its domain.
    pub fn contains(&self, params: &ParameterSet) -> bool {
        self.parameters.iter().all(|def| {
            params
                .get(&def.name)
                .map(|value| def.contains(value))
                .unwrap_or(false)
        })
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Search strategies
// ---------------------------------------------------------------------------

/// Common trait for all search strategies.
pub trait SearchStrategy: Send {
    /// Generate the next batch of parameter combinations to evaluate.
    fn suggest(&mut self, count: usize) -> BfResult<Vec<ParameterSet>>;

    /// Report a completed trial's loss so adaptive strategies can learn.
    fn report(&mut self, _params: &ParameterSet, _objective: f64) -> BfResult<()> {
        Ok(())
    }

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

// ---- Random search ----

/// Independent random sampling across the search space.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    rng: StdRng,
}

impl RandomSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self::with_seed(space, None)
    }

    pub fn with_seed(space: SearchSpace, seed: Option<u64>) -> Self {
        Self {
            space,
            rng: seeded_rng(seed),
        }
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self, count: usize) -> BfResult<Vec<ParameterSet>> {
        (0..count).map(|_| self.space.sample(&mut self.rng)).collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_types::BfError;
    use serde_json::json;

    fn sample_space() -> SearchSpace {
        SearchSpace::new()
            .add_int("max_leaves", 5, 15)
            .add_uniform("subsample", 0.5, 1.0)
            .add_fixed("objective", json!("binary:logistic"))
    }

    #[test]
    fn random_search_respects_bounds() {
        let space = sample_space();
        let mut rs = RandomSearch::with_seed(space.clone(), Some(3));
        let suggestions = rs.suggest(50).unwrap();
        assert_eq!(suggestions.len(), 50);

        for params in &suggestions {
            assert!(space.contains(params));
            match params.get("max_leaves") {
                Some(ParameterValue::Int(v)) => assert!(*v >= 5 && *v <= 15),
                other => panic!("unexpected max_leaves value: {other:?}"),
            }
            match params.get("subsample") {
                Some(ParameterValue::Float(v)) => assert!(*v >= 0.5 && *v <= 1.0),
                other => panic!("unexpected subsample value: {other:?}"),
            }
            assert_eq!(
                params.get("objective").and_then(|v| v.as_str()),
                Some("binary:logistic")
            );
        }
    }

    #[test]
    fn choice_parameter_works() {
        let space = SearchSpace::new().add_choice(
            "eval_metric",
            vec![json!("error"), json!("logloss"), json!("auc")],
        );
        let mut rs = RandomSearch::new(space);
        let suggestions = rs.suggest(30).unwrap();
        assert_eq!(suggestions.len(), 30);
        for params in &suggestions {
            match params.get("eval_metric") {
                Some(ParameterValue::Json(v)) => {
                    let s = v.as_str().unwrap();
                    assert!(["error", "logloss", "auc"].contains(&s));
                }
                other => panic!("unexpected eval_metric value: {other:?}"),
            }
        }
    }

    #[test]
    fn log_uniform_stays_in_bounds() {
        let space = SearchSpace::new().add_log_uniform("eta", 1e-5, 1e-1);
        let mut rs = RandomSearch::new(space);
        for params in &rs.suggest(100).unwrap() {
            match params.get("eta") {
                Some(ParameterValue::Float(v)) => {
                    assert!(*v >= 1e-5 && *v <= 1e-1, "eta out of bounds: {v}");
                }
                other => panic!("unexpected eta value: {other:?}"),
            }
        }
    }

    #[test]
    fn empty_choice_fails_instead_of_panicking() {
        let space = SearchSpace::new().add_choice("gamma", vec![]);
        let mut rng = seeded_rng(Some(1));
        match space.sample(&mut rng) {
            Err(BfError::Search(SearchError::Sampling { parameter, .. })) => {
                assert_eq!(parameter, "gamma")
            }
            other => panic!("expected sampling error, got {other:?}"),
        }
    }

    #[test]
    fn inverted_range_fails_on_sampling() {
        let space = SearchSpace::new().add_uniform("eta", 1.0, 0.1);
        let mut rs = RandomSearch::new(space);
        assert!(rs.suggest(1).is_err());
    }

    #[test]
    fn contains_treats_numeric_choices_loosely() {
        let def = ParameterDef {
            name: "gamma".into(),
            kind: ParameterKind::Choice {
                values: vec![json!(0), json!(1), json!(5)],
            },
        };
        assert!(def.contains(&ParameterValue::Json(json!(5))));
        assert!(def.contains(&ParameterValue::Int(1)));
        assert!(def.contains(&ParameterValue::Float(0.0)));
        assert!(!def.contains(&ParameterValue::Int(2)));
    }

    #[test]
    fn value_accessors() {
        assert_eq!(ParameterValue::Json(json!(6)).as_i64(), Some(6));
        assert_eq!(ParameterValue::Float(6.0).as_i64(), Some(6));
        assert_eq!(ParameterValue::Float(6.5).as_i64(), None);
        assert_eq!(ParameterValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParameterValue::Json(json!("auc")).as_str(), Some("auc"));
        assert_eq!(ParameterValue::Float(0.5).as_str(), None);
    }

    #[test]
    fn search_space_builder_chain() {
        let space = SearchSpace::new()
            .add_int("a", 1, 10)
            .add_uniform("b", 0.0, 1.0)
            .add_log_uniform("c", 0.001, 100.0)
            .add_choice("d", vec![json!(true), json!(false)])
            .add_fixed("e", json!(50));
        assert_eq!(space.parameters.len(), 5);
        assert_eq!(space.names(), vec!["a", "b", "c", "d", "e"]);
        assert!(space.get("c").is_some());
        assert!(space.get("z").is_none());
    }

    #[test]
    fn search_space_serde_round_trip() {
        let space = sample_space();
        let json = serde_json::to_string(&space).unwrap();
        let back: SearchSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(space, back);
    }
}
