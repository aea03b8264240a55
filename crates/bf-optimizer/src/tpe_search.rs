//! Tree-of-Parzen-estimators strategy.
//!
//! Each non-fixed dimension gets its own [`TpeOptimizer`] from the `tpe`
//! crate; dimensions are sampled independently and all of them are told the
//! same trial loss. Choices and integers are mapped onto `[0, n)` and decoded
//! by flooring.

use rand::rngs::StdRng;
use tpe::TpeOptimizer;

use bf_types::{BfError, BfResult, SearchError};

use crate::search::{
    json_matches, seeded_rng, ParameterKind, ParameterSet, ParameterValue, SearchSpace,
    SearchStrategy,
};

enum Encoding {
    Choice(Vec<serde_json::Value>),
    Uniform { low: f64, high: f64 },
    LogUniform { low: f64, high: f64 },
    Int { low: i64, high: i64 },
}

enum Dimension {
    Fixed(serde_json::Value),
    Tpe {
        optimizer: TpeOptimizer,
        encoding: Encoding,
    },
}

/// Sequential model-based search using tree-of-Parzen-estimators.
pub struct TpeSearch {
    dimensions: Vec<(String, Dimension)>,
    rng: StdRng,
    observations: usize,
}

impl TpeSearch {
    pub fn new(space: &SearchSpace) -> BfResult<Self> {
        Self::with_seed(space, None)
    }

    /// Build one estimator per dimension. Ranges the `tpe` crate rejects
    /// (empty choices, `low >= high`) fail here.
    pub fn with_seed(space: &SearchSpace, seed: Option<u64>) -> BfResult<Self> {
        let mut dimensions = Vec::with_capacity(space.parameters.len());

        for def in &space.parameters {
            let name = def.name.as_str();
            let dimension = match &def.kind {
                ParameterKind::Fixed { value } => Dimension::Fixed(value.clone()),
                ParameterKind::Choice { values } => {
                    let range = tpe::categorical_range(values.len())
                        .map_err(|e| sampling_error(name, e.to_string()))?;
                    Dimension::Tpe {
                        optimizer: TpeOptimizer::new(tpe::parzen_estimator(), range),
                        encoding: Encoding::Choice(values.clone()),
                    }
                }
                // A pinned range has nothing to learn; both strategies return its bound.
                ParameterKind::Uniform { low, high } | ParameterKind::LogUniform { low, high }
                    if low == high =>
                {
                    Dimension::Fixed(serde_json::Value::from(*low))
                }
                ParameterKind::Uniform { low, high } => {
                    let range =
                        tpe::range(*low, *high).map_err(|e| sampling_error(name, e.to_string()))?;
                    Dimension::Tpe {
                        optimizer: TpeOptimizer::new(tpe::parzen_estimator(), range),
                        encoding: Encoding::Uniform {
                            low: *low,
                            high: *high,
                        },
                    }
                }
                ParameterKind::LogUniform { low, high } => {
                    if *low <= 0.0 {
                        return Err(sampling_error(name, format!("log range starts at {low}")));
                    }
                    let range = tpe::range(low.ln(), high.ln())
                        .map_err(|e| sampling_error(name, e.to_string()))?;
                    Dimension::Tpe {
                        optimizer: TpeOptimizer::new(tpe::parzen_estimator(), range),
                        encoding: Encoding::LogUniform {
                            low: *low,
                            high: *high,
                        },
                    }
                }
                ParameterKind::IntRange { low, high } => {
                    let range = tpe::range(*low as f64, *high as f64 + 1.0)
                        .map_err(|e| sampling_error(name, e.to_string()))?;
                    Dimension::Tpe {
                        optimizer: TpeOptimizer::new(tpe::parzen_estimator(), range),
                        encoding: Encoding::Int {
                            low: *low,
                            high: *high,
                        },
                    }
                }
            };
            dimensions.push((def.name.clone(), dimension));
        }

        Ok(Self {
            dimensions,
            rng: seeded_rng(seed),
            observations: 0,
        })
    }

    /// Number of losses reported so far.
    pub fn observations(&self) -> usize {
        self.observations
    }

    fn sample_one(&mut self) -> BfResult<ParameterSet> {
        let mut params = ParameterSet::with_capacity(self.dimensions.len());

        for (name, dimension) in &mut self.dimensions {
            let value = match dimension {
                Dimension::Fixed(value) => ParameterValue::Json(value.clone()),
                Dimension::Tpe {
                    optimizer,
                    encoding,
                } => {
                    let raw = optimizer
                        .ask(&mut self.rng)
                        .map_err(|e| sampling_error(name, e.to_string()))?;
                    decode(encoding, raw)
                }
            };
            params.insert(name.clone(), value);
        }

        Ok(params)
    }
}

fn decode(encoding: &Encoding, raw: f64) -> ParameterValue {
    match encoding {
        Encoding::Choice(values) => {
            let idx = (raw.floor().max(0.0) as usize).min(values.len() - 1);
            ParameterValue::Json(values[idx].clone())
        }
        Encoding::Uniform { .. } => ParameterValue::Float(raw),
        Encoding::LogUniform { low, high } => ParameterValue::Float(raw.exp().clamp(*low, *high)),
        Encoding::Int { low, high } => ParameterValue::Int((raw.floor() as i64).clamp(*low, *high)),
    }
}

/// Inverse of [`decode`]; integers and choices land mid-bucket.
fn encode(encoding: &Encoding, value: &ParameterValue) -> Option<f64> {
    match encoding {
        Encoding::Choice(values) => values
            .iter()
            .position(|v| json_matches(v, value))
            .map(|idx| idx as f64 + 0.5),
        Encoding::Uniform { low, high } => value.as_f64().map(|v| below(v, *low, *high)),
        Encoding::LogUniform { low, high } => value
            .as_f64()
            .filter(|v| *v > 0.0)
            .map(|v| below(v.ln(), low.ln(), high.ln())),
        Encoding::Int { .. } => value.as_i64().map(|v| v as f64 + 0.5),
    }
}

/// Estimator ranges are half-open, so an observation at `high` is pulled just inside.
fn below(raw: f64, low: f64, high: f64) -> f64 {
    raw.min(high - (high - low) * 1e-9)
}

fn sampling_error(parameter: &str, message: impl Into<String>) -> BfError {
    SearchError::Sampling {
        parameter: parameter.to_string(),
        message: message.into(),
    }
    .into()
}

impl SearchStrategy for TpeSearch {
    fn suggest(&mut self, count: usize) -> BfResult<Vec<ParameterSet>> {
        (0..count).map(|_| self.sample_one()).collect()
    }

    fn report(&mut self, params: &ParameterSet, objective: f64) -> BfResult<()> {
        for (name, dimension) in &mut self.dimensions {
            let Dimension::Tpe {
                optimizer,
                encoding,
            } = dimension
            else {
                continue;
            };

            let value = params.get(name.as_str()).ok_or_else(|| SearchError::MissingParameter {
                parameter: name.clone(),
            })?;
            let raw = encode(encoding, value).ok_or_else(|| SearchError::InvalidParameter {
                parameter: name.clone(),
                message: format!("{value} is outside the search space"),
            })?;

            optimizer
                .tell(raw, objective)
                .map_err(|e| SearchError::Report {
                    parameter: name.clone(),
                    message: e.to_string(),
                })?;
        }

        self.observations += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "tpe"
    }
}
