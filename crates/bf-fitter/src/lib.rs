//! # bf-fitter
//!
//! Hyperparameter search for XGBoost binary classifiers.
//!
//! [`XgbFitter`] trains boosted trees with early stopping on an eval table,
//! scores eval predictions with a classification [`Metric`] turned into a
//! loss (`1 - score`), and drives a TPE [`bf_optimizer::Study`] over the
//! [`XgbSearchSpace`] to find the best configuration.
//!
//! ```no_run
//! use bf_data::make_classification;
//! use bf_fitter::{FitterConfig, XgbFitter};
//!
//! let train = make_classification(500, 8, 1)?;
//! let eval = make_classification(200, 8, 2)?;
//!
//! let mut fitter = XgbFitter::new(FitterConfig::default().with_max_eval(20));
//! fitter.search(&train, &eval)?;
//! let probabilities = fitter.predict(&eval)?;
//! # Ok::<(), bf_types::BfError>(())
//! ```

pub mod config;
pub mod fitter;
pub mod metrics;
pub mod model;
pub mod params;
pub mod space;

pub use config::FitterConfig;
pub use fitter::XgbFitter;
pub use metrics::Metric;
pub use model::TrainedModel;
pub use params::{XgbEvalMetric, XgbObjective, XgbParams};
pub use space::{XgbSearchSpace, XGB_PARAMETER_NAMES};
