//! # bf-optimizer
//!
//! Hyperparameter search orchestration for BoostFit.
//!
//! Provides search space definitions, random and tree-of-Parzen-estimators
//! strategies, trial tracking, and a sequential [`Study`] loop that drives an
//! objective closure for a fixed trial budget.

mod search;
mod study;
mod tpe_search;
mod trial;

pub use search::{
    ParameterDef, ParameterKind, ParameterSet, ParameterValue, RandomSearch, SearchSpace,
    SearchStrategy,
};
pub use study::Study;
pub use tpe_search::TpeSearch;
pub use trial::{
    ObjectiveDirection, StudyConfig, StudyId, StudyState, StudyStatus, Trial, TrialResult,
    TrialStatus,
};
