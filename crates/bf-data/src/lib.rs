//! # bf-data
//!
//! Tabular dataset handling for BoostFit: Arrow-backed tables with a label
//! column, CSV and Parquet loaders, train/eval splitting, and synthetic data.

pub mod dataset;
pub mod loaders;
pub mod synthetic;

pub use dataset::*;
pub use loaders::*;
pub use synthetic::*;
