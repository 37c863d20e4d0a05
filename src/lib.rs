//! One-sided feature scaling for the wine quality preprocessing pipeline.
//!
//! Columns are centered on their mean; values above the mean are divided by
//! the largest positive deviation and values below it by the magnitude of the
//! largest negative deviation, so fit data lands in `[-1, 1]`.

pub mod config;
pub mod dataset;
pub mod error;
pub mod scalers;

pub use config::{DegeneratePolicy, ScalerConfig};
pub use dataset::Dataset;
pub use error::{DatasetError, ScalerError, Side};
pub use scalers::{OneSidedParams, OneSidedScaler};
