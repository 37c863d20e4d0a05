//! Error types for scaling and dataset handling

use std::fmt;

use thiserror::Error;

/// Which partition of a column a value was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Centered value `>= 0`, divided by `v_max`
    High,
    /// Centered value `< 0`, divided by `v_min`
    Low,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::High => write!(f, "high (v_max)"),
            Side::Low => write!(f, "low (v_min)"),
        }
    }
}

/// Errors raised by the one-sided scaler
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalerError {
    /// Scaler used before a successful fit
    #[error("scaler has not been fitted")]
    NotFitted,

    /// Input has a different column count than the fit data
    #[error("expected {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Arrays that must line up element by element differ in shape
    #[error("expected shape {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A value landed in a partition whose extent is not positive
    #[error("column {column} has no usable extent on the {side} side")]
    DegenerateColumn { column: usize, side: Side },

    /// Fit data has no rows or no columns
    #[error("cannot fit on empty input")]
    EmptyInput,

    /// A column holds only missing values
    #[error("column {column} has no non-missing values")]
    EmptyColumn { column: usize },

    /// Masked merge found an index neither partial covers
    #[error("masked merge has no value at ({row}, {column})")]
    IncompleteMerge { row: usize, column: usize },
}

/// Errors raised while loading, saving or selecting data
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("could not create directory: {0}")]
    Dir(#[from] fs_extra::error::Error),

    /// Field is neither a number nor a missing-value marker
    #[error("row {row}, column {column}: cannot parse {value:?} as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    /// Row length differs from the header
    #[error("row {row} has {actual} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error(transparent)]
    Scaler(#[from] ScalerError),
}
