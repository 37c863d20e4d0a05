use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_pickle::{DeOptions, SerOptions};

use crate::error::DatasetError;

/// Fitted statistics of a `OneSidedScaler`, one entry per column.
///
/// Stored as a pickle so the model side of the pipeline can load it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneSidedParams {
    /// Column names, empty when the scaler was fitted on a bare array
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub v_min: Vec<f64>,
    pub v_max: Vec<f64>,
}

impl OneSidedParams {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_pickle::to_writer(&mut writer, self, SerOptions::new())?;
        debug!("saved scaler params to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let params = serde_pickle::from_reader(reader, DeOptions::new())?;
        debug!("loaded scaler params from {}", path.as_ref().display());
        Ok(params)
    }
}
