use std::io::{Read, Write};
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord, Writer, WriterBuilder};
use log::{debug, info};
use ndarray::{Array2, Axis, ErrorKind, ShapeError};
use rayon::prelude::*;

use crate::error::DatasetError;

/// A headed numeric table; rows are observations, columns are features.
/// Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub values: Array2<f64>,
}

impl Dataset {
    pub fn from_csv_path<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, DatasetError> {
        let reader = read_csv(path.as_ref(), delimiter)?;
        let dataset = Self::from_csv_reader(reader)?;
        info!(
            "loaded {} rows x {} columns from {}",
            dataset.values.nrows(),
            dataset.values.ncols(),
            path.as_ref().display()
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(rdr: R, delimiter: u8) -> Result<Self, DatasetError> {
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(rdr);
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: Read>(mut reader: Reader<R>) -> Result<Self, DatasetError> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let records = reader
            .into_records()
            .collect::<Result<Vec<StringRecord>, _>>()?;

        let rows = records
            .par_iter()
            .enumerate()
            .map(|(idx, record)| parse_record(idx + 1, &headers, record))
            .collect::<Result<Vec<Vec<f64>>, DatasetError>>()?;

        let shape = (rows.len(), headers.len());
        let values = Array2::from_shape_vec(shape, rows.into_iter().flatten().collect())?;
        Ok(Dataset { headers, values })
    }

    /// Keep only `columns`, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self, DatasetError> {
        let indices = columns
            .iter()
            .map(|name| {
                self.headers
                    .iter()
                    .position(|h| h == name.as_ref())
                    .ok_or_else(|| DatasetError::UnknownColumn(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<usize>, _>>()?;

        debug!("selected columns {:?}", indices);
        Ok(Dataset {
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
            values: self.values.select(Axis(1), &indices),
        })
    }

    /// Overwrite the named columns with the columns of `values`, in order.
    pub fn set_columns<S: AsRef<str>>(&mut self, columns: &[S], values: &Array2<f64>) -> Result<(), DatasetError> {
        if values.ncols() != columns.len() || values.nrows() != self.values.nrows() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }

        for (name, source) in columns.iter().zip(values.columns()) {
            let idx = self
                .headers
                .iter()
                .position(|h| h == name.as_ref())
                .ok_or_else(|| DatasetError::UnknownColumn(name.as_ref().to_string()))?;
            self.values.column_mut(idx).assign(&source);
        }
        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<(), DatasetError> {
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path.as_ref())?;
        self.write_to(writer)?;
        info!(
            "wrote {} rows x {} columns to {}",
            self.values.nrows(),
            self.values.ncols(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn write_to<W: Write>(&self, mut writer: Writer<W>) -> Result<(), DatasetError> {
        writer.write_record(&self.headers)?;
        for row in self.values.rows() {
            writer.write_record(row.iter().map(|v| format_field(*v)))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn read_csv(file: &Path, delimiter: u8) -> Result<Reader<std::fs::File>, DatasetError> {
    Ok(ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(file)?)
}

/// `row` is 1-based and excludes the header
fn parse_record(row: usize, headers: &[String], record: &StringRecord) -> Result<Vec<f64>, DatasetError> {
    if record.len() != headers.len() {
        return Err(DatasetError::RaggedRow {
            row,
            expected: headers.len(),
            actual: record.len(),
        });
    }

    record
        .iter()
        .zip(headers)
        .map(|(field, column)| {
            parse_field(field).ok_or_else(|| DatasetError::Parse {
                row,
                column: column.clone(),
                value: field.to_string(),
            })
        })
        .collect()
}

fn parse_field(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("na") || field.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    field.parse::<f64>().ok()
}

fn format_field(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
