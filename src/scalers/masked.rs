//! Masked split and merge over two disjoint partitions of an array

use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};

use crate::error::ScalerError;

/// Split `values` into two partial arrays: `high` holds the entries where
/// `mask` is true, `low` the rest. Every index is defined in exactly one.
pub fn split_by_mask<S, M>(
    values: &ArrayBase<S, Ix2>,
    mask: &ArrayBase<M, Ix2>,
) -> (Array2<Option<f64>>, Array2<Option<f64>>)
where
    S: Data<Elem = f64>,
    M: Data<Elem = bool>,
{
    let high = Zip::from(values)
        .and(mask)
        .map_collect(|&v, &m| if m { Some(v) } else { None });
    let low = Zip::from(values)
        .and(mask)
        .map_collect(|&v, &m| if m { None } else { Some(v) });
    (high, low)
}

/// Merge two partials back into one total array, taking `high` where `mask`
/// is true and `low` elsewhere.
pub fn masked_merge<M>(
    mask: &ArrayBase<M, Ix2>,
    high: &Array2<Option<f64>>,
    low: &Array2<Option<f64>>,
) -> Result<Array2<f64>, ScalerError>
where
    M: Data<Elem = bool>,
{
    for partial in [high, low] {
        if partial.dim() != mask.dim() {
            return Err(ScalerError::DimensionMismatch {
                expected: mask.dim(),
                actual: partial.dim(),
            });
        }
    }

    let mut merged = Array2::<f64>::zeros(mask.dim());
    for ((row, column), out) in merged.indexed_iter_mut() {
        let picked = if mask[[row, column]] {
            high[[row, column]]
        } else {
            low[[row, column]]
        };
        *out = picked.ok_or(ScalerError::IncompleteMerge { row, column })?;
    }
    Ok(merged)
}
