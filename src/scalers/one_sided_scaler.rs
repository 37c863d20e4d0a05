//! One-sided scaling: center on the mean, then divide values above the mean
//! by the largest positive deviation and values below it by the magnitude of
//! the largest negative deviation.
//!
//! Values seen at fit time land in `[-1, 1]`; the mean itself maps to `0`.

use log::{debug, warn};
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};

use crate::config::{DegeneratePolicy, ScalerConfig};
use crate::error::{ScalerError, Side};
use crate::scalers::masked::{masked_merge, split_by_mask};
use crate::scalers::params::OneSidedParams;

struct ColumnStats {
    mean: f64,
    v_min: f64,
    v_max: f64,
}

/// State captured by the most recent `fit`
#[derive(Debug, Clone)]
struct Fitted {
    mean: Array1<f64>,
    v_min: Array1<f64>,
    v_max: Array1<f64>,
    /// Fit data minus `mean`. Absent when rebuilt from params.
    centered: Option<Array2<f64>>,
    /// `centered >= 0`, elementwise
    above_mean: Option<Array2<bool>>,
}

#[derive(Debug, Clone, Default)]
pub struct OneSidedScaler {
    config: ScalerConfig,
    fitted: Option<Fitted>,
}

impl OneSidedScaler {
    pub fn new(config: ScalerConfig) -> Self {
        OneSidedScaler {
            config,
            fitted: None,
        }
    }

    /// Rebuild a fitted scaler from saved statistics.
    ///
    /// The result has no fit-time data cached, so `transform_fitted` on it
    /// returns `NotFitted`.
    pub fn from_params(params: &OneSidedParams, config: ScalerConfig) -> Result<Self, ScalerError> {
        let expected = params.n_features();
        for len in [params.v_min.len(), params.v_max.len()] {
            if len != expected {
                return Err(ScalerError::ShapeMismatch {
                    expected,
                    actual: len,
                });
            }
        }
        if expected == 0 {
            return Err(ScalerError::EmptyInput);
        }

        Ok(OneSidedScaler {
            config,
            fitted: Some(Fitted {
                mean: Array1::from(params.mean.clone()),
                v_min: Array1::from(params.v_min.clone()),
                v_max: Array1::from(params.v_max.clone()),
                centered: None,
                above_mean: None,
            }),
        })
    }

    pub fn config(&self) -> &ScalerConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.mean.len())
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.mean)
    }

    pub fn v_min(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.v_min)
    }

    pub fn v_max(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.v_max)
    }

    pub fn centered(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().and_then(|f| f.centered.as_ref())
    }

    pub fn above_mean(&self) -> Option<&Array2<bool>> {
        self.fitted.as_ref().and_then(|f| f.above_mean.as_ref())
    }

    /// Learn per-column mean and the positive/negative extents of `x`.
    ///
    /// Missing values (`NaN`) are skipped by every statistic. Any previous
    /// fit is replaced, also when this one fails.
    pub fn fit<S>(&mut self, x: &ArrayBase<S, Ix2>) -> Result<&mut Self, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        self.fitted = None;
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ScalerError::EmptyInput);
        }

        let stats = x
            .axis_iter(Axis(1))
            .into_par_iter()
            .enumerate()
            .map(|(column, values)| column_stats(column, values))
            .collect::<Result<Vec<_>, _>>()?;

        let mean: Array1<f64> = stats.iter().map(|s| s.mean).collect();
        let v_min: Array1<f64> = stats.iter().map(|s| s.v_min).collect();
        let v_max: Array1<f64> = stats.iter().map(|s| s.v_max).collect();

        for (column, (lo, hi)) in v_min.iter().zip(v_max.iter()).enumerate() {
            if is_degenerate(*lo) || is_degenerate(*hi) {
                warn!(
                    "column {} is degenerate (v_min = {}, v_max = {})",
                    column, lo, hi
                );
            }
        }

        let centered = x - &mean;
        let above_mean = centered.mapv(|c| c >= 0.0);
        debug!("fitted one-sided scaler on {} rows x {} columns", x.nrows(), x.ncols());

        self.fitted = Some(Fitted {
            mean,
            v_min,
            v_max,
            centered: Some(centered),
            above_mean: Some(above_mean),
        });
        Ok(self)
    }

    /// Center `x` on the fitted mean and scale each side by its own extent.
    pub fn transform<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array2<f64>, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        let fitted = self.fitted.as_ref().ok_or(ScalerError::NotFitted)?;
        check_width(fitted, x.ncols())?;

        let centered = x - &fitted.mean;
        let above_mean = centered.mapv(|c| c >= 0.0);
        self.scale(fitted, &centered, &above_mean)
    }

    /// Scale the data seen by the last `fit`, using the mask captured then.
    ///
    /// Ignores any new input: the result depends only on fit-time state.
    pub fn transform_fitted(&self) -> Result<Array2<f64>, ScalerError> {
        let fitted = self.fitted.as_ref().ok_or(ScalerError::NotFitted)?;
        match (&fitted.centered, &fitted.above_mean) {
            (Some(centered), Some(above_mean)) => self.scale(fitted, centered, above_mean),
            _ => Err(ScalerError::NotFitted),
        }
    }

    pub fn fit_transform<S>(&mut self, x: &ArrayBase<S, Ix2>) -> Result<Array2<f64>, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        self.fit(x)?;
        self.transform(x)
    }

    /// Map scaled values back to the original units.
    pub fn inverse_transform<S>(&self, y: &ArrayBase<S, Ix2>) -> Result<Array2<f64>, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        let fitted = self.fitted.as_ref().ok_or(ScalerError::NotFitted)?;
        check_width(fitted, y.ncols())?;

        let mut out = y.to_owned();
        let extents = fitted.mean.iter().zip(fitted.v_min.iter()).zip(fitted.v_max.iter());
        for (mut column, ((&mean, &lo), &hi)) in out.axis_iter_mut(Axis(1)).zip(extents) {
            column.mapv_inplace(|v| if v >= 0.0 { v * hi + mean } else { v * lo + mean });
        }
        Ok(out)
    }

    pub fn fit_series<S>(&mut self, x: &ArrayBase<S, Ix1>) -> Result<&mut Self, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        self.fit(&x.view().insert_axis(Axis(1)))
    }

    pub fn transform_series<S>(&self, x: &ArrayBase<S, Ix1>) -> Result<Array1<f64>, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        let out = self.transform(&x.view().insert_axis(Axis(1)))?;
        Ok(out.index_axis_move(Axis(1), 0))
    }

    pub fn fit_transform_series<S>(&mut self, x: &ArrayBase<S, Ix1>) -> Result<Array1<f64>, ScalerError>
    where
        S: Data<Elem = f64>,
    {
        self.fit_series(x)?;
        self.transform_series(x)
    }

    pub fn params(&self) -> Result<OneSidedParams, ScalerError> {
        let fitted = self.fitted.as_ref().ok_or(ScalerError::NotFitted)?;
        Ok(OneSidedParams {
            columns: Vec::new(),
            mean: fitted.mean.to_vec(),
            v_min: fitted.v_min.to_vec(),
            v_max: fitted.v_max.to_vec(),
        })
    }

    fn scale(
        &self,
        fitted: &Fitted,
        centered: &Array2<f64>,
        above_mean: &Array2<bool>,
    ) -> Result<Array2<f64>, ScalerError> {
        let (mut high, mut low) = split_by_mask(centered, above_mean);
        self.scale_partition(&mut high, &fitted.v_max, Side::High)?;
        self.scale_partition(&mut low, &fitted.v_min, Side::Low)?;
        masked_merge(above_mean, &high, &low)
    }

    fn scale_partition(
        &self,
        partial: &mut Array2<Option<f64>>,
        extent: &Array1<f64>,
        side: Side,
    ) -> Result<(), ScalerError> {
        for (column, (mut values, &e)) in partial.axis_iter_mut(Axis(1)).zip(extent.iter()).enumerate() {
            if !is_degenerate(e) {
                values.mapv_inplace(|v| v.map(|v| v / e));
                continue;
            }

            // Missing values pass through as NaN and never trip the policy.
            let hit = values.iter().any(|v| matches!(v, Some(v) if !v.is_nan()));
            if !hit {
                continue;
            }

            match self.config.on_degenerate {
                DegeneratePolicy::Error => {
                    return Err(ScalerError::DegenerateColumn { column, side });
                }
                DegeneratePolicy::Zero => {
                    warn!("column {} has zero extent on the {} side, emitting 0", column, side);
                    values.mapv_inplace(|v| v.map(|v| if v.is_nan() { v } else { 0.0 }));
                }
                DegeneratePolicy::NonFinite => {
                    warn!("column {} has zero extent on the {} side, emitting non-finite values", column, side);
                    values.mapv_inplace(|v| v.map(|v| v / e));
                }
            }
        }
        Ok(())
    }
}

fn check_width(fitted: &Fitted, actual: usize) -> Result<(), ScalerError> {
    let expected = fitted.mean.len();
    if actual != expected {
        return Err(ScalerError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Extents that are zero, negative or non-finite cannot divide a partition.
fn is_degenerate(extent: f64) -> bool {
    !(extent > 0.0 && extent.is_finite())
}

fn column_stats(column: usize, values: ArrayView1<f64>) -> Result<ColumnStats, ScalerError> {
    let (sum, count, lowest, highest) = values.iter().filter(|v| !v.is_nan()).fold(
        (0.0, 0usize, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, count, lo, hi), &v| (sum + v, count + 1, lo.min(v), hi.max(v)),
    );
    if count == 0 {
        return Err(ScalerError::EmptyColumn { column });
    }
    // Rounding can push sum / count just outside the observed range, which
    // turns a constant column into tiny extents of either sign.
    let mean = (sum / count as f64).clamp(lowest, highest);

    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| v - mean)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)));

    Ok(ColumnStats {
        mean,
        v_min: min.abs(),
        v_max: max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn assert_close(actual: &Array2<f64>, expected: &Array2<f64>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_simple_column() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        assert_eq!(scaler.mean().unwrap(), &array![3.0]);
        assert_eq!(scaler.v_max().unwrap(), &array![2.0]);
        assert_eq!(scaler.v_min().unwrap(), &array![2.0]);
        assert_eq!(
            scaler.above_mean().unwrap(),
            &array![[false], [false], [true], [true], [true]]
        );
        assert_eq!(
            scaler.transform(&x).unwrap(),
            array![[-1.0], [-0.5], [0.0], [0.5], [1.0]]
        );
    }

    #[test]
    fn test_constant_column_is_degenerate() {
        let x = array![[5.0], [5.0], [5.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        assert_eq!(scaler.v_max().unwrap(), &array![0.0]);
        assert_eq!(scaler.v_min().unwrap(), &array![0.0]);
        assert_eq!(
            scaler.transform(&x),
            Err(ScalerError::DegenerateColumn {
                column: 0,
                side: Side::High
            })
        );
    }

    #[test]
    fn test_inexact_constant_column_is_degenerate() {
        for rows in [3, 7, 10] {
            let x = Array2::from_elem((rows, 1), 0.1);
            let mut scaler = OneSidedScaler::default();
            scaler.fit(&x).unwrap();

            assert_eq!(scaler.mean().unwrap()[0], 0.1);
            assert_eq!(scaler.v_max().unwrap(), &array![0.0]);
            assert_eq!(scaler.v_min().unwrap(), &array![0.0]);
            assert_eq!(
                scaler.transform(&x),
                Err(ScalerError::DegenerateColumn {
                    column: 0,
                    side: Side::High
                })
            );
            assert!(scaler.transform(&array![[0.2]]).is_err());
        }
    }

    #[test]
    fn test_negative_extent_is_degenerate() {
        let params = OneSidedParams {
            columns: Vec::new(),
            mean: vec![0.1],
            v_min: vec![1.0],
            v_max: vec![-1.0e-17],
        };
        let scaler = OneSidedScaler::from_params(&params, ScalerConfig::default()).unwrap();

        assert_eq!(
            scaler.transform(&array![[0.2]]),
            Err(ScalerError::DegenerateColumn {
                column: 0,
                side: Side::High
            })
        );
        assert_eq!(scaler.transform(&array![[0.0]]).unwrap(), array![[-0.1]]);
    }

    #[test]
    fn test_degenerate_policies() {
        let x = array![[5.0, 1.0], [5.0, 3.0]];
        let probe = array![[6.0, 2.0], [4.0, 2.0]];

        let mut zero = OneSidedScaler::new(ScalerConfig::default().with_degenerate_policy(DegeneratePolicy::Zero));
        zero.fit(&x).unwrap();
        assert_eq!(zero.transform(&probe).unwrap(), array![[0.0, 0.0], [0.0, 0.0]]);

        let mut raw = OneSidedScaler::new(ScalerConfig::default().with_degenerate_policy(DegeneratePolicy::NonFinite));
        raw.fit(&x).unwrap();
        let out = raw.transform(&probe).unwrap();
        assert_eq!(out[[0, 0]], f64::INFINITY);
        assert_eq!(out[[1, 0]], f64::NEG_INFINITY);
        assert_eq!(out[[0, 1]], 0.0);
    }

    #[test]
    fn test_asymmetric_extents_are_independent() {
        let x = array![[1.0], [10.0], [10.0], [10.0], [100.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        let mean = scaler.mean().unwrap()[0];
        let v_max = scaler.v_max().unwrap()[0];
        let v_min = scaler.v_min().unwrap()[0];
        assert!((mean - 26.2).abs() < 1e-12);
        assert!((v_max - 73.8).abs() < 1e-12);
        assert!((v_min - 25.2).abs() < 1e-12);

        let out = scaler.transform(&x).unwrap();
        assert_eq!(out[[4, 0]], 1.0);
        assert_eq!(out[[0, 0]], -1.0);
        assert!((out[[1, 0]] - (10.0 - mean) / v_min).abs() < 1e-12);

        // Same mean and maximum, lower minimum: only the low side moves.
        let wide = array![[-8.0], [19.0], [10.0], [10.0], [100.0]];
        let mut other = OneSidedScaler::default();
        other.fit(&wide).unwrap();
        assert_eq!(other.mean().unwrap()[0], mean);
        assert_eq!(other.v_max().unwrap()[0], v_max);
        assert!((other.v_min().unwrap()[0] - 34.2).abs() < 1e-12);

        let probe = array![[50.0], [100.0], [5.0]];
        let a = scaler.transform(&probe).unwrap();
        let b = other.transform(&probe).unwrap();
        assert_eq!(a[[0, 0]], b[[0, 0]]);
        assert_eq!(a[[1, 0]], 1.0);
        assert_eq!(b[[1, 0]], 1.0);
        assert!(a[[2, 0]] < b[[2, 0]]);
    }

    #[test]
    fn test_high_side_ignores_low_extent() {
        let x = array![[0.0], [10.0], [20.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        let mut params = scaler.params().unwrap();
        params.v_min = vec![1000.0];
        let altered = OneSidedScaler::from_params(&params, ScalerConfig::default()).unwrap();

        let probe = array![[15.0], [5.0]];
        let a = scaler.transform(&probe).unwrap();
        let b = altered.transform(&probe).unwrap();
        assert_eq!(a[[0, 0]], b[[0, 0]]);
        assert_ne!(a[[1, 0]], b[[1, 0]]);
    }

    #[test]
    fn test_transform_uses_given_input() {
        let x = array![[0.0, 100.0], [10.0, 200.0], [20.0, 300.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        let out = scaler.transform(&array![[15.0, 150.0]]).unwrap();
        assert_close(&out, &array![[0.5, -0.5]]);
    }

    #[test]
    fn test_transform_fitted_matches_fit_data() {
        let x = array![[3.0, -1.0], [7.0, 4.0], [2.0, 0.5], [8.0, 2.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        assert_eq!(scaler.transform_fitted().unwrap(), scaler.transform(&x).unwrap());
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = OneSidedScaler::default();
        assert_eq!(scaler.transform(&array![[1.0]]), Err(ScalerError::NotFitted));
        assert_eq!(scaler.transform_fitted(), Err(ScalerError::NotFitted));
        assert_eq!(scaler.inverse_transform(&array![[1.0]]), Err(ScalerError::NotFitted));
        assert!(scaler.params().is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();

        assert_eq!(
            scaler.transform(&array![[1.0, 2.0, 3.0]]),
            Err(ScalerError::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_empty_input() {
        let mut scaler = OneSidedScaler::default();
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(scaler.fit(&empty), Err(ScalerError::EmptyInput)));
        assert!(!scaler.is_fitted());
    }

    #[test]
    fn test_missing_values() {
        let x = array![[1.0, f64::NAN], [f64::NAN, f64::NAN], [5.0, f64::NAN]];
        let mut scaler = OneSidedScaler::default();
        assert!(matches!(
            scaler.fit(&x),
            Err(ScalerError::EmptyColumn { column: 1 })
        ));

        let x = array![[1.0], [f64::NAN], [5.0]];
        let out = scaler.fit_transform(&x).unwrap();
        assert_eq!(scaler.mean().unwrap(), &array![3.0]);
        assert_eq!(out[[0, 0]], -1.0);
        assert!(out[[1, 0]].is_nan());
        assert_eq!(out[[2, 0]], 1.0);
    }

    #[test]
    fn test_missing_value_in_degenerate_column() {
        let x = array![[2.0], [f64::NAN], [2.0]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        assert!(scaler.transform(&array![[f64::NAN]]).unwrap()[[0, 0]].is_nan());
        assert!(scaler.transform(&array![[2.0]]).is_err());
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.0, -4.0], [10.0, 2.5], [10.0, 0.0], [100.0, 7.0]];
        let mut scaler = OneSidedScaler::default();
        let scaled = scaler.fit_transform(&x).unwrap();

        assert_close(&scaler.inverse_transform(&scaled).unwrap(), &x);
    }

    #[test]
    fn test_series() {
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let mut scaler = OneSidedScaler::default();

        assert_eq!(
            scaler.fit_transform_series(&x).unwrap(),
            array![-1.0, -0.5, 0.0, 0.5, 1.0]
        );
        assert_eq!(scaler.transform_series(&array![4.0]).unwrap(), array![0.5]);
    }

    #[test]
    fn test_from_params_matches_original() {
        let x = array![[0.4, 12.0], [0.9, 3.0], [0.2, 7.5]];
        let mut scaler = OneSidedScaler::default();
        scaler.fit(&x).unwrap();

        let rebuilt = OneSidedScaler::from_params(&scaler.params().unwrap(), ScalerConfig::default()).unwrap();
        assert_eq!(rebuilt.transform(&x).unwrap(), scaler.transform(&x).unwrap());
        assert_eq!(rebuilt.transform_fitted(), Err(ScalerError::NotFitted));
    }

    #[test]
    fn test_from_params_rejects_ragged() {
        let params = OneSidedParams {
            columns: Vec::new(),
            mean: vec![1.0, 2.0],
            v_min: vec![1.0],
            v_max: vec![1.0, 1.0],
        };
        assert!(OneSidedScaler::from_params(&params, ScalerConfig::default()).is_err());
    }
}
