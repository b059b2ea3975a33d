//! Dual-pass recursive filtering along the axes of a grid.

use crate::cache::CoefficientCache;
use crate::grid::check_axis;
use crate::{DerivativeOrder, Error, Grid, RecursionCoefficients, Result};
use log::*;
use ndarray::{ArrayViewMut1, ArrayViewMutD, Axis, Zip};
use std::sync::Arc;

/// The four-pole recursion needs this many samples of history.
pub const MIN_LINE_LENGTH: usize = 4;

/// Parameters of a recursive Gaussian (derivative) filter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecursiveGaussian {
    /// Standard deviation in physical units.
    pub sigma: f64,

    pub order: DerivativeOrder,

    /// Multiply derivatives by `sigma^order`.
    pub normalize_across_scale: bool,
}

impl Default for RecursiveGaussian {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            order: DerivativeOrder::Zero,
            normalize_across_scale: false,
        }
    }
}

impl RecursiveGaussian {
    pub fn new(sigma: f64, order: DerivativeOrder) -> Self {
        Self {
            sigma,
            order,
            ..Default::default()
        }
    }

    /// Coefficients for an axis with the given spacing.
    pub fn coefficients(&self, spacing: f64) -> Result<RecursionCoefficients> {
        RecursionCoefficients::new(
            self.order,
            self.sigma,
            spacing,
            self.normalize_across_scale,
        )
    }
}

/// Filter one line of samples into `output`.
///
/// # Errors
/// [`Error::LineTooShort`] when `data` has fewer than [`MIN_LINE_LENGTH`]
/// samples, [`Error::LengthMismatch`] when `output` is not as long as `data`.
/// `output` is left untouched on error.
pub fn filter_line(
    coefficients: &RecursionCoefficients,
    data: &[f64],
    output: &mut [f64],
) -> Result<()> {
    check_line_length(data.len())?;
    if output.len() != data.len() {
        return Err(Error::LengthMismatch {
            expected: data.len(),
            len: output.len(),
        });
    }
    let mut scratch = vec![0.0; data.len()];
    filter_data_array(coefficients, data, output, &mut scratch);
    Ok(())
}

/// Run the recursion along every line of `grid` parallel to `axis`, in place.
///
/// Nothing is written unless the axis and line length are valid.
pub fn apply_recursive_filter(
    grid: &mut ArrayViewMutD<f64>,
    axis: usize,
    coefficients: &RecursionCoefficients,
) -> Result<()> {
    check_axis(grid.ndim(), axis)?;
    check_line_length(grid.len_of(Axis(axis)))?;

    let filter = |mut line: ArrayViewMut1<f64>| {
        // Lines along inner axes are strided; work on a contiguous copy.
        let data = line.to_vec();
        let mut output = vec![0.0; data.len()];
        let mut scratch = vec![0.0; data.len()];
        filter_data_array(coefficients, &data, &mut output, &mut scratch);
        for (sample, value) in line.iter_mut().zip(output) {
            *sample = value;
        }
    };

    let lines = Zip::from(grid.lanes_mut(Axis(axis)));
    #[cfg(feature = "rayon")]
    lines.par_for_each(filter);
    #[cfg(not(feature = "rayon"))]
    lines.for_each(filter);
    Ok(())
}

fn check_line_length(len: usize) -> Result<()> {
    if len < MIN_LINE_LENGTH {
        Err(Error::LineTooShort {
            len,
            min: MIN_LINE_LENGTH,
        })
    } else {
        Ok(())
    }
}

/// Causal pass into `outs`, anticausal pass into `scratch`, then combine.
///
/// The first and last samples are assumed to extend to infinity; the boundary
/// coefficients stand in for the feedback those virtual samples would have
/// produced.
fn filter_data_array(
    c: &RecursionCoefficients,
    data: &[f64],
    outs: &mut [f64],
    scratch: &mut [f64],
) {
    let ln = data.len();
    debug_assert!(ln >= MIN_LINE_LENGTH);
    let [n0, n1, n2, n3] = c.causal;
    let [d1, d2, d3, d4] = c.feedback;
    let [m1, m2, m3, m4] = c.anticausal;
    let [bn1, bn2, bn3, bn4] = c.causal_boundary;
    let [bm1, bm2, bm3, bm4] = c.anticausal_boundary;

    // Causal direction pass.
    let edge = data[0];
    outs[0] = edge * (n0 + n1 + n2 + n3);
    outs[1] = data[1] * n0 + edge * (n1 + n2 + n3);
    outs[2] = data[2] * n0 + data[1] * n1 + edge * (n2 + n3);
    outs[3] = data[3] * n0 + data[2] * n1 + data[1] * n2 + edge * n3;

    outs[0] -= edge * (bn1 + bn2 + bn3 + bn4);
    outs[1] -= outs[0] * d1 + edge * (bn2 + bn3 + bn4);
    outs[2] -= outs[1] * d1 + outs[0] * d2 + edge * (bn3 + bn4);
    outs[3] -= outs[2] * d1 + outs[1] * d2 + outs[0] * d3 + edge * bn4;

    for i in 4..ln {
        outs[i] = data[i] * n0 + data[i - 1] * n1 + data[i - 2] * n2 + data[i - 3] * n3
            - (outs[i - 1] * d1 + outs[i - 2] * d2 + outs[i - 3] * d3 + outs[i - 4] * d4);
    }

    // Anticausal direction pass.
    let edge = data[ln - 1];
    scratch[ln - 1] = edge * (m1 + m2 + m3 + m4);
    scratch[ln - 2] = data[ln - 1] * m1 + edge * (m2 + m3 + m4);
    scratch[ln - 3] = data[ln - 2] * m1 + data[ln - 1] * m2 + edge * (m3 + m4);
    scratch[ln - 4] = data[ln - 3] * m1 + data[ln - 2] * m2 + data[ln - 1] * m3 + edge * m4;

    scratch[ln - 1] -= edge * (bm1 + bm2 + bm3 + bm4);
    scratch[ln - 2] -= scratch[ln - 1] * d1 + edge * (bm2 + bm3 + bm4);
    scratch[ln - 3] -= scratch[ln - 2] * d1 + scratch[ln - 1] * d2 + edge * (bm3 + bm4);
    scratch[ln - 4] -=
        scratch[ln - 3] * d1 + scratch[ln - 2] * d2 + scratch[ln - 1] * d3 + edge * bm4;

    for i in (0..ln - 4).rev() {
        scratch[i] = data[i + 1] * m1 + data[i + 2] * m2 + data[i + 3] * m3 + data[i + 4] * m4
            - (scratch[i + 1] * d1 + scratch[i + 2] * d2 + scratch[i + 3] * d3 + scratch[i + 4] * d4);
    }

    for (out, &anticausal) in outs.iter_mut().zip(scratch.iter()) {
        *out = c.normalization * (*out + anticausal);
    }
}

/// A recursive Gaussian filter with cached coefficients.
///
/// Coefficients are derived lazily for each axis spacing the filter meets and
/// are dropped whenever a parameter changes.
#[derive(Debug, Clone, Default)]
pub struct RecursiveGaussianFilter {
    params: RecursiveGaussian,
    cache: CoefficientCache<f64, RecursionCoefficients>,
}

impl RecursiveGaussianFilter {
    pub fn new(params: RecursiveGaussian) -> Self {
        Self {
            params,
            cache: CoefficientCache::new(),
        }
    }

    pub fn params(&self) -> &RecursiveGaussian {
        &self.params
    }

    pub fn set_params(&mut self, params: RecursiveGaussian) {
        if params != self.params {
            self.params = params;
            self.cache.clear();
        }
    }

    pub fn set_sigma(&mut self, sigma: f64) {
        self.set_params(RecursiveGaussian {
            sigma,
            ..self.params
        });
    }

    pub fn set_order(&mut self, order: DerivativeOrder) {
        self.set_params(RecursiveGaussian {
            order,
            ..self.params
        });
    }

    pub fn set_normalize_across_scale(&mut self, normalize_across_scale: bool) {
        self.set_params(RecursiveGaussian {
            normalize_across_scale,
            ..self.params
        });
    }

    pub fn coefficients(&mut self, spacing: f64) -> Result<Arc<RecursionCoefficients>> {
        let params = self.params;
        self.cache
            .get_or_try_insert_with(spacing, |&spacing| params.coefficients(spacing))
    }

    /// Filter `grid` in place along `axis`, using that axis's spacing.
    pub fn apply(&mut self, grid: &mut Grid, axis: usize) -> Result<()> {
        let spacing = grid.axis_spacing(axis)?;
        let coefficients = self.coefficients(spacing)?;
        trace!("Recursive filtering along axis {}.", axis);
        apply_recursive_filter(&mut grid.array_mut(), axis, &coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{ArrayD, IxDyn};

    fn filtered(order: DerivativeOrder, sigma: f64, data: &[f64]) -> Vec<f64> {
        let c = RecursiveGaussian::new(sigma, order).coefficients(1.0).unwrap();
        let mut out = vec![0.0; data.len()];
        filter_line(&c, data, &mut out).unwrap();
        out
    }

    #[test]
    fn constant_line_is_preserved() {
        for &sigma in &[0.5, 2.0, 8.0] {
            for len in [4, 5, 17] {
                for v in filtered(DerivativeOrder::Zero, sigma, &vec![7.0; len]) {
                    assert_abs_diff_eq!(v, 7.0, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn short_lines_are_rejected() {
        let c = RecursiveGaussian::default().coefficients(1.0).unwrap();
        let mut out = [0.0; 3];
        assert_eq!(
            filter_line(&c, &[1.0, 2.0, 3.0], &mut out),
            Err(Error::LineTooShort { len: 3, min: 4 })
        );
    }

    #[test]
    fn output_must_match_input_length() {
        let c = RecursiveGaussian::default().coefficients(1.0).unwrap();
        let mut out = [9.0; 5];
        assert_eq!(
            filter_line(&c, &[1.0; 6], &mut out),
            Err(Error::LengthMismatch {
                expected: 6,
                len: 5
            })
        );
        assert_eq!(out, [9.0; 5]);
    }

    #[test]
    fn ramp_gives_unit_first_derivative() {
        let ramp: Vec<f64> = (0..100).map(f64::from).collect();
        for sigma in [0.7, 2.0] {
            let out = filtered(DerivativeOrder::First, sigma, &ramp);
            assert_abs_diff_eq!(out[50], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn parabola_gives_unit_second_derivative() {
        let parabola: Vec<f64> = (0..100).map(|i| f64::from(i * i) / 2.0).collect();
        for sigma in [0.7, 2.0] {
            let out = filtered(DerivativeOrder::Second, sigma, &parabola);
            assert_abs_diff_eq!(out[50], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn impulse_response_is_symmetric() {
        let mut impulse = vec![0.0; 61];
        impulse[30] = 1.0;
        let smooth = filtered(DerivativeOrder::Zero, 3.0, &impulse);
        let first = filtered(DerivativeOrder::First, 3.0, &impulse);
        for i in 0..10 {
            assert_abs_diff_eq!(smooth[30 - i], smooth[30 + i], epsilon = 1e-12);
            assert_abs_diff_eq!(first[30 - i], -first[30 + i], epsilon = 1e-12);
        }
        assert_abs_diff_eq!(smooth.iter().sum::<f64>(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn invalid_calls_leave_grid_untouched() {
        let original = ArrayD::from_shape_fn(IxDyn(&[3, 8]), |ix| (ix[0] * 8 + ix[1]) as f64);
        let mut data = original.clone();
        let c = RecursiveGaussian::default().coefficients(1.0).unwrap();
        assert_eq!(
            apply_recursive_filter(&mut data.view_mut(), 2, &c),
            Err(Error::AxisOutOfRange { axis: 2, ndim: 2 })
        );
        assert_eq!(
            apply_recursive_filter(&mut data.view_mut(), 0, &c),
            Err(Error::LineTooShort { len: 3, min: 4 })
        );
        assert_eq!(data, original);
    }

    #[test]
    fn strided_axis_matches_line_filter() {
        let data = ArrayD::from_shape_fn(IxDyn(&[9, 3]), |ix| ((ix[0] * 7 + ix[1] * 3) % 5) as f64);
        let mut grid = Grid::isotropic(data.clone());
        let mut filter = RecursiveGaussianFilter::new(RecursiveGaussian::new(1.5, DerivativeOrder::First));
        filter.apply(&mut grid, 0).unwrap();
        let c = filter.coefficients(1.0).unwrap();
        for col in 0..3 {
            let line: Vec<f64> = (0..9).map(|row| data[IxDyn(&[row, col])]).collect();
            let mut expected = vec![0.0; 9];
            filter_line(&c, &line, &mut expected).unwrap();
            for row in 0..9 {
                assert_eq!(grid[IxDyn(&[row, col])], expected[row]);
            }
        }
    }

    #[test]
    fn parameter_changes_invalidate_coefficients() {
        let mut filter = RecursiveGaussianFilter::new(RecursiveGaussian::new(1.0, DerivativeOrder::Zero));
        let before = filter.coefficients(1.0).unwrap();
        assert!(Arc::ptr_eq(&before, &filter.coefficients(1.0).unwrap()));
        filter.set_sigma(2.0);
        let after = filter.coefficients(1.0).unwrap();
        assert_ne!(before.feedback, after.feedback);
        filter.set_sigma(2.0);
        assert!(Arc::ptr_eq(&after, &filter.coefficients(1.0).unwrap()));
    }
}
