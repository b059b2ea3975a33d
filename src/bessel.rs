//! Modified Bessel functions of the first kind.
//!
//! `exp(-t) * I_n(t)` is the discrete analogue of the Gaussian: sampling
//! the heat equation on the integer lattice at time `t` yields exactly these
//! values. The kernel synthesizer builds its taps from them.

use crate::{Error, Result};

/// Rescaling threshold of the downward recurrence.
const RESCALE_LIMIT: f64 = 1.0e10;
/// Extra starting depth of the recurrence, in units of `sqrt(n)`.
const DIGITS: f64 = 10.0;
/// Further starting depth grows as `sqrt(ARGUMENT_DEPTH * |y|)`.
const ARGUMENT_DEPTH: f64 = 40.0;

/// Modified Bessel function `I0(y)`.
///
/// Polynomial approximation for `|y| < 3.75`, scaled asymptotic series above.
/// Even in `y`.
pub fn bessel_i0(y: f64) -> f64 {
    let d = y.abs();
    if d < 3.75 {
        i0_polynomial(y)
    } else {
        (d.exp() / d.sqrt()) * i0_asymptotic(3.75 / d)
    }
}

/// Modified Bessel function `I1(y)`. Odd in `y`.
pub fn bessel_i1(y: f64) -> f64 {
    let d = y.abs();
    let magnitude = if d < 3.75 {
        i1_polynomial(y)
    } else {
        (d.exp() / d.sqrt()) * i1_asymptotic(3.75 / d)
    };
    if y < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Modified Bessel function `I_n(y)` for `n >= 2`.
///
/// Uses Miller's downward recurrence normalised against [`bessel_i0`].
/// Orders 0 and 1 must go through [`bessel_i0`] and [`bessel_i1`].
///
/// # Errors
/// [`Error::BesselOrder`] when `n < 2`.
pub fn bessel_i(n: u32, y: f64) -> Result<f64> {
    Ok(miller_ratio(n, y)? * bessel_i0(y))
}

/// `exp(-|y|) I0(y)`, finite for every finite `y`.
pub(crate) fn bessel_i0_scaled(y: f64) -> f64 {
    let d = y.abs();
    if d < 3.75 {
        (-d).exp() * i0_polynomial(y)
    } else {
        i0_asymptotic(3.75 / d) / d.sqrt()
    }
}

/// `exp(-|y|) I1(y)`, finite for every finite `y`.
pub(crate) fn bessel_i1_scaled(y: f64) -> f64 {
    let d = y.abs();
    let magnitude = if d < 3.75 {
        (-d).exp() * i1_polynomial(y)
    } else {
        i1_asymptotic(3.75 / d) / d.sqrt()
    };
    if y < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// `exp(-|y|) I_n(y)` for `n >= 2`, finite for every finite `y`.
pub(crate) fn bessel_i_scaled(n: u32, y: f64) -> Result<f64> {
    Ok(miller_ratio(n, y)? * bessel_i0_scaled(y))
}

fn i0_polynomial(y: f64) -> f64 {
    let m = (y / 3.75).powi(2);
    1.0 + m
        * (3.5156229
            + m * (3.0899424
                + m * (1.2067492 + m * (0.2659732 + m * (0.360768e-1 + m * 0.45813e-2)))))
}

/// `sqrt(d) exp(-d) I0(d)` in terms of `m = 3.75 / d`.
fn i0_asymptotic(m: f64) -> f64 {
    0.39894228
        + m * (0.1328592e-1
            + m * (0.225319e-2
                + m * (-0.157565e-2
                    + m * (0.916281e-2
                        + m * (-0.2057706e-1
                            + m * (0.2635537e-1 + m * (-0.1647633e-1 + m * 0.392377e-2)))))))
}

/// `|I1(y)|` for `|y| < 3.75`.
fn i1_polynomial(y: f64) -> f64 {
    let m = (y / 3.75).powi(2);
    y.abs()
        * (0.5
            + m * (0.87890594
                + m * (0.51498869
                    + m * (0.15084934 + m * (0.2658733e-1 + m * (0.301532e-2 + m * 0.32411e-3))))))
}

/// `sqrt(d) exp(-d) |I1(d)|` in terms of `m = 3.75 / d`.
fn i1_asymptotic(m: f64) -> f64 {
    let tail = 0.2282967e-1 + m * (-0.2895312e-1 + m * (0.1787654e-1 - m * 0.420059e-2));
    0.39894228
        + m * (-0.3988024e-1
            + m * (-0.362018e-2 + m * (0.163801e-2 + m * (-0.1031555e-1 + m * tail))))
}

/// `I_n(y) / I0(y)` by downward recurrence, signed.
fn miller_ratio(n: u32, y: f64) -> Result<f64> {
    if n < 2 {
        return Err(Error::BesselOrder { order: n });
    }
    if y == 0.0 {
        return Ok(0.0);
    }

    let two_over_y = 2.0 / y.abs();
    // The recurrence must start well beyond both the order and sqrt(|y|), or
    // large arguments pick up the unwanted solution.
    let start = n
        .saturating_add((DIGITS * f64::from(n).sqrt()) as u32)
        .saturating_mul(2)
        .saturating_add((ARGUMENT_DEPTH * y.abs()).sqrt() as u32);

    let mut captured = 0.0;
    let mut above = 0.0;
    let mut current = 1.0;
    for j in (1..=start).rev() {
        let below = above + f64::from(j) * two_over_y * current;
        above = current;
        current = below;
        if current.abs() > RESCALE_LIMIT {
            captured *= 1.0 / RESCALE_LIMIT;
            current *= 1.0 / RESCALE_LIMIT;
            above *= 1.0 / RESCALE_LIMIT;
        }
        if j == n {
            captured = above;
        }
    }

    let ratio = captured / current;
    if y < 0.0 && n % 2 == 1 {
        Ok(-ratio)
    } else {
        Ok(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Power series `sum (y/2)^(2k+n) / (k! (k+n)!)`.
    fn series(n: u32, y: f64) -> f64 {
        let half = y / 2.0;
        let mut term = half.powi(n as i32) / (1..=n).map(f64::from).product::<f64>();
        let mut total = term;
        for k in 1..60 {
            term *= half * half / (f64::from(k) * f64::from(k + n));
            total += term;
        }
        total
    }

    #[test]
    fn values_at_zero() {
        assert_eq!(bessel_i0(0.0), 1.0);
        assert_eq!(bessel_i1(0.0), 0.0);
        assert_eq!(bessel_i(4, 0.0), Ok(0.0));
    }

    #[test]
    fn low_orders_are_rejected() {
        assert_eq!(bessel_i(0, 1.0), Err(Error::BesselOrder { order: 0 }));
        assert_eq!(bessel_i(1, 1.0), Err(Error::BesselOrder { order: 1 }));
    }

    #[test]
    fn matches_power_series() {
        for &y in &[0.3, 1.0, 2.5, 3.74, 3.76, 8.0, 20.0] {
            assert_relative_eq!(bessel_i0(y), series(0, y), max_relative = 1e-6);
            assert_relative_eq!(bessel_i1(y), series(1, y), max_relative = 1e-6);
            for n in 2..8 {
                assert_relative_eq!(bessel_i(n, y).unwrap(), series(n, y), max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn parity() {
        for &y in &[0.5, 2.0, 6.0] {
            assert_eq!(bessel_i0(-y), bessel_i0(y));
            assert_eq!(bessel_i1(-y), -bessel_i1(y));
            assert_eq!(bessel_i(2, -y).unwrap(), bessel_i(2, y).unwrap());
            assert_eq!(bessel_i(3, -y).unwrap(), -bessel_i(3, y).unwrap());
        }
    }

    #[test]
    fn large_arguments_stay_finite() {
        let value = bessel_i(40, 500.0).unwrap();
        assert!(value.is_finite());
        assert!(value > 0.0);
        assert!(value < bessel_i0(500.0));
    }

    #[test]
    fn scaled_values_match_unscaled() {
        for &y in &[0.5f64, 3.0, 3.75, 10.0, 60.0] {
            let scale = (-y).exp();
            assert_relative_eq!(bessel_i0_scaled(y), scale * bessel_i0(y), max_relative = 1e-12);
            assert_relative_eq!(bessel_i1_scaled(-y), -scale * bessel_i1(y), max_relative = 1e-12);
            assert_relative_eq!(
                bessel_i_scaled(5, y).unwrap(),
                scale * bessel_i(5, y).unwrap(),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn scaled_values_stay_finite_past_overflow() {
        let y = 1.0e4;
        // exp(-y) I0(y) ~ (1 + 1 / 8y) / sqrt(2 pi y).
        let asymptote = (1.0 + 1.0 / (8.0 * y)) / (2.0 * std::f64::consts::PI * y).sqrt();
        assert_relative_eq!(bessel_i0_scaled(y), asymptote, max_relative = 1e-6);
        assert!(bessel_i0(y).is_infinite());
        assert!(bessel_i_scaled(7, y).unwrap().is_finite());
    }

    #[test]
    fn recurrence_is_accurate_far_beyond_the_order() {
        // exp(-y) (I0(y) + 2 sum I_n(y)) == 1.
        for &y in &[100.0, 900.0, 2500.0] {
            let mut total = bessel_i0_scaled(y) + 2.0 * bessel_i1_scaled(y);
            for n in 2..400 {
                total += 2.0 * bessel_i_scaled(n, y).unwrap();
            }
            assert_relative_eq!(total, 1.0, max_relative = 1e-6);
        }
    }
}
