//! Coefficients of the four-pole recursive approximation of a Gaussian and
//! its first two derivatives.
//!
//! Each operator is fit by a sum of two damped oscillations,
//!
//! ```text
//! h(x) = (a0 cos(w0 x) + a1 sin(w0 x)) exp(-b0 x) + (c0 cos(w1 x) + c1 sin(w1 x)) exp(-b1 x)
//! ```
//!
//! for `x >= 0` in pixel units, following R. Deriche, "Recursively implementing
//! the Gaussian and its derivatives", INRIA RR-1893, 1993. The causal half
//! becomes a fourth-order recursion; the anticausal half mirrors it.

use crate::error::positive;
use crate::{DerivativeOrder, Result, Symmetry};
use log::*;

/// Amplitudes of one fitted operator, per unit sigma.
#[derive(Debug, Clone, Copy)]
struct ExponentialSeries {
    a0: f64,
    a1: f64,
    c0: f64,
    c1: f64,
}

/// Amplitudes for the smoothing, first and second derivative fits.
const SERIES: [ExponentialSeries; 3] = [
    ExponentialSeries {
        a0: 1.3530,
        a1: 1.8151,
        c0: -0.3531,
        c1: 0.0902,
    },
    ExponentialSeries {
        a0: -0.6724,
        a1: -3.4327,
        c0: 0.6724,
        c1: 0.6100,
    },
    ExponentialSeries {
        a0: -1.3563,
        a1: 5.2318,
        c0: 0.3446,
        c1: -2.2355,
    },
];

// Frequencies and decay rates shared by all three fits, per unit sigma.
const W0: f64 = 0.6681;
const B0: f64 = 1.3932;
const W1: f64 = 2.0787;
const B1: f64 = 1.3732;

/// Continuous-domain parameters of the two-term exponential series, already
/// scaled to pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoleParameters {
    pub a0: f64,
    pub a1: f64,
    pub b0: f64,
    pub b1: f64,
    pub c0: f64,
    pub c1: f64,
    pub w0: f64,
    pub w1: f64,
}

impl PoleParameters {
    /// Pole parameters of the fit for `order` at scale `sigma`, both `sigma`
    /// and `spacing` in physical units.
    pub fn new(order: DerivativeOrder, sigma: f64, spacing: f64) -> Result<Self> {
        let sigmad = positive("sigma", sigma)? / positive("spacing", spacing)?;
        let series = SERIES[order.as_u32() as usize];
        Ok(Self {
            a0: series.a0,
            a1: series.a1,
            b0: B0 / sigmad,
            b1: B1 / sigmad,
            c0: series.c0,
            c1: series.c1,
            w0: W0 / sigmad,
            w1: W1 / sigmad,
        })
    }

    /// Feed-forward taps `n00..n33` of the causal recursion.
    pub fn causal_taps(&self) -> [f64; 4] {
        let (cos0, sin0, exp0) = (self.w0.cos(), self.w0.sin(), (-self.b0).exp());
        let (cos1, sin1, exp1) = (self.w1.cos(), self.w1.sin(), (-self.b1).exp());
        let (a0, a1, c0, c1) = (self.a0, self.a1, self.c0, self.c1);

        let n0 = a0 + c0;
        let n1 = exp1 * (c1 * sin1 - (c0 + 2.0 * a0) * cos1)
            + exp0 * (a1 * sin0 - (a0 + 2.0 * c0) * cos0);
        let n2 = 2.0 * exp0 * exp1 * ((a0 + c0) * cos1 * cos0 - a1 * cos1 * sin0 - c1 * cos0 * sin1)
            + c0 * exp0 * exp0
            + a0 * exp1 * exp1;
        let n3 = exp1 * exp0 * exp0 * (c1 * sin1 - c0 * cos1)
            + exp0 * exp1 * exp1 * (a1 * sin0 - a0 * cos0);
        [n0, n1, n2, n3]
    }

    /// Feedback taps `d11..d44`, shared by the causal and anticausal passes.
    pub fn feedback_taps(&self) -> [f64; 4] {
        let (cos0, exp0) = (self.w0.cos(), (-self.b0).exp());
        let (cos1, exp1) = (self.w1.cos(), (-self.b1).exp());

        let d1 = -2.0 * (exp1 * cos1 + exp0 * cos0);
        let d2 = 4.0 * cos1 * cos0 * exp0 * exp1 + exp0 * exp0 + exp1 * exp1;
        let d3 = -2.0 * cos0 * exp0 * exp1 * exp1 - 2.0 * cos1 * exp1 * exp0 * exp0;
        let d4 = exp0 * exp0 * exp1 * exp1;
        [d1, d2, d3, d4]
    }
}

/// Zeroth, first and second moments `sum(t_k k^p)` of a tap sequence `t_0..t_3`.
#[derive(Debug, Clone, Copy)]
struct Moments {
    sum: f64,
    first: f64,
    second: f64,
}

impl Moments {
    fn of(taps: &[f64; 4]) -> Self {
        let mut moments = Self {
            sum: 0.0,
            first: 0.0,
            second: 0.0,
        };
        for (k, &t) in taps.iter().enumerate() {
            let k = k as f64;
            moments.sum += t;
            moments.first += k * t;
            moments.second += k * k * t;
        }
        moments
    }

    /// Moments of the denominator `1 + d1 z + d2 z^2 + ...`.
    fn of_feedback(feedback: &[f64; 4]) -> Self {
        let mut moments = Self::of(&[0.0, feedback[0], feedback[1], feedback[2]]);
        let d4 = feedback[3];
        moments.sum += 1.0 + d4;
        moments.first += 4.0 * d4;
        moments.second += 16.0 * d4;
        moments
    }
}

/// Everything the line filter needs to run one operator at one scale.
///
/// Computed once per `(sigma, spacing, order, normalization)` and never
/// modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecursionCoefficients {
    pub poles: PoleParameters,
    /// `n00, n11, n22, n33`.
    pub causal: [f64; 4],
    /// `d11, d22, d33, d44`.
    pub feedback: [f64; 4],
    /// `m11, m22, m33, m44`.
    pub anticausal: [f64; 4],
    /// `K`, applied to the sum of both passes.
    pub normalization: f64,
    /// Feedback seen by the causal pass when the first sample is replicated
    /// to minus infinity.
    pub causal_boundary: [f64; 4],
    /// Same for the anticausal pass and the last sample.
    pub anticausal_boundary: [f64; 4],
}

impl RecursionCoefficients {
    /// Derive the coefficients of `order` at scale `sigma` along an axis with
    /// the given `spacing`.
    ///
    /// `K` makes smoothing preserve constants, and derivatives respond to
    /// `x^k / k!` with exactly `1 / spacing^k` per physical unit, multiplied by
    /// `sigma^k` when `normalize_across_scale` is set.
    pub fn new(
        order: DerivativeOrder,
        sigma: f64,
        spacing: f64,
        normalize_across_scale: bool,
    ) -> Result<Self> {
        let poles = PoleParameters::new(order, sigma, spacing)?;
        let feedback = poles.feedback_taps();
        let den = Moments::of_feedback(&feedback);

        let k = order.as_u32() as i32;
        let mut scale = if normalize_across_scale {
            sigma.powi(k)
        } else {
            1.0
        };
        scale /= spacing.powi(k);

        let (causal, gain) = match order {
            DerivativeOrder::Zero => {
                let causal = poles.causal_taps();
                let num = Moments::of(&causal);
                (causal, 2.0 * num.sum / den.sum - causal[0])
            }
            DerivativeOrder::First => {
                let causal = poles.causal_taps();
                let num = Moments::of(&causal);
                let alpha = 2.0 * (num.sum * den.first - num.first * den.sum) / (den.sum * den.sum);
                (causal, alpha)
            }
            DerivativeOrder::Second => {
                // Add enough of the smoothing fit to cancel the DC response.
                let smoothing = PoleParameters::new(DerivativeOrder::Zero, sigma, spacing)?;
                let n_smooth = smoothing.causal_taps();
                let n_second = poles.causal_taps();
                let (smooth, second) = (Moments::of(&n_smooth), Moments::of(&n_second));
                let beta = -(2.0 * second.sum - den.sum * n_second[0])
                    / (2.0 * smooth.sum - den.sum * n_smooth[0]);

                let mut causal = [0.0; 4];
                for (c, (&a, &b)) in causal.iter_mut().zip(n_second.iter().zip(&n_smooth)) {
                    *c = a + beta * b;
                }
                let num = Moments::of(&causal);
                let alpha = (num.second * den.sum * den.sum
                    - den.second * num.sum * den.sum
                    - 2.0 * num.first * den.first * den.sum
                    + 2.0 * den.first * den.first * num.sum)
                    / (den.sum * den.sum * den.sum);
                (causal, alpha)
            }
        };

        let coefficients =
            Self::from_taps(poles, causal, feedback, order.symmetry(), scale / gain);
        debug!(
            "Recursive {:?} coefficients for sigma {} at spacing {}: K = {}",
            order, sigma, spacing, coefficients.normalization
        );
        Ok(coefficients)
    }

    /// Complete a coefficient set from its causal and feedback taps.
    ///
    /// The anticausal taps mirror the causal ones: as is for a symmetric
    /// impulse response, negated for an antisymmetric one.
    pub fn from_taps(
        poles: PoleParameters,
        causal: [f64; 4],
        feedback: [f64; 4],
        symmetry: Symmetry,
        normalization: f64,
    ) -> Self {
        let [n0, n1, n2, n3] = causal;
        let [d1, d2, d3, d4] = feedback;
        let mirrored = [n1 - d1 * n0, n2 - d2 * n0, n3 - d3 * n0, -d4 * n0];
        let anticausal = match symmetry {
            Symmetry::Symmetric => mirrored,
            Symmetry::Antisymmetric => mirrored.map(|m| -m),
        };

        let sum_n: f64 = causal.iter().sum();
        let sum_m: f64 = anticausal.iter().sum();
        let sum_d = 1.0 + d1 + d2 + d3 + d4;
        Self {
            poles,
            causal,
            feedback,
            anticausal,
            normalization,
            causal_boundary: feedback.map(|d| d * sum_n / sum_d),
            anticausal_boundary: feedback.map(|d| d * sum_m / sum_d),
        }
    }

    /// Steady-state response of both passes to a constant line of ones.
    pub fn dc_gain(&self) -> f64 {
        let sum_d = 1.0 + self.feedback.iter().sum::<f64>();
        let sum_n: f64 = self.causal.iter().sum();
        let sum_m: f64 = self.anticausal.iter().sum();
        self.normalization * (sum_n + sum_m) / sum_d
    }
}
