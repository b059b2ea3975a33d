//! Finite Gaussian and Gaussian-derivative kernels built from the discrete
//! analogue of the Gaussian, `exp(-t) I_n(t)`.

use crate::bessel::{bessel_i0_scaled, bessel_i1_scaled, bessel_i_scaled};
use crate::cache::CoefficientCache;
use crate::error::positive;
use crate::summation::CompensatedSum;
use crate::{DerivativeOrder, Error, Result};
use derive_more::{Deref, Display};
use log::*;

/// Parameters of a discrete Gaussian (derivative) kernel along one axis.
///
/// The variance is given in physical units and converted to pixel units with
/// `spacing`. The kernel grows until its taps account for `1 - maximum_error`
/// of the total mass or until it would exceed `maximum_kernel_width` taps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianKernel {
    /// Variance of the Gaussian in physical units squared.
    pub variance: f64,

    /// Physical distance between adjacent samples.
    pub spacing: f64,

    pub order: DerivativeOrder,

    /// Multiply derivatives by `variance^(order / 2)` so responses are
    /// comparable across scales.
    pub normalize_across_scale: bool,

    /// Mass the truncated kernel is allowed to miss, in `(0, 1)`.
    pub maximum_error: f64,

    /// Upper bound on the number of taps of the full kernel.
    pub maximum_kernel_width: usize,
}

impl Default for GaussianKernel {
    fn default() -> Self {
        Self {
            variance: 1.0,
            spacing: 1.0,
            order: DerivativeOrder::Zero,
            normalize_across_scale: true,
            maximum_error: 0.005,
            maximum_kernel_width: 30,
        }
    }
}

/// A non-fatal shortfall of kernel synthesis.
///
/// The kernel that carries it is complete and usable; it is only less
/// accurate or shorter than requested.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum KernelWarning {
    /// New taps no longer change the accumulated mass.
    #[display(
        fmt = "kernel failed to accumulate to approximately one with remainder {} and current coefficient {}",
        remainder,
        coefficient
    )]
    Stalled { remainder: f64, coefficient: f64 },

    #[display(
        fmt = "kernel reached the maximum width of {} and was truncated to {} taps",
        maximum_width,
        width
    )]
    Truncated { maximum_width: usize, width: usize },
}

/// Taps of an odd-length kernel, centred on the middle tap.
#[derive(Debug, Clone, PartialEq, Deref)]
pub struct KernelCoefficients {
    #[deref]
    taps: Vec<f64>,
    warning: Option<KernelWarning>,
}

impl KernelCoefficients {
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    pub fn into_taps(self) -> Vec<f64> {
        self.taps
    }

    /// Number of taps on either side of the centre.
    pub fn radius(&self) -> usize {
        self.taps.len() / 2
    }

    pub fn center(&self) -> f64 {
        self.taps[self.radius()]
    }

    /// Precision shortfall hit while building the kernel, if any.
    pub fn warning(&self) -> Option<KernelWarning> {
        self.warning
    }
}

/// Kernels memoized by their full parameter set.
pub type KernelCache = CoefficientCache<GaussianKernel, KernelCoefficients>;

impl GaussianKernel {
    pub fn new(variance: f64) -> Self {
        Self {
            variance,
            ..Default::default()
        }
    }

    /// A kernel with variance `sigma^2`.
    pub fn from_sigma(sigma: f64) -> Self {
        Self::new(sigma * sigma)
    }

    pub fn with_spacing(self, spacing: f64) -> Self {
        Self { spacing, ..self }
    }

    pub fn with_order(self, order: DerivativeOrder) -> Self {
        Self { order, ..self }
    }

    pub fn with_normalize_across_scale(self, normalize_across_scale: bool) -> Self {
        Self {
            normalize_across_scale,
            ..self
        }
    }

    pub fn with_maximum_error(self, maximum_error: f64) -> Self {
        Self {
            maximum_error,
            ..self
        }
    }

    pub fn with_maximum_kernel_width(self, maximum_kernel_width: usize) -> Self {
        Self {
            maximum_kernel_width,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        positive("variance", self.variance)?;
        positive("spacing", self.spacing)?;
        if !(self.maximum_error > 0.0 && self.maximum_error < 1.0) {
            return Err(Error::InvalidParameter {
                name: "maximum_error",
                value: self.maximum_error,
            });
        }
        if self.maximum_kernel_width < 3 {
            return Err(Error::InvalidParameter {
                name: "maximum_kernel_width",
                value: self.maximum_kernel_width as f64,
            });
        }
        Ok(())
    }

    /// Build the normalised, symmetric zero-order kernel.
    ///
    /// The order field is ignored.
    pub fn generate_gaussian_coefficients(&self) -> Result<KernelCoefficients> {
        self.validate()?;
        let pixel_variance = self.variance / (self.spacing * self.spacing);
        let cap = 1.0 - self.maximum_error;
        // Half kernel, centre tap first.
        let max_half = (self.maximum_kernel_width + 1) / 2;
        trace!(
            "Synthesizing Gaussian kernel with pixel variance {}.",
            pixel_variance
        );

        // Taps are exp(-t) I_n(t), evaluated pre-scaled so large t cannot overflow.
        let mut half = vec![
            bessel_i0_scaled(pixel_variance),
            bessel_i1_scaled(pixel_variance),
        ];
        let mut sum = CompensatedSum::new(half[0]);
        sum += 2.0 * half[1];
        let mut warning = None;

        let mut n = 2;
        while sum.sum() < cap {
            if half.len() >= max_half {
                warning = Some(KernelWarning::Truncated {
                    maximum_width: self.maximum_kernel_width,
                    width: 2 * half.len() - 1,
                });
                break;
            }
            let tap = bessel_i_scaled(n, pixel_variance)?;
            half.push(tap);
            sum += 2.0 * tap;
            if tap < sum.sum() * f64::EPSILON {
                warning = Some(KernelWarning::Stalled {
                    remainder: cap - sum.sum(),
                    coefficient: tap,
                });
                break;
            }
            n += 1;
        }
        if let Some(warning) = warning {
            warn!("{}", warning);
        }

        // Re-accumulate from the smallest taps to the largest.
        let total = 2.0 * half[1..].iter().rev().sum::<f64>() + half[0];
        if !(total.is_finite() && total > 0.0) {
            return Err(Error::InvalidParameter {
                name: "variance",
                value: self.variance,
            });
        }
        for tap in half.iter_mut() {
            *tap /= total;
        }

        let mut taps: Vec<f64> = half[1..].iter().rev().copied().collect();
        taps.extend_from_slice(&half);
        debug!(
            "Gaussian kernel of variance {} at spacing {} has {} taps.",
            self.variance,
            self.spacing,
            taps.len()
        );
        Ok(KernelCoefficients { taps, warning })
    }

    /// Build the kernel of the configured derivative order.
    ///
    /// Derivatives are obtained by convolving the zero-order kernel with a
    /// finite-difference operator, the Gaussian being extended by clamping
    /// its edge taps. The result has the same length as the zero-order kernel.
    pub fn generate_coefficients(&self) -> Result<KernelCoefficients> {
        let gaussian = self.generate_gaussian_coefficients()?;
        if self.order == DerivativeOrder::Zero {
            return Ok(gaussian);
        }
        let order = self.order.as_u32();

        let mut norm = if self.normalize_across_scale {
            self.variance.powf(f64::from(order) / 2.0)
        } else {
            1.0
        };
        norm /= self.spacing.powi(order as i32);

        let operator = derivative_operator(order);
        let radius = (operator.len() - 1) / 2;

        // Padding by 2N-1 on both sides lets every output, including the
        // N-1 extra ones on each side, see a full operator window.
        let pad = 2 * radius - 1;
        let len = gaussian.taps.len();
        let mut padded = vec![0.0; len + 2 * pad];
        padded[..pad].fill(gaussian.taps[0]);
        padded[pad..pad + len].copy_from_slice(&gaussian.taps);
        padded[pad + len..].fill(gaussian.taps[len - 1]);

        let taps = (radius..padded.len() - radius)
            .map(|i| {
                let conv: CompensatedSum = operator
                    .iter()
                    .rev()
                    .enumerate()
                    .map(|(j, &op)| padded[i + j - radius] * op)
                    .sum();
                norm * conv.sum()
            })
            .collect();

        Ok(KernelCoefficients {
            taps,
            warning: gaussian.warning,
        })
    }
}

/// Finite-difference operator of the given derivative order.
///
/// Built from `order / 2` applications of the second difference `[1, -2, 1]`
/// and `order % 2` applications of the central difference `[1/2, 0, -1/2]`,
/// in the coefficient order expected by [`GaussianKernel::generate_coefficients`].
pub fn derivative_operator(order: u32) -> Vec<f64> {
    let width = 2 * ((order as usize + 1) / 2) + 1;
    let mut coeff = vec![0.0; width];
    coeff[width / 2] = 1.0;

    for _ in 0..order / 2 {
        let mut previous = coeff[1] - 2.0 * coeff[0];
        for j in 1..width - 1 {
            let next = coeff[j - 1] + coeff[j + 1] - 2.0 * coeff[j];
            coeff[j - 1] = previous;
            previous = next;
        }
        let next = coeff[width - 2] - 2.0 * coeff[width - 1];
        coeff[width - 2] = previous;
        coeff[width - 1] = next;
    }

    for _ in 0..order % 2 {
        let mut previous = 0.5 * coeff[1];
        for j in 1..width - 1 {
            let next = -0.5 * coeff[j - 1] + 0.5 * coeff[j + 1];
            coeff[j - 1] = previous;
            previous = next;
        }
        let next = -0.5 * coeff[width - 2];
        coeff[width - 2] = previous;
        coeff[width - 1] = next;
    }

    coeff
}
