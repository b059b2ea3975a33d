//! Gaussian and Gaussian-derivative filtering of N-dimensional grids.
//!
//! Two complementary engines are provided, both applied as separable passes
//! along one axis at a time:
//!
//! * [`GaussianKernel`] synthesizes a finite kernel from the discrete analogue
//!   of the Gaussian, `exp(-t) I_n(t)`, truncated under an error and width
//!   budget. [`convolve_axis`] and [`DiscreteGaussian`] apply it with clamped
//!   edges.
//! * [`RecursionCoefficients`] describe a four-pole recursive approximation
//!   whose cost per sample does not depend on sigma. [`apply_recursive_filter`]
//!   runs it along an axis and [`ScaleSpace`] composes it into smoothing,
//!   gradients, Hessian components and the Laplacian.
//!
//! Lines along an axis are independent and are processed in parallel when the
//! `rayon` feature is enabled. Axis passes run strictly in sequence.
//!
//! # Example
//! ```
//! use cv_gaussian::{Grid, ScaleSpace};
//! use ndarray::{ArrayD, IxDyn};
//!
//! let volume = Grid::isotropic(ArrayD::from_elem(IxDyn(&[16, 16, 16]), 7.0));
//! let smoothed = ScaleSpace::new(2.0).smooth(&volume).unwrap();
//! assert!(smoothed.iter().all(|&v| (v - 7.0).abs() < 1e-6));
//! ```

mod bessel;
mod cache;
mod convolution;
mod error;
mod grid;
mod kernel;
mod order;
mod recursive_coefficients;
mod recursive_filter;
mod scale_space;
mod summation;

pub use bessel::{bessel_i, bessel_i0, bessel_i1};
pub use cache::CoefficientCache;
pub use convolution::{convolve_axis, DiscreteGaussian};
pub use error::{Error, Result};
pub use grid::Grid;
pub use kernel::{
    derivative_operator, GaussianKernel, KernelCache, KernelCoefficients, KernelWarning,
};
pub use order::{DerivativeOrder, Symmetry};
pub use recursive_coefficients::{PoleParameters, RecursionCoefficients};
pub use recursive_filter::{
    apply_recursive_filter, filter_line, RecursiveGaussian, RecursiveGaussianFilter,
    MIN_LINE_LENGTH,
};
pub use scale_space::ScaleSpace;
pub use summation::CompensatedSum;
