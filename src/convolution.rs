//! Application of finite kernels along the axes of a grid.

use crate::grid::check_axis;
use crate::kernel::{GaussianKernel, KernelCache, KernelCoefficients};
use crate::{DerivativeOrder, Error, Grid, Result};
use log::*;
use ndarray::{ArrayViewMut1, ArrayViewMutD, Axis, Zip};
use std::sync::Arc;
use wide::f64x4;

/// Convolve every line of `grid` along `axis` with `kernel`, in place.
///
/// Samples beyond either end of a line take the value of the nearest edge
/// sample. The kernel is applied as a convolution rather than a correlation,
/// so a first-derivative kernel yields a positive response on a rising ramp.
/// Lines are independent and are processed in parallel with the `rayon`
/// feature.
pub fn convolve_axis(
    grid: &mut ArrayViewMutD<f64>,
    axis: usize,
    kernel: &KernelCoefficients,
) -> Result<()> {
    check_axis(grid.ndim(), axis)?;
    if grid.is_empty() {
        return Ok(());
    }

    // Validate kernel size.
    let kernel_size = kernel.len();
    debug_assert!(kernel_size % 2 == 1);
    let kernel_half_size = kernel_size / 2;
    // Reverse for convolution, then pack into SIMD lanes padded with 0.
    let reversed: Vec<f64> = kernel.iter().rev().copied().collect();
    let kernel_simd = reversed
        .chunks(4)
        .map(|chunk| {
            let mut data = [0.0; 4];
            data[..chunk.len()].copy_from_slice(chunk);
            f64x4::new(data)
        })
        .collect::<Vec<_>>();
    let kernel_simd_size = 4 * ((kernel_size + 3) / 4);
    let kernel_simd_extra_elements = kernel_simd_size - kernel_size;

    let filter_line = |mut line: ArrayViewMut1<f64>| {
        let width = line.len();
        let mut scratch = vec![0f64; width + kernel_half_size * 2 + kernel_simd_extra_elements];
        // Prefill extended buffer with center and edge values.
        scratch[..kernel_half_size].fill(line[0]);
        for (s, &v) in scratch[kernel_half_size..kernel_half_size + width]
            .iter_mut()
            .zip(line.iter())
        {
            *s = v;
        }
        scratch[kernel_half_size + width..2 * kernel_half_size + width].fill(line[width - 1]);
        // Apply kernel.
        for (window, output) in scratch.windows(kernel_simd_size).zip(line.iter_mut()) {
            *output = window
                .chunks_exact(4)
                .map(|chunk| f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .zip(kernel_simd.iter())
                .fold(f64x4::splat(0.), |acc, (a, b)| a.mul_add(*b, acc))
                .reduce_add();
        }
    };

    let lines = Zip::from(grid.lanes_mut(Axis(axis)));
    #[cfg(feature = "rayon")]
    lines.par_for_each(filter_line);
    #[cfg(not(feature = "rayon"))]
    lines.for_each(filter_line);
    Ok(())
}

/// Separable Gaussian (derivative) filtering with finite kernels.
///
/// One kernel is synthesized per axis from the template, using that axis's
/// spacing and derivative order. Kernels are cached until the template
/// changes.
#[derive(Debug, Clone)]
pub struct DiscreteGaussian {
    kernel: GaussianKernel,
    cache: KernelCache,
}

impl DiscreteGaussian {
    /// The `spacing` and `order` of the template are replaced per axis.
    pub fn new(kernel: GaussianKernel) -> Self {
        Self {
            kernel,
            cache: KernelCache::new(),
        }
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    pub fn set_kernel(&mut self, kernel: GaussianKernel) {
        if kernel != self.kernel {
            self.kernel = kernel;
            self.cache.clear();
        }
    }

    /// The kernel used along an axis with the given spacing and order.
    pub fn kernel_for(
        &mut self,
        spacing: f64,
        order: DerivativeOrder,
    ) -> Result<Arc<KernelCoefficients>> {
        let params = self.kernel.with_spacing(spacing).with_order(order);
        self.cache
            .get_or_try_insert_with(params, GaussianKernel::generate_coefficients)
    }

    /// Smooth along every axis.
    pub fn filter(&mut self, grid: &Grid) -> Result<Grid> {
        let orders = vec![DerivativeOrder::Zero; grid.ndim()];
        self.derivative(grid, &orders)
    }

    /// Apply the kernel of `orders[axis]` along each axis in turn.
    pub fn derivative(&mut self, grid: &Grid, orders: &[DerivativeOrder]) -> Result<Grid> {
        if orders.len() != grid.ndim() {
            return Err(Error::OrderMismatch {
                ndim: grid.ndim(),
                len: orders.len(),
            });
        }
        let kernels = orders
            .iter()
            .zip(grid.spacing())
            .map(|(&order, &spacing)| self.kernel_for(spacing, order))
            .collect::<Result<Vec<_>>>()?;

        let mut output = grid.clone();
        for (axis, kernel) in kernels.iter().enumerate() {
            trace!(
                "Convolving axis {} with a {}-tap kernel.",
                axis,
                kernel.len()
            );
            convolve_axis(&mut output.array_mut(), axis, kernel)?;
        }
        Ok(output)
    }
}
