//! Scale-space operators built on the recursive Gaussian.
//!
//! Every operator is a separable composition: one recursive pass per axis,
//! each axis consuming the output of the previous one. Coefficients for all
//! passes are derived before any sample is touched, so the input grid is never
//! modified and a failing call produces nothing.

use crate::cache::CoefficientCache;
use crate::grid::check_axis;
use crate::recursive_filter::{apply_recursive_filter, MIN_LINE_LENGTH};
use crate::{DerivativeOrder, Error, Grid, RecursionCoefficients, RecursiveGaussian, Result};
use log::*;
use ndarray::{azip, ArrayD};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::sync::Arc;

/// One pass per axis, in axis order.
type Plan = Vec<Arc<RecursionCoefficients>>;

/// Gaussian smoothing and derivatives at a fixed scale.
#[derive(Debug, Clone)]
pub struct ScaleSpace {
    sigma: f64,
    normalize_across_scale: bool,
    cache: CoefficientCache<(DerivativeOrder, f64), RecursionCoefficients>,
}

impl ScaleSpace {
    /// Operators at scale `sigma`, in physical units.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            normalize_across_scale: false,
            cache: CoefficientCache::new(),
        }
    }

    /// Multiply each derivative by `sigma` per order of differentiation.
    pub fn with_normalize_across_scale(mut self, normalize_across_scale: bool) -> Self {
        self.set_normalize_across_scale(normalize_across_scale);
        self
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn set_sigma(&mut self, sigma: f64) {
        if sigma != self.sigma {
            self.sigma = sigma;
            self.cache.clear();
        }
    }

    pub fn normalize_across_scale(&self) -> bool {
        self.normalize_across_scale
    }

    pub fn set_normalize_across_scale(&mut self, normalize_across_scale: bool) {
        if normalize_across_scale != self.normalize_across_scale {
            self.normalize_across_scale = normalize_across_scale;
            self.cache.clear();
        }
    }

    /// Smooth along every axis.
    pub fn smooth(&mut self, grid: &Grid) -> Result<Grid> {
        let orders = vec![DerivativeOrder::Zero; grid.ndim()];
        self.derivative(grid, &orders)
    }

    /// Differentiate `orders[axis]` times along each axis, smoothing the rest.
    pub fn derivative(&mut self, grid: &Grid, orders: &[DerivativeOrder]) -> Result<Grid> {
        let plan = self.plan(grid, orders)?;
        run(&plan, grid)
    }

    /// First derivative along each axis, one grid per axis.
    pub fn gradient(&mut self, grid: &Grid) -> Result<Vec<Grid>> {
        let plans = (0..grid.ndim())
            .map(|axis| self.plan(grid, &single(grid.ndim(), axis, DerivativeOrder::First)))
            .collect::<Result<Vec<_>>>()?;
        run_all(&plans, grid)
    }

    pub fn gradient_magnitude(&mut self, grid: &Grid) -> Result<Grid> {
        let gradient = self.gradient(grid)?;
        let mut magnitude = ArrayD::zeros(grid.raw_dim());
        for component in &gradient {
            azip!((m in &mut magnitude, &g in component.array()) *m += g * g);
        }
        magnitude.mapv_inplace(f64::sqrt);
        Ok(grid.with_data(magnitude))
    }

    /// Second derivative with respect to axes `a` and `b`.
    pub fn hessian_component(&mut self, grid: &Grid, a: usize, b: usize) -> Result<Grid> {
        check_axis(grid.ndim(), a)?;
        check_axis(grid.ndim(), b)?;
        let mut orders = vec![DerivativeOrder::Zero; grid.ndim()];
        if a == b {
            orders[a] = DerivativeOrder::Second;
        } else {
            orders[a] = DerivativeOrder::First;
            orders[b] = DerivativeOrder::First;
        }
        self.derivative(grid, &orders)
    }

    /// Sum of the pure second derivatives along every axis.
    pub fn laplacian(&mut self, grid: &Grid) -> Result<Grid> {
        let plans = (0..grid.ndim())
            .map(|axis| self.plan(grid, &single(grid.ndim(), axis, DerivativeOrder::Second)))
            .collect::<Result<Vec<_>>>()?;
        let terms = run_all(&plans, grid)?;
        let mut sum = ArrayD::zeros(grid.raw_dim());
        for term in &terms {
            sum += &term.array();
        }
        Ok(grid.with_data(sum))
    }

    /// Validate the grid and fetch the coefficients of every pass.
    fn plan(&mut self, grid: &Grid, orders: &[DerivativeOrder]) -> Result<Plan> {
        if orders.len() != grid.ndim() {
            return Err(Error::OrderMismatch {
                ndim: grid.ndim(),
                len: orders.len(),
            });
        }
        let (sigma, normalize) = (self.sigma, self.normalize_across_scale);
        orders
            .iter()
            .zip(grid.spacing())
            .zip(grid.shape())
            .map(|((&order, &spacing), &len)| {
                if len < MIN_LINE_LENGTH {
                    return Err(Error::LineTooShort {
                        len,
                        min: MIN_LINE_LENGTH,
                    });
                }
                self.cache
                    .get_or_try_insert_with((order, spacing), |&(order, spacing)| {
                        RecursiveGaussian {
                            sigma,
                            order,
                            normalize_across_scale: normalize,
                        }
                        .coefficients(spacing)
                    })
            })
            .collect()
    }
}

/// Orders that differentiate along `axis` only.
fn single(ndim: usize, axis: usize, order: DerivativeOrder) -> Vec<DerivativeOrder> {
    let mut orders = vec![DerivativeOrder::Zero; ndim];
    orders[axis] = order;
    orders
}

fn run(plan: &Plan, grid: &Grid) -> Result<Grid> {
    let mut output = grid.clone();
    for (axis, coefficients) in plan.iter().enumerate() {
        trace!("Recursive pass along axis {}.", axis);
        apply_recursive_filter(&mut output.array_mut(), axis, coefficients)?;
    }
    Ok(output)
}

/// Independent operators on the same input run concurrently.
fn run_all(plans: &[Plan], grid: &Grid) -> Result<Vec<Grid>> {
    #[cfg(feature = "rayon")]
    let outputs = plans.par_iter().map(|plan| run(plan, grid)).collect();
    #[cfg(not(feature = "rayon"))]
    let outputs = plans.iter().map(|plan| run(plan, grid)).collect();
    outputs
}
