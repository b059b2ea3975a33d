use thiserror::Error;

/// Errors raised by kernel synthesis and filtering.
///
/// Every variant is an invalid argument: the offending call is aborted before
/// any output sample is written, and no cached coefficients are touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The downward recurrence only handles orders of 2 and above.
    /// Use [`bessel_i0`](crate::bessel_i0) and [`bessel_i1`](crate::bessel_i1) instead.
    #[error("modified Bessel recurrence requires order >= 2, got {order}")]
    BesselOrder { order: u32 },

    #[error("axis {axis} is out of range for a {ndim}-dimensional grid")]
    AxisOutOfRange { axis: usize, ndim: usize },

    /// The four-pole recursion needs four samples of history.
    #[error("line of length {len} is too short for the recursive filter (need at least {min})")]
    LineTooShort { len: usize, min: usize },

    #[error("invalid value {value} for parameter `{name}`")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("grid has {ndim} axes but {len} spacing values were given")]
    SpacingMismatch { ndim: usize, len: usize },

    #[error("grid has {ndim} axes but {len} derivative orders were given")]
    OrderMismatch { ndim: usize, len: usize },

    #[error("output line has {len} samples but the input has {expected}")]
    LengthMismatch { expected: usize, len: usize },

    #[error("expected a {expected}-dimensional grid, got {ndim} axes")]
    DimensionMismatch { expected: usize, ndim: usize },

    #[error("derivative order {order} is not supported (expected 0, 1 or 2)")]
    UnsupportedOrder { order: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Checks that `value` is finite and strictly positive.
pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}
