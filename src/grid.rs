use crate::error::positive;
use crate::{Error, Result};
use derive_more::Deref;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn};

/// An N-dimensional grid of scalar samples with a physical spacing per axis.
///
/// Dereferences to the underlying [`ArrayD`] for reading. Samples are
/// written through [`Grid::array_mut`], a view whose axes cannot be reordered
/// out from under `spacing`. The spacing travels with the grid so derivative
/// results come out in physical units.
#[derive(Debug, Clone, PartialEq, Deref)]
pub struct Grid {
    #[deref]
    data: ArrayD<f64>,
    spacing: Vec<f64>,
}

impl Grid {
    /// Wrap `data` with one spacing value per axis.
    ///
    /// # Errors
    /// [`Error::SpacingMismatch`] when the spacing does not have one entry per
    /// axis, [`Error::InvalidParameter`] when any spacing is not positive.
    pub fn new(data: ArrayD<f64>, spacing: Vec<f64>) -> Result<Self> {
        if spacing.len() != data.ndim() {
            return Err(Error::SpacingMismatch {
                ndim: data.ndim(),
                len: spacing.len(),
            });
        }
        for &s in &spacing {
            positive("spacing", s)?;
        }
        Ok(Self { data, spacing })
    }

    /// Wrap `data` with unit spacing along every axis.
    pub fn isotropic(data: ArrayD<f64>) -> Self {
        let spacing = vec![1.0; data.ndim()];
        Self { data, spacing }
    }

    /// Build a grid of the given shape by evaluating `f` at every multi-index.
    pub fn from_shape_fn<F>(shape: &[usize], spacing: Vec<f64>, f: F) -> Result<Self>
    where
        F: FnMut(IxDyn) -> f64,
    {
        Self::new(ArrayD::from_shape_fn(IxDyn(shape), f), spacing)
    }

    /// A grid of zeros with the same extent and spacing as `self`.
    pub fn zeros_like(&self) -> Self {
        Self {
            data: ArrayD::zeros(self.data.raw_dim()),
            spacing: self.spacing.clone(),
        }
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn axis_spacing(&self, axis: usize) -> Result<f64> {
        self.spacing
            .get(axis)
            .copied()
            .ok_or(Error::AxisOutOfRange {
                axis,
                ndim: self.data.ndim(),
            })
    }

    /// Number of samples along `axis`.
    pub fn axis_len(&self, axis: usize) -> Result<usize> {
        check_axis(self.data.ndim(), axis)?;
        Ok(self.data.len_of(Axis(axis)))
    }

    pub fn array(&self) -> ArrayViewD<f64> {
        self.data.view()
    }

    pub fn array_mut(&mut self) -> ArrayViewMutD<f64> {
        self.data.view_mut()
    }

    pub fn into_array(self) -> ArrayD<f64> {
        self.data
    }

    /// Replace the samples, keeping the spacing.
    pub(crate) fn with_data(&self, data: ArrayD<f64>) -> Self {
        debug_assert_eq!(data.shape(), self.data.shape());
        Self {
            data,
            spacing: self.spacing.clone(),
        }
    }
}

pub(crate) fn check_axis(ndim: usize, axis: usize) -> Result<()> {
    if axis < ndim {
        Ok(())
    } else {
        Err(Error::AxisOutOfRange { axis, ndim })
    }
}

#[cfg(feature = "image")]
mod luma {
    use super::Grid;
    use crate::{Error, Result};
    use image::{ImageBuffer, Luma};
    use ndarray::{Array2, Ix2};

    type GrayImageBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

    impl From<&GrayImageBuffer> for Grid {
        /// Rows map to axis 0 and columns to axis 1, with unit spacing.
        fn from(image: &GrayImageBuffer) -> Self {
            let (width, height) = (image.width() as usize, image.height() as usize);
            let data = Array2::from_shape_fn((height, width), |(y, x)| {
                f64::from(image.get_pixel(x as u32, y as u32)[0])
            });
            Grid::isotropic(data.into_dyn())
        }
    }

    impl Grid {
        /// Convert a 2-dimensional grid back into a float luma image.
        pub fn to_luma32f(&self) -> Result<GrayImageBuffer> {
            let view = self
                .array()
                .into_dimensionality::<Ix2>()
                .map_err(|_| Error::DimensionMismatch {
                    expected: 2,
                    ndim: self.ndim(),
                })?;
            let (height, width) = view.dim();
            Ok(ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
                Luma([view[(y as usize, x as usize)] as f32])
            }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use ndarray::IxDyn;

        #[test]
        fn luma_round_trip_keeps_orientation() {
            let image = GrayImageBuffer::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as f32]));
            let grid = Grid::from(&image);
            assert_eq!(grid.shape(), &[2, 3]);
            assert_eq!(grid.array()[IxDyn(&[1, 2])], 12.0);
            assert_eq!(grid.to_luma32f().unwrap(), image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_must_match_axes() {
        let data = ArrayD::zeros(IxDyn(&[2, 3]));
        assert_eq!(
            Grid::new(data.clone(), vec![1.0]),
            Err(Error::SpacingMismatch { ndim: 2, len: 1 })
        );
        assert!(matches!(
            Grid::new(data, vec![1.0, 0.0]),
            Err(Error::InvalidParameter { name: "spacing", .. })
        ));
    }

    #[test]
    fn reordering_a_mutable_view_keeps_axes_aligned() {
        let mut grid =
            Grid::from_shape_fn(&[2, 5], vec![0.5, 3.0], |ix| (10 * ix[0] + ix[1]) as f64).unwrap();
        {
            let mut view = grid.array_mut();
            view.swap_axes(0, 1);
            view.invert_axis(Axis(0));
            view[IxDyn(&[0, 1])] = -1.0;
        }
        assert_eq!(grid.shape(), &[2, 5]);
        assert_eq!(grid.axis_spacing(1), Ok(3.0));
        assert_eq!(grid.array()[IxDyn(&[1, 4])], -1.0);
        assert_eq!(grid.array()[IxDyn(&[0, 4])], 4.0);
    }

    #[test]
    fn axis_queries() {
        let grid = Grid::from_shape_fn(&[4, 5, 6], vec![1.0, 2.0, 0.5], |_| 0.0).unwrap();
        assert_eq!(grid.axis_len(2), Ok(6));
        assert_eq!(grid.axis_spacing(1), Ok(2.0));
        assert_eq!(
            grid.axis_len(3),
            Err(Error::AxisOutOfRange { axis: 3, ndim: 3 })
        );
    }
}
