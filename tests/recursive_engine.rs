use approx::assert_abs_diff_eq;
use cv_gaussian::{
    apply_recursive_filter, filter_line, DerivativeOrder, DiscreteGaussian, Error,
    GaussianKernel, Grid, RecursiveGaussian, RecursiveGaussianFilter, ScaleSpace,
};
use ndarray::{ArrayD, IxDyn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn random_grid(shape: &[usize], spacing: Vec<f64>, seed: u64) -> Grid {
    let mut rng = Pcg64::seed_from_u64(seed);
    Grid::from_shape_fn(shape, spacing, |_| rng.gen_range(-1.0..1.0)).unwrap()
}

#[test]
fn constant_line_keeps_its_value() {
    let _ = pretty_env_logger::try_init();
    for &sigma in &[0.3, 1.0, 4.0, 25.0] {
        let c = RecursiveGaussian::new(sigma, DerivativeOrder::Zero)
            .coefficients(1.0)
            .unwrap();
        for len in [4, 6, 64] {
            let data = vec![7.0; len];
            let mut out = vec![0.0; len];
            filter_line(&c, &data, &mut out).unwrap();
            for v in out {
                assert_abs_diff_eq!(v, 7.0, epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn axis_passes_commute() {
    let grid = random_grid(&[23, 31], vec![1.0, 1.0], 7);
    let c = RecursiveGaussian::new(2.0, DerivativeOrder::Zero)
        .coefficients(1.0)
        .unwrap();

    let mut rows_first = grid.clone();
    apply_recursive_filter(&mut rows_first.array_mut(), 0, &c).unwrap();
    apply_recursive_filter(&mut rows_first.array_mut(), 1, &c).unwrap();

    let mut columns_first = grid.clone();
    apply_recursive_filter(&mut columns_first.array_mut(), 1, &c).unwrap();
    apply_recursive_filter(&mut columns_first.array_mut(), 0, &c).unwrap();

    for (a, b) in rows_first.iter().zip(columns_first.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn recursive_approximates_discrete_kernel() {
    let mut impulse = ArrayD::zeros(IxDyn(&[121]));
    impulse[IxDyn(&[60])] = 1.0;
    let grid = Grid::isotropic(impulse);

    let recursive = ScaleSpace::new(3.0).smooth(&grid).unwrap();
    let discrete = DiscreteGaussian::new(
        GaussianKernel::from_sigma(3.0)
            .with_maximum_error(1e-4)
            .with_maximum_kernel_width(101),
    )
    .filter(&grid)
    .unwrap();

    for (r, d) in recursive.iter().zip(discrete.iter()) {
        assert_abs_diff_eq!(r, d, epsilon = 5e-3);
    }
}

#[test]
fn anisotropic_spacing_is_respected() {
    // Same samples, one axis twice as finely sampled: physical sigma 2 covers
    // twice as many samples along it.
    let grid = random_grid(&[40, 40], vec![0.5, 1.0], 11);
    let mut filter = RecursiveGaussianFilter::new(RecursiveGaussian::new(2.0, DerivativeOrder::Zero));

    let mut fine = grid.clone();
    filter.apply(&mut fine, 0).unwrap();

    let c = RecursiveGaussian::new(4.0, DerivativeOrder::Zero)
        .coefficients(1.0)
        .unwrap();
    let mut pixels = grid.clone();
    apply_recursive_filter(&mut pixels.array_mut(), 0, &c).unwrap();

    for (a, b) in fine.iter().zip(pixels.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn failed_application_leaves_grid_untouched() {
    let mut grid = random_grid(&[6, 3], vec![1.0, 1.0], 3);
    let original = grid.clone();
    let mut filter = RecursiveGaussianFilter::new(RecursiveGaussian::default());
    assert_eq!(
        filter.apply(&mut grid, 1),
        Err(Error::LineTooShort { len: 3, min: 4 })
    );
    assert_eq!(
        filter.apply(&mut grid, 5),
        Err(Error::AxisOutOfRange { axis: 5, ndim: 2 })
    );
    assert_eq!(grid, original);
}
