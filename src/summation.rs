use std::iter::Sum;
use std::ops::AddAssign;

/// Kahan compensated summation.
///
/// Tracks the low-order bits lost by each addition and feeds them back into
/// the next one, so long runs of small terms added to a large total are not
/// silently dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new(initial: f64) -> Self {
        Self {
            sum: initial,
            compensation: 0.0,
        }
    }

    pub fn add(&mut self, value: f64) {
        let compensated = value - self.compensation;
        let total = self.sum + compensated;
        self.compensation = (total - self.sum) - compensated;
        self.sum = total;
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }
}

impl AddAssign<f64> for CompensatedSum {
    fn add_assign(&mut self, value: f64) {
        self.add(value);
    }
}

impl Sum<f64> for CompensatedSum {
    fn sum<I: Iterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::default();
        for value in iter {
            acc += value;
        }
        acc
    }
}

impl<'a> Sum<&'a f64> for CompensatedSum {
    fn sum<I: Iterator<Item = &'a f64>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
