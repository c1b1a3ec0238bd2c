use crate::error::SplineError;
use crate::float_trait::Float;
use crate::knots::KnotSet;

use itertools::Itertools;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub(crate) const DEGREE: usize = 3;
const ORDER: usize = DEGREE + 1;

/// Cubic spline in the B-spline basis
///
/// The full knot vector consists of the interior knots padded by four copies of each boundary
/// knot, so the spline has `interior + 4` coefficients. Outside of the boundary knots the spline
/// is extrapolated with its first or last polynomial piece.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
}

impl CubicSpline {
    pub fn new(interior: &KnotSet, coefficients: Vec<f64>) -> Result<Self, SplineError> {
        let knots = full_knot_vector(interior);
        let expected = knots.len() - ORDER;
        if coefficients.len() != expected {
            return Err(SplineError::WrongCoefficientCount {
                actual: coefficients.len(),
                expected,
            });
        }
        Ok(Self {
            knots,
            coefficients,
        })
    }

    /// Constant spline, B-splines are a partition of unity
    pub fn constant(interior: &KnotSet, value: f64) -> Self {
        let knots = full_knot_vector(interior);
        let coefficients = vec![value; knots.len() - ORDER];
        Self {
            knots,
            coefficients,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Interior knots
    pub fn interior_knots(&self) -> &[f64] {
        &self.knots[ORDER..self.knots.len() - ORDER]
    }

    pub fn eval(&self, x: f64) -> f64 {
        let mut basis = [0.0; ORDER];
        let first = basis_functions(&self.knots, x, &mut basis);
        basis
            .iter()
            .zip(&self.coefficients[first..first + ORDER])
            .map(|(b, c)| b * c)
            .sum()
    }

    /// Evaluate the spline at every element of `x`
    pub fn eval_array<T: Float>(&self, x: &[T]) -> Array1<T> {
        x.iter()
            .map(|&x| T::from_f64_lossy(self.eval(x.as_f64())))
            .collect()
    }
}

pub(crate) fn full_knot_vector(interior: &KnotSet) -> Vec<f64> {
    std::iter::repeat_n(interior.t_min(), ORDER)
        .chain(interior.as_slice().iter().copied())
        .chain(std::iter::repeat_n(interior.t_max(), ORDER))
        .collect_vec()
}

/// Values of the four non-vanishing cubic B-splines at `x`
///
/// Returns the index of the first non-vanishing B-spline, `values[i]` is the value of B-spline
/// `first + i`. `x` outside of the boundary knots is attributed to the outermost interval.
pub(crate) fn basis_functions(knots: &[f64], x: f64, values: &mut [f64; ORDER]) -> usize {
    let n_coeff = knots.len() - ORDER;
    let span = knots
        .partition_point(|&k| k <= x)
        .saturating_sub(1)
        .clamp(DEGREE, n_coeff - 1);

    let mut left = [0.0; ORDER];
    let mut right = [0.0; ORDER];
    values[0] = 1.0;
    for j in 1..=DEGREE {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let tmp = values[r] / (right[r + 1] + left[j - r]);
            values[r] = saved + right[r + 1] * tmp;
            saved = left[j - r] * tmp;
        }
        values[j] = saved;
    }
    span - DEGREE
}
