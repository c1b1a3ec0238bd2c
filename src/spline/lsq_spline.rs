use crate::error::SplineError;
use crate::knots::KnotSet;
use crate::spline::SplineFitTrait;
use crate::spline::cubic_spline::{CubicSpline, DEGREE, basis_functions, full_knot_vector};

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Weighted least squares cubic spline with fixed interior knots
///
/// Minimizes $\sum_i w_i (y_i - s(x_i))^2$ over cubic splines $s$ with the given interior knots
/// and boundary knots at the minimum and maximum of $x$. Normal equations are solved with the
/// Cholesky decomposition, which fails for singular problems, e.g. when some knot intervals have
/// no data to constrain the spline.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "LsqSpline")]
pub struct LsqSplineFit {}

impl LsqSplineFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl SplineFitTrait for LsqSplineFit {
    fn fit_spline(
        &self,
        x: &[f64],
        y: &[f64],
        w: &[f64],
        knots: &[f64],
    ) -> Result<CubicSpline, SplineError> {
        if x.len() != y.len() || x.len() != w.len() {
            return Err(SplineError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                w: w.len(),
            });
        }

        let n_coeff = knots.len() + DEGREE + 1;
        let distinct = x
            .iter()
            .zip(w)
            .filter(|&(_, &w)| w > 0.0)
            .map(|(&x, _)| x)
            .sorted_by(f64::total_cmp)
            .dedup()
            .count();
        let minimum = usize::max(DEGREE + 1, n_coeff);
        if distinct < minimum {
            return Err(SplineError::TooFewSamples {
                actual: distinct,
                minimum,
            });
        }

        let (t_min, t_max) = x
            .iter()
            .copied()
            .minmax_by(f64::total_cmp)
            .into_option()
            .ok_or(SplineError::TooFewSamples {
                actual: 0,
                minimum,
            })?;
        let interior = KnotSet::new(t_min, t_max, knots.to_vec())?;
        let full = full_knot_vector(&interior);

        let mut normal = DMatrix::<f64>::zeros(n_coeff, n_coeff);
        let mut rhs = DVector::<f64>::zeros(n_coeff);
        let mut basis = [0.0; DEGREE + 1];
        for ((&x, &y), &w) in x.iter().zip(y).zip(w) {
            if w <= 0.0 {
                continue;
            }
            let first = basis_functions(&full, x, &mut basis);
            for (i, &bi) in basis.iter().enumerate() {
                rhs[first + i] += w * bi * y;
                for (j, &bj) in basis.iter().enumerate() {
                    normal[(first + i, first + j)] += w * bi * bj;
                }
            }
        }

        let coefficients = normal
            .cholesky()
            .ok_or(SplineError::Singular)?
            .solve(&rhs);
        if !coefficients.iter().all(|c| c.is_finite()) {
            return Err(SplineError::Singular);
        }
        CubicSpline::new(&interior, coefficients.iter().copied().collect())
    }
}
