//! Cubic spline primitives
//!
//! [SplineFitTrait] is the seam between the robust de-trending loop and the least squares
//! solver: the loop only needs a spline fitted to weighted samples with fixed interior knots.
//! [SplineFitAlgorithm] dispatches between available solvers and is what
//! [TrendFitter](crate::TrendFitter) stores and serializes.

mod cubic_spline;
pub use cubic_spline::CubicSpline;

mod lsq_spline;
pub use lsq_spline::LsqSplineFit;

use crate::error::SplineError;

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[enum_dispatch]
pub trait SplineFitTrait: Clone + Debug {
    /// Fit cubic spline with given interior `knots` to weighted samples
    ///
    /// Boundary knots are the minimum and the maximum of `x`, `knots` must be strictly increasing
    /// and lie strictly between them.
    fn fit_spline(
        &self,
        x: &[f64],
        y: &[f64],
        w: &[f64],
        knots: &[f64],
    ) -> Result<CubicSpline, SplineError>;
}

#[enum_dispatch(SplineFitTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SplineFitAlgorithm {
    Lsq(LsqSplineFit),
}

impl Default for SplineFitAlgorithm {
    fn default() -> Self {
        LsqSplineFit::new().into()
    }
}
