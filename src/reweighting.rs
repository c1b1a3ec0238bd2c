//! Iteratively re-weighted least squares spline fit with fixed knots

use crate::data::{LightCurve, SortedArray};
use crate::error::SplineError;
use crate::float_trait::Float;
use crate::knots::KnotSet;
use crate::spline::{CubicSpline, SplineFitTrait};

use ndarray::{Array1, Zip};

/// Value and weight of the synthetic anchor points added at both ends of the light curve
const ANCHOR_VALUE: f64 = 1.0;
const ANCHOR_WEIGHT: f64 = 1.0;

/// Light curve converted to `f64` for fitting
#[derive(Clone, Debug)]
pub struct FitData {
    pub t: Array1<f64>,
    pub y: Array1<f64>,
    pub yerr: Array1<f64>,
    pub inv_var: Array1<f64>,
}

impl FitData {
    pub fn new<T: Float>(lc: &LightCurve<T>) -> Self {
        let t = lc.t().mapv(T::as_f64);
        let y = lc.flux().mapv(T::as_f64);
        let yerr = lc.flux_err().mapv(T::as_f64);
        let inv_var = yerr.mapv(|e| (e * e).recip());
        Self {
            t,
            y,
            yerr,
            inv_var,
        }
    }

    pub fn lenu(&self) -> usize {
        self.t.len()
    }

    pub fn t_min(&self) -> f64 {
        self.t[0]
    }

    pub fn t_max(&self) -> f64 {
        self.t[self.lenu() - 1]
    }

    /// Regression input with anchors at the first and the last time
    fn with_anchors(&self, weights: &Array1<f64>) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let n = self.lenu() + 2;
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        let mut w = Vec::with_capacity(n);

        x.push(self.t_min());
        y.push(ANCHOR_VALUE);
        w.push(ANCHOR_WEIGHT);

        x.extend(self.t.iter());
        y.extend(self.y.iter());
        w.extend(weights.iter());

        x.push(self.t_max());
        y.push(ANCHOR_VALUE);
        w.push(ANCHOR_WEIGHT);

        (x, y, w)
    }
}

/// Settings of the inner re-weighting loop
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReweightingParams {
    pub q: f64,
    pub tol: f64,
    pub maxiter: usize,
}

/// Result of [reweight]
#[derive(Clone, Debug)]
pub struct ReweightingOutcome {
    pub spline: CubicSpline,
    /// Normalized residuals of `spline`
    pub chi: Array1<f64>,
    /// Weights to continue with, they are not updated after convergence
    pub weights: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Robust weight of an observation
///
/// Equals `inv_var` for zero residual and decreases with `chi2`, `q` sets the scale
#[inline]
pub fn robust_weight(inv_var: f64, chi2: f64, q: f64) -> f64 {
    inv_var * q / (chi2 + q)
}

/// Iteratively fit spline with fixed knots, re-weighting observations after each fit
///
/// Stops when the median of squared normalized residuals changes by less than `tol` between
/// iterations, or after `maxiter` fits. Weights are taken by value and returned in the outcome.
pub fn reweight<S>(
    spline_fit: &S,
    data: &FitData,
    knots: &KnotSet,
    mut weights: Array1<f64>,
    params: &ReweightingParams,
) -> Result<ReweightingOutcome, SplineError>
where
    S: SplineFitTrait,
{
    assert!(params.maxiter > 0, "maxiter must be positive");
    assert_eq!(
        weights.len(),
        data.lenu(),
        "weights and data should have the same size"
    );

    let mut previous: Option<f64> = None;
    let mut iterations = 0;
    loop {
        iterations += 1;

        let (x, y, w) = data.with_anchors(&weights);
        let spline = spline_fit.fit_spline(&x, &y, &w, knots.as_slice())?;

        let chi = Zip::from(&data.t)
            .and(&data.y)
            .and(&data.yerr)
            .map_collect(|&t, &y, &yerr| (y - spline.eval(t)) / yerr);
        let chi2 = chi.mapv(|x| x * x);

        let statistic = SortedArray::from(chi2.to_vec())
            .median()
            .ok_or(SplineError::TooFewSamples {
                actual: 0,
                minimum: 1,
            })?;
        log::debug!("Re-weighting iteration {iterations}: median chi^2 = {statistic}");

        let converged = previous.is_some_and(|s0| (s0 - statistic).abs() < params.tol);
        if converged {
            log::info!("Converged after {iterations} re-weighting iterations");
        } else {
            Zip::from(&mut weights)
                .and(&data.inv_var)
                .and(&chi2)
                .for_each(|w, &inv_var, &chi2| *w = robust_weight(inv_var, chi2, params.q));
        }

        if converged || iterations >= params.maxiter {
            if !converged {
                log::warn!("Re-weighting didn't converge in {iterations} iterations");
            }
            return Ok(ReweightingOutcome {
                spline,
                chi,
                weights,
                iterations,
                converged,
            });
        }
        previous = Some(statistic);
    }
}
