use crate::data::LightCurve;
use crate::discontinuity::{DiscontinuityAlgorithm, DiscontinuityTrait};
use crate::error::DetrendError;
use crate::float_trait::Float;
use crate::knots::KnotSet;
use crate::reweighting::{FitData, ReweightingParams, reweight};
use crate::spline::{CubicSpline, SplineFitAlgorithm, SplineFitTrait};

use macro_const::macro_const;
use ndarray::{Array1, Zip};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_const! {
    const DOC: &str = r"
Robust spline fit of the slow trend of a light curve

The trend is a cubic least squares spline with interior knots spaced by $\mathrm{dt}$, fitted
with iteratively re-weighted least squares. After each fit the normalized residuals
$\chi_i = (m_i - s(t_i)) / \delta_i$ update observation weights:
$$
w_i = \frac{1}{\delta_i^2} \frac{Q}{\chi_i^2 + Q},
$$
so transits, flares and other outliers barely affect the trend. Iterations stop when the median
of $\chi_i^2$ changes by less than $\mathrm{tol}$, or after $\mathrm{maxiter}$ fits. Both ends of
the light curve are anchored to unity by two synthetic observations with unit weight.

Knot placement adapts to the data. If $\mathrm{fill\_times}$ is set, every gap between
observations longer than it is covered by $\mathrm{nfill}$ evenly spaced knots, so both sides of
the gap get independent trends. After each robust fit the residuals are searched for a
discontinuity within a half of $\mathrm{dt}$; if one is found between observations $i$ and $i+1$,
$\max(\mathrm{nfill}, 4)$ knots replace all knots inside $[t_i, t_{i+1}]$ and the fit is
repeated, at most $\mathrm{maxditer}$ times.

The fitted trend is never an error by itself: if iteration limits are reached the last fit is
returned, and [TrendFit::convergence] reports what happened.
";
}

/// Significance threshold passed to the discontinuity search
pub const DISCONTINUITY_SIGNIFICANCE: f64 = 1.0;

/// Minimum number of knots inserted around a discontinuity
pub const MIN_DISCONTINUITY_KNOTS: usize = 4;

#[doc = DOC!()]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrendFitter<S = SplineFitAlgorithm, D = DiscontinuityAlgorithm> {
    q: f64,
    dt: f64,
    tol: f64,
    maxiter: usize,
    fill_times: Option<f64>,
    maxditer: usize,
    nfill: usize,
    spline_fit: S,
    discontinuity: D,
}

impl TrendFitter {
    /// Default fitter with least squares spline and robust step detector
    pub fn new() -> Self {
        Self::with_algorithms(SplineFitAlgorithm::default(), DiscontinuityAlgorithm::default())
    }

    pub const fn doc() -> &'static str {
        DOC
    }

    #[inline]
    pub fn default_q() -> f64 {
        12.0
    }

    #[inline]
    pub fn default_dt() -> f64 {
        4.0
    }

    #[inline]
    pub fn default_tol() -> f64 {
        1.25e-3
    }

    #[inline]
    pub fn default_maxiter() -> usize {
        15
    }

    #[inline]
    pub fn default_fill_times() -> Option<f64> {
        None
    }

    #[inline]
    pub fn default_maxditer() -> usize {
        4
    }

    #[inline]
    pub fn default_nfill() -> usize {
        4
    }
}

impl Default for TrendFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, D> TrendFitter<S, D> {
    /// Default parameters with custom fitting primitives
    pub fn with_algorithms(spline_fit: S, discontinuity: D) -> Self {
        Self {
            q: TrendFitter::default_q(),
            dt: TrendFitter::default_dt(),
            tol: TrendFitter::default_tol(),
            maxiter: TrendFitter::default_maxiter(),
            fill_times: TrendFitter::default_fill_times(),
            maxditer: TrendFitter::default_maxditer(),
            nfill: TrendFitter::default_nfill(),
            spline_fit,
            discontinuity,
        }
    }

    /// Severity of outlier down-weighting, smaller is more aggressive
    pub fn set_q(&mut self, q: f64) -> &mut Self {
        self.q = q;
        self
    }

    /// Initial knot spacing
    pub fn set_dt(&mut self, dt: f64) -> &mut Self {
        self.dt = dt;
        self
    }

    /// Convergence threshold for the median squared normalized residual
    pub fn set_tol(&mut self, tol: f64) -> &mut Self {
        self.tol = tol;
        self
    }

    /// Maximum number of re-weighting iterations
    pub fn set_maxiter(&mut self, maxiter: usize) -> &mut Self {
        self.maxiter = maxiter;
        self
    }

    /// Time gaps longer than this are pre-filled with knots
    pub fn set_fill_times(&mut self, fill_times: Option<f64>) -> &mut Self {
        self.fill_times = fill_times;
        self
    }

    /// Maximum number of discontinuity search rounds
    pub fn set_maxditer(&mut self, maxditer: usize) -> &mut Self {
        self.maxditer = maxditer;
        self
    }

    /// Number of knots filling a gap or a discontinuity
    pub fn set_nfill(&mut self, nfill: usize) -> &mut Self {
        self.nfill = nfill;
        self
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn tol(&self) -> f64 {
        self.tol
    }

    pub fn maxiter(&self) -> usize {
        self.maxiter
    }

    pub fn fill_times(&self) -> Option<f64> {
        self.fill_times
    }

    pub fn maxditer(&self) -> usize {
        self.maxditer
    }

    pub fn nfill(&self) -> usize {
        self.nfill
    }

    pub fn spline_fit(&self) -> &S {
        &self.spline_fit
    }

    pub fn discontinuity(&self) -> &D {
        &self.discontinuity
    }

    fn validate(&self) -> Result<(), DetrendError> {
        let invalid = |name, reason| Err(DetrendError::InvalidParameter { name, reason });
        if !(self.q > 0.0 && self.q.is_finite()) {
            return invalid("q", "must be positive and finite");
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return invalid("dt", "must be positive and finite");
        }
        if !(self.tol >= 0.0) {
            return invalid("tol", "must be non-negative");
        }
        if self.maxiter == 0 {
            return invalid("maxiter", "must be positive");
        }
        if self.maxditer == 0 {
            return invalid("maxditer", "must be positive");
        }
        if let Some(fill_times) = self.fill_times {
            if !(fill_times > 0.0) {
                return invalid("fill_times", "must be positive");
            }
        }
        Ok(())
    }

    /// Knot counts must not exceed the number of observations, such fits can't be constrained
    fn validate_for(&self, data: &FitData) -> Result<(), DetrendError> {
        let n = data.lenu();
        if (data.t_max() - data.t_min()) / self.dt > n as f64 {
            return Err(DetrendError::InvalidParameter {
                name: "dt",
                reason: "gives more knots than observations",
            });
        }
        if self.nfill > usize::max(n, MIN_DISCONTINUITY_KNOTS) {
            return Err(DetrendError::InvalidParameter {
                name: "nfill",
                reason: "must not exceed the number of observations",
            });
        }
        Ok(())
    }

    /// Initial knots for sorted time `t`: uniform knots plus knots filling long gaps
    pub fn initial_knots(&self, t: &[f64]) -> KnotSet {
        let knots = KnotSet::uniform(t[0], t[t.len() - 1], self.dt);
        match self.fill_times {
            Some(fill_times) => knots.fill_gaps(t, fill_times, self.nfill),
            None => knots,
        }
    }
}

impl<S, D> TrendFitter<S, D>
where
    S: SplineFitTrait,
    D: DiscontinuityTrait,
{
    /// Fit the trend of a light curve
    pub fn fit<T: Float>(&self, lc: &LightCurve<T>) -> Result<TrendFit, DetrendError> {
        self.validate()?;

        let data = FitData::new(lc);
        self.validate_for(&data)?;
        let params = ReweightingParams {
            q: self.q,
            tol: self.tol,
            maxiter: self.maxiter,
        };
        let t = data.t.to_vec();

        let mut knots = self.initial_knots(&t);
        let mut weights = data.inv_var.clone();
        let mut discontinuities = vec![];
        let mut iterations = 0;
        let mut rounds = 0;
        loop {
            rounds += 1;
            let outcome = reweight(&self.spline_fit, &data, &knots, weights, &params)?;
            iterations += outcome.iterations;

            let found = self
                .discontinuity
                .find_discontinuity(
                    &t,
                    &outcome.chi.to_vec(),
                    0.5 * self.dt,
                    self.q,
                    DISCONTINUITY_SIGNIFICANCE,
                )
                .filter(|&i| i + 1 < t.len());

            let convergence = match found {
                None if outcome.converged => Some(Convergence::Converged),
                None => Some(Convergence::MaxIterReached),
                Some(_) if rounds >= self.maxditer => {
                    log::warn!(
                        "Discontinuity search didn't finish in {} rounds",
                        self.maxditer
                    );
                    Some(Convergence::MaxDiscontinuityIterReached)
                }
                Some(i) => {
                    log::info!("Discontinuity found at t={}", t[i]);
                    discontinuities.push(t[i]);
                    knots = knots.replace_window(
                        t[i],
                        t[i + 1],
                        usize::max(self.nfill, MIN_DISCONTINUITY_KNOTS),
                    );
                    None
                }
            };

            match convergence {
                Some(convergence) => {
                    log::info!(
                        "Trend fitted with {} knots in {rounds} rounds and {iterations} iterations",
                        knots.len(),
                    );
                    return Ok(TrendFit {
                        spline: outcome.spline,
                        knots,
                        chi: outcome.chi,
                        weights: outcome.weights,
                        discontinuities,
                        rounds,
                        iterations,
                        convergence,
                    });
                }
                None => weights = outcome.weights,
            }
        }
    }

    /// Fit the trend and divide flux and flux error by it
    pub fn detrend<T: Float>(
        &self,
        lc: &LightCurve<T>,
    ) -> Result<(Array1<T>, Array1<T>), DetrendError> {
        Ok(self.fit(lc)?.detrend(lc))
    }
}

/// How the trend fit ended
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum Convergence {
    /// Re-weighting converged and no discontinuity was found
    Converged,
    /// The last re-weighting loop reached its iteration limit
    MaxIterReached,
    /// Discontinuity search reached its round limit
    MaxDiscontinuityIterReached,
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

/// Fitted trend returned by [TrendFitter::fit]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrendFit {
    spline: CubicSpline,
    knots: KnotSet,
    chi: Array1<f64>,
    weights: Array1<f64>,
    discontinuities: Vec<f64>,
    rounds: usize,
    iterations: usize,
    convergence: Convergence,
}

impl TrendFit {
    /// Trend value at time `t`
    pub fn eval<T: Float>(&self, t: T) -> T {
        T::from_f64_lossy(self.spline.eval(t.as_f64()))
    }

    pub fn eval_array<T: Float>(&self, t: &[T]) -> Array1<T> {
        self.spline.eval_array(t)
    }

    /// Divide flux and flux error by the trend
    pub fn detrend<T: Float>(&self, lc: &LightCurve<T>) -> (Array1<T>, Array1<T>) {
        let trend = lc.t().mapv(|t| self.eval(t));
        let flux = Zip::from(&lc.flux())
            .and(&trend)
            .map_collect(|&m, &trend| m / trend);
        let flux_err = Zip::from(&lc.flux_err())
            .and(&trend)
            .map_collect(|&err, &trend| err / trend);
        (flux, flux_err)
    }

    pub fn spline(&self) -> &CubicSpline {
        &self.spline
    }

    /// Final interior knots
    pub fn knots(&self) -> &KnotSet {
        &self.knots
    }

    /// Normalized residuals of the final fit
    pub fn chi(&self) -> &Array1<f64> {
        &self.chi
    }

    /// Observation weights after the final fit
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Times of discontinuities which got extra knots
    pub fn discontinuities(&self) -> &[f64] {
        &self.discontinuities
    }

    /// Number of discontinuity search rounds
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Total number of re-weighting iterations over all rounds
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }
}

/// Fit the trend of a light curve given by time, flux and optional flux error
pub fn fit_trend<T, S, D>(
    t: &[T],
    flux: &[T],
    flux_err: Option<&[T]>,
    fitter: &TrendFitter<S, D>,
) -> Result<TrendFit, DetrendError>
where
    T: Float,
    S: SplineFitTrait,
    D: DiscontinuityTrait,
{
    let lc = LightCurve::new(t, flux, flux_err)?;
    fitter.fit(&lc)
}

/// De-trend a light curve, returns flux and flux error divided by the fitted trend
///
/// Output is aligned with the time-sorted input.
pub fn detrend<T, S, D>(
    t: &[T],
    flux: &[T],
    flux_err: Option<&[T]>,
    fitter: &TrendFitter<S, D>,
) -> Result<(Array1<T>, Array1<T>), DetrendError>
where
    T: Float,
    S: SplineFitTrait,
    D: DiscontinuityTrait,
{
    let lc = LightCurve::new(t, flux, flux_err)?;
    fitter.detrend(&lc)
}
