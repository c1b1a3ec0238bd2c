use crate::error::LightCurveError;
use crate::float_trait::Float;

use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use std::cmp::Ordering;

/// Light curve to be de-trended
///
/// Owns time, flux and flux error arrays. Observations are sorted by time on construction, all
/// values are finite, and flux errors are positive. The light curve has at least two
/// observations and spans a non-zero time range.
#[derive(Clone, Debug, PartialEq)]
pub struct LightCurve<T>
where
    T: Float,
{
    t: Array1<T>,
    flux: Array1<T>,
    flux_err: Array1<T>,
}

impl<T> LightCurve<T>
where
    T: Float,
{
    pub const MIN_LENGTH: usize = 2;

    /// Construct `LightCurve` from time, flux and optional flux error
    ///
    /// Unity errors are used when `flux_err` is `None`. Input may be unsorted, observations are
    /// re-ordered by time keeping flux and error aligned, the order of simultaneous observations
    /// is preserved.
    pub fn new(t: &[T], flux: &[T], flux_err: Option<&[T]>) -> Result<Self, LightCurveError> {
        let flux_err = match flux_err {
            Some(flux_err) => flux_err.to_vec(),
            None => vec![T::one(); t.len()],
        };
        Self::validate(t, flux, &flux_err)?;

        if t.is_sorted() {
            return Ok(Self {
                t: Array1::from_vec(t.to_vec()),
                flux: Array1::from_vec(flux.to_vec()),
                flux_err: Array1::from_vec(flux_err),
            });
        }

        // Values are finite at this point, so partial_cmp never fails
        let order = (0..t.len())
            .sorted_by(|&a, &b| t[a].partial_cmp(&t[b]).unwrap_or(Ordering::Equal))
            .collect_vec();
        Ok(Self {
            t: order.iter().map(|&i| t[i]).collect(),
            flux: order.iter().map(|&i| flux[i]).collect(),
            flux_err: order.iter().map(|&i| flux_err[i]).collect(),
        })
    }

    fn validate(t: &[T], flux: &[T], flux_err: &[T]) -> Result<(), LightCurveError> {
        for (name, a) in [("flux", flux), ("flux error", flux_err)] {
            if a.len() != t.len() {
                return Err(LightCurveError::LengthMismatch {
                    name,
                    actual: a.len(),
                    expected: t.len(),
                });
            }
        }
        if t.len() < Self::MIN_LENGTH {
            return Err(LightCurveError::ShortLightCurve {
                actual: t.len(),
                minimum: Self::MIN_LENGTH,
            });
        }
        for (name, a) in [("time", t), ("flux", flux), ("flux error", flux_err)] {
            if let Some(index) = a.iter().position(|x| !x.is_finite()) {
                return Err(LightCurveError::NonFiniteValue { name, index });
            }
        }
        if let Some(index) = flux_err.iter().position(|&x| x <= T::zero()) {
            return Err(LightCurveError::NonPositiveError { index });
        }
        if t.iter().all_equal() {
            return Err(LightCurveError::DegenerateTimeRange);
        }
        Ok(())
    }

    /// Number of observations
    #[inline]
    pub fn lenu(&self) -> usize {
        self.t.len()
    }

    pub fn t(&self) -> ArrayView1<'_, T> {
        self.t.view()
    }

    pub fn flux(&self) -> ArrayView1<'_, T> {
        self.flux.view()
    }

    pub fn flux_err(&self) -> ArrayView1<'_, T> {
        self.flux_err.view()
    }

    pub fn t_min(&self) -> T {
        self.t[0]
    }

    pub fn t_max(&self) -> T {
        self.t[self.lenu() - 1]
    }

    /// Inverse variance of flux, `1 / flux_err^2`
    pub fn inv_variance(&self) -> Array1<T> {
        self.flux_err.mapv(|e| (e * e).recip())
    }
}
