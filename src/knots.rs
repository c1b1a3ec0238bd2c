use crate::error::SplineError;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Interior knots of a cubic spline
///
/// Knots are strictly increasing and lie strictly inside the open interval `(t_min, t_max)`,
/// the interval bounds are the boundary knots of the spline and never appear among interior
/// knots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "KnotSetSerde", try_from = "KnotSetSerde")]
pub struct KnotSet {
    t_min: f64,
    t_max: f64,
    knots: Vec<f64>,
}

impl KnotSet {
    /// Knot set from strictly increasing knots inside `(t_min, t_max)`
    pub fn new(t_min: f64, t_max: f64, knots: Vec<f64>) -> Result<Self, SplineError> {
        if !(t_min < t_max) {
            return Err(SplineError::EmptyRange { t_min, t_max });
        }
        if let Some(&knot) = knots.iter().find(|&&k| k <= t_min || k >= t_max) {
            return Err(SplineError::KnotOutsideRange { knot, t_min, t_max });
        }
        if !knots.iter().tuple_windows().all(|(a, b)| a < b) {
            return Err(SplineError::UnsortedKnots);
        }
        Ok(Self {
            t_min,
            t_max,
            knots,
        })
    }

    /// Evenly spaced knots with spacing of roughly `dt`
    ///
    /// `floor((t_max - t_min) / dt + 2)` points are placed on `[t_min, t_max]` and both ends are
    /// dropped, so a range shorter than `dt` gives no interior knots.
    pub fn uniform(t_min: f64, t_max: f64, dt: f64) -> Self {
        assert!(t_min < t_max, "t_min must be less than t_max");
        assert!(dt > 0.0, "dt must be positive");
        let n = ((t_max - t_min) / dt + 2.0).floor() as usize;
        let knots = linspace(t_min, t_max, n)
            .into_iter()
            .filter(|&k| k > t_min && k < t_max)
            .collect();
        Self {
            t_min,
            t_max,
            knots,
        }
    }

    /// Knot set without interior knots
    pub fn empty(t_min: f64, t_max: f64) -> Self {
        assert!(t_min < t_max, "t_min must be less than t_max");
        Self {
            t_min,
            t_max,
            knots: vec![],
        }
    }

    /// Replace all knots inside `[t1, t2]` with `n` evenly spaced knots spanning the window
    ///
    /// Window ends are included into the fill. Fill points on or outside the boundary knots are
    /// skipped to keep all knots interior. Repeated calls with the same arguments give the same
    /// result.
    pub fn replace_window(&self, t1: f64, t2: f64, n: usize) -> Self {
        let (t1, t2) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        let knots = self
            .knots
            .iter()
            .copied()
            .filter(|&k| k < t1 || k > t2)
            .chain(
                linspace(t1, t2, n)
                    .into_iter()
                    .filter(|&k| k > self.t_min && k < self.t_max),
            )
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect();
        Self {
            t_min: self.t_min,
            t_max: self.t_max,
            knots,
        }
    }

    /// Fill every gap between adjacent times longer than `max_gap` with `n` knots
    ///
    /// `t` must be sorted.
    pub fn fill_gaps(&self, t: &[f64], max_gap: f64, n: usize) -> Self {
        let gaps = t
            .iter()
            .tuple_windows()
            .filter(|&(&a, &b)| b - a > max_gap)
            .collect_vec();
        log::info!("Filling in {} time gaps", gaps.len());
        gaps.into_iter()
            .fold(self.clone(), |knots, (&a, &b)| knots.replace_window(a, b, n))
    }

    pub fn t_min(&self) -> f64 {
        self.t_min
    }

    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    /// Number of interior knots
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.knots
    }

    /// Number of knots inside the closed interval `[t1, t2]`
    pub fn count_in(&self, t1: f64, t2: f64) -> usize {
        self.knots.iter().filter(|&&k| k >= t1 && k <= t2).count()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename = "KnotSet")]
struct KnotSetSerde {
    t_min: f64,
    t_max: f64,
    knots: Vec<f64>,
}

impl From<KnotSet> for KnotSetSerde {
    fn from(value: KnotSet) -> Self {
        Self {
            t_min: value.t_min,
            t_max: value.t_max,
            knots: value.knots,
        }
    }
}

impl TryFrom<KnotSetSerde> for KnotSet {
    type Error = SplineError;

    fn try_from(value: KnotSetSerde) -> Result<Self, Self::Error> {
        Self::new(value.t_min, value.t_max, value.knots)
    }
}

/// `n` evenly spaced points from `start` to `end` inclusive
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
