//! Discontinuity search in fit residuals
//!
//! A discontinuity is an abrupt change of the light curve level which a smooth spline can't
//! follow. After the robust fit it shows up as residuals of opposite signs on either side of the
//! break.

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[enum_dispatch]
pub trait DiscontinuityTrait: Clone + Debug {
    /// Find a break between observations `i` and `i + 1` and return `i`
    ///
    /// `t` is sorted time, `chi` are normalized residuals, `window` is the time scale of the
    /// neighbourhood to look at on each side, `q` is the robust weighting severity and
    /// `significance` is the detection threshold.
    fn find_discontinuity(
        &self,
        t: &[f64],
        chi: &[f64],
        window: f64,
        q: f64,
        significance: f64,
    ) -> Option<usize>;
}

#[enum_dispatch(DiscontinuityTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DiscontinuityAlgorithm {
    RobustStep(RobustStepDetector),
    Disabled(NoDiscontinuitySearch),
}

impl Default for DiscontinuityAlgorithm {
    fn default() -> Self {
        RobustStepDetector::default().into()
    }
}

/// Robust step detector
///
/// Every pair of adjacent observations $(i, i + 1)$ gets left and right neighbourhoods:
/// observations with $t_i - \mathrm{window} \le t_j \le t_i$ and
/// $t_{i+1} \le t_j \le t_{i+1} + \mathrm{window}$, each must hold at least
/// `min_side_length` observations. Residuals are passed through the robust influence function
/// $$
/// \psi(\chi) = \frac{\chi Q}{\chi^2 + Q}.
/// $$
/// A smooth fit across a step leaves large residuals next to the break only, so every side is
/// described by two means of $\psi$: over the `min_side_length` observations nearest to the
/// break, $\bar\psi^\mathrm{near}$, and over the whole neighbourhood, $\bar\psi^\mathrm{all}$.
/// The side score is their signed geometric mean, $\pm\sqrt{\bar\psi^\mathrm{near}
/// \bar\psi^\mathrm{all}}$, and zero if their signs differ. The pair score is
/// $\sqrt{-s_L s_R}$ if the side scores $s_L$ and $s_R$ have opposite signs and zero otherwise,
/// so a short dip which shifts one side only scores low. The highest score above the
/// significance wins.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "RobustStep")]
pub struct RobustStepDetector {
    pub min_side_length: usize,
}

impl RobustStepDetector {
    pub fn new(min_side_length: usize) -> Self {
        assert!(min_side_length > 0, "min_side_length must be positive");
        Self { min_side_length }
    }

    #[inline]
    pub fn default_min_side_length() -> usize {
        3
    }

    fn psi(chi: f64, q: f64) -> f64 {
        chi * q / (chi * chi + q)
    }

    fn psi_mean(chi: &[f64], q: f64) -> f64 {
        chi.iter().map(|&x| Self::psi(x, q)).sum::<f64>() / chi.len() as f64
    }

    fn side_score(near: &[f64], all: &[f64], q: f64) -> f64 {
        let near = Self::psi_mean(near, q);
        let all = Self::psi_mean(all, q);
        if near * all <= 0.0 {
            return 0.0;
        }
        near.signum() * f64::sqrt(near * all)
    }
}

impl Default for RobustStepDetector {
    fn default() -> Self {
        Self::new(Self::default_min_side_length())
    }
}

impl DiscontinuityTrait for RobustStepDetector {
    fn find_discontinuity(
        &self,
        t: &[f64],
        chi: &[f64],
        window: f64,
        q: f64,
        significance: f64,
    ) -> Option<usize> {
        assert_eq!(t.len(), chi.len(), "t and chi should have the same size");
        let mut best: Option<(usize, f64)> = None;
        for i in 0..t.len().saturating_sub(1) {
            let left_begin = t[..=i].partition_point(|&x| x < t[i] - window);
            let right_end = i + 1 + t[i + 1..].partition_point(|&x| x <= t[i + 1] + window);
            let (left, right) = (&chi[left_begin..=i], &chi[i + 1..right_end]);
            if left.len() < self.min_side_length || right.len() < self.min_side_length {
                continue;
            }
            let k = self.min_side_length;
            let left_score = Self::side_score(&left[left.len() - k..], left, q);
            let right_score = Self::side_score(&right[..k], right, q);
            let product = left_score * right_score;
            if product >= 0.0 {
                continue;
            }
            let score = f64::sqrt(-product);
            if score > significance && best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Discontinuity "search" which never finds anything
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "Disabled")]
pub struct NoDiscontinuitySearch {}

impl NoDiscontinuitySearch {
    pub fn new() -> Self {
        Self {}
    }
}

impl DiscontinuityTrait for NoDiscontinuitySearch {
    fn find_discontinuity(
        &self,
        _t: &[f64],
        _chi: &[f64],
        _window: f64,
        _q: f64,
        _significance: f64,
    ) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::prelude::*;
    use rand_distr::StandardNormal;

    const Q: f64 = 12.0;
    const SIGNIFICANCE: f64 = 1.0;

    fn time(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn zero_residuals() {
        let t = time(100);
        let chi = vec![0.0; 100];
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            None
        );
    }

    #[test]
    fn step() {
        let t = time(100);
        let chi: Vec<_> = (0..100).map(|i| if i < 60 { 2.0 } else { -2.0 }).collect();
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            Some(59)
        );
    }

    #[test]
    fn step_in_noise() {
        let mut rng = StdRng::seed_from_u64(0);
        let t = time(200);
        let chi: Vec<_> = (0..200)
            .map(|i| {
                let step = if i < 120 { 3.0 } else { -3.0 };
                step + 0.3 * rng.sample::<f64, _>(StandardNormal)
            })
            .collect();
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            Some(119)
        );
    }

    #[test]
    fn localized_step() {
        // Smooth fit across a step leaves large residuals next to the break only
        let left = [0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 2.0, 4.0, 5.0, 7.0];
        let right = [-6.0, -5.0, -4.0, -2.0, -1.0, -0.5, 0.0, 0.0, 0.0, 0.0];
        let chi: Vec<_> = [0.0; 20]
            .iter()
            .chain(&left)
            .chain(&right)
            .chain(&[0.0; 20])
            .copied()
            .collect();
        let t = time(chi.len());
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            Some(29)
        );
    }

    #[test]
    fn transit_like_dip_is_not_a_step() {
        let t = time(100);
        let chi: Vec<_> = (0..100)
            .map(|i| if (45..=50).contains(&i) { -10.0 } else { 0.2 })
            .collect();
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            None
        );
    }

    #[test]
    fn small_step_is_insignificant() {
        let t = time(100);
        let chi: Vec<_> = (0..100).map(|i| if i < 50 { 0.5 } else { -0.5 }).collect();
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            None
        );
    }

    #[test]
    fn short_sides_are_skipped() {
        // Break is too close to the end to have three observations on the right
        let t = time(20);
        let chi: Vec<_> = (0..20).map(|i| if i < 18 { 2.0 } else { -2.0 }).collect();
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            None
        );
        let detector = RobustStepDetector::new(2);
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            Some(17)
        );
    }

    #[test]
    fn window_limits_neighbourhood() {
        // Window is shorter than the time step, so no side has enough observations
        let t: Vec<_> = (0..50).map(|i| 10.0 * i as f64).collect();
        let chi: Vec<_> = (0..50).map(|i| if i < 25 { 2.0 } else { -2.0 }).collect();
        let detector = RobustStepDetector::default();
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 5.0, Q, SIGNIFICANCE),
            None
        );
        assert_eq!(
            detector.find_discontinuity(&t, &chi, 25.0, Q, SIGNIFICANCE),
            Some(24)
        );
    }

    #[test]
    fn disabled_never_finds() {
        let t = time(100);
        let chi: Vec<_> = (0..100).map(|i| if i < 60 { 2.0 } else { -2.0 }).collect();
        let algorithm: DiscontinuityAlgorithm = NoDiscontinuitySearch::new().into();
        assert_eq!(
            algorithm.find_discontinuity(&t, &chi, 10.0, Q, SIGNIFICANCE),
            None
        );
    }

    #[test]
    fn serialization() {
        let algorithm = DiscontinuityAlgorithm::default();
        let json = serde_json::to_string(&algorithm).unwrap();
        assert_eq!(json, r#"{"RobustStep":{"min_side_length":3}}"#);
        let deserialized: DiscontinuityAlgorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, algorithm);
    }
}
