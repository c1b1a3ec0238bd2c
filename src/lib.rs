#![doc = include_str!("../README.md")]


mod data;
pub use data::{LightCurve, SortedArray};

pub mod discontinuity;
pub use discontinuity::{
    DiscontinuityAlgorithm, DiscontinuityTrait, NoDiscontinuitySearch, RobustStepDetector,
};

mod error;
pub use error::{DetrendError, LightCurveError, SplineError};

mod float_trait;
pub use float_trait::Float;

mod knots;
pub use knots::KnotSet;

pub mod reweighting;
pub use reweighting::{ReweightingOutcome, ReweightingParams, reweight, robust_weight};

pub mod spline;
pub use spline::{CubicSpline, LsqSplineFit, SplineFitAlgorithm, SplineFitTrait};

mod trend;
pub use trend::{
    Convergence, DISCONTINUITY_SIGNIFICANCE, MIN_DISCONTINUITY_KNOTS, TrendFit, TrendFitter,
    detrend, fit_trend,
};

pub use ndarray;
