/// Error returned from [crate::LightCurve] constructors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LightCurveError {
    #[error("{name} has length {actual}, but time has length {expected}")]
    LengthMismatch {
        name: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("light curve length {actual} is smaller than the minimum required length {minimum}")]
    ShortLightCurve { actual: usize, minimum: usize },

    #[error("{name} contains a non-finite value at index {index}")]
    NonFiniteValue { name: &'static str, index: usize },

    #[error("flux error must be positive, but it is not at index {index}")]
    NonPositiveError { index: usize },

    #[error("all observations have the same time, time range is degenerate")]
    DegenerateTimeRange,
}

/// Error returned from [crate::SplineFitTrait] implementations
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SplineError {
    #[error("x, y and weights must have the same length, got {x}, {y} and {w}")]
    LengthMismatch { x: usize, y: usize, w: usize },

    #[error(
        "spline requires at least {minimum} distinct samples with positive weight, {actual} given"
    )]
    TooFewSamples { actual: usize, minimum: usize },

    #[error("knot {knot} is not strictly inside the sample range ({t_min}, {t_max})")]
    KnotOutsideRange { knot: f64, t_min: f64, t_max: f64 },

    #[error("knot range ({t_min}, {t_max}) is empty")]
    EmptyRange { t_min: f64, t_max: f64 },

    #[error("knots must be strictly increasing")]
    UnsortedKnots,

    #[error("spline coefficients length {actual} doesn't match knots, {expected} expected")]
    WrongCoefficientCount { actual: usize, expected: usize },

    #[error("least squares normal equations are singular")]
    Singular,
}

/// Error returned from [crate::TrendFitter]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DetrendError {
    #[error(transparent)]
    LightCurve(#[from] LightCurveError),

    #[error(transparent)]
    Spline(#[from] SplineError),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}
