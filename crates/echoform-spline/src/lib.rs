//! Recursive B-spline evaluation for smoothly time-varying quantities.
//!
//! Provides the basis-function recursion, knot-vector synthesis, knot-span
//! search, and Greville abscissae that the spline simulation algorithms use
//! to interpolate scatterer state over time, plus a [`Spline`] type that
//! ties them together with sparse evaluation.
//!
//! # Example
//!
//! ```
//! use echoform_spline::Spline;
//! use glam::Vec3;
//!
//! let points = vec![
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 2.0, 0.0),
//!     Vec3::new(2.0, 2.0, 0.0),
//!     Vec3::new(3.0, 0.0, 0.0),
//! ];
//!
//! // A clamped quadratic over t in [0, 1).
//! let spline = Spline::uniform(points, 2, 0.0, 1.0).unwrap();
//! let start = spline.evaluate(0.0).unwrap();
//! assert!((start - Vec3::ZERO).length() < 1e-6);
//! ```
//!
//! All free functions are pure and reentrant; nothing in this crate holds
//! shared mutable state.

use glam::{Vec2, Vec3};
use thiserror::Error;

/// Absolute tolerance below which a value counts as zero in the basis
/// recursion.
const ZERO_EPS: f32 = 1e-6;

/// Errors from knot-vector construction and spline evaluation.
///
/// All of these indicate a caller or configuration bug; given the same
/// inputs they are deterministic, so the only recovery is fixing the
/// inputs.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SplineError {
    /// No half-open knot interval contains the parameter value.
    #[error("no knot interval contains t = {t}")]
    IntervalNotFound {
        /// The out-of-domain parameter value.
        t: f32,
    },

    /// Too few control points to support the requested degree.
    #[error("{actual} control points cannot support degree {degree} (need at least {required})")]
    TooFewControlPoints {
        /// Requested polynomial degree.
        degree: usize,
        /// Minimum number of control points for that degree.
        required: usize,
        /// Number of control points requested.
        actual: usize,
    },

    /// The knot interval containing t has fewer than `degree` predecessors,
    /// so the active control range is undefined; the knot vector is not
    /// degree-regular.
    #[error("knot interval {interval} cannot support degree {degree}; knot vector is not degree-regular")]
    DegreeExceedsInterval {
        /// Requested polynomial degree.
        degree: usize,
        /// Index of the knot interval containing t.
        interval: usize,
    },

    /// Knot vector length does not match control points + degree + 1.
    #[error("knot vector of length {actual} does not match control points + degree + 1 = {expected}")]
    KnotLengthMismatch {
        /// Expected knot vector length.
        expected: usize,
        /// Provided knot vector length.
        actual: usize,
    },

    /// Knot vector entries must be non-decreasing.
    #[error("knot vector decreases at index {index}")]
    UnsortedKnots {
        /// First index whose entry is smaller than its predecessor.
        index: usize,
    },
}

/// Result alias for spline operations.
pub type SplineResult<T> = Result<T, SplineError>;

fn float_is_zero(value: f32) -> bool {
    value.abs() < ZERO_EPS
}

/// Division with the convention that 0/0 is 0.
///
/// The basis recursion produces 0/0 at repeated knots; that case resolves
/// to zero. Any other division by zero keeps ordinary IEEE semantics.
pub fn special_div(num: f32, den: f32) -> f32 {
    if float_is_zero(num) && float_is_zero(den) {
        0.0
    } else {
        num / den
    }
}

/// Evaluates B-spline basis function `j` of degree `p` at `x` by the
/// recursive definition.
///
/// The degree-0 base case is the indicator of `[knots[j], knots[j+1])`.
/// `knots` must have at least `j + p + 2` entries; shorter vectors are a
/// caller bug and panic on indexing.
///
/// Cost is exponential in `p`; degrees in practice stay at 3 or below.
pub fn basis_value(j: usize, p: usize, x: f32, knots: &[f32]) -> f32 {
    if p == 0 {
        if knots[j] <= x && x < knots[j + 1] {
            1.0
        } else {
            0.0
        }
    } else {
        let left = special_div(
            (x - knots[j]) * basis_value(j, p - 1, x, knots),
            knots[j + p] - knots[j],
        );
        let right = special_div(
            (knots[j + 1 + p] - x) * basis_value(j + 1, p - 1, x, knots),
            knots[j + 1 + p] - knots[j + 1],
        );
        left + right
    }
}

/// Finds the index of the half-open knot interval containing `t`.
///
/// Scans in increasing order and returns the first `i` with
/// `knots[i] <= t < knots[i+1]`. A `t` outside `[knots[0], knots[last])`
/// is a hard error; callers must not extrapolate.
pub fn knot_interval(knots: &[f32], t: f32) -> SplineResult<usize> {
    for i in 0..knots.len().saturating_sub(1) {
        if knots[i] <= t && t < knots[i + 1] {
            return Ok(i);
        }
    }
    Err(SplineError::IntervalNotFound { t })
}

/// Returns the inclusive index range of basis functions that are non-zero
/// at `t`.
///
/// Every basis function outside the range is exactly zero at `t`, so a
/// weighted sum over this range alone evaluates the full spline.
pub fn active_range(knots: &[f32], t: f32, degree: usize) -> SplineResult<(usize, usize)> {
    let mu = knot_interval(knots, t)?;
    let lower = mu
        .checked_sub(degree)
        .ok_or(SplineError::DegreeExceedsInterval {
            degree,
            interval: mu,
        })?;
    Ok((lower, mu))
}

/// Builds a clamped, degree-regular uniform knot vector for `n` control
/// points of degree `p` over `[t0, t1]`.
///
/// Layout: `p` copies of `t0`, then `n + 1 - p` evenly spaced values from
/// `t0` to `t1` inclusive, then `p` copies of `t1`; `n + p + 1` entries in
/// total, with each end value repeated `p + 1` times.
pub fn uniform_regular_knots(n: usize, p: usize, t0: f32, t1: f32) -> SplineResult<Vec<f32>> {
    if n < p + 1 {
        return Err(SplineError::TooFewControlPoints {
            degree: p,
            required: p + 1,
            actual: n,
        });
    }

    let mut knots = Vec::with_capacity(n + p + 1);
    for _ in 0..p {
        knots.push(t0);
    }
    let middle = n + 1 - p;
    for i in 0..middle {
        knots.push(t0 + i as f32 * (t1 - t0) / (middle - 1) as f32);
    }
    for _ in 0..p {
        knots.push(t1);
    }
    Ok(knots)
}

/// Greville abscissae: the parametric position of each control point of a
/// one-dimensional spline, the mean of `p` consecutive interior knots.
///
/// Returns one entry per basis index, `knots.len() - p - 1` in total.
pub fn control_points(p: usize, knots: &[f32]) -> Vec<f32> {
    let count = knots.len().saturating_sub(p + 1);
    let mut res = Vec::with_capacity(count);
    for i in 0..count {
        if p == 0 {
            res.push(0.0);
        } else {
            let sum: f32 = knots[i + 1..i + 1 + p].iter().sum();
            res.push(sum / p as f32);
        }
    }
    res
}

/// Trait for values a spline can interpolate.
pub trait Interpolatable:
    Clone
    + Copy
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<f32, Output = Self>
{
}

impl Interpolatable for f32 {}
impl Interpolatable for Vec2 {}
impl Interpolatable for Vec3 {}

/// A clamped B-spline over arbitrary interpolatable control values.
///
/// The curve interpolates its first and last control points and is
/// evaluated sparsely: only the basis functions that are non-zero at the
/// query parameter contribute.
#[derive(Debug, Clone)]
pub struct Spline<T: Interpolatable> {
    points: Vec<T>,
    degree: usize,
    knots: Vec<f32>,
}

impl<T: Interpolatable> Spline<T> {
    /// Creates a spline with a degree-regular uniform knot vector over
    /// `[t0, t1]`.
    pub fn uniform(points: Vec<T>, degree: usize, t0: f32, t1: f32) -> SplineResult<Self> {
        let knots = uniform_regular_knots(points.len(), degree, t0, t1)?;
        Ok(Self {
            points,
            degree,
            knots,
        })
    }

    /// Creates a spline over a caller-provided knot vector.
    ///
    /// The vector must be non-decreasing with exactly
    /// `points.len() + degree + 1` entries.
    pub fn with_knots(points: Vec<T>, degree: usize, knots: Vec<f32>) -> SplineResult<Self> {
        let expected = points.len() + degree + 1;
        if knots.len() != expected {
            return Err(SplineError::KnotLengthMismatch {
                expected,
                actual: knots.len(),
            });
        }
        if let Some(i) = knots.windows(2).position(|w| w[1] < w[0]) {
            return Err(SplineError::UnsortedKnots { index: i + 1 });
        }
        Ok(Self {
            points,
            degree,
            knots,
        })
    }

    /// Control values.
    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Knot vector.
    pub fn knots(&self) -> &[f32] {
        &self.knots
    }

    /// Parameter range over which evaluation is defined.
    ///
    /// The upper end is exclusive: the final knot interval is half-open.
    pub fn domain(&self) -> (f32, f32) {
        (
            self.knots[self.degree],
            self.knots[self.knots.len() - self.degree - 1],
        )
    }

    /// Evaluates the spline at parameter `t`.
    ///
    /// Sums only the control points whose basis functions are non-zero at
    /// `t`. Parameters outside [`domain`](Self::domain) are a hard error,
    /// never clamped.
    pub fn evaluate(&self, t: f32) -> SplineResult<T> {
        let (t_min, t_max) = self.domain();
        if t < t_min || t >= t_max {
            return Err(SplineError::IntervalNotFound { t });
        }

        let (lower, upper) = active_range(&self.knots, t, self.degree)?;
        let mut value = self.points[lower] * basis_value(lower, self.degree, t, &self.knots);
        for j in lower + 1..=upper {
            value = value + self.points[j] * basis_value(j, self.degree, t, &self.knots);
        }
        Ok(value)
    }
}
