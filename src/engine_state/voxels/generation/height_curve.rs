//! # Height Curve Module
//!
//! A piecewise-linear mapping from a noise sample in `[-1, 1]` to a terrain column height.
//!
//! The curve is a short list of control points kept sorted by `x`. Insertion and lookup
//! are both linear scans: curves hold a handful of points and are built once per world.

use crate::error::{EngineError, EngineResult};

/// One `(noise value, height)` pair on the curve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControlPoint {
    /// Noise value, always within `[-1, 1]`.
    pub x: f32,
    /// Column height at that noise value.
    pub y: f32,
}

impl ControlPoint {
    /// Creates a control point, rejecting `x` outside `[-1, 1]`.
    pub fn new(x: f32, y: f32) -> EngineResult<Self> {
        if !(-1.0..=1.0).contains(&x) {
            return Err(EngineError::InvalidControlPoint(x));
        }
        Ok(ControlPoint { x, y })
    }
}

/// Ordered control points spanning exactly `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct HeightCurve {
    points: Vec<ControlPoint>,
}

impl HeightCurve {
    /// Creates a curve from its two endpoints.
    ///
    /// # Errors
    /// `InvalidCurveEndpoints` unless `first.x == -1` and `last.x == 1`.
    pub fn new(first: ControlPoint, last: ControlPoint) -> EngineResult<Self> {
        if first.x != -1.0 || last.x != 1.0 {
            return Err(EngineError::InvalidCurveEndpoints {
                first: first.x,
                last: last.x,
            });
        }
        Ok(HeightCurve {
            points: vec![first, last],
        })
    }

    /// Builds a curve from `(x, y)` pairs. The first and last pair are the endpoints; the
    /// ones between may come in any order.
    pub fn from_points(points: &[(f32, f32)]) -> EngineResult<Self> {
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() >= 2 => (*first, *last),
            _ => {
                return Err(EngineError::InvalidConfig(
                    "height curve needs at least two control points".to_string(),
                ))
            }
        };
        let mut curve = HeightCurve::new(
            ControlPoint::new(first.0, first.1)?,
            ControlPoint::new(last.0, last.1)?,
        )?;
        for &(x, y) in &points[1..points.len() - 1] {
            curve.add_point(ControlPoint::new(x, y)?);
        }
        Ok(curve)
    }

    /// Inserts a point, keeping the list sorted by `x`. Points with an equal `x` keep their
    /// insertion order.
    pub fn add_point(&mut self, point: ControlPoint) {
        let index = self
            .points
            .iter()
            .position(|existing| existing.x > point.x)
            .unwrap_or(self.points.len());
        self.points.insert(index, point);
    }

    /// The control points in ascending `x` order.
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Evaluates the curve at `x`.
    ///
    /// Exactly at a control point the point's own height is returned.
    ///
    /// # Errors
    /// `InterpolationOutOfRange` if `x` is outside `[-1, 1]` (this includes NaN).
    pub fn interpolate(&self, x: f32) -> EngineResult<f32> {
        if !(-1.0..=1.0).contains(&x) {
            return Err(EngineError::InterpolationOutOfRange(x));
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x == a.x {
                return Ok(a.y);
            }
            if x <= b.x {
                if x == b.x || b.x == a.x {
                    return Ok(b.y);
                }
                let t = (x - a.x) / (b.x - a.x);
                return Ok(a.y + t * (b.y - a.y));
            }
        }
        // unreachable for a curve whose last point is x=1, which the constructor enforces
        Err(EngineError::InterpolationOutOfRange(x))
    }
}
