//! Segment ordinate ranges.

use serde::Serialize;

use crate::error::{SplineError, SplineResult};

/// Immutable `[left, right]` predictor range of one segment.
///
/// Maps global ordinates onto the local ordinate `u = (x - left) / width`
/// used by basis functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentRange {
    left: f64,
    right: f64,
}

impl SegmentRange {
    /// Creates a range; requires finite edges with `left < right`.
    pub fn new(left: f64, right: f64) -> SplineResult<Self> {
        if !(left.is_finite() && right.is_finite()) {
            return Err(SplineError::invalid_input(format!(
                "segment edges must be finite, got [{left}, {right}]"
            )));
        }
        if left >= right {
            return Err(SplineError::invalid_input(format!(
                "segment left edge {left} must be below right edge {right}"
            )));
        }
        Ok(Self { left, right })
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.right
    }

    /// `right - left`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Converts a global ordinate to the local ordinate.
    #[must_use]
    pub fn localize(&self, x: f64) -> f64 {
        (x - self.left) / self.width()
    }

    /// Converts a local ordinate back to the global ordinate.
    #[must_use]
    pub fn delocalize(&self, u: f64) -> f64 {
        self.left + u * self.width()
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        self.contains_with(x, true, true)
    }

    /// Containment test with per-edge inclusion flags.
    #[must_use]
    pub fn contains_with(&self, x: f64, include_left: bool, include_right: bool) -> bool {
        let above_left = if include_left { x >= self.left } else { x > self.left };
        let below_right = if include_right { x <= self.right } else { x < self.right };
        above_left && below_right
    }

    /// Returns `[x, right]`.
    pub fn clip_left(&self, x: f64) -> SplineResult<Self> {
        Self::new(x, self.right)
    }

    /// Returns `[left, x]`.
    pub fn clip_right(&self, x: f64) -> SplineResult<Self> {
        Self::new(self.left, x)
    }
}
