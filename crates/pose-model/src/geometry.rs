//! Region-of-interest box and 3D point types.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A normalized rectangle selecting which person to track.
///
/// Coordinates are normalized: `(0.0, 0.0)` is top-left, `(1.0, 1.0)` is
/// bottom-right of the video frame. The box always lies inside the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiBox {
    /// Left edge (normalized).
    pub x: f64,
    /// Top edge (normalized).
    pub y: f64,
    /// Width (normalized).
    pub w: f64,
    /// Height (normalized).
    pub h: f64,
}

impl RoiBox {
    /// The whole frame.
    pub const FULL: RoiBox = RoiBox {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Create a box, clamping it into the unit square.
    /// Non-finite inputs are treated as zero.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        let x = finite_or_zero(x).clamp(0.0, 1.0);
        let y = finite_or_zero(y).clamp(0.0, 1.0);
        Self {
            x,
            y,
            w: finite_or_zero(w).clamp(0.0, 1.0 - x),
            h: finite_or_zero(h).clamp(0.0, 1.0 - y),
        }
    }

    /// Create a box from two opposite corners in any order, as produced by a
    /// drag selection.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let left = finite_or_zero(x1.min(x2)).clamp(0.0, 1.0);
        let top = finite_or_zero(y1.min(y2)).clamp(0.0, 1.0);
        let right = finite_or_zero(x1.max(x2)).clamp(0.0, 1.0);
        let bottom = finite_or_zero(y1.max(y2)).clamp(0.0, 1.0);
        Self::new(left, top, right - left, bottom - top)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        (self.x + self.w).min(1.0)
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        (self.y + self.h).min(1.0)
    }

    /// The center point of this box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Area of the box (0.0 to 1.0).
    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Check if a normalized point is within this box, edges included.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

impl Default for RoiBox {
    fn default() -> Self {
        Self::FULL
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// A 3D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Length of the horizontal (x, z) components; `y` is vertical.
    pub fn horizontal_norm(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: &Point3) -> f64 {
        (*self - *other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Point3 {
    type Output = Point3;

    fn div(self, rhs: f64) -> Point3 {
        Point3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}
