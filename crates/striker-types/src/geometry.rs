//! Planar geometry primitives shared by every Striker crate.
//!
//! All coordinates live in the field frame: millimetres, origin on the centre
//! spot, `+x` towards the east goal and `+y` towards the north touch line.
//! Angles are exposed in **degrees**, normalised to `(-180, 180]`.
//!
//! Everything here is a pure function of its inputs.
//!
//! # Example
//!
//! ```rust
//! use striker_types::geometry::{Point, normalize_angle};
//!
//! let a = Point::new(0.0, 0.0);
//! let b = Point::new(0.0, 100.0);
//! assert!((a.distance(b) - 100.0).abs() < 1e-9);
//! assert!((a.angle_to(b) - 90.0).abs() < 1e-9);
//! assert!((normalize_angle(270.0) + 90.0).abs() < 1e-9);
//! ```

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Angles
// ────────────────────────────────────────────────────────────────────────────

/// Normalise `deg` into the half-open range `(-180, 180]`.
pub fn normalize_angle(deg: f64) -> f64 {
    let mut a = deg % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Signed shortest rotation from `from` to `to`, in degrees.
pub fn angle_difference(to: f64, from: f64) -> f64 {
    normalize_angle(to - from)
}

// ────────────────────────────────────────────────────────────────────────────
// Point
// ────────────────────────────────────────────────────────────────────────────

/// A position (or displacement) on the field, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The centre spot.
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: Point) -> f64 {
        (other - *self).length()
    }

    /// Length of this point interpreted as a vector from the origin.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Bearing from `self` to `other` in degrees, `(-180, 180]`.
    ///
    /// Returns `0.0` when both points coincide.
    pub fn angle_to(&self, other: Point) -> f64 {
        let d = other - *self;
        if d.x == 0.0 && d.y == 0.0 {
            return 0.0;
        }
        normalize_angle(d.y.atan2(d.x).to_degrees())
    }

    /// The point reached by travelling `dist` millimetres along `angle_deg`.
    pub fn translate(&self, angle_deg: f64, dist: f64) -> Point {
        let rad = angle_deg.to_radians();
        Point::new(self.x + rad.cos() * dist, self.y + rad.sin() * dist)
    }

    /// The point `dist` millimetres from `self` in the direction of `other`.
    ///
    /// When both points coincide `self` is returned unchanged.
    pub fn toward(&self, other: Point, dist: f64) -> Point {
        let d = other - *self;
        let len = d.length();
        if len == 0.0 {
            return *self;
        }
        *self + d * (dist / len)
    }

    /// Linear interpolation: `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        *self + (other - *self) * t
    }

    /// `true` when both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Compare after rounding both points to whole millimetres.
    pub fn equals_rounded(&self, other: Point) -> bool {
        self.x.round() == other.x.round() && self.y.round() == other.y.round()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A raw robot pose as reported by a camera: position plus orientation in
/// degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, orientation: f64) -> Self {
        Self {
            position: Point::new(x, y),
            orientation,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Segments and circles
// ────────────────────────────────────────────────────────────────────────────

/// Minimum distance from `p` to the segment `a`–`b`.
pub fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq == 0.0 {
        return a.distance(p);
    }
    let ap = p - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    a.lerp(b, t).distance(p)
}

/// A circular exclusion zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Strict containment: points exactly on the rim are outside.
    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(p) < self.radius
    }

    /// `true` when the segment `a`–`b` passes strictly inside the circle.
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        segment_distance(a, b, self.center) < self.radius
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Polygons
// ────────────────────────────────────────────────────────────────────────────

/// Even-odd ray-casting containment test.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let mut inside = false;
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];
        if (vi.y > point.y) != (vj.y > point.y)
            && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A closed polygon on the field, used for named tactical zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn contains(&self, point: Point) -> bool {
        point_in_polygon(point, &self.vertices)
    }

    fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }

    /// Centre of the axis-aligned bounding box.
    pub fn center_point(&self) -> Point {
        if self.vertices.is_empty() {
            return Point::ORIGIN;
        }
        let (min, max) = self.bounds();
        min.lerp(max, 0.5)
    }

    pub fn width(&self) -> f64 {
        if self.vertices.is_empty() {
            return 0.0;
        }
        let (min, max) = self.bounds();
        max.x - min.x
    }

    pub fn height(&self) -> f64 {
        if self.vertices.is_empty() {
            return 0.0;
        }
        let (min, max) = self.bounds();
        max.y - min.y
    }

    pub fn closest_vertex(&self, point: Point) -> Option<Point> {
        self.vertices.iter().copied().min_by(|a, b| {
            a.distance(point)
                .partial_cmp(&b.distance(point))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
