//! Planar geometry used by tools, hit testing and the rule checker.
//!
//! All coordinates are millimetres in board space with the Y axis pointing up.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Coordinates closer than this are treated as identical.
pub const EPSILON: f64 = 1e-9;

/// A point (or vector) in board space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (*other - *self).length()
    }

    /// Length when interpreted as a vector.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// True if both coordinates differ by less than `tolerance`.
    pub fn nearly_equal(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Rotates counter-clockwise around `center`.
    ///
    /// Quarter turns are computed exactly so grid positions stay on the grid.
    pub fn rotated_about(&self, center: &Point, degrees: f64) -> Point {
        let d = *self - *center;
        let normalized = degrees.rem_euclid(360.0);
        let r = if (normalized - 90.0).abs() < EPSILON {
            Point::new(-d.y, d.x)
        } else if (normalized - 180.0).abs() < EPSILON {
            Point::new(-d.x, -d.y)
        } else if (normalized - 270.0).abs() < EPSILON {
            Point::new(d.y, -d.x)
        } else if normalized.abs() < EPSILON {
            d
        } else {
            let (sin, cos) = normalized.to_radians().sin_cos();
            Point::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
        };
        *center + r
    }

    /// Mirrors horizontally around the vertical line `x = axis_x`.
    pub fn mirrored_x(&self, axis_x: f64) -> Point {
        Point::new(2.0 * axis_x - self.x, self.y)
    }

    /// Rounds both coordinates to the nearest multiple of `interval`.
    pub fn snapped(&self, interval: f64) -> Point {
        snap_to_grid(*self, interval)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
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

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Axis aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Creates a rectangle from two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Bounding box of a point set, `None` if the set is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Rect::from_corners(first, first), |r, p| r.including(p)))
    }

    /// Square box of half-size `radius` around `center`.
    pub fn around(center: Point, radius: f64) -> Self {
        Self::from_corners(
            Point::new(center.x - radius, center.y - radius),
            Point::new(center.x + radius, center.y + radius),
        )
    }

    pub fn including(&self, p: &Point) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        self.including(&other.min).including(&other.max)
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Rect {
        Rect {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }
}

/// Converts a tolerance given in device-independent pixels into millimetres.
///
/// `pixels_per_mm` is the current view scale. A non-positive or non-finite
/// scale yields the pixel value unchanged.
pub fn hit_tolerance(pixels: f64, pixels_per_mm: f64) -> f64 {
    if pixels_per_mm.is_finite() && pixels_per_mm > 0.0 {
        pixels / pixels_per_mm
    } else {
        pixels
    }
}

/// Rounds a point to the nearest grid position. A non-positive interval disables snapping.
pub fn snap_to_grid(p: Point, interval: f64) -> Point {
    if interval <= 0.0 || !interval.is_finite() {
        return p;
    }
    Point::new(
        (p.x / interval).round() * interval,
        (p.y / interval).round() * interval,
    )
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = *b - *a;
    let len_sq = ab.dot(&ab);
    if len_sq < EPSILON * EPSILON {
        return p.distance(a);
    }
    let t = ((*p - *a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    p.distance(&(*a + ab * t))
}

/// True if the closed segments `a1`-`a2` and `b1`-`b2` share a point.
pub fn segments_intersect(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> bool {
    fn orientation(p: &Point, q: &Point, r: &Point) -> f64 {
        (*q - *p).cross(&(*r - *p))
    }
    fn on_segment(p: &Point, q: &Point, r: &Point) -> bool {
        q.x <= p.x.max(r.x) + EPSILON
            && q.x >= p.x.min(r.x) - EPSILON
            && q.y <= p.y.max(r.y) + EPSILON
            && q.y >= p.y.min(r.y) - EPSILON
    }

    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
        && ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
    {
        return true;
    }

    (d1.abs() <= EPSILON && on_segment(b1, a1, b2))
        || (d2.abs() <= EPSILON && on_segment(b1, a2, b2))
        || (d3.abs() <= EPSILON && on_segment(a1, b1, a2))
        || (d4.abs() <= EPSILON && on_segment(a1, b2, a2))
}

/// Shortest distance between two segments, zero if they cross.
pub fn segment_segment_distance(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    segment_distance(a1, b1, b2)
        .min(segment_distance(a2, b1, b2))
        .min(segment_distance(b1, a1, a2))
        .min(segment_distance(b2, a1, a2))
}

/// Iterates the edges of a closed path, including the closing edge.
pub fn closed_edges(path: &[Point]) -> impl Iterator<Item = (&Point, &Point)> {
    let n = path.len();
    (0..n).map(move |i| (&path[i], &path[(i + 1) % n]))
}

/// Even-odd point in polygon test. Points on the boundary may go either way.
pub fn point_in_polygon(p: &Point, path: &[Point]) -> bool {
    if path.len() < 3 {
        return false;
    }
    let mut inside = false;
    for (a, b) in closed_edges(path) {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Distance from `p` to the outline of a closed path.
pub fn polygon_outline_distance(p: &Point, path: &[Point]) -> f64 {
    match path.len() {
        0 => f64::INFINITY,
        1 => p.distance(&path[0]),
        _ => closed_edges(path)
            .map(|(a, b)| segment_distance(p, a, b))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from `p` to a filled polygon, zero when inside.
pub fn polygon_distance(p: &Point, path: &[Point]) -> f64 {
    if point_in_polygon(p, path) {
        0.0
    } else {
        polygon_outline_distance(p, path)
    }
}

/// Shortest distance from segment `a`-`b` to a filled polygon.
pub fn segment_polygon_distance(a: &Point, b: &Point, path: &[Point]) -> f64 {
    if point_in_polygon(a, path) || point_in_polygon(b, path) {
        return 0.0;
    }
    closed_edges(path)
        .map(|(p, q)| segment_segment_distance(a, b, p, q))
        .fold(f64::INFINITY, f64::min)
}

/// Signed area, positive for counter-clockwise paths.
pub fn polygon_area(path: &[Point]) -> f64 {
    closed_edges(path).map(|(a, b)| a.cross(b)).sum::<f64>() / 2.0
}

/// True if every turn of the closed path goes the same way.
pub fn polygon_is_convex(path: &[Point]) -> bool {
    if path.len() < 3 {
        return false;
    }
    let n = path.len();
    let mut sign = 0.0_f64;
    for i in 0..n {
        let a = path[i];
        let b = path[(i + 1) % n];
        let c = path[(i + 2) % n];
        let turn = (b - a).cross(&(c - b));
        if turn.abs() <= EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Clips `subject` against a convex `clip` polygon (Sutherland-Hodgman).
///
/// Returns an empty path if nothing remains.
pub fn clip_polygon_convex(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }
    let orientation = polygon_area(clip).signum();
    let inside = |p: &Point, a: &Point, b: &Point| (*b - *a).cross(&(*p - *a)) * orientation >= -EPSILON;
    let intersection = |p: &Point, q: &Point, a: &Point, b: &Point| {
        let r = *q - *p;
        let s = *b - *a;
        let denom = r.cross(&s);
        if denom.abs() < EPSILON {
            *q
        } else {
            *p + r * ((*a - *p).cross(&s) / denom)
        }
    };

    let mut output = subject.to_vec();
    for (a, b) in closed_edges(clip) {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let n = input.len();
        for i in 0..n {
            let current = input[i];
            let previous = input[(i + n - 1) % n];
            let cur_in = inside(&current, a, b);
            let prev_in = inside(&previous, a, b);
            if cur_in {
                if !prev_in {
                    output.push(intersection(&previous, &current, a, b));
                }
                output.push(current);
            } else if prev_in {
                output.push(intersection(&previous, &current, a, b));
            }
        }
    }
    output.dedup_by(|a, b| a.nearly_equal(b, EPSILON));
    if output.len() < 3 || polygon_area(&output).abs() < EPSILON {
        Vec::new()
    } else {
        output
    }
}
