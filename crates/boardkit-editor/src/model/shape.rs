//! Primitive copper shapes.
//!
//! Every piece of copper (trace segment, via, pad, filled polygon) is reduced
//! to one of three primitives so clearance math only has to handle those.

use boardkit_core::geometry::{
    point_in_polygon, polygon_distance, segment_distance, segment_polygon_distance,
    segment_segment_distance,
};
use boardkit_core::{Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Circle { center: Point, radius: f64 },
    /// Segment swept by a circle
    Stadium { a: Point, b: Point, radius: f64 },
    /// Filled polygon grown by `margin`
    Polygon { path: Vec<Point>, margin: f64 },
}

impl Shape {
    /// The same shape with every boundary pushed out by `margin`.
    pub fn grown(&self, margin: f64) -> Shape {
        match self {
            Shape::Circle { center, radius } => Shape::Circle {
                center: *center,
                radius: radius + margin,
            },
            Shape::Stadium { a, b, radius } => Shape::Stadium {
                a: *a,
                b: *b,
                radius: radius + margin,
            },
            Shape::Polygon { path, margin: m } => Shape::Polygon {
                path: path.clone(),
                margin: m + margin,
            },
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Circle { center, radius } => Rect::around(*center, *radius),
            Shape::Stadium { a, b, radius } => Rect::from_corners(*a, *b).expanded(*radius),
            Shape::Polygon { path, margin } => Rect::from_points(path)
                .map(|r| r.expanded(*margin))
                .unwrap_or_else(|| Rect::around(Point::ORIGIN, 0.0)),
        }
    }

    /// Representative point: circle centre, segment start, first vertex.
    pub fn anchor(&self) -> Point {
        match self {
            Shape::Circle { center, .. } => *center,
            Shape::Stadium { a, .. } => *a,
            Shape::Polygon { path, .. } => path.first().copied().unwrap_or_default(),
        }
    }

    /// Signed distance from `p` to the shape boundary, negative inside.
    pub fn distance_to_point(&self, p: &Point) -> f64 {
        match self {
            Shape::Circle { center, radius } => p.distance(center) - radius,
            Shape::Stadium { a, b, radius } => segment_distance(p, a, b) - radius,
            Shape::Polygon { path, margin } => polygon_distance(p, path) - margin,
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.distance_to_point(p) <= 0.0
    }

    /// Gap between two shapes, zero or negative when they overlap.
    pub fn distance(&self, other: &Shape) -> f64 {
        use Shape::*;
        match (self, other) {
            (Circle { center: c1, radius: r1 }, Circle { center: c2, radius: r2 }) => {
                c1.distance(c2) - r1 - r2
            }
            (Circle { center, radius }, Stadium { a, b, radius: r })
            | (Stadium { a, b, radius: r }, Circle { center, radius }) => {
                segment_distance(center, a, b) - radius - r
            }
            (Stadium { a: a1, b: b1, radius: r1 }, Stadium { a: a2, b: b2, radius: r2 }) => {
                segment_segment_distance(a1, b1, a2, b2) - r1 - r2
            }
            (Circle { center, radius }, Polygon { path, margin })
            | (Polygon { path, margin }, Circle { center, radius }) => {
                polygon_distance(center, path) - radius - margin
            }
            (Stadium { a, b, radius }, Polygon { path, margin })
            | (Polygon { path, margin }, Stadium { a, b, radius }) => {
                segment_polygon_distance(a, b, path) - radius - margin
            }
            (Polygon { path: p1, margin: m1 }, Polygon { path: p2, margin: m2 }) => {
                polygon_polygon_distance(p1, p2) - m1 - m2
            }
        }
    }
}

fn polygon_polygon_distance(p1: &[Point], p2: &[Point]) -> f64 {
    if p1.iter().any(|p| point_in_polygon(p, p2)) || p2.iter().any(|p| point_in_polygon(p, p1)) {
        return 0.0;
    }
    let n = p1.len();
    (0..n)
        .map(|i| segment_polygon_distance(&p1[i], &p1[(i + 1) % n], p2))
        .fold(f64::INFINITY, f64::min)
}
