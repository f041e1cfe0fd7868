//! Curve template: the canonical tab outline, scaled to the piece size.
//!
//! The base curve is a chain of cubic Bézier segments authored for a
//! [`REFERENCE_PIECE_SIZE`](crate::types::REFERENCE_PIECE_SIZE) tile. It
//! runs along a baseline from `(0, 0)` to `(100, 0)` and bulges toward
//! `+y` into a rounded tab with a slightly overhanging neck.
//!
//! Each segment is evaluated at [`SAMPLES_PER_SEGMENT`] evenly spaced
//! parameter values regardless of piece size, then every sample is
//! multiplied by the config's scale. The template is rebuilt from
//! scratch for every new [`BoardConfig`]; it is never rescaled in place.

use crate::types::{BoardConfig, Point};

/// Parametric samples taken from each Bézier segment.
///
/// At this density consecutive points of the reference curve are about
/// 0.07 units apart, so they stay within one pixel of each other up to
/// [`MAX_PIECE_SIZE`](crate::types::MAX_PIECE_SIZE).
pub const SAMPLES_PER_SEGMENT: usize = 1024;

/// Control points of the base tab curve, in reference-size units.
const BASE_CURVE: [[Point; 4]; 4] = [
    [
        Point::new(0.0, 0.0),
        Point::new(24.0, -3.0),
        Point::new(42.0, -4.0),
        Point::new(38.0, 5.0),
    ],
    [
        Point::new(38.0, 5.0),
        Point::new(32.0, 11.0),
        Point::new(33.0, 18.0),
        Point::new(50.0, 18.0),
    ],
    [
        Point::new(50.0, 18.0),
        Point::new(67.0, 18.0),
        Point::new(68.0, 11.0),
        Point::new(62.0, 5.0),
    ],
    [
        Point::new(62.0, 5.0),
        Point::new(58.0, -4.0),
        Point::new(76.0, -3.0),
        Point::new(100.0, 0.0),
    ],
];

/// Ordered points of one tab outline at a particular scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveTemplate {
    points: Vec<Point>,
    scale: f64,
}

impl CurveTemplate {
    /// Sample the base curve and scale it for `config`.
    #[must_use]
    pub fn build(config: &BoardConfig) -> Self {
        let scale = config.scale();
        let points = sample_base_curve()
            .into_iter()
            .map(|p| p.scaled(scale))
            .collect();
        Self { points, scale }
    }

    /// The unscaled base curve, as authored for the reference size.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            points: sample_base_curve(),
            scale: 1.0,
        }
    }

    /// Wrap an arbitrary point sequence as a template.
    ///
    /// The points are used as-is (already in pixel units). Useful for
    /// experimenting with other tab shapes; malformed shapes surface as
    /// per-piece segmentation failures.
    #[must_use]
    pub const fn from_points(points: Vec<Point>) -> Self {
        Self { points, scale: 1.0 }
    }

    /// The template points, from the start of the edge to its end.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the template has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Factor the base curve was multiplied by.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Area enclosed between the curve and its baseline chord.
    ///
    /// Shoelace formula over the outline closed back to its first point.
    /// A tab adds roughly this many pixels to a piece and a pocket
    /// removes them.
    #[must_use]
    pub fn tab_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice_area: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x.mul_add(b.y, -(b.x * a.y))
            })
            .sum();
        twice_area.abs() / 2.0
    }

    /// Largest distance between consecutive points.
    #[must_use]
    pub fn max_step(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .fold(0.0, f64::max)
    }

    /// Largest distance of any point from the baseline, on either side.
    #[must_use]
    pub fn max_height(&self) -> f64 {
        self.points.iter().map(|p| p.y.abs()).fold(0.0, f64::max)
    }
}

/// Evaluate a cubic Bézier segment at parameter `t` in `[0, 1]`.
fn cubic_point(segment: &[Point; 4], t: f64) -> Point {
    let u = 1.0 - t;
    let w0 = u * u * u;
    let w1 = 3.0 * u * u * t;
    let w2 = 3.0 * u * t * t;
    let w3 = t * t * t;
    let [p0, p1, p2, p3] = segment;
    Point::new(
        w0 * p0.x + w1 * p1.x + w2 * p2.x + w3 * p3.x,
        w0 * p0.y + w1 * p1.y + w2 * p2.y + w3 * p3.y,
    )
}

/// Sample every segment of [`BASE_CURVE`] at a fixed parametric step.
///
/// Segment joints are emitted once; the final endpoint is included.
#[allow(clippy::cast_precision_loss)]
fn sample_base_curve() -> Vec<Point> {
    let mut points = Vec::with_capacity(BASE_CURVE.len() * SAMPLES_PER_SEGMENT + 1);
    for segment in &BASE_CURVE {
        for k in 0..SAMPLES_PER_SEGMENT {
            let t = k as f64 / SAMPLES_PER_SEGMENT as f64;
            points.push(cubic_point(segment, t));
        }
    }
    if let Some(last) = BASE_CURVE.last() {
        points.push(last[3]);
    }
    points
}
