//! Segmentation: turn a piece boundary into a filled, transparent-backed
//! canvas.
//!
//! Boundary points are rounded onto a transient obstacle grid, then a
//! 4-connected flood fill from the canvas center copies source pixels
//! into the canvas until it runs into the obstacles. Pixels the fill never
//! reaches stay fully transparent.
//!
//! Canvas coordinates are y-up like the board: canvas row `y` is stored at
//! image row `side - 1 - y`.

use image::Rgba;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::boundary::Boundary;
use crate::types::{BoardConfig, RasterError, RgbaImage};

/// What to do with a boundary point that rounds outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClampPolicy {
    /// Pull the point onto the nearest canvas pixel and keep going.
    #[default]
    Clamp,
    /// Fail the piece with [`RasterError::PointOutOfCanvas`].
    Reject,
}

/// Tunables for [`rasterize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RasterOptions {
    /// Handling of out-of-canvas boundary points.
    pub clamp_policy: ClampPolicy,
}

impl RasterOptions {
    /// Options that reject out-of-canvas points instead of clamping them.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            clamp_policy: ClampPolicy::Reject,
        }
    }
}

/// Counters collected while segmenting one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RasterStats {
    /// Pixels copied from the source.
    pub filled_pixels: u64,
    /// Distinct canvas pixels marked as boundary.
    pub obstacle_pixels: u64,
    /// Boundary points pulled back inside the canvas.
    pub clamped_points: u64,
}

/// A segmented piece canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// `canvas_side` square image; unfilled pixels are transparent.
    pub canvas: RgbaImage,
    /// Counters from the fill.
    pub stats: RasterStats,
}

/// Flood-fill the region enclosed by `boundary` and copy source pixels
/// into a fresh canvas.
///
/// `source_origin` is the board-space position of canvas pixel `(0, 0)`.
/// Source reads outside the image are clamped to its nearest edge pixel.
///
/// # Errors
///
/// - [`RasterError::EmptySource`] if `source` has no pixels.
/// - [`RasterError::PointOutOfCanvas`] under [`ClampPolicy::Reject`].
/// - [`RasterError::CenterBlocked`] if the seed pixel is on the boundary.
/// - [`RasterError::BoundaryLeak`] if the fill reaches the outer canvas
///   ring or covers more pixels than any well-formed piece could.
pub fn rasterize(
    boundary: &Boundary,
    source: &RgbaImage,
    source_origin: (i64, i64),
    config: &BoardConfig,
    options: &RasterOptions,
) -> Result<Raster, RasterError> {
    if source.width() == 0 || source.height() == 0 {
        return Err(RasterError::EmptySource);
    }

    let side = config.canvas_side();
    let mut grid = CellGrid::new(side);
    let mut stats = RasterStats::default();

    for point in boundary.points() {
        let (x, y, clamped) = snap(point.x, point.y, side, options.clamp_policy)?;
        if clamped {
            stats.clamped_points += 1;
        }
        let i = grid.index(x, y);
        if !grid.obstacle[i] {
            grid.obstacle[i] = true;
            stats.obstacle_pixels += 1;
        }
    }
    if stats.clamped_points > 0 {
        warn!(
            "{} boundary points fell outside the {side}x{side} canvas and were clamped",
            stats.clamped_points,
        );
    }

    let seed = side / 2;
    if grid.obstacle[grid.index(seed, seed)] {
        return Err(RasterError::CenterBlocked { x: seed, y: seed });
    }

    let max_expected = max_fill_area(config, boundary.tab_area());
    let mut canvas = RgbaImage::new(side, side);
    let mut stack = vec![(seed, seed)];
    let seed_index = grid.index(seed, seed);
    grid.visited[seed_index] = true;

    while let Some((x, y)) = stack.pop() {
        let touched_border = x == 0 || y == 0 || x == side - 1 || y == side - 1;
        stats.filled_pixels += 1;
        if touched_border || stats.filled_pixels > max_expected {
            return Err(RasterError::BoundaryLeak {
                filled: stats.filled_pixels,
                max_expected,
                touched_border,
            });
        }

        let pixel = sample(
            source,
            source_origin.0 + i64::from(x),
            source_origin.1 + i64::from(y),
        );
        canvas.put_pixel(x, side - 1 - y, pixel);

        // Not on the outer ring, so all four neighbours are in bounds.
        for (nx, ny) in [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)] {
            let i = grid.index(nx, ny);
            if !grid.visited[i] && !grid.obstacle[i] {
                grid.visited[i] = true;
                stack.push((nx, ny));
            }
        }
    }

    Ok(Raster { canvas, stats })
}

/// Largest pixel count a correctly segmented piece can reach: the tile,
/// four tabs, and one pixel of rounding slack per tile pixel along each
/// side.
#[must_use]
pub fn max_fill_area(config: &BoardConfig, tab_area: f64) -> u64 {
    let size = u64::from(config.piece_size());
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let tabs = (4.0 * tab_area.max(0.0)).ceil() as u64;
    size * size + tabs + 4 * (size + 1)
}

/// Obstacle and visited flags for one canvas, dropped with the call.
struct CellGrid {
    side: u32,
    obstacle: Vec<bool>,
    visited: Vec<bool>,
}

impl CellGrid {
    fn new(side: u32) -> Self {
        let len = side as usize * side as usize;
        Self {
            side,
            obstacle: vec![false; len],
            visited: vec![false; len],
        }
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.side as usize + x as usize
    }
}

/// Round a boundary point to a canvas pixel.
///
/// Returns the pixel and whether it had to be clamped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn snap(x: f64, y: f64, side: u32, policy: ClampPolicy) -> Result<(u32, u32, bool), RasterError> {
    let max = i64::from(side) - 1;
    // Saturating float casts; anything beyond i64 is out of range anyway.
    let (rx, ry) = (x.round() as i64, y.round() as i64);
    let inside = (0..=max).contains(&rx) && (0..=max).contains(&ry);
    if !inside && policy == ClampPolicy::Reject {
        return Err(RasterError::PointOutOfCanvas { x: rx, y: ry, side });
    }
    // Clamped into [0, side - 1], which fits in u32.
    Ok((rx.clamp(0, max) as u32, ry.clamp(0, max) as u32, !inside))
}

/// Source pixel at board position `(bx, by)`, clamped into the image and
/// made fully opaque.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample(source: &RgbaImage, bx: i64, by: i64) -> Rgba<u8> {
    let width = i64::from(source.width());
    let height = i64::from(source.height());
    let x = bx.clamp(0, width - 1);
    let y = by.clamp(0, height - 1);
    // Board y grows upward; image rows grow downward.
    let row = height - 1 - y;
    let Rgba([r, g, b, _]) = *source.get_pixel(x as u32, row as u32);
    Rgba([r, g, b, 255])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::boundary::compose;
    use crate::curve::CurveTemplate;
    use crate::types::{EdgeDirection, EdgePolarity, EdgeSet, Point, Polyline};

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 7, 200])
        })
    }

    fn cut(size: u32, edges: EdgeSet) -> Result<Raster, RasterError> {
        let config = BoardConfig::new(size).unwrap();
        let template = CurveTemplate::build(&config);
        let boundary = compose(&edges, &template, &config);
        let source = gradient(size * 3, size * 3);
        // Piece (1, 1) of a 3x3 board.
        let offset = i64::from(size) - i64::from(config.padding());
        let origin = (offset, offset);
        rasterize(&boundary, &source, origin, &config, &RasterOptions::default())
    }

    fn opaque(raster: &Raster) -> u64 {
        raster.canvas.pixels().filter(|p| p.0[3] == 255).count() as u64
    }

    #[test]
    fn flat_piece_fills_exactly_the_tile() {
        for size in [1, 2, 3, 5, 10, 33, 100] {
            let raster = cut(size, EdgeSet::FLAT).unwrap();
            let expected = u64::from(size) * u64::from(size);
            assert_eq!(raster.stats.filled_pixels, expected, "size {size}");
            assert_eq!(opaque(&raster), expected, "size {size}");
            assert_eq!(raster.stats.clamped_points, 0);
        }
    }

    #[test]
    fn flat_piece_covers_the_tile_square() {
        let config = BoardConfig::new(10).unwrap();
        let raster = cut(10, EdgeSet::FLAT).unwrap();
        let side = config.canvas_side();
        let p = config.padding();
        for row in 0..side {
            for x in 0..side {
                let y = side - 1 - row;
                let inside = (p..p + 10).contains(&x) && (p..p + 10).contains(&y);
                let alpha = raster.canvas.get_pixel(x, row).0[3];
                assert_eq!(alpha == 255, inside, "({x}, {y})");
                if !inside {
                    assert_eq!(alpha, 0);
                }
            }
        }
    }

    #[test]
    fn smallest_piece_terminates() {
        let raster = cut(1, EdgeSet::FLAT).unwrap();
        assert_eq!(raster.canvas.dimensions(), (5, 5));
        assert_eq!(raster.stats.filled_pixels, 1);
    }

    #[test]
    fn curved_piece_area_tracks_tab_count() {
        let size = 100;
        let config = BoardConfig::new(size).unwrap();
        let tab = CurveTemplate::build(&config).tab_area();
        let edges = EdgeSet::new(
            EdgePolarity::Positive,
            EdgePolarity::Negative,
            EdgePolarity::Positive,
            EdgePolarity::Positive,
        );
        let raster = cut(size, edges).unwrap();
        #[allow(clippy::cast_precision_loss)]
        let filled = raster.stats.filled_pixels as f64;
        let expected = 10_000.0 + 2.0 * tab;
        assert!((filled - expected).abs() <= 4.0 * 101.0, "{filled} vs {expected}");
    }

    #[test]
    fn fill_copies_source_pixels_opaque() {
        let size = 10;
        let config = BoardConfig::new(size).unwrap();
        let template = CurveTemplate::build(&config);
        let boundary = compose(&EdgeSet::FLAT, &template, &config);
        let source = gradient(30, 30);
        // Canvas origin for piece (1, 1): (10 - 2, 10 - 2).
        let raster = rasterize(&boundary, &source, (8, 8), &config, &RasterOptions::default()).unwrap();
        // Canvas (2, 2) is board (10, 10), image row 30 - 1 - 10 = 19.
        let side = config.canvas_side();
        let got = raster.canvas.get_pixel(2, side - 1 - 2);
        assert_eq!(got, &Rgba([10, 19, 7, 255]));
    }

    #[test]
    fn rasterize_is_deterministic() {
        let edges = EdgeSet::new(
            EdgePolarity::Negative,
            EdgePolarity::Positive,
            EdgePolarity::Negative,
            EdgePolarity::Positive,
        );
        let a = cut(57, edges).unwrap();
        let b = cut(57, edges).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn gapped_boundary_leaks() {
        let config = BoardConfig::new(20).unwrap();
        let template = CurveTemplate::build(&config);
        let mut edges = EdgeDirection::ALL
            .map(|d| crate::boundary::compose_edge(d, EdgePolarity::Flat, &template, &config));
        // Drop the middle of the top edge.
        let top: Vec<Point> = edges[EdgeDirection::Up.index()]
            .points()
            .iter()
            .enumerate()
            .filter(|(i, _)| !(8..12).contains(i))
            .map(|(_, p)| *p)
            .collect();
        edges[EdgeDirection::Up.index()] = Polyline::new(top);
        let boundary = Boundary::from_edges(edges, template.tab_area());
        let source = gradient(20, 20);
        let err = rasterize(&boundary, &source, (0, 0), &config, &RasterOptions::default()).unwrap_err();
        assert!(matches!(err, RasterError::BoundaryLeak { .. }), "{err}");
    }

    #[test]
    fn blocked_center_is_reported() {
        let config = BoardConfig::new(10).unwrap();
        let side = config.canvas_side();
        let center = f64::from(side / 2);
        let edges = [
            Polyline::new(vec![Point::new(center, center)]),
            Polyline::new(vec![]),
            Polyline::new(vec![]),
            Polyline::new(vec![]),
        ];
        let boundary = Boundary::from_edges(edges, 0.0);
        let err = rasterize(&boundary, &gradient(10, 10), (0, 0), &config, &RasterOptions::default()).unwrap_err();
        assert_eq!(err, RasterError::CenterBlocked { x: side / 2, y: side / 2 });
    }

    #[test]
    fn out_of_canvas_points_clamp_or_reject() {
        let config = BoardConfig::new(10).unwrap();
        let template = CurveTemplate::build(&config);
        let mut boundary_edges = EdgeDirection::ALL
            .map(|d| crate::boundary::compose_edge(d, EdgePolarity::Flat, &template, &config));
        let mut left = boundary_edges[EdgeDirection::Left.index()].points().to_vec();
        left.push(Point::new(-3.0, 5.0));
        boundary_edges[EdgeDirection::Left.index()] = Polyline::new(left);
        let boundary = Boundary::from_edges(boundary_edges, 0.0);
        let source = gradient(10, 10);

        let clamped = rasterize(&boundary, &source, (0, 0), &config, &RasterOptions::default()).unwrap();
        assert_eq!(clamped.stats.clamped_points, 1);
        assert_eq!(clamped.stats.filled_pixels, 100);

        let err = rasterize(&boundary, &source, (0, 0), &config, &RasterOptions::strict()).unwrap_err();
        assert_eq!(err, RasterError::PointOutOfCanvas { x: -3, y: 5, side: 14 });
    }

    #[test]
    fn empty_source_is_rejected() {
        let config = BoardConfig::new(4).unwrap();
        let template = CurveTemplate::build(&config);
        let boundary = compose(&EdgeSet::FLAT, &template, &config);
        let err = rasterize(&boundary, &RgbaImage::new(0, 0), (0, 0), &config, &RasterOptions::default()).unwrap_err();
        assert_eq!(err, RasterError::EmptySource);
    }

    #[test]
    fn max_fill_area_bound() {
        let config = BoardConfig::new(10).unwrap();
        assert_eq!(max_fill_area(&config, 0.0), 100 + 44);
        assert_eq!(max_fill_area(&config, 2.5), 100 + 10 + 44);
    }
}
