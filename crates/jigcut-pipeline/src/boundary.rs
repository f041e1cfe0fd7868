//! Boundary composition: place the curve template on each side of a piece.
//!
//! A piece canvas is `piece_size + 2 * padding` pixels square, with the
//! nominal tile occupying `[padding, padding + piece_size)` on both axes.
//! Every edge is drawn on the pixel line just outside the tile: row
//! `padding + piece_size` for the top, row `padding - 1` for the bottom,
//! and the matching columns for the sides. With that convention a piece
//! with four flat edges encloses exactly `piece_size²` pixels, and the two
//! sides of a shared edge land on adjacent pixel lines in board space.
//!
//! Curved edges map template point `(t, h)` to along-edge coordinate
//! `padding + t` and normal coordinate `base + sign * h`. Which base and
//! sign apply, and whether the axes are swapped, is looked up in
//! [`PLACEMENTS`] by direction and polarity.

use crate::curve::CurveTemplate;
use crate::types::{BoardConfig, EdgeDirection, EdgePolarity, EdgeSet, Point, Polyline};

/// How the template is laid onto one side of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgePlacement {
    /// Template `t` runs along y and `h` along x (left and right edges).
    swap_axes: bool,
    /// Edge sits on the far side of the tile (top or right).
    far_side: bool,
    /// Multiplier for the template height; `0.0` for flat edges.
    normal_sign: f64,
}

impl EdgePlacement {
    const fn new(swap_axes: bool, far_side: bool, normal_sign: f64) -> Self {
        Self {
            swap_axes,
            far_side,
            normal_sign,
        }
    }
}

/// Placement for every `(direction, polarity)` pair, indexed by
/// [`EdgeDirection::index`] then [`EdgePolarity::index`].
///
/// Positive edges point the tab away from the tile, negative edges into it.
const PLACEMENTS: [[EdgePlacement; 3]; 4] = [
    // Up
    [
        EdgePlacement::new(false, true, 1.0),
        EdgePlacement::new(false, true, -1.0),
        EdgePlacement::new(false, true, 0.0),
    ],
    // Down
    [
        EdgePlacement::new(false, false, -1.0),
        EdgePlacement::new(false, false, 1.0),
        EdgePlacement::new(false, false, 0.0),
    ],
    // Left
    [
        EdgePlacement::new(true, false, -1.0),
        EdgePlacement::new(true, false, 1.0),
        EdgePlacement::new(true, false, 0.0),
    ],
    // Right
    [
        EdgePlacement::new(true, true, 1.0),
        EdgePlacement::new(true, true, -1.0),
        EdgePlacement::new(true, true, 0.0),
    ],
];

const fn placement(direction: EdgeDirection, polarity: EdgePolarity) -> EdgePlacement {
    PLACEMENTS[direction.index()][polarity.index()]
}

/// Boundary sample points of one piece, one polyline per side, in
/// canvas-local continuous coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    edges: [Polyline; 4],
    tab_area: f64,
}

impl Boundary {
    /// Assemble a boundary from explicit per-side polylines, indexed by
    /// [`EdgeDirection::index`].
    ///
    /// `tab_area` is the area a single tab adds to the piece; it bounds
    /// how many pixels a correct fill may cover.
    #[must_use]
    pub const fn from_edges(edges: [Polyline; 4], tab_area: f64) -> Self {
        Self { edges, tab_area }
    }

    /// Points of the side facing `direction`.
    #[must_use]
    pub const fn edge(&self, direction: EdgeDirection) -> &Polyline {
        &self.edges[direction.index()]
    }

    /// All points, side by side in [`EdgeDirection::ALL`] order.
    pub fn points(&self) -> impl Iterator<Item = &Point> + '_ {
        self.edges.iter().flat_map(Polyline::points)
    }

    /// Total number of points over all four sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.iter().map(Polyline::len).sum()
    }

    /// Returns `true` if no side has any points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.iter().all(Polyline::is_empty)
    }

    /// Area of one tab of the template this boundary was built from.
    #[must_use]
    pub const fn tab_area(&self) -> f64 {
        self.tab_area
    }
}

/// Build the boundary of a piece with the given edge polarities.
#[must_use]
pub fn compose(edges: &EdgeSet, template: &CurveTemplate, config: &BoardConfig) -> Boundary {
    let sides = EdgeDirection::ALL.map(|d| compose_edge(d, edges.get(d), template, config));
    Boundary::from_edges(sides, template.tab_area())
}

/// Build the points of a single side.
///
/// Flat sides are a straight run of `piece_size` points, one per tile
/// pixel. Curved sides are the template, mirrored for pockets and
/// transposed for left and right.
#[must_use]
pub fn compose_edge(
    direction: EdgeDirection,
    polarity: EdgePolarity,
    template: &CurveTemplate,
    config: &BoardConfig,
) -> Polyline {
    let placement = placement(direction, polarity);
    let size = f64::from(config.piece_size());
    let padding = f64::from(config.padding());
    let base = if placement.far_side {
        padding + size
    } else {
        padding - 1.0
    };
    let place = |along: f64, normal: f64| {
        if placement.swap_axes {
            Point::new(normal, along)
        } else {
            Point::new(along, normal)
        }
    };

    let points = match polarity {
        EdgePolarity::Flat => (0..config.piece_size())
            .map(|k| place(padding + f64::from(k), base))
            .collect(),
        EdgePolarity::Positive | EdgePolarity::Negative => template
            .points()
            .iter()
            .map(|p| place(padding + p.x, placement.normal_sign.mul_add(p.y, base)))
            .collect(),
    };
    Polyline::new(points)
}
