//! A single cut piece and the coordinates that place it on the board.

use crate::boundary::compose;
use crate::curve::CurveTemplate;
use crate::raster::{RasterOptions, RasterStats, rasterize};
use crate::types::{BoardConfig, EdgeSet, GridCoord, RasterError, RgbaImage};

/// Read-only inputs shared by every piece of one board.
#[derive(Debug, Clone, Copy)]
pub struct CutContext<'a> {
    /// Sizing for every canvas.
    pub config: &'a BoardConfig,
    /// Tab outline scaled for `config`.
    pub template: &'a CurveTemplate,
    /// Image the pieces are cut from.
    pub source: &'a RgbaImage,
    /// Rasterization tunables.
    pub options: &'a RasterOptions,
}

/// One segmented jigsaw piece.
///
/// The canvas is `canvas_side` pixels square; the piece's own pixels are
/// opaque and everything else is transparent. [`origin`](Self::origin)
/// locates the canvas on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    coord: GridCoord,
    edges: EdgeSet,
    origin: (i64, i64),
    canvas: RgbaImage,
    stats: RasterStats,
}

impl Piece {
    /// Compose the boundary for `edges` and segment the piece at `coord`.
    ///
    /// # Errors
    ///
    /// Returns a [`PieceFailure`] carrying the rasterizer's error if the
    /// piece could not be segmented.
    pub fn cut(coord: GridCoord, edges: EdgeSet, ctx: &CutContext<'_>) -> Result<Self, PieceFailure> {
        let boundary = compose(&edges, ctx.template, ctx.config);
        let origin = piece_canvas_origin(coord, ctx.config);
        match rasterize(&boundary, ctx.source, origin, ctx.config, ctx.options) {
            Ok(raster) => Ok(Self {
                coord,
                edges,
                origin,
                canvas: raster.canvas,
                stats: raster.stats,
            }),
            Err(error) => Err(PieceFailure {
                coord,
                edges,
                error,
            }),
        }
    }

    /// Grid position.
    #[must_use]
    pub const fn coord(&self) -> GridCoord {
        self.coord
    }

    /// Edge polarities the piece was cut with.
    #[must_use]
    pub const fn edges(&self) -> EdgeSet {
        self.edges
    }

    /// Board-space position of the canvas's bottom-left pixel.
    #[must_use]
    pub const fn origin(&self) -> (i64, i64) {
        self.origin
    }

    /// The segmented canvas.
    #[must_use]
    pub const fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Counters from segmentation.
    #[must_use]
    pub const fn stats(&self) -> RasterStats {
        self.stats
    }

    /// Take ownership of the canvas.
    #[must_use]
    pub fn into_canvas(self) -> RgbaImage {
        self.canvas
    }
}

/// A piece whose segmentation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("piece {coord} failed: {error}")]
pub struct PieceFailure {
    /// Grid position.
    pub coord: GridCoord,
    /// Edge polarities the cut was attempted with.
    pub edges: EdgeSet,
    /// Why segmentation failed.
    #[source]
    pub error: RasterError,
}

/// Board-space position (y-up) of the bottom-left pixel of the canvas for
/// the piece at `coord`: `(i * S - P, j * S - P)`.
#[must_use]
pub fn piece_canvas_origin(coord: GridCoord, config: &BoardConfig) -> (i64, i64) {
    let size = i64::from(config.piece_size());
    let padding = i64::from(config.padding());
    (
        i64::from(coord.column) * size - padding,
        i64::from(coord.row) * size - padding,
    )
}

/// Image-space position (top-left, y-down) of the canvas for the piece at
/// `coord` on a source image `image_height` pixels tall.
///
/// Drawing each canvas unflipped at this position reassembles the image.
#[must_use]
pub fn piece_image_origin(coord: GridCoord, config: &BoardConfig, image_height: u32) -> (i64, i64) {
    let (x, y) = piece_canvas_origin(coord, config);
    let top = i64::from(image_height) - y - i64::from(config.canvas_side());
    (x, top)
}
