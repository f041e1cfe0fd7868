//! Board generation: topology, then every piece cut in parallel.

use log::{debug, warn};
use rand::Rng;
use rayon::prelude::*;

use crate::curve::CurveTemplate;
use crate::piece::{CutContext, Piece, PieceFailure, piece_image_origin};
use crate::raster::RasterOptions;
use crate::topology::{assign, assign_parallel, find_mismatch};
use crate::types::{
    BoardConfig, BoardError, EdgeDirection, EdgePolarity, EdgeSet, Grid, GridCoord, RgbaImage,
};

/// Cuts source images into boards of interlocking pieces.
///
/// Owns the config together with the curve template built for it, so the
/// two can only change together: [`set_config`](Self::set_config) takes
/// `&mut self` and rebuilds the template, while generation borrows `&self`.
#[derive(Debug, Clone)]
pub struct BoardGenerator {
    config: BoardConfig,
    template: CurveTemplate,
    options: RasterOptions,
}

impl BoardGenerator {
    /// Generator with the standard tab shape and default options.
    #[must_use]
    pub fn new(config: BoardConfig) -> Self {
        Self::with_options(config, RasterOptions::default())
    }

    /// Generator with the standard tab shape and explicit options.
    #[must_use]
    pub fn with_options(config: BoardConfig, options: RasterOptions) -> Self {
        let template = CurveTemplate::build(&config);
        Self {
            config,
            template,
            options,
        }
    }

    /// Generator with a caller-supplied tab outline, already in pixel
    /// units for `config`.
    #[must_use]
    pub const fn with_template(config: BoardConfig, template: CurveTemplate, options: RasterOptions) -> Self {
        Self {
            config,
            template,
            options,
        }
    }

    /// Replace the config and rebuild the standard template for it.
    pub fn set_config(&mut self, config: BoardConfig) {
        debug!("rebuilding curve template for piece size {}", config.piece_size());
        self.template = CurveTemplate::build(&config);
        self.config = config;
    }

    /// Replace the rasterization options.
    pub const fn set_options(&mut self, options: RasterOptions) {
        self.options = options;
    }

    /// Current config.
    #[must_use]
    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Template matching [`config`](Self::config).
    #[must_use]
    pub const fn template(&self) -> &CurveTemplate {
        &self.template
    }

    /// Current rasterization options.
    #[must_use]
    pub const fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Cut `source` into a `columns` by `rows` board, drawing tab
    /// orientations from `rng`.
    ///
    /// Per-piece segmentation failures do not abort generation; they are
    /// recorded in the returned [`Board`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfig`] if a dimension is zero or
    /// `source` is not exactly `columns * piece_size` by
    /// `rows * piece_size` pixels.
    pub fn generate_board<R: Rng + ?Sized>(
        &self,
        columns: u32,
        rows: u32,
        source: &RgbaImage,
        rng: &mut R,
    ) -> Result<Board, BoardError> {
        self.check_source(columns, rows, source)?;
        let topology = assign(columns, rows, rng)?;
        self.cut_board(topology, source)
    }

    /// Like [`generate_board`](Self::generate_board), but assigns the
    /// topology with [`assign_parallel`] from a plain seed.
    ///
    /// # Errors
    ///
    /// Same as [`generate_board`](Self::generate_board).
    pub fn generate_board_seeded(
        &self,
        columns: u32,
        rows: u32,
        source: &RgbaImage,
        seed: u64,
    ) -> Result<Board, BoardError> {
        self.check_source(columns, rows, source)?;
        let topology = assign_parallel(columns, rows, seed)?;
        self.cut_board(topology, source)
    }

    /// Cut every piece of an already assigned topology.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfig`] if `topology` has a
    /// non-complementary shared edge or a curved border edge, or if the
    /// source dimensions do not match the grid.
    pub fn cut_board(&self, topology: Grid<EdgeSet>, source: &RgbaImage) -> Result<Board, BoardError> {
        let (columns, rows) = (topology.columns(), topology.rows());
        self.check_source(columns, rows, source)?;
        if let Some((coord, direction)) = find_mismatch(&topology) {
            return Err(BoardError::InvalidConfig(format!(
                "edge {direction} of piece {coord} does not fit its neighbour",
            )));
        }

        let ctx = self.context(source);
        let outcomes: Vec<Result<Piece, PieceFailure>> = topology
            .cells()
            .par_iter()
            .enumerate()
            .map(|(i, &edges)| Piece::cut(topology.coord_of(i), edges, &ctx))
            .collect();
        for failure in outcomes.iter().filter_map(|o| o.as_ref().err()) {
            warn!("{failure}");
        }
        let Some(pieces) = Grid::from_cells(columns, rows, outcomes) else {
            return Err(BoardError::InvalidConfig(format!(
                "{columns}x{rows} board does not fit in memory",
            )));
        };

        debug!("cut {} pieces for {columns}x{rows} board", pieces.len());
        Ok(Board {
            config: self.config,
            topology,
            pieces,
        })
    }

    /// Draw fresh tab orientations for every interior edge of the piece at
    /// `coord` and re-cut it together with the neighbours sharing those
    /// edges.
    ///
    /// Neighbour edges are updated to stay complementary. Only use this on
    /// boards whose pieces have not been handed out yet.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfig`] if `coord` is outside the
    /// board, the board was cut with a different config, or `source` does
    /// not match its dimensions.
    pub fn redraw_piece<R: Rng + ?Sized>(
        &self,
        board: &mut Board,
        coord: GridCoord,
        source: &RgbaImage,
        rng: &mut R,
    ) -> Result<(), BoardError> {
        let (columns, rows) = (board.columns(), board.rows());
        if board.config != self.config {
            return Err(BoardError::InvalidConfig(format!(
                "board was cut with {} px pieces, generator uses {} px",
                board.config.piece_size(),
                self.config.piece_size(),
            )));
        }
        self.check_source(columns, rows, source)?;
        let Some(mut edges) = board.topology.get(coord).copied() else {
            return Err(BoardError::InvalidConfig(format!(
                "piece {coord} is outside the {columns}x{rows} board",
            )));
        };

        let mut affected = vec![coord];
        for direction in EdgeDirection::ALL {
            let Some(neighbor) = coord.neighbor(direction, columns, rows) else {
                continue;
            };
            let polarity = EdgePolarity::from_coin(rng.random_bool(0.5));
            edges.set(direction, polarity);
            if let Some(other) = board.topology.get_mut(neighbor) {
                other.set(direction.opposite(), polarity.complement());
            }
            affected.push(neighbor);
        }
        if let Some(cell) = board.topology.get_mut(coord) {
            *cell = edges;
        }

        let ctx = self.context(source);
        for target in affected {
            let Some(&target_edges) = board.topology.get(target) else {
                continue;
            };
            let outcome = Piece::cut(target, target_edges, &ctx);
            if let Err(failure) = &outcome {
                warn!("{failure}");
            }
            if let Some(cell) = board.pieces.get_mut(target) {
                *cell = outcome;
            }
        }
        debug!("redrew piece {coord}");
        Ok(())
    }

    fn context<'a>(&'a self, source: &'a RgbaImage) -> CutContext<'a> {
        CutContext {
            config: &self.config,
            template: &self.template,
            source,
            options: &self.options,
        }
    }

    fn check_source(&self, columns: u32, rows: u32, source: &RgbaImage) -> Result<(), BoardError> {
        let size = u64::from(self.config.piece_size());
        let expected = (u64::from(columns) * size, u64::from(rows) * size);
        let actual = (u64::from(source.width()), u64::from(source.height()));
        if actual != expected {
            return Err(BoardError::InvalidConfig(format!(
                "source image is {}x{}, a {columns}x{rows} board of {size} px pieces needs {}x{}",
                actual.0, actual.1, expected.0, expected.1,
            )));
        }
        Ok(())
    }
}

/// Result of cutting one source image.
///
/// Every grid cell holds either the finished piece or the reason it could
/// not be cut.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    config: BoardConfig,
    topology: Grid<EdgeSet>,
    pieces: Grid<Result<Piece, PieceFailure>>,
}

impl Board {
    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.topology.columns()
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.topology.rows()
    }

    /// Config the board was cut with.
    #[must_use]
    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Edge polarities of every piece.
    #[must_use]
    pub const fn topology(&self) -> &Grid<EdgeSet> {
        &self.topology
    }

    /// Outcome for the piece at `coord`.
    #[must_use]
    pub fn get(&self, coord: GridCoord) -> Option<&Result<Piece, PieceFailure>> {
        self.pieces.get(coord)
    }

    /// All outcomes, row by row.
    #[must_use]
    pub const fn outcomes(&self) -> &Grid<Result<Piece, PieceFailure>> {
        &self.pieces
    }

    /// Successfully cut pieces, row by row.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.cells().iter().filter_map(|o| o.as_ref().ok())
    }

    /// Pieces that failed, row by row.
    pub fn failures(&self) -> impl Iterator<Item = &PieceFailure> + '_ {
        self.pieces.cells().iter().filter_map(|o| o.as_ref().err())
    }

    /// Whether every piece was cut.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pieces.cells().iter().all(Result::is_ok)
    }

    /// All pieces, or the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PieceFailed`] for the first failed piece in
    /// row order.
    pub fn into_pieces(self) -> Result<Grid<Piece>, BoardError> {
        let (columns, rows) = (self.columns(), self.rows());
        let pieces = self
            .pieces
            .into_cells()
            .into_iter()
            .map(|outcome| {
                outcome.map_err(|failure| BoardError::PieceFailed {
                    coord: failure.coord,
                    source: failure.error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Grid::from_cells(columns, rows, pieces).ok_or_else(|| {
            BoardError::InvalidConfig(format!("{columns}x{rows} board lost pieces"))
        })
    }

    /// Composite every piece back onto a `columns * S` by `rows * S`
    /// transparent image.
    ///
    /// Opaque canvas pixels are copied to their board position; anything
    /// landing outside the image is dropped.
    #[must_use]
    pub fn assemble(&self) -> RgbaImage {
        let size = self.config.piece_size();
        let width = self.columns().saturating_mul(size);
        let height = self.rows().saturating_mul(size);
        let mut image = RgbaImage::new(width, height);
        for piece in self.pieces() {
            let (ox, oy) = piece_image_origin(piece.coord(), &self.config, height);
            for (x, y, pixel) in piece.canvas().enumerate_pixels() {
                if pixel.0[3] == 0 {
                    continue;
                }
                let tx = ox + i64::from(x);
                let ty = oy + i64::from(y);
                if let (Ok(tx), Ok(ty)) = (u32::try_from(tx), u32::try_from(ty))
                    && tx < width
                    && ty < height
                {
                    image.put_pixel(tx, ty, *pixel);
                }
            }
        }
        image
    }
}
