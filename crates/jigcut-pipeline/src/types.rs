//! Shared types for the jigcut piece generation pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand in source images
/// and read piece canvases without depending on `image` directly.
pub use image::RgbaImage;

/// Piece size the base tab curve was authored for.
pub const REFERENCE_PIECE_SIZE: u32 = 100;

/// Lower bound on the interlock margin around each piece.
pub const MIN_PADDING: u32 = 2;

/// Largest supported piece size.
///
/// The base curve is sampled at a fixed parametric resolution; above this
/// size consecutive template points would land more than one pixel apart
/// and the rasterized boundary could have gaps.
pub const MAX_PIECE_SIZE: u32 = 1024;

/// A 2D point in continuous canvas or board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position (grows upward in board space).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Multiply both coordinates by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Distance from the template's local origin.
    #[must_use]
    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A sequence of connected points forming a path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }
}

/// Position of a piece in the board grid.
///
/// `column` grows to the right and `row` grows upward: row 0 is the
/// bottom row of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column index `i`, in `[0, columns)`.
    pub column: u32,
    /// Row index `j`, in `[0, rows)`.
    pub row: u32,
}

impl GridCoord {
    /// Create a new grid coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// The neighbouring cell across `direction`, if it lies inside a grid
    /// of `columns` by `rows`.
    #[must_use]
    pub fn neighbor(self, direction: EdgeDirection, columns: u32, rows: u32) -> Option<Self> {
        let (column, row) = match direction {
            EdgeDirection::Up => (Some(self.column), self.row.checked_add(1)),
            EdgeDirection::Down => (Some(self.column), self.row.checked_sub(1)),
            EdgeDirection::Left => (self.column.checked_sub(1), Some(self.row)),
            EdgeDirection::Right => (self.column.checked_add(1), Some(self.row)),
        };
        let neighbor = Self::new(column?, row?);
        (neighbor.column < columns && neighbor.row < rows).then_some(neighbor)
    }

    /// Whether the edge of this cell facing `direction` is on the outer
    /// border of a `columns` by `rows` grid.
    #[must_use]
    pub const fn is_border(self, direction: EdgeDirection, columns: u32, rows: u32) -> bool {
        match direction {
            EdgeDirection::Up => self.row + 1 >= rows,
            EdgeDirection::Down => self.row == 0,
            EdgeDirection::Left => self.column == 0,
            EdgeDirection::Right => self.column + 1 >= columns,
        }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// One of the four sides of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeDirection {
    /// Top side (toward larger rows).
    Up,
    /// Bottom side (toward row 0).
    Down,
    /// Left side (toward column 0).
    Left,
    /// Right side (toward larger columns).
    Right,
}

impl EdgeDirection {
    /// All directions, in index order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Position of this direction in [`Self::ALL`], for array indexing.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// The side of the neighbouring piece that shares this edge.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// Shape of a single piece edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgePolarity {
    /// Tab protruding out of the piece.
    Positive,
    /// Pocket receding into the piece.
    Negative,
    /// Straight edge; only used on the outer border of the board.
    #[default]
    Flat,
}

impl EdgePolarity {
    /// Position of this polarity for lookup-table indexing.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Negative => 1,
            Self::Flat => 2,
        }
    }

    /// The shape the neighbouring piece needs on the shared edge.
    ///
    /// `Flat` has no neighbour and maps to itself.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
            Self::Flat => Self::Flat,
        }
    }

    /// Tab or pocket from an unbiased coin flip.
    #[must_use]
    pub const fn from_coin(heads: bool) -> Self {
        if heads { Self::Positive } else { Self::Negative }
    }
}

/// Polarities of the four edges of one piece, indexed by [`EdgeDirection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeSet([EdgePolarity; 4]);

impl EdgeSet {
    /// All four edges flat.
    pub const FLAT: Self = Self([EdgePolarity::Flat; 4]);

    /// Build an edge set from explicit polarities.
    #[must_use]
    pub const fn new(up: EdgePolarity, down: EdgePolarity, left: EdgePolarity, right: EdgePolarity) -> Self {
        Self([up, down, left, right])
    }

    /// Polarity of the edge facing `direction`.
    #[must_use]
    pub const fn get(&self, direction: EdgeDirection) -> EdgePolarity {
        self.0[direction.index()]
    }

    /// Replace the polarity of the edge facing `direction`.
    pub const fn set(&mut self, direction: EdgeDirection, polarity: EdgePolarity) {
        self.0[direction.index()] = polarity;
    }

    /// Iterate `(direction, polarity)` pairs in [`EdgeDirection::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeDirection, EdgePolarity)> + '_ {
        EdgeDirection::ALL.into_iter().map(|d| (d, self.get(d)))
    }

    /// Number of edges with the given polarity.
    #[must_use]
    pub fn count(&self, polarity: EdgePolarity) -> usize {
        self.0.iter().filter(|&&p| p == polarity).count()
    }
}

/// Dense `columns` by `rows` grid, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    columns: u32,
    rows: u32,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid by calling `f` for every coordinate.
    pub fn from_fn(columns: u32, rows: u32, mut f: impl FnMut(GridCoord) -> T) -> Self {
        let mut cells = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                cells.push(f(GridCoord::new(column, row)));
            }
        }
        Self {
            columns,
            rows,
            cells,
        }
    }

    /// Build a grid from cells already laid out row by row.
    ///
    /// Returns `None` if `cells.len() != columns * rows`.
    #[must_use]
    pub fn from_cells(columns: u32, rows: u32, cells: Vec<T>) -> Option<Self> {
        (cells.len() == columns as usize * rows as usize).then_some(Self {
            columns,
            rows,
            cells,
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `coord` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, coord: GridCoord) -> bool {
        coord.column < self.columns && coord.row < self.rows
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.row as usize * self.columns as usize + coord.column as usize)
    }

    /// Coordinate of the cell stored at `index`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn coord_of(&self, index: usize) -> GridCoord {
        let columns = self.columns as usize;
        // Both quotient and remainder are bounded by u32 grid dimensions.
        GridCoord::new((index % columns) as u32, (index / columns) as u32)
    }

    /// The cell at `coord`, if inside the grid.
    #[must_use]
    pub fn get(&self, coord: GridCoord) -> Option<&T> {
        self.index(coord).map(|i| &self.cells[i])
    }

    /// Mutable access to the cell at `coord`, if inside the grid.
    pub fn get_mut(&mut self, coord: GridCoord) -> Option<&mut T> {
        self.index(coord).map(|i| &mut self.cells[i])
    }

    /// All cells, row by row.
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Iterate `(coord, cell)` pairs row by row.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (self.coord_of(i), cell))
    }

    /// Apply `f` to every cell, keeping the layout.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Grid<U> {
        Grid {
            columns: self.columns,
            rows: self.rows,
            cells: self.cells.into_iter().map(f).collect(),
        }
    }

    /// Consume the grid and return its cells, row by row.
    #[must_use]
    pub fn into_cells(self) -> Vec<T> {
        self.cells
    }
}

/// Immutable sizing parameters shared by every stage of board generation.
///
/// Constructed through [`BoardConfig::new`], which validates the piece
/// size and derives the padding, so a config in hand is always usable.
/// Deserialization goes through the same validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BoardConfigProxy", into = "BoardConfigProxy")]
pub struct BoardConfig {
    piece_size: u32,
    padding: u32,
    reference_size: u32,
}

impl BoardConfig {
    /// Validate `piece_size` and derive the padding for it.
    ///
    /// Padding is `max(2, round(0.2 * piece_size))`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfig`] if `piece_size` is zero or
    /// larger than [`MAX_PIECE_SIZE`].
    pub fn new(piece_size: u32) -> Result<Self, BoardError> {
        if piece_size == 0 {
            return Err(BoardError::InvalidConfig(
                "piece size must be positive".to_string(),
            ));
        }
        if piece_size > MAX_PIECE_SIZE {
            return Err(BoardError::InvalidConfig(format!(
                "piece size {piece_size} exceeds the maximum of {MAX_PIECE_SIZE}",
            )));
        }
        Ok(Self {
            piece_size,
            padding: padding_for(piece_size),
            reference_size: REFERENCE_PIECE_SIZE,
        })
    }

    /// Tile dimension in source-image pixels.
    #[must_use]
    pub const fn piece_size(&self) -> u32 {
        self.piece_size
    }

    /// Interlock margin on every side of the nominal tile.
    #[must_use]
    pub const fn padding(&self) -> u32 {
        self.padding
    }

    /// Piece size the base curve was authored for.
    #[must_use]
    pub const fn reference_size(&self) -> u32 {
        self.reference_size
    }

    /// Side length of every piece canvas: `piece_size + 2 * padding`.
    #[must_use]
    pub const fn canvas_side(&self) -> u32 {
        self.piece_size + 2 * self.padding
    }

    /// Factor applied to the base curve: `piece_size / reference_size`.
    #[must_use]
    pub fn scale(&self) -> f64 {
        f64::from(self.piece_size) / f64::from(self.reference_size)
    }
}

/// `max(MIN_PADDING, round(piece_size / 5))` without going through floats.
const fn padding_for(piece_size: u32) -> u32 {
    let rounded = (piece_size + 2) / 5;
    if rounded < MIN_PADDING {
        MIN_PADDING
    } else {
        rounded
    }
}

/// Serialized form of [`BoardConfig`]; everything else is derived.
#[derive(Serialize, Deserialize)]
struct BoardConfigProxy {
    piece_size: u32,
}

impl TryFrom<BoardConfigProxy> for BoardConfig {
    type Error = BoardError;

    fn try_from(proxy: BoardConfigProxy) -> Result<Self, Self::Error> {
        Self::new(proxy.piece_size)
    }
}

impl From<BoardConfig> for BoardConfigProxy {
    fn from(config: BoardConfig) -> Self {
        Self {
            piece_size: config.piece_size,
        }
    }
}

/// Per-piece segmentation failures.
///
/// Any of these means the piece's mask cannot be trusted; the piece is
/// reported as failed instead of being shipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    /// The flood fill escaped the boundary.
    #[error(
        "flood fill leaked out of the piece boundary ({filled} pixels filled, at most {max_expected} expected, border reached: {touched_border})"
    )]
    BoundaryLeak {
        /// Pixels filled before the fill stopped.
        filled: u64,
        /// Upper bound on the area of a well-formed piece.
        max_expected: u64,
        /// Whether the fill reached the outermost canvas ring.
        touched_border: bool,
    },

    /// The fill seed is itself a boundary pixel.
    #[error("canvas center ({x}, {y}) lies on the piece boundary")]
    CenterBlocked {
        /// Seed column.
        x: u32,
        /// Seed row.
        y: u32,
    },

    /// A boundary point rounded outside the canvas under
    /// [`ClampPolicy::Reject`](crate::raster::ClampPolicy::Reject).
    #[error("boundary point ({x}, {y}) lies outside the {side}x{side} canvas")]
    PointOutOfCanvas {
        /// Rounded column.
        x: i64,
        /// Rounded row.
        y: i64,
        /// Canvas side length.
        side: u32,
    },

    /// The source image has no pixels to sample.
    #[error("source image is empty")]
    EmptySource,
}

/// Errors that abort board generation as a whole.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Piece size, grid dimensions or source dimensions are unusable.
    #[error("invalid board configuration: {0}")]
    InvalidConfig(String),

    /// A piece could not be cut and the caller asked for a complete board.
    #[error("piece {coord} could not be cut: {source}")]
    PieceFailed {
        /// Grid position of the failed piece.
        coord: GridCoord,
        /// Why segmentation failed.
        source: RasterError,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- BoardConfig ---

    #[test]
    fn config_padding_is_twenty_percent() {
        let config = BoardConfig::new(100).unwrap();
        assert_eq!(config.padding(), 20);
        assert_eq!(config.canvas_side(), 140);
        assert_eq!(config.reference_size(), REFERENCE_PIECE_SIZE);
    }

    #[test]
    fn config_padding_rounds_to_nearest() {
        // 0.2 * 13 = 2.6 rounds up, 0.2 * 17 = 3.4 rounds down.
        assert_eq!(BoardConfig::new(13).unwrap().padding(), 3);
        assert_eq!(BoardConfig::new(17).unwrap().padding(), 3);
        assert_eq!(BoardConfig::new(18).unwrap().padding(), 4);
        assert_eq!(BoardConfig::new(64).unwrap().padding(), 13);
    }

    #[test]
    fn config_padding_floors_at_two() {
        for size in 1..=12 {
            assert_eq!(BoardConfig::new(size).unwrap().padding(), 2, "size {size}");
        }
        let tiny = BoardConfig::new(1).unwrap();
        assert_eq!(tiny.canvas_side(), 5);
    }

    #[test]
    fn config_rejects_zero() {
        assert!(matches!(
            BoardConfig::new(0),
            Err(BoardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_rejects_oversized_pieces() {
        assert!(BoardConfig::new(MAX_PIECE_SIZE).is_ok());
        assert!(matches!(
            BoardConfig::new(MAX_PIECE_SIZE + 1),
            Err(BoardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_scale() {
        let config = BoardConfig::new(250).unwrap();
        assert!((config.scale() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = BoardConfig::new(48).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"piece_size":48}"#);
        let back: BoardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn config_deserialize_validates() {
        let result: Result<BoardConfig, _> = serde_json::from_str(r#"{"piece_size":0}"#);
        assert!(result.is_err());
    }

    // --- GridCoord ---

    #[test]
    fn neighbor_inside_grid() {
        let c = GridCoord::new(1, 1);
        assert_eq!(c.neighbor(EdgeDirection::Up, 3, 3), Some(GridCoord::new(1, 2)));
        assert_eq!(c.neighbor(EdgeDirection::Down, 3, 3), Some(GridCoord::new(1, 0)));
        assert_eq!(c.neighbor(EdgeDirection::Left, 3, 3), Some(GridCoord::new(0, 1)));
        assert_eq!(c.neighbor(EdgeDirection::Right, 3, 3), Some(GridCoord::new(2, 1)));
    }

    #[test]
    fn neighbor_outside_grid() {
        let origin = GridCoord::new(0, 0);
        assert_eq!(origin.neighbor(EdgeDirection::Down, 2, 2), None);
        assert_eq!(origin.neighbor(EdgeDirection::Left, 2, 2), None);
        let corner = GridCoord::new(1, 1);
        assert_eq!(corner.neighbor(EdgeDirection::Up, 2, 2), None);
        assert_eq!(corner.neighbor(EdgeDirection::Right, 2, 2), None);
    }

    #[test]
    fn border_edges_match_missing_neighbors() {
        for column in 0..3 {
            for row in 0..2 {
                let c = GridCoord::new(column, row);
                for d in EdgeDirection::ALL {
                    assert_eq!(c.is_border(d, 3, 2), c.neighbor(d, 3, 2).is_none());
                }
            }
        }
    }

    #[test]
    fn grid_coord_display() {
        assert_eq!(GridCoord::new(4, 7).to_string(), "(4, 7)");
    }

    // --- Edges ---

    #[test]
    fn direction_indices_are_distinct_and_ordered() {
        for (i, d) in EdgeDirection::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
            assert_eq!(d.opposite().opposite(), *d);
        }
    }

    #[test]
    fn polarity_complement() {
        assert_eq!(EdgePolarity::Positive.complement(), EdgePolarity::Negative);
        assert_eq!(EdgePolarity::Negative.complement(), EdgePolarity::Positive);
        assert_eq!(EdgePolarity::Flat.complement(), EdgePolarity::Flat);
    }

    #[test]
    fn edge_set_get_set() {
        let mut edges = EdgeSet::FLAT;
        edges.set(EdgeDirection::Right, EdgePolarity::Positive);
        assert_eq!(edges.get(EdgeDirection::Right), EdgePolarity::Positive);
        assert_eq!(edges.get(EdgeDirection::Left), EdgePolarity::Flat);
        assert_eq!(edges.count(EdgePolarity::Flat), 3);
    }

    // --- Grid ---

    #[test]
    fn grid_layout_is_row_by_row() {
        let grid = Grid::from_fn(3, 2, |c| (c.column, c.row));
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.cells()[1], (1, 0));
        assert_eq!(grid.cells()[3], (0, 1));
        assert_eq!(grid.coord_of(5), GridCoord::new(2, 1));
        assert_eq!(grid.get(GridCoord::new(2, 1)), Some(&(2, 1)));
        assert_eq!(grid.get(GridCoord::new(3, 0)), None);
    }

    #[test]
    fn grid_from_cells_checks_length() {
        assert!(Grid::from_cells(2, 2, vec![0; 4]).is_some());
        assert!(Grid::from_cells(2, 2, vec![0; 3]).is_none());
    }

    // --- Errors ---

    #[test]
    fn error_invalid_config_display() {
        let err = BoardError::InvalidConfig("piece size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid board configuration: piece size must be positive",
        );
    }

    #[test]
    fn error_piece_failed_display() {
        let err = BoardError::PieceFailed {
            coord: GridCoord::new(1, 0),
            source: RasterError::CenterBlocked { x: 2, y: 2 },
        };
        assert_eq!(
            err.to_string(),
            "piece (1, 0) could not be cut: canvas center (2, 2) lies on the piece boundary",
        );
    }
}
