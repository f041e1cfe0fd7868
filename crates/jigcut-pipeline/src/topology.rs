//! Edge topology: decide the polarity of every piece edge on the board.
//!
//! Border edges are always flat. Every interior edge is shared by two
//! pieces, and the two sides must be complements: if one piece carries a
//! tab the other carries the matching pocket.
//!
//! [`assign`] walks the grid columns-outer, rows-inner so the left and
//! bottom neighbours of a cell are always decided before the cell itself;
//! a cell copies the complement of those and flips a coin for its own
//! right and top edges. [`assign_parallel`] splits the same rule into two
//! independent passes for large boards.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::types::{BoardError, EdgeDirection, EdgePolarity, EdgeSet, Grid, GridCoord};

/// Assign edge polarities for a `columns` by `rows` board.
///
/// `rng` supplies the coin flips for right and top edges; pass a seeded
/// generator for reproducible boards.
///
/// # Errors
///
/// Returns [`BoardError::InvalidConfig`] if either dimension is zero.
pub fn assign<R: Rng + ?Sized>(
    columns: u32,
    rows: u32,
    rng: &mut R,
) -> Result<Grid<EdgeSet>, BoardError> {
    validate_dimensions(columns, rows)?;

    let mut grid = Grid::from_fn(columns, rows, |_| EdgeSet::FLAT);
    for column in 0..columns {
        for row in 0..rows {
            let coord = GridCoord::new(column, row);
            let left = inherited(&grid, coord, EdgeDirection::Left);
            let down = inherited(&grid, coord, EdgeDirection::Down);
            let right = drawn(coord, EdgeDirection::Right, columns, rows, || {
                rng.random_bool(0.5)
            });
            let up = drawn(coord, EdgeDirection::Up, columns, rows, || {
                rng.random_bool(0.5)
            });
            if let Some(cell) = grid.get_mut(coord) {
                *cell = EdgeSet::new(up, down, left, right);
            }
        }
    }

    debug!("assigned edge topology for {columns}x{rows} board");
    Ok(grid)
}

/// Two-pass variant of [`assign`] that runs each pass in parallel.
///
/// Pass one draws the right and top edges of every cell from its own
/// generator, seeded from `seed` and the cell's index, so the outcome does
/// not depend on evaluation order or thread count. Pass two derives the
/// left and bottom edges from the already materialized neighbours.
///
/// The result satisfies the same invariants as [`assign`] but is not the
/// same board as [`assign`] with an equally seeded generator.
///
/// # Errors
///
/// Returns [`BoardError::InvalidConfig`] if either dimension is zero.
pub fn assign_parallel(columns: u32, rows: u32, seed: u64) -> Result<Grid<EdgeSet>, BoardError> {
    validate_dimensions(columns, rows)?;

    let coords = Grid::from_fn(columns, rows, |c| c);
    let drawn_cells: Vec<(EdgePolarity, EdgePolarity)> = coords
        .cells()
        .par_iter()
        .map(|&coord| {
            let mut rng = cell_rng(seed, coord, columns);
            let right = drawn(coord, EdgeDirection::Right, columns, rows, || {
                rng.random_bool(0.5)
            });
            let up = drawn(coord, EdgeDirection::Up, columns, rows, || {
                rng.random_bool(0.5)
            });
            (right, up)
        })
        .collect();
    let Some(drawn_grid) = Grid::from_cells(columns, rows, drawn_cells) else {
        return Err(BoardError::InvalidConfig(format!(
            "{columns}x{rows} board does not fit in memory",
        )));
    };

    let cells: Vec<EdgeSet> = coords
        .cells()
        .par_iter()
        .map(|&coord| {
            let (right, up) = drawn_grid.get(coord).copied().unwrap_or_default();
            let left = coord
                .neighbor(EdgeDirection::Left, columns, rows)
                .and_then(|n| drawn_grid.get(n))
                .map_or(EdgePolarity::Flat, |&(r, _)| r.complement());
            let down = coord
                .neighbor(EdgeDirection::Down, columns, rows)
                .and_then(|n| drawn_grid.get(n))
                .map_or(EdgePolarity::Flat, |&(_, u)| u.complement());
            EdgeSet::new(up, down, left, right)
        })
        .collect();

    debug!("assigned edge topology for {columns}x{rows} board in parallel (seed {seed})");
    Grid::from_cells(columns, rows, cells).ok_or_else(|| {
        BoardError::InvalidConfig(format!("{columns}x{rows} board does not fit in memory"))
    })
}

/// Check whether every shared edge of `topology` is complementary and
/// every border edge is flat.
///
/// Returns the first offending cell and direction, if any.
#[must_use]
pub fn find_mismatch(topology: &Grid<EdgeSet>) -> Option<(GridCoord, EdgeDirection)> {
    let (columns, rows) = (topology.columns(), topology.rows());
    topology.iter().find_map(|(coord, edges)| {
        EdgeDirection::ALL.into_iter().find_map(|direction| {
            let polarity = edges.get(direction);
            let consistent = match coord.neighbor(direction, columns, rows) {
                None => polarity == EdgePolarity::Flat,
                Some(n) => topology.get(n).is_some_and(|other| {
                    polarity != EdgePolarity::Flat
                        && other.get(direction.opposite()) == polarity.complement()
                }),
            };
            (!consistent).then_some((coord, direction))
        })
    })
}

fn validate_dimensions(columns: u32, rows: u32) -> Result<(), BoardError> {
    if columns == 0 || rows == 0 {
        return Err(BoardError::InvalidConfig(format!(
            "board must have at least one column and one row, got {columns}x{rows}",
        )));
    }
    Ok(())
}

/// Left/bottom edge: flat on the border, otherwise the complement of the
/// neighbour's facing edge.
fn inherited(grid: &Grid<EdgeSet>, coord: GridCoord, direction: EdgeDirection) -> EdgePolarity {
    coord
        .neighbor(direction, grid.columns(), grid.rows())
        .and_then(|n| grid.get(n))
        .map_or(EdgePolarity::Flat, |n| {
            n.get(direction.opposite()).complement()
        })
}

/// Right/top edge: flat on the border, otherwise a coin flip.
fn drawn(
    coord: GridCoord,
    direction: EdgeDirection,
    columns: u32,
    rows: u32,
    flip: impl FnOnce() -> bool,
) -> EdgePolarity {
    if coord.is_border(direction, columns, rows) {
        EdgePolarity::Flat
    } else {
        EdgePolarity::from_coin(flip())
    }
}

/// Independent generator for one cell of a parallel assignment.
fn cell_rng(seed: u64, coord: GridCoord, columns: u32) -> StdRng {
    let index = u64::from(coord.row) * u64::from(columns) + u64::from(coord.column);
    // Spread neighbouring indices across the seed space before seeding.
    StdRng::seed_from_u64(seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
