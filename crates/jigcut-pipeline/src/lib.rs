//! jigcut-pipeline: Pure jigsaw piece generation (sans-IO).
//!
//! Cuts an in-memory image into a grid of interlocking pieces:
//! curve template -> edge topology -> boundary composition ->
//! flood-fill segmentation.
//!
//! Board space is y-up: row 0 is the bottom row of the source image and
//! every piece canvas is stored so that its image row 0 is the top.
//!
//! This crate has **no I/O dependencies** -- it operates on
//! [`RgbaImage`]s handed in by the caller and returns structured data.
//! Decoding, file output and timing sources live in the `jigcut` binary.
//!
//! ```
//! use jigcut_pipeline::{BoardConfig, BoardGenerator, RgbaImage};
//! use rand::SeedableRng;
//!
//! let config = BoardConfig::new(20).unwrap();
//! let source = RgbaImage::from_pixel(60, 40, image::Rgba([200, 10, 10, 255]));
//! let generator = BoardGenerator::new(config);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let board = generator.generate_board(3, 2, &source, &mut rng).unwrap();
//! assert_eq!(board.pieces().count(), 6);
//! ```

pub mod board;
pub mod boundary;
pub mod curve;
pub mod diagnostics;
pub mod piece;
pub mod raster;
pub mod topology;
pub mod types;

pub use board::{Board, BoardGenerator};
pub use boundary::{Boundary, compose};
pub use curve::CurveTemplate;
pub use piece::{CutContext, Piece, PieceFailure, piece_canvas_origin, piece_image_origin};
pub use raster::{ClampPolicy, Raster, RasterOptions, RasterStats, rasterize};
pub use topology::{assign, assign_parallel, find_mismatch};
pub use types::{
    BoardConfig, BoardError, EdgeDirection, EdgePolarity, EdgeSet, Grid, GridCoord, Point,
    Polyline, RasterError, RgbaImage,
};
