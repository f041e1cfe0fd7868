//! jigcut-export: Pure outline serializers (sans-IO)
//!
//! Converts the cut lines of a board into vector formats. Currently
//! supports SVG.

pub mod svg;

pub use svg::{SvgMetadata, build_path_data, seam_polylines, to_outline_svg};
