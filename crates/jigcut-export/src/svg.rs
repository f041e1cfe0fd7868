//! SVG export serializer.
//!
//! Draws the cut lines of a board as an SVG string with `<path>`
//! elements, using the [`svg`] crate for document construction, XML
//! escaping, and path data formatting.
//!
//! Every shared edge is drawn exactly once, from the side of the piece to
//! its left or below it. Every border edge is drawn as a straight line
//! along the image frame. Board space is y-up while SVG is y-down, so
//! coordinates are flipped against the image height.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements for
//! accessibility and to help file managers identify exported files.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use jigcut_pipeline::boundary::compose_edge;
use jigcut_pipeline::{
    BoardConfig, CurveTemplate, EdgeDirection, EdgePolarity, EdgeSet, Grid, Point, Polyline,
    piece_canvas_origin,
};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized board config, emitted inside a `<metadata>` element
    /// wrapped in a namespaced `<jigcut:board>` element so exported files
    /// carry machine-parseable settings.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a polyline.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for polylines with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use jigcut_pipeline::{Point, Polyline};
/// use jigcut_export::build_path_data;
///
/// let polyline = Polyline::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// let d = build_path_data(&polyline);
/// assert_eq!(d, "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    let points = polyline.points();
    if points.len() < 2 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data))
}

/// Cut lines of a board in SVG coordinates (origin top-left, y-down),
/// one polyline per edge.
///
/// Shared edges come first, row by row with each piece's right edge
/// before its top edge, followed by the border edges.
#[must_use]
pub fn seam_polylines(
    topology: &Grid<EdgeSet>,
    template: &CurveTemplate,
    config: &BoardConfig,
) -> Vec<Polyline> {
    let size = f64::from(config.piece_size());
    let width = f64::from(topology.columns()) * size;
    let height = f64::from(topology.rows()) * size;
    let to_svg = |p: Point| Point::new(p.x, height - p.y);

    let mut seams = Vec::new();
    for (coord, edges) in topology.iter() {
        let (ox, oy) = piece_canvas_origin(coord, config);
        #[allow(clippy::cast_precision_loss)]
        let offset = Point::new(ox as f64, oy as f64);
        for direction in [EdgeDirection::Right, EdgeDirection::Up] {
            let polarity = edges.get(direction);
            if polarity == EdgePolarity::Flat {
                continue;
            }
            let local = compose_edge(direction, polarity, template, config);
            let points = local
                .points()
                .iter()
                .map(|p| to_svg(Point::new(p.x + offset.x, p.y + offset.y)))
                .collect();
            seams.push(Polyline::new(points));
        }
    }

    let columns = topology.columns();
    let rows = topology.rows();
    let straight = |a: (f64, f64), b: (f64, f64)| {
        Polyline::new(vec![Point::new(a.0, a.1), Point::new(b.0, b.1)])
    };
    for i in 0..columns {
        let x0 = f64::from(i) * size;
        seams.push(straight((x0, height), (x0 + size, height)));
        seams.push(straight((x0, 0.0), (x0 + size, 0.0)));
    }
    for j in 0..rows {
        let y0 = height - f64::from(j) * size;
        seams.push(straight((0.0, y0), (0.0, y0 - size)));
        seams.push(straight((width, y0), (width, y0 - size)));
    }
    seams
}

/// Serialize the cut lines of a board into an SVG document string.
///
/// The document is `columns * piece_size` by `rows * piece_size` user
/// units, matching the source image pixel for pixel.
#[must_use]
pub fn to_outline_svg(
    topology: &Grid<EdgeSet>,
    template: &CurveTemplate,
    config: &BoardConfig,
    metadata: &SvgMetadata<'_>,
) -> String {
    let w = topology.columns().saturating_mul(config.piece_size());
    let h = topology.rows().saturating_mul(config.piece_size());
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut board_el = Element::new("jigcut:board");
        board_el.assign("xmlns:jigcut", "https://github.com/jigcut/jigcut/ns/1");
        board_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(board_el);
        doc = doc.add(metadata_el);
    }

    for seam in seam_polylines(topology, template, config) {
        let d = build_path_data(&seam);
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1);
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jigcut_pipeline::assign;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn no_meta() -> SvgMetadata<'static> {
        SvgMetadata::default()
    }

    fn board(columns: u32, rows: u32, size: u32) -> (Grid<EdgeSet>, CurveTemplate, BoardConfig) {
        let config = BoardConfig::new(size).unwrap();
        let template = CurveTemplate::build(&config);
        let topology = assign(columns, rows, &mut StdRng::seed_from_u64(3)).unwrap();
        (topology, template, config)
    }

    // --- build_path_data ---

    #[test]
    fn build_path_data_empty_polyline() {
        assert_eq!(build_path_data(&Polyline::new(vec![])), "");
    }

    #[test]
    fn build_path_data_single_point() {
        let polyline = Polyline::new(vec![Point::new(5.0, 5.0)]);
        assert_eq!(build_path_data(&polyline), "");
    }

    #[test]
    fn build_path_data_three_points() {
        let polyline = Polyline::new(vec![
            Point::new(10.0, 15.0),
            Point::new(12.5, 18.3),
            Point::new(14.0, 20.1),
        ]);
        assert_eq!(build_path_data(&polyline), "M10,15 L12.5,18.3 L14,20.1");
    }

    // --- seams ---

    #[test]
    fn every_edge_drawn_once() {
        let (topology, template, config) = board(3, 2, 50);
        let seams = seam_polylines(&topology, &template, &config);
        // 7 shared edges plus 10 border edges.
        assert_eq!(seams.len(), 17);
    }

    #[test]
    fn single_piece_has_only_the_frame() {
        let (topology, template, config) = board(1, 1, 40);
        let seams = seam_polylines(&topology, &template, &config);
        assert_eq!(seams.len(), 4);
        assert!(seams.iter().all(|s| s.len() == 2));
    }

    #[test]
    fn shared_edges_end_on_grid_corners() {
        let (topology, template, config) = board(2, 2, 100);
        let seams = seam_polylines(&topology, &template, &config);
        // Piece (0, 0) right edge runs from board (100, 0) to (100, 100),
        // which is SVG (100, 200) to (100, 100).
        let first = &seams[0];
        assert_eq!(first.first(), Some(&Point::new(100.0, 200.0)));
        assert_eq!(first.last(), Some(&Point::new(100.0, 100.0)));
        // Piece (0, 0) top edge runs from board (0, 100) to (100, 100).
        let second = &seams[1];
        assert_eq!(second.first(), Some(&Point::new(0.0, 100.0)));
        assert_eq!(second.last(), Some(&Point::new(100.0, 100.0)));
    }

    #[test]
    fn tab_bulges_toward_the_positive_side() {
        let config = BoardConfig::new(100).unwrap();
        let template = CurveTemplate::build(&config);
        let mut cells = vec![EdgeSet::FLAT; 2];
        cells[0].set(EdgeDirection::Right, EdgePolarity::Positive);
        cells[1].set(EdgeDirection::Left, EdgePolarity::Negative);
        let topology = Grid::from_cells(2, 1, cells).unwrap();
        let seams = seam_polylines(&topology, &template, &config);
        let max_x = seams[0].points().iter().map(|p| p.x).fold(f64::MIN, f64::max);
        assert!((max_x - 118.0).abs() < 1e-9, "{max_x}");
    }

    // --- document ---

    #[test]
    fn document_matches_board_size() {
        let (topology, template, config) = board(3, 2, 50);
        let svg = to_outline_svg(&topology, &template, &config, &no_meta());
        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"width="150""#));
        assert!(svg.contains(r#"height="100""#));
        assert!(svg.contains(r#"viewBox="0 0 150 100""#));
        assert_eq!(svg.matches("<path").count(), 17);
        assert!(svg.contains(r#"fill="none""#));
        assert!(svg.contains(r#"stroke="black""#));
    }

    #[test]
    fn metadata_is_embedded_and_escaped() {
        let (topology, template, config) = board(1, 1, 10);
        let metadata = SvgMetadata {
            title: Some("cats & dogs"),
            description: Some("seed <7>"),
            config_json: Some(r#"{"piece_size":10}"#),
        };
        let svg = to_outline_svg(&topology, &template, &config, &metadata);
        assert!(svg.contains("<title>cats &amp; dogs</title>"));
        assert!(svg.contains("<desc>seed &lt;7&gt;</desc>"));
        assert!(svg.contains("<metadata>"));
        assert!(svg.contains(r#"xmlns:jigcut="https://github.com/jigcut/jigcut/ns/1""#));
        assert!(svg.contains("piece_size"));
    }

    #[test]
    fn no_metadata_elements_by_default() {
        let (topology, template, config) = board(1, 1, 10);
        let svg = to_outline_svg(&topology, &template, &config, &no_meta());
        assert!(!svg.contains("<title>"));
        assert!(!svg.contains("<desc>"));
        assert!(!svg.contains("<metadata>"));
    }
}
