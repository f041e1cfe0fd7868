//! Board diagnostics: timing and counts for each generation stage.
//!
//! [`generate_board_with_diagnostics`] runs the same stages as
//! [`BoardGenerator::generate_board`] and records how long each took and
//! what it produced.
//!
//! Timestamps come from a caller-supplied [`Clock`] so this crate never
//! touches a platform timer itself. Durations are serialized as
//! fractional seconds (`f64`) for JSON compatibility, since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardGenerator};
use crate::raster::RasterOptions;
use crate::topology::assign;
use crate::types::{BoardConfig, BoardError, EdgeDirection, EdgePolarity, EdgeSet, Grid, RgbaImage};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time passed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single board generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDiagnostics {
    /// Stage 1: curve template sampling and scaling.
    pub template: StageDiagnostics,
    /// Stage 2: edge polarity assignment.
    pub topology: StageDiagnostics,
    /// Stage 3: boundary composition and flood fill of every piece.
    pub segmentation: StageDiagnostics,
    /// Total wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: BoardSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Curve template metrics.
    Template {
        /// Points in the sampled outline.
        point_count: usize,
        /// Factor applied to the base curve.
        scale: f64,
        /// Area one tab adds to a piece, in square pixels.
        tab_area: f64,
        /// Largest gap between consecutive points, in pixels.
        max_step: f64,
    },
    /// Edge topology metrics.
    Topology {
        /// Grid columns.
        columns: u32,
        /// Grid rows.
        rows: u32,
        /// Shared edges (each counted once).
        interior_edges: usize,
        /// Shared edges whose right/top side carries the tab.
        forward_tabs: usize,
    },
    /// Segmentation metrics.
    Segmentation {
        /// Pieces cut successfully.
        pieces: usize,
        /// Pieces that failed.
        failures: usize,
        /// Pixels copied from the source over all pieces.
        filled_pixels: u64,
        /// Boundary pixels marked over all pieces.
        obstacle_pixels: u64,
        /// Boundary points clamped back into a canvas.
        clamped_points: u64,
    },
}

/// High-level summary for the whole board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Tile side in pixels.
    pub piece_size: u32,
    /// Interlock margin in pixels.
    pub padding: u32,
    /// Side of every piece canvas in pixels.
    pub canvas_side: u32,
    /// Total grid cells.
    pub piece_count: usize,
    /// Cells whose segmentation failed.
    pub failure_count: usize,
}

/// Build a generator for `config` and cut `source`, timing every stage.
///
/// # Errors
///
/// Same as [`BoardGenerator::generate_board`].
pub fn generate_board_with_diagnostics<R: Rng + ?Sized, C: Clock>(
    config: BoardConfig,
    options: RasterOptions,
    columns: u32,
    rows: u32,
    source: &RgbaImage,
    rng: &mut R,
    clock: &C,
) -> Result<(Board, BoardDiagnostics), BoardError> {
    let start = clock.now();

    let t = clock.now();
    let generator = BoardGenerator::with_options(config, options);
    let template = generator.template();
    let template_stage = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Template {
            point_count: template.len(),
            scale: template.scale(),
            tab_area: template.tab_area(),
            max_step: template.max_step(),
        },
    };

    let t = clock.now();
    let topology = assign(columns, rows, rng)?;
    let (interior_edges, forward_tabs) = count_tabs(&topology);
    let topology_stage = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Topology {
            columns,
            rows,
            interior_edges,
            forward_tabs,
        },
    };

    let t = clock.now();
    let board = generator.cut_board(topology, source)?;
    let failures = board.failures().count();
    let pieces = board.pieces().count();
    let (filled_pixels, obstacle_pixels, clamped_points) =
        board.pieces().fold((0, 0, 0), |(f, o, c), piece| {
            let stats = piece.stats();
            (
                f + stats.filled_pixels,
                o + stats.obstacle_pixels,
                c + stats.clamped_points,
            )
        });
    let segmentation_stage = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Segmentation {
            pieces,
            failures,
            filled_pixels,
            obstacle_pixels,
            clamped_points,
        },
    };

    let diagnostics = BoardDiagnostics {
        template: template_stage,
        topology: topology_stage,
        segmentation: segmentation_stage,
        total_duration: clock.elapsed(&start),
        summary: BoardSummary {
            image_width: source.width(),
            image_height: source.height(),
            piece_size: config.piece_size(),
            padding: config.padding(),
            canvas_side: config.canvas_side(),
            piece_count: pieces + failures,
            failure_count: failures,
        },
    };
    Ok((board, diagnostics))
}

/// Count shared edges and how many of them have the tab on the right or
/// top piece.
fn count_tabs(topology: &Grid<EdgeSet>) -> (usize, usize) {
    topology
        .cells()
        .iter()
        .flat_map(|edges| [edges.get(EdgeDirection::Right), edges.get(EdgeDirection::Up)])
        .filter(|&p| p != EdgePolarity::Flat)
        .fold((0, 0), |(interior, forward), p| {
            (interior + 1, forward + usize::from(p == EdgePolarity::Positive))
        })
}

impl BoardDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Board Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  |  Piece size: {} px (padding {}, canvas {})",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.piece_size,
            self.summary.padding,
            self.summary.canvas_side,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Template", &self.template),
            ("Topology", &self.topology),
            ("Segmentation", &self.segmentation),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Pieces: {}  |  Failed: {}",
            self.summary.piece_count, self.summary.failure_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Template {
            point_count,
            scale,
            tab_area,
            max_step,
        } => {
            format!("{point_count} pts x{scale:.2} tab={tab_area:.1}px² step={max_step:.3}")
        }
        StageMetrics::Topology {
            columns,
            rows,
            interior_edges,
            forward_tabs,
        } => {
            format!("{columns}x{rows} grid, {interior_edges} shared edges ({forward_tabs} forward tabs)")
        }
        StageMetrics::Segmentation {
            pieces,
            failures,
            filled_pixels,
            obstacle_pixels,
            clamped_points,
        } => {
            format!(
                "{pieces} ok, {failures} failed, filled={filled_pixels} boundary={obstacle_pixels} clamped={clamped_points}",
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use image::Rgba;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let config = BoardConfig::new(20).unwrap();
        let source = RgbaImage::from_pixel(60, 40, Rgba([9, 9, 9, 255]));
        let clock = TickClock(Cell::new(0));
        let (board, diag) = generate_board_with_diagnostics(
            config,
            RasterOptions::default(),
            3,
            2,
            &source,
            &mut StdRng::seed_from_u64(4),
            &clock,
        )
        .unwrap();

        assert!(board.is_complete());
        assert_eq!(diag.summary.piece_count, 6);
        assert_eq!(diag.summary.failure_count, 0);
        assert_eq!(diag.summary.canvas_side, 28);
        assert!(diag.total_duration >= diag.segmentation.duration);
        // (columns - 1) * rows + columns * (rows - 1) shared edges.
        assert!(matches!(
            diag.topology.metrics,
            StageMetrics::Topology {
                interior_edges: 7,
                ..
            }
        ));
        let total: u64 = board.pieces().map(|p| p.stats().filled_pixels).sum();
        assert!(matches!(
            diag.segmentation.metrics,
            StageMetrics::Segmentation { pieces: 6, filled_pixels, .. } if filled_pixels == total
        ));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let config = BoardConfig::new(10).unwrap();
        let source = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let clock = TickClock(Cell::new(0));
        let (_, diag) = generate_board_with_diagnostics(
            config,
            RasterOptions::default(),
            1,
            1,
            &source,
            &mut StdRng::seed_from_u64(0),
            &clock,
        )
        .unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["total_duration"].is_f64());
        let back: BoardDiagnostics = serde_json::from_value(json).unwrap();
        let drift = back.total_duration.as_secs_f64() - diag.total_duration.as_secs_f64();
        assert!(drift.abs() < 1e-9);
    }

    #[test]
    fn report_produces_nonempty_string() {
        let config = BoardConfig::new(12).unwrap();
        let source = RgbaImage::from_pixel(24, 12, Rgba([0, 0, 0, 255]));
        let clock = TickClock(Cell::new(0));
        let (_, diag) = generate_board_with_diagnostics(
            config,
            RasterOptions::strict(),
            2,
            1,
            &source,
            &mut StdRng::seed_from_u64(1),
            &clock,
        )
        .unwrap();
        let report = diag.report();
        assert!(report.contains("Board Diagnostics Report"));
        assert!(report.contains("Segmentation"));
        assert!(report.contains("2x1 grid"));
    }
}
