//! jigcut: cut an image file into interlocking jigsaw piece PNGs.
//!
//! Loads an image, trims it to whole tiles, generates a board and writes
//! every piece as a transparent PNG. Optionally writes an SVG outline
//! sheet and a faint "ghost" copy of the trimmed image to use as an
//! assembly guide.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin jigcut -- [OPTIONS] --columns <N> <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use image::imageops;
use jigcut_pipeline::diagnostics::{Clock, generate_board_with_diagnostics};
use jigcut_pipeline::{Board, BoardConfig, CurveTemplate, RasterOptions, RgbaImage};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Alpha multiplier for the ghost preview.
const GHOST_OPACITY: f64 = 0.1;

/// Cut an image into interlocking jigsaw pieces.
///
/// The image is trimmed to a whole number of square tiles, keeping the
/// bottom-left corner, and every piece is written as a PNG whose
/// transparent pixels lie outside the piece outline.
#[derive(Parser)]
#[command(name = "jigcut", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Number of piece columns.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    columns: u32,

    /// Tile side in pixels. Defaults to the image width divided by the
    /// column count.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    piece_size: Option<u32>,

    /// Seed for edge polarities. A random seed is drawn when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory to write piece PNGs into.
    #[arg(long, default_value = "pieces")]
    out: PathBuf,

    /// Write an SVG outline sheet to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write a faint copy of the trimmed image to file.
    #[arg(long)]
    ghost: Option<PathBuf>,

    /// Reject boundary points outside the piece canvas instead of
    /// clamping them, and exit with failure if any piece fails.
    #[arg(long)]
    strict: bool,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full board config as a JSON string.
    ///
    /// When provided, `--piece-size` is ignored. The JSON must be a valid
    /// `BoardConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`BoardConfig`] from CLI arguments and the image width.
fn config_from_cli(cli: &Cli, image_width: u32) -> Result<BoardConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let piece_size = cli.piece_size.unwrap_or(image_width / cli.columns);
    if piece_size == 0 {
        return Err(format!(
            "Image is {image_width} px wide, too narrow for {} columns",
            cli.columns,
        ));
    }
    BoardConfig::new(piece_size).map_err(|e| format!("Invalid board config: {e}"))
}

/// Crop `image` to `columns` whole tiles across and as many whole rows as
/// fit, keeping the bottom-left corner.
///
/// Returns the trimmed image and its row count.
fn trim_to_grid(
    image: &RgbaImage,
    columns: u32,
    piece_size: u32,
) -> Result<(RgbaImage, u32), String> {
    let (width, height) = image.dimensions();
    let trimmed_width = columns
        .checked_mul(piece_size)
        .filter(|&w| w <= width)
        .ok_or_else(|| {
            format!("Image is {width} px wide, too narrow for {columns} columns of {piece_size} px")
        })?;
    let rows = height / piece_size;
    if rows == 0 {
        return Err(format!(
            "Image is {height} px tall, shorter than one {piece_size} px row"
        ));
    }
    let trimmed_height = rows * piece_size;
    let trimmed = imageops::crop_imm(
        image,
        0,
        height - trimmed_height,
        trimmed_width,
        trimmed_height,
    )
    .to_image();
    Ok((trimmed, rows))
}

/// Copy of `image` with every alpha value scaled by `opacity`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ghost(image: &RgbaImage, opacity: f64) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let alpha = (f64::from(pixel.0[3]) * opacity).round().clamp(0.0, 255.0);
        pixel.0[3] = alpha as u8;
    }
    out
}

/// File name for the piece at column `i`, row `j`.
fn piece_file_name(column: u32, row: u32) -> String {
    format!("piece_{column}_{row}.png")
}

/// Write every successfully cut piece into `dir`.
///
/// Returns the number of files written.
fn write_pieces(board: &Board, dir: &Path) -> Result<usize, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    let mut written = 0;
    for piece in board.pieces() {
        let coord = piece.coord();
        let path = dir.join(piece_file_name(coord.column, coord.row));
        piece
            .canvas()
            .save(&path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

fn write_svg(cli: &Cli, board: &Board, svg_path: &Path) -> Result<usize, String> {
    let config = board.config();
    let template = CurveTemplate::build(config);
    let title = cli
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("jigcut");
    let description = format!("{} x {} pieces", board.columns(), board.rows());
    let config_json = serde_json::to_string(config).ok();
    let metadata = jigcut_export::SvgMetadata {
        title: Some(title),
        description: Some(&description),
        config_json: config_json.as_deref(),
    };
    let svg = jigcut_export::to_outline_svg(board.topology(), &template, config, &metadata);
    std::fs::write(svg_path, &svg)
        .map_err(|e| format!("Error writing SVG to {}: {e}", svg_path.display()))?;
    Ok(svg.len())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let image = match image::open(&cli.image_path) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let config = match config_from_cli(&cli, image.width()) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let (source, rows) = match trim_to_grid(&image, cli.columns, config.piece_size()) {
        Ok(trimmed) => trimmed,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let seed = cli.seed.unwrap_or_else(rand::random);
    let options = if cli.strict {
        RasterOptions::strict()
    } else {
        RasterOptions::default()
    };
    info!(
        "Image: {} ({}x{}), trimmed to {}x{}",
        cli.image_path.display(),
        image.width(),
        image.height(),
        source.width(),
        source.height(),
    );
    info!(
        "Grid: {}x{rows}, piece size {}, padding {}, seed {seed}",
        cli.columns,
        config.piece_size(),
        config.padding(),
    );

    let (board, diagnostics) = match generate_board_with_diagnostics(
        config,
        options,
        cli.columns,
        rows,
        &source,
        &mut StdRng::seed_from_u64(seed),
        &StdClock,
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Board error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    match write_pieces(&board, &cli.out) {
        Ok(count) => info!("{count} pieces written to {}", cli.out.display()),
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    }

    if let Some(ref svg_path) = cli.svg {
        match write_svg(&cli, &board, svg_path) {
            Ok(bytes) => info!("SVG written to {} ({bytes} bytes)", svg_path.display()),
            Err(msg) => eprintln!("{msg}"),
        }
    }

    if let Some(ref ghost_path) = cli.ghost {
        match ghost(&source, GHOST_OPACITY).save(ghost_path) {
            Ok(()) => info!("Ghost image written to {}", ghost_path.display()),
            Err(e) => eprintln!("Error writing ghost image to {}: {e}", ghost_path.display()),
        }
    }

    if cli.strict && !board.is_complete() {
        eprintln!(
            "{} of {} pieces failed",
            board.failures().count(),
            board.outcomes().len(),
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
