use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docscan::{Cli, Document};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load input image
    let mut document = Document::open(&cli.input)
        .with_context(|| format!("Failed to open input file: {:?}", cli.input))?;
    let (in_width, in_height) = document.image().dimensions();

    // Pick corners: manual, detected, or the full frame
    if let Some(selection) = cli.corner_selection().context("Invalid --corners")? {
        document = document
            .with_selection(&selection)
            .context("Invalid --corners")?;
    } else if cli.auto {
        let (detected, outcome) = document.auto_detect(&cli.detection_params());
        if !outcome.is_detected() {
            eprintln!("No document outline found, using the full image");
        }
        document = detected;
    }
    info!(corners = %document.corners(), "Corners selected");

    // Orient
    for _ in 0..cli.rotate {
        document = document.rotate_90_clockwise().context("Failed to rotate")?;
    }
    if cli.flip_horizontal {
        document = document.flip_horizontal().context("Failed to flip horizontally")?;
    }
    if cli.flip_vertical {
        document = document.flip_vertical().context("Failed to flip vertically")?;
    }

    if let Some(preview_path) = &cli.preview {
        document
            .preview()
            .save(preview_path)
            .with_context(|| format!("Failed to save preview: {:?}", preview_path))?;
        info!(path = ?preview_path, "Preview saved");
    }

    // Rectify and save
    let scanned = document.crop().context("Failed to rectify document")?;
    let output_path = cli.output_path();
    scanned
        .save(&output_path)
        .with_context(|| format!("Failed to save output: {:?}", output_path))?;

    eprintln!("Saved scanned document: {:?}", output_path);
    eprintln!("Corners: {}", document.corners());
    eprintln!(
        "Dimensions: {}x{} -> {}x{}",
        in_width,
        in_height,
        scanned.width(),
        scanned.height()
    );

    Ok(())
}
