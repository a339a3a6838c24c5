use clap::Parser;
use std::path::PathBuf;

use crate::corners::CornerSelection;
use crate::detection::DetectionParams;
use crate::error::ScanError;
use crate::geometry::{CornerRole, Point};

#[derive(Parser, Debug)]
#[command(name = "docscan")]
#[command(version, about = "Detect, orient and flatten a photographed document")]
pub struct Cli {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output path [default: input_scanned.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Document corners as four "x,y" pairs in any order (e.g. "12,8 590,20 600,810 5,790")
    #[arg(short, long, value_parser = parse_point, value_delimiter = ' ', conflicts_with = "auto")]
    pub corners: Vec<Point>,

    /// Detect the document corners automatically
    #[arg(short, long)]
    pub auto: bool,

    /// Clockwise quarter turns applied before cropping
    #[arg(short, long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=3))]
    pub rotate: u8,

    /// Mirror left/right (applied after rotation)
    #[arg(long)]
    pub flip_horizontal: bool,

    /// Mirror top/bottom (applied after rotation)
    #[arg(long)]
    pub flip_vertical: bool,

    /// Also save the image with the document border drawn on it
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Contrast boost used by corner detection
    #[arg(long, default_value = "1.5", value_parser = parse_positive)]
    pub contrast: f64,

    /// Working scale used by corner detection, in (0, 1]
    #[arg(long, default_value = "0.4", value_parser = parse_scale)]
    pub scale: f64,

    /// Show detection details
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().unwrap_or_default().to_string_lossy();
            let parent = self.input.parent().unwrap_or(std::path::Path::new("."));
            parent.join(format!("{}_scanned.png", stem))
        })
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            contrast: self.contrast,
            scale_factor: self.scale,
            ..DetectionParams::default()
        }
    }

    /// Corners given on the command line, filled into role slots in the order
    /// they were typed. `None` when no corners were given.
    pub fn corner_selection(&self) -> Result<Option<CornerSelection>, ScanError> {
        if self.corners.is_empty() {
            return Ok(None);
        }
        if self.corners.len() > 4 {
            return Err(ScanError::InvalidInput(format!(
                "expected 4 corners, got {}",
                self.corners.len()
            )));
        }

        let mut selection = CornerSelection::new();
        for (role, point) in CornerRole::ALL.into_iter().zip(self.corners.iter()) {
            selection.set(role, *point);
        }
        Ok(Some(selection))
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("Invalid corner '{}', expected x,y", s))?;

    let x: f64 = x
        .trim()
        .parse()
        .map_err(|_| format!("Invalid x coordinate: {}", x))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|_| format!("Invalid y coordinate: {}", y))?;

    if !x.is_finite() || !y.is_finite() {
        return Err("Corner coordinates must be finite".to_string());
    }

    Ok(Point::new(x, y))
}

fn parse_positive(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(value > 0.0 && value.is_finite()) {
        return Err("Value must be positive".to_string());
    }
    Ok(value)
}

fn parse_scale(s: &str) -> Result<f64, String> {
    let value = parse_positive(s)?;
    if value > 1.0 {
        return Err("Scale must not exceed 1".to_string());
    }
    Ok(value)
}
