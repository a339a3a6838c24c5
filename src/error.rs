use thiserror::Error;

use crate::geometry::CornerRole;

/// Errors raised by the geometry engine.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing corners: {missing:?}")]
    MissingCorners { missing: Vec<CornerRole> },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
