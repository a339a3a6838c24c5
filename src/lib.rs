pub mod cli;
pub mod corners;
pub mod detection;
pub mod document;
pub mod error;
pub mod geometry;
pub mod preview;
pub mod rectify;
pub mod transform;

pub use cli::Cli;
pub use corners::{sort_corners, CornerSelection};
pub use detection::{
    auto_detect_corners, auto_detect_corners_with, Detection, DetectionOutcome, DetectionParams,
};
pub use document::Document;
pub use error::{Result, ScanError};
pub use geometry::{distance, lift, CornerRole, CornerSet, Metric, Point, RECTIFY_METRIC};
pub use preview::draw_border;
pub use rectify::{crop, crop_selection, output_size, perspective_transform};
pub use transform::{flip_horizontal, flip_vertical, rotate_90_clockwise, AffineOp};
