use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use tracing::{info, instrument};

use crate::corners::CornerSelection;
use crate::detection::{auto_detect_corners_with, DetectionOutcome, DetectionParams};
use crate::error::Result;
use crate::geometry::CornerSet;
use crate::preview::draw_border;
use crate::rectify::crop;
use crate::transform::AffineOp;

/// The current image together with the corners that live in its coordinate
/// space. Every operation returns a new value; the caller keeps one current
/// `Document` and replaces it wholesale.
///
/// The image as first loaded is shared by every value derived from it, so
/// [`Document::reset`] can discard all changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    image: RgbImage,
    corners: CornerSet,
    original: Arc<RgbImage>,
}

impl Document {
    /// Wrap a decoded image, with corners covering the full frame.
    pub fn new(image: RgbImage) -> Self {
        let corners = CornerSet::full_frame(image.width(), image.height());
        let original = Arc::new(image.clone());
        Self {
            image,
            corners,
            original,
        }
    }

    /// Decode image bytes (JPEG, PNG, ...).
    #[instrument(skip(bytes), fields(data_len = bytes.len()))]
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = image.dimensions();
        info!(width, height, "Image decoded");
        Ok(Self::new(image))
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path.as_ref())?.to_rgb8();
        let (width, height) = image.dimensions();
        info!(width, height, "Image opened");
        Ok(Self::new(image))
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn corners(&self) -> &CornerSet {
        &self.corners
    }

    /// Replace the corners. They must already be in role order.
    pub fn with_corners(self, corners: CornerSet) -> Self {
        Self { corners, ..self }
    }

    /// Replace the corners with a completed manual selection, canonicalized.
    pub fn with_selection(self, selection: &CornerSelection) -> Result<Self> {
        let corners = selection.sorted()?;
        Ok(self.with_corners(corners))
    }

    /// Replace the corners with detected ones.
    pub fn auto_detect(self, params: &DetectionParams) -> (Self, DetectionOutcome) {
        let detection = auto_detect_corners_with(&self.image, params);
        (self.with_corners(detection.corners), detection.outcome)
    }

    pub fn apply(&self, op: AffineOp) -> Result<Self> {
        let (image, corners) = op.apply(&self.image, &self.corners)?;
        Ok(Self {
            image,
            corners,
            original: Arc::clone(&self.original),
        })
    }

    pub fn rotate_90_clockwise(&self) -> Result<Self> {
        self.apply(AffineOp::Rotate90Clockwise)
    }

    pub fn flip_horizontal(&self) -> Result<Self> {
        self.apply(AffineOp::FlipHorizontal)
    }

    pub fn flip_vertical(&self) -> Result<Self> {
        self.apply(AffineOp::FlipVertical)
    }

    /// The rectified document.
    pub fn crop(&self) -> Result<RgbImage> {
        crop(&self.image, &self.corners)
    }

    /// The image with the current corners drawn on it.
    pub fn preview(&self) -> RgbImage {
        draw_border(&self.image, &self.corners)
    }

    /// Discard every rotation, flip and corner change since loading.
    pub fn reset(&self) -> Self {
        let (width, height) = self.original.dimensions();
        info!(width, height, "Document reset to the loaded image");
        Self {
            image: self.original.as_ref().clone(),
            corners: CornerSet::full_frame(width, height),
            original: Arc::clone(&self.original),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::geometry::{CornerRole, Point};
    use image::{DynamicImage, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_load_starts_with_full_frame() {
        let bytes = png_bytes(RgbImage::from_pixel(40, 30, Rgb([1, 2, 3])));
        let doc = Document::load(&bytes).unwrap();

        assert_eq!(doc.image().dimensions(), (40, 30));
        assert_eq!(*doc.corners(), CornerSet::full_frame(40, 30));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let result = Document::load(b"definitely not an image");
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn test_transforms_replace_whole_value() {
        let doc = Document::new(RgbImage::from_pixel(40, 30, Rgb([9, 9, 9])));
        let rotated = doc.rotate_90_clockwise().unwrap();

        assert_eq!(rotated.image().dimensions(), (30, 40));
        assert_eq!(*rotated.corners(), CornerSet::full_frame(30, 40));
        assert_eq!(doc.image().dimensions(), (40, 30));

        let back = rotated
            .flip_horizontal()
            .unwrap()
            .flip_horizontal()
            .unwrap();
        assert_eq!(back, rotated);
    }

    #[test]
    fn test_selection_then_crop() {
        let doc = Document::new(RgbImage::from_pixel(60, 60, Rgb([50, 60, 70])));
        let mut selection = CornerSelection::new();
        selection.set(CornerRole::TopLeft, Point::new(50.0, 50.0));
        selection.set(CornerRole::TopRight, Point::new(10.0, 10.0));
        selection.set(CornerRole::BottomRight, Point::new(50.0, 10.0));
        selection.set(CornerRole::BottomLeft, Point::new(10.0, 50.0));

        let doc = doc.with_selection(&selection).unwrap();
        assert_eq!(doc.corners()[CornerRole::TopLeft], Point::new(10.0, 10.0));

        let scanned = doc.crop().unwrap();
        assert_eq!(scanned.dimensions(), (40, 40));
        assert_eq!(*scanned.get_pixel(20, 20), Rgb([50, 60, 70]));
    }

    #[test]
    fn test_reset_discards_all_changes() {
        let loaded = RgbImage::from_fn(40, 30, |x, y| Rgb([x as u8, y as u8, 0]));
        let doc = Document::new(loaded.clone());

        let edited = doc
            .rotate_90_clockwise()
            .unwrap()
            .flip_vertical()
            .unwrap()
            .with_corners(CornerSet::full_frame(10, 10));
        assert_ne!(edited.image(), &loaded);

        let reset = edited.reset();
        assert_eq!(reset.image(), &loaded);
        assert_eq!(*reset.corners(), CornerSet::full_frame(40, 30));
        assert_eq!(reset, doc);
    }

    #[test]
    fn test_auto_detect_on_blank_reports_fallback() {
        let doc = Document::new(RgbImage::from_pixel(100, 80, Rgb([255, 255, 255])));
        let (doc, outcome) = doc.auto_detect(&DetectionParams::default());
        assert_eq!(outcome, DetectionOutcome::Fallback);
        assert_eq!(*doc.corners(), CornerSet::full_frame(100, 80));
    }
}
