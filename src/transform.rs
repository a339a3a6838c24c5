use image::{imageops, RgbImage};
use nalgebra::Matrix2x3;
use tracing::{debug, instrument};

use crate::error::{Result, ScanError};
use crate::geometry::{
    apply_affine, CornerSet, RolePermutation, FLIP_HORIZONTAL_ROLES, FLIP_VERTICAL_ROLES,
    ROTATE_CW_ROLES,
};

/// A whole-image rigid change that keeps raster and corners in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffineOp {
    Rotate90Clockwise,
    FlipHorizontal,
    FlipVertical,
}

impl AffineOp {
    /// Forward 2x3 matrix taking source coordinates to output coordinates for
    /// a source image of the given size.
    pub fn matrix(self, width: u32, height: u32) -> Matrix2x3<f64> {
        let (w, h) = (width as f64, height as f64);
        match self {
            AffineOp::Rotate90Clockwise => Matrix2x3::new(0.0, -1.0, h, 1.0, 0.0, 0.0),
            AffineOp::FlipHorizontal => Matrix2x3::new(-1.0, 0.0, w, 0.0, 1.0, 0.0),
            AffineOp::FlipVertical => Matrix2x3::new(1.0, 0.0, 0.0, 0.0, -1.0, h),
        }
    }

    /// Slot permutation that restores [TL, TR, BR, BL] after the matrix has
    /// moved the points.
    pub fn roles(self) -> &'static RolePermutation {
        match self {
            AffineOp::Rotate90Clockwise => &ROTATE_CW_ROLES,
            AffineOp::FlipHorizontal => &FLIP_HORIZONTAL_ROLES,
            AffineOp::FlipVertical => &FLIP_VERTICAL_ROLES,
        }
    }

    /// Pixel-exact remap. Source pixel (x, y) has its centre at (x + 0.5, y + 0.5),
    /// which the matrix sends to the centre of the destination pixel, so the
    /// raster moves without resampling.
    fn remap(self, image: &RgbImage) -> RgbImage {
        match self {
            AffineOp::Rotate90Clockwise => imageops::rotate90(image),
            AffineOp::FlipHorizontal => imageops::flip_horizontal(image),
            AffineOp::FlipVertical => imageops::flip_vertical(image),
        }
    }

    /// Apply the change to both the image and its corners. The input image is
    /// left untouched.
    #[instrument(skip(image, corners), fields(width = image.width(), height = image.height()))]
    pub fn apply(self, image: &RgbImage, corners: &CornerSet) -> Result<(RgbImage, CornerSet)> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidInput(format!(
                "cannot apply {:?} to an empty {}x{} image",
                self, width, height
            )));
        }

        let matrix = self.matrix(width, height);
        let moved = apply_affine(&matrix, corners).permute(self.roles());
        let output = self.remap(image);

        debug!(
            out_width = output.width(),
            out_height = output.height(),
            corners = %moved,
            "Affine transform applied"
        );

        Ok((output, moved))
    }
}

/// Rotate a quarter turn clockwise. The output is `height` wide and `width` tall.
pub fn rotate_90_clockwise(image: &RgbImage, corners: &CornerSet) -> Result<(RgbImage, CornerSet)> {
    AffineOp::Rotate90Clockwise.apply(image, corners)
}

/// Mirror across the vertical axis.
pub fn flip_horizontal(image: &RgbImage, corners: &CornerSet) -> Result<(RgbImage, CornerSet)> {
    AffineOp::FlipHorizontal.apply(image, corners)
}

/// Mirror across the horizontal axis.
pub fn flip_vertical(image: &RgbImage, corners: &CornerSet) -> Result<(RgbImage, CornerSet)> {
    AffineOp::FlipVertical.apply(image, corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let blue = x * 7 + y * 3;
            Rgb([x as u8, y as u8, blue as u8])
        })
    }

    #[test]
    fn test_rotate_full_frame() {
        let img = gradient(400, 300);
        let frame = CornerSet::full_frame(400, 300);
        let (rotated, corners) = rotate_90_clockwise(&img, &frame).unwrap();

        assert_eq!(rotated.dimensions(), (300, 400));
        assert!(corners.approx_eq(&CornerSet::full_frame(300, 400), 1e-9));
    }

    #[test]
    fn test_rotate_pixel_follows_matrix() {
        let img = gradient(5, 3);
        let (rotated, _) = rotate_90_clockwise(&img, &CornerSet::full_frame(5, 3)).unwrap();

        let m = AffineOp::Rotate90Clockwise.matrix(5, 3);
        for (x, y) in [(0u32, 0u32), (4, 0), (2, 1), (0, 2)] {
            let centre = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let moved = Point::from(m * centre.to_homogeneous());
            let (dx, dy) = (moved.x.floor() as u32, moved.y.floor() as u32);
            assert_eq!(rotated.get_pixel(dx, dy), img.get_pixel(x, y));
        }
    }

    #[test]
    fn test_flip_horizontal_swaps_rows_members() {
        let img = gradient(6, 4);
        let corners = CornerSet::new([
            Point::new(1.0, 0.5),
            Point::new(5.0, 1.0),
            Point::new(5.5, 3.5),
            Point::new(0.5, 3.0),
        ]);
        let (flipped, moved) = flip_horizontal(&img, &corners).unwrap();

        assert_eq!(flipped.get_pixel(0, 2), img.get_pixel(5, 2));
        assert_eq!(moved[0], Point::new(1.0, 1.0));
        assert_eq!(moved[1], Point::new(5.0, 0.5));
        assert_eq!(moved[2], Point::new(5.5, 3.0));
        assert_eq!(moved[3], Point::new(0.5, 3.5));
    }

    #[test]
    fn test_flip_vertical_swaps_rows() {
        let img = gradient(6, 4);
        let (flipped, moved) = flip_vertical(&img, &CornerSet::full_frame(6, 4)).unwrap();

        assert_eq!(flipped.get_pixel(3, 0), img.get_pixel(3, 3));
        assert_eq!(moved, CornerSet::full_frame(6, 4));
    }

    #[test]
    fn test_empty_image_is_invalid() {
        let img = RgbImage::new(0, 10);
        let result = flip_vertical(&img, &CornerSet::full_frame(0, 10));
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_source_not_mutated() {
        let img = gradient(8, 8);
        let copy = img.clone();
        let _ = rotate_90_clockwise(&img, &CornerSet::full_frame(8, 8)).unwrap();
        assert_eq!(img, copy);
    }
}
