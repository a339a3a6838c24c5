use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, SMatrix, SVector};
use tracing::{debug, info, instrument};

use crate::corners::CornerSelection;
use crate::error::{Result, ScanError};
use crate::geometry::{cross, distance, transform_point, CornerSet, Point, RECTIFY_METRIC};

/// Largest rectified side allowed, as a multiple of the source's longer side.
pub const MAX_OUTPUT_SCALE: u64 = 3;

/// Rectified output size: the top edge gives the width and the left edge the
/// height, both measured with [`RECTIFY_METRIC`] and rounded to the nearest
/// pixel. Spans beyond `u32::MAX` saturate.
pub fn output_size(corners: &CornerSet) -> (u32, u32) {
    let width = distance(&corners[1], &corners[0], RECTIFY_METRIC);
    let height = distance(&corners[3], &corners[0], RECTIFY_METRIC);
    (width.round() as u32, height.round() as u32)
}

/// Reject quadrilaterals where any three vertices are collinear (which
/// includes coincident vertices). Such a set does not determine a homography.
fn ensure_non_degenerate(points: &[Point; 4], what: &str) -> Result<()> {
    let mut span: f64 = 0.0;
    for a in points {
        for b in points {
            span = span.max((a.x - b.x).abs()).max((a.y - b.y).abs());
        }
    }
    if span == 0.0 {
        return Err(ScanError::DegenerateGeometry(format!(
            "{} corners all coincide",
            what
        )));
    }

    let tolerance = 1e-9 * span * span;
    for skip in 0..4 {
        let tri: Vec<&Point> = (0..4).filter(|&i| i != skip).map(|i| &points[i]).collect();
        if cross(tri[0], tri[1], tri[2]).abs() <= tolerance {
            return Err(ScanError::DegenerateGeometry(format!(
                "{} corners contain three collinear points",
                what
            )));
        }
    }
    Ok(())
}

/// Solve the projective transform taking each `src[i]` to `dst[i]`.
///
/// Four correspondences fix the eight unknowns of a homography with its
/// bottom-right entry normalised to 1.
pub fn perspective_transform(src: &[Point; 4], dst: &[Point; 4]) -> Result<Matrix3<f64>> {
    ensure_non_degenerate(src, "source")?;
    ensure_non_degenerate(dst, "target")?;

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);
        let r = i * 2;

        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -x * u;
        a[(r, 7)] = -y * u;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -x * v;
        a[(r + 1, 7)] = -y * v;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b).ok_or_else(|| {
        ScanError::DegenerateGeometry("homography system is singular".to_string())
    })?;

    let h = h.push(1.0);
    Ok(Matrix3::from_row_slice(h.as_slice()))
}

/// Bilinear sample with edge clamping.
fn bilinear_interpolate(img: &RgbImage, x: f64, y: f64) -> [f64; 3] {
    let (width, height) = img.dimensions();
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x_frac = x - x.floor();
    let y_frac = y - y.floor();

    let get_pixel = |px: i64, py: i64| -> Rgb<u8> {
        let px = px.clamp(0, width as i64 - 1) as u32;
        let py = py.clamp(0, height as i64 - 1) as u32;
        *img.get_pixel(px, py)
    };

    let p00 = get_pixel(x0, y0);
    let p10 = get_pixel(x0 + 1, y0);
    let p01 = get_pixel(x0, y0 + 1);
    let p11 = get_pixel(x0 + 1, y0 + 1);

    let mut result = [0.0; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - x_frac) + p10[c] as f64 * x_frac;
        let bottom = p01[c] as f64 * (1.0 - x_frac) + p11[c] as f64 * x_frac;
        result[c] = top * (1.0 - y_frac) + bottom * y_frac;
    }
    result
}

/// Warp `img` through `forward` (source to output coordinates) into a canvas of
/// `size`, sampling by inverse mapping. Output pixels whose source falls
/// outside the image are black.
pub fn warp_perspective(
    img: &RgbImage,
    forward: &Matrix3<f64>,
    size: (u32, u32),
) -> Result<RgbImage> {
    let inverse = forward.try_inverse().ok_or_else(|| {
        ScanError::DegenerateGeometry("perspective transform is not invertible".to_string())
    })?;

    let (src_width, src_height) = img.dimensions();
    let (out_width, out_height) = size;
    let mut output = RgbImage::new(out_width, out_height);

    for out_y in 0..out_height {
        for out_x in 0..out_width {
            let src = transform_point(&inverse, &Point::new(out_x as f64, out_y as f64));

            if src.x > -1.0
                && src.x < src_width as f64
                && src.y > -1.0
                && src.y < src_height as f64
            {
                let sample = bilinear_interpolate(img, src.x, src.y);
                let pixel = Rgb(sample.map(|v| v.round().clamp(0.0, 255.0) as u8));
                output.put_pixel(out_x, out_y, pixel);
            }
        }
    }

    Ok(output)
}

/// Cut the document out of the photo and flatten it.
///
/// The output size comes from the corner spans (see [`output_size`]), so the
/// aspect ratio implied by the corners is kept. Neither side may exceed
/// [`MAX_OUTPUT_SCALE`] times the longer side of the source.
#[instrument(skip_all, fields(width = img.width(), height = img.height(), corners = %corners))]
pub fn crop(img: &RgbImage, corners: &CornerSet) -> Result<RgbImage> {
    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(ScanError::InvalidInput(format!(
            "cannot crop an empty {}x{} image",
            src_width, src_height
        )));
    }

    let (width, height) = output_size(corners);
    if width == 0 || height == 0 {
        return Err(ScanError::DegenerateGeometry(format!(
            "corners span a {}x{} region",
            width, height
        )));
    }

    let limit = MAX_OUTPUT_SCALE * u64::from(src_width.max(src_height));
    if u64::from(width) > limit || u64::from(height) > limit {
        return Err(ScanError::InvalidInput(format!(
            "corners span a {}x{} region, more than {}x the {}x{} source",
            width, height, MAX_OUTPUT_SCALE, src_width, src_height
        )));
    }

    let target = CornerSet::full_frame(width, height);
    let homography = perspective_transform(corners.points(), target.points())?;
    debug!(?homography, "Homography solved");

    let output = warp_perspective(img, &homography, (width, height))?;
    info!(width, height, "Document rectified");
    Ok(output)
}

/// Crop from a manual selection. Every corner must have been picked.
pub fn crop_selection(img: &RgbImage, selection: &CornerSelection) -> Result<RgbImage> {
    let corners = selection.complete()?;
    crop(img, &corners)
}
