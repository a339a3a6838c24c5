use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::morphology::{dilate, erode};
use imageproc::point::Point as PixelPoint;
use tracing::{debug, info, instrument, warn};

use crate::corners::sort_corners;
use crate::geometry::{CornerSet, Point};

/// Tuning for the automatic corner detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Multiplier applied to grayscale intensities before clamping.
    pub contrast: f64,
    /// Working resolution relative to the input. Corners are scaled back by
    /// its inverse.
    pub scale_factor: f64,
    pub bilateral_diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Half-width of the square structuring element (2 gives a 5x5 kernel).
    pub kernel_radius: u8,
    pub dilate_iterations: u32,
    pub erode_iterations: u32,
    /// Polygon simplification tolerance as a fraction of contour length.
    pub approx_tolerance: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            contrast: 1.5,
            scale_factor: 0.4,
            bilateral_diameter: 7,
            sigma_color: 121.0,
            sigma_space: 121.0,
            canny_low: 9.0,
            canny_high: 50.0,
            kernel_radius: 2,
            dilate_iterations: 2,
            erode_iterations: 1,
            approx_tolerance: 0.03,
        }
    }
}

/// Whether the corners came from a real quadrilateral in the photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionOutcome {
    /// A 4-vertex contour was found; `area` is its enclosed area in input pixels.
    Detected { area: f64 },
    /// Nothing credible was found and the full image frame was returned.
    Fallback,
}

impl DetectionOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, DetectionOutcome::Detected { .. })
    }
}

/// Result of the detection pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub corners: CornerSet,
    pub outcome: DetectionOutcome,
}

/// Grayscale with a contrast boost, clamped to the valid range
fn to_grayscale_boosted(img: &RgbImage, contrast: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let luma = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        let boosted = (luma * contrast).clamp(0.0, 255.0) as u8;
        gray.put_pixel(x, y, Luma([boosted]));
    }

    gray
}

fn downscale(gray: &GrayImage, factor: f64) -> GrayImage {
    let width = ((gray.width() as f64 * factor) as u32).max(1);
    let height = ((gray.height() as f64 * factor) as u32).max(1);
    imageops::resize(gray, width, height, FilterType::Triangle)
}

/// Dilate then erode with a square kernel to bridge gaps in edge contours.
fn close_edges(edges: &GrayImage, params: &DetectionParams) -> GrayImage {
    let mut closed = edges.clone();
    for _ in 0..params.dilate_iterations {
        closed = dilate(&closed, Norm::LInf, params.kernel_radius);
    }
    for _ in 0..params.erode_iterations {
        closed = erode(&closed, Norm::LInf, params.kernel_radius);
    }
    closed
}

/// Outer borders that are not nested inside any other contour.
fn external_contours(binary: &GrayImage) -> Vec<Vec<PixelPoint<u32>>> {
    find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

fn to_point(p: &PixelPoint<u32>) -> Point {
    Point::new(p.x as f64, p.y as f64)
}

/// Distance from `p` to the infinite line through `a` and `b`.
fn line_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let length = (b - a).norm();
    if length == 0.0 {
        return (p - a).norm();
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / length
}

/// Douglas-Peucker on a closed contour.
///
/// The loop is cut at its first point and at the point farthest from it, and
/// each half is simplified as an open curve. Because the first point is an
/// arbitrary place on the boundary, vertices that end up lying on the line
/// between their neighbours are then dropped.
fn approximate_closed_polygon(contour: &[PixelPoint<u32>], epsilon: f64) -> Vec<Point> {
    let Some(&start) = contour.first() else {
        return Vec::new();
    };

    let squared = |p: &PixelPoint<u32>| {
        let (dx, dy) = (p.x as i64 - start.x as i64, p.y as i64 - start.y as i64);
        dx * dx + dy * dy
    };
    let far = contour
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| squared(*p))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![to_point(&start)];
    }

    let mut vertices = approximate_polygon_dp(&contour[..=far], epsilon, false);
    let mut closing = contour[far..].to_vec();
    closing.push(start);
    let second = approximate_polygon_dp(&closing, epsilon, false);

    vertices.pop();
    vertices.extend(second);
    vertices.pop();

    let mut polygon: Vec<Point> = vertices.iter().map(to_point).collect();
    loop {
        let n = polygon.len();
        if n <= 3 {
            break;
        }
        let redundant = (0..n).find(|&i| {
            let prev = &polygon[(i + n - 1) % n];
            let next = &polygon[(i + 1) % n];
            line_distance(&polygon[i], prev, next) <= epsilon
        });
        match redundant {
            Some(i) => {
                polygon.remove(i);
            }
            None => break,
        }
    }
    polygon
}

/// Largest-area contour whose simplified polygon has exactly four vertices.
fn find_document_quad(binary: &GrayImage, tolerance: f64) -> Option<([Point; 4], f64)> {
    let contours = external_contours(binary);
    debug!(contour_count = contours.len(), "External contours found");

    let mut best: Option<([Point; 4], f64)> = None;
    for contour in &contours {
        if contour.len() < 4 {
            continue;
        }

        let perimeter = arc_length(contour, true);
        let epsilon = tolerance * perimeter;
        if epsilon <= 0.0 {
            continue;
        }

        let area = contour_area(contour);
        let best_area = best.as_ref().map_or(0.0, |(_, a)| *a);
        if area <= best_area {
            continue;
        }

        let polygon = approximate_closed_polygon(contour, epsilon);
        if let Ok(quad) = <[Point; 4]>::try_from(polygon.as_slice()) {
            best = Some((quad, area));
        }
    }

    best
}

/// Propose document corners for `img` with the default parameters.
pub fn auto_detect_corners(img: &RgbImage) -> Detection {
    auto_detect_corners_with(img, &DetectionParams::default())
}

/// Propose document corners for `img`.
///
/// Never fails: when no four-sided contour is found (including on an empty
/// image) the result is the full image frame with
/// [`DetectionOutcome::Fallback`].
#[instrument(skip_all, fields(width = img.width(), height = img.height()))]
pub fn auto_detect_corners_with(img: &RgbImage, params: &DetectionParams) -> Detection {
    let (width, height) = img.dimensions();
    let fallback = Detection {
        corners: CornerSet::full_frame(width, height),
        outcome: DetectionOutcome::Fallback,
    };
    if width == 0 || height == 0 || params.scale_factor <= 0.0 {
        warn!("Nothing to detect on; using the full frame");
        return fallback;
    }

    let gray = to_grayscale_boosted(img, params.contrast);
    let small = downscale(&gray, params.scale_factor);
    debug!(
        small_width = small.width(),
        small_height = small.height(),
        contrast = params.contrast,
        "Converted to grayscale and downscaled"
    );
    if small.width() < 3 || small.height() < 3 {
        warn!("Working image too small for edge detection; using the full frame");
        return fallback;
    }

    let smoothed = bilateral_filter(
        &small,
        params.bilateral_diameter,
        params.sigma_color,
        params.sigma_space,
    );
    let edges = canny(&smoothed, params.canny_low, params.canny_high);
    debug!(
        low = params.canny_low,
        high = params.canny_high,
        "Canny edge detection complete"
    );

    let closed = close_edges(&edges, params);

    match find_document_quad(&closed, params.approx_tolerance) {
        Some((quad, area)) => {
            let inverse = 1.0 / params.scale_factor;
            let corners = sort_corners(&quad).scale(inverse);
            let area = area * inverse * inverse;
            info!(corners = %corners, area, "Document quadrilateral detected");
            Detection {
                corners,
                outcome: DetectionOutcome::Detected { area },
            }
        }
        None => {
            warn!("No four-sided contour found; using the full frame");
            fallback
        }
    }
}
