use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::geometry::CornerSet;

const BORDER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Copy of `img` with the corner quadrilateral outlined and each corner
/// marked by a filled disc. Stroke width scales with the image so the outline
/// stays visible on large photos.
pub fn draw_border(img: &RgbImage, corners: &CornerSet) -> RgbImage {
    let mut canvas = img.clone();
    let half_width = (img.width().max(img.height()) / 400).max(1) as i32;
    let radius = (half_width * 4).max(3);

    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        let edge = b - a;
        let length = edge.norm();
        if length == 0.0 {
            continue;
        }
        let normal = (-edge.y / length, edge.x / length);

        for k in -half_width..=half_width {
            let (ox, oy) = (normal.0 * k as f64, normal.1 * k as f64);
            draw_line_segment_mut(
                &mut canvas,
                ((a.x + ox) as f32, (a.y + oy) as f32),
                ((b.x + ox) as f32, (b.y + oy) as f32),
                BORDER_COLOR,
            );
        }
    }

    for p in corners.points() {
        let centre = (p.x.round() as i32, p.y.round() as i32);
        draw_filled_circle_mut(&mut canvas, centre, radius, BORDER_COLOR);
    }

    canvas
}
