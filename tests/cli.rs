use std::path::Path;

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use predicates::str::contains;

fn write_photo(path: &Path) {
    let mut img = RgbImage::from_pixel(500, 400, Rgb([30, 30, 30]));
    let quad = [
        Point::new(100, 80),
        Point::new(400, 60),
        Point::new(420, 330),
        Point::new(90, 340),
    ];
    draw_polygon_mut(&mut img, &quad, Rgb([220, 220, 220]));
    img.save(path).expect("write fixture");
}

#[test]
fn full_frame_copy_keeps_dimensions() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("photo.png");
    let output = temp.path().join("out.png");
    write_photo(&input);

    Command::cargo_bin("docscan")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("Saved scanned document"));

    let scanned = image::open(&output).expect("read output");
    assert_eq!((scanned.width(), scanned.height()), (500, 400));
}

#[test]
fn default_output_path_sits_next_to_input() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("photo.png");
    write_photo(&input);

    Command::cargo_bin("docscan")
        .unwrap()
        .arg(&input)
        .assert()
        .success();

    assert!(temp.path().join("photo_scanned.png").exists());
}

#[test]
fn auto_detection_crops_to_document() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("photo.png");
    let output = temp.path().join("out.png");
    let preview = temp.path().join("preview.png");
    write_photo(&input);

    Command::cargo_bin("docscan")
        .unwrap()
        .arg(&input)
        .args(["--auto", "-o"])
        .arg(&output)
        .arg("--preview")
        .arg(&preview)
        .assert()
        .success();

    let scanned = image::open(&output).expect("read output");
    let (width, height) = (scanned.width(), scanned.height());
    assert!(width > 250 && width < 360, "width {}", width);
    assert!(height > 220 && height < 320, "height {}", height);
    assert!(preview.exists());
}

#[test]
fn manual_corners_with_rotation() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("photo.png");
    let output = temp.path().join("out.png");
    write_photo(&input);

    Command::cargo_bin("docscan")
        .unwrap()
        .arg(&input)
        .args(["--corners", "300,200 100,50 300,50 100,200"])
        .args(["--rotate", "1", "-o"])
        .arg(&output)
        .assert()
        .success();

    let scanned = image::open(&output).expect("read output");
    assert_eq!((scanned.width(), scanned.height()), (150, 200));
}

#[test]
fn too_few_corners_fail() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("photo.png");
    write_photo(&input);

    Command::cargo_bin("docscan")
        .unwrap()
        .arg(&input)
        .args(["--corners", "0,0 10,0"])
        .assert()
        .failure()
        .stderr(contains("missing corners"));
}

#[test]
fn collinear_corners_fail() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("photo.png");
    write_photo(&input);

    Command::cargo_bin("docscan")
        .unwrap()
        .arg(&input)
        .args(["--corners", "0,0 100,0 200,0 0,100"])
        .assert()
        .failure()
        .stderr(contains("degenerate geometry"));
}

#[test]
fn missing_input_file_fails() {
    Command::cargo_bin("docscan")
        .unwrap()
        .arg("does/not/exist.png")
        .assert()
        .failure()
        .stderr(contains("Failed to open input file"));
}
