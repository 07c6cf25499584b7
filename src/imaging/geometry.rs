//! Geometric edits: resize, fit, rotate, crop, flip and pixelate.

use super::backend::Dimensions;
use super::calculations::{fit_within, pixelate_grid, quarter_turns, rotated_bounds};
use super::params::{CropBox, FlipAxis, Size};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

/// Resize to exactly `size`, ignoring aspect ratio.
pub fn resize(image: &DynamicImage, size: Size) -> DynamicImage {
    image.resize_exact(size.width, size.height, FilterType::CatmullRom)
}

/// Shrink into `bounds` preserving aspect ratio; never enlarges.
pub fn fit(image: &DynamicImage, bounds: Dimensions) -> DynamicImage {
    let source = Dimensions::of(image);
    let target = fit_within(source, bounds);
    if target == source {
        return image.clone();
    }
    image.resize_exact(target.width, target.height, FilterType::Lanczos3)
}

/// Rotate counter-clockwise by `degrees` about the centre, growing the
/// canvas so nothing is clipped.
///
/// Quarter turns are lossless and keep the colour type. Other angles resample
/// bicubically into RGBA with transparent corners.
pub fn rotate(image: &DynamicImage, degrees: f32) -> DynamicImage {
    match quarter_turns(degrees) {
        Some(0) => return image.clone(),
        Some(1) => return image.rotate270(),
        Some(2) => return image.rotate180(),
        Some(3) => return image.rotate90(),
        _ => {}
    }

    let src = image.to_rgba8();
    let source = Dimensions::of(image);
    let bounds = rotated_bounds(source, degrees);

    let projection = Projection::translate(bounds.width as f32 / 2.0, bounds.height as f32 / 2.0)
        * Projection::rotate(-degrees.to_radians())
        * Projection::translate(-(source.width as f32) / 2.0, -(source.height as f32) / 2.0);

    let mut out = RgbaImage::new(bounds.width, bounds.height);
    warp_into(
        &src,
        &projection,
        Interpolation::Bicubic,
        Rgba([0, 0, 0, 0]),
        &mut out,
    );
    DynamicImage::ImageRgba8(out)
}

/// Crop to `crop`. Boxes extending past the image are padded with
/// transparent pixels. The box must already be validated
/// ([`crop_region`](super::calculations::crop_region)).
pub fn crop(image: &DynamicImage, crop: &CropBox, size: Dimensions) -> DynamicImage {
    let inside = crop.left >= 0
        && crop.top >= 0
        && crop.right <= image.width() as i64
        && crop.bottom <= image.height() as i64;
    if inside {
        return image.crop_imm(crop.left as u32, crop.top as u32, size.width, size.height);
    }

    let mut out = RgbaImage::new(size.width, size.height);
    imageops::replace(&mut out, &image.to_rgba8(), -crop.left, -crop.top);
    DynamicImage::ImageRgba8(out)
}

pub fn flip(image: &DynamicImage, axis: FlipAxis) -> DynamicImage {
    match axis {
        FlipAxis::Horizontal => image.fliph(),
        FlipAxis::Vertical => image.flipv(),
    }
}

/// Mosaic: nearest-neighbour down to a `block`-sized grid and back up.
pub fn pixelate(image: &DynamicImage, block: u32) -> DynamicImage {
    let (grid, output) = pixelate_grid(Dimensions::of(image), block);
    image
        .resize_exact(grid.width, grid.height, FilterType::Nearest)
        .resize_exact(output.width, output.height, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn two_pixel_row() -> DynamicImage {
        // [red, blue]
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn resize_ignores_aspect() {
        let img = DynamicImage::new_rgb8(40, 10);
        let out = resize(&img, Size { width: 7, height: 30 });
        assert_eq!(out.dimensions(), (7, 30));
    }

    #[test]
    fn fit_shrinks_preserving_aspect() {
        let img = DynamicImage::new_rgb8(400, 200);
        let out = fit(&img, Dimensions { width: 100, height: 100 });
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn fit_never_enlarges() {
        let img = DynamicImage::new_rgb8(40, 20);
        let out = fit(&img, Dimensions { width: 100, height: 100 });
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn rotate_90_is_counter_clockwise() {
        let out = rotate(&two_pixel_row(), 90.0);
        assert_eq!(out.dimensions(), (1, 2));
        // Counter-clockwise: the right-hand (blue) pixel ends up on top.
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn rotate_negative_90_is_clockwise() {
        let out = rotate(&two_pixel_row(), -90.0);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn rotate_full_turn_is_identity() {
        let img = two_pixel_row();
        assert_eq!(rotate(&img, 360.0), img);
    }

    #[test]
    fn rotate_arbitrary_expands_with_transparent_corners() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([10, 200, 10])));
        let out = rotate(&img, 45.0);
        assert_eq!(out.dimensions(), (71, 71));
        let rgba = out.as_rgba8().unwrap();
        assert_eq!(rgba.get_pixel(0, 0)[3], 0);
        let centre = rgba.get_pixel(35, 35).0;
        assert!(centre[3] > 250);
        assert!(centre[1] > 190);
    }

    #[test]
    fn rotate_30_turns_right_end_upward() {
        // Red left half, blue right half.
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(60, 20, |x, _| {
            if x < 30 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        }));
        let out = rotate(&img, 30.0);
        assert_eq!(out.dimensions(), (62, 48));
        let rgba = out.as_rgba8().unwrap();

        let upper_right = rgba.get_pixel(48, 14).0;
        assert!(upper_right[2] > 200 && upper_right[0] < 50 && upper_right[3] > 250);
        let lower_left = rgba.get_pixel(14, 34).0;
        assert!(lower_left[0] > 200 && lower_left[2] < 50 && lower_left[3] > 250);
        // A clockwise turn would put the blue end here.
        assert_eq!(rgba.get_pixel(48, 34)[3], 0);
    }

    #[test]
    fn crop_inside_keeps_type() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(10, 10, |x, y| {
            Rgb([x as u8, y as u8, 0])
        }));
        let c = CropBox { left: 2, top: 3, right: 6, bottom: 5 };
        let out = crop(&img, &c, Dimensions { width: 4, height: 2 });
        let rgb = out.as_rgb8().expect("in-bounds crop should keep RGB");
        assert_eq!(rgb.dimensions(), (4, 2));
        assert_eq!(rgb.get_pixel(0, 0).0, [2, 3, 0]);
    }

    #[test]
    fn crop_outside_pads_transparent() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));
        let c = CropBox { left: -2, top: 0, right: 3, bottom: 2 };
        let out = crop(&img, &c, Dimensions { width: 5, height: 2 });
        let rgba = out.as_rgba8().unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(rgba.get_pixel(2, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn flip_horizontal_swaps_columns() {
        let out = flip(&two_pixel_row(), FlipAxis::Horizontal);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn pixelate_makes_uniform_blocks() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(25, 20, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, 0])
        }));
        let out = pixelate(&img, 10);
        assert_eq!(out.dimensions(), (20, 20));
        let first = out.get_pixel(0, 0);
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(out.get_pixel(x, y), first);
            }
        }
    }
}
