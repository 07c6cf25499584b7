//! Neighbourhood filters: sharpen, edge detection, Gaussian blur, Canny and
//! bilateral smoothing.

use super::tone::to_luma601;
use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};
use imageproc::edges::canny as canny_edges;
use imageproc::filter::gaussian_blur_f32;
use rayon::prelude::*;

const SHARPEN_KERNEL: [f32; 9] = [-2.0, -2.0, -2.0, -2.0, 32.0, -2.0, -2.0, -2.0, -2.0];
const EDGE_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

/// 3×3 sharpening (kernel sum 16, so the result is normalised by 16).
///
/// `filter3x3` leaves the one-pixel border untouched at zero; the border is
/// restored from the source so the frame does not turn black.
pub fn sharpen(image: &DynamicImage) -> DynamicImage {
    let filtered = image.filter3x3(&SHARPEN_KERNEL);
    restore_border(image, filtered)
}

fn restore_border(source: &DynamicImage, filtered: DynamicImage) -> DynamicImage {
    let mut out = filtered.to_rgba8();
    let (w, h) = out.dimensions();
    for y in 0..h {
        for x in 0..w {
            if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                out.put_pixel(x, y, source.get_pixel(x, y));
            }
        }
    }
    match source {
        DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(DynamicImage::ImageRgba8(out).to_luma8()),
        DynamicImage::ImageRgb8(_) => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(out).to_rgb8()),
        _ => DynamicImage::ImageRgba8(out),
    }
}

/// Laplacian-style edge map on the luma channel.
///
/// The one-pixel frame keeps the source luma, as with [`sharpen`].
pub fn find_edges(image: &DynamicImage) -> DynamicImage {
    let gray = DynamicImage::ImageLuma8(to_luma601(image));
    let filtered = gray.filter3x3(&EDGE_KERNEL);
    restore_border(&gray, filtered)
}

/// Gaussian blur of all channels. `sigma` must be positive.
pub fn blur(image: &DynamicImage, sigma: f32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gaussian_blur_f32(gray, sigma)),
        DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(gaussian_blur_f32(rgb, sigma)),
        other => DynamicImage::ImageRgba8(gaussian_blur_f32(&other.to_rgba8(), sigma)),
    }
}

/// Canny edge map on the luma channel; output is 0/255.
pub fn canny(image: &DynamicImage, low: f32, high: f32) -> DynamicImage {
    let gray: GrayImage = to_luma601(image);
    DynamicImage::ImageLuma8(canny_edges(&gray, low, high))
}

/// Edge-preserving bilateral smoothing.
///
/// Each output pixel is a weighted mean over a `(2r + 1)²` window, weighted by
/// a Gaussian of spatial distance (`sigma_spatial`) times a Gaussian of RGB
/// distance to the centre pixel (`sigma_color`). Alpha is carried through.
pub fn bilateral(image: &DynamicImage, radius: u32, sigma_color: f32, sigma_spatial: f32) -> DynamicImage {
    let src = image.to_rgba8();
    let (w, h) = src.dimensions();
    let r = radius as i64;

    let spatial: Vec<f32> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .map(|(dx, dy)| {
            let d2 = (dx * dx + dy * dy) as f32;
            (-d2 / (2.0 * sigma_spatial * sigma_spatial)).exp()
        })
        .collect();
    let color_denominator = 2.0 * sigma_color * sigma_color;
    let side = (2 * r + 1) as usize;

    let mut out = vec![0u8; (w * h * 4) as usize];
    out.par_chunks_mut((w * 4) as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..w as i64 {
                let centre = src.get_pixel(x as u32, y as u32).0;
                let mut acc = [0f32; 3];
                let mut total = 0f32;

                for dy in -r..=r {
                    let sy = (y + dy).clamp(0, h as i64 - 1) as u32;
                    for dx in -r..=r {
                        let sx = (x + dx).clamp(0, w as i64 - 1) as u32;
                        let px = src.get_pixel(sx, sy).0;
                        let diff2: f32 = (0..3)
                            .map(|c| {
                                let d = px[c] as f32 - centre[c] as f32;
                                d * d
                            })
                            .sum();
                        let weight = spatial[(dy + r) as usize * side + (dx + r) as usize]
                            * (-diff2 / color_denominator).exp();
                        for c in 0..3 {
                            acc[c] += weight * px[c] as f32;
                        }
                        total += weight;
                    }
                }

                let i = (x * 4) as usize;
                for c in 0..3 {
                    row[i + c] = (acc[c] / total).round().clamp(0.0, 255.0) as u8;
                }
                row[i + 3] = centre[3];
            }
        });

    RgbaImage::from_raw(w, h, out)
        .map(DynamicImage::ImageRgba8)
        .unwrap_or_else(|| DynamicImage::ImageRgba8(src))
}
