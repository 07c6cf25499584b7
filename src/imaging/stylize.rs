//! Artistic effects: pencil sketch and oil painting.

use super::calculations::opencv_kernel_sigma;
use super::tone::{luma601, to_luma601};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use rayon::prelude::*;

/// Kernel width of the dodge blur.
const SKETCH_KERNEL: u32 = 21;

/// Pencil sketch via colour dodge of the luma over its blurred negative.
pub fn sketch(image: &DynamicImage) -> DynamicImage {
    let gray = to_luma601(image);
    let mut inverted = gray.clone();
    for px in inverted.pixels_mut() {
        px[0] = 255 - px[0];
    }
    let blurred = gaussian_blur_f32(&inverted, opencv_kernel_sigma(SKETCH_KERNEL));

    let out = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = gray.get_pixel(x, y)[0];
        let b = blurred.get_pixel(x, y)[0];
        Luma([dodge(g, 255 - b)])
    });
    DynamicImage::ImageLuma8(out)
}

/// `round(value * 256 / divisor)` saturated to 255; 0 when `divisor` is 0.
#[inline]
fn dodge(value: u8, divisor: u8) -> u8 {
    if divisor == 0 {
        return 0;
    }
    let scaled = (value as f32 * 256.0 / divisor as f32).round();
    scaled.min(255.0) as u8
}

/// Oil painting: every pixel takes the mean colour of the most common
/// intensity bucket in its `(2r + 1)²` neighbourhood.
pub fn oil_paint(image: &DynamicImage, radius: u32, levels: u32) -> DynamicImage {
    let src = image.to_rgba8();
    let (w, h) = src.dimensions();
    let r = radius as i64;
    let levels = levels.clamp(2, 256) as usize;

    let intensity: Vec<usize> = src
        .pixels()
        .map(|p| luma601(p[0], p[1], p[2]) as usize * (levels - 1) / 255)
        .collect();

    let mut out = vec![0u8; (w * h * 4) as usize];
    out.par_chunks_mut((w * 4) as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            let mut counts = vec![0u32; levels];
            let mut sums = vec![[0u32; 3]; levels];

            for x in 0..w as i64 {
                counts.iter_mut().for_each(|c| *c = 0);
                sums.iter_mut().for_each(|s| *s = [0; 3]);

                for sy in (y - r).max(0)..=(y + r).min(h as i64 - 1) {
                    for sx in (x - r).max(0)..=(x + r).min(w as i64 - 1) {
                        let idx = (sy as u32 * w + sx as u32) as usize;
                        let bucket = intensity[idx];
                        let px = src.get_pixel(sx as u32, sy as u32);
                        counts[bucket] += 1;
                        for c in 0..3 {
                            sums[bucket][c] += px[c] as u32;
                        }
                    }
                }

                let (best, &n) = counts
                    .iter()
                    .enumerate()
                    .max_by_key(|&(_, n)| *n)
                    .unwrap_or((0, &1));
                let n = n.max(1);
                let i = (x * 4) as usize;
                for c in 0..3 {
                    row[i + c] = ((sums[best][c] + n / 2) / n) as u8;
                }
                row[i + 3] = src.get_pixel(x as u32, y as u32)[3];
            }
        });

    RgbaImage::from_raw(w, h, out)
        .map(DynamicImage::ImageRgba8)
        .unwrap_or_else(|| DynamicImage::ImageRgba8(src))
}
