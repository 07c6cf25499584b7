//! Colour-keyed background removal.
//!
//! The background is assumed to be the dominant colour around the image
//! border (product shots, scans, studio portraits). Pixels close to that
//! colour and connected to the border are cut away; the mask edge is then
//! feathered and folded into the alpha channel.
//!
//! ## Steps
//!
//! 1. Estimate the key colour as the per-channel median of a border ring.
//! 2. Flood-fill (4-connected) from every border pixel within `tolerance`.
//! 3. Blur the resulting foreground mask by `feather`.
//! 4. Multiply the mask into the existing alpha.

use super::params::Matting;
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use std::collections::VecDeque;

/// Width of the border ring sampled for the key colour.
pub fn border_width(width: u32, height: u32) -> u32 {
    (width.min(height) / 50).max(1)
}

/// Per-channel median of the pixels within `ring` of the edge.
pub fn estimate_background(src: &RgbaImage, ring: u32) -> [u8; 3] {
    let (w, h) = src.dimensions();
    let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for (x, y, px) in src.enumerate_pixels() {
        let on_border = x < ring || y < ring || x + ring >= w || y + ring >= h;
        if on_border {
            for c in 0..3 {
                channels[c].push(px[c]);
            }
        }
    }
    channels.map(|mut values| {
        if values.is_empty() {
            return 0;
        }
        let mid = values.len() / 2;
        *values.select_nth_unstable(mid).1
    })
}

fn distance(px: &image::Rgba<u8>, key: [u8; 3]) -> f32 {
    (0..3)
        .map(|c| {
            let d = px[c] as f32 - key[c] as f32;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Foreground mask: 0 where background connected to the border, 255 elsewhere.
pub fn foreground_mask(src: &RgbaImage, key: [u8; 3], tolerance: f32) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut mask = GrayImage::from_pixel(w, h, Luma([255]));
    let mut queue = VecDeque::new();

    let is_key = |x: u32, y: u32| {
        let px = src.get_pixel(x, y);
        px[3] == 0 || distance(px, key) <= tolerance
    };

    let seed = |x: u32, y: u32, mask: &mut GrayImage, queue: &mut VecDeque<(u32, u32)>| {
        if mask.get_pixel(x, y)[0] == 255 && is_key(x, y) {
            mask.put_pixel(x, y, Luma([0]));
            queue.push_back((x, y));
        }
    };

    for x in 0..w {
        seed(x, 0, &mut mask, &mut queue);
        seed(x, h - 1, &mut mask, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut mask, &mut queue);
        seed(w - 1, y, &mut mask, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        if x > 0 {
            seed(x - 1, y, &mut mask, &mut queue);
        }
        if x + 1 < w {
            seed(x + 1, y, &mut mask, &mut queue);
        }
        if y > 0 {
            seed(x, y - 1, &mut mask, &mut queue);
        }
        if y + 1 < h {
            seed(x, y + 1, &mut mask, &mut queue);
        }
    }

    mask
}

/// Cut the border-connected background out of `image`. Output is RGBA8.
pub fn remove_background(image: &DynamicImage, params: &Matting) -> DynamicImage {
    let mut src = image.to_rgba8();
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return DynamicImage::ImageRgba8(src);
    }

    let key = estimate_background(&src, border_width(w, h));
    let mut mask = foreground_mask(&src, key, params.tolerance);
    if params.feather > 0.0 {
        mask = gaussian_blur_f32(&mask, params.feather);
    }

    for (x, y, px) in src.enumerate_pixels_mut() {
        let m = mask.get_pixel(x, y)[0] as u32;
        px[3] = ((px[3] as u32 * m + 127) / 255) as u8;
    }
    tracing::debug!(?key, tolerance = params.tolerance, "background keyed out");
    DynamicImage::ImageRgba8(src)
}
