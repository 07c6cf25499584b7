//! Per-pixel colour effects: grayscale, sepia, negative, histogram
//! equalisation and CLAHE.

use super::params::ColorFilter;
use image::{DynamicImage, GrayImage, Luma, RgbImage, RgbaImage};
use imageproc::contrast::equalize_histogram;
use rayon::prelude::*;

/// ITU-R 601 luma, rounded.
#[inline]
pub(crate) fn luma601(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

/// Luma plane of any image, alpha ignored.
pub(crate) fn to_luma601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma601(r, g, b)])
    })
}

/// Apply one of the basic colour filters. Alpha is dropped, as the filters
/// operate on flattened RGB.
pub fn color_filter(image: &DynamicImage, filter: ColorFilter) -> DynamicImage {
    match filter {
        ColorFilter::Grayscale => DynamicImage::ImageLuma8(to_luma601(image)),
        ColorFilter::Sepia => DynamicImage::ImageRgb8(sepia(&image.to_rgb8())),
        ColorFilter::Negative => {
            let mut rgb = image.to_rgb8();
            for px in rgb.pixels_mut() {
                px.0 = px.0.map(|c| 255 - c);
            }
            DynamicImage::ImageRgb8(rgb)
        }
    }
}

fn sepia(rgb: &RgbImage) -> RgbImage {
    let mut out = rgb.clone();
    for px in out.pixels_mut() {
        let [r, g, b] = px.0.map(|c| c as f32);
        let tr = 0.393 * r + 0.769 * g + 0.189 * b;
        let tg = 0.349 * r + 0.686 * g + 0.168 * b;
        let tb = 0.272 * r + 0.534 * g + 0.131 * b;
        px.0 = [tr, tg, tb].map(|v| (v as u32).min(255) as u8);
    }
    out
}

/// Histogram equalisation of each colour channel independently.
pub fn equalize(image: &DynamicImage) -> DynamicImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return DynamicImage::ImageLuma8(equalize_histogram(gray));
    }

    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let channels: Vec<GrayImage> = (0..3)
        .map(|c| {
            let plane = GrayImage::from_fn(w, h, |x, y| Luma([rgba.get_pixel(x, y)[c]]));
            equalize_histogram(&plane)
        })
        .collect();

    let out = RgbaImage::from_fn(w, h, |x, y| {
        let a = rgba.get_pixel(x, y)[3];
        image::Rgba([
            channels[0].get_pixel(x, y)[0],
            channels[1].get_pixel(x, y)[0],
            channels[2].get_pixel(x, y)[0],
            a,
        ])
    });
    DynamicImage::ImageRgba8(out)
}

/// Contrast-limited adaptive histogram equalisation on the luma channel.
///
/// Colour images round-trip through YCbCr (BT.601) so only brightness is
/// remapped; chroma and alpha are kept.
pub fn clahe(image: &DynamicImage, clip_limit: f32, tiles: u32) -> DynamicImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return DynamicImage::ImageLuma8(clahe_gray(gray, clip_limit, tiles));
    }

    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let luma = GrayImage::from_fn(w, h, |x, y| {
        let [r, g, b, _] = rgba.get_pixel(x, y).0;
        Luma([ycbcr_y(r, g, b)])
    });
    let mapped = clahe_gray(&luma, clip_limit, tiles);

    let out = RgbaImage::from_fn(w, h, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let cb = -0.168736 * r - 0.331264 * g + 0.5 * b;
        let cr = 0.5 * r - 0.418688 * g - 0.081312 * b;
        let y2 = mapped.get_pixel(x, y)[0] as f32;
        image::Rgba([
            clamp_u8(y2 + 1.402 * cr),
            clamp_u8(y2 - 0.344136 * cb - 0.714136 * cr),
            clamp_u8(y2 + 1.772 * cb),
            a,
        ])
    });
    DynamicImage::ImageRgba8(out)
}

#[inline]
fn ycbcr_y(r: u8, g: u8, b: u8) -> u8 {
    clamp_u8(0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
}

#[inline]
pub(crate) fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// CLAHE on a single channel.
///
/// The image is split into a `tiles × tiles` grid (fewer when the image is
/// smaller than the grid). Each tile's histogram is clipped at
/// `clip_limit × mean bin height`, the excess spread evenly over all bins,
/// and the resulting CDF used as that tile's lookup table. Pixels blend the
/// four nearest tile tables bilinearly.
pub fn clahe_gray(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let tile_w = w.div_ceil(tiles.clamp(1, w));
    let tile_h = h.div_ceil(tiles.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            luts.push(tile_lut(gray, (x0, y0, x1, y1), clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let neighbours = |pos: u32, size: u32, count: u32| -> (u32, u32, f32) {
        let f = (pos as f32 + 0.5) / size as f32 - 0.5;
        let lo = (f.floor().max(0.0) as u32).min(count - 1);
        let hi = (lo + 1).min(count - 1);
        let t = (f - lo as f32).clamp(0.0, 1.0);
        (lo, hi, t)
    };

    let mut out = vec![0u8; (w * h) as usize];
    out.par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
            for (x, slot) in row.iter_mut().enumerate() {
                let x = x as u32;
                let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
                let v = gray.get_pixel(x, y)[0] as usize;
                let top = (1.0 - ax) * lut_at(tx0, ty0)[v] + ax * lut_at(tx1, ty0)[v];
                let bottom = (1.0 - ax) * lut_at(tx0, ty1)[v] + ax * lut_at(tx1, ty1)[v];
                *slot = clamp_u8((1.0 - ay) * top + ay * bottom);
            }
        });

    GrayImage::from_raw(w, h, out).unwrap_or_else(|| gray.clone())
}

/// Clipped-histogram lookup table for one tile.
fn tile_lut(gray: &GrayImage, (x0, y0, x1, y1): (u32, u32, u32, u32), clip_limit: f32) -> [f32; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let n = (x1 - x0) * (y1 - y0);

    let clip = ((clip_limit * n as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut lut = [0f32; 256];
    let mut cdf = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[i] = cdf as f32 * 255.0 / n as f32;
    }
    lut
}
