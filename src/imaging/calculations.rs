//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::CropBox;

/// Shrink `source` so it fits inside `bounds`, preserving aspect ratio.
///
/// Never enlarges and never returns a zero edge.
///
/// # Examples
/// ```
/// # use photofx::imaging::{Dimensions, fit_within};
/// let d = fit_within(Dimensions { width: 1000, height: 500 }, Dimensions { width: 200, height: 200 });
/// assert_eq!((d.width, d.height), (200, 100));
/// ```
pub fn fit_within(source: Dimensions, bounds: Dimensions) -> Dimensions {
    let scale_w = bounds.width as f64 / source.width as f64;
    let scale_h = bounds.height as f64 / source.height as f64;
    let scale = scale_w.min(scale_h);

    if scale >= 1.0 {
        return source;
    }

    Dimensions {
        width: ((source.width as f64 * scale).round() as u32).max(1),
        height: ((source.height as f64 * scale).round() as u32).max(1),
    }
}

/// Canvas size after rotating `source` by `degrees` about its centre with expansion.
///
/// Quarter turns are exact (edges swap or stay); other angles take the
/// ceiling of the rotated extent.
pub fn rotated_bounds(source: Dimensions, degrees: f32) -> Dimensions {
    match quarter_turns(degrees) {
        Some(0) | Some(2) => return source,
        Some(_) => {
            return Dimensions {
                width: source.height,
                height: source.width,
            };
        }
        None => {}
    }

    let theta = (degrees as f64).to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let w = source.width as f64;
    let h = source.height as f64;

    // Snap away float noise so e.g. 100.0000001 does not become 101.
    let extent = |v: f64| ((v - 1e-6).ceil().max(1.0)) as u32;
    Dimensions {
        width: extent(w * cos + h * sin),
        height: extent(w * sin + h * cos),
    }
}

/// Number of counter-clockwise quarter turns if `degrees` is a multiple of 90.
pub fn quarter_turns(degrees: f32) -> Option<u32> {
    let turns = degrees / 90.0;
    if (turns - turns.round()).abs() > 1e-6 {
        return None;
    }
    Some((turns.round() as i64).rem_euclid(4) as u32)
}

/// Grid used by pixelation: `(downscaled, upscaled)`.
///
/// The downscaled grid is `source / block` (at least 1 cell per axis); the
/// upscaled output is the grid times `block`, so a remainder that does not
/// fill a whole block is dropped.
pub fn pixelate_grid(source: Dimensions, block: u32) -> (Dimensions, Dimensions) {
    let block = block.max(1);
    let grid = Dimensions {
        width: (source.width / block).max(1),
        height: (source.height / block).max(1),
    };
    let output = Dimensions {
        width: grid.width * block,
        height: grid.height * block,
    };
    (grid, output)
}

/// Size of a crop rectangle, rejecting inverted or empty boxes.
pub fn crop_region(crop: &CropBox) -> Result<Dimensions, String> {
    if crop.right <= crop.left {
        return Err(format!(
            "right ({}) must be greater than left ({})",
            crop.right, crop.left
        ));
    }
    if crop.bottom <= crop.top {
        return Err(format!(
            "bottom ({}) must be greater than top ({})",
            crop.bottom, crop.top
        ));
    }
    let width = crop
        .right
        .checked_sub(crop.left)
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| "crop too wide".to_string())?;
    let height = crop
        .bottom
        .checked_sub(crop.top)
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| "crop too tall".to_string())?;
    Ok(Dimensions { width, height })
}

/// Canvas for a drop shadow: room for the offset on every side.
///
/// Saturates at `u32::MAX` so extreme offsets fail the size check instead of
/// wrapping.
pub fn shadow_canvas(source: Dimensions, offset: (i32, i32)) -> Dimensions {
    let grow = |edge: u32, d: i32| edge.saturating_add(d.unsigned_abs().saturating_mul(2));
    Dimensions {
        width: grow(source.width, offset.0),
        height: grow(source.height, offset.1),
    }
}

/// `source` scaled by `scale`, truncated, never below 1px.
pub fn scaled_canvas(source: Dimensions, scale: f32) -> Dimensions {
    Dimensions {
        width: ((source.width as f64 * scale as f64) as u32).max(1),
        height: ((source.height as f64 * scale as f64) as u32).max(1),
    }
}

/// Gaussian sigma OpenCV derives for a kernel of `ksize` taps when sigma is 0.
pub fn opencv_kernel_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
