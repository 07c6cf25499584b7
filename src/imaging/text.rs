//! Text captions rendered with `ab_glyph` through `imageproc::drawing`.

use super::params::TextOverlay;
use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_text_mut;

/// Draw `overlay.text` with its top-left corner at `(x, y)`. Output is RGBA8.
///
/// Glyphs falling outside the canvas are clipped.
pub fn draw_text(image: &DynamicImage, overlay: &TextOverlay, font: &FontArc) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    if !overlay.text.is_empty() {
        draw_text_mut(
            &mut canvas,
            Rgba(overlay.color),
            overlay.x,
            overlay.y,
            PxScale::from(overlay.size),
            font,
            &overlay.text,
        );
    }
    DynamicImage::ImageRgba8(canvas)
}
