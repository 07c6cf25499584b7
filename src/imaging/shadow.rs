//! Shadow synthesis from the subject's alpha channel.
//!
//! Both effects expect a cut-out subject (e.g. the output of background
//! removal). Fully opaque inputs still work but cast a rectangular shadow.

use super::backend::{BackendError, Dimensions};
use super::calculations::{scaled_canvas, shadow_canvas};
use super::params::{DropShadow, Opacity, PerspectiveShadow};
use image::imageops::overlay;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

/// Silhouette of `src` in a flat colour, alpha scaled by `opacity`.
fn silhouette(src: &RgbaImage, rgb: [u8; 3], opacity: Opacity) -> RgbaImage {
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let a = opacity.scale(src.get_pixel(x, y)[3]);
        Rgba([rgb[0], rgb[1], rgb[2], a])
    })
}

fn soften(layer: RgbaImage, radius: f32) -> RgbaImage {
    if radius > 0.0 {
        gaussian_blur_f32(&layer, radius)
    } else {
        layer
    }
}

/// Offset, blurred drop shadow behind the subject.
///
/// The canvas grows by `|offset|` on every side; the subject sits at
/// `(|dx|, |dy|)` and the shadow at that position plus `offset`.
pub fn drop_shadow(image: &DynamicImage, params: &DropShadow) -> DynamicImage {
    let src = image.to_rgba8();
    let canvas = shadow_canvas(Dimensions::of(image), params.offset);
    let [r, g, b, a] = params.color;

    // Canvas carries the shadow colour everywhere so blurring only spreads alpha.
    let mut layer = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([r, g, b, 0]));
    let (dx, dy) = params.offset;
    let subject_x = dx.unsigned_abs() as i64;
    let subject_y = dy.unsigned_abs() as i64;
    image::imageops::replace(
        &mut layer,
        &silhouette(&src, [r, g, b], Opacity(a)),
        subject_x + dx as i64,
        subject_y + dy as i64,
    );

    let mut out = soften(layer, params.blur_radius);
    overlay(&mut out, &src, subject_x, subject_y);
    DynamicImage::ImageRgba8(out)
}

/// Sheared "cast" shadow falling away below the subject.
///
/// The silhouette is pushed through an affine shear whose inverse samples
/// output `(x, y)` from `(x + tan(angle)·y, y + h/2)`, blurred, dropped by
/// 30% of the subject height, and the subject composited on top at the
/// origin of a canvas `scale` times the source size.
pub fn perspective_shadow(
    image: &DynamicImage,
    params: &PerspectiveShadow,
) -> Result<DynamicImage, BackendError> {
    let src = image.to_rgba8();
    let source = Dimensions::of(image);
    let canvas = scaled_canvas(source, params.scale);

    let layer = silhouette(&src, [0, 0, 0], params.opacity);
    let shear = params.angle_degrees.to_radians().tan();
    let half_h = source.height as f32 / 2.0;
    let forward = Projection::from_matrix([
        1.0,
        -shear,
        shear * half_h,
        0.0,
        1.0,
        -half_h,
        0.0,
        0.0,
        1.0,
    ])
    .ok_or_else(|| {
        BackendError::InvalidInput(format!(
            "shadow angle {} gives a degenerate shear",
            params.angle_degrees
        ))
    })?;

    let mut sheared = RgbaImage::new(canvas.width, canvas.height);
    warp_into(
        &layer,
        &forward,
        Interpolation::Bicubic,
        Rgba([0, 0, 0, 0]),
        &mut sheared,
    );
    let sheared = soften(sheared, params.blur_radius);

    let mut out = RgbaImage::new(canvas.width, canvas.height);
    let drop = (source.height as f32 * 0.3) as i64;
    overlay(&mut out, &sheared, 0, drop);
    overlay(&mut out, &src, 0, 0);
    Ok(DynamicImage::ImageRgba8(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Opaque square in the middle of a transparent canvas.
    fn cutout(size: u32, inset: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
            let inside = (inset..size - inset).contains(&x) && (inset..size - inset).contains(&y);
            if inside {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }

    #[test]
    fn drop_shadow_grows_canvas() {
        let out = drop_shadow(&cutout(40, 10), &DropShadow::default());
        assert_eq!((out.width(), out.height()), (70, 70));
    }

    #[test]
    fn drop_shadow_keeps_subject_on_top() {
        let out = drop_shadow(&cutout(40, 10), &DropShadow::default());
        let rgba = out.as_rgba8().unwrap();
        // Subject centre at (15 + 20, 15 + 20)
        assert_eq!(rgba.get_pixel(35, 35).0, [255, 0, 0, 255]);
    }

    #[test]
    fn drop_shadow_falls_at_offset() {
        let params = DropShadow {
            offset: (10, 10),
            blur_radius: 0.0,
            color: [0, 0, 0, 120],
        };
        let out = drop_shadow(&cutout(40, 10), &params);
        let rgba = out.as_rgba8().unwrap();
        // Subject covers 20..40 on the canvas; shadow covers 30..50.
        assert_eq!(rgba.get_pixel(45, 45).0, [0, 0, 0, 120]);
        // Up-left of the subject there is nothing.
        assert_eq!(rgba.get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn drop_shadow_negative_offset_goes_up_left() {
        let params = DropShadow {
            offset: (-10, -10),
            blur_radius: 0.0,
            color: [0, 0, 0, 200],
        };
        let out = drop_shadow(&cutout(40, 10), &params);
        let rgba = out.as_rgba8().unwrap();
        assert_eq!(rgba.get_pixel(15, 15).0, [0, 0, 0, 200]);
        assert_eq!(rgba.get_pixel(45, 45)[3], 0);
    }

    #[test]
    fn drop_shadow_blur_feathers_edge() {
        let params = DropShadow {
            offset: (10, 10),
            blur_radius: 4.0,
            color: [0, 0, 0, 255],
        };
        let out = drop_shadow(&cutout(40, 10), &params);
        let a = out.as_rgba8().unwrap().get_pixel(50, 40)[3];
        assert!(a > 0 && a < 255, "edge alpha was {a}");
    }

    #[test]
    fn perspective_shadow_canvas_scales() {
        let out = perspective_shadow(&cutout(40, 10), &PerspectiveShadow::default()).unwrap();
        assert_eq!((out.width(), out.height()), (60, 60));
    }

    #[test]
    fn perspective_shadow_keeps_subject_and_adds_shade() {
        let params = PerspectiveShadow {
            angle_degrees: 45.0,
            opacity: Opacity::new(255),
            blur_radius: 0.0,
            scale: 1.5,
        };
        let out = perspective_shadow(&cutout(40, 10), &params).unwrap();
        let rgba = out.as_rgba8().unwrap();
        assert_eq!(rgba.get_pixel(20, 20).0, [255, 0, 0, 255]);
        // Canvas (7, 17) is layer (7, 5) after the 12px drop, which samples
        // the silhouette at (12, 25): inside the square, left of the subject.
        assert!(rgba.get_pixel(7, 17)[3] > 200);
        assert_eq!(rgba.get_pixel(55, 55)[3], 0);
    }

    #[test]
    fn perspective_shadow_opacity_scales_shade() {
        let params = PerspectiveShadow {
            angle_degrees: 45.0,
            opacity: Opacity::new(100),
            blur_radius: 0.0,
            scale: 1.5,
        };
        let out = perspective_shadow(&cutout(40, 10), &params).unwrap();
        let a = out.as_rgba8().unwrap().get_pixel(7, 17)[3];
        assert!((90..=110).contains(&a), "shade alpha was {a}");
    }
}
