//! Parameter types for image effects.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between request parsing in [`effects`](crate::effects) (which
//! turns query strings into values) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without touching the HTTP layer.
//!
//! ## Types
//!
//! - [`Effect`]: One variant per supported operation, carrying its parameters.
//! - [`Opacity`]: Alpha value (0–255). Clamped on construction.
//! - [`Fit`] / [`Size`]: Bounding box for thumbnails, exact size for resizes.
//! - [`DropShadow`] / [`PerspectiveShadow`]: Shadow synthesis parameters.
//! - [`Matting`]: Colour-keyed background removal tuning.
//! - [`TextOverlay`]: Text, position, size and colour for the caption effect.

use serde::{Deserialize, Serialize};

/// Alpha value for synthesized layers (0 = invisible, 255 = opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opacity(pub u8);

impl Opacity {
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 255) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Scale an 8-bit alpha sample by this opacity.
    pub fn scale(self, alpha: u8) -> u8 {
        ((alpha as u32 * self.0 as u32 + 127) / 255) as u8
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(255)
    }
}

/// Bounding box an image is shrunk into, preserving aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub width: u32,
    pub height: u32,
}

/// Exact output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Colour-keyed background removal tuning.
///
/// - `tolerance`: RGB distance from the estimated background colour still
///   counted as background
/// - `feather`: Gaussian sigma applied to the mask edge (0 = hard edge)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matting {
    pub tolerance: f32,
    pub feather: f32,
}

impl Default for Matting {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            feather: 1.5,
        }
    }
}

/// Offset drop shadow behind the subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadow {
    pub offset: (i32, i32),
    pub blur_radius: f32,
    /// RGBA; the alpha component scales the subject's own alpha.
    pub color: [u8; 4],
}

impl Default for DropShadow {
    fn default() -> Self {
        Self {
            offset: (15, 15),
            blur_radius: 15.0,
            color: [0, 0, 0, 120],
        }
    }
}

/// Sheared "cast" shadow stretched out below the subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveShadow {
    pub angle_degrees: f32,
    pub opacity: Opacity,
    pub blur_radius: f32,
    /// Output canvas size relative to the source.
    pub scale: f32,
}

impl Default for PerspectiveShadow {
    fn default() -> Self {
        Self {
            angle_degrees: 45.0,
            opacity: Opacity::new(100),
            blur_radius: 25.0,
            scale: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFilter {
    Grayscale,
    Sepia,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Crop rectangle in source pixel coordinates. May extend past the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// Text drawn onto the image.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub x: i32,
    pub y: i32,
    /// Pixel height of the font.
    pub size: f32,
    pub color: [u8; 4],
}

/// A single image effect and everything needed to run it.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RemoveBackground {
        fit: Option<Fit>,
        matting: Matting,
    },
    DropShadow(DropShadow),
    Filter(ColorFilter),
    Resize(Size),
    /// Counter-clockwise rotation with canvas expansion.
    Rotate {
        degrees: f32,
    },
    Text(TextOverlay),
    Sketch,
    Crop(CropBox),
    Sharpen,
    FindEdges,
    Pixelate {
        block: u32,
    },
    PerspectiveShadow(PerspectiveShadow),
    Blur {
        sigma: f32,
    },
    Equalize,
    Canny {
        low: f32,
        high: f32,
    },
    Clahe {
        clip_limit: f32,
        tiles: u32,
    },
    Bilateral {
        radius: u32,
        sigma_color: f32,
        sigma_spatial: f32,
    },
    OilPaint {
        radius: u32,
        levels: u32,
    },
    Flip(FlipAxis),
}

impl Effect {
    /// Short kebab-case name used in logs and file names.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::RemoveBackground { .. } => "remove-bg",
            Effect::DropShadow(_) => "add-shadow",
            Effect::Filter(_) => "filter",
            Effect::Resize(_) => "resize",
            Effect::Rotate { .. } => "rotate",
            Effect::Text(_) => "add-text",
            Effect::Sketch => "sketch",
            Effect::Crop(_) => "crop",
            Effect::Sharpen => "sharpen",
            Effect::FindEdges => "edges",
            Effect::Pixelate { .. } => "pixelate",
            Effect::PerspectiveShadow(_) => "perspective-shadow",
            Effect::Blur { .. } => "blur",
            Effect::Equalize => "equalize",
            Effect::Canny { .. } => "canny",
            Effect::Clahe { .. } => "clahe",
            Effect::Bilateral { .. } => "bilateral",
            Effect::OilPaint { .. } => "oil-paint",
            Effect::Flip(_) => "flip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_clamps_to_valid_range() {
        assert_eq!(Opacity::new(-5).value(), 0);
        assert_eq!(Opacity::new(100).value(), 100);
        assert_eq!(Opacity::new(900).value(), 255);
    }

    #[test]
    fn opacity_scales_alpha() {
        assert_eq!(Opacity::new(255).scale(200), 200);
        assert_eq!(Opacity::new(0).scale(200), 0);
        assert_eq!(Opacity::new(120).scale(255), 120);
    }

    #[test]
    fn drop_shadow_defaults() {
        let s = DropShadow::default();
        assert_eq!(s.offset, (15, 15));
        assert_eq!(s.blur_radius, 15.0);
        assert_eq!(s.color, [0, 0, 0, 120]);
    }

    #[test]
    fn effect_names_are_kebab_case() {
        assert_eq!(Effect::Sketch.name(), "sketch");
        assert_eq!(
            Effect::PerspectiveShadow(PerspectiveShadow::default()).name(),
            "perspective-shadow"
        );
        assert_eq!(
            Effect::RemoveBackground {
                fit: None,
                matting: Matting::default()
            }
            .name(),
            "remove-bg"
        );
    }
}
