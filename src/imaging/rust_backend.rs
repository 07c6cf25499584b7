//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary, including the default
//! caption font.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP, TIFF, GIF, BMP) | `image::ImageReader` with content sniffing + `Limits` |
//! | Background removal | [`matting`](super::matting) (border-keyed flood fill) |
//! | Resize / fit / pixelate | `image::imageops` (CatmullRom, Lanczos3, Nearest) |
//! | Rotate (non-quarter) / perspective shear | `imageproc::geometric_transformations::warp_into` |
//! | Blur / shadows / feathering | `imageproc::filter::gaussian_blur_f32` |
//! | Sharpen / find edges | `DynamicImage::filter3x3` |
//! | Canny | `imageproc::edges::canny` |
//! | Equalize | `imageproc::contrast::equalize_histogram` |
//! | CLAHE / bilateral / oil paint | custom, row-parallel via `rayon` |
//! | Text | `imageproc::drawing::draw_text_mut` + `ab_glyph` |
//! | Encode → PNG | `image::codecs::png` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{crop_region, pixelate_grid, rotated_bounds, scaled_canvas, shadow_canvas};
use super::params::{Effect, Fit};
use super::{filters, geometry, matting, shadow, stylize, text, tone};
use ab_glyph::FontArc;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use std::path::Path;

/// DejaVu Sans, shipped with the binary for the text effect.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Largest edge accepted on input and produced on output by default.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

/// Parse the embedded caption font.
pub fn embedded_font() -> Result<FontArc, BackendError> {
    FontArc::try_from_slice(EMBEDDED_FONT)
        .map_err(|e| BackendError::Font(format!("embedded font: {e}")))
}

/// Pure Rust backend using the `image` / `imageproc` ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    font: FontArc,
    max_dimension: u32,
}

impl RustBackend {
    pub fn new() -> Result<Self, BackendError> {
        Ok(Self {
            font: embedded_font()?,
            max_dimension: DEFAULT_MAX_DIMENSION,
        })
    }

    /// Replace the caption font with a TTF/OTF file from disk.
    pub fn with_font_file(mut self, path: &Path) -> Result<Self, BackendError> {
        let data = std::fs::read(path)?;
        self.font = FontArc::try_from_vec(data)
            .map_err(|e| BackendError::Font(format!("{}: {e}", path.display())))?;
        Ok(self)
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits
    }

    fn reader<'a>(&self, bytes: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        if reader.format().is_none() {
            return Err(BackendError::Decode("unrecognised image format".into()));
        }
        Ok(reader)
    }

    /// Reject effects whose result would exceed the max dimension before
    /// allocating anything.
    fn check_output(&self, source: Dimensions, effect: &Effect) -> Result<(), BackendError> {
        let planned = planned_output(source, effect)?;
        if planned.width > self.max_dimension || planned.height > self.max_dimension {
            return Err(BackendError::InvalidInput(format!(
                "{} would produce {planned}, larger than the {} px limit",
                effect.name(),
                self.max_dimension
            )));
        }
        Ok(())
    }
}

/// Output size of `effect` applied to an image of `source` size.
fn planned_output(source: Dimensions, effect: &Effect) -> Result<Dimensions, BackendError> {
    Ok(match effect {
        Effect::Resize(size) => Dimensions {
            width: size.width,
            height: size.height,
        },
        Effect::Rotate { degrees } => rotated_bounds(source, *degrees),
        Effect::Crop(crop) => crop_region(crop).map_err(BackendError::InvalidInput)?,
        Effect::DropShadow(params) => shadow_canvas(source, params.offset),
        Effect::PerspectiveShadow(params) => scaled_canvas(source, params.scale),
        Effect::Pixelate { block } => pixelate_grid(source, *block).1,
        _ => source,
    })
}

fn fit_bounds(fit: Fit) -> Dimensions {
    Dimensions {
        width: fit.width,
        height: fit.height,
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let mut reader = self.reader(bytes)?;
        reader.limits(self.limits());
        reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn apply(&self, image: DynamicImage, effect: &Effect) -> Result<DynamicImage, BackendError> {
        let source = Dimensions::of(&image);
        if source.width == 0 || source.height == 0 {
            return Err(BackendError::InvalidInput(format!("empty image ({source})")));
        }
        self.check_output(source, effect)?;

        let out = match effect {
            Effect::RemoveBackground { fit, matting: params } => {
                let fitted = match fit {
                    Some(f) => geometry::fit(&image, fit_bounds(*f)),
                    None => image,
                };
                matting::remove_background(&fitted, params)
            }
            Effect::DropShadow(params) => shadow::drop_shadow(&image, params),
            Effect::Filter(filter) => tone::color_filter(&image, *filter),
            Effect::Resize(size) => geometry::resize(&image, *size),
            Effect::Rotate { degrees } => geometry::rotate(&image, *degrees),
            Effect::Text(overlay) => text::draw_text(&image, overlay, &self.font),
            Effect::Sketch => stylize::sketch(&image),
            Effect::Crop(crop) => {
                let size = crop_region(crop).map_err(BackendError::InvalidInput)?;
                geometry::crop(&image, crop, size)
            }
            Effect::Sharpen => filters::sharpen(&image),
            Effect::FindEdges => filters::find_edges(&image),
            Effect::Pixelate { block } => geometry::pixelate(&image, *block),
            Effect::PerspectiveShadow(params) => shadow::perspective_shadow(&image, params)?,
            Effect::Blur { sigma } => {
                if !(*sigma > 0.0) {
                    return Err(BackendError::InvalidInput(format!(
                        "blur sigma must be positive, got {sigma}"
                    )));
                }
                filters::blur(&image, *sigma)
            }
            Effect::Equalize => tone::equalize(&image),
            Effect::Canny { low, high } => filters::canny(&image, *low, *high),
            Effect::Clahe { clip_limit, tiles } => tone::clahe(&image, *clip_limit, *tiles),
            Effect::Bilateral {
                radius,
                sigma_color,
                sigma_spatial,
            } => filters::bilateral(&image, *radius, *sigma_color, *sigma_spatial),
            Effect::OilPaint { radius, levels } => stylize::oil_paint(&image, *radius, *levels),
            Effect::Flip(axis) => geometry::flip(&image, *axis),
        };
        Ok(out)
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
