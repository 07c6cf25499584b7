//! Effect registry and request parameter parsing.
//!
//! Every endpoint is described by an [`EffectKind`]: its name, route, a
//! one-line summary and the query parameters it accepts. [`parse_effect`]
//! turns a URL query string into a typed [`Effect`], filling in defaults and
//! rejecting out-of-range values before any pixel work starts.
//!
//! ## Defaults
//!
//! Shadow, text and matting defaults come from the service config (see
//! [`EffectDefaults`]); everything else has a fixed default listed in the
//! parameter table of each kind.
//!
//! Unknown query parameters are rejected to catch typos early, mirroring
//! how config files are handled.
//!
//! ## Limits
//!
//! Every numeric parameter is bounded. Blur sigmas stop at [`MAX_SIGMA`],
//! caption sizes at [`MAX_FONT_SIZE`], and offsets and crop edges at a
//! distance derived from the max dimension, so no request can overflow the
//! size arithmetic or hold a worker for minutes.

use crate::imaging::{
    ColorFilter, CropBox, DropShadow, Effect, Fit, FlipAxis, Matting, Opacity, PerspectiveShadow,
    Size, TextOverlay,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Largest Gaussian sigma accepted for any blur, shadow or feather parameter.
pub const MAX_SIGMA: f32 = 100.0;

/// Largest caption pixel size; also never above the max dimension.
pub const MAX_FONT_SIZE: f32 = 1024.0;

#[derive(Error, Debug)]
pub enum ParamError {
    #[error("invalid query string: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),
    #[error("parameter `{name}` {reason}")]
    OutOfRange { name: &'static str, reason: String },
    #[error("unknown effect `{0}`")]
    UnknownEffect(String),
}

/// One accepted query parameter, as listed by `GET /effects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

macro_rules! param {
    ($name:literal, $default:literal, $description:literal $(,)?) => {
        ParamSpec {
            name: $name,
            default: $default,
            description: $description,
        }
    };
}

/// Every endpoint the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    RemoveBg,
    AddShadow,
    Filter,
    Resize,
    Rotate,
    AddText,
    Sketch,
    Crop,
    Sharpen,
    Edges,
    Pixelate,
    PerspectiveShadow,
    Blur,
    Equalize,
    Canny,
    Clahe,
    Bilateral,
    OilPaint,
    Flip,
}

impl EffectKind {
    pub const ALL: [EffectKind; 19] = [
        EffectKind::RemoveBg,
        EffectKind::AddShadow,
        EffectKind::Filter,
        EffectKind::Resize,
        EffectKind::Rotate,
        EffectKind::AddText,
        EffectKind::Sketch,
        EffectKind::Crop,
        EffectKind::Sharpen,
        EffectKind::Edges,
        EffectKind::Pixelate,
        EffectKind::PerspectiveShadow,
        EffectKind::Blur,
        EffectKind::Equalize,
        EffectKind::Canny,
        EffectKind::Clahe,
        EffectKind::Bilateral,
        EffectKind::OilPaint,
        EffectKind::Flip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::RemoveBg => "remove-bg",
            EffectKind::AddShadow => "add-shadow",
            EffectKind::Filter => "filter",
            EffectKind::Resize => "resize",
            EffectKind::Rotate => "rotate",
            EffectKind::AddText => "add-text",
            EffectKind::Sketch => "sketch",
            EffectKind::Crop => "crop",
            EffectKind::Sharpen => "sharpen",
            EffectKind::Edges => "edges",
            EffectKind::Pixelate => "pixelate",
            EffectKind::PerspectiveShadow => "perspective-shadow",
            EffectKind::Blur => "blur",
            EffectKind::Equalize => "equalize",
            EffectKind::Canny => "canny",
            EffectKind::Clahe => "clahe",
            EffectKind::Bilateral => "bilateral",
            EffectKind::OilPaint => "oil-paint",
            EffectKind::Flip => "flip",
        }
    }

    /// Route path, e.g. `/add-shadow`.
    pub fn path(self) -> String {
        format!("/{}", self.name())
    }

    pub fn from_name(name: &str) -> Result<Self, ParamError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ParamError::UnknownEffect(name.to_string()))
    }

    pub fn summary(self) -> &'static str {
        match self {
            EffectKind::RemoveBg => "Cut the backdrop out, optionally shrinking first",
            EffectKind::AddShadow => "Offset, blurred drop shadow behind the subject",
            EffectKind::Filter => "Grayscale, sepia or negative colour filter",
            EffectKind::Resize => "Resize to an exact width and height",
            EffectKind::Rotate => "Rotate counter-clockwise, expanding the canvas",
            EffectKind::AddText => "Draw a caption onto the image",
            EffectKind::Sketch => "Pencil sketch via colour dodge",
            EffectKind::Crop => "Crop to a box; outside areas become transparent",
            EffectKind::Sharpen => "3x3 sharpening",
            EffectKind::Edges => "3x3 edge map on the luma channel",
            EffectKind::Pixelate => "Mosaic of square blocks",
            EffectKind::PerspectiveShadow => "Sheared cast shadow falling behind the subject",
            EffectKind::Blur => "Gaussian blur",
            EffectKind::Equalize => "Histogram equalisation per colour channel",
            EffectKind::Canny => "Canny edge detector",
            EffectKind::Clahe => "Contrast-limited adaptive histogram equalisation",
            EffectKind::Bilateral => "Edge-preserving bilateral smoothing",
            EffectKind::OilPaint => "Oil painting stylisation",
            EffectKind::Flip => "Mirror horizontally or vertically",
        }
    }

    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            EffectKind::RemoveBg => &[
                param!("width", "none", "shrink into this box first (with height, both > 0)"),
                param!("height", "none", "shrink into this box first (with width, both > 0)"),
                param!("tolerance", "config", "RGB distance still counted as backdrop"),
                param!("feather", "config", "mask edge blur sigma, 0-100 (0 = hard edge)"),
            ],
            EffectKind::AddShadow => &[
                param!("offset_x", "config", "horizontal shadow offset in px, within the max dimension"),
                param!("offset_y", "config", "vertical shadow offset in px, within the max dimension"),
                param!("blur_radius", "config", "shadow blur sigma, 0-100"),
                param!("opacity", "config", "shadow alpha 0-255"),
            ],
            EffectKind::Filter => &[param!(
                "filter_type",
                "grayscale",
                "grayscale | sepia | negative",
            )],
            EffectKind::Resize => &[
                param!("width", "required", "output width in px"),
                param!("height", "required", "output height in px"),
            ],
            EffectKind::Rotate => &[param!("angle", "required", "degrees, counter-clockwise")],
            EffectKind::AddText => &[
                param!("text", "Test", "caption text"),
                param!("x", "10", "left edge in px"),
                param!("y", "10", "top edge in px"),
                param!("font_size", "config", "pixel height of the font, at most 1024"),
            ],
            EffectKind::Crop => &[
                param!("left", "required", "left edge in px"),
                param!("top", "required", "top edge in px"),
                param!("right", "required", "right edge in px (exclusive)"),
                param!("bottom", "required", "bottom edge in px (exclusive)"),
            ],
            EffectKind::Pixelate => &[param!("pixel_size", "10", "block edge in px")],
            EffectKind::PerspectiveShadow => &[
                param!("shadow_angle", "config", "shear angle in degrees, within (-90, 90)"),
                param!("shadow_opacity", "config", "shadow alpha 0-255"),
                param!("blur_radius", "config", "shadow blur sigma, 0-100"),
                param!("shadow_scale", "config", "canvas size relative to the source, (0, 4]"),
            ],
            EffectKind::Blur => &[param!("sigma", "2.0", "Gaussian sigma, > 0 and at most 100")],
            EffectKind::Canny => &[
                param!("low", "50", "low hysteresis threshold"),
                param!("high", "150", "high hysteresis threshold"),
            ],
            EffectKind::Clahe => &[
                param!("clip_limit", "2.0", "histogram clip as a multiple of the mean bin"),
                param!("tiles", "8", "tiles per edge, 1-64"),
            ],
            EffectKind::Bilateral => &[
                param!("radius", "4", "window radius, 1-16"),
                param!("sigma_color", "25", "colour distance sigma"),
                param!("sigma_spatial", "3", "spatial distance sigma"),
            ],
            EffectKind::OilPaint => &[
                param!("radius", "4", "window radius, 1-16"),
                param!("levels", "20", "intensity buckets, 2-256"),
            ],
            EffectKind::Flip => &[param!("direction", "horizontal", "horizontal | vertical")],
            EffectKind::Sketch | EffectKind::Sharpen | EffectKind::Edges | EffectKind::Equalize => {
                &[]
            }
        }
    }
}

/// Serializable description of one endpoint, as returned by `GET /effects`.
#[derive(Debug, Clone, Serialize)]
pub struct EffectInfo {
    pub name: &'static str,
    pub path: String,
    pub summary: &'static str,
    pub params: &'static [ParamSpec],
}

pub fn describe_all() -> Vec<EffectInfo> {
    EffectKind::ALL
        .into_iter()
        .map(|kind| EffectInfo {
            name: kind.name(),
            path: kind.path(),
            summary: kind.summary(),
            params: kind.params(),
        })
        .collect()
}

/// Config-driven defaults and limits used while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDefaults {
    pub shadow: DropShadow,
    pub perspective_shadow: PerspectiveShadow,
    pub text_size: f32,
    pub text_color: [u8; 4],
    pub matting: Matting,
    pub max_dimension: u32,
}

impl Default for EffectDefaults {
    fn default() -> Self {
        Self {
            shadow: DropShadow::default(),
            perspective_shadow: PerspectiveShadow::default(),
            text_size: 30.0,
            text_color: [255, 255, 255, 255],
            matting: Matting::default(),
            max_dimension: crate::imaging::rust_backend::DEFAULT_MAX_DIMENSION,
        }
    }
}

// =============================================================================
// Query shapes
// =============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoveBgQuery {
    width: Option<u32>,
    height: Option<u32>,
    tolerance: Option<f32>,
    feather: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ShadowQuery {
    offset_x: Option<i32>,
    offset_y: Option<i32>,
    blur_radius: Option<f32>,
    opacity: Option<i64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterQuery {
    filter_type: Option<ColorFilter>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SizeQuery {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RotateQuery {
    angle: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TextQuery {
    text: Option<String>,
    x: Option<i32>,
    y: Option<i32>,
    font_size: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CropQuery {
    left: Option<i64>,
    top: Option<i64>,
    right: Option<i64>,
    bottom: Option<i64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PixelateQuery {
    pixel_size: Option<u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PerspectiveQuery {
    shadow_angle: Option<f32>,
    shadow_opacity: Option<i64>,
    blur_radius: Option<f32>,
    shadow_scale: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BlurQuery {
    sigma: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CannyQuery {
    low: Option<f32>,
    high: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ClaheQuery {
    clip_limit: Option<f32>,
    tiles: Option<u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BilateralQuery {
    radius: Option<u32>,
    sigma_color: Option<f32>,
    sigma_spatial: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OilPaintQuery {
    radius: Option<u32>,
    levels: Option<u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FlipQuery {
    direction: Option<FlipAxis>,
}

// =============================================================================
// Validation helpers
// =============================================================================

fn query<T: DeserializeOwned>(raw: &str) -> Result<T, ParamError> {
    Ok(serde_urlencoded::from_str(raw)?)
}

fn required<T>(name: &'static str, value: Option<T>) -> Result<T, ParamError> {
    value.ok_or(ParamError::Missing(name))
}

fn out_of_range(name: &'static str, reason: impl Into<String>) -> ParamError {
    ParamError::OutOfRange {
        name,
        reason: reason.into(),
    }
}

fn in_range<T: PartialOrd + Display + Copy>(
    name: &'static str,
    value: T,
    min: T,
    max: T,
) -> Result<T, ParamError> {
    if value < min || value > max {
        return Err(out_of_range(name, format!("must be {min}..={max}, got {value}")));
    }
    Ok(value)
}

fn finite(name: &'static str, value: f32) -> Result<f32, ParamError> {
    if !value.is_finite() {
        return Err(out_of_range(name, "must be a finite number"));
    }
    Ok(value)
}

fn non_negative(name: &'static str, value: f32) -> Result<f32, ParamError> {
    if finite(name, value)? < 0.0 {
        return Err(out_of_range(name, format!("must be >= 0, got {value}")));
    }
    Ok(value)
}

fn positive(name: &'static str, value: f32) -> Result<f32, ParamError> {
    if finite(name, value)? <= 0.0 {
        return Err(out_of_range(name, format!("must be > 0, got {value}")));
    }
    Ok(value)
}

fn at_most(name: &'static str, value: f32, max: f32) -> Result<f32, ParamError> {
    if value > max {
        return Err(out_of_range(name, format!("must be at most {max}, got {value}")));
    }
    Ok(value)
}

/// Gaussian sigma within `0..=MAX_SIGMA`.
fn sigma(name: &'static str, value: f32) -> Result<f32, ParamError> {
    at_most(name, non_negative(name, value)?, MAX_SIGMA)
}

/// Largest caption size for this max dimension.
pub fn font_size_limit(max_dimension: u32) -> f32 {
    (max_dimension as f32).min(MAX_FONT_SIZE)
}

/// Shadow offsets stay within one max dimension of the subject.
fn offset(name: &'static str, value: i32, max_dimension: u32) -> Result<i32, ParamError> {
    let reach = i32::try_from(max_dimension).unwrap_or(i32::MAX);
    in_range(name, value, -reach, reach)
}

/// Crop edges may reach one max dimension past either side of the largest
/// accepted image.
fn crop_edge(name: &'static str, value: i64, max_dimension: u32) -> Result<i64, ParamError> {
    let max = i64::from(max_dimension);
    in_range(name, value, -max, 2 * max)
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse the query string of a request for `kind` into an [`Effect`].
///
/// `raw` is the query without the leading `?`; an empty string means "all
/// defaults".
pub fn parse_effect(
    kind: EffectKind,
    raw: &str,
    defaults: &EffectDefaults,
) -> Result<Effect, ParamError> {
    let effect = match kind {
        EffectKind::RemoveBg => {
            let q: RemoveBgQuery = query(raw)?;
            let fit = match (q.width, q.height) {
                (Some(width), Some(height)) if width > 0 && height > 0 => Some(Fit {
                    width: in_range("width", width, 1, defaults.max_dimension)?,
                    height: in_range("height", height, 1, defaults.max_dimension)?,
                }),
                _ => None,
            };
            Effect::RemoveBackground {
                fit,
                matting: Matting {
                    tolerance: non_negative(
                        "tolerance",
                        q.tolerance.unwrap_or(defaults.matting.tolerance),
                    )?,
                    feather: sigma("feather", q.feather.unwrap_or(defaults.matting.feather))?,
                },
            }
        }
        EffectKind::AddShadow => {
            let q: ShadowQuery = query(raw)?;
            let base = defaults.shadow;
            let [r, g, b, a] = base.color;
            let alpha = q.opacity.map(|o| Opacity::new(o).value()).unwrap_or(a);
            Effect::DropShadow(DropShadow {
                offset: (
                    offset(
                        "offset_x",
                        q.offset_x.unwrap_or(base.offset.0),
                        defaults.max_dimension,
                    )?,
                    offset(
                        "offset_y",
                        q.offset_y.unwrap_or(base.offset.1),
                        defaults.max_dimension,
                    )?,
                ),
                blur_radius: sigma("blur_radius", q.blur_radius.unwrap_or(base.blur_radius))?,
                color: [r, g, b, alpha],
            })
        }
        EffectKind::Filter => {
            let q: FilterQuery = query(raw)?;
            Effect::Filter(q.filter_type.unwrap_or(ColorFilter::Grayscale))
        }
        EffectKind::Resize => {
            let q: SizeQuery = query(raw)?;
            Effect::Resize(Size {
                width: in_range("width", required("width", q.width)?, 1, defaults.max_dimension)?,
                height: in_range(
                    "height",
                    required("height", q.height)?,
                    1,
                    defaults.max_dimension,
                )?,
            })
        }
        EffectKind::Rotate => {
            let q: RotateQuery = query(raw)?;
            Effect::Rotate {
                degrees: finite("angle", required("angle", q.angle)?)?,
            }
        }
        EffectKind::AddText => {
            let q: TextQuery = query(raw)?;
            Effect::Text(TextOverlay {
                text: q.text.unwrap_or_else(|| "Test".to_string()),
                x: q.x.unwrap_or(10),
                y: q.y.unwrap_or(10),
                size: at_most(
                    "font_size",
                    positive("font_size", q.font_size.unwrap_or(defaults.text_size))?,
                    font_size_limit(defaults.max_dimension),
                )?,
                color: defaults.text_color,
            })
        }
        EffectKind::Crop => {
            let q: CropQuery = query(raw)?;
            let crop = CropBox {
                left: crop_edge("left", required("left", q.left)?, defaults.max_dimension)?,
                top: crop_edge("top", required("top", q.top)?, defaults.max_dimension)?,
                right: crop_edge("right", required("right", q.right)?, defaults.max_dimension)?,
                bottom: crop_edge("bottom", required("bottom", q.bottom)?, defaults.max_dimension)?,
            };
            if crop.right <= crop.left {
                return Err(out_of_range("right", "must be greater than left"));
            }
            if crop.bottom <= crop.top {
                return Err(out_of_range("bottom", "must be greater than top"));
            }
            Effect::Crop(crop)
        }
        EffectKind::Pixelate => {
            let q: PixelateQuery = query(raw)?;
            Effect::Pixelate {
                block: in_range("pixel_size", q.pixel_size.unwrap_or(10), 1, defaults.max_dimension)?,
            }
        }
        EffectKind::PerspectiveShadow => {
            let q: PerspectiveQuery = query(raw)?;
            let base = defaults.perspective_shadow;
            let angle = finite("shadow_angle", q.shadow_angle.unwrap_or(base.angle_degrees))?;
            if angle.abs() >= 90.0 {
                return Err(out_of_range(
                    "shadow_angle",
                    format!("must be within (-90, 90), got {angle}"),
                ));
            }
            let scale = positive("shadow_scale", q.shadow_scale.unwrap_or(base.scale))?;
            if scale > 4.0 {
                return Err(out_of_range(
                    "shadow_scale",
                    format!("must be at most 4, got {scale}"),
                ));
            }
            Effect::PerspectiveShadow(PerspectiveShadow {
                angle_degrees: angle,
                opacity: q.shadow_opacity.map(Opacity::new).unwrap_or(base.opacity),
                blur_radius: sigma("blur_radius", q.blur_radius.unwrap_or(base.blur_radius))?,
                scale,
            })
        }
        EffectKind::Blur => {
            let q: BlurQuery = query(raw)?;
            Effect::Blur {
                sigma: at_most("sigma", positive("sigma", q.sigma.unwrap_or(2.0))?, MAX_SIGMA)?,
            }
        }
        EffectKind::Canny => {
            let q: CannyQuery = query(raw)?;
            let low = non_negative("low", q.low.unwrap_or(50.0))?;
            let high = non_negative("high", q.high.unwrap_or(150.0))?;
            if low > high {
                return Err(out_of_range(
                    "low",
                    format!("must not exceed high ({high}), got {low}"),
                ));
            }
            Effect::Canny { low, high }
        }
        EffectKind::Clahe => {
            let q: ClaheQuery = query(raw)?;
            Effect::Clahe {
                clip_limit: positive("clip_limit", q.clip_limit.unwrap_or(2.0))?,
                tiles: in_range("tiles", q.tiles.unwrap_or(8), 1, 64)?,
            }
        }
        EffectKind::Bilateral => {
            let q: BilateralQuery = query(raw)?;
            Effect::Bilateral {
                radius: in_range("radius", q.radius.unwrap_or(4), 1, 16)?,
                sigma_color: positive("sigma_color", q.sigma_color.unwrap_or(25.0))?,
                sigma_spatial: positive("sigma_spatial", q.sigma_spatial.unwrap_or(3.0))?,
            }
        }
        EffectKind::OilPaint => {
            let q: OilPaintQuery = query(raw)?;
            Effect::OilPaint {
                radius: in_range("radius", q.radius.unwrap_or(4), 1, 16)?,
                levels: in_range("levels", q.levels.unwrap_or(20), 2, 256)?,
            }
        }
        EffectKind::Flip => {
            let q: FlipQuery = query(raw)?;
            Effect::Flip(q.direction.unwrap_or(FlipAxis::Horizontal))
        }
        EffectKind::Sketch | EffectKind::Sharpen | EffectKind::Edges | EffectKind::Equalize => {
            let _: NoParams = query(raw)?;
            match kind {
                EffectKind::Sketch => Effect::Sketch,
                EffectKind::Sharpen => Effect::Sharpen,
                EffectKind::Edges => Effect::FindEdges,
                _ => Effect::Equalize,
            }
        }
    };
    Ok(effect)
}
