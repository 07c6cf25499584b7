//! Image processing: pure Rust, no model runtime or system libraries.
//!
//! | Effect family | Module | Main crates |
//! |---|---|---|
//! | **Colour** (grayscale, sepia, negative, equalize, CLAHE) | `tone` | `image`, `imageproc`, `rayon` |
//! | **Neighbourhood** (sharpen, edges, blur, Canny, bilateral) | `filters` | `image`, `imageproc`, `rayon` |
//! | **Geometry** (resize, rotate, crop, flip, pixelate) | `geometry` | `image`, `imageproc` |
//! | **Shadows** (drop, perspective) | `shadow` | `imageproc` |
//! | **Stylisation** (sketch, oil paint) | `stylize` | `imageproc`, `rayon` |
//! | **Background removal** | `matting` | `imageproc` |
//! | **Text** | `text` | `imageproc`, `ab_glyph` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The decode → apply → encode pipeline

pub mod backend;
mod calculations;
mod filters;
mod geometry;
mod matting;
pub mod operations;
pub mod params;
pub mod rust_backend;
mod shadow;
mod stylize;
mod text;
mod tone;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::fit_within;
pub use operations::{Processed, process};
pub use params::{
    ColorFilter, CropBox, DropShadow, Effect, Fit, FlipAxis, Matting, Opacity,
    PerspectiveShadow, Size, TextOverlay,
};
pub use rust_backend::RustBackend;
