//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: decode, apply and encode_png.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, statically
//! linked, no model runtime or system libraries.

use super::params::Effect;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Could not encode PNG: {0}")]
    Encode(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Font error: {0}")]
    Font(String),
}

/// Pixel size of a decoded or planned image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the HTTP layer and
/// CLI stay backend-agnostic. Backends are shared across request tasks, so
/// they must be `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Decode an uploaded image of any supported format.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Apply one effect, consuming the input.
    fn apply(&self, image: DynamicImage, effect: &Effect) -> Result<DynamicImage, BackendError>;

    /// Encode the result as PNG.
    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError>;
}
