//! High-level image operations.
//!
//! These functions combine the backend steps into the single pipeline every
//! endpoint and the `apply` command share: decode, apply one effect, encode.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::Effect;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded result of one effect.
#[derive(Debug, Clone)]
pub struct Processed {
    pub png: Vec<u8>,
    pub input: Dimensions,
    pub output: Dimensions,
}

/// Decode `bytes`, apply `effect` and encode the result as PNG.
pub fn process(
    backend: &(impl ImageBackend + ?Sized),
    bytes: &[u8],
    effect: &Effect,
) -> Result<Processed> {
    let image = backend.decode(bytes)?;
    let input = Dimensions::of(&image);
    tracing::debug!(effect = effect.name(), %input, "decoded upload");

    let result = backend.apply(image, effect)?;
    let output = Dimensions::of(&result);
    let png = backend.encode_png(&result)?;
    tracing::debug!(effect = effect.name(), %output, bytes = png.len(), "encoded result");

    Ok(Processed { png, input, output })
}
