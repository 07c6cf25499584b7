//! # photofx
//!
//! A small HTTP service that applies one image effect per request. Each
//! endpoint reads an uploaded image, runs a single transformation with the
//! request's query parameters, and returns a PNG.
//!
//! # Architecture: One Pipeline, Many Effects
//!
//! Every endpoint is the same three steps:
//!
//! ```text
//! query string  →  Effect          (effects::parse_effect)
//! upload bytes  →  DynamicImage    (ImageBackend::decode)
//! DynamicImage  →  DynamicImage    (ImageBackend::apply)
//! DynamicImage  →  PNG bytes       (ImageBackend::encode_png)
//! ```
//!
//! Nothing is stored between requests. The only shared state is the backend,
//! the config-derived parameter defaults, and a semaphore that bounds how
//! many effects run at once.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`effects`] | Effect registry (names, routes, parameter tables) and query parsing |
//! | [`imaging`] | Pure-Rust pixel work behind the [`imaging::ImageBackend`] trait |
//! | [`server`] | axum router, multipart upload handling, JSON errors |
//! | [`config`] | `photofx.toml` loading, validation and merging onto stock defaults |
//! | [`output`] | CLI output formatting for `effects` and `apply` |
//!
//! # Design Decisions
//!
//! ## Backend Seam
//!
//! Handlers never touch pixels. They hand an [`imaging::Effect`] to an
//! [`imaging::ImageBackend`], so the HTTP layer is tested against a recording
//! mock and the pixel code is tested without HTTP.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, filtering, warping and text rendering use `image`, `imageproc`
//! and `ab_glyph`, all pure Rust. Background removal is colour-keyed matting
//! rather than a neural model, so the binary needs no model files, no ONNX
//! runtime and no system libraries. The caption font is embedded.
//!
//! ## Blocking Work Off the Runtime
//!
//! Effects are CPU-bound. Each request waits for a permit, then runs on
//! tokio's blocking pool; the heavier filters split rows across `rayon`.

pub mod config;
pub mod effects;
pub mod imaging;
pub mod output;
pub mod server;
