//! Service configuration module.
//!
//! Handles loading, validating, and merging `photofx.toml`. A config file is
//! sparse: stock defaults are the base layer and the file only overrides the
//! keys it names.
//!
//! ## Config File Location
//!
//! `photofx serve --config FILE` reads `FILE`. Without `--config`, a
//! `photofx.toml` in the working directory is used if present; otherwise the
//! stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "0.0.0.0"
//! port = 8000
//! max_upload_bytes = 20971520   # 20 MiB request body limit
//!
//! [limits]
//! max_dimension = 8192          # Largest edge accepted or produced
//!
//! [processing]
//! max_jobs = 4                  # Concurrent effects (omit for auto = CPU cores)
//!
//! [shadow]
//! offset = [15, 15]
//! blur_radius = 15.0
//! color = [0, 0, 0, 120]        # RGBA
//!
//! [perspective_shadow]
//! angle = 45.0
//! opacity = 100
//! blur_radius = 25.0
//! scale = 1.5
//!
//! [text]
//! font_path = "/path/to/font.ttf"  # omit for the embedded DejaVu Sans
//! size = 30.0
//! color = [255, 255, 255, 255]
//!
//! [matting]
//! tolerance = 40.0
//! feather = 1.5
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::effects::{EffectDefaults, MAX_SIGMA, font_size_limit};
use crate::imaging::{DropShadow, Matting, Opacity, PerspectiveShadow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "photofx.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `photofx.toml`.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listener and request body settings.
    pub server: ServerConfig,
    /// Image size limits.
    pub limits: LimitsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Drop shadow defaults for `/add-shadow`.
    pub shadow: ShadowConfig,
    /// Defaults for `/perspective-shadow`.
    pub perspective_shadow: PerspectiveShadowConfig,
    /// Caption font and defaults for `/add-text`.
    pub text: TextConfig,
    /// Background removal tuning for `/remove-bg`.
    pub matting: MattingConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".into()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes must be non-zero".into(),
            ));
        }
        if !(1..=65535).contains(&self.limits.max_dimension) {
            return Err(ConfigError::Validation(
                "limits.max_dimension must be 1-65535".into(),
            ));
        }
        if self.processing.max_jobs == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_jobs must be non-zero (omit for auto)".into(),
            ));
        }
        if !self.matting.tolerance.is_finite() || self.matting.tolerance < 0.0 {
            return Err(ConfigError::Validation("matting.tolerance must be >= 0".into()));
        }
        for (name, value) in [
            ("shadow.blur_radius", self.shadow.blur_radius),
            ("perspective_shadow.blur_radius", self.perspective_shadow.blur_radius),
            ("matting.feather", self.matting.feather),
        ] {
            if !(0.0..=MAX_SIGMA).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be 0-{MAX_SIGMA}"
                )));
            }
        }
        let reach = i64::from(self.limits.max_dimension);
        if self
            .shadow
            .offset
            .iter()
            .any(|d| i64::from(*d).abs() > reach)
        {
            return Err(ConfigError::Validation(
                "shadow.offset must stay within limits.max_dimension".into(),
            ));
        }
        let angle = self.perspective_shadow.angle;
        if !angle.is_finite() || angle.abs() >= 90.0 {
            return Err(ConfigError::Validation(
                "perspective_shadow.angle must be within (-90, 90)".into(),
            ));
        }
        let scale = self.perspective_shadow.scale;
        if !(scale > 0.0 && scale <= 4.0) {
            return Err(ConfigError::Validation(
                "perspective_shadow.scale must be in (0, 4]".into(),
            ));
        }
        let max_size = font_size_limit(self.limits.max_dimension);
        if !(self.text.size > 0.0 && self.text.size <= max_size) {
            return Err(ConfigError::Validation(format!(
                "text.size must be in (0, {max_size}]"
            )));
        }
        Ok(())
    }

    /// Parsing defaults for effect requests, derived from this config.
    pub fn effect_defaults(&self) -> EffectDefaults {
        EffectDefaults {
            shadow: DropShadow {
                offset: (self.shadow.offset[0], self.shadow.offset[1]),
                blur_radius: self.shadow.blur_radius,
                color: self.shadow.color,
            },
            perspective_shadow: PerspectiveShadow {
                angle_degrees: self.perspective_shadow.angle,
                opacity: Opacity(self.perspective_shadow.opacity),
                blur_radius: self.perspective_shadow.blur_radius,
                scale: self.perspective_shadow.scale,
            },
            text_size: self.text.size,
            text_color: self.text.color,
            matting: Matting {
                tolerance: self.matting.tolerance,
                feather: self.matting.feather,
            },
            max_dimension: self.limits.max_dimension,
        }
    }
}

/// Listener and request body settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind, e.g. `"127.0.0.1"` or `"0.0.0.0"`.
    pub bind: String,
    pub port: u16,
    /// Largest accepted request body in bytes; larger uploads get 413.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `bind:port`, suitable for `TcpListener::bind`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Image size limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest edge accepted on decode and produced by any effect.
    pub max_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_dimension: 8192 }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of effects running at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_jobs: Option<usize>,
}

/// Resolve the effective number of concurrent jobs from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_jobs(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_jobs.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowConfig {
    /// `[dx, dy]` in pixels; negative values cast up or left.
    pub offset: [i32; 2],
    pub blur_radius: f32,
    /// RGBA; alpha is the default opacity.
    pub color: [u8; 4],
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            offset: [15, 15],
            blur_radius: 15.0,
            color: [0, 0, 0, 120],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerspectiveShadowConfig {
    /// Shear angle in degrees.
    pub angle: f32,
    pub opacity: u8,
    pub blur_radius: f32,
    /// Canvas size relative to the source.
    pub scale: f32,
}

impl Default for PerspectiveShadowConfig {
    fn default() -> Self {
        Self {
            angle: 45.0,
            opacity: 100,
            blur_radius: 25.0,
            scale: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// TTF/OTF used for captions. `None` uses the embedded DejaVu Sans.
    pub font_path: Option<PathBuf>,
    /// Default pixel height.
    pub size: f32,
    /// RGBA caption colour.
    pub color: [u8; 4],
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            size: 30.0,
            color: [255, 255, 255, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MattingConfig {
    /// RGB distance from the backdrop colour still treated as backdrop.
    pub tolerance: f32,
    /// Mask edge blur sigma; 0 keeps a hard edge.
    pub feather: f32,
}

impl Default for MattingConfig {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            feather: 1.5,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServiceConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the service config.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] in the
/// working directory is used when present. User values are merged on top of
/// stock defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(explicit: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `photofx.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photofx Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass the file with `photofx serve --config FILE`, or save it as
# ./photofx.toml to have it picked up automatically.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
# Address and port to listen on.
bind = "0.0.0.0"
port = 8000

# Largest accepted upload in bytes. Bigger requests get 413.
max_upload_bytes = 20971520

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Largest image edge accepted on upload and produced by any effect.
max_dimension = 8192

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum effects running at once.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_jobs = 4

# ---------------------------------------------------------------------------
# Drop shadow (/add-shadow)
# ---------------------------------------------------------------------------
[shadow]
# [dx, dy] in pixels, each within limits.max_dimension.
# Negative values cast the shadow up or left.
offset = [15, 15]
# Gaussian blur sigma, 0-100. 0 gives a hard shadow.
blur_radius = 15.0
# RGBA. The alpha is the default opacity.
color = [0, 0, 0, 120]

# ---------------------------------------------------------------------------
# Perspective shadow (/perspective-shadow)
# ---------------------------------------------------------------------------
[perspective_shadow]
# Shear angle in degrees, within (-90, 90).
angle = 45.0
# Shadow alpha, 0-255.
opacity = 100
# Gaussian blur sigma, 0-100.
blur_radius = 25.0
# Output canvas size relative to the source, in (0, 4].
scale = 1.5

# ---------------------------------------------------------------------------
# Text (/add-text)
# ---------------------------------------------------------------------------
[text]
# TTF/OTF font for captions. Omit to use the embedded DejaVu Sans.
# font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
# Default pixel height, at most 1024 (and at most limits.max_dimension).
size = 30.0
# RGBA caption colour.
color = [255, 255, 255, 255]

# ---------------------------------------------------------------------------
# Background removal (/remove-bg)
# ---------------------------------------------------------------------------
[matting]
# RGB distance from the border colour still treated as backdrop.
tolerance = 40.0
# Mask edge blur sigma, 0-100. 0 keeps a hard edge.
feather = 1.5
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.limits.max_dimension, 8192);
        assert_eq!(config.shadow.offset, [15, 15]);
        assert_eq!(config.perspective_shadow.opacity, 100);
        assert_eq!(config.text.font_path, None);
        assert_eq!(config.matting.tolerance, 40.0);
    }

    #[test]
    fn default_config_validates() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn server_address_joins_bind_and_port() {
        let server = ServerConfig {
            bind: "127.0.0.1".into(),
            port: 9000,
            max_upload_bytes: 1,
        };
        assert_eq!(server.address(), "127.0.0.1:9000");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[shadow]
blur_radius = 4.0
"#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.shadow.blur_radius, 4.0);
        // Default values preserved
        assert_eq!(config.shadow.offset, [15, 15]);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn effect_defaults_follow_config() {
        let toml = r#"
[shadow]
offset = [-3, 7]
color = [10, 20, 30, 200]

[perspective_shadow]
opacity = 50

[limits]
max_dimension = 1000
"#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        let defaults = config.effect_defaults();
        assert_eq!(defaults.shadow.offset, (-3, 7));
        assert_eq!(defaults.shadow.color, [10, 20, 30, 200]);
        assert_eq!(defaults.perspective_shadow.opacity, Opacity(50));
        assert_eq!(defaults.max_dimension, 1000);
        assert_eq!(defaults.text_size, 30.0);
    }

    #[test]
    fn stock_effect_defaults_match_parser_defaults() {
        assert_eq!(
            ServiceConfig::default().effect_defaults(),
            EffectDefaults::default()
        );
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    fn invalid(toml: &str) -> bool {
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        matches!(config.validate(), Err(ConfigError::Validation(_)))
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        assert!(invalid("[server]\nport = 0"));
        assert!(invalid("[server]\nmax_upload_bytes = 0"));
        assert!(invalid("[limits]\nmax_dimension = 0"));
        assert!(invalid("[limits]\nmax_dimension = 70000"));
        assert!(invalid("[processing]\nmax_jobs = 0"));
        assert!(invalid("[shadow]\nblur_radius = -1.0"));
        assert!(invalid("[perspective_shadow]\nangle = 90.0"));
        assert!(invalid("[perspective_shadow]\nscale = 0.0"));
        assert!(invalid("[perspective_shadow]\nscale = 4.5"));
        assert!(invalid("[text]\nsize = 0.0"));
        assert!(invalid("[matting]\nfeather = -0.5"));
    }

    #[test]
    fn validation_caps_blur_and_text_sizes() {
        assert!(invalid("[shadow]\nblur_radius = 20000.0"));
        assert!(invalid("[perspective_shadow]\nblur_radius = 100.5"));
        assert!(invalid("[matting]\nfeather = 1000.0"));
        assert!(invalid("[text]\nsize = 1000000.0"));
        assert!(invalid("[limits]\nmax_dimension = 20\n[text]\nsize = 21.0"));
        assert!(invalid("[shadow]\noffset = [-2147483648, 0]"));
        assert!(invalid("[limits]\nmax_dimension = 100\n[shadow]\noffset = [0, 101]"));

        assert!(!invalid("[shadow]\nblur_radius = 100.0"));
        assert!(!invalid("[text]\nsize = 1024.0"));
        assert!(!invalid("[limits]\nmax_dimension = 100\n[shadow]\noffset = [-100, 100]"));
    }

    #[test]
    fn validation_accepts_edge_values() {
        assert!(!invalid("[perspective_shadow]\nscale = 4.0"));
        assert!(!invalid("[shadow]\nblur_radius = 0.0"));
        assert!(!invalid("[limits]\nmax_dimension = 65535"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9100

[matting]
tolerance = 12.5
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.matting.tolerance, 12.5);
        assert_eq!(config.matting.feather, 1.5);
    }

    #[test]
    fn load_config_explicit_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_raw_config_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join("photofx.toml")).unwrap().is_none());
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photofx.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_runs_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photofx.toml");
        fs::write(&path, "[text]\nsize = -2.0\n").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_jobs_auto() {
        let jobs = effective_jobs(&ProcessingConfig { max_jobs: None });
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(jobs, cores);
    }

    #[test]
    fn effective_jobs_clamped_to_cores() {
        let jobs = effective_jobs(&ProcessingConfig {
            max_jobs: Some(99999),
        });
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(jobs, cores);
    }

    #[test]
    fn effective_jobs_user_constrains_down() {
        assert_eq!(effective_jobs(&ProcessingConfig { max_jobs: Some(1) }), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"port = 8000"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"port = 9000"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("port").unwrap().as_integer(), Some(9000));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[shadow]
offset = [15, 15]
blur_radius = 15.0
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[shadow]
blur_radius = 2.0
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let shadow = merged.get("shadow").unwrap();
        assert_eq!(shadow.get("blur_radius").unwrap().as_float(), Some(2.0));
        // offset preserved from base
        assert_eq!(shadow.get("offset").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn merge_toml_arrays_replace_wholesale() {
        let base: toml::Value = toml::from_str("color = [0, 0, 0, 120]").unwrap();
        let overlay: toml::Value = toml::from_str("color = [255, 0, 0, 255]").unwrap();
        let merged = merge_toml(base, overlay);
        let color = merged.get("color").unwrap().as_array().unwrap();
        assert_eq!(color[0].as_integer(), Some(255));
        assert_eq!(color[3].as_integer(), Some(255));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[shadow]
blur_raduis = 3.0
"#;
        let result: Result<ServiceConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ServiceConfig, _> = toml::from_str("[shadows]\nopacity = 3");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photofx.toml");
        fs::write(&path, "[server]\nprot = 80\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_and_matches_defaults() {
        let parsed: ServiceConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, ServiceConfig::default());
    }

    #[test]
    fn stock_defaults_value_round_trips() {
        let config = resolve_config(stock_defaults_value(), None).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
