//! # Unified Configuration System
//!
//! Configuration structures for the renderer and the engine as a whole.
//!
//! ## Configuration Categories
//!
//! - **Renderer Config**: output encoding, tone mapping, sorting, clearing,
//!   shadows, clipping, shader error handling and device limits
//! - **Engine Config**: logging and the renderer settings it owns
//!
//! Both load from TOML or RON through the [`Config`] trait.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Color, ColorSpace, CoordinateSystem};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// Tone mapping operator applied to lit fragments before output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    /// No tone mapping
    #[default]
    None,
    /// Exposure scale only
    Linear,
    /// Reinhard operator
    Reinhard,
    /// Cineon filmic curve
    Cineon,
    /// ACES filmic approximation
    AcesFilmic,
    /// AgX
    AgX,
    /// Khronos PBR neutral
    Neutral,
}

impl ToneMapping {
    /// Name used in shader defines and config files
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear => "linear",
            Self::Reinhard => "reinhard",
            Self::Cineon => "cineon",
            Self::AcesFilmic => "aces_filmic",
            Self::AgX => "agx",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for ToneMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToneMapping {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::None,
            Self::Linear,
            Self::Reinhard,
            Self::Cineon,
            Self::AcesFilmic,
            Self::AgX,
            Self::Neutral,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| ConfigError::Invalid(format!("unknown tone mapping '{s}'")))
    }
}

/// Shadow map filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowMapType {
    /// Single unfiltered sample
    Basic,
    /// Percentage-closer filtering
    #[default]
    Pcf,
    /// Percentage-closer filtering with bilinear taps
    PcfSoft,
    /// Variance shadow maps
    Vsm,
}

impl ShadowMapType {
    /// Define name emitted into shader prefixes
    pub const fn define(self) -> &'static str {
        match self {
            Self::Basic => "SHADOWMAP_TYPE_BASIC",
            Self::Pcf => "SHADOWMAP_TYPE_PCF",
            Self::PcfSoft => "SHADOWMAP_TYPE_PCF_SOFT",
            Self::Vsm => "SHADOWMAP_TYPE_VSM",
        }
    }
}

/// Shader float precision qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// `highp`
    #[default]
    High,
    /// `mediump`
    Medium,
    /// `lowp`
    Low,
}

impl Precision {
    /// GLSL qualifier keyword
    pub const fn qualifier(self) -> &'static str {
        match self {
            Self::High => "highp",
            Self::Medium => "mediump",
            Self::Low => "lowp",
        }
    }
}

/// What the renderer does when a program fails to compile or link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderErrorPolicy {
    /// Return the first failure from `render`; later frames skip the program
    #[default]
    HaltFrame,
    /// Log the failure once and skip draws that use the program
    SkipDraw,
}

/// Shadow settings shared by every shadow-casting light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Render shadow maps at all
    pub enabled: bool,
    /// Filtering used when sampling shadow maps
    pub map_type: ShadowMapType,
    /// Re-render shadow maps every frame
    pub auto_update: bool,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            map_type: ShadowMapType::default(),
            auto_update: true,
        }
    }
}

/// # Renderer Configuration
///
/// Settings that shape every frame the renderer produces. Fields that affect
/// program generation (output color space, tone mapping, shadow type,
/// precision) feed the shader-variant fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Drawing buffer width in CSS pixels
    pub width: u32,
    /// Drawing buffer height in CSS pixels
    pub height: u32,
    /// Device pixels per CSS pixel
    pub pixel_ratio: f64,
    /// Encoding of the final output
    pub output_color_space: ColorSpace,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Exposure applied before tone mapping
    pub tone_mapping_exposure: f64,
    /// Sort render lists before drawing
    pub sort_objects: bool,
    /// Clear color/depth/stencil before each frame
    pub auto_clear: bool,
    /// Clear color (linear)
    pub clear_color: Color,
    /// Clear alpha
    pub clear_alpha: f64,
    /// Shadow maps
    pub shadows: ShadowConfig,
    /// Honor material clipping planes
    pub local_clipping_enabled: bool,
    /// Behavior on program build failure
    pub shader_error_policy: ShaderErrorPolicy,
    /// Clip-space depth convention
    pub coordinate_system: CoordinateSystem,
    /// Default shader precision
    pub precision: Precision,
    /// Texture units available to a single program
    pub max_texture_units: u32,
    /// Morph targets blended per draw
    pub max_morph_targets: u32,
}

impl RendererConfig {
    /// Create a renderer configuration for a drawing buffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            output_color_space: ColorSpace::Srgb,
            tone_mapping: ToneMapping::None,
            tone_mapping_exposure: 1.0,
            sort_objects: true,
            auto_clear: true,
            clear_color: Color::BLACK,
            clear_alpha: 1.0,
            shadows: ShadowConfig::default(),
            local_clipping_enabled: false,
            shader_error_policy: ShaderErrorPolicy::default(),
            coordinate_system: CoordinateSystem::default(),
            precision: Precision::default(),
            max_texture_units: 16,
            max_morph_targets: 8,
        }
    }

    /// Set the output color space
    pub fn with_output_color_space(mut self, space: ColorSpace) -> Self {
        self.output_color_space = space;
        self
    }

    /// Set tone mapping and exposure
    pub fn with_tone_mapping(mut self, tone_mapping: ToneMapping, exposure: f64) -> Self {
        self.tone_mapping = tone_mapping;
        self.tone_mapping_exposure = exposure;
        self
    }

    /// Enable shadow maps of the given type
    pub fn with_shadows(mut self, map_type: ShadowMapType) -> Self {
        self.shadows.enabled = true;
        self.shadows.map_type = map_type;
        self
    }

    /// Set the shader error policy
    pub fn with_shader_error_policy(mut self, policy: ShaderErrorPolicy) -> Self {
        self.shader_error_policy = policy;
        self
    }

    /// Set the clip-space convention
    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self
    }

    /// Set the pixel ratio
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Enable or disable render-list sorting
    pub fn with_sort_objects(mut self, sort: bool) -> Self {
        self.sort_objects = sort;
        self
    }

    /// Enable or disable material clipping planes
    pub fn with_local_clipping(mut self, enabled: bool) -> Self {
        self.local_clipping_enabled = enabled;
        self
    }

    /// Set the clear color and alpha
    pub fn with_clear_color(mut self, color: Color, alpha: f64) -> Self {
        self.clear_color = color;
        self.clear_alpha = alpha;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "drawing buffer must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "pixel ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.clear_alpha) {
            return Err(ConfigError::Invalid(format!(
                "clear alpha must be within [0, 1], got {}",
                self.clear_alpha
            )));
        }
        if self.max_texture_units == 0 {
            return Err(ConfigError::Invalid("at least one texture unit is required".to_string()));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl Config for RendererConfig {}

/// # Engine Configuration
///
/// Logging plus the renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Renderer settings
    pub renderer: RendererConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            renderer: RendererConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Replace the renderer configuration
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Parsed log level
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_filter()?;
        self.renderer.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
        let config = RendererConfig::default();
        assert_eq!(config.output_color_space, ColorSpace::Srgb);
        assert_eq!(config.max_morph_targets, 8);
        assert_eq!(config.shader_error_policy, ShaderErrorPolicy::HaltFrame);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RendererConfig::new(0, 10).validate().is_err());
        assert!(RendererConfig::default().with_pixel_ratio(0.0).validate().is_err());
        assert!(EngineConfig::new().with_log_level("loud").validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::new().with_renderer(
            RendererConfig::new(1280, 720)
                .with_tone_mapping(ToneMapping::AcesFilmic, 1.5)
                .with_shadows(ShadowMapType::PcfSoft)
                .with_coordinate_system(CoordinateSystem::WebGpu),
        );
        let text = config.to_string_as(ConfigFormat::Toml);
        assert!(text.is_ok());
        if let Ok(text) = text {
            assert!(text.contains("aces_filmic"));
            let back = EngineConfig::from_str_as(&text, ConfigFormat::Toml);
            assert_eq!(back.ok(), Some(config));
        }
    }

    #[test]
    fn test_ron_partial_document_uses_defaults() {
        let parsed = RendererConfig::from_str_as("(width: 320, sort_objects: false)", ConfigFormat::Ron);
        assert!(parsed.is_ok());
        if let Ok(parsed) = parsed {
            assert_eq!(parsed.width, 320);
            assert_eq!(parsed.height, 600);
            assert!(!parsed.sort_objects);
        }
    }

    #[test]
    fn test_file_roundtrip_and_format_detection() {
        let dir = std::env::temp_dir().join(format!("prism_engine_cfg_{}", std::process::id()));
        assert!(std::fs::create_dir_all(&dir).is_ok());
        let path = dir.join("engine.ron");
        let config = EngineConfig::new().with_log_level("debug");
        assert!(config.save_to_file(&path).is_ok());
        let loaded = EngineConfig::load_from_file(&path);
        assert_eq!(loaded.ok(), Some(config));
        assert!(matches!(
            EngineConfig::load_from_file(dir.join("engine.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tone_mapping_parse() {
        assert_eq!("ACES_FILMIC".parse::<ToneMapping>().ok(), Some(ToneMapping::AcesFilmic));
        assert!("filmic".parse::<ToneMapping>().is_err());
    }
}
