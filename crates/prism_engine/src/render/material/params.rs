//! Material parameter types for the built-in shading models
//!
//! Parameters are grouped per shading model. Shared capabilities (base color,
//! texture maps, emissive, lighting) are expressed as traits so renderer code
//! can handle any kind that supports them.

use std::collections::BTreeMap;

use crate::assets::TextureHandle;
use crate::foundation::math::{Color, Vector2};
use crate::render::uniforms::UniformValue;

/// Texture inputs a material can sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    /// Base color
    Map,
    /// Opacity
    AlphaMap,
    /// Reflection/irradiance environment
    EnvMap,
    /// Tangent-space normals
    NormalMap,
    /// Emission
    EmissiveMap,
    /// Specular intensity (phong)
    SpecularMap,
    /// Roughness in the green channel
    RoughnessMap,
    /// Metalness in the blue channel
    MetalnessMap,
    /// Ambient occlusion in the red channel
    AoMap,
    /// Transmission factor
    TransmissionMap,
}

impl TextureSlot {
    /// Every slot in cache-key order
    pub const ALL: [Self; 10] = [
        Self::Map,
        Self::AlphaMap,
        Self::EnvMap,
        Self::NormalMap,
        Self::EmissiveMap,
        Self::SpecularMap,
        Self::RoughnessMap,
        Self::MetalnessMap,
        Self::AoMap,
        Self::TransmissionMap,
    ];

    /// Sampler uniform name
    pub const fn uniform_name(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::AlphaMap => "alphaMap",
            Self::EnvMap => "envMap",
            Self::NormalMap => "normalMap",
            Self::EmissiveMap => "emissiveMap",
            Self::SpecularMap => "specularMap",
            Self::RoughnessMap => "roughnessMap",
            Self::MetalnessMap => "metalnessMap",
            Self::AoMap => "aoMap",
            Self::TransmissionMap => "transmissionMap",
        }
    }

    /// Preprocessor define enabling the slot in shaders
    pub const fn define(self) -> &'static str {
        match self {
            Self::Map => "USE_MAP",
            Self::AlphaMap => "USE_ALPHAMAP",
            Self::EnvMap => "USE_ENVMAP",
            Self::NormalMap => "USE_NORMALMAP",
            Self::EmissiveMap => "USE_EMISSIVEMAP",
            Self::SpecularMap => "USE_SPECULARMAP",
            Self::RoughnessMap => "USE_ROUGHNESSMAP",
            Self::MetalnessMap => "USE_METALNESSMAP",
            Self::AoMap => "USE_AOMAP",
            Self::TransmissionMap => "USE_TRANSMISSIONMAP",
        }
    }

    /// True when texels hold color (decoded per color space); false for data maps
    pub const fn is_color(self) -> bool {
        matches!(self, Self::Map | Self::EmissiveMap | Self::EnvMap)
    }
}

/// Kinds with a base color
pub trait HasColor {
    /// Base color (linear)
    fn color(&self) -> Color;
    /// Set the base color (linear)
    fn set_color(&mut self, color: Color);
}

/// Kinds with a base color texture
pub trait HasMap {
    /// Base color texture
    fn map(&self) -> Option<TextureHandle>;
    /// Set the base color texture
    fn set_map(&mut self, map: Option<TextureHandle>);
}

/// Kinds that sample an environment map
pub trait HasEnvMap {
    /// Environment texture
    fn env_map(&self) -> Option<TextureHandle>;
    /// Set the environment texture
    fn set_env_map(&mut self, env_map: Option<TextureHandle>);
}

/// Kinds with emission
pub trait HasEmissive {
    /// Emissive color
    fn emissive(&self) -> Color;
    /// Set the emissive color
    fn set_emissive(&mut self, emissive: Color);
    /// Emission multiplier
    fn emissive_intensity(&self) -> f64;
}

/// Kinds with tangent-space normal mapping
pub trait HasNormalMap {
    /// Normal texture
    fn normal_map(&self) -> Option<TextureHandle>;
    /// Set the normal texture
    fn set_normal_map(&mut self, normal_map: Option<TextureHandle>);
    /// Per-axis normal strength
    fn normal_scale(&self) -> Vector2;
    /// Set the per-axis normal strength
    fn set_normal_scale(&mut self, scale: Vector2);
}

/// Marker for kinds that respond to scene lights
pub trait Lit {}

/// Unlit color/texture material
#[derive(Debug, Clone, PartialEq)]
pub struct BasicParams {
    /// Base color
    pub color: Color,
    /// Base color texture
    pub map: Option<TextureHandle>,
    /// Opacity texture
    pub alpha_map: Option<TextureHandle>,
    /// Environment texture
    pub env_map: Option<TextureHandle>,
    /// Environment contribution
    pub reflectivity: f64,
}

impl Default for BasicParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            alpha_map: None,
            env_map: None,
            reflectivity: 1.0,
        }
    }
}

/// Per-vertex diffuse lighting
#[derive(Debug, Clone, PartialEq)]
pub struct LambertParams {
    /// Diffuse color
    pub color: Color,
    /// Emissive color
    pub emissive: Color,
    /// Emission multiplier
    pub emissive_intensity: f64,
    /// Base color texture
    pub map: Option<TextureHandle>,
    /// Emission texture
    pub emissive_map: Option<TextureHandle>,
    /// Normal texture
    pub normal_map: Option<TextureHandle>,
    /// Normal strength
    pub normal_scale: Vector2,
    /// Environment texture
    pub env_map: Option<TextureHandle>,
}

impl Default for LambertParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            map: None,
            emissive_map: None,
            normal_map: None,
            normal_scale: Vector2::new(1.0, 1.0),
            env_map: None,
        }
    }
}

/// Blinn-Phong shading
#[derive(Debug, Clone, PartialEq)]
pub struct PhongParams {
    /// Diffuse and emissive inputs shared with Lambert
    pub lambert: LambertParams,
    /// Specular color
    pub specular: Color,
    /// Specular exponent
    pub shininess: f64,
    /// Specular intensity texture
    pub specular_map: Option<TextureHandle>,
}

impl Default for PhongParams {
    fn default() -> Self {
        Self {
            lambert: LambertParams::default(),
            specular: Color::from_hex(0x11_11_11),
            shininess: 30.0,
            specular_map: None,
        }
    }
}

/// Metallic-roughness physically based shading
#[derive(Debug, Clone, PartialEq)]
pub struct StandardParams {
    /// Base color (albedo)
    pub color: Color,
    /// Roughness factor (0.0 = mirror, 1.0 = completely rough)
    pub roughness: f64,
    /// Metallic factor (0.0 = dielectric, 1.0 = metallic)
    pub metalness: f64,
    /// Emissive color
    pub emissive: Color,
    /// Emission multiplier
    pub emissive_intensity: f64,
    /// Base color texture
    pub map: Option<TextureHandle>,
    /// Roughness texture
    pub roughness_map: Option<TextureHandle>,
    /// Metalness texture
    pub metalness_map: Option<TextureHandle>,
    /// Normal texture
    pub normal_map: Option<TextureHandle>,
    /// Normal strength
    pub normal_scale: Vector2,
    /// Emission texture
    pub emissive_map: Option<TextureHandle>,
    /// Ambient occlusion texture
    pub ao_map: Option<TextureHandle>,
    /// Environment texture
    pub env_map: Option<TextureHandle>,
    /// Environment contribution
    pub env_map_intensity: f64,
}

impl Default for StandardParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            map: None,
            roughness_map: None,
            metalness_map: None,
            normal_map: None,
            normal_scale: Vector2::new(1.0, 1.0),
            emissive_map: None,
            ao_map: None,
            env_map: None,
            env_map_intensity: 1.0,
        }
    }
}

/// Standard shading plus clearcoat, sheen and transmission
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalParams {
    /// Metallic-roughness inputs
    pub standard: StandardParams,
    /// Clearcoat layer strength
    pub clearcoat: f64,
    /// Clearcoat roughness
    pub clearcoat_roughness: f64,
    /// Index of refraction
    pub ior: f64,
    /// Sheen color; black disables sheen
    pub sheen_color: Color,
    /// Fraction of light transmitted through the surface
    pub transmission: f64,
    /// Transmission texture
    pub transmission_map: Option<TextureHandle>,
    /// Volume thickness for refraction
    pub thickness: f64,
}

impl Default for PhysicalParams {
    fn default() -> Self {
        Self {
            standard: StandardParams::default(),
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            ior: 1.5,
            sheen_color: Color::BLACK,
            transmission: 0.0,
            transmission_map: None,
            thickness: 0.0,
        }
    }
}

/// Custom shader sources
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderParams {
    /// Vertex stage source (may use `#include <chunk>`)
    pub vertex_shader: String,
    /// Fragment stage source (may use `#include <chunk>`)
    pub fragment_shader: String,
    /// Uniform values uploaded every draw
    pub uniforms: BTreeMap<String, UniformValue>,
    /// Extra preprocessor defines
    pub defines: BTreeMap<String, String>,
    /// Receive scene light uniforms
    pub lights: bool,
}

impl ShaderParams {
    /// Sources without defines or uniforms
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            ..Self::default()
        }
    }

    /// Builder: add a uniform
    pub fn with_uniform(mut self, name: &str, value: UniformValue) -> Self {
        self.uniforms.insert(name.to_string(), value);
        self
    }

    /// Builder: add a define
    pub fn with_define(mut self, name: &str, value: impl Into<String>) -> Self {
        self.defines.insert(name.to_string(), value.into());
        self
    }
}

macro_rules! impl_color {
    ($ty:ty, $($path:ident).+) => {
        impl HasColor for $ty {
            fn color(&self) -> Color {
                self.$($path).+
            }
            fn set_color(&mut self, color: Color) {
                self.$($path).+ = color;
            }
        }
    };
}

macro_rules! impl_map {
    ($ty:ty, $($path:ident).+) => {
        impl HasMap for $ty {
            fn map(&self) -> Option<TextureHandle> {
                self.$($path).+
            }
            fn set_map(&mut self, map: Option<TextureHandle>) {
                self.$($path).+ = map;
            }
        }
    };
}

macro_rules! impl_env_map {
    ($ty:ty, $($path:ident).+) => {
        impl HasEnvMap for $ty {
            fn env_map(&self) -> Option<TextureHandle> {
                self.$($path).+
            }
            fn set_env_map(&mut self, env_map: Option<TextureHandle>) {
                self.$($path).+ = env_map;
            }
        }
    };
}

macro_rules! impl_emissive_normal {
    ($ty:ty, $($prefix:ident).*) => {
        impl HasEmissive for $ty {
            fn emissive(&self) -> Color {
                self$(.$prefix)*.emissive
            }
            fn set_emissive(&mut self, emissive: Color) {
                self$(.$prefix)*.emissive = emissive;
            }
            fn emissive_intensity(&self) -> f64 {
                self$(.$prefix)*.emissive_intensity
            }
        }

        impl HasNormalMap for $ty {
            fn normal_map(&self) -> Option<TextureHandle> {
                self$(.$prefix)*.normal_map
            }
            fn set_normal_map(&mut self, normal_map: Option<TextureHandle>) {
                self$(.$prefix)*.normal_map = normal_map;
            }
            fn normal_scale(&self) -> Vector2 {
                self$(.$prefix)*.normal_scale
            }
            fn set_normal_scale(&mut self, scale: Vector2) {
                self$(.$prefix)*.normal_scale = scale;
            }
        }

        impl Lit for $ty {}
    };
}

impl_color!(BasicParams, color);
impl_color!(LambertParams, color);
impl_color!(PhongParams, lambert.color);
impl_color!(StandardParams, color);
impl_color!(PhysicalParams, standard.color);

impl_map!(BasicParams, map);
impl_map!(LambertParams, map);
impl_map!(PhongParams, lambert.map);
impl_map!(StandardParams, map);
impl_map!(PhysicalParams, standard.map);

impl_env_map!(BasicParams, env_map);
impl_env_map!(LambertParams, env_map);
impl_env_map!(PhongParams, lambert.env_map);
impl_env_map!(StandardParams, env_map);
impl_env_map!(PhysicalParams, standard.env_map);

impl_emissive_normal!(LambertParams,);
impl_emissive_normal!(PhongParams, lambert);
impl_emissive_normal!(StandardParams,);
impl_emissive_normal!(PhysicalParams, standard);

#[cfg(test)]
mod tests {
    use super::*;

    fn tint<T: HasColor>(params: &mut T) {
        params.set_color(Color::BLACK);
    }

    #[test]
    fn test_capabilities_reach_nested_fields() {
        let mut phong = PhongParams::default();
        tint(&mut phong);
        assert_eq!(phong.lambert.color, Color::BLACK);

        let mut physical = PhysicalParams::default();
        physical.set_normal_scale(Vector2::new(2.0, 2.0));
        assert_eq!(physical.standard.normal_scale, Vector2::new(2.0, 2.0));
        assert_eq!(physical.emissive_intensity(), 1.0);
    }

    #[test]
    fn test_slot_metadata() {
        assert_eq!(TextureSlot::Map.define(), "USE_MAP");
        assert!(TextureSlot::Map.is_color());
        assert!(!TextureSlot::NormalMap.is_color());
        assert_eq!(TextureSlot::ALL.len(), 10);
    }
}
