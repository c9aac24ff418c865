//! Uniform values and the per-draw uniform sets the renderer uploads
//!
//! Uniform sets are name → value maps. Names match the built-in shader
//! chunks; the renderer only uploads names a program actually declares.

use std::collections::BTreeMap;

use crate::assets::TextureHandle;
use crate::foundation::math::{Color, Matrix3, Matrix4, Vector2, Vector3, Vector4};
use crate::scene::Fog;

use super::material::{HasEmissive, Material, MaterialKind, StandardParams};

/// A value uploaded to one shader uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f64),
    /// `int`
    Int(i32),
    /// `bool`
    Bool(bool),
    /// `vec2`
    Vec2(Vector2),
    /// `vec3`
    Vec3(Vector3),
    /// `vec4`
    Vec4(Vector4),
    /// `vec3` holding a linear color
    Color(Color),
    /// `mat3`
    Mat3(Matrix3),
    /// `mat4`
    Mat4(Matrix4),
    /// Packed `float[]`, `vec3[]` or `vec4[]` data
    FloatArray(Vec<f32>),
    /// Packed `mat4[]` data, 16 floats per matrix
    Mat4Array(Vec<f32>),
    /// Texture resolved to a sampler unit at draw time; `None` binds nothing
    Texture(Option<TextureHandle>),
    /// Sampler bound to a texture unit
    Sampler(u32),
}

impl UniformValue {
    /// GLSL type name, used by logs and the headless device
    pub const fn glsl_type(&self) -> &'static str {
        match self {
            Self::Float(_) | Self::FloatArray(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) | Self::Color(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) | Self::Mat4Array(_) => "mat4",
            Self::Texture(_) | Self::Sampler(_) => "sampler2D",
        }
    }

    /// Values as the 32-bit floats a device consumes
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Self::Float(v) => vec![*v as f32],
            Self::Int(v) => vec![*v as f32],
            Self::Bool(v) => vec![if *v { 1.0 } else { 0.0 }],
            Self::Vec2(v) => vec![v.x as f32, v.y as f32],
            Self::Vec3(v) => v.to_f32_array().to_vec(),
            Self::Vec4(v) => v.to_array().iter().map(|c| *c as f32).collect(),
            Self::Color(c) => c.to_f32_array().to_vec(),
            Self::Mat3(m) => m.to_f32_array().to_vec(),
            Self::Mat4(m) => m.to_f32_array().to_vec(),
            Self::FloatArray(v) | Self::Mat4Array(v) => v.clone(),
            Self::Texture(_) => Vec::new(),
            Self::Sampler(unit) => vec![*unit as f32],
        }
    }
}

impl From<f64> for UniformValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Color> for UniformValue {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

impl From<Vector3> for UniformValue {
    fn from(v: Vector3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Matrix4> for UniformValue {
    fn from(m: Matrix4) -> Self {
        Self::Mat4(m)
    }
}

/// Named uniform values in deterministic upload order
pub type Uniforms = BTreeMap<String, UniformValue>;

/// Strip array and struct suffixes: `pointLights[0].color` → `pointLights`
pub fn base_name(name: &str) -> &str {
    name.split(|c| c == '[' || c == '.').next().unwrap_or(name)
}

fn scaled(color: Color, k: f64) -> Color {
    Color::new(color.r * k, color.g * k, color.b * k)
}

/// Uniforms describing a material's parameters
///
/// Texture slots appear as [`UniformValue::Texture`] entries; the renderer
/// assigns units. Custom shader materials contribute their own uniform map.
pub fn material_uniforms(material: &Material) -> Uniforms {
    let mut u = Uniforms::new();
    u.insert("opacity".into(), UniformValue::Float(material.opacity));
    if material.alpha_test > 0.0 {
        u.insert("alphaTest".into(), UniformValue::Float(material.alpha_test));
    }

    if let Some(color) = material.kind.as_color() {
        u.insert("diffuse".into(), UniformValue::Color(color.color()));
    }

    match &material.kind {
        MaterialKind::Basic(p) => {
            u.insert("reflectivity".into(), UniformValue::Float(p.reflectivity));
        }
        MaterialKind::Lambert(p) => {
            u.insert("emissive".into(), UniformValue::Color(scaled(p.emissive(), p.emissive_intensity())));
            u.insert("normalScale".into(), UniformValue::Vec2(p.normal_scale));
        }
        MaterialKind::Phong(p) => {
            u.insert("emissive".into(), UniformValue::Color(scaled(p.emissive(), p.emissive_intensity())));
            u.insert("normalScale".into(), UniformValue::Vec2(p.lambert.normal_scale));
            u.insert("specular".into(), UniformValue::Color(p.specular));
            u.insert("shininess".into(), UniformValue::Float(p.shininess.max(1e-4)));
        }
        MaterialKind::Standard(p) => insert_standard(&mut u, p),
        MaterialKind::Physical(p) => {
            insert_standard(&mut u, &p.standard);
            u.insert("clearcoat".into(), UniformValue::Float(p.clearcoat));
            u.insert("clearcoatRoughness".into(), UniformValue::Float(p.clearcoat_roughness));
            u.insert("ior".into(), UniformValue::Float(p.ior));
            u.insert("sheenColor".into(), UniformValue::Color(p.sheen_color));
            u.insert("transmission".into(), UniformValue::Float(p.transmission));
            u.insert("thickness".into(), UniformValue::Float(p.thickness));
        }
        MaterialKind::Shader(p) => {
            u.extend(p.uniforms.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    for (slot, texture) in material.kind.textures() {
        u.insert(slot.uniform_name().to_string(), UniformValue::Texture(Some(texture)));
    }
    u
}

fn insert_standard(u: &mut Uniforms, p: &StandardParams) {
    u.insert("roughness".into(), UniformValue::Float(p.roughness));
    u.insert("metalness".into(), UniformValue::Float(p.metalness));
    u.insert("emissive".into(), UniformValue::Color(scaled(p.emissive, p.emissive_intensity)));
    u.insert("normalScale".into(), UniformValue::Vec2(p.normal_scale));
    u.insert("envMapIntensity".into(), UniformValue::Float(p.env_map_intensity));
}

/// Per-object transform uniforms
pub fn object_uniforms(model: &Matrix4, view: &Matrix4) -> Uniforms {
    let model_view = view.multiply(model);
    let mut u = Uniforms::new();
    u.insert("modelMatrix".into(), UniformValue::Mat4(*model));
    u.insert("modelViewMatrix".into(), UniformValue::Mat4(model_view));
    u.insert("normalMatrix".into(), UniformValue::Mat3(Matrix3::normal_matrix(&model_view)));
    u
}

/// Per-camera uniforms shared by every draw of a pass
pub fn camera_uniforms(projection: &Matrix4, view: &Matrix4, camera_world: &Matrix4) -> Uniforms {
    let mut u = Uniforms::new();
    u.insert("projectionMatrix".into(), UniformValue::Mat4(*projection));
    u.insert("viewMatrix".into(), UniformValue::Mat4(*view));
    u.insert(
        "cameraPosition".into(),
        UniformValue::Vec3(Vector3::from_matrix_position(camera_world)),
    );
    u
}

/// Fog uniforms; linear fog sets near/far, exponential sets density
pub fn fog_uniforms(fog: &Fog) -> Uniforms {
    let mut u = Uniforms::new();
    u.insert("fogColor".into(), UniformValue::Color(fog.color()));
    match fog {
        Fog::Linear { near, far, .. } => {
            u.insert("fogNear".into(), UniformValue::Float(*near));
            u.insert("fogFar".into(), UniformValue::Float(*far));
        }
        Fog::Exp2 { density, .. } => {
            u.insert("fogDensity".into(), UniformValue::Float(*density));
        }
    }
    u
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::{PhysicalParams, ShaderParams};

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("pointLights[0].color"), "pointLights");
        assert_eq!(base_name("diffuse"), "diffuse");
    }

    #[test]
    fn test_material_uniforms_by_kind() {
        let basic = material_uniforms(&Material::basic(Color::new(1.0, 0.0, 0.0)));
        assert_eq!(basic.get("diffuse"), Some(&UniformValue::Color(Color::new(1.0, 0.0, 0.0))));
        assert!(!basic.contains_key("roughness"));

        let glass = material_uniforms(&Material::physical(PhysicalParams {
            transmission: 0.5,
            ..PhysicalParams::default()
        }));
        assert_eq!(glass.get("transmission"), Some(&UniformValue::Float(0.5)));
        assert_eq!(glass.get("roughness"), Some(&UniformValue::Float(1.0)));

        let custom = material_uniforms(&Material::shader(
            ShaderParams::new("", "").with_uniform("uTime", UniformValue::Float(2.0)),
        ));
        assert_eq!(custom.get("uTime"), Some(&UniformValue::Float(2.0)));
        assert!(!custom.contains_key("diffuse"));
    }

    #[test]
    fn test_fog_uniforms() {
        let fog = Fog::Exp2 {
            color: Color::WHITE,
            density: 0.1,
        };
        let u = fog_uniforms(&fog);
        assert_eq!(u.get("fogDensity"), Some(&UniformValue::Float(0.1)));
        assert!(!u.contains_key("fogNear"));
    }

    #[test]
    fn test_f32_packing() {
        assert_eq!(UniformValue::Bool(true).to_f32_vec(), vec![1.0]);
        assert_eq!(UniformValue::Mat4(Matrix4::IDENTITY).to_f32_vec().len(), 16);
        assert!(UniformValue::Texture(None).to_f32_vec().is_empty());
    }
}
