//! Material resource: shading model plus common render state
//!
//! `version` counts program-shape changes only. Direct field edits do not
//! bump it; call [`Material::needs_update`] after changing anything that
//! affects the shader variant, or use [`MaterialPatch`](super::MaterialPatch)
//! which bumps automatically.

use crate::assets::TextureHandle;
use crate::foundation::math::{Color, Plane};

use super::params::{
    BasicParams, HasColor, HasEmissive, LambertParams, PhongParams, PhysicalParams, ShaderParams,
    StandardParams, TextureSlot,
};
use super::state::{Blending, CompareFunction, PolygonOffset, Side, StencilState};

/// Shading model and its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Unlit
    Basic(BasicParams),
    /// Diffuse only
    Lambert(LambertParams),
    /// Blinn-Phong
    Phong(PhongParams),
    /// Metallic-roughness PBR
    Standard(StandardParams),
    /// Extended PBR
    Physical(PhysicalParams),
    /// Custom sources
    Shader(ShaderParams),
}

impl MaterialKind {
    /// Shader library program id
    pub const fn shader_id(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Lambert(_) => "lambert",
            Self::Phong(_) => "phong",
            Self::Standard(_) => "standard",
            Self::Physical(_) => "physical",
            Self::Shader(_) => "shader",
        }
    }

    /// True when scene lights affect the result
    pub const fn is_lit(&self) -> bool {
        match self {
            Self::Basic(_) => false,
            Self::Lambert(_) | Self::Phong(_) | Self::Standard(_) | Self::Physical(_) => true,
            Self::Shader(params) => params.lights,
        }
    }

    /// Texture bound to `slot`, if the kind has that slot and it is set
    pub const fn texture(&self, slot: TextureSlot) -> Option<TextureHandle> {
        use TextureSlot as S;
        match (self, slot) {
            (Self::Basic(p), S::Map) => p.map,
            (Self::Basic(p), S::AlphaMap) => p.alpha_map,
            (Self::Basic(p), S::EnvMap) => p.env_map,
            (Self::Lambert(p), S::Map) => p.map,
            (Self::Lambert(p), S::EmissiveMap) => p.emissive_map,
            (Self::Lambert(p), S::NormalMap) => p.normal_map,
            (Self::Lambert(p), S::EnvMap) => p.env_map,
            (Self::Phong(p), S::SpecularMap) => p.specular_map,
            (Self::Phong(p), _) => Self::lambert_texture(&p.lambert, slot),
            (Self::Standard(p), _) => Self::standard_texture(p, slot),
            (Self::Physical(p), S::TransmissionMap) => p.transmission_map,
            (Self::Physical(p), _) => Self::standard_texture(&p.standard, slot),
            _ => None,
        }
    }

    const fn lambert_texture(p: &LambertParams, slot: TextureSlot) -> Option<TextureHandle> {
        match slot {
            TextureSlot::Map => p.map,
            TextureSlot::EmissiveMap => p.emissive_map,
            TextureSlot::NormalMap => p.normal_map,
            TextureSlot::EnvMap => p.env_map,
            _ => None,
        }
    }

    const fn standard_texture(p: &StandardParams, slot: TextureSlot) -> Option<TextureHandle> {
        match slot {
            TextureSlot::Map => p.map,
            TextureSlot::RoughnessMap => p.roughness_map,
            TextureSlot::MetalnessMap => p.metalness_map,
            TextureSlot::NormalMap => p.normal_map,
            TextureSlot::EmissiveMap => p.emissive_map,
            TextureSlot::AoMap => p.ao_map,
            TextureSlot::EnvMap => p.env_map,
            _ => None,
        }
    }

    /// Mutable reference to the texture field behind `slot`
    pub fn texture_mut(&mut self, slot: TextureSlot) -> Option<&mut Option<TextureHandle>> {
        use TextureSlot as S;
        match (self, slot) {
            (Self::Basic(p), S::Map) => Some(&mut p.map),
            (Self::Basic(p), S::AlphaMap) => Some(&mut p.alpha_map),
            (Self::Basic(p), S::EnvMap) => Some(&mut p.env_map),
            (Self::Lambert(p), _) => Self::lambert_texture_mut(p, slot),
            (Self::Phong(p), S::SpecularMap) => Some(&mut p.specular_map),
            (Self::Phong(p), _) => Self::lambert_texture_mut(&mut p.lambert, slot),
            (Self::Standard(p), _) => Self::standard_texture_mut(p, slot),
            (Self::Physical(p), S::TransmissionMap) => Some(&mut p.transmission_map),
            (Self::Physical(p), _) => Self::standard_texture_mut(&mut p.standard, slot),
            _ => None,
        }
    }

    fn lambert_texture_mut(p: &mut LambertParams, slot: TextureSlot) -> Option<&mut Option<TextureHandle>> {
        match slot {
            TextureSlot::Map => Some(&mut p.map),
            TextureSlot::EmissiveMap => Some(&mut p.emissive_map),
            TextureSlot::NormalMap => Some(&mut p.normal_map),
            TextureSlot::EnvMap => Some(&mut p.env_map),
            _ => None,
        }
    }

    fn standard_texture_mut(p: &mut StandardParams, slot: TextureSlot) -> Option<&mut Option<TextureHandle>> {
        match slot {
            TextureSlot::Map => Some(&mut p.map),
            TextureSlot::RoughnessMap => Some(&mut p.roughness_map),
            TextureSlot::MetalnessMap => Some(&mut p.metalness_map),
            TextureSlot::NormalMap => Some(&mut p.normal_map),
            TextureSlot::EmissiveMap => Some(&mut p.emissive_map),
            TextureSlot::AoMap => Some(&mut p.ao_map),
            TextureSlot::EnvMap => Some(&mut p.env_map),
            _ => None,
        }
    }

    /// Every set texture with its slot, in slot order
    pub fn textures(&self) -> Vec<(TextureSlot, TextureHandle)> {
        TextureSlot::ALL
            .iter()
            .filter_map(|&slot| self.texture(slot).map(|t| (slot, t)))
            .collect()
    }

    /// Base color capability
    pub fn as_color(&self) -> Option<&dyn HasColor> {
        match self {
            Self::Basic(p) => Some(p),
            Self::Lambert(p) => Some(p),
            Self::Phong(p) => Some(p),
            Self::Standard(p) => Some(p),
            Self::Physical(p) => Some(p),
            Self::Shader(_) => None,
        }
    }

    /// Mutable base color capability
    pub fn as_color_mut(&mut self) -> Option<&mut dyn HasColor> {
        match self {
            Self::Basic(p) => Some(p),
            Self::Lambert(p) => Some(p),
            Self::Phong(p) => Some(p),
            Self::Standard(p) => Some(p),
            Self::Physical(p) => Some(p),
            Self::Shader(_) => None,
        }
    }

    /// Mutable emissive capability
    pub fn as_emissive_mut(&mut self) -> Option<&mut dyn HasEmissive> {
        match self {
            Self::Lambert(p) => Some(p),
            Self::Phong(p) => Some(p),
            Self::Standard(p) => Some(p),
            Self::Physical(p) => Some(p),
            Self::Basic(_) | Self::Shader(_) => None,
        }
    }

    /// Transmission factor (physical only)
    pub const fn transmission(&self) -> f64 {
        match self {
            Self::Physical(p) => p.transmission,
            _ => 0.0,
        }
    }
}

/// Everything about a material that selects a distinct shader program
///
/// Two materials with equal shapes (and equal scene/object state) share a
/// program; a shape change is what bumps [`Material::version`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProgramShape {
    shader_id: &'static str,
    textures: Vec<TextureSlot>,
    blending: Blending,
    vertex_colors: bool,
    flat_shading: bool,
    alpha_test: bool,
    double_sided: bool,
    transmission: bool,
    fog: bool,
    shader: Option<(String, String, Vec<(String, String)>)>,
}

/// Material resource containing shading model and render state
#[derive(Debug, Clone)]
pub struct Material {
    pub(crate) id: u32,
    /// Optional name for debugging
    pub name: String,
    /// Shading model and its parameters
    pub kind: MaterialKind,
    /// Faces drawn
    pub side: Side,
    /// Faces drawn into shadow maps; `None` uses the opposite of `side`
    pub shadow_side: Option<Side>,
    /// Blend preset
    pub blending: Blending,
    /// Blend with premultiplied alpha
    pub premultiplied_alpha: bool,
    /// Routed to the transparent list and drawn back-to-front
    pub transparent: bool,
    /// Overall opacity
    pub opacity: f64,
    /// Discard fragments with alpha below this; zero disables the test
    pub alpha_test: f64,
    /// Test against the depth buffer
    pub depth_test: bool,
    /// Write to the depth buffer
    pub depth_write: bool,
    /// Depth comparison
    pub depth_func: CompareFunction,
    /// Stencil test; `None` disables it
    pub stencil: Option<StencilState>,
    /// Write to the color buffer
    pub color_write: bool,
    /// Depth offset
    pub polygon_offset: Option<PolygonOffset>,
    /// Multiply by the `color` vertex attribute
    pub vertex_colors: bool,
    /// Per-face normals from screen-space derivatives
    pub flat_shading: bool,
    /// Material-local clipping planes (world space)
    pub clipping_planes: Vec<Plane>,
    /// Clip only where every plane clips (instead of any)
    pub clip_intersection: bool,
    /// Apply the clipping planes in shadow passes too
    pub clip_shadows: bool,
    /// Apply renderer tone mapping
    pub tone_mapped: bool,
    /// Receive scene fog
    pub fog: bool,
    /// Draw edges as lines
    pub wireframe: bool,
    /// Dither the output to hide banding
    pub dithering: bool,
    /// Skipped during rendering when false
    pub visible: bool,
    version: u64,
}

impl Material {
    /// Create a material around a shading model with default render state
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            id: 0,
            name: String::new(),
            kind,
            side: Side::Front,
            shadow_side: None,
            blending: Blending::Normal,
            premultiplied_alpha: false,
            transparent: false,
            opacity: 1.0,
            alpha_test: 0.0,
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunction::LessEqual,
            stencil: None,
            color_write: true,
            polygon_offset: None,
            vertex_colors: false,
            flat_shading: false,
            clipping_planes: Vec::new(),
            clip_intersection: false,
            clip_shadows: false,
            tone_mapped: true,
            fog: true,
            wireframe: false,
            dithering: false,
            visible: true,
            version: 0,
        }
    }

    /// Unlit material of one color
    pub fn basic(color: Color) -> Self {
        Self::new(MaterialKind::Basic(BasicParams {
            color,
            ..BasicParams::default()
        }))
    }

    /// Lambert material of one color
    pub fn lambert(color: Color) -> Self {
        let mut params = LambertParams::default();
        params.color = color;
        Self::new(MaterialKind::Lambert(params))
    }

    /// Phong material of one color
    pub fn phong(color: Color) -> Self {
        let mut params = PhongParams::default();
        params.lambert.color = color;
        Self::new(MaterialKind::Phong(params))
    }

    /// Standard PBR material
    pub fn standard(color: Color, roughness: f64, metalness: f64) -> Self {
        Self::new(MaterialKind::Standard(StandardParams {
            color,
            roughness,
            metalness,
            ..StandardParams::default()
        }))
    }

    /// Physical material
    pub fn physical(params: PhysicalParams) -> Self {
        Self::new(MaterialKind::Physical(params))
    }

    /// Custom shader material
    pub fn shader(params: ShaderParams) -> Self {
        Self::new(MaterialKind::Shader(params))
    }

    /// Builder: set the material name for debugging
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: transparent with the given opacity
    pub fn with_transparency(mut self, opacity: f64) -> Self {
        self.transparent = true;
        self.opacity = opacity;
        self
    }

    /// Builder: faces drawn
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Builder: blend preset
    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    /// Numeric id assigned by the asset store; zero before insertion
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Program-shape version
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Force the renderer to re-evaluate this material's program
    pub fn needs_update(&mut self) {
        self.version += 1;
    }

    /// True when the transmission pass applies
    pub fn is_transmissive(&self) -> bool {
        self.kind.transmission() > 0.0
    }

    pub(crate) fn program_shape(&self) -> ProgramShape {
        ProgramShape {
            shader_id: self.kind.shader_id(),
            textures: self.kind.textures().into_iter().map(|(slot, _)| slot).collect(),
            blending: self.blending,
            vertex_colors: self.vertex_colors,
            flat_shading: self.flat_shading,
            alpha_test: self.alpha_test > 0.0,
            double_sided: self.side == Side::Double,
            transmission: self.is_transmissive(),
            fog: self.fog,
            shader: match &self.kind {
                MaterialKind::Shader(p) => Some((
                    p.vertex_shader.clone(),
                    p.fragment_shader.clone(),
                    p.defines.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                )),
                _ => None,
            },
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::basic(Color::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_texture_lookup_per_kind() {
        let mut textures: SlotMap<TextureHandle, ()> = SlotMap::with_key();
        let t = textures.insert(());
        let mut material = Material::phong(Color::WHITE);
        if let Some(slot) = material.kind.texture_mut(TextureSlot::NormalMap) {
            *slot = Some(t);
        }
        assert_eq!(material.kind.texture(TextureSlot::NormalMap), Some(t));
        assert_eq!(material.kind.textures(), vec![(TextureSlot::NormalMap, t)]);
        assert!(material.kind.texture_mut(TextureSlot::TransmissionMap).is_none());
    }

    #[test]
    fn test_shape_tracks_texture_presence() {
        let mut textures: SlotMap<TextureHandle, ()> = SlotMap::with_key();
        let a = textures.insert(());
        let b = textures.insert(());
        let mut material = Material::basic(Color::WHITE);
        let empty = material.program_shape();
        if let MaterialKind::Basic(p) = &mut material.kind {
            p.map = Some(a);
        }
        let with_a = material.program_shape();
        assert_ne!(empty, with_a);
        if let MaterialKind::Basic(p) = &mut material.kind {
            p.map = Some(b);
        }
        assert_eq!(with_a, material.program_shape());
    }

    #[test]
    fn test_lit_and_transmission() {
        assert!(!Material::basic(Color::WHITE).kind.is_lit());
        assert!(Material::standard(Color::WHITE, 0.5, 0.0).kind.is_lit());
        let glass = Material::physical(PhysicalParams {
            transmission: 1.0,
            ..PhysicalParams::default()
        });
        assert!(glass.is_transmissive());
    }
}
