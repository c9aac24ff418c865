//! Typed partial material updates

use crate::assets::TextureHandle;
use crate::foundation::math::{Color, Plane, Vector2};

use super::material::{Material, MaterialKind};
use super::params::{HasNormalMap, TextureSlot};
use super::state::{Blending, CompareFunction, Side};

/// A set of optional material changes applied together
///
/// Unset fields leave the material untouched. Texture fields are doubly
/// optional: `Some(None)` clears the slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialPatch {
    /// Base color
    pub color: Option<Color>,
    /// Emissive color
    pub emissive: Option<Color>,
    /// Specular color (phong)
    pub specular: Option<Color>,
    /// Specular exponent (phong)
    pub shininess: Option<f64>,
    /// Roughness (standard, physical)
    pub roughness: Option<f64>,
    /// Metalness (standard, physical)
    pub metalness: Option<f64>,
    /// Transmission (physical)
    pub transmission: Option<f64>,
    /// Normal map strength
    pub normal_scale: Option<Vector2>,
    /// Texture slot assignments
    pub textures: Vec<(TextureSlot, Option<TextureHandle>)>,
    /// Opacity
    pub opacity: Option<f64>,
    /// Transparent list routing
    pub transparent: Option<bool>,
    /// Alpha test threshold
    pub alpha_test: Option<f64>,
    /// Faces drawn
    pub side: Option<Side>,
    /// Blend preset
    pub blending: Option<Blending>,
    /// Depth test
    pub depth_test: Option<bool>,
    /// Depth write
    pub depth_write: Option<bool>,
    /// Depth comparison
    pub depth_func: Option<CompareFunction>,
    /// Vertex color usage
    pub vertex_colors: Option<bool>,
    /// Flat shading
    pub flat_shading: Option<bool>,
    /// Wireframe drawing
    pub wireframe: Option<bool>,
    /// Fog participation
    pub fog: Option<bool>,
    /// Tone mapping participation
    pub tone_mapped: Option<bool>,
    /// Visibility
    pub visible: Option<bool>,
    /// Local clipping planes
    pub clipping_planes: Option<Vec<Plane>>,
}

impl MaterialPatch {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: base color
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Builder: emissive color
    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = Some(emissive);
        self
    }

    /// Builder: roughness and metalness
    pub fn with_pbr(mut self, roughness: f64, metalness: f64) -> Self {
        self.roughness = Some(roughness);
        self.metalness = Some(metalness);
        self
    }

    /// Builder: assign or clear a texture slot
    pub fn with_texture(mut self, slot: TextureSlot, texture: Option<TextureHandle>) -> Self {
        self.textures.push((slot, texture));
        self
    }

    /// Builder: normal map strength
    pub fn with_normal_scale(mut self, scale: Vector2) -> Self {
        self.normal_scale = Some(scale);
        self
    }

    /// Builder: opacity and transparency
    pub fn with_opacity(mut self, opacity: f64, transparent: bool) -> Self {
        self.opacity = Some(opacity);
        self.transparent = Some(transparent);
        self
    }

    /// Builder: blend preset
    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = Some(blending);
        self
    }

    /// Builder: faces drawn
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Builder: vertex color usage
    pub fn with_vertex_colors(mut self, enabled: bool) -> Self {
        self.vertex_colors = Some(enabled);
        self
    }

    /// Builder: flat shading
    pub fn with_flat_shading(mut self, enabled: bool) -> Self {
        self.flat_shading = Some(enabled);
        self
    }

    /// Builder: transmission
    pub fn with_transmission(mut self, transmission: f64) -> Self {
        self.transmission = Some(transmission);
        self
    }
}

fn assign<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl Material {
    /// Apply a patch; returns true when the program shape changed
    ///
    /// Colors are assigned, vectors copied component-wise and everything else
    /// overwritten. `version` is bumped only on a shape change. Fields the
    /// material kind does not have are logged and ignored.
    pub fn apply(&mut self, patch: MaterialPatch) -> bool {
        let before = self.program_shape();
        let name = self.kind.shader_id();

        if let Some(color) = patch.color {
            match self.kind.as_color_mut() {
                Some(target) => target.set_color(color),
                None => log::warn!("'color' is not a property of {name} materials"),
            }
        }
        if let Some(emissive) = patch.emissive {
            match self.kind.as_emissive_mut() {
                Some(target) => target.set_emissive(emissive),
                None => log::warn!("'emissive' is not a property of {name} materials"),
            }
        }
        if let Some(scale) = patch.normal_scale {
            let target = match &mut self.kind {
                MaterialKind::Lambert(p) => Some(p as &mut dyn HasNormalMap),
                MaterialKind::Phong(p) => Some(p as &mut dyn HasNormalMap),
                MaterialKind::Standard(p) => Some(p as &mut dyn HasNormalMap),
                MaterialKind::Physical(p) => Some(p as &mut dyn HasNormalMap),
                MaterialKind::Basic(_) | MaterialKind::Shader(_) => None,
            };
            match target {
                Some(t) => {
                    let mut current = t.normal_scale();
                    current.x = scale.x;
                    current.y = scale.y;
                    t.set_normal_scale(current);
                }
                None => log::warn!("'normal_scale' is not a property of {name} materials"),
            }
        }
        self.apply_kind_scalars(&patch);

        for (slot, texture) in patch.textures {
            match self.kind.texture_mut(slot) {
                Some(target) => *target = texture,
                None => log::warn!("'{}' is not a property of {name} materials", slot.uniform_name()),
            }
        }

        assign(&mut self.opacity, patch.opacity);
        assign(&mut self.transparent, patch.transparent);
        assign(&mut self.alpha_test, patch.alpha_test);
        assign(&mut self.side, patch.side);
        assign(&mut self.blending, patch.blending);
        assign(&mut self.depth_test, patch.depth_test);
        assign(&mut self.depth_write, patch.depth_write);
        assign(&mut self.depth_func, patch.depth_func);
        assign(&mut self.vertex_colors, patch.vertex_colors);
        assign(&mut self.flat_shading, patch.flat_shading);
        assign(&mut self.wireframe, patch.wireframe);
        assign(&mut self.fog, patch.fog);
        assign(&mut self.tone_mapped, patch.tone_mapped);
        assign(&mut self.visible, patch.visible);
        assign(&mut self.clipping_planes, patch.clipping_planes);

        let changed = self.program_shape() != before;
        if changed {
            self.needs_update();
            log::debug!("material {} '{}' shape changed, version {}", self.id(), self.name, self.version());
        }
        changed
    }

    fn apply_kind_scalars(&mut self, patch: &MaterialPatch) {
        let name = self.kind.shader_id();
        match &mut self.kind {
            MaterialKind::Phong(p) => {
                assign(&mut p.specular, patch.specular);
                assign(&mut p.shininess, patch.shininess);
            }
            MaterialKind::Standard(p) => {
                assign(&mut p.roughness, patch.roughness);
                assign(&mut p.metalness, patch.metalness);
            }
            MaterialKind::Physical(p) => {
                assign(&mut p.standard.roughness, patch.roughness);
                assign(&mut p.standard.metalness, patch.metalness);
                assign(&mut p.transmission, patch.transmission);
            }
            _ => {}
        }

        let phong = matches!(self.kind, MaterialKind::Phong(_));
        let pbr = matches!(self.kind, MaterialKind::Standard(_) | MaterialKind::Physical(_));
        let physical = matches!(self.kind, MaterialKind::Physical(_));
        let ignored = [
            ("specular", patch.specular.is_some() && !phong),
            ("shininess", patch.shininess.is_some() && !phong),
            ("roughness", patch.roughness.is_some() && !pbr),
            ("metalness", patch.metalness.is_some() && !pbr),
            ("transmission", patch.transmission.is_some() && !physical),
        ];
        for (field, _) in ignored.iter().filter(|(_, skipped)| *skipped) {
            log::warn!("'{field}' is not a property of {name} materials");
        }
    }
}
