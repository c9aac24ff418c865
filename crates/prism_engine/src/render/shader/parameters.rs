//! Shader-variant parameters and their fingerprint

use std::fmt::Write as _;

use crate::assets::Assets;
use crate::core::config::{Precision, RendererConfig, ShadowMapType, ToneMapping};
use crate::foundation::math::ColorSpace;
use crate::geometry::Geometry;
use crate::render::lights::LightCounts;
use crate::render::material::{Blending, Material, MaterialKind, Side, TextureSlot};
use crate::scene::{Fog, Mesh};

/// Fog equation compiled into a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FogMode {
    /// Linear between near and far
    Linear,
    /// Exponential squared
    Exp2,
}

impl FogMode {
    /// Mode for a scene fog
    pub const fn of(fog: &Fog) -> Self {
        match fog {
            Fog::Linear { .. } => Self::Linear,
            Fog::Exp2 { .. } => Self::Exp2,
        }
    }
}

/// Per-object features that change the vertex stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectTraits {
    /// Per-instance matrices
    pub instancing: bool,
    /// Per-instance colors
    pub instancing_color: bool,
    /// Bone skinning
    pub skinning: bool,
    /// Bones in the skeleton
    pub bone_count: usize,
    /// Position morph targets
    pub morph_targets: bool,
    /// Normal morph targets
    pub morph_normals: bool,
    /// Morph targets compiled in
    pub morph_count: usize,
    /// Object samples shadow maps
    pub receive_shadow: bool,
    /// Geometry carries a `tangent` attribute
    pub has_tangent: bool,
}

impl ObjectTraits {
    /// Traits of a mesh drawn with `geometry`
    pub fn from_mesh(mesh: &Mesh, geometry: &Geometry, receive_shadow: bool, max_morph_targets: usize) -> Self {
        let morph_count = geometry
            .morph_attribute("position")
            .map_or(0, <[_]>::len)
            .min(max_morph_targets);
        Self {
            instancing: mesh.instancing.is_some(),
            instancing_color: mesh.instancing.as_ref().is_some_and(|i| i.colors().is_some()),
            skinning: mesh.skin.is_some(),
            bone_count: mesh.skin.as_ref().map_or(0, |s| s.bones.len()),
            morph_targets: morph_count > 0,
            morph_normals: morph_count > 0 && geometry.morph_attribute("normal").is_some(),
            morph_count,
            receive_shadow,
            has_tangent: geometry.has_attribute("tangent"),
        }
    }
}

/// Renderer-wide settings that feed every program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramSettings {
    /// Float precision
    pub precision: Precision,
    /// Encoding of the default framebuffer
    pub output_color_space: ColorSpace,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Shadow filtering; `None` when shadows are disabled
    pub shadow_map: Option<ShadowMapType>,
    /// Drawing into a render target instead of the default framebuffer
    pub rendering_to_target: bool,
}

impl ProgramSettings {
    /// Settings for the current output
    pub const fn from_config(config: &RendererConfig, rendering_to_target: bool) -> Self {
        Self {
            precision: config.precision,
            output_color_space: config.output_color_space,
            tone_mapping: config.tone_mapping,
            shadow_map: if config.shadows.enabled {
                Some(config.shadows.map_type)
            } else {
                None
            },
            rendering_to_target,
        }
    }
}

/// Everything that changes the generated source of a program
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramParameters {
    /// Template id, or `shader` for custom sources
    pub shader_id: String,
    /// Material name, for logs
    pub name: String,
    /// Custom vertex and fragment sources
    pub custom: Option<(String, String)>,
    /// Custom defines in name order
    pub custom_defines: Vec<(String, String)>,
    /// Float precision
    pub precision: Precision,
    /// Bound texture slots with their color spaces
    pub textures: Vec<(TextureSlot, ColorSpace)>,
    /// Per-vertex colors
    pub vertex_colors: bool,
    /// Face normals from derivatives
    pub flat_shading: bool,
    /// Alpha test compiled in
    pub alpha_test: bool,
    /// Rendered faces
    pub side: Side,
    /// Transmission sampling compiled in
    pub transmission: bool,
    /// Premultiply color by alpha on output
    pub premultiplied_alpha: bool,
    /// Force alpha to one
    pub opaque: bool,
    /// Output dithering
    pub dithering: bool,
    /// Extended PBR terms
    pub physical: bool,
    /// Light layout; zero for unlit programs
    pub lights: LightCounts,
    /// Object features
    pub object: ObjectTraits,
    /// Clipping planes
    pub num_clipping_planes: usize,
    /// Clipping planes combined by intersection
    pub num_clip_intersection: usize,
    /// Output encoding
    pub output_color_space: ColorSpace,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Shadow filtering when this program samples shadow maps
    pub shadow_map: Option<ShadowMapType>,
    /// Fog equation
    pub fog: Option<FogMode>,
}

impl ProgramParameters {
    /// Collect the variant inputs for one draw
    pub fn gather(
        material: &Material,
        object: ObjectTraits,
        lights: &LightCounts,
        clipping: (usize, usize),
        settings: &ProgramSettings,
        fog: Option<FogMode>,
        assets: &Assets,
    ) -> Self {
        let lit = material.kind.is_lit();
        let lights = if lit { *lights } else { LightCounts::default() };
        let textures = material
            .kind
            .textures()
            .into_iter()
            .map(|(slot, handle)| {
                let space = assets.texture(handle).map_or(ColorSpace::None, |t| t.color_space);
                (slot, space)
            })
            .collect();
        let (custom, custom_defines) = match &material.kind {
            MaterialKind::Shader(params) => (
                Some((params.vertex_shader.clone(), params.fragment_shader.clone())),
                params.defines.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ),
            _ => (None, Vec::new()),
        };
        let shadow_map = settings
            .shadow_map
            .filter(|_| lit && object.receive_shadow && lights.has_shadows());

        Self {
            shader_id: material.kind.shader_id().to_string(),
            name: material.name.clone(),
            custom,
            custom_defines,
            precision: settings.precision,
            textures,
            vertex_colors: material.vertex_colors,
            flat_shading: material.flat_shading,
            alpha_test: material.alpha_test > 0.0,
            side: material.side,
            transmission: material.is_transmissive(),
            premultiplied_alpha: material.premultiplied_alpha,
            opaque: !material.transparent && material.blending == Blending::Normal,
            dithering: material.dithering,
            physical: matches!(material.kind, MaterialKind::Physical(_)),
            lights,
            object,
            num_clipping_planes: clipping.0,
            num_clip_intersection: clipping.1,
            output_color_space: if settings.rendering_to_target {
                ColorSpace::LinearSrgb
            } else {
                settings.output_color_space
            },
            tone_mapping: if material.tone_mapped && !settings.rendering_to_target {
                settings.tone_mapping
            } else {
                ToneMapping::None
            },
            shadow_map,
            fog: fog.filter(|_| material.fog),
        }
    }

    /// Parameters of the depth program used by shadow passes
    pub fn depth(object: ObjectTraits, clipping: (usize, usize), precision: Precision) -> Self {
        Self {
            shader_id: "depth".to_string(),
            name: "depth".to_string(),
            custom: None,
            custom_defines: Vec::new(),
            precision,
            textures: Vec::new(),
            vertex_colors: false,
            flat_shading: false,
            alpha_test: false,
            side: Side::Front,
            transmission: false,
            premultiplied_alpha: false,
            opaque: false,
            dithering: false,
            physical: false,
            lights: LightCounts::default(),
            object: ObjectTraits {
                receive_shadow: false,
                ..object
            },
            num_clipping_planes: clipping.0,
            num_clip_intersection: clipping.1,
            output_color_space: ColorSpace::LinearSrgb,
            tone_mapping: ToneMapping::None,
            shadow_map: None,
            fog: None,
        }
    }

    /// Deterministic fingerprint; equal keys mean identical generated source
    pub fn cache_key(&self) -> String {
        let mut key = String::with_capacity(256);
        key.push_str(&self.shader_id);
        if let Some((vertex, fragment)) = &self.custom {
            let _ = write!(key, "|vs:{vertex}|fs:{fragment}");
        }
        for (name, value) in &self.custom_defines {
            let _ = write!(key, "|d:{name}={value}");
        }
        for (slot, space) in &self.textures {
            let _ = write!(key, "|t:{}:{space}", slot.uniform_name());
        }
        let o = &self.object;
        let l = &self.lights;
        let _ = write!(
            key,
            "|p:{}|vc:{}|fs:{}|at:{}|s:{}|tr:{}|pa:{}|op:{}|di:{}|ph:{}",
            self.precision.qualifier(),
            u8::from(self.vertex_colors),
            u8::from(self.flat_shading),
            u8::from(self.alpha_test),
            self.side.as_str(),
            u8::from(self.transmission),
            u8::from(self.premultiplied_alpha),
            u8::from(self.opaque),
            u8::from(self.dithering),
            u8::from(self.physical),
        );
        let _ = write!(
            key,
            "|in:{}{}|sk:{}:{}|mt:{}:{}:{}|rs:{}|tg:{}",
            u8::from(o.instancing),
            u8::from(o.instancing_color),
            u8::from(o.skinning),
            o.bone_count,
            u8::from(o.morph_targets),
            u8::from(o.morph_normals),
            o.morph_count,
            u8::from(o.receive_shadow),
            u8::from(o.has_tangent),
        );
        let _ = write!(
            key,
            "|l:{},{},{},{}|ls:{},{},{}|cp:{}:{}|ocs:{}|tm:{}|sm:{:?}|fog:{:?}",
            l.directional,
            l.point,
            l.spot,
            l.hemi,
            l.directional_shadows,
            l.point_shadows,
            l.spot_shadows,
            self.num_clipping_planes,
            self.num_clip_intersection,
            self.output_color_space,
            self.tone_mapping.as_str(),
            self.shadow_map,
            self.fog,
        );
        key
    }

    /// `#define` lines shared by both stages
    pub fn defines(&self) -> Vec<String> {
        let mut out = vec![format!("#define SHADER_TYPE {}", self.shader_id)];
        let mut flag = |enabled: bool, name: &str| {
            if enabled {
                out.push(format!("#define {name}"));
            }
        };

        for (slot, _) in &self.textures {
            flag(true, slot.define());
        }
        flag(!self.textures.is_empty(), "USE_UV");
        flag(self.vertex_colors || self.object.instancing_color, "USE_COLOR");
        flag(self.vertex_colors, "USE_VERTEX_COLOR");
        flag(self.object.instancing, "USE_INSTANCING");
        flag(self.object.instancing_color, "USE_INSTANCING_COLOR");
        flag(self.object.skinning, "USE_SKINNING");
        flag(self.object.morph_targets, "USE_MORPHTARGETS");
        flag(self.object.morph_normals, "USE_MORPHNORMALS");
        flag(self.object.has_tangent, "USE_TANGENT");
        flag(self.flat_shading, "FLAT_SHADED");
        flag(self.side == Side::Double, "DOUBLE_SIDED");
        flag(self.side == Side::Back, "FLIP_SIDED");
        flag(self.alpha_test, "USE_ALPHATEST");
        flag(self.transmission, "USE_TRANSMISSION");
        flag(self.premultiplied_alpha, "PREMULTIPLIED_ALPHA");
        flag(self.opaque, "OPAQUE");
        flag(self.dithering, "DITHERING");
        flag(self.physical, "PHYSICAL");
        flag(self.fog.is_some(), "USE_FOG");
        flag(self.fog == Some(FogMode::Exp2), "FOG_EXP2");
        flag(self.shadow_map.is_some(), "USE_SHADOWMAP");
        if let Some(map_type) = self.shadow_map {
            flag(true, map_type.define());
        }
        flag(self.tone_mapping != ToneMapping::None, "TONE_MAPPING");

        if self.object.skinning {
            out.push(format!("#define MAX_BONES {}", self.object.bone_count.max(1)));
        }
        if self.object.morph_targets {
            out.push(format!("#define MORPHTARGETS_COUNT {}", self.object.morph_count));
        }
        let l = &self.lights;
        out.push(format!("#define NUM_DIR_LIGHTS {}", l.directional));
        out.push(format!("#define NUM_POINT_LIGHTS {}", l.point));
        out.push(format!("#define NUM_SPOT_LIGHTS {}", l.spot));
        out.push(format!("#define NUM_HEMI_LIGHTS {}", l.hemi));
        out.push(format!("#define NUM_DIR_LIGHT_SHADOWS {}", l.directional_shadows));
        out.push(format!("#define NUM_POINT_LIGHT_SHADOWS {}", l.point_shadows));
        out.push(format!("#define NUM_SPOT_LIGHT_SHADOWS {}", l.spot_shadows));
        out.push(format!("#define NUM_CLIPPING_PLANES {}", self.num_clipping_planes));
        out.push(format!(
            "#define UNION_CLIPPING_PLANES {}",
            self.num_clipping_planes - self.num_clip_intersection
        ));
        for (name, value) in &self.custom_defines {
            out.push(format!("#define {name} {value}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Image, Texture};
    use crate::foundation::math::Color;

    fn settings() -> ProgramSettings {
        ProgramSettings::from_config(&RendererConfig::new(64, 64), false)
    }

    fn params(material: &Material, assets: &Assets) -> ProgramParameters {
        ProgramParameters::gather(
            material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &settings(),
            None,
            assets,
        )
    }

    #[test]
    fn test_equal_shapes_share_key() {
        let assets = Assets::new();
        let a = Material::standard(Color::WHITE, 0.5, 0.0);
        let b = Material::standard(Color::new(1.0, 0.0, 0.0), 0.9, 1.0);
        assert_eq!(params(&a, &assets).cache_key(), params(&b, &assets).cache_key());
    }

    #[test]
    fn test_key_tracks_shape_inputs() {
        let mut assets = Assets::new();
        let base = Material::lambert(Color::WHITE);
        let key = params(&base, &assets).cache_key();

        let mut colored = base.clone();
        colored.vertex_colors = true;
        assert_ne!(params(&colored, &assets).cache_key(), key);

        let mut flat = base.clone();
        flat.flat_shading = true;
        assert_ne!(params(&flat, &assets).cache_key(), key);

        let texture = assets.add_texture(
            Texture::from_image(Image::solid_color(1, 1, [255; 4])).with_color_space(ColorSpace::Srgb),
        );
        let mut mapped = base;
        if let Some(slot) = mapped.kind.texture_mut(TextureSlot::Map) {
            *slot = Some(texture);
        }
        let mapped_params = params(&mapped, &assets);
        assert_eq!(mapped_params.textures, vec![(TextureSlot::Map, ColorSpace::Srgb)]);
        assert_ne!(mapped_params.cache_key(), key);
    }

    #[test]
    fn test_unlit_ignores_light_counts() {
        let assets = Assets::new();
        let counts = LightCounts {
            directional: 2,
            ..LightCounts::default()
        };
        let basic = Material::basic(Color::WHITE);
        let with = ProgramParameters::gather(&basic, ObjectTraits::default(), &counts, (0, 0), &settings(), None, &assets);
        assert_eq!(with.cache_key(), params(&basic, &assets).cache_key());

        let lit = Material::lambert(Color::WHITE);
        let with = ProgramParameters::gather(&lit, ObjectTraits::default(), &counts, (0, 0), &settings(), None, &assets);
        assert_ne!(with.cache_key(), params(&lit, &assets).cache_key());
    }

    #[test]
    fn test_fog_respects_material_flag() {
        let assets = Assets::new();
        let mut material = Material::basic(Color::WHITE);
        let fogged = ProgramParameters::gather(
            &material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &settings(),
            Some(FogMode::Exp2),
            &assets,
        );
        assert!(fogged.defines().iter().any(|d| d == "#define FOG_EXP2"));

        material.fog = false;
        let unfogged = ProgramParameters::gather(
            &material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &settings(),
            Some(FogMode::Exp2),
            &assets,
        );
        assert_eq!(unfogged.fog, None);
    }

    #[test]
    fn test_defines_always_carry_counts() {
        let assets = Assets::new();
        let defines = params(&Material::default(), &assets).defines();
        assert!(defines.iter().any(|d| d == "#define NUM_DIR_LIGHTS 0"));
        assert!(defines.iter().any(|d| d == "#define NUM_CLIPPING_PLANES 0"));
        assert!(defines.iter().any(|d| d == "#define OPAQUE"));
    }

    #[test]
    fn test_render_target_disables_tone_mapping() {
        let assets = Assets::new();
        let config = RendererConfig::new(64, 64).with_tone_mapping(ToneMapping::AcesFilmic, 1.0);
        let material = Material::standard(Color::WHITE, 1.0, 0.0);
        let to_screen = ProgramParameters::gather(
            &material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &ProgramSettings::from_config(&config, false),
            None,
            &assets,
        );
        let to_target = ProgramParameters::gather(
            &material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &ProgramSettings::from_config(&config, true),
            None,
            &assets,
        );
        assert_eq!(to_screen.tone_mapping, ToneMapping::AcesFilmic);
        assert_eq!(to_target.tone_mapping, ToneMapping::None);
    }
}
