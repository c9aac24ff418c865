//! Program assembly, compilation and diagnostics

use crate::core::config::ToneMapping;
use crate::foundation::math::ColorSpace;
use crate::render::backend::{GraphicsDevice, ProgramId, ShaderId, ShaderStage};

use super::preprocess::resolve_includes;
use super::{ProgramParameters, ShaderError, ShaderLibrary, ShaderResult};

const VERTEX_BUILTINS: &str = "\
uniform mat4 modelMatrix;
uniform mat4 modelViewMatrix;
uniform mat4 projectionMatrix;
uniform mat4 viewMatrix;
uniform mat3 normalMatrix;
uniform vec3 cameraPosition;
#ifdef USE_INSTANCING
in mat4 instanceMatrix;
#endif
#ifdef USE_INSTANCING_COLOR
in vec3 instanceColor;
#endif
in vec3 position;
in vec3 normal;
in vec2 uv;
#ifdef USE_TANGENT
in vec4 tangent;
#endif
#ifdef USE_VERTEX_COLOR
in vec3 color;
#endif
#ifdef USE_SKINNING
in vec4 skinIndex;
in vec4 skinWeight;
#endif
";

const FRAGMENT_BUILTINS: &str = "\
uniform mat4 viewMatrix;
uniform vec3 cameraPosition;
out highp vec4 pc_fragColor;
#define gl_FragColor pc_fragColor
#include <tonemapping_pars_fragment>
#include <colorspace_pars_fragment>
";

/// Compile output for one stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDiagnostics {
    /// Stage compiled
    pub compiled: bool,
    /// Compiler log
    pub log: String,
    /// Generated prefix placed ahead of the stage body
    pub prefix: String,
}

/// Result of building a program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramDiagnostics {
    /// Program compiled and linked
    pub runnable: bool,
    /// Link log
    pub program_log: String,
    /// Vertex stage output
    pub vertex_shader: StageDiagnostics,
    /// Fragment stage output
    pub fragment_shader: StageDiagnostics,
}

impl ProgramDiagnostics {
    /// The failure as an error, or `None` for runnable programs
    pub fn error(&self) -> Option<ShaderError> {
        if self.runnable {
            return None;
        }
        let stages = [
            (ShaderStage::Vertex, &self.vertex_shader),
            (ShaderStage::Fragment, &self.fragment_shader),
        ];
        Some(
            stages
                .into_iter()
                .find(|(_, stage)| !stage.compiled)
                .map_or_else(
                    || ShaderError::Link {
                        log: self.program_log.clone(),
                    },
                    |(stage, diagnostics)| ShaderError::Compile {
                        stage,
                        log: diagnostics.log.clone(),
                    },
                ),
        )
    }
}

/// A linked program and its reflection data
#[derive(Debug, Clone)]
pub struct Program {
    /// Cache-unique id
    pub id: u32,
    /// Fingerprint this program was built for
    pub key: String,
    /// Material name or template id, for logs
    pub name: String,
    /// Device program; `None` when the build failed
    pub handle: Option<ProgramId>,
    /// Active uniform names
    pub uniforms: Vec<String>,
    /// Active attribute names in location order
    pub attributes: Vec<String>,
    /// Build output
    pub diagnostics: ProgramDiagnostics,
    /// Materials currently using this program
    pub used_times: usize,
}

impl Program {
    /// Assemble, compile and link the program described by `params`
    ///
    /// Include resolution failures are errors. Compile and link failures
    /// are not: they leave a program with `handle == None` and the logs in
    /// [`Program::diagnostics`].
    pub fn build<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        library: &ShaderLibrary,
        params: &ProgramParameters,
        key: String,
        id: u32,
    ) -> ShaderResult<Self> {
        let (vertex_body, fragment_body) = match &params.custom {
            Some((vertex, fragment)) => (vertex.as_str(), fragment.as_str()),
            None => library
                .template(&params.shader_id)
                .ok_or_else(|| ShaderError::UnresolvedChunk(params.shader_id.clone()))?,
        };

        let vertex_prefix = vertex_prefix(params);
        let fragment_prefix = fragment_prefix(params);
        let vertex_source = resolve_includes(&format!("{vertex_prefix}{vertex_body}"), library)?;
        let fragment_source = resolve_includes(&format!("{fragment_prefix}{fragment_body}"), library)?;

        let name = if params.name.is_empty() {
            params.shader_id.clone()
        } else {
            params.name.clone()
        };
        let mut program = Self {
            id,
            key,
            name,
            handle: None,
            uniforms: Vec::new(),
            attributes: Vec::new(),
            diagnostics: ProgramDiagnostics {
                vertex_shader: StageDiagnostics {
                    prefix: vertex_prefix,
                    ..StageDiagnostics::default()
                },
                fragment_shader: StageDiagnostics {
                    prefix: fragment_prefix,
                    ..StageDiagnostics::default()
                },
                ..ProgramDiagnostics::default()
            },
            used_times: 1,
        };

        let vertex = program.compile_stage(device, ShaderStage::Vertex, &vertex_source);
        let fragment = program.compile_stage(device, ShaderStage::Fragment, &fragment_source);
        let (Some(vertex), Some(fragment)) = (vertex, fragment) else {
            for shader in [vertex, fragment].into_iter().flatten() {
                device.delete_shader(shader);
            }
            return Ok(program);
        };

        match device.link_program(vertex, fragment) {
            Ok(linked) => {
                if !linked.log.is_empty() {
                    log::warn!("Program '{}' link log: {}", program.name, linked.log);
                }
                program.handle = Some(linked.program);
                program.uniforms = linked.uniforms;
                program.attributes = linked.attributes;
                program.diagnostics.program_log = linked.log;
                program.diagnostics.runnable = true;
                log::debug!(
                    "Built program {} '{}' ({} uniforms, {} attributes)",
                    program.id,
                    program.name,
                    program.uniforms.len(),
                    program.attributes.len()
                );
            }
            Err(log) => {
                log::error!("Program '{}' failed to link: {log}", program.name);
                program.diagnostics.program_log = log;
            }
        }
        device.delete_shader(vertex);
        device.delete_shader(fragment);
        Ok(program)
    }

    fn compile_stage<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        stage: ShaderStage,
        source: &str,
    ) -> Option<ShaderId> {
        let diagnostics = match stage {
            ShaderStage::Vertex => &mut self.diagnostics.vertex_shader,
            ShaderStage::Fragment => &mut self.diagnostics.fragment_shader,
        };
        match device.compile_shader(stage, source) {
            Ok(shader) => {
                diagnostics.compiled = true;
                Some(shader)
            }
            Err(log) => {
                log::error!("Program '{}': {stage} shader failed to compile: {log}", self.name);
                diagnostics.log = log;
                None
            }
        }
    }

    /// True when the program compiled and linked
    pub const fn is_runnable(&self) -> bool {
        self.diagnostics.runnable
    }

    /// True when the program declares uniform `name` (array suffixes ignored)
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|u| u == name)
    }

    /// Location of attribute `name`
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .position(|a| a == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Release the device program
    pub fn destroy<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some(handle) = self.handle.take() {
            device.delete_program(handle);
        }
    }
}

fn header(params: &ProgramParameters) -> String {
    let precision = params.precision.qualifier();
    let mut out = format!("#version 300 es\nprecision {precision} float;\nprecision {precision} int;\n");
    for define in params.defines() {
        out.push_str(&define);
        out.push('\n');
    }
    out
}

fn vertex_prefix(params: &ProgramParameters) -> String {
    let mut out = header(params);
    out.push_str(VERTEX_BUILTINS);
    if params.object.morph_targets {
        let mut apply = String::from("#define MORPHTARGETS_APPLY(t)");
        for i in 0..params.object.morph_count {
            out.push_str(&format!("in vec3 morphTarget{i};\n"));
            apply.push_str(&format!(" t += morphTarget{i} * morphTargetInfluences[{i}];"));
        }
        out.push_str(&apply);
        out.push('\n');
    }
    out
}

fn fragment_prefix(params: &ProgramParameters) -> String {
    let mut out = header(params);
    out.push_str(FRAGMENT_BUILTINS);
    let tone_mapping = match params.tone_mapping {
        ToneMapping::None => None,
        ToneMapping::Linear => Some("Linear"),
        ToneMapping::Reinhard => Some("Reinhard"),
        ToneMapping::Cineon => Some("Cineon"),
        ToneMapping::AcesFilmic => Some("ACESFilmic"),
        ToneMapping::AgX => Some("AgX"),
        ToneMapping::Neutral => Some("Neutral"),
    };
    if let Some(op) = tone_mapping {
        out.push_str(&format!("vec3 toneMapping(vec3 color) {{ return {op}ToneMapping(color); }}\n"));
    }
    let transfer = match params.output_color_space {
        ColorSpace::Srgb => "sRGB",
        ColorSpace::LinearSrgb | ColorSpace::None => "Linear",
    };
    out.push_str(&format!(
        "vec4 linearToOutputTexel(vec4 value) {{ return {transfer}TransferOETF(value); }}\n"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Assets;
    use crate::core::config::RendererConfig;
    use crate::foundation::math::Color;
    use crate::render::backend::{DeviceCommand, HeadlessDevice};
    use crate::render::lights::LightCounts;
    use crate::render::material::{Material, ShaderParams};
    use crate::render::shader::{ObjectTraits, ProgramSettings};

    fn params_for(material: &Material) -> ProgramParameters {
        ProgramParameters::gather(
            material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &ProgramSettings::from_config(&RendererConfig::new(8, 8), false),
            None,
            &Assets::new(),
        )
    }

    #[test]
    fn test_builtin_programs_link() {
        let mut device = HeadlessDevice::new();
        let library = ShaderLibrary::new();
        let materials = [
            Material::basic(Color::WHITE),
            Material::lambert(Color::WHITE),
            Material::phong(Color::WHITE),
            Material::standard(Color::WHITE, 0.5, 0.5),
        ];
        for (i, material) in materials.iter().enumerate() {
            let params = params_for(material);
            let program = Program::build(&mut device, &library, &params, params.cache_key(), i as u32).unwrap();
            assert!(program.is_runnable(), "{}: {:?}", params.shader_id, program.diagnostics);
            assert!(program.has_uniform("projectionMatrix"));
            assert!(program.attribute_location("position").is_some());
        }
    }

    #[test]
    fn test_prefix_recorded_in_diagnostics() {
        let mut device = HeadlessDevice::new();
        let params = params_for(&Material::default());
        let program = Program::build(&mut device, &ShaderLibrary::new(), &params, String::new(), 0).unwrap();
        assert!(program.diagnostics.vertex_shader.prefix.starts_with("#version 300 es"));
        assert!(program.diagnostics.fragment_shader.prefix.contains("linearToOutputTexel"));
    }

    #[test]
    fn test_compile_failure_is_diagnostic_not_error() {
        let mut device = HeadlessDevice::new();
        let material = Material::shader(ShaderParams::new(
            "void main() { gl_Position = vec4(position, 1.0); }",
            "#error broken\nvoid main() { gl_FragColor = vec4(1.0); }",
        ));
        let params = params_for(&material);
        let program = Program::build(&mut device, &ShaderLibrary::new(), &params, String::new(), 0).unwrap();
        assert!(!program.is_runnable());
        assert!(program.handle.is_none());
        assert!(matches!(
            program.diagnostics.error(),
            Some(ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
        assert_eq!(device.count(|c| matches!(c, DeviceCommand::LinkProgram { .. })), 0);
    }

    #[test]
    fn test_unresolved_chunk_is_error() {
        let mut device = HeadlessDevice::new();
        let material = Material::shader(ShaderParams::new(
            "#include <not_a_chunk>\nvoid main() { gl_Position = vec4(position, 1.0); }",
            "void main() { gl_FragColor = vec4(1.0); }",
        ));
        let params = params_for(&material);
        let err = Program::build(&mut device, &ShaderLibrary::new(), &params, String::new(), 0).unwrap_err();
        assert_eq!(err, ShaderError::UnresolvedChunk("not_a_chunk".to_string()));
    }
}
