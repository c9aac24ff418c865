//! Recording device without a GPU
//!
//! [`HeadlessDevice`] behaves like a driver from the renderer's point of view:
//! it allocates handles, stores buffer contents, validates shader sources on
//! compile and link, reflects uniforms and attributes from declarations and
//! can simulate context loss. Every call is appended to a command log that
//! tests inspect.

use std::collections::{HashMap, HashSet};

use crate::geometry::Usage;
use crate::render::uniforms::UniformValue;

use super::{
    BackendError, BackendResult, BufferId, BufferTarget, DrawCall, FramebufferId, GraphicsDevice, LinkedProgram,
    ProgramId, ShaderId, ShaderStage, StateChange, TextureDescriptor, TextureId, VertexBinding,
};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Buffer created
    CreateBuffer {
        /// New buffer
        id: BufferId,
        /// Binding target
        target: BufferTarget,
        /// Initial size in bytes
        bytes: usize,
    },
    /// Buffer sub-range written
    UpdateBuffer {
        /// Target buffer
        id: BufferId,
        /// Byte offset
        offset: usize,
        /// Bytes written
        bytes: usize,
    },
    /// Buffer released
    DeleteBuffer(BufferId),
    /// Texture allocated
    CreateTexture {
        /// New texture
        id: TextureId,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Texture released
    DeleteTexture(TextureId),
    /// Framebuffer created
    CreateFramebuffer(FramebufferId),
    /// Framebuffer released
    DeleteFramebuffer(FramebufferId),
    /// Draw target switched
    BindFramebuffer(Option<FramebufferId>),
    /// Stage compiled
    CompileShader {
        /// Stage
        stage: ShaderStage,
        /// Compile succeeded
        ok: bool,
    },
    /// Program linked
    LinkProgram {
        /// Link succeeded
        ok: bool,
    },
    /// Program released
    DeleteProgram(ProgramId),
    /// Pipeline state changed
    State(StateChange),
    /// Framebuffer cleared
    Clear {
        /// Clear color, when the color buffer is cleared
        color: Option<[f32; 4]>,
        /// Depth cleared
        depth: bool,
        /// Stencil cleared
        stencil: bool,
    },
    /// Uniform set
    Uniform {
        /// Program
        program: ProgramId,
        /// Uniform name
        name: String,
        /// Value
        value: UniformValue,
    },
    /// Texture bound to a unit
    BindTexture {
        /// Sampler unit
        unit: u32,
        /// Texture
        texture: TextureId,
    },
    /// Vertex attribute bound
    BindVertexBuffer(VertexBinding),
    /// Index buffer bound
    BindIndexBuffer(BufferId),
    /// Draw submitted
    Draw(DrawCall),
}

/// GPU-less device that records every call
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u32,
    context_lost: bool,
    commands: Vec<DeviceCommand>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, (u32, u32)>,
    framebuffers: HashSet<FramebufferId>,
    shaders: HashMap<ShaderId, (ShaderStage, String)>,
    programs: HashSet<ProgramId>,
}

impl HeadlessDevice {
    /// Create a device with no objects
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn ensure_context(&self) -> BackendResult<()> {
        if self.context_lost {
            Err(BackendError::ContextLost)
        } else {
            Ok(())
        }
    }

    /// Every call recorded so far
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Forget recorded calls, keeping device objects
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Recorded draws
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::Draw(call) => Some(*call),
                _ => None,
            })
            .collect()
    }

    /// Recorded state changes
    pub fn state_changes(&self) -> Vec<&StateChange> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::State(change) => Some(change),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    /// Live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Contents of a live buffer
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Live framebuffers
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Live programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Lose the context: every object is gone and calls fail until restored
    pub fn simulate_context_loss(&mut self) {
        log::warn!("Headless device: context lost");
        self.context_lost = true;
        self.buffers.clear();
        self.textures.clear();
        self.framebuffers.clear();
        self.shaders.clear();
        self.programs.clear();
    }

    /// Make the context usable again (with no objects)
    pub fn restore_context(&mut self) {
        log::info!("Headless device: context restored");
        self.context_lost = false;
    }

    fn validate(stage: ShaderStage, source: &str) -> Result<(), String> {
        for (line_no, line) in source.lines().enumerate() {
            if let Some(message) = line.trim_start().strip_prefix("#error") {
                return Err(format!("ERROR: 0:{}: '#error' :{}", line_no + 1, message));
            }
        }
        if !source.contains("void main") {
            return Err(format!("ERROR: 0:0: '{stage}' : missing main function"));
        }
        let opened = source.matches('{').count();
        let closed = source.matches('}').count();
        if opened != closed {
            return Err(format!("ERROR: 0:0: '{{' : unbalanced braces ({opened} open, {closed} close)"));
        }
        Ok(())
    }

    /// Names declared with `keyword <type> <name>` at the start of a line
    fn declarations(source: &str, keyword: &str) -> Vec<String> {
        let mut names = Vec::new();
        for line in source.lines() {
            let mut words = line.trim_start().split_whitespace();
            if words.next() != Some(keyword) {
                continue;
            }
            let mut rest: Vec<&str> = words.collect();
            // Skip precision qualifiers: `uniform highp float x;`
            rest.retain(|w| !matches!(*w, "highp" | "mediump" | "lowp"));
            if let Some(raw) = rest.get(1) {
                let name = raw.trim_end_matches(';');
                let name = name.split('[').next().unwrap_or(name);
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], _usage: Usage) -> BackendResult<BufferId> {
        self.ensure_context()?;
        let id = BufferId(self.allocate());
        self.buffers.insert(id, data.to_vec());
        self.commands.push(DeviceCommand::CreateBuffer {
            id,
            target,
            bytes: data.len(),
        });
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> BackendResult<()> {
        self.ensure_context()?;
        let storage = self.buffers.get_mut(&buffer).ok_or(BackendError::InvalidHandle {
            kind: "buffer",
            id: buffer.0,
        })?;
        let end = offset + data.len();
        if end > storage.len() {
            return Err(BackendError::OutOfMemory(format!(
                "write of {end} bytes into buffer of {}",
                storage.len()
            )));
        }
        storage[offset..end].copy_from_slice(data);
        self.commands.push(DeviceCommand::UpdateBuffer {
            id: buffer,
            offset,
            bytes: data.len(),
        });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            self.commands.push(DeviceCommand::DeleteBuffer(buffer));
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor, data: Option<&[u8]>) -> BackendResult<TextureId> {
        self.ensure_context()?;
        if let Some(texels) = data {
            let expected = desc.width as usize * desc.height as usize * 4;
            if texels.len() != expected {
                return Err(BackendError::Unsupported(format!(
                    "texel data of {} bytes for {}x{} RGBA8",
                    texels.len(),
                    desc.width,
                    desc.height
                )));
            }
        }
        let id = TextureId(self.allocate());
        self.textures.insert(id, (desc.width, desc.height));
        self.commands.push(DeviceCommand::CreateTexture {
            id,
            width: desc.width,
            height: desc.height,
        });
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            self.commands.push(DeviceCommand::DeleteTexture(texture));
        }
    }

    fn create_framebuffer(&mut self, color: TextureId, _depth: bool, _stencil: bool) -> BackendResult<FramebufferId> {
        self.ensure_context()?;
        if !self.textures.contains_key(&color) {
            return Err(BackendError::InvalidHandle {
                kind: "texture",
                id: color.0,
            });
        }
        let id = FramebufferId(self.allocate());
        self.framebuffers.insert(id);
        self.commands.push(DeviceCommand::CreateFramebuffer(id));
        Ok(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer) {
            self.commands.push(DeviceCommand::DeleteFramebuffer(framebuffer));
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.commands.push(DeviceCommand::BindFramebuffer(framebuffer));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if self.context_lost {
            return Err("context lost".to_string());
        }
        let result = Self::validate(stage, source);
        self.commands.push(DeviceCommand::CompileShader {
            stage,
            ok: result.is_ok(),
        });
        result?;
        let id = ShaderId(self.allocate());
        self.shaders.insert(id, (stage, source.to_string()));
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<LinkedProgram, String> {
        if self.context_lost {
            return Err("context lost".to_string());
        }
        let result = match (self.shaders.get(&vertex), self.shaders.get(&fragment)) {
            (Some((ShaderStage::Vertex, vs)), Some((ShaderStage::Fragment, fs))) => {
                if vs.contains("gl_Position") {
                    let mut uniforms = Self::declarations(vs, "uniform");
                    for name in Self::declarations(fs, "uniform") {
                        if !uniforms.contains(&name) {
                            uniforms.push(name);
                        }
                    }
                    Ok((uniforms, Self::declarations(vs, "in")))
                } else {
                    Err("error: vertex shader does not write gl_Position".to_string())
                }
            }
            _ => Err("error: link requires one vertex and one fragment shader".to_string()),
        };
        self.commands.push(DeviceCommand::LinkProgram { ok: result.is_ok() });
        let (uniforms, attributes) = result?;
        let program = ProgramId(self.allocate());
        self.programs.insert(program);
        Ok(LinkedProgram {
            program,
            uniforms,
            attributes,
            log: String::new(),
        })
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program) {
            self.commands.push(DeviceCommand::DeleteProgram(program));
        }
    }

    fn apply_state(&mut self, change: &StateChange) {
        self.commands.push(DeviceCommand::State(change.clone()));
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool, stencil: bool) {
        self.commands.push(DeviceCommand::Clear { color, depth, stencil });
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue) {
        self.commands.push(DeviceCommand::Uniform {
            program,
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.commands.push(DeviceCommand::BindTexture { unit, texture });
    }

    fn bind_vertex_buffer(&mut self, binding: VertexBinding) {
        self.commands.push(DeviceCommand::BindVertexBuffer(binding));
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.commands.push(DeviceCommand::BindIndexBuffer(buffer));
    }

    fn draw(&mut self, call: &DrawCall) {
        if !self.context_lost {
            self.commands.push(DeviceCommand::Draw(*call));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "uniform mat4 modelViewMatrix;\nin vec3 position;\nin vec2 uv;\nvoid main() { gl_Position = vec4(position, 1.0); }";
    const FS: &str = "uniform vec3 diffuse;\nuniform highp float opacity;\nvoid main() { }";

    #[test]
    fn test_compile_validation() {
        let mut device = HeadlessDevice::new();
        assert!(device.compile_shader(ShaderStage::Vertex, VS).is_ok());
        let log = device
            .compile_shader(ShaderStage::Fragment, "void main() {\n#error broken\n}")
            .unwrap_err();
        assert!(log.contains("broken"));
        assert!(device.compile_shader(ShaderStage::Fragment, "float x;").is_err());
    }

    #[test]
    fn test_link_reflects_declarations() {
        let mut device = HeadlessDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FS).unwrap();
        let linked = device.link_program(vs, fs).unwrap();
        assert_eq!(linked.attributes, vec!["position".to_string(), "uv".to_string()]);
        assert_eq!(linked.uniforms, vec!["modelViewMatrix", "diffuse", "opacity"]);
        assert_eq!(device.program_count(), 1);
    }

    #[test]
    fn test_link_requires_position_write() {
        let mut device = HeadlessDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, "void main() { }").unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FS).unwrap();
        assert!(device.link_program(vs, fs).unwrap_err().contains("gl_Position"));
    }

    #[test]
    fn test_buffer_update_bounds() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer(BufferTarget::Vertex, &[0; 8], Usage::Static).unwrap();
        device.update_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_data(buffer), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
        assert!(device.update_buffer(buffer, 6, &[0; 4]).is_err());
    }

    #[test]
    fn test_context_loss_drops_objects() {
        let mut device = HeadlessDevice::new();
        device.create_buffer(BufferTarget::Index, &[0; 4], Usage::Static).unwrap();
        device.simulate_context_loss();
        assert!(device.is_context_lost());
        assert_eq!(device.buffer_count(), 0);
        assert_eq!(
            device.create_buffer(BufferTarget::Vertex, &[], Usage::Static),
            Err(BackendError::ContextLost)
        );
        device.restore_context();
        assert!(device.create_buffer(BufferTarget::Vertex, &[], Usage::Static).is_ok());
    }
}
