//! Device abstraction for the rendering system
//!
//! [`GraphicsDevice`] is the seam between the renderer and a GPU API. It
//! exposes buffers, textures, framebuffers, shader compilation and a small set
//! of pipeline-state changes. The renderer diffs state before calling
//! [`GraphicsDevice::apply_state`], so implementations can forward every call
//! directly to the driver.
//!
//! [`headless::HeadlessDevice`] records every call and validates shader
//! sources; it backs the tests and the demo.

pub mod headless;

pub use headless::{DeviceCommand, HeadlessDevice};

use thiserror::Error;

use crate::foundation::math::ColorSpace;
use crate::geometry::{ComponentType, Usage};
use crate::render::material::{BlendFunction, CompareFunction, PolygonOffset, StencilState};
use crate::render::uniforms::UniformValue;

/// Device failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The context was lost; every handle is invalid
    #[error("Graphics context lost")]
    ContextLost,

    /// A handle did not refer to a live device object
    #[error("Invalid {kind} handle {id}")]
    InvalidHandle {
        /// Object kind
        kind: &'static str,
        /// Raw handle value
        id: u32,
    },

    /// Allocation failed
    #[error("Out of device memory: {0}")]
    OutOfMemory(String),

    /// The device cannot perform the request
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type for device operations
pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

device_handle!(
    /// Device vertex or index buffer
    BufferId
);
device_handle!(
    /// Device texture
    TextureId
);
device_handle!(
    /// Device framebuffer
    FramebufferId
);
device_handle!(
    /// Compiled shader stage
    ShaderId
);
device_handle!(
    /// Linked program
    ProgramId
);

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attributes
    Vertex,
    /// Element indices
    Index,
}

/// Programmable stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl ShaderStage {
    /// Lower-case stage name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Texture allocation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texels are depth values
    pub depth: bool,
    /// Decode texels as sRGB when sampling
    pub color_space: ColorSpace,
    /// Build a mip chain after upload
    pub generate_mipmaps: bool,
    /// Repeat addressing (clamp otherwise)
    pub repeat: bool,
    /// Linear filtering (nearest otherwise)
    pub linear_filter: bool,
}

/// Reflection data returned by a successful link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProgram {
    /// Device program
    pub program: ProgramId,
    /// Active uniform names
    pub uniforms: Vec<String>,
    /// Active attribute names in location order
    pub attributes: Vec<String>,
    /// Link log (warnings on success)
    pub log: String,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    /// Cull back faces
    Back,
    /// Cull front faces
    Front,
}

/// Pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Rectangle from origin and size
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// One pipeline-state change
///
/// The renderer tracks the last value of each variant and only issues
/// changes; see [`StateTracker`](crate::render::state::StateTracker).
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Bound program
    Program(ProgramId),
    /// Blend function; `None` disables blending
    Blend(Option<BlendFunction>),
    /// Depth test enable
    DepthTest(bool),
    /// Depth write enable
    DepthWrite(bool),
    /// Depth comparison
    DepthFunc(CompareFunction),
    /// Culled faces; `None` disables culling
    Cull(Option<CullFace>),
    /// Clockwise winding is front-facing
    FrontFaceClockwise(bool),
    /// Color buffer writes
    ColorMask(bool),
    /// Depth offset; `None` disables it
    PolygonOffset(Option<PolygonOffset>),
    /// Stencil test; `None` disables it
    Stencil(Option<StencilState>),
    /// Scissor rectangle; `None` disables the scissor test
    Scissor(Option<Viewport>),
    /// Viewport rectangle
    Viewport(Viewport),
}

impl StateChange {
    /// Number of distinct state slots
    pub const SLOTS: usize = 12;

    /// Slot this change overwrites
    pub const fn slot(&self) -> usize {
        match self {
            Self::Program(_) => 0,
            Self::Blend(_) => 1,
            Self::DepthTest(_) => 2,
            Self::DepthWrite(_) => 3,
            Self::DepthFunc(_) => 4,
            Self::Cull(_) => 5,
            Self::FrontFaceClockwise(_) => 6,
            Self::ColorMask(_) => 7,
            Self::PolygonOffset(_) => 8,
            Self::Stencil(_) => 9,
            Self::Scissor(_) => 10,
            Self::Viewport(_) => 11,
        }
    }
}

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Independent triangles
    Triangles,
    /// Independent line segments
    Lines,
    /// Connected line strip
    LineStrip,
    /// Closed line loop
    LineLoop,
    /// Points
    Points,
}

/// A vertex attribute binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    /// Attribute location
    pub location: u32,
    /// Source buffer
    pub buffer: BufferId,
    /// Components per vertex
    pub item_size: usize,
    /// Component type
    pub component_type: ComponentType,
    /// Integer data is normalized when read
    pub normalized: bool,
    /// Instances per element; zero for per-vertex data
    pub divisor: u32,
}

/// A draw submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Assembly mode
    pub primitive: Primitive,
    /// First element
    pub start: usize,
    /// Element count
    pub count: usize,
    /// Index component type; `None` for non-indexed draws
    pub index_type: Option<ComponentType>,
    /// Instance count; one for plain draws
    pub instances: usize,
}

/// Low-level GPU interface used by the renderer
pub trait GraphicsDevice {
    /// Device name for logs
    fn name(&self) -> &str;

    /// True once the context is lost and until it is restored
    fn is_context_lost(&self) -> bool;

    /// Create a buffer initialized with `data`
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], usage: Usage) -> BackendResult<BufferId>;

    /// Overwrite part of a buffer starting at `offset` bytes
    fn update_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> BackendResult<()>;

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Allocate a texture and upload optional RGBA8 texels
    fn create_texture(&mut self, desc: &TextureDescriptor, data: Option<&[u8]>) -> BackendResult<TextureId>;

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureId);

    /// Create a framebuffer around a color texture
    fn create_framebuffer(&mut self, color: TextureId, depth: bool, stencil: bool) -> BackendResult<FramebufferId>;

    /// Release a framebuffer (not its attachments)
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Route draws to a framebuffer; `None` targets the default surface
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Compile one stage; `Err` carries the compile log
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    /// Release a compiled stage
    fn delete_shader(&mut self, shader: ShaderId);

    /// Link stages into a program; `Err` carries the link log
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<LinkedProgram, String>;

    /// Release a program
    fn delete_program(&mut self, program: ProgramId);

    /// Apply one pipeline-state change
    fn apply_state(&mut self, change: &StateChange);

    /// Clear the bound framebuffer
    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool, stencil: bool);

    /// Set a uniform on the bound program
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue);

    /// Bind a texture to a sampler unit
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Bind a vertex attribute
    fn bind_vertex_buffer(&mut self, binding: VertexBinding);

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: BufferId);

    /// Submit a draw
    fn draw(&mut self, call: &DrawCall);
}
