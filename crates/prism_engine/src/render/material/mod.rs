//! Material system for the rendering engine
//!
//! A [`Material`] pairs a closed set of shading models ([`MaterialKind`])
//! with common fixed-function state (blending, depth, stencil, culling).
//!
//! # Material Types
//!
//! - **Basic**: Unlit color and texture
//! - **Lambert / Phong**: Classic diffuse and specular lighting
//! - **Standard / Physical**: Metallic-roughness PBR, physical adds
//!   clearcoat, sheen and transmission
//! - **Shader**: User-provided GLSL with `#include <chunk>` support
//!
//! Shared capabilities are traits in [`params`] so code can work with any
//! kind that has, say, a base color or an emissive term.

#[allow(clippy::module_inception)]
pub mod material;
pub mod params;
pub mod patch;
pub mod state;

pub use material::{Material, MaterialKind};
pub use params::{
    BasicParams, HasColor, HasEmissive, HasEnvMap, HasMap, HasNormalMap, LambertParams, Lit, PhongParams,
    PhysicalParams, ShaderParams, StandardParams, TextureSlot,
};
pub use patch::MaterialPatch;
pub use state::{
    BlendEquation, BlendFactor, BlendFunction, Blending, CompareFunction, PolygonOffset, Side, StencilOp,
    StencilState,
};
