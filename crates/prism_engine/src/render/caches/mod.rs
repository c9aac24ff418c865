//! Renderer-side device object caches
//!
//! CPU resources carry an identity and a version counter. Each cache maps
//! identity to the device object and the version it was last uploaded at,
//! so uploads happen only after the host bumps the version.

pub mod buffers;
pub mod materials;
pub mod textures;

pub use buffers::BufferCache;
pub use materials::{MaterialCache, MaterialSignature};
pub use textures::TextureCache;
