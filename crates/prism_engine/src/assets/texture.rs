//! Texture and render-target resources
//!
//! Textures are CPU descriptions; the renderer uploads them when their
//! `version` changes and releases device storage on disposal.

use crate::foundation::ids::TEXTURE_IDS;
use crate::foundation::math::{ColorSpace, Matrix3, Vector2};

use super::{RenderTargetHandle, TextureHandle};

/// Decoded pixel data ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Raw RGBA8 pixel data, rows top to bottom
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Image {
    /// Wrap RGBA8 pixels; `None` when the byte count does not match the size
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        (data.len() == expected).then_some(Self { data, width, height })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }
        Self { data, width, height }
    }
}

/// Where a texture's texels come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// No data yet; uploads as a 1×1 placeholder
    Empty,
    /// CPU image
    Image(Image),
    /// Color attachment of a render target
    RenderTarget(RenderTargetHandle),
}

/// Texel storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA
    #[default]
    Rgba8,
    /// 16-bit float RGBA
    Rgba16F,
    /// 32-bit float depth
    Depth32F,
}

/// Addressing outside `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrapping {
    /// Clamp to the edge texel
    #[default]
    ClampToEdge,
    /// Tile
    Repeat,
    /// Tile, mirroring every other repeat
    MirroredRepeat,
}

/// Texel filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    #[default]
    Linear,
    /// Trilinear across mip levels
    LinearMipmapLinear,
}

/// A sampled image resource
#[derive(Debug, Clone)]
pub struct Texture {
    id: u64,
    /// Optional name for debugging
    pub name: String,
    /// Texel source
    pub source: TextureSource,
    /// Storage format
    pub format: TextureFormat,
    /// Color space of the texels; `None` for data maps
    pub color_space: ColorSpace,
    /// Horizontal addressing
    pub wrap_s: Wrapping,
    /// Vertical addressing
    pub wrap_t: Wrapping,
    /// Magnification filter
    pub mag_filter: Filter,
    /// Minification filter
    pub min_filter: Filter,
    /// Generate mipmaps on upload
    pub generate_mipmaps: bool,
    /// Flip rows on upload
    pub flip_y: bool,
    /// UV offset
    pub offset: Vector2,
    /// UV repeat
    pub repeat: Vector2,
    /// UV rotation in radians around `center`
    pub rotation: f64,
    /// UV rotation center
    pub center: Vector2,
    version: u64,
}

impl Texture {
    /// Texture over a CPU image
    pub fn from_image(image: Image) -> Self {
        Self::new(TextureSource::Image(image))
    }

    /// Texture without data
    pub fn empty() -> Self {
        Self::new(TextureSource::Empty)
    }

    fn new(source: TextureSource) -> Self {
        // Fresh image data starts at version 1 so the first render uploads it.
        let version = u64::from(matches!(source, TextureSource::Image(_)));
        Self {
            id: TEXTURE_IDS.next_id(),
            name: String::new(),
            source,
            format: TextureFormat::Rgba8,
            color_space: ColorSpace::None,
            wrap_s: Wrapping::ClampToEdge,
            wrap_t: Wrapping::ClampToEdge,
            mag_filter: Filter::Linear,
            min_filter: Filter::LinearMipmapLinear,
            generate_mipmaps: true,
            flip_y: true,
            offset: Vector2::ZERO,
            repeat: Vector2::ONE,
            rotation: 0.0,
            center: Vector2::ZERO,
            version,
        }
    }

    /// Builder: color space
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    /// Builder: repeat wrapping on both axes
    pub fn with_repeat(mut self, x: f64, y: f64) -> Self {
        self.wrap_s = Wrapping::Repeat;
        self.wrap_t = Wrapping::Repeat;
        self.repeat = Vector2::new(x, y);
        self
    }

    /// Unique identity
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Content version; the renderer re-uploads when it changes
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Flag the texels or sampling parameters as changed
    pub fn needs_update(&mut self) {
        self.version += 1;
    }

    /// Replace the image and schedule an upload
    pub fn set_image(&mut self, image: Image) {
        self.source = TextureSource::Image(image);
        self.needs_update();
    }

    /// Pixel size, when known from the source
    pub fn size(&self) -> Option<(u32, u32)> {
        match &self.source {
            TextureSource::Image(image) => Some((image.width, image.height)),
            TextureSource::Empty | TextureSource::RenderTarget(_) => None,
        }
    }

    /// UV transform from offset, repeat, rotation and center
    pub fn uv_matrix(&self) -> Matrix3 {
        Matrix3::uv_transform(
            self.offset.x,
            self.offset.y,
            self.repeat.x,
            self.repeat.y,
            self.rotation,
            self.center.x,
            self.center.y,
        )
    }
}

/// An offscreen color (and optional depth) surface
#[derive(Debug, Clone)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    /// Allocate a depth attachment
    pub depth_buffer: bool,
    /// Allocate a stencil attachment
    pub stencil_buffer: bool,
    /// MSAA sample count; zero disables multisampling
    pub samples: u32,
    /// Color attachment, sampled like any other texture
    pub texture: Option<TextureHandle>,
    version: u64,
}

impl RenderTarget {
    /// Create a target with a depth buffer
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_buffer: true,
            stencil_buffer: false,
            samples: 0,
            texture: None,
            version: 1,
        }
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Storage version; bumps on resize
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Resize; device storage is reallocated on next use
    pub fn set_size(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.version += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_validation() {
        assert!(Image::from_rgba8(2, 2, vec![0; 16]).is_some());
        assert!(Image::from_rgba8(2, 2, vec![0; 15]).is_none());
        assert_eq!(Image::solid_color(3, 1, [1, 2, 3, 4]).data.len(), 12);
    }

    #[test]
    fn test_texture_versions() {
        let mut texture = Texture::from_image(Image::solid_color(1, 1, [255; 4]));
        assert_eq!(texture.version(), 1);
        texture.set_image(Image::solid_color(2, 2, [0; 4]));
        assert_eq!(texture.version(), 2);
        assert_eq!(texture.size(), Some((2, 2)));
        assert_eq!(Texture::empty().version(), 0);
        assert_ne!(Texture::empty().id(), Texture::empty().id());
    }

    #[test]
    fn test_render_target_resize() {
        let mut target = RenderTarget::new(64, 64);
        target.set_size(64, 64);
        assert_eq!(target.version(), 1);
        target.set_size(128, 64);
        assert_eq!(target.version(), 2);
        assert_eq!(target.width(), 128);
    }
}
