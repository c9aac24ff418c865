//! Device textures and render-target framebuffers

use std::collections::HashMap;

use crate::assets::{
    Assets, Filter, RenderTarget, RenderTargetHandle, Texture, TextureFormat, TextureHandle, TextureSource, Wrapping,
};
use crate::foundation::math::ColorSpace;
use crate::render::backend::{BackendResult, FramebufferId, GraphicsDevice, TextureDescriptor, TextureId};

#[derive(Debug, Clone, Copy)]
struct TextureEntry {
    texture: TextureId,
    version: u64,
}

#[derive(Debug, Clone, Copy)]
struct TargetEntry {
    framebuffer: FramebufferId,
    color: TextureId,
    version: u64,
}

/// Build the allocation descriptor for a texture of the given size
pub fn descriptor(texture: &Texture, width: u32, height: u32) -> TextureDescriptor {
    TextureDescriptor {
        width,
        height,
        depth: texture.format == TextureFormat::Depth32F,
        color_space: texture.color_space,
        generate_mipmaps: texture.generate_mipmaps,
        repeat: texture.wrap_s != Wrapping::ClampToEdge || texture.wrap_t != Wrapping::ClampToEdge,
        linear_filter: texture.mag_filter != Filter::Nearest,
    }
}

/// Uploaded textures and render-target attachments
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<TextureHandle, TextureEntry>,
    targets: HashMap<RenderTargetHandle, TargetEntry>,
    uploads: u64,
}

impl TextureCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Device texture to sample for `handle`, uploading when stale
    ///
    /// Returns `None` for textures without data yet. A texture backed by a
    /// render target resolves to that target's color attachment.
    pub fn resolve<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        assets: &Assets,
        handle: TextureHandle,
    ) -> BackendResult<Option<TextureId>> {
        let Some(texture) = assets.texture(handle) else {
            return Ok(None);
        };
        match &texture.source {
            TextureSource::Empty => Ok(None),
            TextureSource::RenderTarget(target_handle) => {
                let Some(target) = assets.render_target(*target_handle) else {
                    return Ok(None);
                };
                self.ensure_target(device, *target_handle, target)?;
                Ok(self.targets.get(target_handle).map(|e| e.color))
            }
            TextureSource::Image(image) => {
                if let Some(entry) = self.textures.get(&handle) {
                    if entry.version == texture.version() {
                        return Ok(Some(entry.texture));
                    }
                    device.delete_texture(entry.texture);
                }
                let desc = descriptor(texture, image.width, image.height);
                let id = device.create_texture(&desc, Some(&image.data))?;
                log::debug!(
                    "Uploaded texture '{}' {}x{} (v{})",
                    texture.name,
                    image.width,
                    image.height,
                    texture.version()
                );
                self.textures.insert(
                    handle,
                    TextureEntry {
                        texture: id,
                        version: texture.version(),
                    },
                );
                self.uploads += 1;
                Ok(Some(id))
            }
        }
    }

    /// Framebuffer for a render target, reallocated after a resize
    pub fn ensure_target<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        handle: RenderTargetHandle,
        target: &RenderTarget,
    ) -> BackendResult<FramebufferId> {
        if let Some(entry) = self.targets.get(&handle) {
            if entry.version == target.version() {
                return Ok(entry.framebuffer);
            }
            device.delete_framebuffer(entry.framebuffer);
            device.delete_texture(entry.color);
        }
        let desc = TextureDescriptor {
            width: target.width(),
            height: target.height(),
            depth: false,
            color_space: ColorSpace::LinearSrgb,
            generate_mipmaps: false,
            repeat: false,
            linear_filter: true,
        };
        let color = device.create_texture(&desc, None)?;
        let framebuffer = device.create_framebuffer(color, target.depth_buffer, target.stencil_buffer)?;
        log::debug!("Allocated render target {}x{}", target.width(), target.height());
        self.targets.insert(
            handle,
            TargetEntry {
                framebuffer,
                color,
                version: target.version(),
            },
        );
        Ok(framebuffer)
    }

    /// Release a texture's device storage
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, handle: TextureHandle) -> bool {
        self.textures.remove(&handle).is_some_and(|entry| {
            device.delete_texture(entry.texture);
            true
        })
    }

    /// Release a render target's framebuffer and color attachment
    pub fn release_target<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, handle: RenderTargetHandle) -> bool {
        self.targets.remove(&handle).is_some_and(|entry| {
            device.delete_framebuffer(entry.framebuffer);
            device.delete_texture(entry.color);
            true
        })
    }

    /// Textures with device storage, attachments included
    pub fn count(&self) -> usize {
        self.textures.len() + self.targets.len()
    }

    /// Image uploads performed
    pub const fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Release everything
    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for (_, entry) in self.textures.drain() {
            device.delete_texture(entry.texture);
        }
        for (_, entry) in self.targets.drain() {
            device.delete_framebuffer(entry.framebuffer);
            device.delete_texture(entry.color);
        }
    }

    /// Drop every entry without touching the device
    pub fn forget_all(&mut self) {
        self.textures.clear();
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Image;
    use crate::render::backend::HeadlessDevice;

    #[test]
    fn test_upload_once_per_version() {
        let mut device = HeadlessDevice::new();
        let mut assets = Assets::new();
        let handle = assets.add_texture(Texture::from_image(Image::solid_color(2, 2, [255; 4])));
        let mut cache = TextureCache::new();

        let first = cache.resolve(&mut device, &assets, handle).unwrap();
        let second = cache.resolve(&mut device, &assets, handle).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(cache.uploads(), 1);

        if let Some(texture) = assets.texture_mut(handle) {
            texture.set_image(Image::solid_color(4, 4, [0; 4]));
        }
        let third = cache.resolve(&mut device, &assets, handle).unwrap();
        assert_ne!(first, third);
        assert_eq!(cache.uploads(), 2);
        assert_eq!(device.texture_count(), 1);
    }

    #[test]
    fn test_empty_texture_resolves_to_none() {
        let mut device = HeadlessDevice::new();
        let mut assets = Assets::new();
        let handle = assets.add_texture(Texture::empty());
        let mut cache = TextureCache::new();
        assert_eq!(cache.resolve(&mut device, &assets, handle).unwrap(), None);
        assert_eq!(device.texture_count(), 0);
    }

    #[test]
    fn test_render_target_texture_and_resize() {
        let mut device = HeadlessDevice::new();
        let mut assets = Assets::new();
        let target = assets.add_render_target(RenderTarget::new(32, 32));
        let color = assets.render_target(target).and_then(|t| t.texture).unwrap();
        let mut cache = TextureCache::new();

        let sampled = cache.resolve(&mut device, &assets, color).unwrap();
        assert!(sampled.is_some());
        assert_eq!(device.framebuffer_count(), 1);

        if let Some(rt) = assets.render_target_mut(target) {
            rt.set_size(64, 64);
        }
        let rt = assets.render_target(target).cloned().unwrap();
        cache.ensure_target(&mut device, target, &rt).unwrap();
        assert_eq!(device.framebuffer_count(), 1);
        assert_eq!(device.texture_count(), 1);

        assert!(cache.release_target(&mut device, target));
        assert_eq!(device.framebuffer_count(), 0);
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn test_descriptor_follows_sampling_fields() {
        let texture = Texture::from_image(Image::solid_color(1, 1, [0; 4]))
            .with_color_space(ColorSpace::Srgb)
            .with_repeat(2.0, 2.0);
        let desc = descriptor(&texture, 1, 1);
        assert!(desc.repeat);
        assert!(desc.linear_filter);
        assert_eq!(desc.color_space, ColorSpace::Srgb);
    }
}
