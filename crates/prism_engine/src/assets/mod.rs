//! Asset management system
//!
//! [`Assets`] owns every shareable resource: geometries, materials, textures
//! and render targets. Scene nodes refer to them through typed slotmap
//! handles, so one geometry or material can back many meshes.
//!
//! Disposal is explicit. `dispose_*` keeps the CPU object but queues a
//! [`ResourceEvent::Disposed`] so the renderer releases device storage at the
//! start of the next frame; `remove_*` disposes and drops the CPU object.

pub mod texture;

pub use texture::{Filter, Image, RenderTarget, Texture, TextureFormat, TextureSource, Wrapping};

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::events::{EventHandler, EventSystem, EventType, ResourceEvent};
use crate::foundation::ids::next_material_id;
use crate::geometry::Geometry;
use crate::render::material::Material;

new_key_type! {
    /// Handle to a [`Geometry`] in [`Assets`]
    pub struct GeometryHandle;
    /// Handle to a [`Material`] in [`Assets`]
    pub struct MaterialHandle;
    /// Handle to a [`Texture`] in [`Assets`]
    pub struct TextureHandle;
    /// Handle to a [`RenderTarget`] in [`Assets`]
    pub struct RenderTargetHandle;
}

/// Any asset handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Geometry
    Geometry(GeometryHandle),
    /// Material
    Material(MaterialHandle),
    /// Texture
    Texture(TextureHandle),
    /// Render target
    RenderTarget(RenderTargetHandle),
}

/// Asset lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Handle does not refer to a live asset
    #[error("Asset not found: {0:?}")]
    NotFound(ResourceKey),
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

macro_rules! asset_accessors {
    ($field:ident, $ty:ty, $handle:ty, $key:ident, $add:ident, $get:ident, $get_mut:ident, $dispose:ident, $remove:ident) => {
        /// Insert an asset and return its handle
        pub fn $add(&mut self, asset: $ty) -> $handle {
            self.$field.insert(asset)
        }

        /// Look up an asset
        pub fn $get(&self, handle: $handle) -> Option<&$ty> {
            self.$field.get(handle)
        }

        /// Look up an asset for modification
        pub fn $get_mut(&mut self, handle: $handle) -> Option<&mut $ty> {
            self.$field.get_mut(handle)
        }

        /// Release device storage at the next frame; the CPU object stays
        pub fn $dispose(&mut self, handle: $handle) -> AssetResult<()> {
            if !self.$field.contains_key(handle) {
                return Err(AssetError::NotFound(ResourceKey::$key(handle)));
            }
            self.queue_disposal(ResourceKey::$key(handle));
            Ok(())
        }

        /// Dispose and drop the CPU object
        pub fn $remove(&mut self, handle: $handle) -> AssetResult<$ty> {
            let asset = self
                .$field
                .remove(handle)
                .ok_or(AssetError::NotFound(ResourceKey::$key(handle)))?;
            self.queue_disposal(ResourceKey::$key(handle));
            Ok(asset)
        }
    };
}

/// Store for every shareable rendering resource
#[derive(Debug, Default)]
pub struct Assets {
    geometries: SlotMap<GeometryHandle, Geometry>,
    materials: SlotMap<MaterialHandle, Material>,
    textures: SlotMap<TextureHandle, Texture>,
    render_targets: SlotMap<RenderTargetHandle, RenderTarget>,
    disposed: Vec<ResourceKey>,
    events: EventSystem,
}

impl Assets {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    asset_accessors!(
        geometries,
        Geometry,
        GeometryHandle,
        Geometry,
        add_geometry,
        geometry,
        geometry_mut,
        dispose_geometry,
        remove_geometry
    );

    asset_accessors!(
        textures,
        Texture,
        TextureHandle,
        Texture,
        add_texture,
        texture,
        texture_mut,
        dispose_texture,
        remove_texture
    );

    /// Insert a material, assigning its numeric id
    pub fn add_material(&mut self, mut material: Material) -> MaterialHandle {
        material.id = next_material_id();
        self.materials.insert(material)
    }

    /// Look up a material
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    /// Look up a material for modification
    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    /// Release the material's programs at the next frame; the CPU object stays
    pub fn dispose_material(&mut self, handle: MaterialHandle) -> AssetResult<()> {
        if !self.materials.contains_key(handle) {
            return Err(AssetError::NotFound(ResourceKey::Material(handle)));
        }
        self.queue_disposal(ResourceKey::Material(handle));
        Ok(())
    }

    /// Dispose and drop the material
    pub fn remove_material(&mut self, handle: MaterialHandle) -> AssetResult<Material> {
        let material = self
            .materials
            .remove(handle)
            .ok_or(AssetError::NotFound(ResourceKey::Material(handle)))?;
        self.queue_disposal(ResourceKey::Material(handle));
        Ok(material)
    }

    /// Insert a render target and create its color texture
    pub fn add_render_target(&mut self, mut target: RenderTarget) -> RenderTargetHandle {
        let handle = self.render_targets.insert(target.clone());
        let texture = self.textures.insert(Texture::new_for_target(handle));
        target.texture = Some(texture);
        if let Some(stored) = self.render_targets.get_mut(handle) {
            *stored = target;
        }
        handle
    }

    /// Look up a render target
    pub fn render_target(&self, handle: RenderTargetHandle) -> Option<&RenderTarget> {
        self.render_targets.get(handle)
    }

    /// Look up a render target for modification
    pub fn render_target_mut(&mut self, handle: RenderTargetHandle) -> Option<&mut RenderTarget> {
        self.render_targets.get_mut(handle)
    }

    /// Release the target's device storage at the next frame
    pub fn dispose_render_target(&mut self, handle: RenderTargetHandle) -> AssetResult<()> {
        if !self.render_targets.contains_key(handle) {
            return Err(AssetError::NotFound(ResourceKey::RenderTarget(handle)));
        }
        self.queue_disposal(ResourceKey::RenderTarget(handle));
        Ok(())
    }

    /// Dispose and drop the render target and its color texture
    pub fn remove_render_target(&mut self, handle: RenderTargetHandle) -> AssetResult<RenderTarget> {
        let target = self
            .render_targets
            .remove(handle)
            .ok_or(AssetError::NotFound(ResourceKey::RenderTarget(handle)))?;
        self.queue_disposal(ResourceKey::RenderTarget(handle));
        if let Some(texture) = target.texture {
            self.textures.remove(texture);
            self.queue_disposal(ResourceKey::Texture(texture));
        }
        Ok(target)
    }

    /// Number of stored geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of stored materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of stored textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Register a handler for disposal notifications
    pub fn on_dispose(&mut self, handler: Box<dyn EventHandler>) {
        self.events.register_handler(EventType::Disposed, handler);
    }

    /// Event system carrying disposal notifications
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Drain the disposals queued since the last call
    pub fn take_disposed(&mut self) -> Vec<ResourceKey> {
        std::mem::take(&mut self.disposed)
    }

    /// Disposals waiting for the renderer
    pub fn pending_disposals(&self) -> usize {
        self.disposed.len()
    }

    fn queue_disposal(&mut self, key: ResourceKey) {
        log::debug!("Disposing {key:?}");
        self.disposed.push(key);
        self.events.send(ResourceEvent::Disposed(key));
        self.events.dispatch();
    }
}

impl Texture {
    fn new_for_target(target: RenderTargetHandle) -> Self {
        let mut texture = Self::empty();
        texture.source = TextureSource::RenderTarget(target);
        texture.generate_mipmaps = false;
        texture.flip_y = false;
        texture.min_filter = Filter::Linear;
        texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::foundation::math::Color;
    use crate::geometry::box_geometry;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_material_ids_unique() {
        let mut assets = Assets::new();
        let a = assets.add_material(Material::basic(Color::WHITE));
        let b = assets.add_material(Material::basic(Color::WHITE));
        let id_a = assets.material(a).map(Material::id);
        let id_b = assets.material(b).map(Material::id);
        assert!(id_a.is_some());
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn test_dispose_queues_and_notifies() {
        let mut assets = Assets::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        assets.on_dispose(Box::new(move |event: &Event| {
            sink.borrow_mut().push(*event);
            false
        }));

        let geometry = assets.add_geometry(box_geometry(1.0, 1.0, 1.0, 1, 1, 1));
        assets.dispose_geometry(geometry).unwrap();
        assert!(assets.geometry(geometry).is_some());
        assert_eq!(assets.take_disposed(), vec![ResourceKey::Geometry(geometry)]);
        assert_eq!(
            seen.borrow().as_slice(),
            &[Event::Resource(ResourceEvent::Disposed(ResourceKey::Geometry(geometry)))]
        );
        assert_eq!(assets.pending_disposals(), 0);
    }

    #[test]
    fn test_remove_drops_cpu_object() {
        let mut assets = Assets::new();
        let material = assets.add_material(Material::default());
        assert!(assets.remove_material(material).is_ok());
        assert!(assets.material(material).is_none());
        assert_eq!(
            assets.remove_material(material).unwrap_err(),
            AssetError::NotFound(ResourceKey::Material(material))
        );
    }

    #[test]
    fn test_render_target_owns_texture() {
        let mut assets = Assets::new();
        let target = assets.add_render_target(RenderTarget::new(32, 32));
        let texture = assets.render_target(target).and_then(|t| t.texture).unwrap();
        assert!(matches!(
            assets.texture(texture).map(|t| &t.source),
            Some(TextureSource::RenderTarget(h)) if *h == target
        ));
        assets.remove_render_target(target).unwrap();
        assert!(assets.texture(texture).is_none());
        assert_eq!(assets.take_disposed().len(), 2);
    }
}
