//! Vertex and index buffers keyed by attribute identity

use std::collections::{HashMap, HashSet};

use crate::assets::GeometryHandle;
use crate::geometry::BufferAttribute;
use crate::render::backend::{BackendResult, BufferId, BufferTarget, GraphicsDevice};

#[derive(Debug, Clone, Copy)]
struct BufferEntry {
    buffer: BufferId,
    version: u64,
    byte_length: usize,
}

/// Device buffers for attribute data
#[derive(Debug, Default)]
pub struct BufferCache {
    entries: HashMap<u64, BufferEntry>,
    geometries: HashMap<GeometryHandle, HashSet<u64>>,
    uploads: u64,
}

impl BufferCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Device buffer holding the current contents of `attribute`
    ///
    /// A version bump re-uploads in place when the byte size is unchanged
    /// (only the pending update ranges, if any) and reallocates otherwise.
    pub fn upload<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        attribute: &mut BufferAttribute,
        target: BufferTarget,
    ) -> BackendResult<BufferId> {
        let id = attribute.id();
        let version = attribute.version();
        let byte_length = attribute.byte_length();

        if let Some(entry) = self.entries.get_mut(&id) {
            if entry.version == version {
                return Ok(entry.buffer);
            }
            if entry.byte_length == byte_length {
                let bytes = attribute.as_bytes();
                let item_bytes = attribute.component_type().byte_size();
                let ranges = attribute.update_ranges();
                if ranges.is_empty() {
                    device.update_buffer(entry.buffer, 0, bytes)?;
                } else {
                    for range in ranges {
                        let start = (range.start * item_bytes).min(bytes.len());
                        let end = ((range.start + range.count) * item_bytes).min(bytes.len());
                        device.update_buffer(entry.buffer, start, &bytes[start..end])?;
                    }
                }
                entry.version = version;
                self.uploads += 1;
                attribute.clear_update_ranges();
                log::trace!("Updated buffer {:?} for attribute {id} (v{version})", entry.buffer);
                return Ok(entry.buffer);
            }
            log::debug!("Attribute {id} resized to {byte_length} bytes, reallocating");
            device.delete_buffer(entry.buffer);
        }

        let buffer = device.create_buffer(target, attribute.as_bytes(), attribute.usage)?;
        self.entries.insert(
            id,
            BufferEntry {
                buffer,
                version,
                byte_length,
            },
        );
        self.uploads += 1;
        attribute.clear_update_ranges();
        Ok(buffer)
    }

    /// Record that `attribute_id` belongs to `geometry` for later release
    pub fn track(&mut self, geometry: GeometryHandle, attribute_id: u64) {
        self.geometries.entry(geometry).or_default().insert(attribute_id);
    }

    /// Buffer for an attribute, if uploaded
    pub fn get(&self, attribute_id: u64) -> Option<BufferId> {
        self.entries.get(&attribute_id).map(|e| e.buffer)
    }

    /// Release one attribute's buffer
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, attribute_id: u64) -> bool {
        self.entries.remove(&attribute_id).is_some_and(|entry| {
            device.delete_buffer(entry.buffer);
            true
        })
    }

    /// Release every buffer uploaded for `geometry`; returns how many
    pub fn release_geometry<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, geometry: GeometryHandle) -> usize {
        self.geometries
            .remove(&geometry)
            .map_or(0, |ids| ids.into_iter().filter(|id| self.release(device, *id)).count())
    }

    /// Geometries with at least one uploaded buffer
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Live buffers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no buffer is live
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uploads performed (creates and updates)
    pub const fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Release every buffer
    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for (_, entry) in self.entries.drain() {
            device.delete_buffer(entry.buffer);
        }
        self.geometries.clear();
    }

    /// Drop every entry without touching the device
    pub fn forget_all(&mut self) {
        self.entries.clear();
        self.geometries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{DeviceCommand, HeadlessDevice};

    #[test]
    fn test_upload_only_after_version_bump() {
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let mut attribute = BufferAttribute::from_f32(vec![0.0; 9], 3);

        let first = cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        let again = cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        assert_eq!(first, again);
        assert_eq!(cache.uploads(), 1);

        attribute.set_x(0, 1.0).unwrap();
        attribute.needs_update();
        let updated = cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        assert_eq!(updated, first);
        assert_eq!(cache.uploads(), 2);
        assert_eq!(device.buffer_data(first).map(|b| b.len()), Some(36));
    }

    #[test]
    fn test_update_ranges_upload_partially() {
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let mut attribute = BufferAttribute::from_f32(vec![0.0; 12], 3);
        cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        device.clear_commands();

        attribute.add_update_range(3, 3);
        attribute.needs_update();
        cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        assert!(device
            .commands()
            .iter()
            .any(|c| matches!(c, DeviceCommand::UpdateBuffer { offset: 12, bytes: 12, .. })));
        assert!(attribute.update_ranges().is_empty());
    }

    #[test]
    fn test_resize_reallocates() {
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let mut attribute = BufferAttribute::from_f32(vec![0.0; 3], 3);
        let first = cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        attribute.set_array(crate::geometry::AttributeArray::F32(vec![0.0; 6]));
        let second = cache.upload(&mut device, &mut attribute, BufferTarget::Vertex).unwrap();
        assert_ne!(first, second);
        assert_eq!(device.buffer_count(), 1);
    }

    #[test]
    fn test_release_geometry() {
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let mut geometries: slotmap::SlotMap<GeometryHandle, ()> = slotmap::SlotMap::with_key();
        let handle = geometries.insert(());
        let mut position = BufferAttribute::from_f32(vec![0.0; 9], 3);
        let mut normal = BufferAttribute::from_f32(vec![0.0; 9], 3);
        cache.upload(&mut device, &mut position, BufferTarget::Vertex).unwrap();
        cache.upload(&mut device, &mut normal, BufferTarget::Vertex).unwrap();
        cache.track(handle, position.id());
        cache.track(handle, normal.id());
        assert_eq!(cache.geometry_count(), 1);
        assert_eq!(cache.release_geometry(&mut device, handle), 2);
        assert_eq!(device.buffer_count(), 0);
        assert!(cache.is_empty());
    }
}
