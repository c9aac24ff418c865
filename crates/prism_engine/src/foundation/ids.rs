//! Process-wide identity counters
//!
//! Attributes, geometries, textures and materials carry a numeric id that is
//! unique for the lifetime of the process. Caches key device objects on these
//! ids together with content versions.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Monotonic 64-bit id source
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a generator whose first id is `1`
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Ids for [`crate::geometry::BufferAttribute`]
pub static ATTRIBUTE_IDS: IdGenerator = IdGenerator::new();

/// Ids for [`crate::geometry::Geometry`]
pub static GEOMETRY_IDS: IdGenerator = IdGenerator::new();

/// Ids for [`crate::assets::Texture`]
pub static TEXTURE_IDS: IdGenerator = IdGenerator::new();

static MATERIAL_IDS: AtomicU32 = AtomicU32::new(0);

/// Next material id; materials are numbered from zero in creation order
pub fn next_material_id() -> u32 {
    MATERIAL_IDS.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a, 1);
        assert!(b > a);
        assert!(next_material_id() < next_material_id());
    }
}
