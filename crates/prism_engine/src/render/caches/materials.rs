//! Per-material program bookkeeping
//!
//! A material can be drawn by objects with different traits (instanced,
//! skinned, shadow-receiving) and therefore use several programs. Each
//! distinct [`MaterialSignature`] is resolved to a program key once; the
//! material holds one program-cache reference per distinct key until its
//! version changes or it is disposed.

use std::collections::{HashMap, HashSet};

use crate::assets::MaterialHandle;
use crate::render::backend::GraphicsDevice;
use crate::render::lights::LightCounts;
use crate::render::shader::{FogMode, ObjectTraits, ProgramCache, ProgramParameters, ProgramSettings, ShaderResult};

/// Inputs that decide which program a material needs for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialSignature {
    /// Material program-shape version
    pub version: u64,
    /// Object features
    pub object: ObjectTraits,
    /// Scene light counts
    pub lights: LightCounts,
    /// Clipping plane and intersection counts
    pub clipping: (usize, usize),
    /// Scene fog mode
    pub fog: Option<FogMode>,
    /// Renderer output settings
    pub settings: ProgramSettings,
}

#[derive(Debug, Default)]
struct MaterialEntry {
    version: u64,
    variants: HashMap<MaterialSignature, String>,
    acquired: HashSet<String>,
}

/// Program references held on behalf of each material
#[derive(Debug, Default)]
pub struct MaterialCache {
    entries: HashMap<MaterialHandle, MaterialEntry>,
}

impl MaterialCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Program key for `material` drawn under `signature`
    ///
    /// Parameters are gathered (via `gather`) only when this signature has
    /// not been seen for the material. A version change releases every
    /// program the material held.
    pub fn program_key<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        programs: &mut ProgramCache,
        material: MaterialHandle,
        signature: MaterialSignature,
        gather: impl FnOnce() -> ProgramParameters,
    ) -> ShaderResult<String> {
        let entry = self.entries.entry(material).or_default();
        if entry.version != signature.version {
            for key in entry.acquired.drain() {
                programs.release(device, &key);
            }
            entry.variants.clear();
            entry.version = signature.version;
        }
        if let Some(key) = entry.variants.get(&signature) {
            return Ok(key.clone());
        }

        let params = gather();
        let key = params.cache_key();
        if !entry.acquired.contains(&key) {
            programs.acquire(device, &params)?;
            entry.acquired.insert(key.clone());
        }
        entry.variants.insert(signature, key.clone());
        Ok(key)
    }

    /// Release every program reference held by `material`; returns how many
    pub fn release<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        programs: &mut ProgramCache,
        material: MaterialHandle,
    ) -> usize {
        let Some(entry) = self.entries.remove(&material) else {
            return 0;
        };
        let released = entry.acquired.len();
        for key in entry.acquired {
            programs.release(device, &key);
        }
        released
    }

    /// Materials with at least one program
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no material holds a program
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry (the program cache is cleared separately)
    pub fn forget_all(&mut self) {
        self.entries.clear();
    }
}
