//! Reference-counted program cache keyed by variant fingerprint

use std::collections::hash_map::{Entry, HashMap};

use crate::render::backend::GraphicsDevice;

use super::{Program, ProgramParameters, ShaderLibrary, ShaderResult};

/// Programs shared between every material with the same fingerprint
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: HashMap<String, Program>,
    library: ShaderLibrary,
    next_id: u32,
}

impl ProgramCache {
    /// Empty cache over the built-in library
    pub fn new() -> Self {
        Self::with_library(ShaderLibrary::new())
    }

    /// Empty cache over a custom library
    pub fn with_library(library: ShaderLibrary) -> Self {
        Self {
            programs: HashMap::new(),
            library,
            next_id: 0,
        }
    }

    /// Return the program for `params`, building it on first use
    ///
    /// Every call takes a reference; pair it with [`ProgramCache::release`].
    pub fn acquire<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, params: &ProgramParameters) -> ShaderResult<&Program> {
        let program = match self.programs.entry(params.cache_key()) {
            Entry::Occupied(entry) => {
                log::debug!("Program cache hit for '{}'", params.shader_id);
                let program = entry.into_mut();
                program.used_times += 1;
                program
            }
            Entry::Vacant(entry) => {
                log::debug!("Program cache miss for '{}', building", params.shader_id);
                let program = Program::build(device, &self.library, params, entry.key().clone(), self.next_id)?;
                self.next_id += 1;
                entry.insert(program)
            }
        };
        Ok(program)
    }

    /// Program built for `key`
    pub fn get(&self, key: &str) -> Option<&Program> {
        self.programs.get(key)
    }

    /// Drop one reference; destroys the program at zero and returns true
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, key: &str) -> bool {
        let Some(program) = self.programs.get_mut(key) else {
            return false;
        };
        program.used_times = program.used_times.saturating_sub(1);
        if program.used_times > 0 {
            return false;
        }
        if let Some(mut program) = self.programs.remove(key) {
            log::debug!("Destroying program {} '{}'", program.id, program.name);
            program.destroy(device);
        }
        true
    }

    /// Number of live programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// True when no program is cached
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Live programs
    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    /// Chunk library used for builds
    pub const fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    /// Chunk library for registering custom chunks
    ///
    /// Programs already built keep their sources.
    pub fn library_mut(&mut self) -> &mut ShaderLibrary {
        &mut self.library
    }

    /// Destroy every program
    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for (_, mut program) in self.programs.drain() {
            program.destroy(device);
        }
    }

    /// Drop every program without touching the device (its objects are gone)
    pub fn forget_all(&mut self) {
        self.programs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Assets;
    use crate::core::config::RendererConfig;
    use crate::foundation::math::Color;
    use crate::render::backend::HeadlessDevice;
    use crate::render::lights::LightCounts;
    use crate::render::material::Material;
    use crate::render::shader::{ObjectTraits, ProgramSettings};

    fn params_for(material: &Material) -> ProgramParameters {
        ProgramParameters::gather(
            material,
            ObjectTraits::default(),
            &LightCounts::default(),
            (0, 0),
            &ProgramSettings::from_config(&RendererConfig::new(8, 8), false),
            None,
            &Assets::new(),
        )
    }

    #[test]
    fn test_acquire_shares_and_counts() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let params = params_for(&Material::basic(Color::WHITE));
        let first = cache.acquire(&mut device, &params).unwrap().id;
        let second = cache.acquire(&mut device, &params).unwrap();
        assert_eq!(first, second.id);
        assert_eq!(second.used_times, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(device.program_count(), 1);
    }

    #[test]
    fn test_release_destroys_at_zero() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let params = params_for(&Material::basic(Color::WHITE));
        let key = params.cache_key();
        cache.acquire(&mut device, &params).unwrap();
        cache.acquire(&mut device, &params).unwrap();

        assert!(!cache.release(&mut device, &key));
        assert_eq!(cache.get(&key).map(|p| p.used_times), Some(1));
        assert!(cache.release(&mut device, &key));
        assert!(cache.get(&key).is_none());
        assert_eq!(device.program_count(), 0);
        assert!(!cache.release(&mut device, &key));
    }

    #[test]
    fn test_distinct_variants_build_distinct_programs() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let plain = Material::lambert(Color::WHITE);
        let mut colored = plain.clone();
        colored.vertex_colors = true;
        let a = cache.acquire(&mut device, &params_for(&plain)).unwrap().id;
        let b = cache.acquire(&mut device, &params_for(&colored)).unwrap().id;
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_forget_all_skips_device() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        cache.acquire(&mut device, &params_for(&Material::default())).unwrap();
        device.clear_commands();
        cache.forget_all();
        assert!(cache.is_empty());
        assert!(device.commands().is_empty());
    }
}
