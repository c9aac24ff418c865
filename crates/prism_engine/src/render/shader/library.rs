//! Chunk and template registry

use std::collections::HashMap;

use super::chunks::{CHUNKS, TEMPLATES};

/// Named GLSL chunks plus the built-in program templates
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    chunks: HashMap<String, String>,
    templates: HashMap<String, (String, String)>,
}

impl ShaderLibrary {
    /// Library preloaded with the built-in chunks and templates
    pub fn new() -> Self {
        let chunks = CHUNKS
            .iter()
            .map(|(name, source)| ((*name).to_string(), (*source).to_string()))
            .collect();
        let templates = TEMPLATES
            .iter()
            .map(|(id, vertex, fragment)| ((*id).to_string(), ((*vertex).to_string(), (*fragment).to_string())))
            .collect();
        Self { chunks, templates }
    }

    /// Library with no chunks or templates
    pub fn empty() -> Self {
        Self {
            chunks: HashMap::new(),
            templates: HashMap::new(),
        }
    }

    /// Add or replace a chunk
    pub fn register_chunk(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let name = name.into();
        if self.chunks.insert(name.clone(), source.into()).is_some() {
            log::debug!("Replaced shader chunk <{name}>");
        }
    }

    /// Add or replace a program template
    pub fn register_template(&mut self, shader_id: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.templates.insert(shader_id.into(), (vertex.into(), fragment.into()));
    }

    /// Chunk source by name
    pub fn chunk(&self, name: &str) -> Option<&str> {
        self.chunks.get(name).map(String::as_str)
    }

    /// Vertex and fragment template for a built-in shader id
    pub fn template(&self, shader_id: &str) -> Option<(&str, &str)> {
        self.templates
            .get(shader_id)
            .map(|(vertex, fragment)| (vertex.as_str(), fragment.as_str()))
    }

    /// Number of registered chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_present() {
        let library = ShaderLibrary::new();
        for id in ["basic", "lambert", "phong", "standard", "physical", "depth"] {
            assert!(library.template(id).is_some(), "missing template {id}");
        }
        assert!(library.template("shader").is_none());
    }

    #[test]
    fn test_register_chunk_overrides() {
        let mut library = ShaderLibrary::new();
        let count = library.chunk_count();
        library.register_chunk("common", "// replaced");
        assert_eq!(library.chunk("common"), Some("// replaced"));
        assert_eq!(library.chunk_count(), count);
        library.register_chunk("wave", "float wave(float x) { return sin(x); }");
        assert_eq!(library.chunk_count(), count + 1);
    }
}
