//! `#include <chunk>` resolution

use super::{ShaderError, ShaderLibrary, ShaderResult};

/// Replace every `#include <name>` line with the named chunk, recursively
///
/// Unknown names fail with [`ShaderError::UnresolvedChunk`]; a chunk that
/// includes itself through any path fails with [`ShaderError::IncludeCycle`].
pub fn resolve_includes(source: &str, library: &ShaderLibrary) -> ShaderResult<String> {
    let mut stack = Vec::new();
    let mut out = String::with_capacity(source.len());
    expand(source, library, &mut stack, &mut out)?;
    Ok(out)
}

fn expand<'a>(source: &'a str, library: &'a ShaderLibrary, stack: &mut Vec<&'a str>, out: &mut String) -> ShaderResult<()> {
    for line in source.lines() {
        let Some(name) = include_target(line) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        if stack.contains(&name) {
            return Err(ShaderError::IncludeCycle(name.to_string()));
        }
        let chunk = library
            .chunk(name)
            .ok_or_else(|| ShaderError::UnresolvedChunk(name.to_string()))?;
        stack.push(name);
        expand(chunk, library, stack, out)?;
        stack.pop();
    }
    Ok(())
}

fn include_target(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("#include")?;
    let rest = rest.trim_start().strip_prefix('<')?;
    let end = rest.find('>')?;
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ShaderLibrary {
        let mut library = ShaderLibrary::empty();
        library.register_chunk("outer", "// outer\n#include <inner>");
        library.register_chunk("inner", "float inner = 1.0;");
        library
    }

    #[test]
    fn test_nested_includes_resolve() {
        let out = resolve_includes("void main() {\n  #include <outer>\n}", &library()).unwrap();
        assert!(out.contains("// outer"));
        assert!(out.contains("float inner = 1.0;"));
        assert!(!out.contains("#include"));
    }

    #[test]
    fn test_unknown_chunk_named_in_error() {
        let err = resolve_includes("#include <does_not_exist>", &library()).unwrap_err();
        assert_eq!(err, ShaderError::UnresolvedChunk("does_not_exist".to_string()));
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut library = library();
        library.register_chunk("a", "#include <b>");
        library.register_chunk("b", "#include <a>");
        assert!(matches!(resolve_includes("#include <a>", &library), Err(ShaderError::IncludeCycle(_))));
    }

    #[test]
    fn test_same_chunk_twice_is_not_a_cycle() {
        let out = resolve_includes("#include <inner>\n#include <inner>", &library()).unwrap();
        assert_eq!(out.matches("float inner").count(), 2);
    }

    #[test]
    fn test_builtin_templates_resolve() {
        let library = ShaderLibrary::new();
        for id in ["basic", "lambert", "phong", "standard", "depth"] {
            let (vertex, fragment) = library.template(id).unwrap();
            assert!(resolve_includes(vertex, &library).is_ok(), "{id} vertex");
            assert!(resolve_includes(fragment, &library).is_ok(), "{id} fragment");
        }
    }
}
