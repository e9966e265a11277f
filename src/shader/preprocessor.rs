//! GLSL text preprocessing: `#include` resolution with circular-include
//! detection, `#define` injection, and optional `#line` emission so a
//! compiler error log can be mapped back to the original file/line.

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

/// Maximum `#include` nesting depth before a build is rejected as
/// circular (or simply too deep to be a real include tree).
pub const MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("include path {0:?} could not be resolved")]
    NotFound(String),
    #[error("include depth exceeded {MAX_INCLUDE_DEPTH} (likely a circular #include of {0:?})")]
    TooDeep(String),
    #[error("#include directive is missing a closing quote: {0:?}")]
    MalformedInclude(String),
}

/// Resolves an `#include "path"` directive to source text. A real
/// embedding backs this with the asset filesystem; tests back it with
/// an in-memory map.
pub trait IncludeResolver {
    fn resolve(&self, path: &str) -> Option<String>;
}

/// Emits `#line <n> "<file>"` markers around each included file's body
/// so a compiler error log can be attributed to the original source.
pub fn preprocess(
    source: &str,
    defines: &HashMap<String, String>,
    resolver: &dyn IncludeResolver,
) -> Result<String, PreprocessError> {
    let mut output = String::new();
    for (name, value) in defines {
        output.push_str(&format!("#define {name} {value}\n"));
    }
    let mut stack = HashSet::new();
    expand(source, "<root>", resolver, &mut stack, 0, &mut output)?;
    Ok(output)
}

fn expand(
    source: &str,
    this_file: &str,
    resolver: &dyn IncludeResolver,
    active: &mut HashSet<String>,
    depth: usize,
    output: &mut String,
) -> Result<(), PreprocessError> {
    if depth >= MAX_INCLUDE_DEPTH {
        return Err(PreprocessError::TooDeep(this_file.to_string()));
    }

    for (line_no, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("#include") {
            let path = parse_include_path(rest)?;
            if !active.insert(path.clone()) {
                return Err(PreprocessError::TooDeep(path));
            }
            let included = resolver
                .resolve(&path)
                .ok_or_else(|| PreprocessError::NotFound(path.clone()))?;
            output.push_str(&format!("#line 1 \"{path}\"\n"));
            expand(&included, &path, resolver, active, depth + 1, output)?;
            output.push_str(&format!("#line {} \"{this_file}\"\n", line_no + 2));
            active.remove(&path);
        } else {
            output.push_str(line);
            output.push('\n');
        }
    }
    Ok(())
}

fn parse_include_path(rest: &str) -> Result<String, PreprocessError> {
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix('"')
        .ok_or_else(|| PreprocessError::MalformedInclude(rest.to_string()))?;
    let end = rest
        .find('"')
        .ok_or_else(|| PreprocessError::MalformedInclude(rest.to_string()))?;
    Ok(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapResolver(HashMap<&'static str, &'static str>);

    impl IncludeResolver for MapResolver {
        fn resolve(&self, path: &str) -> Option<String> {
            self.0.get(path).map(|s| s.to_string())
        }
    }

    #[test]
    fn includes_are_inlined_with_line_markers() {
        let mut files = HashMap::new();
        files.insert("common.glsl", "float common_fn() { return 1.0; }");
        let resolver = MapResolver(files);

        let source = "#include \"common.glsl\"\nvoid main() {}";
        let out = preprocess(source, &HashMap::new(), &resolver).unwrap();
        assert!(out.contains("common_fn"));
        assert!(out.contains("#line"));
    }

    #[test]
    fn defines_are_injected_before_the_body() {
        let resolver = MapResolver(HashMap::new());
        let mut defines = HashMap::new();
        defines.insert("BRICK_SIZE".to_string(), "8".to_string());
        let out = preprocess("void main() {}", &defines, &resolver).unwrap();
        assert!(out.starts_with("#define BRICK_SIZE 8\n"));
    }

    #[test]
    fn self_including_file_is_rejected_as_circular() {
        let mut files = HashMap::new();
        files.insert("a.glsl", "#include \"a.glsl\"\n");
        let resolver = MapResolver(files);
        let err = preprocess("#include \"a.glsl\"\n", &HashMap::new(), &resolver).unwrap_err();
        assert_eq!(err, PreprocessError::TooDeep("a.glsl".to_string()));
    }

    #[test]
    fn missing_include_is_reported() {
        let resolver = MapResolver(HashMap::new());
        let err = preprocess("#include \"missing.glsl\"\n", &HashMap::new(), &resolver)
            .unwrap_err();
        assert_eq!(err, PreprocessError::NotFound("missing.glsl".to_string()));
    }
}
