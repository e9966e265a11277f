//! Content-addressed shader cache, keyed by the interface hash of the
//! preprocessed source plus its defines: an `RwLock`-guarded map
//! rebuilt lazily on miss.

use hashbrown::HashMap;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::ShaderModule;

/// Hashes the inputs that fully determine a compile, independent of
/// the reflected interface (which is only known *after* compiling).
pub fn source_key(preprocessed_source: &str, entry_point: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(preprocessed_source.as_bytes());
    hasher.update(entry_point.as_bytes());
    hasher.finalize().into()
}

/// An in-memory cache of compiled-and-reflected shader modules.
///
/// A disk-backed embedding persists `(key, bincode/json-of-ShaderModule)`
/// pairs behind the same versioned sidecar scheme as
/// [`super::sdi::ShaderInterface`]; that persistence is the embedding's
/// concern, this type only owns the in-memory half.
#[derive(Default)]
pub struct ShaderCache {
    modules: RwLock<HashMap<[u8; 32], ShaderModule>>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached module for `key`, compiling and inserting it
    /// via `compile` on a miss.
    pub fn get_or_compile(
        &self,
        key: [u8; 32],
        compile: impl FnOnce() -> Result<ShaderModule, super::ShaderError>,
    ) -> Result<ShaderModule, super::ShaderError> {
        if let Some(module) = self.modules.read().get(&key) {
            return Ok(module.clone());
        }
        let module = compile()?;
        self.modules.write().insert(key, module.clone());
        Ok(module)
    }

    /// Drops every cached module, forcing the next lookup to recompile.
    /// Called when a reload is classified as anything other than
    /// [`super::HotSwapClass::BodyOnly`].
    pub fn invalidate_all(&self) {
        self.modules.write().clear();
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ShaderStage;

    fn module() -> ShaderModule {
        ShaderModule {
            spirv: vec![],
            stage: ShaderStage::Compute,
            bindings: vec![],
            push_constants: vec![],
            spec_constants: vec![],
        }
    }

    #[test]
    fn a_miss_compiles_and_a_hit_does_not() {
        let cache = ShaderCache::new();
        let key = source_key("void main() {}", "main");
        let mut compiles = 0;

        cache
            .get_or_compile(key, || {
                compiles += 1;
                Ok(module())
            })
            .unwrap();
        cache
            .get_or_compile(key, || {
                compiles += 1;
                Ok(module())
            })
            .unwrap();

        assert_eq!(compiles, 1);
    }

    #[test]
    fn invalidate_all_forces_a_recompile() {
        let cache = ShaderCache::new();
        let key = source_key("void main() {}", "main");
        cache.get_or_compile(key, || Ok(module())).unwrap();
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
