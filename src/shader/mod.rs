//! Shader Compilation & Reflection (component C6).
//!
//! The actual GLSL -> SPIR-V compile step is left to one external
//! implementation point ([`Compiler`]): this module owns everything
//! around it — `#include` preprocessing, reflecting the resulting
//! words into a binding ABI, content-addressed caching of that result,
//! and change classification for a reload.

pub mod cache;
pub mod hotreload;
pub mod preprocessor;
pub mod reflect;
pub mod sdi;

use std::num::NonZeroU32;

use bitflags::bitflags;
use hashbrown::HashMap;
use thiserror::Error;

use crate::backend::{DescriptorType, ShaderStage};

pub use cache::ShaderCache;
pub use hotreload::ReloadWatch;
pub use preprocessor::{preprocess, PreprocessError};
pub use reflect::{reflect, PushConstantRange, ReflectError, SpecConstant};
pub use sdi::{ShaderInterface, SdiError};

bitflags! {
    /// How a binding is used inside the shader body, reflected from
    /// whether the SPIR-V variable it backs is ever written to.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderAccess: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingLocation {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Debug)]
pub struct ShaderBinding {
    pub location: BindingLocation,
    pub kind: DescriptorType,
    pub access: ShaderAccess,
    /// Element count for a binding array; always 1 for a scalar binding.
    pub count: NonZeroU32,
}

/// Pre-processed GLSL source plus the metadata needed to reproduce the
/// compile (for cache keying and for the device-capability check).
#[derive(Clone, Debug)]
pub struct PreparedSource {
    pub source: String,
    pub stage: ShaderStage,
    pub entry_point: String,
    pub defines: HashMap<String, String>,
}

/// One external implementation point: something that turns
/// preprocessed GLSL into SPIR-V words and a human-readable error log.
/// This crate never compiles GLSL itself.
pub trait Compiler {
    fn compile(&self, prepared: &PreparedSource) -> Result<Vec<u32>, String>;
}

/// A fully reflected, ready-to-bind shader module.
#[derive(Clone, Debug)]
pub struct ShaderModule {
    pub spirv: Vec<u32>,
    pub stage: ShaderStage,
    pub bindings: Vec<ShaderBinding>,
    pub push_constants: Vec<PushConstantRange>,
    pub spec_constants: Vec<SpecConstant>,
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("compile failed: {0}")]
    Compile(String),
    #[error(transparent)]
    Reflect(#[from] ReflectError),
    #[error(transparent)]
    Sdi(#[from] SdiError),
}

/// Preprocesses, compiles, and reflects a shader in one call.
pub fn compile_and_reflect(
    compiler: &dyn Compiler,
    source: &str,
    stage: ShaderStage,
    entry_point: &str,
    defines: &HashMap<String, String>,
    include_resolver: &dyn preprocessor::IncludeResolver,
) -> Result<ShaderModule, ShaderError> {
    let preprocessed = preprocessor::preprocess(source, defines, include_resolver)?;
    let prepared = PreparedSource {
        source: preprocessed,
        stage,
        entry_point: entry_point.to_string(),
        defines: defines.clone(),
    };
    let spirv = compiler
        .compile(&prepared)
        .map_err(ShaderError::Compile)?;
    let reflected = reflect::reflect(&spirv)?;
    Ok(ShaderModule {
        spirv,
        stage,
        bindings: reflected.bindings,
        push_constants: reflected.push_constants,
        spec_constants: reflected.spec_constants,
    })
}

/// How a shader change affects currently-built pipelines and
/// descriptor layouts. Produced by comparing two [`ShaderModule`]s;
/// acting on a [`HotSwapClass::FullRecompile`] by actually swapping a
/// running pipeline mid-frame is out of scope — this only classifies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HotSwapClass {
    /// Binding ABI is identical; only the SPIR-V body changed.
    BodyOnly,
    /// Binding layout changed but stays compatible (e.g. an access
    /// flag narrowed); descriptor set layouts can be reused.
    BindingCompatible,
    /// Binding count, type, or location changed; everything downstream
    /// of the old layout must be rebuilt.
    FullRecompile,
}

/// Classifies the difference between two reflected modules.
pub fn classify_change(old: &ShaderModule, new: &ShaderModule) -> HotSwapClass {
    if old.bindings.len() != new.bindings.len() || old.push_constants != new.push_constants {
        return HotSwapClass::FullRecompile;
    }
    let mut by_location: HashMap<BindingLocation, &ShaderBinding> = HashMap::new();
    for binding in &old.bindings {
        by_location.insert(binding.location, binding);
    }
    for binding in &new.bindings {
        match by_location.get(&binding.location) {
            Some(prev) if prev.kind == binding.kind && prev.count == binding.count => {
                if prev.access != binding.access {
                    return HotSwapClass::BindingCompatible;
                }
            }
            _ => return HotSwapClass::FullRecompile,
        }
    }
    HotSwapClass::BodyOnly
}
