//! Shader Descriptor Interface: the persisted, versioned binding ABI a
//! graph node's compiled pipeline is checked against before it is
//! allowed into a descriptor set, plus the hashes used to key the
//! on-disk shader cache.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::backend::DescriptorType;

use super::reflect::{PushConstantRange, SpecConstant};
use super::{BindingLocation, ShaderAccess, ShaderBinding};

/// Bumped whenever the on-disk layout of [`ShaderInterface`] changes in
/// a way older readers cannot interpret.
pub const SDI_SCHEMA_VERSION: u32 = 1;
const SDI_MAGIC: &str = "ESVOSDI1";

#[derive(Debug, Error)]
pub enum SdiError {
    #[error("sidecar magic header {0:?} is not a recognized SDI file")]
    BadMagic(String),
    #[error("sidecar schema version {found} is unsupported (expected {expected})")]
    UnsupportedSdiVersion { found: u32, expected: u32 },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The binding ABI a compiled shader exposes, hashed and persisted
/// alongside the compiled SPIR-V so a later run can detect a
/// compatible cache hit without recompiling.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ShaderInterface {
    magic: String,
    schema_version: u32,
    spirv: Vec<u32>,
    bindings: Vec<SerializedBinding>,
    push_constants: Vec<PushConstantRange>,
    spec_constants: Vec<SpecConstant>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct SerializedBinding {
    group: u32,
    binding: u32,
    kind: SerializedDescriptorType,
    access: u8,
    count: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
enum SerializedDescriptorType {
    Uniform,
    Storage,
    Sampler,
    Texture,
    AccelerationStructure,
}

impl From<DescriptorType> for SerializedDescriptorType {
    fn from(kind: DescriptorType) -> Self {
        match kind {
            DescriptorType::Uniform => Self::Uniform,
            DescriptorType::Storage => Self::Storage,
            DescriptorType::Sampler => Self::Sampler,
            DescriptorType::Texture => Self::Texture,
            DescriptorType::AccelerationStructure => Self::AccelerationStructure,
        }
    }
}

impl ShaderInterface {
    pub fn new(
        spirv: &[u32],
        bindings: &[ShaderBinding],
        push_constants: &[PushConstantRange],
        spec_constants: &[SpecConstant],
    ) -> Self {
        let mut bindings: Vec<SerializedBinding> = bindings
            .iter()
            .map(|b| SerializedBinding {
                group: b.location.group,
                binding: b.location.binding,
                kind: b.kind.into(),
                access: b.access.bits(),
                count: b.count.get(),
            })
            .collect();
        // Sort for a hash that's stable regardless of reflection order.
        bindings.sort_by_key(|b| (b.group, b.binding));

        Self {
            magic: SDI_MAGIC.to_string(),
            schema_version: SDI_SCHEMA_VERSION,
            spirv: spirv.to_vec(),
            bindings,
            push_constants: push_constants.to_vec(),
            spec_constants: spec_constants.to_vec(),
        }
    }

    /// SHA-256 over the module's raw SPIR-V words: the cache tag a
    /// disk-backed shader cache keys its compiled entry on. Changes
    /// whenever the compiled body does, even if the reflected binding
    /// ABI is untouched — a source-only edit (a constant literal, say)
    /// still busts this hash, which is the point: it's a cache key, not
    /// a pipeline-layout-compatibility check. Use
    /// [`Self::descriptor_interface_hash`] for that.
    pub fn interface_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.magic.as_bytes());
        hasher.update(self.schema_version.to_le_bytes());
        for word in &self.spirv {
            hasher.update(word.to_le_bytes());
        }
        hasher.finalize().into()
    }

    /// Hash of only the (group, binding, kind) triples, ignoring access
    /// and count — used to key descriptor-set-layout reuse across
    /// shaders that read/write a binding differently.
    pub fn descriptor_interface_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for b in &self.bindings {
            hasher.update(b.group.to_le_bytes());
            hasher.update(b.binding.to_le_bytes());
            hasher.update([b.kind as u8]);
        }
        hasher.finalize().into()
    }

    /// Serializes to the versioned sidecar format.
    pub fn to_sidecar(&self) -> Result<String, SdiError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a sidecar, failing closed on a magic/version mismatch
    /// rather than guessing at an incompatible layout.
    pub fn from_sidecar(data: &str) -> Result<Self, SdiError> {
        let parsed: Self = serde_json::from_str(data)?;
        if parsed.magic != SDI_MAGIC {
            return Err(SdiError::BadMagic(parsed.magic));
        }
        if parsed.schema_version != SDI_SCHEMA_VERSION {
            return Err(SdiError::UnsupportedSdiVersion {
                found: parsed.schema_version,
                expected: SDI_SCHEMA_VERSION,
            });
        }
        Ok(parsed)
    }
}
