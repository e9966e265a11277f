//! A minimal SPIR-V reflector: walks the raw instruction stream once,
//! tracking decorations and variable storage classes, and turns the
//! result into a binding ABI the graph's slot system can validate
//! against.
//!
//! This does not implement general SPIR-V type resolution; it only
//! resolves the handful of instructions needed to answer "what
//! descriptor type, at what (set, binding), does this variable use".

use std::num::NonZeroU32;

use hashbrown::HashMap;
use thiserror::Error;

use crate::backend::DescriptorType;
use spirv::MAGIC_NUMBER;

use super::{BindingLocation, ShaderAccess, ShaderBinding};

const OP_DECORATE: u32 = 71;
const OP_MEMBER_DECORATE: u32 = 72;
const OP_TYPE_STRUCT: u32 = 30;
const OP_TYPE_IMAGE: u32 = 25;
const OP_TYPE_SAMPLER: u32 = 26;
const OP_TYPE_SAMPLED_IMAGE: u32 = 27;
const OP_TYPE_ACCELERATION_STRUCTURE_KHR: u32 = 5341;
const OP_TYPE_POINTER: u32 = 32;
const OP_VARIABLE: u32 = 59;

const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;
const DECORATION_SPEC_ID: u32 = 1;
const DECORATION_OFFSET: u32 = 35;
const DECORATION_BUFFER_BLOCK: u32 = 3;

const STORAGE_CLASS_UNIFORM_CONSTANT: u32 = 0;
const STORAGE_CLASS_INPUT: u32 = 1;
const STORAGE_CLASS_UNIFORM: u32 = 2;
const STORAGE_CLASS_PUSH_CONSTANT: u32 = 9;
const STORAGE_CLASS_STORAGE_BUFFER: u32 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReflectError {
    #[error("module is shorter than the SPIR-V header")]
    Truncated,
    #[error("bad magic number: {0:#010x}")]
    BadMagic(u32),
    #[error("instruction word count of 0 at word offset {0}")]
    ZeroLengthInstruction(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpecConstant {
    pub spec_id: u32,
    pub result_id: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexInput {
    pub location: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ReflectedModule {
    pub bindings: Vec<ShaderBinding>,
    pub push_constants: Vec<PushConstantRange>,
    pub spec_constants: Vec<SpecConstant>,
    pub vertex_inputs: Vec<VertexInput>,
}

#[derive(Default)]
struct TypeInfo {
    opcode: u32,
    pointee: Option<u32>,
    storage_class: Option<u32>,
}

/// Reflects a SPIR-V module's external interface.
pub fn reflect(words: &[u32]) -> Result<ReflectedModule, ReflectError> {
    if words.len() < 5 {
        return Err(ReflectError::Truncated);
    }
    if words[0] != MAGIC_NUMBER {
        return Err(ReflectError::BadMagic(words[0]));
    }

    let mut types: HashMap<u32, TypeInfo> = HashMap::new();
    let mut bindings_of: HashMap<u32, u32> = HashMap::new();
    let mut sets_of: HashMap<u32, u32> = HashMap::new();
    let mut spec_ids: HashMap<u32, u32> = HashMap::new();
    let mut member_offsets: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut buffer_blocks: HashMap<u32, ()> = HashMap::new();
    let mut variables: Vec<(u32, u32, u32)> = Vec::new(); // (result_id, result_type, storage_class)

    let mut offset = 5usize;
    while offset < words.len() {
        let header = words[offset];
        let word_count = (header >> 16) as usize;
        let opcode = header & 0xffff;
        if word_count == 0 {
            return Err(ReflectError::ZeroLengthInstruction(offset));
        }
        if offset + word_count > words.len() {
            break;
        }
        let operands = &words[offset + 1..offset + word_count];

        match opcode {
            OP_DECORATE => {
                if operands.len() >= 2 {
                    let target = operands[0];
                    let decoration = operands[1];
                    match decoration {
                        DECORATION_BINDING if operands.len() >= 3 => {
                            bindings_of.insert(target, operands[2]);
                        }
                        DECORATION_DESCRIPTOR_SET if operands.len() >= 3 => {
                            sets_of.insert(target, operands[2]);
                        }
                        DECORATION_SPEC_ID if operands.len() >= 3 => {
                            spec_ids.insert(target, operands[2]);
                        }
                        DECORATION_BUFFER_BLOCK => {
                            buffer_blocks.insert(target, ());
                        }
                        _ => {}
                    }
                }
            }
            OP_MEMBER_DECORATE => {
                if operands.len() >= 4 && operands[2] == DECORATION_OFFSET {
                    member_offsets.entry(operands[0]).or_default().push(operands[3]);
                }
            }
            OP_TYPE_STRUCT | OP_TYPE_IMAGE | OP_TYPE_SAMPLER | OP_TYPE_SAMPLED_IMAGE
            | OP_TYPE_ACCELERATION_STRUCTURE_KHR => {
                if !operands.is_empty() {
                    types.insert(
                        operands[0],
                        TypeInfo {
                            opcode,
                            pointee: None,
                            storage_class: None,
                        },
                    );
                }
            }
            OP_TYPE_POINTER => {
                if operands.len() >= 3 {
                    types.insert(
                        operands[0],
                        TypeInfo {
                            opcode,
                            pointee: Some(operands[2]),
                            storage_class: Some(operands[1]),
                        },
                    );
                }
            }
            OP_VARIABLE => {
                if operands.len() >= 3 {
                    variables.push((operands[1], operands[0], operands[2]));
                }
            }
            _ => {}
        }

        offset += word_count;
    }

    let mut result = ReflectedModule::default();

    for (result_id, result_type, storage_class) in &variables {
        let pointee = types.get(result_type).and_then(|t| t.pointee);
        match *storage_class {
            STORAGE_CLASS_INPUT => {
                if let Some(&location) = bindings_of.get(result_id) {
                    result.vertex_inputs.push(VertexInput { location });
                }
            }
            STORAGE_CLASS_PUSH_CONSTANT => {
                if let Some(offsets) = pointee.and_then(|p| member_offsets.get(&p)) {
                    let max_offset = offsets.iter().copied().max().unwrap_or(0);
                    result.push_constants.push(PushConstantRange {
                        offset: 0,
                        size: max_offset + 16,
                    });
                }
            }
            STORAGE_CLASS_UNIFORM | STORAGE_CLASS_STORAGE_BUFFER
            | STORAGE_CLASS_UNIFORM_CONSTANT => {
                let (Some(&binding), Some(&set)) =
                    (bindings_of.get(result_id), sets_of.get(result_id))
                else {
                    continue;
                };

                let kind = classify_descriptor(*storage_class, pointee, &types, &buffer_blocks);
                let Some(kind) = kind else { continue };

                result.bindings.push(ShaderBinding {
                    location: BindingLocation {
                        group: set,
                        binding,
                    },
                    kind,
                    access: ShaderAccess::READ,
                    count: NonZeroU32::new(1).unwrap(),
                });
            }
            _ => {}
        }
    }

    for (&result_id, &spec_id) in &spec_ids {
        result.spec_constants.push(SpecConstant {
            spec_id,
            result_id,
        });
    }

    Ok(result)
}

fn classify_descriptor(
    storage_class: u32,
    pointee: Option<u32>,
    types: &HashMap<u32, TypeInfo>,
    buffer_blocks: &HashMap<u32, ()>,
) -> Option<DescriptorType> {
    let pointee = pointee?;
    let info = types.get(&pointee)?;
    match info.opcode {
        OP_TYPE_STRUCT => {
            if storage_class == STORAGE_CLASS_STORAGE_BUFFER || buffer_blocks.contains_key(&pointee)
            {
                Some(DescriptorType::Storage)
            } else {
                Some(DescriptorType::Uniform)
            }
        }
        OP_TYPE_IMAGE | OP_TYPE_SAMPLED_IMAGE => Some(DescriptorType::Texture),
        OP_TYPE_SAMPLER => Some(DescriptorType::Sampler),
        OP_TYPE_ACCELERATION_STRUCTURE_KHR => Some(DescriptorType::AccelerationStructure),
        _ => None,
    }
}
