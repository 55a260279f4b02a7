//! Type instructions.
//!
//! Structs may name pointers to themselves. A struct member that is not
//! defined yet is left unresolved and the struct goes on a worklist; every
//! new `OpTypePointer` rescans the worklist and completes the structs whose
//! last missing member it was. A pointer whose pointee struct is not defined
//! yet predeclares the struct, and `OpTypeStruct` fills in that declaration.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::{
    Attribute, CooperativeMatrixUse, Decoration, Dim, FPEncoding, FloatKind, ImageArrayedInfo,
    ImageData, ImageDepthInfo, ImageFormat, ImageSamplerUseInfo, ImageSamplingInfo,
    MemberDecoration, Scope, Signedness, StorageClass, StructBody, Type, TypeData, DYNAMIC_DIM,
};
use tracing::trace;

use super::{decode_enum, DeferredStruct, Deserializer};
use crate::{
    error::{Arity, ErrorKind},
    opcode::Op,
    table::IdKind,
};

/// Prefix of the name given to unnamed self-referencing structs
const STRUCT_PREFIX: &str = "spirv_struct_";
/// Largest component count a vector type may declare
const MAX_VECTOR_COMPONENTS: u32 = 16;
/// Largest rank accepted for a tensor without a shape
const MAX_TENSOR_RANK: usize = 64;

impl Deserializer<'_> {
    pub(super) fn process_type(&mut self, op: Op, operands: &[u32]) -> Result<(), ErrorKind> {
        let name = op.name();
        ErrorKind::check_arity(name, Arity::AtLeast(1), operands.len())?;
        let id = operands[0];

        let ty = match op {
            Op::TypeVoid => {
                ErrorKind::check_arity(name, Arity::Exactly(1), operands.len())?;
                self.module.types.void()
            }
            Op::TypeBool => {
                ErrorKind::check_arity(name, Arity::Exactly(1), operands.len())?;
                self.module.types.bool()
            }
            Op::TypeInt => {
                ErrorKind::check_arity(name, Arity::Exactly(3), operands.len())?;
                let signedness = if operands[2] == 1 {
                    Signedness::Signed
                } else {
                    Signedness::Signless
                };
                self.module.types.int(operands[1], signedness)
            }
            Op::TypeFloat => {
                ErrorKind::check_arity(name, Arity::Between(2, 3), operands.len())?;
                let kind = float_kind(operands[1], operands.get(2).copied())?;
                self.module.types.float(kind)
            }
            Op::TypeVector => {
                ErrorKind::check_arity(name, Arity::Exactly(3), operands.len())?;
                let element = self.type_of(operands[1])?;
                if operands[2] > MAX_VECTOR_COMPONENTS {
                    return Err(ErrorKind::InvalidLiteral(format!(
                        "OpTypeVector component count {} exceeds {}",
                        operands[2], MAX_VECTOR_COMPONENTS
                    )));
                }
                self.module.types.vector(element, operands[2])
            }
            Op::TypeMatrix => {
                ErrorKind::check_arity(name, Arity::Exactly(3), operands.len())?;
                let column = self.type_of(operands[1])?;
                if !matches!(self.module.types.get(column), TypeData::Vector { .. }) {
                    return Err(ErrorKind::TypeMismatch(format!(
                        "OpTypeMatrix column type must be a vector, found {}",
                        self.module.types.display(column)
                    )));
                }
                self.module.types.intern(TypeData::Matrix {
                    column,
                    count: operands[2],
                })
            }
            Op::TypeArray => {
                ErrorKind::check_arity(name, Arity::Exactly(3), operands.len())?;
                let element = self.type_of(operands[1])?;
                let count = self.constant_u32(operands[2])?;
                let stride = self.type_decorations.get(&id).copied().unwrap_or(0);
                self.module.types.intern(TypeData::Array {
                    element,
                    count,
                    stride,
                })
            }
            Op::TypeRuntimeArray => {
                ErrorKind::check_arity(name, Arity::Exactly(2), operands.len())?;
                let element = self.type_of(operands[1])?;
                let stride = self.type_decorations.get(&id).copied().unwrap_or(0);
                self.module
                    .types
                    .intern(TypeData::RuntimeArray { element, stride })
            }
            Op::TypeFunction => {
                ErrorKind::check_arity(name, Arity::AtLeast(2), operands.len())?;
                let ret = self.type_of(operands[1])?;
                let params = operands[2..]
                    .iter()
                    .map(|id| self.type_of(*id))
                    .collect::<Result<Vec<_>, _>>()?;
                let results = if self.module.types.is_void(ret) {
                    Vec::new()
                } else {
                    Vec::from([ret])
                };
                self.module.types.function(params, results)
            }
            Op::TypePointer => return self.process_type_pointer(operands),
            Op::TypeStruct => return self.process_type_struct(operands),
            Op::TypeImage => {
                ErrorKind::check_arity(name, Arity::Exactly(8), operands.len())?;
                let image = ImageData {
                    sampled: self.type_of(operands[1])?,
                    dim: decode_enum("dim", operands[2], Dim::from_u32)?,
                    depth: decode_enum("image depth", operands[3], ImageDepthInfo::from_u32)?,
                    arrayed: decode_enum("image arrayed", operands[4], ImageArrayedInfo::from_u32)?,
                    sampling: decode_enum(
                        "image sampling",
                        operands[5],
                        ImageSamplingInfo::from_u32,
                    )?,
                    sampler_use: decode_enum(
                        "image sampler use",
                        operands[6],
                        ImageSamplerUseInfo::from_u32,
                    )?,
                    format: decode_enum("image format", operands[7], ImageFormat::from_u32)?,
                };
                self.module.types.intern(TypeData::Image(image))
            }
            Op::TypeSampledImage => {
                ErrorKind::check_arity(name, Arity::Exactly(2), operands.len())?;
                let image = self.type_of(operands[1])?;
                if !matches!(self.module.types.get(image), TypeData::Image(_)) {
                    return Err(ErrorKind::TypeMismatch(format!(
                        "OpTypeSampledImage needs an image type, found {}",
                        self.module.types.display(image)
                    )));
                }
                self.module.types.intern(TypeData::SampledImage { image })
            }
            Op::TypeCooperativeMatrixKHR => {
                ErrorKind::check_arity(name, Arity::Exactly(6), operands.len())?;
                let element = self.type_of(operands[1])?;
                let scope = decode_enum("scope", self.constant_u32(operands[2])?, Scope::from_u32)?;
                let rows = self.constant_u32(operands[3])?;
                let columns = self.constant_u32(operands[4])?;
                let usage = decode_enum(
                    "cooperative matrix use",
                    self.constant_u32(operands[5])?,
                    CooperativeMatrixUse::from_u32,
                )?;
                self.module.types.intern(TypeData::CooperativeMatrix {
                    element,
                    rows,
                    columns,
                    scope,
                    usage,
                })
            }
            Op::TypeTensorARM => {
                ErrorKind::check_arity(name, Arity::Between(2, 4), operands.len())?;
                let element = self.type_of(operands[1])?;
                let shape = match operands.len() {
                    2 => None,
                    3 => {
                        let rank = self.constant_u32(operands[2])? as usize;
                        if rank > MAX_TENSOR_RANK {
                            return Err(ErrorKind::InvalidLiteral(format!(
                                "OpTypeTensorARM rank {} exceeds {}",
                                rank, MAX_TENSOR_RANK
                            )));
                        }
                        Some(alloc::vec![DYNAMIC_DIM; rank])
                    }
                    _ => {
                        let rank = self.constant_u32(operands[2])? as usize;
                        let shape = self.tensor_shape(operands[3])?;
                        if shape.len() != rank {
                            return Err(ErrorKind::TypeMismatch(format!(
                                "OpTypeTensorARM shape has {} dimensions, rank is {}",
                                shape.len(),
                                rank
                            )));
                        }
                        Some(shape)
                    }
                };
                self.module.types.intern(TypeData::Tensor { element, shape })
            }
            Op::TypeSampler => {
                return Err(ErrorKind::Unsupported(String::from("OpTypeSampler")));
            }
            _ => return Err(ErrorKind::UnhandledInstruction(String::from(name))),
        };

        trace!("type <id> {} = {}", id, self.module.types.display(ty));
        self.types.define(id, ty)
    }

    pub(super) fn process_type_forward_pointer(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpTypeForwardPointer", Arity::Exactly(2), operands.len())?;
        decode_enum("storage class", operands[1], StorageClass::from_u32)?;
        self.forward_pointer_ids.insert(operands[0]);
        Ok(())
    }

    fn process_type_pointer(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpTypePointer", Arity::Exactly(3), operands.len())?;
        let id = operands[0];
        let storage = decode_enum("storage class", operands[1], StorageClass::from_u32)?;
        let pointee = match self.types.get(operands[2]) {
            Some(ty) => ty,
            None => self.predeclare_struct(operands[2]),
        };
        let ty = self.module.types.pointer(pointee, storage);
        trace!("type <id> {} = {}", id, self.module.types.display(ty));
        self.types.define(id, ty)?;
        self.forward_pointer_ids.remove(&id);
        self.resolve_deferred_structs(id, ty)
    }

    /// Struct declared ahead of its `OpTypeStruct` because a pointer names it
    fn predeclare_struct(&mut self, id: u32) -> Type {
        if let Some(ty) = self.predeclared_structs.get(&id) {
            return *ty;
        }
        let name = self.symbol_name(id, STRUCT_PREFIX);
        let ty = self.module.types.declare_struct(Some(name));
        trace!("predeclared struct <id> {}", id);
        self.predeclared_structs.insert(id, ty);
        ty
    }

    /// Fill in deferred struct members that name `pointer_id`
    fn resolve_deferred_structs(&mut self, pointer_id: u32, ty: Type) -> Result<(), ErrorKind> {
        let mut index = 0;
        while index < self.deferred_structs.len() {
            let DeferredStruct {
                members,
                unresolved,
                ..
            } = &mut self.deferred_structs[index];
            unresolved.retain(|(id, member)| {
                if *id == pointer_id {
                    members[*member] = Some(ty);
                    false
                } else {
                    true
                }
            });
            if !unresolved.is_empty() {
                index += 1;
                continue;
            }

            let deferred = self.deferred_structs.remove(index);
            let body = StructBody {
                members: deferred.members.into_iter().flatten().collect(),
                offsets: deferred.offsets,
                member_decorations: deferred.member_decorations,
                member_names: deferred.member_names,
            };
            trace!("completed deferred struct {}", self.module.types.display(deferred.ty));
            self.module
                .types
                .try_set_body(deferred.ty, body)
                .map_err(|e| ErrorKind::TypeMismatch(format!("{}", e)))?;
        }
        Ok(())
    }

    fn process_type_struct(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpTypeStruct", Arity::AtLeast(1), operands.len())?;
        let id = operands[0];

        let mut members = Vec::with_capacity(operands.len() - 1);
        let mut unresolved = Vec::new();
        for (index, member_id) in operands[1..].iter().enumerate() {
            match self.types.get(*member_id) {
                Some(ty) => members.push(Some(ty)),
                // Only a forward-declared pointer may be defined later
                None if self.forward_pointer_ids.contains(member_id) => {
                    unresolved.push((*member_id, index));
                    members.push(None);
                }
                None => {
                    return Err(ErrorKind::UndefinedReference {
                        kind: IdKind::Type,
                        id: *member_id,
                    })
                }
            }
        }

        let (offsets, member_decorations) = self.struct_member_decorations(id, members.len());
        let member_names = self.struct_member_names(id, members.len());

        let ty = match self.predeclared_structs.remove(&id) {
            Some(ty) => ty,
            None => {
                let name = match self.names.lookup(id) {
                    Some(name) if !name.is_empty() => Some(name.clone()),
                    _ if !unresolved.is_empty() => Some(format!("{}{}", STRUCT_PREFIX, id)),
                    _ => None,
                };
                self.module.types.declare_struct(name)
            }
        };
        self.types.define(id, ty)?;

        if unresolved.is_empty() {
            let body = StructBody {
                members: members.into_iter().flatten().collect(),
                offsets,
                member_decorations,
                member_names,
            };
            self.module
                .types
                .try_set_body(ty, body)
                .map_err(|e| ErrorKind::TypeMismatch(format!("{}", e)))?;
        } else {
            trace!("deferring struct <id> {} with {} unresolved members", id, unresolved.len());
            self.deferred_structs.push(DeferredStruct {
                ty,
                members,
                unresolved,
                offsets,
                member_decorations,
                member_names,
            });
        }
        trace!("type <id> {} = {}", id, self.module.types.display(ty));
        Ok(())
    }

    /// Offsets (empty, or one per member) and the other member decorations
    fn struct_member_decorations(
        &self,
        id: u32,
        member_count: usize,
    ) -> (Vec<u32>, Vec<MemberDecoration>) {
        let mut offsets = Vec::new();
        let mut decorations = Vec::new();
        let Some(members) = self.member_decorations.get(&id) else {
            return (offsets, decorations);
        };
        for (member, entries) in members {
            if *member as usize >= member_count {
                continue;
            }
            for (decoration, values) in entries {
                if *decoration == Decoration::Offset {
                    if offsets.is_empty() {
                        offsets.resize(member_count, 0);
                    }
                    offsets[*member as usize] = values.first().copied().unwrap_or(0);
                } else {
                    decorations.push(MemberDecoration {
                        member: *member,
                        decoration: *decoration,
                        value: values.first().copied(),
                    });
                }
            }
        }
        (offsets, decorations)
    }

    fn struct_member_names(&self, id: u32, member_count: usize) -> Vec<String> {
        match self.member_names.get(&id) {
            Some(names) => (0..member_count as u32)
                .map(|member| names.get(&member).cloned().unwrap_or_default())
                .collect(),
            None => Vec::new(),
        }
    }

    fn tensor_shape(&self, id: u32) -> Result<Vec<i64>, ErrorKind> {
        let elements = match self.constants.lookup(id) {
            Some((Attribute::Array(elements), _)) | Some((Attribute::Dense { elements, .. }, _)) => {
                elements
            }
            Some(_) => {
                return Err(ErrorKind::TypeMismatch(String::from(
                    "OpTypeTensorARM shape must come from an array constant",
                )))
            }
            None => return Err(ErrorKind::UndefinedConstantOperand(id)),
        };
        elements
            .iter()
            .map(|dim| {
                dim.as_int().ok_or_else(|| {
                    ErrorKind::TypeMismatch(String::from(
                        "OpTypeTensorARM shape has an invalid dimension size",
                    ))
                })
            })
            .collect()
    }
}

fn float_kind(width: u32, encoding: Option<u32>) -> Result<FloatKind, ErrorKind> {
    match encoding {
        None => match width {
            16 => Ok(FloatKind::F16),
            32 => Ok(FloatKind::F32),
            64 => Ok(FloatKind::F64),
            _ => Err(ErrorKind::Unsupported(format!(
                "OpTypeFloat bitwidth {}",
                width
            ))),
        },
        Some(encoding) => {
            let encoding = decode_enum("FP encoding", encoding, FPEncoding::from_u32)?;
            match (encoding, width) {
                (FPEncoding::BFloat16KHR, 16) => Ok(FloatKind::BF16),
                (FPEncoding::BFloat16KHR, _) => Err(ErrorKind::TypeMismatch(format!(
                    "invalid OpTypeFloat bitwidth for bfloat16 encoding: {} (expected 16)",
                    width
                ))),
            }
        }
    }
}
