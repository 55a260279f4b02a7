//! Constant instructions.
//!
//! Normal constants are recorded as `(attribute, type)` and only become ops
//! when a function body uses them. Spec constants and spec composites are
//! module items right away; spec constant ops are kept as raw words and
//! rebuilt at each use.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::{
    Attribute, ModuleItem, SpecConstant, SpecConstantComposite,
    SpecConstantCompositeReplicate, Type, TypeData,
};
use tracing::trace;

use super::{Deserializer, SpecOp, SymbolInfo};
use crate::{
    error::{Arity, ErrorKind},
    literal::{join_words, sign_extend},
    table::IdKind,
};

const SPEC_CONSTANT_PREFIX: &str = "spirv_spec_const_";

impl Deserializer<'_> {
    /// `OpConstant` and `OpSpecConstant`: type, result, one or two value words
    pub(super) fn process_constant(&mut self, operands: &[u32], is_spec: bool) -> Result<(), ErrorKind> {
        let op = if is_spec { "OpSpecConstant" } else { "OpConstant" };
        ErrorKind::check_arity(op, Arity::AtLeast(2), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let id = operands[1];

        let attr = match self.module.types.get(ty).clone() {
            TypeData::Int { width, .. } => {
                let bits = literal_bits(op, width, &operands[2..])?;
                Attribute::int(sign_extend(bits, width), ty)
            }
            TypeData::Float(kind) => {
                let bits = literal_bits(op, kind.width(), &operands[2..])?;
                Attribute::Float { bits, ty }
            }
            _ => {
                return Err(ErrorKind::TypeMismatch(format!(
                    "{} must have integer or floating-point type, found {}",
                    op,
                    self.module.types.display(ty)
                )))
            }
        };
        self.define_constant(id, attr, ty, is_spec)
    }

    /// `OpConstantTrue`/`False` and their spec forms
    pub(super) fn process_constant_bool(
        &mut self,
        operands: &[u32],
        value: bool,
        is_spec: bool,
    ) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpConstantTrue/OpConstantFalse", Arity::Exactly(2), operands.len())?;
        let ty = self.type_of(operands[0])?;
        if !matches!(self.module.types.get(ty), TypeData::Bool) {
            return Err(ErrorKind::TypeMismatch(format!(
                "boolean constant must have bool type, found {}",
                self.module.types.display(ty)
            )));
        }
        self.define_constant(operands[1], Attribute::int(i64::from(value), ty), ty, is_spec)
    }

    fn define_constant(&mut self, id: u32, attr: Attribute, ty: Type, is_spec: bool) -> Result<(), ErrorKind> {
        if !is_spec {
            trace!("constant <id> {} = {}", id, attr.display(&self.module.types));
            return self.constants.define(id, (attr, ty));
        }

        let name = self.symbol_name(id, SPEC_CONSTANT_PREFIX);
        trace!("spec constant {} = {}", name, attr.display(&self.module.types));
        self.spec_constants.define(
            id,
            SymbolInfo {
                name: name.clone(),
                ty,
            },
        )?;
        self.module.push(ModuleItem::SpecConstant(SpecConstant {
            name,
            default_value: attr,
            ty,
            attrs: self.decoration_attrs(id),
        }));
        Ok(())
    }

    /// `OpConstantComposite`: type, result, constituent constants
    pub(super) fn process_constant_composite(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpConstantComposite", Arity::AtLeast(3), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let elements = operands[2..]
            .iter()
            .map(|id| {
                self.constants
                    .lookup(*id)
                    .map(|(attr, _)| attr.clone())
                    .ok_or(ErrorKind::UndefinedConstantOperand(*id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let attr = match self.module.types.get(ty) {
            TypeData::Vector { .. } | TypeData::Tensor { .. } => Attribute::Dense { elements, ty },
            TypeData::Array { .. }
            | TypeData::Struct(_)
            | TypeData::Matrix { .. }
            | TypeData::CooperativeMatrix { .. } => Attribute::Array(elements),
            _ => {
                return Err(ErrorKind::TypeMismatch(format!(
                    "unsupported OpConstantComposite type: {}",
                    self.module.types.display(ty)
                )))
            }
        };
        self.constants.define(operands[1], (attr, ty))
    }

    /// `OpConstantCompositeReplicateEXT`: one constituent splatted to every element
    pub(super) fn process_constant_composite_replicate(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpConstantCompositeReplicateEXT", Arity::Exactly(3), operands.len())?;
        let ty = self.type_of(operands[0])?;
        if !is_composite(self.module.types.get(ty)) {
            return Err(ErrorKind::TypeMismatch(format!(
                "unsupported OpConstantCompositeReplicateEXT type: {}",
                self.module.types.display(ty)
            )));
        }
        let (element, _) = self
            .constants
            .lookup(operands[2])
            .cloned()
            .ok_or(ErrorKind::UndefinedConstantOperand(operands[2]))?;
        self.replicated_constants.define(operands[1], (element, ty))
    }

    /// `OpConstantNull`, for scalars and vectors
    pub(super) fn process_constant_null(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpConstantNull", Arity::Exactly(2), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let attr = match self.module.types.get(ty).clone() {
            TypeData::Vector { element, count } => {
                let zero = self.zero_attr(element)?;
                Attribute::Dense {
                    elements: alloc::vec![zero; count as usize],
                    ty,
                }
            }
            _ => self.zero_attr(ty)?,
        };
        self.constants.define(operands[1], (attr, ty))
    }

    fn zero_attr(&self, ty: Type) -> Result<Attribute, ErrorKind> {
        match self.module.types.get(ty) {
            TypeData::Bool | TypeData::Int { .. } => Ok(Attribute::int(0, ty)),
            TypeData::Float(_) => Ok(Attribute::Float { bits: 0, ty }),
            _ => Err(ErrorKind::Unsupported(format!(
                "OpConstantNull of type {}",
                self.module.types.display(ty)
            ))),
        }
    }

    /// `OpSpecConstantComposite`: constituents are spec constants or spec composites
    pub(super) fn process_spec_constant_composite(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpSpecConstantComposite", Arity::AtLeast(3), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let id = operands[1];
        let constituents = operands[2..]
            .iter()
            .map(|id| self.spec_symbol(*id))
            .collect::<Result<Vec<_>, _>>()?;

        let name = self.symbol_name(id, SPEC_CONSTANT_PREFIX);
        self.spec_composites.define(
            id,
            SymbolInfo {
                name: name.clone(),
                ty,
            },
        )?;
        self.module
            .push(ModuleItem::SpecConstantComposite(SpecConstantComposite {
                name,
                ty,
                constituents,
            }));
        Ok(())
    }

    pub(super) fn process_spec_constant_composite_replicate(
        &mut self,
        operands: &[u32],
    ) -> Result<(), ErrorKind> {
        ErrorKind::check_arity(
            "OpSpecConstantCompositeReplicateEXT",
            Arity::Exactly(3),
            operands.len(),
        )?;
        let ty = self.type_of(operands[0])?;
        if !is_composite(self.module.types.get(ty)) {
            return Err(ErrorKind::TypeMismatch(format!(
                "unsupported OpSpecConstantCompositeReplicateEXT type: {}",
                self.module.types.display(ty)
            )));
        }
        let id = operands[1];
        let constituent = self.spec_symbol(operands[2])?;
        let name = self.symbol_name(id, SPEC_CONSTANT_PREFIX);
        self.spec_composites.define(
            id,
            SymbolInfo {
                name: name.clone(),
                ty,
            },
        )?;
        self.module.push(ModuleItem::SpecConstantCompositeReplicate(
            SpecConstantCompositeReplicate {
                name,
                ty,
                constituent,
            },
        ));
        Ok(())
    }

    /// Symbol of a spec constant or spec composite
    fn spec_symbol(&self, id: u32) -> Result<String, ErrorKind> {
        self.spec_constants
            .lookup(id)
            .or_else(|| self.spec_composites.lookup(id))
            .map(|info| info.name.clone())
            .ok_or(ErrorKind::UndefinedReference {
                kind: IdKind::SpecConstant,
                id,
            })
    }

    /// `OpSpecConstantOp`: type, result, wrapped opcode, its operands
    pub(super) fn process_spec_constant_operation(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpSpecConstantOp", Arity::AtLeast(3), operands.len())?;
        self.type_of(operands[0])?;
        self.spec_ops.define(
            operands[1],
            SpecOp {
                opcode: operands[2],
                result_type: operands[0],
                operands: operands[3..].to_vec(),
            },
        )
    }

    pub(super) fn process_undef(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpUndef", Arity::Exactly(2), operands.len())?;
        let ty = self.type_of(operands[0])?;
        self.undefs.define(operands[1], ty)
    }
}

/// Value bits of a one or two word literal of a `width`-bit type
fn literal_bits(op: &'static str, width: u32, words: &[u32]) -> Result<u64, ErrorKind> {
    match (width, words) {
        (0..=32, [low]) => Ok(u64::from(*low)),
        (33..=64, [low, high]) => Ok(join_words(*low, *high)),
        (0..=32, _) => Err(ErrorKind::OperandArityMismatch {
            op,
            expected: Arity::Exactly(3),
            found: words.len() + 2,
        }),
        (33..=64, _) => Err(ErrorKind::OperandArityMismatch {
            op,
            expected: Arity::Exactly(4),
            found: words.len() + 2,
        }),
        _ => Err(ErrorKind::Unsupported(format!(
            "{} of {}-bit type",
            op, width
        ))),
    }
}

fn is_composite(data: &TypeData) -> bool {
    matches!(
        data,
        TypeData::Vector { .. }
            | TypeData::Array { .. }
            | TypeData::Struct(_)
            | TypeData::Matrix { .. }
            | TypeData::CooperativeMatrix { .. }
            | TypeData::Tensor { .. }
    )
}
