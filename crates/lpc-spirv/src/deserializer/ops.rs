//! Instructions inside function bodies that become plain ops.
//!
//! Most of them share one of a few operand shapes and go through
//! `generic_op`; calls, memory access, variables and barriers carry
//! literal or enumerant operands and have their own handlers.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::{
    AttrDict, Attribute, EnumAttr, InsertPoint, Inst, InstBuilder, MemoryAccess, Opcode,
    StorageClass, Type, Value,
};
use tracing::trace;

use super::{decode_enum, module_info::FUNCTION_PREFIX, Deserializer};
use crate::{
    error::{Arity, ErrorKind},
    opcode::Op,
};

/// Operand layout after the result type and result `<id>`
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// Exactly this many value operands
    Values(usize),
    /// At least this many value operands
    Variadic(usize),
    /// Value operands followed by at least one literal, stored under `attr`
    Literals { values: usize, attr: &'static str },
}

fn generic_op(op: Op) -> Option<(Opcode, Shape)> {
    use Shape::*;
    Some(match op {
        Op::AccessChain => (Opcode::AccessChain, Variadic(1)),
        Op::PtrAccessChain => (Opcode::PtrAccessChain, Variadic(2)),
        Op::InBoundsPtrAccessChain => (Opcode::InBoundsPtrAccessChain, Variadic(2)),

        Op::CompositeConstruct => (Opcode::CompositeConstruct, Variadic(0)),
        Op::CompositeExtract => (
            Opcode::CompositeExtract,
            Literals {
                values: 1,
                attr: "indices",
            },
        ),
        Op::CompositeInsert => (
            Opcode::CompositeInsert,
            Literals {
                values: 2,
                attr: "indices",
            },
        ),
        Op::VectorShuffle => (
            Opcode::VectorShuffle,
            Literals {
                values: 2,
                attr: "components",
            },
        ),
        Op::VectorExtractDynamic => (Opcode::VectorExtractDynamic, Values(2)),
        Op::VectorInsertDynamic => (Opcode::VectorInsertDynamic, Values(3)),
        Op::VectorTimesScalar => (Opcode::VectorTimesScalar, Values(2)),
        Op::MatrixTimesScalar => (Opcode::MatrixTimesScalar, Values(2)),
        Op::MatrixTimesVector => (Opcode::MatrixTimesVector, Values(2)),
        Op::MatrixTimesMatrix => (Opcode::MatrixTimesMatrix, Values(2)),
        Op::Transpose => (Opcode::Transpose, Values(1)),
        Op::Dot => (Opcode::Dot, Values(2)),
        Op::CopyObject => (Opcode::CopyObject, Values(1)),

        Op::ConvertFToU => (Opcode::ConvertFToU, Values(1)),
        Op::ConvertFToS => (Opcode::ConvertFToS, Values(1)),
        Op::ConvertSToF => (Opcode::ConvertSToF, Values(1)),
        Op::ConvertUToF => (Opcode::ConvertUToF, Values(1)),
        Op::UConvert => (Opcode::UConvert, Values(1)),
        Op::SConvert => (Opcode::SConvert, Values(1)),
        Op::FConvert => (Opcode::FConvert, Values(1)),
        Op::Bitcast => (Opcode::Bitcast, Values(1)),

        Op::SNegate => (Opcode::SNegate, Values(1)),
        Op::FNegate => (Opcode::FNegate, Values(1)),
        Op::IAdd => (Opcode::IAdd, Values(2)),
        Op::FAdd => (Opcode::FAdd, Values(2)),
        Op::ISub => (Opcode::ISub, Values(2)),
        Op::FSub => (Opcode::FSub, Values(2)),
        Op::IMul => (Opcode::IMul, Values(2)),
        Op::FMul => (Opcode::FMul, Values(2)),
        Op::UDiv => (Opcode::UDiv, Values(2)),
        Op::SDiv => (Opcode::SDiv, Values(2)),
        Op::FDiv => (Opcode::FDiv, Values(2)),
        Op::UMod => (Opcode::UMod, Values(2)),
        Op::SRem => (Opcode::SRem, Values(2)),
        Op::SMod => (Opcode::SMod, Values(2)),
        Op::FRem => (Opcode::FRem, Values(2)),
        Op::FMod => (Opcode::FMod, Values(2)),
        Op::IsNan => (Opcode::IsNan, Values(1)),
        Op::IsInf => (Opcode::IsInf, Values(1)),

        Op::LogicalEqual => (Opcode::LogicalEqual, Values(2)),
        Op::LogicalNotEqual => (Opcode::LogicalNotEqual, Values(2)),
        Op::LogicalOr => (Opcode::LogicalOr, Values(2)),
        Op::LogicalAnd => (Opcode::LogicalAnd, Values(2)),
        Op::LogicalNot => (Opcode::LogicalNot, Values(1)),
        Op::Select => (Opcode::Select, Values(3)),

        Op::IEqual => (Opcode::IEqual, Values(2)),
        Op::INotEqual => (Opcode::INotEqual, Values(2)),
        Op::UGreaterThan => (Opcode::UGreaterThan, Values(2)),
        Op::SGreaterThan => (Opcode::SGreaterThan, Values(2)),
        Op::UGreaterThanEqual => (Opcode::UGreaterThanEqual, Values(2)),
        Op::SGreaterThanEqual => (Opcode::SGreaterThanEqual, Values(2)),
        Op::ULessThan => (Opcode::ULessThan, Values(2)),
        Op::SLessThan => (Opcode::SLessThan, Values(2)),
        Op::ULessThanEqual => (Opcode::ULessThanEqual, Values(2)),
        Op::SLessThanEqual => (Opcode::SLessThanEqual, Values(2)),
        Op::FOrdEqual => (Opcode::FOrdEqual, Values(2)),
        Op::FUnordEqual => (Opcode::FUnordEqual, Values(2)),
        Op::FOrdNotEqual => (Opcode::FOrdNotEqual, Values(2)),
        Op::FUnordNotEqual => (Opcode::FUnordNotEqual, Values(2)),
        Op::FOrdLessThan => (Opcode::FOrdLessThan, Values(2)),
        Op::FUnordLessThan => (Opcode::FUnordLessThan, Values(2)),
        Op::FOrdGreaterThan => (Opcode::FOrdGreaterThan, Values(2)),
        Op::FUnordGreaterThan => (Opcode::FUnordGreaterThan, Values(2)),
        Op::FOrdLessThanEqual => (Opcode::FOrdLessThanEqual, Values(2)),
        Op::FUnordLessThanEqual => (Opcode::FUnordLessThanEqual, Values(2)),
        Op::FOrdGreaterThanEqual => (Opcode::FOrdGreaterThanEqual, Values(2)),
        Op::FUnordGreaterThanEqual => (Opcode::FUnordGreaterThanEqual, Values(2)),

        Op::ShiftRightLogical => (Opcode::ShiftRightLogical, Values(2)),
        Op::ShiftRightArithmetic => (Opcode::ShiftRightArithmetic, Values(2)),
        Op::ShiftLeftLogical => (Opcode::ShiftLeftLogical, Values(2)),
        Op::BitwiseOr => (Opcode::BitwiseOr, Values(2)),
        Op::BitwiseXor => (Opcode::BitwiseXor, Values(2)),
        Op::BitwiseAnd => (Opcode::BitwiseAnd, Values(2)),
        Op::Not => (Opcode::Not, Values(1)),
        Op::BitFieldInsert => (Opcode::BitFieldInsert, Values(4)),
        Op::BitFieldSExtract => (Opcode::BitFieldSExtract, Values(3)),
        Op::BitFieldUExtract => (Opcode::BitFieldUExtract, Values(3)),
        Op::BitReverse => (Opcode::BitReverse, Values(1)),
        Op::BitCount => (Opcode::BitCount, Values(1)),

        _ => return None,
    })
}

impl Deserializer<'_> {
    /// Dispatch an instruction that becomes an op in the current block
    pub(super) fn process_op(&mut self, op: Op, operands: &[u32]) -> Result<(), ErrorKind> {
        self.block_insert_point(op)?;
        match op {
            Op::FunctionCall => self.process_function_call(operands),
            Op::ExtInst => self.process_ext_inst(operands),
            Op::Variable => self.process_local_variable(operands),
            Op::Load => self.process_load(operands),
            Op::Store => self.process_store(operands),
            Op::CopyMemory => self.process_copy_memory(operands),
            Op::ControlBarrier => self.process_barrier(op, operands),
            Op::MemoryBarrier => self.process_barrier(op, operands),
            Op::Return | Op::Unreachable | Op::Kill => {
                ErrorKind::check_arity(op.name(), Arity::Exactly(0), operands.len())?;
                let opcode = match op {
                    Op::Return => Opcode::Return,
                    Op::Unreachable => Opcode::Unreachable,
                    _ => Opcode::Kill,
                };
                self.build(opcode, Vec::new(), AttrDict::new(), None)?;
                self.end_block();
                Ok(())
            }
            Op::ReturnValue => {
                ErrorKind::check_arity("OpReturnValue", Arity::Exactly(1), operands.len())?;
                let value = self.get_value(operands[0])?;
                let loc = self.current_location();
                self.ins()?.at_loc(loc).return_value(value);
                self.end_block();
                Ok(())
            }
            _ => match generic_op(op) {
                Some((opcode, shape)) => self.process_generic(op, opcode, shape, operands),
                None => Err(ErrorKind::UnhandledInstruction(String::from(op.name()))),
            },
        }
    }

    fn process_generic(
        &mut self,
        op: Op,
        opcode: Opcode,
        shape: Shape,
        operands: &[u32],
    ) -> Result<(), ErrorKind> {
        let (arity, values) = match shape {
            Shape::Values(n) => (Arity::Exactly(n + 2), n),
            Shape::Variadic(n) => (Arity::AtLeast(n + 2), operands.len().saturating_sub(2)),
            Shape::Literals { values, .. } => (Arity::AtLeast(values + 3), values),
        };
        ErrorKind::check_arity(op.name(), arity, operands.len())?;
        let ty = self.type_of(operands[0])?;
        let id = operands[1];
        let args = self.get_values(&operands[2..2 + values])?;

        let mut attrs = self.decoration_attrs(id);
        if let Shape::Literals { attr, .. } = shape {
            let literals = operands[2 + values..]
                .iter()
                .map(|word| Attribute::Literal(*word))
                .collect();
            attrs.set(attr, Attribute::Array(literals));
        }
        let inst = self.build(opcode, args, attrs, Some(ty))?;
        self.define_result(id, inst)
    }

    /// Build an op at the current insertion point and source location
    pub(super) fn build(
        &mut self,
        opcode: Opcode,
        args: Vec<Value>,
        attrs: AttrDict,
        result_type: Option<Type>,
    ) -> Result<Inst, ErrorKind> {
        let loc = self.current_location();
        Ok(self.ins()?.at_loc(loc).generic(opcode, args, attrs, result_type))
    }

    fn define_result(&mut self, id: u32, inst: Inst) -> Result<(), ErrorKind> {
        let state = self.state()?;
        let Some(value) = state.func.dfg.first_result(inst) else {
            return Ok(());
        };
        trace!("<id> {} = {}", id, value);
        state.values.define(id, value)
    }

    /// Terminators end the current block and the active debug line
    pub(super) fn end_block(&mut self) {
        self.clear_debug_line();
        if let Some(state) = self.func.as_mut() {
            state.insert_point = InsertPoint::Nowhere;
        }
    }

    /// Result type, or none for `void`
    fn result_type(&self, id: u32) -> Result<Option<Type>, ErrorKind> {
        let ty = self.type_of(id)?;
        Ok((!self.module.types.is_void(ty)).then_some(ty))
    }

    /// Symbol of a function, which may not be defined yet
    fn function_symbol(&self, id: u32) -> String {
        match self.functions.lookup(id) {
            Some(info) => info.name.clone(),
            None => self.symbol_name(id, FUNCTION_PREFIX),
        }
    }

    /// `OpFunctionCall`: result type, result, function, arguments
    fn process_function_call(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpFunctionCall", Arity::AtLeast(3), operands.len())?;
        let result_type = self.result_type(operands[0])?;
        let id = operands[1];
        let callee = self.function_symbol(operands[2]);
        let args = self.get_values(&operands[3..])?;

        let mut attrs = self.decoration_attrs(id);
        attrs.set("callee", Attribute::SymbolRef(callee));
        let inst = self.build(Opcode::FunctionCall, args, attrs, result_type)?;
        self.define_result(id, inst)
    }

    /// `OpExtInst`: result type, result, set, instruction number, operands
    fn process_ext_inst(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpExtInst", Arity::AtLeast(4), operands.len())?;
        let result_type = self.result_type(operands[0])?;
        let id = operands[1];
        let set = self.ext_inst_sets.require(operands[2])?.clone();
        let args = self.get_values(&operands[4..])?;

        let mut attrs = self.decoration_attrs(id);
        attrs.set("set", Attribute::String(set));
        attrs.set("instruction", Attribute::Literal(operands[3]));
        let inst = self.build(Opcode::ExtInst, args, attrs, result_type)?;
        self.define_result(id, inst)
    }

    /// `OpVariable` inside a function: pointer type, result, storage class,
    /// optional initializer value
    fn process_local_variable(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpVariable", Arity::Between(3, 4), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let id = operands[1];
        let storage = decode_enum("storage class", operands[2], StorageClass::from_u32)?;
        match self.module.types.pointee(ty) {
            Some((_, pointer_storage)) if pointer_storage == storage => {}
            _ => {
                return Err(ErrorKind::TypeMismatch(format!(
                    "OpVariable storage class {} does not match its type {}",
                    storage,
                    self.module.types.display(ty)
                )))
            }
        }
        let args = self.get_values(&operands[3..])?;

        let mut attrs = self.decoration_attrs(id);
        attrs.set("storage_class", Attribute::Enum(EnumAttr::StorageClass(storage)));
        let inst = self.build(Opcode::Variable, args, attrs, Some(ty))?;
        self.define_result(id, inst)
    }

    /// `OpLoad`: result type, result, pointer, optional memory operands
    fn process_load(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpLoad", Arity::AtLeast(3), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let id = operands[1];
        let ptr = self.get_value(operands[2])?;

        let mut attrs = self.decoration_attrs(id);
        let used = memory_operands(&operands[3..], &mut attrs, "memory_access", "alignment")?;
        expect_consumed("OpLoad", &operands[3..], used)?;
        let inst = self.build(Opcode::Load, Vec::from([ptr]), attrs, Some(ty))?;
        self.define_result(id, inst)
    }

    /// `OpStore`: pointer, object, optional memory operands
    fn process_store(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpStore", Arity::AtLeast(2), operands.len())?;
        let args = self.get_values(&operands[..2])?;
        let mut attrs = AttrDict::new();
        let used = memory_operands(&operands[2..], &mut attrs, "memory_access", "alignment")?;
        expect_consumed("OpStore", &operands[2..], used)?;
        self.build(Opcode::Store, args, attrs, None)?;
        Ok(())
    }

    /// `OpCopyMemory`: target, source, memory operands for the target and
    /// then for the source
    fn process_copy_memory(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpCopyMemory", Arity::AtLeast(2), operands.len())?;
        let args = self.get_values(&operands[..2])?;
        let mut attrs = AttrDict::new();
        let rest = &operands[2..];
        let used = memory_operands(rest, &mut attrs, "memory_access", "alignment")?;
        let source = memory_operands(
            &rest[used..],
            &mut attrs,
            "source_memory_access",
            "source_alignment",
        )?;
        expect_consumed("OpCopyMemory", rest, used + source)?;
        self.build(Opcode::CopyMemory, args, attrs, None)?;
        Ok(())
    }

    /// `OpControlBarrier` and `OpMemoryBarrier`: scopes and semantics are
    /// constant `<id>`s
    fn process_barrier(&mut self, op: Op, operands: &[u32]) -> Result<(), ErrorKind> {
        const CONTROL: &[&str] = &["execution_scope", "memory_scope", "memory_semantics"];
        const MEMORY: &[&str] = &["memory_scope", "memory_semantics"];
        let (opcode, names) = match op {
            Op::ControlBarrier => (Opcode::ControlBarrier, CONTROL),
            _ => (Opcode::MemoryBarrier, MEMORY),
        };
        ErrorKind::check_arity(op.name(), Arity::Exactly(names.len()), operands.len())?;
        let mut attrs = AttrDict::new();
        for (name, id) in names.iter().zip(operands) {
            attrs.set(*name, Attribute::Literal(self.constant_u32(*id)?));
        }
        self.build(opcode, Vec::new(), attrs, None)?;
        Ok(())
    }
}

/// Read a memory access mask and its alignment literal into `attrs`,
/// returning the number of words used
fn memory_operands(
    words: &[u32],
    attrs: &mut AttrDict,
    access: &str,
    alignment: &str,
) -> Result<usize, ErrorKind> {
    let Some(mask) = words.first() else {
        return Ok(0);
    };
    let mask = decode_enum("memory access", *mask, MemoryAccess::from_bits)?;
    attrs.set(access, Attribute::Enum(EnumAttr::MemoryAccess(mask)));
    if !mask.contains(MemoryAccess::Aligned) {
        return Ok(1);
    }
    let Some(align) = words.get(1) else {
        return Err(ErrorKind::MalformedInstruction(String::from(
            "missing alignment value",
        )));
    };
    attrs.set(alignment, Attribute::Literal(*align));
    Ok(2)
}

fn expect_consumed(op: &str, words: &[u32], used: usize) -> Result<(), ErrorKind> {
    if used == words.len() {
        Ok(())
    } else {
        Err(ErrorKind::MalformedInstruction(format!(
            "found more operands than expected when deserializing {}",
            op
        )))
    }
}
