//! Resolving value `<id>`s inside a function body.
//!
//! Constants, global variable addresses, spec constant references and
//! undefs are materialized as ops at the point of use, once per block.

use alloc::{string::String, vec::Vec};

use lpc_spvir::{
    Attribute, InsertPoint, InstBuilder, InstData, Opcode, Type, Value, ValueDef,
};
use tracing::trace;

use super::{Deserializer, SpecOp};
use crate::{
    error::ErrorKind,
    opcode::Op,
    table::{IdKind, IdTable},
};

/// Result `<id>` given to the instruction wrapped by a spec constant op
/// while it is built
const SPEC_OP_PLACEHOLDER: u32 = u32::MAX - 2;

/// How an `<id>` without a defining op in the body becomes a value
enum Materialize {
    Constant(Attribute, Type),
    Replicate(Attribute, Type),
    AddressOf(String, Type),
    ReferenceOf(String, Type),
    SpecOp(SpecOp),
    Undef(Type),
}

impl Deserializer<'_> {
    /// Value for `id` at the current insertion point
    pub(super) fn get_value(&mut self, id: u32) -> Result<Value, ErrorKind> {
        let state = self.state()?;
        if let Some(value) = state.values.get(id) {
            return Ok(value);
        }
        let block = state.insert_block();
        if let Some(block) = block {
            if let Some(value) = state.materialized.get(&(block, id)) {
                return Ok(*value);
            }
        }

        let what = self.materialization(id)?;
        let Some(block) = block else {
            return Err(ErrorKind::UnhandledInstruction(String::from(
                "constant use outside of a block",
            )));
        };
        let value = self.materialize(what)?;
        trace!("materialized <id> {} as {} in {}", id, value, block);
        self.state()?.materialized.insert((block, id), value);
        Ok(value)
    }

    /// Values for a list of `<id>`s, in order
    pub(super) fn get_values(&mut self, ids: &[u32]) -> Result<Vec<Value>, ErrorKind> {
        ids.iter().map(|id| self.get_value(*id)).collect()
    }

    fn materialization(&self, id: u32) -> Result<Materialize, ErrorKind> {
        if let Some((attr, ty)) = self.constants.lookup(id) {
            return Ok(Materialize::Constant(attr.clone(), *ty));
        }
        if let Some((attr, ty)) = self.replicated_constants.lookup(id) {
            return Ok(Materialize::Replicate(attr.clone(), *ty));
        }
        if let Some(var) = self.global_vars.lookup(id) {
            return Ok(Materialize::AddressOf(var.name.clone(), var.ty));
        }
        if let Some(spec) = self
            .spec_constants
            .lookup(id)
            .or_else(|| self.spec_composites.lookup(id))
        {
            return Ok(Materialize::ReferenceOf(spec.name.clone(), spec.ty));
        }
        if let Some(op) = self.spec_ops.lookup(id) {
            return Ok(Materialize::SpecOp(op.clone()));
        }
        if let Some(ty) = self.undefs.get(id) {
            return Ok(Materialize::Undef(ty));
        }
        Err(ErrorKind::UndefinedReference {
            kind: IdKind::Value,
            id,
        })
    }

    fn materialize(&mut self, what: Materialize) -> Result<Value, ErrorKind> {
        Ok(match what {
            Materialize::Constant(attr, ty) => self.ins()?.constant(attr, ty),
            Materialize::Replicate(attr, ty) => self.ins()?.constant_composite_replicate(attr, ty),
            Materialize::AddressOf(name, ty) => self.ins()?.address_of(name, ty),
            Materialize::ReferenceOf(name, ty) => self.ins()?.reference_of(name, ty),
            Materialize::Undef(ty) => self.ins()?.undef(ty),
            Materialize::SpecOp(op) => return self.materialize_spec_op(op),
        })
    }

    /// Build a `spirv.SpecConstantOperation` around the wrapped instruction
    ///
    /// The wrapped instruction is read with the normal op handlers under a
    /// placeholder result `<id>`, then moved into the body of the new op,
    /// followed by a yield of its result.
    fn materialize_spec_op(&mut self, spec: SpecOp) -> Result<Value, ErrorKind> {
        let op = Op::from_u32(spec.opcode).ok_or(ErrorKind::UnknownOpcode(spec.opcode))?;
        let mut words = Vec::with_capacity(spec.operands.len() + 2);
        words.push(spec.result_type);
        words.push(SPEC_OP_PLACEHOLDER);
        words.extend_from_slice(&spec.operands);

        // Operands may only name module-level constants, never SSA values of
        // the enclosing function
        let mut spec_values = IdTable::new(IdKind::Value);
        core::mem::swap(&mut self.state()?.values, &mut spec_values);
        let result = self.process_op(op, &words);
        let state = self.state()?;
        core::mem::swap(&mut state.values, &mut spec_values);
        result?;

        let inner_value = spec_values.remove(SPEC_OP_PLACEHOLDER).ok_or_else(|| {
            ErrorKind::MalformedInstruction(String::from(
                "OpSpecConstantOp must wrap an instruction with a result",
            ))
        })?;
        let ValueDef::Result(inner, _) = state.func.dfg.value_def(inner_value) else {
            return Err(ErrorKind::MalformedInstruction(String::from(
                "OpSpecConstantOp must wrap an instruction with a result",
            )));
        };
        state.func.remove_inst(inner);

        let ty = state.func.dfg.value_type(inner_value);
        let outer = state
            .func
            .ins(state.insert_point)
            .op(InstData::new(Opcode::SpecConstantOperation), &[ty]);
        let region = state.func.make_region(Some(outer));
        state.func.dfg.inst_data_mut(outer).regions.push(region);
        let body = state.func.create_block();
        state.func.append_block_to(region, body);
        state.func.append_inst(inner, body);
        state.func.ins(InsertPoint::End(body)).yield_value(inner_value);

        Ok(state.func.dfg.inst_results(outer)[0])
    }
}
