//! Data Flow Graph (operation and value data).

use alloc::vec::Vec;

use crate::{
    entity::{Block, Inst},
    entity_map::PrimaryMap,
    types::Type,
    value::{Value, ValueData, ValueDef},
};

pub mod inst_data;
pub mod opcode;

pub use inst_data::{BlockCall, InstData};
pub use opcode::Opcode;

/// Data Flow Graph - stores what operations do and what values are
///
/// Entries are never removed. An erased operation is simply unlinked
/// from the layout; its results become unreachable.
#[derive(Debug, Clone, Default)]
pub struct DataFlowGraph {
    pub insts: PrimaryMap<Inst, InstData>,
    pub values: PrimaryMap<Value, ValueData>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an operation with one fresh result per entry of `result_types`
    ///
    /// Any results already present in `data` are replaced. The operation
    /// is not inserted into the layout.
    pub fn make_inst(&mut self, mut data: InstData, result_types: &[Type]) -> Inst {
        let inst = self.insts.next_key();
        data.results = result_types
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                self.values.push(ValueData {
                    ty: *ty,
                    def: ValueDef::Result(inst, i),
                })
            })
            .collect();
        self.insts.push(data)
    }

    /// Create a new value defined as parameter `index` of `block`
    pub fn make_block_param(&mut self, block: Block, index: usize, ty: Type) -> Value {
        self.values.push(ValueData {
            ty,
            def: ValueDef::Param(block, index),
        })
    }

    pub fn inst_data(&self, inst: Inst) -> &InstData {
        &self.insts[inst]
    }

    pub fn inst_data_mut(&mut self, inst: Inst) -> &mut InstData {
        &mut self.insts[inst]
    }

    pub fn inst_args(&self, inst: Inst) -> &[Value] {
        &self.insts[inst].args
    }

    pub fn inst_results(&self, inst: Inst) -> &[Value] {
        &self.insts[inst].results
    }

    /// Get the single result of an operation, if it has exactly one
    pub fn first_result(&self, inst: Inst) -> Option<Value> {
        match self.inst_results(inst) {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn value_type(&self, value: Value) -> Type {
        self.values[value].ty
    }

    pub fn value_def(&self, value: Value) -> ValueDef {
        self.values[value].def
    }

    /// Types of the given values, in order
    pub fn value_types(&self, values: &[Value]) -> Vec<Type> {
        values.iter().map(|v| self.value_type(*v)).collect()
    }
}
