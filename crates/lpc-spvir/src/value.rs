//! SSA values.

use crate::{
    entity::{entity_impl, Block, Inst},
    types::Type,
};

entity_impl!(
    /// An SSA value: either an instruction result or a block parameter.
    Value,
    "v"
);

/// Where a value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// The `n`th result of an instruction
    Result(Inst, usize),
    /// The `n`th parameter of a block
    Param(Block, usize),
}

impl ValueDef {
    /// The defining instruction, if this is a result
    pub fn inst(self) -> Option<Inst> {
        match self {
            ValueDef::Result(inst, _) => Some(inst),
            ValueDef::Param(..) => None,
        }
    }

    /// The defining block, if this is a block parameter
    pub fn block(self) -> Option<Block> {
        match self {
            ValueDef::Param(block, _) => Some(block),
            ValueDef::Result(..) => None,
        }
    }
}

/// Per-value data: its type and definition point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueData {
    pub ty: Type,
    pub def: ValueDef,
}
