//! Linked list nodes for regions, blocks and instructions.

use crate::{
    entity::{Block, Inst, Region},
    layout::packed_option::PackedOption,
};

/// Layout of a region: its owning instruction and its block list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionNode {
    /// Instruction that owns this region, none for a function body
    pub parent: PackedOption<Inst>,
    pub first_block: PackedOption<Block>,
    pub last_block: PackedOption<Block>,
}

/// Position of a block inside its region, plus its instruction list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockNode {
    /// Region currently holding this block, none when detached
    pub region: PackedOption<Region>,
    pub prev: PackedOption<Block>,
    pub next: PackedOption<Block>,
    pub first_inst: PackedOption<Inst>,
    pub last_inst: PackedOption<Inst>,
}

impl BlockNode {
    /// Check if this block has no instructions
    pub fn is_empty(&self) -> bool {
        self.first_inst.is_none()
    }
}

/// Position of an instruction inside its block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstNode {
    /// Block currently holding this instruction, none when detached
    pub block: PackedOption<Block>,
    pub prev: PackedOption<Inst>,
    pub next: PackedOption<Inst>,
}
