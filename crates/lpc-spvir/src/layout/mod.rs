//! Function layout (region, block and instruction ordering).
//!
//! The layout tracks WHERE things are: which blocks a region holds and in
//! which order, and which instructions a block holds. Every list is doubly
//! linked so insertion, removal and splitting are O(1). What an instruction
//! does lives in the DFG.

use crate::{
    entity::{Block, Inst, Region},
    entity_map::{PrimaryMap, SecondaryMap},
    layout::{
        nodes::{BlockNode, InstNode, RegionNode},
        packed_option::PackedOption,
    },
};

pub mod nodes;
pub mod packed_option;

/// Layout manages the ordering of regions, blocks and instructions
#[derive(Debug, Clone, Default)]
pub struct Layout {
    regions: PrimaryMap<Region, RegionNode>,
    blocks: SecondaryMap<Block, BlockNode>,
    insts: SecondaryMap<Inst, InstNode>,
}

impl Layout {
    /// Create a new empty layout
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Region operations
    // ========================================================================

    /// Allocate a new, empty region owned by `parent`
    pub fn make_region(&mut self, parent: Option<Inst>) -> Region {
        self.regions.push(RegionNode {
            parent: parent.into(),
            ..RegionNode::default()
        })
    }

    /// Get the instruction owning a region
    pub fn region_parent(&self, region: Region) -> Option<Inst> {
        self.regions.get(region)?.parent.expand()
    }

    /// Change the instruction owning a region
    pub fn set_region_parent(&mut self, region: Region, parent: Option<Inst>) {
        self.regions[region].parent = parent.into();
    }

    /// Get the first block of a region
    pub fn first_block(&self, region: Region) -> Option<Block> {
        self.regions.get(region)?.first_block.expand()
    }

    /// Get the last block of a region
    pub fn last_block(&self, region: Region) -> Option<Block> {
        self.regions.get(region)?.last_block.expand()
    }

    /// Iterate over the blocks of a region in order
    pub fn region_blocks(&self, region: Region) -> Blocks<'_> {
        Blocks {
            layout: self,
            next: self.first_block(region),
        }
    }

    /// Check whether a region has no blocks
    pub fn region_is_empty(&self, region: Region) -> bool {
        self.first_block(region).is_none()
    }

    /// Move every block of `from` to the end of `to`
    pub fn move_region_blocks(&mut self, from: Region, to: Region) {
        let moved: alloc::vec::Vec<Block> = self.region_blocks(from).collect();
        for block in moved {
            self.remove_block(block);
            self.append_block(to, block);
        }
    }

    // ========================================================================
    // Block operations
    // ========================================================================

    /// Check if a block is currently inserted in some region
    pub fn is_block_inserted(&self, block: Block) -> bool {
        self.block_region(block).is_some()
    }

    /// Get the region holding a block
    pub fn block_region(&self, block: Block) -> Option<Region> {
        self.blocks.get(block)?.region.expand()
    }

    /// Get the instruction owning the region that holds `block`
    pub fn block_parent_inst(&self, block: Block) -> Option<Inst> {
        self.region_parent(self.block_region(block)?)
    }

    /// Append a block to the end of a region
    pub fn append_block(&mut self, region: Region, block: Block) {
        debug_assert!(!self.is_block_inserted(block), "block already inserted");

        let last = self.regions[region].last_block;
        {
            let node = &mut self.blocks[block];
            node.region = region.into();
            node.prev = last;
            node.next = PackedOption::none();
        }
        match last.expand() {
            Some(last) => self.blocks[last].next = block.into(),
            None => self.regions[region].first_block = block.into(),
        }
        self.regions[region].last_block = block.into();
    }

    /// Insert a block before another block, in the same region
    pub fn insert_block(&mut self, block: Block, before: Block) {
        debug_assert!(!self.is_block_inserted(block), "block already inserted");
        let region = self.blocks[before].region;
        debug_assert!(region.is_some(), "insertion point must be in the layout");

        let after = self.blocks[before].prev;
        {
            let node = &mut self.blocks[block];
            node.region = region;
            node.next = before.into();
            node.prev = after;
        }
        self.blocks[before].prev = block.into();
        match after.expand() {
            Some(a) => self.blocks[a].next = block.into(),
            None => {
                if let Some(region) = region.expand() {
                    self.regions[region].first_block = block.into();
                }
            }
        }
    }

    /// Insert a block after another block, in the same region
    pub fn insert_block_after(&mut self, block: Block, after: Block) {
        match self.next_block(after) {
            Some(next) => self.insert_block(block, next),
            None => {
                if let Some(region) = self.block_region(after) {
                    self.append_block(region, block);
                }
            }
        }
    }

    /// Unlink a block from its region
    ///
    /// The block keeps its instructions.
    pub fn remove_block(&mut self, block: Block) {
        let Some(region) = self.block_region(block) else {
            return;
        };
        let prev = self.blocks[block].prev;
        let next = self.blocks[block].next;
        {
            let node = &mut self.blocks[block];
            node.region = PackedOption::none();
            node.prev = PackedOption::none();
            node.next = PackedOption::none();
        }
        match prev.expand() {
            Some(p) => self.blocks[p].next = next,
            None => self.regions[region].first_block = next,
        }
        match next.expand() {
            Some(n) => self.blocks[n].prev = prev,
            None => self.regions[region].last_block = prev,
        }
    }

    /// Get the block preceding `block` in its region
    pub fn prev_block(&self, block: Block) -> Option<Block> {
        self.blocks.get(block)?.prev.expand()
    }

    /// Get the block following `block` in its region
    pub fn next_block(&self, block: Block) -> Option<Block> {
        self.blocks.get(block)?.next.expand()
    }

    // ========================================================================
    // Instruction operations
    // ========================================================================

    /// Get the block containing an instruction
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.insts.get(inst)?.block.expand()
    }

    /// Check if an instruction is currently inserted in some block
    pub fn is_inst_inserted(&self, inst: Inst) -> bool {
        self.inst_block(inst).is_some()
    }

    /// Append an instruction to the end of a block
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        debug_assert!(!self.is_inst_inserted(inst), "instruction already inserted");

        let last = self.blocks[block].last_inst;
        {
            let node = &mut self.insts[inst];
            node.block = block.into();
            node.prev = last;
            node.next = PackedOption::none();
        }
        match last.expand() {
            Some(last) => self.insts[last].next = inst.into(),
            None => self.blocks[block].first_inst = inst.into(),
        }
        self.blocks[block].last_inst = inst.into();
    }

    /// Insert an instruction before another instruction
    pub fn insert_inst(&mut self, inst: Inst, before: Inst) {
        debug_assert!(!self.is_inst_inserted(inst), "instruction already inserted");
        let block = self.insts[before].block;
        debug_assert!(block.is_some(), "insertion point must be in the layout");

        let after = self.insts[before].prev;
        {
            let node = &mut self.insts[inst];
            node.block = block;
            node.next = before.into();
            node.prev = after;
        }
        self.insts[before].prev = inst.into();
        match after.expand() {
            Some(a) => self.insts[a].next = inst.into(),
            None => {
                if let Some(block) = block.expand() {
                    self.blocks[block].first_inst = inst.into();
                }
            }
        }
    }

    /// Unlink an instruction from its block
    pub fn remove_inst(&mut self, inst: Inst) {
        let Some(block) = self.inst_block(inst) else {
            return;
        };
        let prev = self.insts[inst].prev;
        let next = self.insts[inst].next;
        {
            let node = &mut self.insts[inst];
            node.block = PackedOption::none();
            node.prev = PackedOption::none();
            node.next = PackedOption::none();
        }
        match prev.expand() {
            Some(p) => self.insts[p].next = next,
            None => self.blocks[block].first_inst = next,
        }
        match next.expand() {
            Some(n) => self.insts[n].prev = prev,
            None => self.blocks[block].last_inst = prev,
        }
    }

    /// Get the first instruction in a block
    pub fn first_inst(&self, block: Block) -> Option<Inst> {
        self.blocks.get(block)?.first_inst.expand()
    }

    /// Get the last instruction in a block
    pub fn last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks.get(block)?.last_inst.expand()
    }

    /// Get the instruction following `inst`
    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts.get(inst)?.next.expand()
    }

    /// Get the instruction preceding `inst`
    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts.get(inst)?.prev.expand()
    }

    /// Check if a block holds no instructions
    pub fn block_is_empty(&self, block: Block) -> bool {
        self.blocks.get(block).map(BlockNode::is_empty).unwrap_or(true)
    }

    /// Get an iterator over instructions in a block
    pub fn block_insts(&self, block: Block) -> Insts<'_> {
        Insts {
            layout: self,
            head: self.first_inst(block),
            tail: self.last_inst(block),
        }
    }

    /// Split the block containing `before` in two
    ///
    /// `new_block` is inserted right after the old block and receives
    /// `before` and every following instruction.
    pub fn split_block(&mut self, new_block: Block, before: Inst) {
        let Some(old_block) = self.inst_block(before) else {
            return;
        };
        debug_assert!(!self.is_block_inserted(new_block));
        self.insert_block_after(new_block, old_block);

        let last_inst = self.blocks[old_block].last_inst;
        let prev_inst = self.insts[before].prev;
        self.insts[before].prev = PackedOption::none();
        self.blocks[old_block].last_inst = prev_inst;
        match prev_inst.expand() {
            Some(pi) => self.insts[pi].next = PackedOption::none(),
            None => self.blocks[old_block].first_inst = PackedOption::none(),
        }
        self.blocks[new_block].first_inst = before.into();
        self.blocks[new_block].last_inst = last_inst;

        let mut cursor = Some(before);
        while let Some(inst) = cursor {
            self.insts[inst].block = new_block.into();
            cursor = self.insts[inst].next.expand();
        }
    }

    /// Start tracking a block created by the function, detached
    pub(crate) fn ensure_block(&mut self, block: Block) {
        self.blocks.ensure(block);
    }

    /// Start tracking an instruction created by the DFG, detached
    pub(crate) fn ensure_inst(&mut self, inst: Inst) {
        self.insts.ensure(inst);
    }
}

/// Iterator over the blocks of a region
pub struct Blocks<'a> {
    layout: &'a Layout,
    next: Option<Block>,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let block = self.next?;
        self.next = self.layout.next_block(block);
        Some(block)
    }
}

/// Double-ended iterator over the instructions of a block
pub struct Insts<'a> {
    layout: &'a Layout,
    head: Option<Inst>,
    tail: Option<Inst>,
}

impl Iterator for Insts<'_> {
    type Item = Inst;

    fn next(&mut self) -> Option<Inst> {
        let inst = self.head?;
        if self.head == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            self.head = self.layout.next_inst(inst);
        }
        Some(inst)
    }
}

impl DoubleEndedIterator for Insts<'_> {
    fn next_back(&mut self) -> Option<Inst> {
        let inst = self.tail?;
        if self.head == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            self.tail = self.layout.prev_inst(inst);
        }
        Some(inst)
    }
}
