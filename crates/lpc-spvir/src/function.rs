//! Functions.

use alloc::{string::String, vec::Vec};

use crate::{
    attribute::AttrDict,
    block::BlockData,
    builder::{CursorInserter, InsertBuilder, InsertPoint},
    dfg::{DataFlowGraph, InstData},
    entity::{Block, Inst, Region},
    entity_map::PrimaryMap,
    enums::FunctionControl,
    layout::Layout,
    sourceloc::Location,
    types::Type,
    value::Value,
};

/// A function in the IR
///
/// A function consists of:
/// - A name, a function type and function control bits
/// - Block data (block parameters)
/// - Layout (which region holds which blocks, which block holds which ops)
/// - DFG (what operations and values are)
///
/// The parameters of the body's entry block are the function arguments.
/// A function whose body has no blocks is a declaration.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    /// Function type, see `TypeStore::function_signature`
    pub ty: Type,
    pub control: FunctionControl,
    /// Function-level attributes, including decorations
    pub attrs: AttrDict,
    /// Per-argument attributes, one dictionary per parameter
    pub arg_attrs: Vec<AttrDict>,
    pub loc: Location,
    pub blocks: PrimaryMap<Block, BlockData>,
    pub layout: Layout,
    pub dfg: DataFlowGraph,
    /// Top-level region
    pub body: Region,
}

impl Function {
    pub fn new(name: String, ty: Type, control: FunctionControl) -> Self {
        let mut layout = Layout::new();
        let body = layout.make_region(None);
        Self {
            name,
            ty,
            control,
            attrs: AttrDict::new(),
            arg_attrs: Vec::new(),
            loc: Location::Unknown,
            blocks: PrimaryMap::new(),
            layout,
            dfg: DataFlowGraph::new(),
            body,
        }
    }

    /// Check whether this function has no body
    pub fn is_declaration(&self) -> bool {
        self.layout.region_is_empty(self.body)
    }

    /// Get the function arguments, the entry block's parameters
    pub fn args(&self) -> &[Value] {
        match self.entry_block() {
            Some(entry) => self.block_params(entry),
            None => &[],
        }
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Create a new block and return its entity
    ///
    /// The block is not placed in any region yet.
    pub fn create_block(&mut self) -> Block {
        let block = self.blocks.push(BlockData::new());
        self.layout.ensure_block(block);
        block
    }

    /// Append a block to the function body
    pub fn append_block(&mut self, block: Block) {
        self.layout.append_block(self.body, block);
    }

    /// Append a block to the end of `region`
    pub fn append_block_to(&mut self, region: Region, block: Block) {
        self.layout.append_block(region, block);
    }

    /// Insert a block before another block of the same region
    pub fn insert_block(&mut self, block: Block, before: Block) {
        self.layout.insert_block(block, before);
    }

    /// Get the entry block (first block of the body)
    pub fn entry_block(&self) -> Option<Block> {
        self.layout.first_block(self.body)
    }

    /// Check whether `block` is the entry block of the function body
    pub fn is_entry_block(&self, block: Block) -> bool {
        self.entry_block() == Some(block)
    }

    pub fn block_params(&self, block: Block) -> &[Value] {
        &self.blocks[block].params
    }

    /// Add a parameter of type `ty` to the end of a block's parameter list
    pub fn append_block_param(&mut self, block: Block, ty: Type) -> Value {
        let index = self.blocks[block].params.len();
        let value = self.dfg.make_block_param(block, index, ty);
        self.blocks[block].params.push(value);
        value
    }

    /// Drop every parameter of a block
    ///
    /// The values are not rewritten; callers must have replaced their uses.
    pub fn erase_block_params(&mut self, block: Block) {
        self.blocks[block].params.clear();
    }

    /// Get an iterator over the blocks of the body
    pub fn body_blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.layout.region_blocks(self.body)
    }

    /// Get an iterator over the blocks of a region
    pub fn region_blocks(&self, region: Region) -> impl Iterator<Item = Block> + '_ {
        self.layout.region_blocks(region)
    }

    /// Get an iterator over instructions in a block
    pub fn block_insts(&self, block: Block) -> impl DoubleEndedIterator<Item = Inst> + '_ {
        self.layout.block_insts(block)
    }

    /// Get the terminator of a block, if its last operation is one
    pub fn terminator(&self, block: Block) -> Option<Inst> {
        let last = self.layout.last_inst(block)?;
        self.dfg.inst_data(last).is_terminator().then_some(last)
    }

    /// Successor blocks of a block, in terminator order
    pub fn successors(&self, block: Block) -> Vec<Block> {
        self.terminator(block)
            .map(|term| {
                self.dfg
                    .inst_data(term)
                    .successors
                    .iter()
                    .map(|s| s.block)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Split a block before `before`
    ///
    /// A new block is inserted after the old one and receives `before` and
    /// every following operation. The old block is left without a
    /// terminator.
    pub fn split_block(&mut self, before: Inst) -> Block {
        let new_block = self.create_block();
        self.layout.split_block(new_block, before);
        new_block
    }

    /// Erase every operation in a block, keeping the block itself
    pub fn clear_block(&mut self, block: Block) {
        let insts: Vec<Inst> = self.layout.block_insts(block).rev().collect();
        for inst in insts {
            self.erase_inst(inst);
        }
    }

    /// Erase a block and everything it contains
    pub fn erase_block(&mut self, block: Block) {
        self.clear_block(block);
        self.layout.remove_block(block);
    }

    // ========================================================================
    // Regions
    // ========================================================================

    /// Create a region owned by `parent`
    pub fn make_region(&mut self, parent: Option<Inst>) -> Region {
        self.layout.make_region(parent)
    }

    /// Move every block of `from` into `to`, which must be empty or be
    /// extended at its end
    pub fn take_region_body(&mut self, from: Region, to: Region) {
        self.layout.move_region_blocks(from, to);
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create an operation and return its entity
    ///
    /// The operation is not inserted into any block.
    pub fn make_inst(&mut self, data: InstData, result_types: &[Type]) -> Inst {
        let inst = self.dfg.make_inst(data, result_types);
        self.layout.ensure_inst(inst);
        inst
    }

    /// Append an operation to the end of a block
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        self.layout.append_inst(inst, block);
    }

    /// Insert an operation before another operation
    pub fn insert_inst(&mut self, inst: Inst, before: Inst) {
        self.layout.insert_inst(inst, before);
    }

    /// Detach an operation from its block without erasing its regions
    pub fn remove_inst(&mut self, inst: Inst) {
        self.layout.remove_inst(inst);
    }

    /// Erase an operation, including the blocks of its nested regions
    pub fn erase_inst(&mut self, inst: Inst) {
        let regions = self.dfg.inst_data(inst).regions.clone();
        for region in regions {
            let blocks: Vec<Block> = self.layout.region_blocks(region).collect();
            for block in blocks {
                self.erase_block(block);
            }
        }
        self.layout.remove_inst(inst);
    }

    /// Build operations at `at`
    pub fn ins(&mut self, at: InsertPoint) -> InsertBuilder<'_, CursorInserter<'_>> {
        InsertBuilder::new(CursorInserter::new(self, at))
    }

    /// Check whether an operation is reachable from the body through the
    /// layout
    pub fn is_inst_live(&self, inst: Inst) -> bool {
        match self.layout.inst_block(inst) {
            Some(block) => self.is_block_live(block),
            None => false,
        }
    }

    /// Check whether a block sits in the body or in a region of a live
    /// operation
    pub fn is_block_live(&self, block: Block) -> bool {
        let Some(region) = self.layout.block_region(block) else {
            return false;
        };
        if region == self.body {
            return true;
        }
        match self.layout.region_parent(region) {
            Some(parent) => self.is_inst_live(parent),
            None => false,
        }
    }

    // ========================================================================
    // Walks and use rewriting
    // ========================================================================

    /// Every operation of a block, including those of nested regions, in
    /// pre-order
    pub fn walk_block(&self, block: Block) -> Vec<Inst> {
        let mut out = Vec::new();
        self.walk_block_into(block, &mut out);
        out
    }

    /// Every operation of a region, including nested ones, in pre-order
    pub fn walk_region(&self, region: Region) -> Vec<Inst> {
        let mut out = Vec::new();
        for block in self.layout.region_blocks(region) {
            self.walk_block_into(block, &mut out);
        }
        out
    }

    fn walk_block_into(&self, block: Block, out: &mut Vec<Inst>) {
        for inst in self.layout.block_insts(block) {
            out.push(inst);
            for region in &self.dfg.inst_data(inst).regions {
                for nested in self.layout.region_blocks(*region) {
                    self.walk_block_into(nested, out);
                }
            }
        }
    }

    /// Every block of a region, including blocks of nested regions
    pub fn walk_region_blocks(&self, region: Region) -> Vec<Block> {
        let mut out = Vec::new();
        self.walk_region_blocks_into(region, &mut out);
        out
    }

    fn walk_region_blocks_into(&self, region: Region, out: &mut Vec<Block>) {
        for block in self.layout.region_blocks(region) {
            out.push(block);
            for inst in self.layout.block_insts(block) {
                for nested in &self.dfg.inst_data(inst).regions {
                    self.walk_region_blocks_into(*nested, out);
                }
            }
        }
    }

    /// Every live operation of the function
    pub fn all_insts(&self) -> Vec<Inst> {
        self.walk_region(self.body)
    }

    /// Redirect every successor edge targeting `old` to `new`
    pub fn replace_block_uses(&mut self, old: Block, new: Block) {
        for inst in self.all_insts() {
            for succ in &mut self.dfg.inst_data_mut(inst).successors {
                if succ.block == old {
                    succ.block = new;
                }
            }
        }
    }

    /// Replace every use of `old` with `new` in live operations
    pub fn replace_value_uses(&mut self, old: Value, new: Value) {
        for inst in self.all_insts() {
            for operand in self.dfg.inst_data_mut(inst).operands_mut() {
                if *operand == old {
                    *operand = new;
                }
            }
        }
    }

    /// Live operations reading `value`
    pub fn value_users(&self, value: Value) -> Vec<Inst> {
        self.all_insts()
            .into_iter()
            .filter(|inst| self.dfg.inst_data(*inst).operands().any(|v| v == value))
            .collect()
    }

    /// Live operations whose successors include `block`
    pub fn block_users(&self, block: Block) -> Vec<Inst> {
        self.all_insts()
            .into_iter()
            .filter(|inst| {
                self.dfg
                    .inst_data(*inst)
                    .successors
                    .iter()
                    .any(|s| s.block == block)
            })
            .collect()
    }
}
