//! Operation data.

use alloc::vec::Vec;

use crate::{
    attribute::{AttrDict, Attribute},
    dfg::opcode::Opcode,
    entity::{Block, Region},
    sourceloc::Location,
    value::Value,
};

/// A successor edge: target block plus the values passed to its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCall {
    pub block: Block,
    pub args: Vec<Value>,
}

impl BlockCall {
    pub fn new(block: Block, args: Vec<Value>) -> Self {
        Self { block, args }
    }
}

/// Operation data (what an operation is, separate from where it is)
///
/// Every operation has the same shape. Results are filled in by the DFG
/// when the operation is created.
#[derive(Debug, Clone)]
pub struct InstData {
    pub opcode: Opcode,
    /// Value operands
    pub args: Vec<Value>,
    pub results: Vec<Value>,
    /// Successor blocks of a terminator, with their block arguments
    pub successors: Vec<BlockCall>,
    /// Nested regions of structured operations
    pub regions: Vec<Region>,
    pub attrs: AttrDict,
    pub loc: Location,
}

impl InstData {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: Vec::new(),
            results: Vec::new(),
            successors: Vec::new(),
            regions: Vec::new(),
            attrs: AttrDict::new(),
            loc: Location::Unknown,
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_successor(mut self, block: Block, args: Vec<Value>) -> Self {
        self.successors.push(BlockCall::new(block, args));
        self
    }

    pub fn with_attr(mut self, name: &str, attr: Attribute) -> Self {
        self.attrs.set(name, attr);
        self
    }

    pub fn with_loc(mut self, loc: Location) -> Self {
        self.loc = loc;
        self
    }

    /// Unconditional branch to `target`
    pub fn branch(target: Block, args: Vec<Value>) -> Self {
        Self::new(Opcode::Branch).with_successor(target, args)
    }

    /// Two-way branch on `cond`
    ///
    /// The first successor is taken when `cond` is true.
    pub fn branch_conditional(
        cond: Value,
        true_target: BlockCall,
        false_target: BlockCall,
    ) -> Self {
        let mut data = Self::new(Opcode::BranchConditional).with_args(Vec::from([cond]));
        data.successors.push(true_target);
        data.successors.push(false_target);
        data
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    /// Every value this operation reads, operands first then block arguments
    pub fn operands(&self) -> impl Iterator<Item = Value> + '_ {
        self.args
            .iter()
            .copied()
            .chain(self.successors.iter().flat_map(|s| s.args.iter().copied()))
    }

    /// Mutable access to every value this operation reads
    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Value> + '_ {
        self.args
            .iter_mut()
            .chain(self.successors.iter_mut().flat_map(|s| s.args.iter_mut()))
    }
}
