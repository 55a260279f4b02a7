//! Insert builder for placing new operations into a function.

use core::marker::PhantomData;

use crate::{
    builder::traits::{InstBuilderBase, InstInserterBase},
    dfg::{DataFlowGraph, InstData},
    entity::{Block, Inst},
    function::Function,
    sourceloc::Location,
    types::Type,
};

/// Where the next operation goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPoint {
    /// Operations are created but left detached
    #[default]
    Nowhere,
    /// Append to the end of a block
    End(Block),
    /// Insert right before an operation
    Before(Inst),
}

/// Builder for inserting operations into a function.
///
/// Wraps an `InstInserterBase` and optionally stamps a source location on
/// every operation it builds.
pub struct InsertBuilder<'f, I: InstInserterBase<'f>> {
    inserter: I,
    loc: Option<Location>,
    _phantom: PhantomData<&'f ()>,
}

impl<'f, I: InstInserterBase<'f>> InsertBuilder<'f, I> {
    pub fn new(inserter: I) -> Self {
        Self {
            inserter,
            loc: None,
            _phantom: PhantomData,
        }
    }

    /// Attach `loc` to the operation being built
    pub fn at_loc(mut self, loc: Location) -> Self {
        self.loc = Some(loc);
        self
    }
}

impl<'f, I: InstInserterBase<'f>> InstBuilderBase<'f> for InsertBuilder<'f, I> {
    fn data_flow_graph(&self) -> &DataFlowGraph {
        self.inserter.data_flow_graph()
    }

    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph {
        self.inserter.data_flow_graph_mut()
    }

    fn build(mut self, mut data: InstData, result_types: &[Type]) -> (Inst, &'f mut DataFlowGraph) {
        if let Some(loc) = self.loc.take() {
            data.loc = loc;
        }
        self.inserter.insert_built_inst(data, result_types)
    }
}

/// Inserter placing operations at an `InsertPoint` of a function.
pub struct CursorInserter<'f> {
    function: &'f mut Function,
    at: InsertPoint,
}

impl<'f> CursorInserter<'f> {
    pub fn new(function: &'f mut Function, at: InsertPoint) -> Self {
        Self { function, at }
    }
}

impl<'f> InstInserterBase<'f> for CursorInserter<'f> {
    fn data_flow_graph(&self) -> &DataFlowGraph {
        &self.function.dfg
    }

    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph {
        &mut self.function.dfg
    }

    fn insert_built_inst(self, data: InstData, result_types: &[Type]) -> (Inst, &'f mut DataFlowGraph) {
        let inst = self.function.make_inst(data, result_types);
        match self.at {
            InsertPoint::Nowhere => {}
            InsertPoint::End(block) => self.function.append_inst(inst, block),
            InsertPoint::Before(before) => self.function.insert_inst(inst, before),
        }
        (inst, &mut self.function.dfg)
    }
}
