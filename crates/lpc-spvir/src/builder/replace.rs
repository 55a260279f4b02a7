//! Replace builder for rewriting existing operations in place.

use alloc::vec::Vec;

use crate::{
    builder::traits::InstBuilderBase,
    dfg::{DataFlowGraph, InstData},
    entity::Inst,
    types::Type,
};

/// Builder that swaps the data of an existing operation.
///
/// The operation keeps its entity, its layout position and its result
/// values, so users of the results need no rewriting. The requested result
/// types are ignored.
pub struct ReplaceBuilder<'f> {
    dfg: &'f mut DataFlowGraph,
    inst: Inst,
}

impl<'f> ReplaceBuilder<'f> {
    /// The operation must already exist in the DFG.
    pub fn new(dfg: &'f mut DataFlowGraph, inst: Inst) -> Self {
        Self { dfg, inst }
    }
}

impl<'f> InstBuilderBase<'f> for ReplaceBuilder<'f> {
    fn data_flow_graph(&self) -> &DataFlowGraph {
        self.dfg
    }

    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph {
        self.dfg
    }

    fn build(self, mut data: InstData, _result_types: &[Type]) -> (Inst, &'f mut DataFlowGraph) {
        let old = self.dfg.inst_data_mut(self.inst);
        data.results = core::mem::take(&mut old.results);
        if data.loc.is_unknown() {
            data.loc = core::mem::take(&mut old.loc);
        }
        let regions: Vec<_> = core::mem::take(&mut old.regions);
        if data.regions.is_empty() {
            data.regions = regions;
        }
        *old = data;
        (self.inst, self.dfg)
    }
}
