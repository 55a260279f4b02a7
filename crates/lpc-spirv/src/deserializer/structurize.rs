//! Control flow structurization.
//!
//! Each header block with a merge annotation becomes a `spirv.mlir.selection`
//! or `spirv.mlir.loop` op placed at the start of its merge block. The blocks
//! of the construct (everything reachable from the header without passing
//! through the merge block) are cloned into the op's region, the originals
//! are erased, and edges into the header are redirected to the merge block.
//!
//! Region layout:
//! - selection: cloned header first, then the other construct blocks, then
//!   a merge block holding `spirv.mlir.merge`
//! - loop: an entry block branching to the cloned header, the construct
//!   blocks, then the merge block
//!
//! Values defined in the construct and used after it leave the region
//! through `spirv.mlir.merge` and become results of the structured op. For
//! selections, the merge block's parameters are handled the same way.

use alloc::{collections::BTreeSet, format, string::String, vec::Vec};

use lpc_spvir::{
    Attribute, Block, EnumAttr, Function, Inst, InsertPoint, InstBuilder, InstData, IrMapping,
    Location, Opcode, Value,
};
use tracing::{debug, trace};

use super::{Deserializer, FunctionState, MergeInfo};
use crate::error::ErrorKind;

impl Deserializer<'_> {
    /// Give selection headers that are not a lone conditional branch their
    /// own block
    ///
    /// A selection header that also holds other ops, or that is the merge
    /// block of another construct, is split right before its conditional
    /// branch. The front half keeps the ops and falls through to the new
    /// header, so two constructs never share a header and merge block.
    pub(super) fn split_conditional_blocks(&mut self) -> Result<(), ErrorKind> {
        let state = self.state()?;
        for index in 0..state.merge_info.len() {
            let (header, info) = &state.merge_info[index];
            let header = *header;
            if info.continue_.is_some() {
                continue;
            }
            let Some(term) = state.func.terminator(header) else {
                continue;
            };
            if state.func.dfg.inst_data(term).opcode != Opcode::BranchConditional {
                continue;
            }
            let is_merge = state
                .merge_info
                .iter()
                .any(|(_, other)| other.merge == header);
            let only_branch = state.func.layout.first_inst(header) == Some(term);
            if only_branch && !is_merge {
                continue;
            }

            let new_header = state.func.split_block(term);
            state
                .func
                .ins(InsertPoint::End(header))
                .branch(new_header, Vec::new());
            trace!("[cf] split selection header {} into {}", header, new_header);
            state.merge_info[index].0 = new_header;
        }
        Ok(())
    }

    /// Structurize every recorded construct, in the order the merge
    /// instructions were read
    ///
    /// A construct whose header is the merge block of another pending
    /// construct goes first, so the earlier construct ends up in front of it
    /// in the same block rather than inside its region.
    pub(super) fn structurize_all(&mut self) -> Result<(), ErrorKind> {
        let FunctionState {
            func, merge_info, ..
        } = self.state()?;
        while !merge_info.is_empty() {
            let index = merge_info
                .iter()
                .position(|(header, _)| merge_info.iter().any(|(_, other)| other.merge == *header))
                .unwrap_or(0);
            let (header, info) = merge_info.remove(index);
            Structurizer::new(&mut *func, &mut *merge_info, header, info).run()?;
        }
        Ok(())
    }
}

/// Rewrites one construct into a structured op.
struct Structurizer<'s> {
    func: &'s mut Function,
    /// Constructs still to be processed; their blocks may move into the new
    /// region
    pending: &'s mut Vec<(Block, MergeInfo)>,
    header: Block,
    merge: Block,
    continue_: Option<Block>,
    control: EnumAttr,
    loc: Location,
}

impl<'s> Structurizer<'s> {
    fn new(
        func: &'s mut Function,
        pending: &'s mut Vec<(Block, MergeInfo)>,
        header: Block,
        info: MergeInfo,
    ) -> Self {
        Self {
            func,
            pending,
            header,
            merge: info.merge,
            continue_: info.continue_,
            control: info.control,
            loc: info.loc,
        }
    }

    fn is_loop(&self) -> bool {
        self.continue_.is_some()
    }

    fn run(mut self) -> Result<(), ErrorKind> {
        let is_loop = self.is_loop();
        let merge = self.merge;
        debug!(
            "[cf] structurizing {} header {} merge {} continue {:?}",
            if is_loop { "loop" } else { "selection" },
            self.header,
            merge,
            self.continue_
        );
        if is_loop && !self.func.block_params(merge).is_empty() {
            return Err(ErrorKind::UnsupportedLoopMergePhi);
        }

        let op = self.create_op();
        let body = self.func.make_region(Some(op));
        self.func.dfg.inst_data_mut(op).regions.push(body);
        let region_entry = is_loop.then(|| {
            let entry = self.func.create_block();
            self.func.append_block_to(body, entry);
            entry
        });
        let region_merge = self.func.create_block();
        self.func.append_block_to(body, region_merge);
        self.func
            .ins(InsertPoint::End(region_merge))
            .at_loc(self.loc.clone())
            .merge(Vec::new());

        let mut mapping = IrMapping::new();
        mapping.map_block(merge, region_merge);

        let construct = self.construct_blocks();
        trace!("[cf] construct blocks: {:?}", construct);
        for block in &construct {
            let new_block = self.func.create_block();
            self.func.insert_block(new_block, region_merge);
            mapping.map_block(*block, new_block);
            if !self.func.is_entry_block(*block) {
                for param in self.func.block_params(*block).to_vec() {
                    let ty = self.func.dfg.value_type(param);
                    let new_param = self.func.append_block_param(new_block, ty);
                    mapping.map_value(param, new_param);
                }
            }
            let insts: Vec<Inst> = self.func.block_insts(*block).collect();
            for inst in insts {
                let cloned = self.func.clone_inst(inst, &mut mapping);
                self.func.append_inst(cloned, new_block);
            }
        }
        let region_blocks = self.func.walk_region_blocks(body);
        self.func.remap_blocks(&region_blocks, &mapping);

        self.func.replace_block_uses(self.header, merge);

        if let Some(region_entry) = region_entry {
            // The merge block now stands in for the header, parameters
            // included
            let types = self.func.dfg.value_types(self.func.block_params(self.header));
            let args: Vec<Value> = types
                .into_iter()
                .map(|ty| self.func.append_block_param(merge, ty))
                .collect();
            let target = mapping.lookup_block_or_self(self.header);
            self.func
                .ins(InsertPoint::End(region_entry))
                .at_loc(self.loc.clone())
                .branch(target, args);
        }

        let mut yields = Vec::new();
        let mut outside = Vec::new();
        if !is_loop {
            for param in self.func.block_params(merge).to_vec() {
                let ty = self.func.dfg.value_type(param);
                yields.push(self.func.append_block_param(region_merge, ty));
                outside.push(param);
            }
        }

        let used_outside = self.values_used_outside(&construct);
        for value in self.defined_values(&construct) {
            if !used_outside.contains(&value) {
                continue;
            }
            let Some(inner) = mapping.lookup_value(value) else {
                return Err(ErrorKind::StructurizationEscape(format!(
                    "value {} has uses outside of the enclosing selection/loop construct",
                    value
                )));
            };
            yields.push(inner);
            outside.push(value);
        }

        if !yields.is_empty() {
            trace!("[cf] yielding {:?} for {:?}", yields, outside);
            self.yield_values(op, region_merge, yields, &outside)?;
        }

        self.remap_pending(&construct, &mapping)?;

        for block in construct {
            if self.func.is_entry_block(block) {
                // Function arguments live on the entry block, so it stays
                trace!("[cf] reducing entry block {} to a branch", block);
                self.func.clear_block(block);
                self.func
                    .ins(InsertPoint::End(block))
                    .at_loc(self.loc.clone())
                    .branch(merge, Vec::new());
            } else {
                trace!("[cf] erasing block {}", block);
                self.func.erase_block(block);
            }
        }
        Ok(())
    }

    /// Empty selection or loop op at the start of the merge block
    fn create_op(&mut self) -> Inst {
        let (opcode, control_attr) = if self.is_loop() {
            (Opcode::Loop, "loop_control")
        } else {
            (Opcode::Selection, "selection_control")
        };
        let at = match self.func.layout.first_inst(self.merge) {
            Some(first) => InsertPoint::Before(first),
            None => InsertPoint::End(self.merge),
        };
        let data = InstData::new(opcode)
            .with_attr(control_attr, Attribute::Enum(self.control))
            .with_loc(self.loc.clone());
        self.func.ins(at).op(data, &[])
    }

    /// Header plus every block reachable from it without passing through
    /// the merge block, in breadth-first order
    fn construct_blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::from([self.header]);
        let mut next = 0;
        while next < blocks.len() {
            for succ in self.func.successors(blocks[next]) {
                if succ != self.merge && !blocks.contains(&succ) {
                    blocks.push(succ);
                }
            }
            next += 1;
        }
        blocks
    }

    /// Results of the construct's top-level ops and parameters of its
    /// blocks, block by block
    fn defined_values(&self, construct: &[Block]) -> Vec<Value> {
        let mut values = Vec::new();
        for block in construct {
            for inst in self.func.block_insts(*block) {
                values.extend_from_slice(self.func.dfg.inst_results(inst));
            }
            if !self.func.is_entry_block(*block) {
                values.extend_from_slice(self.func.block_params(*block));
            }
        }
        values
    }

    /// Values read by live ops that are not part of the original construct
    fn values_used_outside(&self, construct: &[Block]) -> BTreeSet<Value> {
        let inside: BTreeSet<Inst> = construct
            .iter()
            .flat_map(|block| self.func.walk_block(*block))
            .collect();
        self.func
            .all_insts()
            .into_iter()
            .filter(|inst| !inside.contains(inst))
            .flat_map(|inst| self.func.dfg.inst_data(inst).operands().collect::<Vec<_>>())
            .collect()
    }

    /// Replace `op` with an equivalent op producing one result per outside
    /// use, yielded from the region's merge block
    fn yield_values(
        &mut self,
        op: Inst,
        region_merge: Block,
        yields: Vec<Value>,
        outside: &[Value],
    ) -> Result<(), ErrorKind> {
        let Some(merge_op) = self.func.layout.first_inst(region_merge) else {
            return Err(ErrorKind::StructurizationEscape(String::from(
                "structured region lost its merge op",
            )));
        };
        self.func.dfg.inst_data_mut(merge_op).args = yields;

        let old = self.func.dfg.inst_data(op).clone();
        let mut data = InstData::new(old.opcode).with_loc(old.loc);
        data.attrs = old.attrs;
        let types = self.func.dfg.value_types(outside);
        let new_op = self.func.ins(InsertPoint::Before(op)).op(data, &types);

        let regions = core::mem::take(&mut self.func.dfg.inst_data_mut(op).regions);
        for region in &regions {
            self.func.layout.set_region_parent(*region, Some(new_op));
        }
        self.func.dfg.inst_data_mut(new_op).regions = regions;
        self.func.erase_inst(op);

        let results = self.func.dfg.inst_results(new_op).to_vec();
        for (value, result) in outside.iter().zip(results) {
            self.func.replace_value_uses(*value, result);
        }
        if !self.is_loop() {
            self.func.erase_block_params(self.merge);
        }
        Ok(())
    }

    /// Point pending constructs whose blocks were cloned at the clones
    fn remap_pending(&mut self, construct: &[Block], mapping: &IrMapping) -> Result<(), ErrorKind> {
        let mut moved = BTreeSet::new();
        for block in construct {
            moved.insert(*block);
            for inst in self.func.block_insts(*block) {
                for region in &self.func.dfg.inst_data(inst).regions {
                    moved.extend(self.func.walk_region_blocks(*region));
                }
            }
        }

        for (header, info) in self.pending.iter_mut() {
            if moved.contains(header) {
                *header = mapping.lookup_block(*header).ok_or_else(|| {
                    ErrorKind::StructurizationEscape(String::from(
                        "nested loop header block should be remapped",
                    ))
                })?;
                if let Some(continue_) = info.continue_ {
                    info.continue_ = Some(mapping.lookup_block(continue_).ok_or_else(|| {
                        ErrorKind::StructurizationEscape(String::from(
                            "nested loop continue block should be remapped",
                        ))
                    })?);
                }
                info.merge = mapping.lookup_block_or_self(info.merge);
                trace!("[cf] pending construct moved to header {}", header);
            }
            if info.merge == self.header {
                info.merge = self.merge;
            }
        }
        Ok(())
    }
}
