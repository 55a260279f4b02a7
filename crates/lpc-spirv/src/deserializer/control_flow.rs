//! Labels, branches, merge annotations and phis.
//!
//! Blocks are created on first reference, so forward branches work. Phis
//! become block parameters right away; their incoming values are recorded
//! per edge and attached to the branches once the whole body is read.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::{
    BlockCall, EnumAttr, InsertPoint, InstBuilder, LoopControl, SelectionControl,
};
use tracing::trace;

use super::{decode_enum, Deserializer, MergeInfo, PhiInfo};
use crate::{
    error::{Arity, ErrorKind},
    opcode::Op,
    table::IdKind,
};

impl Deserializer<'_> {
    pub(super) fn process_label(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpLabel", Arity::Exactly(1), operands.len())?;
        let id = operands[0];
        let state = self.state()?;
        if !state.defined_labels.insert(id) {
            return Err(ErrorKind::DuplicateDefinition {
                table: IdKind::Block,
                id,
            });
        }
        let block = state.get_or_create_block(id);
        state.insert_point = InsertPoint::End(block);
        trace!("[block] <id> {} is {}", id, block);
        self.clear_debug_line();
        Ok(())
    }

    pub(super) fn process_branch(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        self.block_insert_point(Op::Branch)?;
        ErrorKind::check_arity("OpBranch", Arity::Exactly(1), operands.len())?;
        let target = self.state()?.get_or_create_block(operands[0]);
        let loc = self.current_location();
        self.ins()?.at_loc(loc).branch(target, Vec::new());
        self.end_block();
        Ok(())
    }

    /// `OpBranchConditional`: condition, true label, false label, optional
    /// weights
    pub(super) fn process_branch_conditional(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        self.block_insert_point(Op::BranchConditional)?;
        ErrorKind::check_arity("OpBranchConditional", Arity::OneOf(&[3, 5]), operands.len())?;
        let cond = self.get_value(operands[0])?;
        let state = self.state()?;
        let true_block = state.get_or_create_block(operands[1]);
        let false_block = state.get_or_create_block(operands[2]);
        let weights = match operands {
            [_, _, _, t, f] => Some((*t, *f)),
            _ => None,
        };
        let loc = self.current_location();
        self.ins()?.at_loc(loc).branch_conditional(
            cond,
            BlockCall::new(true_block, Vec::new()),
            BlockCall::new(false_block, Vec::new()),
            weights,
        );
        self.end_block();
        Ok(())
    }

    /// `OpSelectionMerge`: merge label, selection control
    pub(super) fn process_selection_merge(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpSelectionMerge", Arity::AtLeast(2), operands.len())?;
        let control = decode_enum("selection control", operands[1], SelectionControl::from_bits)?;
        self.record_merge(
            Op::SelectionMerge,
            operands[0],
            None,
            EnumAttr::SelectionControl(control),
        )
    }

    /// `OpLoopMerge`: merge label, continue label, loop control, control
    /// parameters
    pub(super) fn process_loop_merge(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpLoopMerge", Arity::AtLeast(3), operands.len())?;
        let control = decode_enum("loop control", operands[2], LoopControl::from_bits)?;
        self.record_merge(
            Op::LoopMerge,
            operands[0],
            Some(operands[1]),
            EnumAttr::LoopControl(control),
        )
    }

    fn record_merge(
        &mut self,
        op: Op,
        merge_id: u32,
        continue_id: Option<u32>,
        control: EnumAttr,
    ) -> Result<(), ErrorKind> {
        self.block_insert_point(op)?;
        let loc = self.current_location();
        let state = self.state()?;
        let Some(header) = state.insert_block() else {
            return Err(ErrorKind::UnhandledInstruction(format!(
                "{} must appear inside a block",
                op.name()
            )));
        };
        if state.merge_info.iter().any(|(block, _)| *block == header) {
            return Err(ErrorKind::MalformedInstruction(String::from(
                "a block cannot have more than one OpSelectionMerge/OpLoopMerge instruction",
            )));
        }
        let merge = state.get_or_create_block(merge_id);
        let continue_ = continue_id.map(|id| state.get_or_create_block(id));
        trace!(
            "[cf] {} header {} merge {} continue {:?}",
            op.name(),
            header,
            merge,
            continue_
        );
        state.merge_info.push((
            header,
            MergeInfo {
                loc,
                control,
                merge,
                continue_,
            },
        ));
        Ok(())
    }

    /// `OpPhi`: result type, result, then (value, predecessor label) pairs
    pub(super) fn process_phi(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        self.block_insert_point(Op::Phi)?;
        ErrorKind::check_arity("OpPhi", Arity::AtLeast(4), operands.len())?;
        if operands.len() % 2 != 0 {
            return Err(ErrorKind::MalformedInstruction(String::from(
                "OpPhi must have (value, parent block) pairs",
            )));
        }
        let ty = self.type_of(operands[0])?;
        let id = operands[1];

        let state = self.state()?;
        let Some(target) = state.insert_block() else {
            return Err(ErrorKind::UnhandledInstruction(String::from(
                "OpPhi must appear inside a block",
            )));
        };
        let param = state.func.append_block_param(target, ty);
        state.values.define(id, param)?;
        trace!("[phi] <id> {} is {} of {}", id, param, target);

        for pair in operands[2..].chunks_exact(2) {
            let pred = state.get_or_create_block(pair[1]);
            let existing = state
                .phi_info
                .iter_mut()
                .find(|info| info.pred == pred && info.target == target);
            match existing {
                Some(info) => info.values.push(pair[0]),
                None => state.phi_info.push(PhiInfo {
                    pred,
                    target,
                    values: Vec::from([pair[0]]),
                }),
            }
        }
        Ok(())
    }
}
