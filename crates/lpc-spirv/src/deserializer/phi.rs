//! Wiring phi incoming values into branch arguments.

use alloc::{format, vec::Vec};

use lpc_spvir::{
    AttrDict, Attribute, HasInsertPoint, InsertPoint, InsertionGuard, InstBuilder, Opcode,
    ReplaceBuilder,
};
use tracing::trace;

use super::Deserializer;
use crate::error::ErrorKind;

impl Deserializer<'_> {
    /// Rebuild the terminator of every phi predecessor so that it passes the
    /// incoming values of its edge as block arguments
    ///
    /// Incoming values are materialized right before the terminator.
    pub(super) fn wire_up_block_arguments(&mut self) -> Result<(), ErrorKind> {
        let infos = core::mem::take(&mut self.state()?.phi_info);
        let mut guard = InsertionGuard::new(self);

        for info in infos {
            let Some(term) = guard.state()?.func.terminator(info.pred) else {
                return Err(ErrorKind::MalformedInstruction(format!(
                    "predecessor {} of a block with OpPhi has no terminator",
                    info.pred
                )));
            };
            guard.set_insert_point(InsertPoint::Before(term));

            let mut args = Vec::with_capacity(info.values.len());
            for id in &info.values {
                let value = guard.get_value(*id).map_err(|e| match e {
                    ErrorKind::UndefinedReference { .. } => ErrorKind::UndefinedPhiOperand(*id),
                    other => other,
                })?;
                args.push(value);
            }
            trace!("[phi] {} -> {} passes {:?}", info.pred, info.target, args);

            let state = guard.state()?;
            let data = state.func.dfg.inst_data(term).clone();
            let builder = ReplaceBuilder::new(&mut state.func.dfg, term);
            match data.opcode {
                Opcode::Branch => {
                    builder.branch(info.target, args);
                }
                Opcode::BranchConditional => {
                    let mut successors = data.successors;
                    for succ in &mut successors {
                        if succ.block == info.target {
                            succ.args = args.clone();
                        }
                    }
                    let [true_target, false_target] = <[_; 2]>::try_from(successors).map_err(|_| {
                        ErrorKind::MalformedInstruction(format!(
                            "conditional branch {} must have two successors",
                            term
                        ))
                    })?;
                    builder.branch_conditional(
                        data.args[0],
                        true_target,
                        false_target,
                        branch_weights(&data.attrs),
                    );
                }
                other => {
                    return Err(ErrorKind::Unsupported(format!(
                        "OpPhi predecessor terminated by {}",
                        other
                    )))
                }
            }
        }
        Ok(())
    }
}

fn branch_weights(attrs: &AttrDict) -> Option<(u32, u32)> {
    match attrs.get("branch_weights") {
        Some(Attribute::Array(weights)) => match weights.as_slice() {
            [Attribute::Literal(t), Attribute::Literal(f)] => Some((*t, *f)),
            _ => None,
        },
        _ => None,
    }
}
