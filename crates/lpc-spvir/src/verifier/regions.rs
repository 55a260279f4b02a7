//! Successor and structured-region checks.

use alloc::{format, vec::Vec};

use crate::{dfg::Opcode, function::Function, verifier::VerifierError};

pub fn verify_regions(function: &Function, errors: &mut Vec<VerifierError>) {
    for inst in function.all_insts() {
        let data = function.dfg.inst_data(inst);
        let Some(block) = function.layout.inst_block(inst) else {
            continue;
        };
        let region = function.layout.block_region(block);

        for succ in &data.successors {
            if function.layout.block_region(succ.block) != region {
                errors.push(VerifierError::with_location(
                    format!("successor {} is outside the branching region", succ.block),
                    format!("{}", inst),
                ));
                continue;
            }
            let expected = function.block_params(succ.block).len();
            if succ.args.len() != expected {
                errors.push(VerifierError::with_location(
                    format!(
                        "branch to {} passes {} arguments, block takes {}",
                        succ.block,
                        succ.args.len(),
                        expected
                    ),
                    format!("{}", inst),
                ));
            }
        }

        if matches!(data.opcode, Opcode::Selection | Opcode::Loop) {
            for nested in &data.regions {
                let merge = function
                    .layout
                    .last_block(*nested)
                    .and_then(|b| function.layout.first_inst(b));
                let ok = merge
                    .map(|m| function.dfg.inst_data(m).opcode == Opcode::Merge)
                    .unwrap_or(false);
                if !ok {
                    errors.push(VerifierError::with_location(
                        format!("{} region must end in a merge block", data.opcode),
                        format!("{}", inst),
                    ));
                }
            }
        }
    }
}
