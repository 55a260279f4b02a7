//! Every live block ends in exactly one terminator.

use alloc::{format, vec::Vec};

use crate::{function::Function, verifier::VerifierError};

pub fn verify_terminators(function: &Function, errors: &mut Vec<VerifierError>) {
    for block in function.walk_region_blocks(function.body) {
        let insts: Vec<_> = function.block_insts(block).collect();
        let Some((last, body)) = insts.split_last() else {
            errors.push(VerifierError::with_location(
                "block is empty".into(),
                format!("{}", block),
            ));
            continue;
        };
        if !function.dfg.inst_data(*last).is_terminator() {
            errors.push(VerifierError::with_location(
                format!(
                    "block does not end with a terminator, found {}",
                    function.dfg.inst_data(*last).opcode
                ),
                format!("{}", block),
            ));
        }
        for inst in body {
            if function.dfg.inst_data(*inst).is_terminator() {
                errors.push(VerifierError::with_location(
                    format!(
                        "terminator {} in the middle of a block",
                        function.dfg.inst_data(*inst).opcode
                    ),
                    format!("{}", inst),
                ));
            }
        }
    }
}
