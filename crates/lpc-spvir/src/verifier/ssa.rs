//! Operands must be defined by live code.

use alloc::{format, vec::Vec};

use crate::{function::Function, value::ValueDef, verifier::VerifierError};

pub fn verify_ssa(function: &Function, errors: &mut Vec<VerifierError>) {
    for inst in function.all_insts() {
        for operand in function.dfg.inst_data(inst).operands() {
            let defined = match function.dfg.value_def(operand) {
                ValueDef::Result(def, _) => function.is_inst_live(def),
                ValueDef::Param(block, index) => {
                    function.is_block_live(block)
                        && function.block_params(block).get(index) == Some(&operand)
                }
            };
            if !defined {
                errors.push(VerifierError::with_location(
                    format!("operand {} is not defined by live code", operand),
                    format!("{}", inst),
                ));
            }
        }
    }
}
