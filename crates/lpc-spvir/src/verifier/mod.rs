//! IR verifier.
//!
//! Checks the structural invariants a deserialized function must satisfy:
//! well-terminated blocks, region-local successors with matching argument
//! counts, operands defined by live code, and structured regions that end
//! in a merge block.

use alloc::{format, string::String, vec::Vec};

use crate::{function::Function, module::Module};

mod regions;
mod ssa;
mod terminators;

pub use regions::verify_regions;
pub use ssa::verify_ssa;
pub use terminators::verify_terminators;

/// Verifier error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierError {
    /// Error message describing what's wrong
    pub message: String,
    /// Optional location information (e.g., "block0", "inst5")
    pub location: Option<String>,
}

impl VerifierError {
    pub fn new(message: String) -> Self {
        Self {
            message,
            location: None,
        }
    }

    pub fn with_location(message: String, location: String) -> Self {
        Self {
            message,
            location: Some(location),
        }
    }
}

impl core::fmt::Display for VerifierError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Verify a function is well-formed
///
/// Returns every problem found rather than stopping at the first one.
pub fn verify(function: &Function) -> Result<(), Vec<VerifierError>> {
    let mut errors = Vec::new();

    verify_terminators(function, &mut errors);
    verify_regions(function, &mut errors);
    verify_ssa(function, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Verify every function of a module
pub fn verify_module(module: &Module) -> Result<(), Vec<VerifierError>> {
    let mut errors = Vec::new();
    for func in module.functions() {
        if let Err(func_errors) = verify(func) {
            errors.extend(func_errors.into_iter().map(|e| VerifierError {
                message: e.message,
                location: Some(match e.location {
                    Some(loc) => format!("@{} {}", func.name, loc),
                    None => format!("@{}", func.name),
                }),
            }));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;
    use crate::{
        builder::{InsertPoint, InstBuilder},
        dfg::{InstData, Opcode},
        enums::FunctionControl,
        types::{Signedness, TypeStore},
    };

    fn empty_function(types: &mut TypeStore) -> Function {
        let ty = types.function(Vec::new(), Vec::new());
        Function::new("f".to_string(), ty, FunctionControl::NONE)
    }

    #[test]
    fn test_valid_function() {
        let mut types = TypeStore::new();
        let i32_ty = types.int(32, Signedness::Signless);
        let mut func = empty_function(&mut types);
        let entry = func.create_block();
        let exit = func.create_block();
        func.append_block(entry);
        func.append_block(exit);
        let param = func.append_block_param(exit, i32_ty);
        let c = func.ins(InsertPoint::End(entry)).undef(i32_ty);
        func.ins(InsertPoint::End(entry)).branch(exit, vec![c]);
        func.ins(InsertPoint::End(exit)).return_value(param);

        assert_eq!(verify(&func), Ok(()));
    }

    #[test]
    fn test_missing_terminator() {
        let mut types = TypeStore::new();
        let i32_ty = types.int(32, Signedness::Signless);
        let mut func = empty_function(&mut types);
        let entry = func.create_block();
        func.append_block(entry);
        func.ins(InsertPoint::End(entry)).undef(i32_ty);

        let errors = verify(&func).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("does not end with a terminator"));
    }

    #[test]
    fn test_branch_argument_count() {
        let mut types = TypeStore::new();
        let i32_ty = types.int(32, Signedness::Signless);
        let mut func = empty_function(&mut types);
        let entry = func.create_block();
        let exit = func.create_block();
        func.append_block(entry);
        func.append_block(exit);
        func.append_block_param(exit, i32_ty);
        func.ins(InsertPoint::End(entry)).branch(exit, Vec::new());
        func.ins(InsertPoint::End(exit)).return_();

        let errors = verify(&func).unwrap_err();
        assert!(errors[0].message.contains("passes 0 arguments, block takes 1"));
    }

    #[test]
    fn test_use_of_erased_value() {
        let mut types = TypeStore::new();
        let i32_ty = types.int(32, Signedness::Signless);
        let mut func = empty_function(&mut types);
        let entry = func.create_block();
        func.append_block(entry);
        let v = func.ins(InsertPoint::End(entry)).undef(i32_ty);
        func.ins(InsertPoint::End(entry)).return_value(v);
        let def = func.dfg.value_def(v).inst().unwrap();
        func.erase_inst(def);

        let errors = verify(&func).unwrap_err();
        assert!(errors[0].message.contains("not defined by live code"));
    }

    #[test]
    fn test_selection_needs_merge_block() {
        let mut types = TypeStore::new();
        let mut func = empty_function(&mut types);
        let entry = func.create_block();
        func.append_block(entry);
        let selection = func.ins(InsertPoint::End(entry)).op(InstData::new(Opcode::Selection), &[]);
        let region = func.make_region(Some(selection));
        func.dfg.inst_data_mut(selection).regions.push(region);
        let inner = func.create_block();
        func.append_block_to(region, inner);
        func.ins(InsertPoint::End(inner)).return_();
        func.ins(InsertPoint::End(entry)).return_();

        let errors = verify(&func).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("must end in a merge block")));
    }
}
