//! Module-level mode setting instructions.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::{
    AddressingModel, Attribute, Capability, EntryPoint, ExecutionMode, ExecutionModeDecl,
    ExecutionModel, MemoryModel, ModuleItem, Opcode,
};
use tracing::debug;

use super::{debug::expect_no_trailing_words, decode_enum, Deserializer};
use crate::{
    error::{Arity, ErrorKind},
    literal::decode_string,
    table::IdKind,
};

/// Prefix of the symbol given to functions without an `OpName`
pub(super) const FUNCTION_PREFIX: &str = "spirv_fn_";

impl Deserializer<'_> {
    pub(super) fn process_capability(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpCapability", Arity::Exactly(1), operands.len())?;
        let cap = decode_enum("capability", operands[0], Capability::from_u32)?;
        if !self.capabilities.contains(&cap) {
            self.capabilities.push(cap);
        }
        Ok(())
    }

    pub(super) fn process_extension(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpExtension", Arity::AtLeast(1), operands.len())?;
        let mut index = 0;
        let name = decode_string(operands, &mut index)?;
        expect_no_trailing_words("OpExtension", operands, index)?;
        if !self.extensions.contains(&name) {
            self.extensions.push(name);
        }
        Ok(())
    }

    pub(super) fn process_ext_inst_import(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpExtInstImport", Arity::AtLeast(2), operands.len())?;
        let mut index = 1;
        let name = decode_string(operands, &mut index)?;
        expect_no_trailing_words("OpExtInstImport", operands, index)?;
        self.ext_inst_sets.define(operands[0], name)
    }

    pub(super) fn process_memory_model(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpMemoryModel", Arity::Exactly(2), operands.len())?;
        self.module.addressing_model = Some(decode_enum(
            "addressing model",
            operands[0],
            AddressingModel::from_u32,
        )?);
        self.module.memory_model = Some(decode_enum(
            "memory model",
            operands[1],
            MemoryModel::from_u32,
        )?);
        Ok(())
    }

    /// `OpEntryPoint`: execution model, function, name, interface variables
    ///
    /// A function that had no `OpName` takes the entry point name.
    pub(super) fn process_entry_point(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpEntryPoint", Arity::AtLeast(3), operands.len())?;
        let execution_model = decode_enum("execution model", operands[0], ExecutionModel::from_u32)?;
        let fn_id = operands[1];
        let current = self.functions.require(fn_id)?.name.clone();

        let mut index = 2;
        let name = decode_string(operands, &mut index)?;
        if current != name {
            if !current.starts_with(FUNCTION_PREFIX) {
                return Err(ErrorKind::MalformedInstruction(format!(
                    "function name mismatch between OpEntryPoint and OpFunction with <id> {}: {} vs. {}",
                    fn_id, name, current
                )));
            }
            self.rename_function(fn_id, &current, &name);
        }

        let interface = operands[index..]
            .iter()
            .map(|id| {
                self.global_vars
                    .lookup(*id)
                    .map(|var| var.name.clone())
                    .ok_or(ErrorKind::UndefinedReference {
                        kind: IdKind::GlobalVariable,
                        id: *id,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("entry point {} ({})", name, execution_model);
        self.module.push(ModuleItem::EntryPoint(EntryPoint {
            execution_model,
            function: name,
            interface,
        }));
        Ok(())
    }

    pub(super) fn process_execution_mode(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpExecutionMode", Arity::AtLeast(2), operands.len())?;
        let function = self.functions.require(operands[0])?.name.clone();
        let mode = decode_enum("execution mode", operands[1], ExecutionMode::from_u32)?;
        self.module.push(ModuleItem::ExecutionMode(ExecutionModeDecl {
            function,
            mode,
            values: operands[2..].to_vec(),
        }));
        Ok(())
    }

    /// Rename a defined function, along with every reference to it
    fn rename_function(&mut self, fn_id: u32, old: &str, new: &str) {
        debug!("renaming function {} to {}", old, new);
        let item = self.functions.lookup_mut(fn_id).and_then(|info| {
            info.name = String::from(new);
            info.item
        });
        if let Some(func) = item.and_then(|index| self.module.function_at_mut(index)) {
            func.name = String::from(new);
        }
        for item in &mut self.module.items {
            match item {
                ModuleItem::Function(func) => {
                    for inst in func.all_insts() {
                        let data = func.dfg.inst_data_mut(inst);
                        if data.opcode != Opcode::FunctionCall {
                            continue;
                        }
                        if let Some(Attribute::SymbolRef(callee)) = data.attrs.get_mut("callee") {
                            if callee == old {
                                *callee = String::from(new);
                            }
                        }
                    }
                }
                ModuleItem::EntryPoint(ep) if ep.function == old => ep.function = String::from(new),
                ModuleItem::ExecutionMode(mode) if mode.function == old => {
                    mode.function = String::from(new)
                }
                _ => {}
            }
        }
    }
}
