//! Module-scope `OpVariable`.

use alloc::{format, string::String};

use lpc_spvir::{GlobalVariable, ModuleItem, StorageClass};
use tracing::trace;

use super::{decode_enum, Deserializer, SymbolInfo};
use crate::{
    error::{Arity, ErrorKind},
    table::IdKind,
};

const VARIABLE_PREFIX: &str = "spirv_var_";

impl Deserializer<'_> {
    /// `OpVariable` outside a function: pointer type, result, storage class,
    /// optional initializer
    pub(super) fn process_global_variable(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpVariable", Arity::AtLeast(3), operands.len())?;
        let ty = self.type_of(operands[0])?;
        let id = operands[1];
        let storage = decode_enum("storage class", operands[2], StorageClass::from_u32)?;

        let Some((_, pointer_storage)) = self.module.types.pointee(ty) else {
            return Err(ErrorKind::TypeMismatch(format!(
                "expected a pointer type for global variable, found {}",
                self.module.types.display(ty)
            )));
        };
        if pointer_storage != storage {
            return Err(ErrorKind::TypeMismatch(format!(
                "storage class specifier {} of global variable does not match the pointer type {}",
                storage,
                self.module.types.display(ty)
            )));
        }

        let initializer = match operands.get(3) {
            Some(init) => Some(self.initializer_symbol(*init)?),
            None => None,
        };
        if operands.len() > 4 {
            return Err(ErrorKind::MalformedInstruction(String::from(
                "found more operands than expected when deserializing OpVariable",
            )));
        }

        let name = self.symbol_name(id, VARIABLE_PREFIX);
        trace!("global variable {} ({})", name, storage);
        self.module.push(ModuleItem::GlobalVariable(GlobalVariable {
            name: name.clone(),
            ty,
            initializer,
            attrs: self.decoration_attrs(id),
            loc: self.current_location(),
        }));
        self.global_vars.define(id, SymbolInfo { name, ty })
    }

    /// Symbol of a global variable initializer
    fn initializer_symbol(&self, id: u32) -> Result<String, ErrorKind> {
        self.global_vars
            .lookup(id)
            .or_else(|| self.spec_constants.lookup(id))
            .or_else(|| self.spec_composites.lookup(id))
            .map(|info| info.name.clone())
            .ok_or(ErrorKind::UndefinedReference {
                kind: IdKind::GlobalVariable,
                id,
            })
    }
}
