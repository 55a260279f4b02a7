//! `OpFunction` through `OpFunctionEnd`.

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use lpc_spvir::{
    AttrDict, Attribute, Block, Decoration, EnumAttr, Function, FunctionControl, LinkageType,
    ModuleItem, Type,
};
use tracing::debug;

use super::{
    decode_enum, module_info::FUNCTION_PREFIX, Deserializer, FunctionInfo, FunctionState,
};
use crate::{
    error::{Arity, ErrorKind},
    opcode::Op,
    table::IdKind,
};

/// Argument decorations that become argument attributes; at most one may be
/// present per parameter
const ARGUMENT_DECORATIONS: [Decoration; 5] = [
    Decoration::Aliased,
    Decoration::Restrict,
    Decoration::AliasedPointer,
    Decoration::RestrictPointer,
    Decoration::RelaxedPrecision,
];

const ARGUMENT_DECORATION_ATTR: &str = "spirv.decoration";

impl<'a> Deserializer<'a> {
    /// `OpFunction`: result type, result, function control, function type
    ///
    /// Consumes the parameters and the body up to `OpFunctionEnd`, then wires
    /// phi edges and structurizes the control flow.
    pub(super) fn process_function(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        if self.func.is_some() {
            return Err(ErrorKind::MalformedInstruction(String::from(
                "found function inside function",
            )));
        }
        ErrorKind::check_arity("OpFunction", Arity::Exactly(4), operands.len())?;
        let result_type = self.type_of(operands[0])?;
        let id = operands[1];
        let control = decode_enum("function control", operands[2], FunctionControl::from_bits)?;
        let fn_ty = self.type_of(operands[3])?;

        let Some((params, results)) = self.module.types.function_signature(fn_ty) else {
            return Err(ErrorKind::TypeMismatch(format!(
                "type <id> {} of function <id> {} is not a function type",
                operands[3], id
            )));
        };
        let (params, results) = (params.to_vec(), results.to_vec());
        let return_matches = if self.module.types.is_void(result_type) {
            results.is_empty()
        } else {
            results == [result_type]
        };
        if !return_matches {
            return Err(ErrorKind::TypeMismatch(format!(
                "mismatch in function type {} and return type {} specified",
                self.module.types.display(fn_ty),
                self.module.types.display(result_type)
            )));
        }

        let name = self.symbol_name(id, FUNCTION_PREFIX);
        self.functions.define(
            id,
            FunctionInfo {
                name: name.clone(),
                item: None,
            },
        )?;
        debug!("[fn] {} <id> {}", name, id);

        let mut func = Function::new(name, fn_ty, control);
        func.attrs = self.decoration_attrs(id);
        func.loc = self.current_location();
        let is_import = matches!(
            func.attrs.get("linkage_attributes"),
            Some(Attribute::Linkage {
                linkage: LinkageType::Import,
                ..
            })
        );
        let entry = func.create_block();
        func.append_block(entry);
        self.func = Some(FunctionState::new(id, func));

        self.read_parameters(&params, entry)?;

        let inst = self.cursor.next_expecting(Op::Label)?;
        match inst.op() {
            Some(Op::FunctionEnd) => {
                ErrorKind::check_arity("OpFunctionEnd", Arity::Exactly(0), inst.operands.len())?;
                self.state()?.func.erase_block(entry);
                return self.finish_function();
            }
            _ if is_import => {
                return Err(ErrorKind::MalformedInstruction(String::from(
                    "function with Import linkage must not have a body",
                )))
            }
            Some(Op::Label) => {
                ErrorKind::check_arity("OpLabel", Arity::Exactly(1), inst.operands.len())?;
                self.state()?.blocks.insert(inst.operands[0], entry);
                self.process_label(inst.operands)?;
            }
            _ => return Err(ErrorKind::MissingEntryLabel(inst.name())),
        }

        loop {
            let inst = self.cursor.next_expecting(Op::FunctionEnd)?;
            if inst.op() == Some(Op::FunctionEnd) {
                ErrorKind::check_arity("OpFunctionEnd", Arity::Exactly(0), inst.operands.len())?;
                break;
            }
            self.process_instruction(inst, false)?;
        }
        self.finish_function()
    }

    /// One `OpFunctionParameter` per parameter type, each becoming an entry
    /// block parameter
    fn read_parameters(&mut self, params: &[Type], entry: Block) -> Result<(), ErrorKind> {
        let mut arg_attrs = Vec::with_capacity(params.len());
        for (index, expected) in params.iter().enumerate() {
            let inst = self.cursor.next_expecting(Op::FunctionParameter)?;
            if inst.op() != Some(Op::FunctionParameter) {
                return Err(ErrorKind::MissingParameter { index });
            }
            ErrorKind::check_arity("OpFunctionParameter", Arity::Exactly(2), inst.operands.len())?;
            let ty = self.type_of(inst.operands[0])?;
            if ty != *expected {
                return Err(ErrorKind::ArgTypeMismatch {
                    index,
                    expected: self.module.types.display(*expected).to_string(),
                    found: self.module.types.display(ty).to_string(),
                });
            }
            let param_id = inst.operands[1];
            arg_attrs.push(self.argument_attrs(param_id)?);

            let state = self.state()?;
            let value = state.func.append_block_param(entry, ty);
            state.values.define(param_id, value)?;
        }
        self.state()?.func.arg_attrs = arg_attrs;
        Ok(())
    }

    fn argument_attrs(&self, param_id: u32) -> Result<AttrDict, ErrorKind> {
        let mut attrs = AttrDict::new();
        let Some(decorations) = self.decorations.get(&param_id) else {
            return Ok(attrs);
        };
        for (name, _) in decorations.iter() {
            let Some(decoration) = ARGUMENT_DECORATIONS
                .iter()
                .find(|d| d.attr_name() == *name)
            else {
                return Err(ErrorKind::Unsupported(format!(
                    "argument decoration {} on <id> {}",
                    name, param_id
                )));
            };
            if attrs.contains(ARGUMENT_DECORATION_ATTR) {
                return Err(ErrorKind::ConflictingArgumentDecoration(param_id));
            }
            attrs.set(
                ARGUMENT_DECORATION_ATTR,
                Attribute::Enum(EnumAttr::Decoration(*decoration)),
            );
        }
        Ok(attrs)
    }

    /// Close the current function and add it to the module
    fn finish_function(&mut self) -> Result<(), ErrorKind> {
        let state = self.state()?;
        if let Some(id) = state
            .blocks
            .keys()
            .find(|id| !state.defined_labels.contains(id))
        {
            return Err(ErrorKind::UndefinedReference {
                kind: IdKind::Block,
                id: *id,
            });
        }

        self.wire_up_block_arguments()?;
        if self.options.enable_control_flow_structurization {
            self.split_conditional_blocks()?;
            self.structurize_all()?;
        } else {
            debug!("[cf] structurization disabled, dropping merge annotations");
            self.state()?.merge_info.clear();
        }

        self.clear_debug_line();
        let Some(state) = self.func.take() else {
            return Err(ErrorKind::UnhandledInstruction(String::from(
                "OpFunctionEnd must follow OpFunction",
            )));
        };
        debug!(
            "[fn] {} done with {} blocks",
            state.func.name,
            state.func.body_blocks().count()
        );
        let index = self.module.push(ModuleItem::Function(state.func));
        if let Some(info) = self.functions.lookup_mut(state.id) {
            info.item = Some(index);
        }
        Ok(())
    }
}
