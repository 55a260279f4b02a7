//! Module deserializer.
//!
//! One `Deserializer` lives for one call to `deserialize`. It owns every
//! `<id>` table and the module under construction; the submodules add the
//! handlers for each family of instructions:
//! - `module_info`: capabilities, extensions, memory model, entry points
//! - `debug`: names, strings and line information
//! - `decoration`: `OpDecorate` and `OpMemberDecorate`
//! - `types`, `constants`, `globals`: module-level definitions
//! - `function`, `control_flow`, `ops`, `values`: function bodies
//! - `phi`, `structurize`: the two passes run at `OpFunctionEnd`

mod constants;
mod control_flow;
mod debug;
mod decoration;
mod function;
mod globals;
mod module_info;
mod ops;
mod phi;
mod structurize;
mod types;
mod values;

use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
    vec::Vec,
};

use lpc_spvir::{
    AttrDict, Attribute, Block, Capability, CursorInserter, Decoration, EnumAttr, Function,
    HasInsertPoint, InsertBuilder, InsertPoint, Location, Module, Type, Value, VceTriple,
};
use tracing::debug;

use crate::{
    cursor::{Header, Instruction, WordCursor, HEADER_WORDS},
    error::{DeserializeError, ErrorKind},
    opcode::Op,
    options::DeserializeOptions,
    table::{IdKind, IdTable},
};

pub(crate) fn deserialize(
    words: &[u32],
    options: &DeserializeOptions,
) -> Result<Module, DeserializeError> {
    let header = Header::parse(words)?;
    debug!(
        "header: version {}.{}, generator 0x{:08x}, bound {}",
        header.version.major, header.version.minor, header.generator, header.bound
    );

    let mut deserializer = Deserializer::new(words, header, *options);
    match deserializer.run() {
        Ok(()) => Ok(deserializer.module),
        Err(kind) => {
            debug!("deserialization failed: {}", kind);
            Err(DeserializeError::new(kind).with_location(deserializer.current_location()))
        }
    }
}

/// Symbol and type of a module-level definition referenced by name.
#[derive(Debug, Clone)]
struct SymbolInfo {
    name: String,
    ty: Type,
}

#[derive(Debug, Clone)]
struct FunctionInfo {
    name: String,
    /// Index into `Module::items`, set once the body is complete
    item: Option<usize>,
}

/// An `OpSpecConstantOp`, materialized at each use.
#[derive(Debug, Clone)]
struct SpecOp {
    opcode: u32,
    result_type: u32,
    operands: Vec<u32>,
}

/// A struct whose members include pointers not defined yet.
#[derive(Debug)]
struct DeferredStruct {
    ty: Type,
    members: Vec<Option<Type>>,
    /// (pointer `<id>`, member index)
    unresolved: Vec<(u32, usize)>,
    offsets: Vec<u32>,
    member_decorations: Vec<lpc_spvir::MemberDecoration>,
    member_names: Vec<String>,
}

/// Merge annotation of a header block.
#[derive(Debug, Clone)]
struct MergeInfo {
    loc: Location,
    /// Selection or loop control, as stored on the structured op
    control: EnumAttr,
    merge: Block,
    continue_: Option<Block>,
}

/// Incoming values for the phis of `target` along the edge from `pred`.
#[derive(Debug)]
struct PhiInfo {
    pred: Block,
    target: Block,
    values: Vec<u32>,
}

/// State of the function whose body is being read.
struct FunctionState {
    id: u32,
    func: Function,
    blocks: BTreeMap<u32, Block>,
    defined_labels: BTreeSet<u32>,
    values: IdTable<Value>,
    insert_point: InsertPoint,
    /// Header blocks in the order their merge instruction was read
    merge_info: Vec<(Block, MergeInfo)>,
    phi_info: Vec<PhiInfo>,
    /// Constants and symbol references already materialized per block
    materialized: BTreeMap<(Block, u32), Value>,
}

impl FunctionState {
    fn new(id: u32, func: Function) -> Self {
        Self {
            id,
            func,
            blocks: BTreeMap::new(),
            defined_labels: BTreeSet::new(),
            values: IdTable::new(IdKind::Value),
            insert_point: InsertPoint::Nowhere,
            merge_info: Vec::new(),
            phi_info: Vec::new(),
            materialized: BTreeMap::new(),
        }
    }

    /// Block for a label `<id>`, created and appended to the body on first
    /// reference
    fn get_or_create_block(&mut self, id: u32) -> Block {
        if let Some(block) = self.blocks.get(&id) {
            return *block;
        }
        let block = self.func.create_block();
        self.func.append_block(block);
        self.blocks.insert(id, block);
        block
    }

    /// Block the insertion point is in
    fn insert_block(&self) -> Option<Block> {
        match self.insert_point {
            InsertPoint::Nowhere => None,
            InsertPoint::End(block) => Some(block),
            InsertPoint::Before(inst) => self.func.layout.inst_block(inst),
        }
    }
}

pub(crate) struct Deserializer<'a> {
    cursor: WordCursor<'a>,
    options: DeserializeOptions,
    header: Header,
    module: Module,

    capabilities: Vec<Capability>,
    extensions: Vec<String>,
    ext_inst_sets: IdTable<String>,

    types: IdTable<Type>,
    constants: IdTable<(Attribute, Type)>,
    replicated_constants: IdTable<(Attribute, Type)>,
    spec_constants: IdTable<SymbolInfo>,
    spec_composites: IdTable<SymbolInfo>,
    spec_ops: IdTable<SpecOp>,
    global_vars: IdTable<SymbolInfo>,
    functions: IdTable<FunctionInfo>,
    undefs: IdTable<Type>,

    names: IdTable<String>,
    member_names: BTreeMap<u32, BTreeMap<u32, String>>,
    debug_strings: IdTable<String>,
    debug_line: Option<Location>,

    decorations: BTreeMap<u32, AttrDict>,
    /// `ArrayStride` values, keyed by array type `<id>`
    type_decorations: BTreeMap<u32, u32>,
    /// struct `<id>` -> member -> decoration -> literal words
    member_decorations: BTreeMap<u32, BTreeMap<u32, BTreeMap<Decoration, Vec<u32>>>>,

    forward_pointer_ids: BTreeSet<u32>,
    deferred_structs: Vec<DeferredStruct>,
    /// Structs named as a pointee before their `OpTypeStruct`
    predeclared_structs: BTreeMap<u32, Type>,

    func: Option<FunctionState>,
}

impl<'a> Deserializer<'a> {
    fn new(words: &'a [u32], header: Header, options: DeserializeOptions) -> Self {
        Self {
            cursor: WordCursor::new(words, HEADER_WORDS),
            options,
            header,
            module: Module::new(),
            capabilities: Vec::new(),
            extensions: Vec::new(),
            ext_inst_sets: IdTable::new(IdKind::ExtInstSet),
            types: IdTable::new(IdKind::Type),
            constants: IdTable::new(IdKind::Constant),
            replicated_constants: IdTable::new(IdKind::Constant),
            spec_constants: IdTable::new(IdKind::SpecConstant),
            spec_composites: IdTable::new(IdKind::SpecConstant),
            spec_ops: IdTable::new(IdKind::SpecConstant),
            global_vars: IdTable::new(IdKind::GlobalVariable),
            functions: IdTable::new(IdKind::Function),
            undefs: IdTable::new(IdKind::Undef),
            names: IdTable::new(IdKind::Name),
            member_names: BTreeMap::new(),
            debug_strings: IdTable::new(IdKind::DebugString),
            debug_line: None,
            decorations: BTreeMap::new(),
            type_decorations: BTreeMap::new(),
            member_decorations: BTreeMap::new(),
            forward_pointer_ids: BTreeSet::new(),
            deferred_structs: Vec::new(),
            predeclared_structs: BTreeMap::new(),
            func: None,
        }
    }

    fn run(&mut self) -> Result<(), ErrorKind> {
        while !self.cursor.is_at_end() {
            let inst = self.cursor.next_instruction()?;
            self.process_instruction(inst, false)?;
        }

        let deferred = self.cursor.take_deferred();
        debug!("replaying {} deferred instructions", deferred.len());
        for inst in deferred {
            self.process_instruction(inst, true)?;
        }

        self.finish()
    }

    /// Dispatch one instruction
    ///
    /// Entry points and execution modes are set aside unless `replaying`.
    fn process_instruction(&mut self, inst: Instruction<'a>, replaying: bool) -> Result<(), ErrorKind> {
        let Some(op) = inst.op() else {
            return Err(ErrorKind::UnknownOpcode(inst.opcode));
        };
        let operands = inst.operands;
        match op {
            Op::Nop
            | Op::Source
            | Op::SourceContinued
            | Op::SourceExtension
            | Op::ModuleProcessed => Ok(()),

            Op::Capability => self.process_capability(operands),
            Op::Extension => self.process_extension(operands),
            Op::ExtInstImport => self.process_ext_inst_import(operands),
            Op::MemoryModel => self.process_memory_model(operands),
            Op::EntryPoint | Op::ExecutionMode if !replaying => {
                self.cursor.defer(inst);
                Ok(())
            }
            Op::EntryPoint => self.process_entry_point(operands),
            Op::ExecutionMode => self.process_execution_mode(operands),

            Op::Name => self.process_name(operands),
            Op::MemberName => self.process_member_name(operands),
            Op::String => self.process_debug_string(operands),
            Op::Line => self.process_line(operands),
            Op::NoLine => {
                self.clear_debug_line();
                Ok(())
            }

            Op::Decorate => self.process_decoration(operands),
            Op::MemberDecorate => self.process_member_decoration(operands),

            Op::TypeVoid
            | Op::TypeBool
            | Op::TypeInt
            | Op::TypeFloat
            | Op::TypeVector
            | Op::TypeMatrix
            | Op::TypeImage
            | Op::TypeSampler
            | Op::TypeSampledImage
            | Op::TypeArray
            | Op::TypeRuntimeArray
            | Op::TypeStruct
            | Op::TypePointer
            | Op::TypeFunction
            | Op::TypeCooperativeMatrixKHR
            | Op::TypeTensorARM => self.process_type(op, operands),
            Op::TypeForwardPointer => self.process_type_forward_pointer(operands),

            Op::Constant => self.process_constant(operands, false),
            Op::SpecConstant => self.process_constant(operands, true),
            Op::ConstantTrue | Op::ConstantFalse => {
                self.process_constant_bool(operands, op == Op::ConstantTrue, false)
            }
            Op::SpecConstantTrue | Op::SpecConstantFalse => {
                self.process_constant_bool(operands, op == Op::SpecConstantTrue, true)
            }
            Op::ConstantComposite => self.process_constant_composite(operands),
            Op::ConstantCompositeReplicateEXT => self.process_constant_composite_replicate(operands),
            Op::ConstantNull => self.process_constant_null(operands),
            Op::SpecConstantComposite => self.process_spec_constant_composite(operands),
            Op::SpecConstantCompositeReplicateEXT => {
                self.process_spec_constant_composite_replicate(operands)
            }
            Op::SpecConstantOp => self.process_spec_constant_operation(operands),
            Op::Undef => self.process_undef(operands),

            Op::Variable if self.func.is_none() => self.process_global_variable(operands),

            Op::Function => self.process_function(operands),
            Op::FunctionParameter | Op::FunctionEnd => Err(ErrorKind::UnhandledInstruction(
                format!("{} must follow OpFunction", op.name()),
            )),

            Op::Label => self.process_label(operands),
            Op::Branch => self.process_branch(operands),
            Op::BranchConditional => self.process_branch_conditional(operands),
            Op::SelectionMerge => self.process_selection_merge(operands),
            Op::LoopMerge => self.process_loop_merge(operands),
            Op::Phi => self.process_phi(operands),
            Op::Switch => Err(ErrorKind::Unsupported(String::from("OpSwitch"))),

            _ => self.process_op(op, operands),
        }
    }

    fn finish(&mut self) -> Result<(), ErrorKind> {
        if let Some(deferred) = self.deferred_structs.first() {
            let (id, _) = deferred.unresolved[0];
            return Err(ErrorKind::UndefinedReference {
                kind: IdKind::Type,
                id,
            });
        }
        if let Some(id) = self.predeclared_structs.keys().next() {
            return Err(ErrorKind::UndefinedReference {
                kind: IdKind::Type,
                id: *id,
            });
        }

        self.module.vce = Some(VceTriple {
            version: self.header.version,
            capabilities: core::mem::take(&mut self.capabilities),
            extensions: core::mem::take(&mut self.extensions),
        });
        debug!("module complete with {} items", self.module.items.len());
        Ok(())
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn current_location(&self) -> Location {
        self.debug_line.clone().unwrap_or_default()
    }

    fn clear_debug_line(&mut self) {
        self.debug_line = None;
    }

    fn type_of(&self, id: u32) -> Result<Type, ErrorKind> {
        self.types.require(id).copied()
    }

    /// Symbol for `id`: its `OpName`, or `prefix` followed by the `<id>`
    fn symbol_name(&self, id: u32, prefix: &str) -> String {
        match self.names.lookup(id) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{}{}", prefix, id),
        }
    }

    /// Decorations recorded for `id`, as op attributes
    fn decoration_attrs(&self, id: u32) -> AttrDict {
        self.decorations.get(&id).cloned().unwrap_or_default()
    }

    /// Integer value of a normal constant, used where the format encodes a
    /// literal as a constant `<id>`
    fn constant_int(&self, id: u32) -> Result<i64, ErrorKind> {
        match self.constants.lookup(id) {
            Some((Attribute::Int { value, .. }, _)) => Ok(*value),
            Some(_) => Err(ErrorKind::TypeMismatch(format!(
                "constant <id> {} must be a scalar integer",
                id
            ))),
            None => Err(ErrorKind::UndefinedConstantOperand(id)),
        }
    }

    fn constant_u32(&self, id: u32) -> Result<u32, ErrorKind> {
        let value = self.constant_int(id)?;
        u32::try_from(value).map_err(|_| {
            ErrorKind::InvalidLiteral(format!("constant <id> {} has out of range value {}", id, value))
        })
    }

    fn state(&mut self) -> Result<&mut FunctionState, ErrorKind> {
        self.func.as_mut().ok_or_else(|| {
            ErrorKind::UnhandledInstruction(String::from("instruction must appear inside a function"))
        })
    }

    /// Builder at the current insertion point
    fn ins(&mut self) -> Result<InsertBuilder<'_, CursorInserter<'_>>, ErrorKind> {
        let state = self.state()?;
        Ok(state.func.ins(state.insert_point))
    }

    /// Insertion point inside the current block, for instructions that need one
    fn block_insert_point(&self, op: Op) -> Result<InsertPoint, ErrorKind> {
        match self.func.as_ref().map(|state| state.insert_point) {
            Some(at @ (InsertPoint::End(_) | InsertPoint::Before(_))) => Ok(at),
            _ => Err(ErrorKind::UnhandledInstruction(format!(
                "{} must appear inside a block",
                op.name()
            ))),
        }
    }
}

impl HasInsertPoint for Deserializer<'_> {
    fn insert_point(&self) -> InsertPoint {
        self.func
            .as_ref()
            .map_or(InsertPoint::Nowhere, |state| state.insert_point)
    }

    fn set_insert_point(&mut self, at: InsertPoint) {
        if let Some(state) = self.func.as_mut() {
            state.insert_point = at;
        }
    }
}

/// Decode a wire enumerant
fn decode_enum<T>(kind: &'static str, value: u32, decode: fn(u32) -> Option<T>) -> Result<T, ErrorKind> {
    decode(value).ok_or(ErrorKind::InvalidEnumValue { kind, value })
}

#[cfg(test)]
mod tests;
