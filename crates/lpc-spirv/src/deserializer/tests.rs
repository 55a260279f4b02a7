use alloc::{string::String, vec, vec::Vec};

use lpc_spvir::{
    verify, Attribute, Decoration, EnumAttr, Function, Inst, Location, Module, Opcode,
};

use crate::{
    cursor::MAGIC_NUMBER, deserialize, error::ErrorKind, opcode::Op, options::DeserializeOptions,
    table::IdKind, DeserializeError,
};

// <id>s defined by `Spirv::prelude`
const VOID: u32 = 1;
const FN_VOID: u32 = 2;
const I32: u32 = 3;
const BOOL: u32 = 4;
const ONE: u32 = 5;
const TRUE: u32 = 6;
const FN_I32: u32 = 7;
const TWO: u32 = 8;
const FN_VOID_I32: u32 = 9;

/// Word stream builder
struct Spirv {
    words: Vec<u32>,
}

impl Spirv {
    fn new() -> Self {
        Self {
            words: vec![MAGIC_NUMBER, 0x0001_0000, 0, 64, 0],
        }
    }

    fn op(mut self, op: Op, operands: &[u32]) -> Self {
        self.words
            .push(((operands.len() as u32 + 1) << 16) | op.as_u32());
        self.words.extend_from_slice(operands);
        self
    }

    fn prelude(self) -> Self {
        self.op(Op::TypeVoid, &[VOID])
            .op(Op::TypeFunction, &[FN_VOID, VOID])
            .op(Op::TypeInt, &[I32, 32, 0])
            .op(Op::TypeBool, &[BOOL])
            .op(Op::Constant, &[I32, ONE, 1])
            .op(Op::ConstantTrue, &[BOOL, TRUE])
            .op(Op::TypeFunction, &[FN_I32, I32])
            .op(Op::Constant, &[I32, TWO, 2])
            .op(Op::TypeFunction, &[FN_VOID_I32, VOID, I32])
    }

    fn run(self) -> Result<Module, DeserializeError> {
        deserialize(&self.words, &DeserializeOptions::default())
    }

    fn run_with(self, options: DeserializeOptions) -> Result<Module, DeserializeError> {
        deserialize(&self.words, &options)
    }
}

fn string(text: &str) -> Vec<u32> {
    let mut bytes = Vec::from(text.as_bytes());
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn with_string(head: &[u32], text: &str, tail: &[u32]) -> Vec<u32> {
    let mut words = head.to_vec();
    words.extend(string(text));
    words.extend_from_slice(tail);
    words
}

fn only_function(module: &Module) -> &Function {
    let mut functions = module.functions();
    let func = functions.next().expect("module has a function");
    assert!(functions.next().is_none());
    func
}

fn insts_with(func: &Function, opcode: Opcode) -> Vec<Inst> {
    func.all_insts()
        .into_iter()
        .filter(|inst| func.dfg.inst_data(*inst).opcode == opcode)
        .collect()
}

/// Selection over blocks 12 and 13 whose merge block 14 has a phi
fn selection_with_phi() -> Spirv {
    Spirv::new()
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::SelectionMerge, &[14, 0])
        .op(Op::BranchConditional, &[TRUE, 12, 13])
        .op(Op::Label, &[12])
        .op(Op::Branch, &[14])
        .op(Op::Label, &[13])
        .op(Op::Branch, &[14])
        .op(Op::Label, &[14])
        .op(Op::Phi, &[I32, 20, ONE, 12, TWO, 13])
        .op(Op::ReturnValue, &[20])
        .op(Op::FunctionEnd, &[])
}

/// Loop with header 12, continue block 13 and merge block 14; the header
/// carries a counter phi
fn counting_loop() -> Spirv {
    Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[12])
        .op(Op::Phi, &[I32, 20, ONE, 11, 21, 13])
        .op(Op::LoopMerge, &[14, 13, 0])
        .op(Op::BranchConditional, &[TRUE, 13, 14])
        .op(Op::Label, &[13])
        .op(Op::IAdd, &[I32, 21, 20, ONE])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[14])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
}

#[test]
fn test_empty_function() {
    let module = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    let func = module.function("spirv_fn_10").unwrap();
    assert_eq!(func.body_blocks().count(), 1);
    assert!(!func.is_declaration());
    verify(func).unwrap();
}

#[test]
fn test_missing_entry_label() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingEntryLabel(String::from("OpReturn")));
}

#[test]
fn test_missing_parameter() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID_I32])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingParameter { index: 0 });
}

#[test]
fn test_argument_type_mismatch() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID_I32])
        .op(Op::FunctionParameter, &[BOOL, 12])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::ArgTypeMismatch {
            index: 0,
            expected: String::from("i32"),
            found: String::from("i1"),
        }
    );
}

#[test]
fn test_return_type_mismatch() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_VOID])
        .run()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)));
}

#[test]
fn test_nested_function() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Function, &[VOID, 12, 0, FN_VOID])
        .run()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedInstruction(_)));
}

#[test]
fn test_duplicate_label() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[12])
        .op(Op::Return, &[])
        .op(Op::Label, &[12])
        .run()
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::DuplicateDefinition {
            table: IdKind::Block,
            id: 12
        }
    );
}

#[test]
fn test_branch_to_undefined_block() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Branch, &[12])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Block,
            id: 12
        }
    );
}

#[test]
fn test_instruction_after_terminator() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::ReturnValue, &[ONE])
        .op(Op::IAdd, &[I32, 20, ONE, ONE])
        .run()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnhandledInstruction(_)));
}

#[test]
fn test_constants_materialized_once_per_block() {
    let module = Spirv::new()
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::IAdd, &[I32, 20, ONE, ONE])
        .op(Op::IAdd, &[I32, 21, 20, ONE])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[12])
        .op(Op::ReturnValue, &[ONE])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    let func = only_function(&module);
    let blocks: Vec<_> = func.body_blocks().collect();
    let constants_in = |block| {
        func.block_insts(block)
            .filter(|inst| func.dfg.inst_data(*inst).opcode == Opcode::Constant)
            .count()
    };
    assert_eq!(constants_in(blocks[0]), 1);
    assert_eq!(constants_in(blocks[1]), 1);
    verify(func).unwrap();
}

#[test]
fn test_phi_becomes_block_parameter() {
    let options = DeserializeOptions::new().with_control_flow_structurization(false);
    let module = selection_with_phi().run_with(options).unwrap();
    let func = only_function(&module);

    assert!(insts_with(func, Opcode::Selection).is_empty());
    let blocks: Vec<_> = func.body_blocks().collect();
    assert_eq!(blocks.len(), 4);
    let merge = blocks[3];
    assert_eq!(func.block_params(merge).len(), 1);
    for pred in [blocks[1], blocks[2]] {
        let term = func.terminator(pred).unwrap();
        let succ = &func.dfg.inst_data(term).successors[0];
        assert_eq!(succ.block, merge);
        assert_eq!(succ.args.len(), 1);
    }
    verify(func).unwrap();
}

#[test]
fn test_phi_from_conditional_branch() {
    let options = DeserializeOptions::new().with_control_flow_structurization(false);
    let module = Spirv::new()
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::BranchConditional, &[TRUE, 12, 13])
        .op(Op::Label, &[12])
        .op(Op::Branch, &[13])
        .op(Op::Label, &[13])
        .op(Op::Phi, &[I32, 20, ONE, 11, TWO, 12])
        .op(Op::ReturnValue, &[20])
        .op(Op::FunctionEnd, &[])
        .run_with(options)
        .unwrap();

    let func = only_function(&module);
    let entry = func.entry_block().unwrap();
    let term = func.terminator(entry).unwrap();
    let data = func.dfg.inst_data(term);
    assert_eq!(data.opcode, Opcode::BranchConditional);
    assert!(data.successors[0].args.is_empty());
    assert_eq!(data.successors[1].args.len(), 1);
    verify(func).unwrap();
}

#[test]
fn test_undefined_phi_operand() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[12])
        .op(Op::Phi, &[I32, 20, 40, 11])
        .op(Op::ReturnValue, &[20])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedPhiOperand(40));
}

#[test]
fn test_selection_yields_merge_phi() {
    let module = selection_with_phi().run().unwrap();
    let func = only_function(&module);

    let selections = insts_with(func, Opcode::Selection);
    assert_eq!(selections.len(), 1);
    let selection = selections[0];
    let data = func.dfg.inst_data(selection);
    assert_eq!(data.results.len(), 1);
    assert_eq!(
        data.attrs.get("selection_control"),
        Some(&Attribute::Enum(EnumAttr::SelectionControl(
            lpc_spvir::SelectionControl::NONE
        )))
    );

    // entry, then the merge block holding the selection
    let blocks: Vec<_> = func.body_blocks().collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(func.layout.inst_block(selection), Some(blocks[1]));
    assert!(func.block_params(blocks[1]).is_empty());

    let ret = func.terminator(blocks[1]).unwrap();
    assert_eq!(func.dfg.inst_data(ret).args, vec![data.results[0]]);

    // header, two arms, merge
    let region = data.regions[0];
    let region_blocks: Vec<_> = func.region_blocks(region).collect();
    assert_eq!(region_blocks.len(), 4);
    let region_merge = *region_blocks.last().unwrap();
    assert_eq!(func.block_params(region_merge).len(), 1);
    verify(func).unwrap();
}

#[test]
fn test_selection_header_is_split() {
    let module = selection_with_phi().run().unwrap();
    let func = only_function(&module);

    // The condition was materialized in the entry block, which now falls
    // through to the merge block
    let entry = func.entry_block().unwrap();
    let insts: Vec<_> = func.block_insts(entry).collect();
    assert_eq!(insts.len(), 2);
    assert_eq!(func.dfg.inst_data(insts[0]).opcode, Opcode::Constant);
    assert_eq!(func.dfg.inst_data(insts[1]).opcode, Opcode::Branch);
}

#[test]
fn test_loop_structurized() {
    let module = counting_loop().run().unwrap();
    let func = only_function(&module);

    let loops = insts_with(func, Opcode::Loop);
    assert_eq!(loops.len(), 1);
    let data = func.dfg.inst_data(loops[0]);
    assert!(data.results.is_empty());

    // region: entry, header, continue, merge
    let region_blocks: Vec<_> = func.region_blocks(data.regions[0]).collect();
    assert_eq!(region_blocks.len(), 4);
    let entry_branch = func.terminator(region_blocks[0]).unwrap();
    let succ = &func.dfg.inst_data(entry_branch).successors[0];
    assert_eq!(succ.block, region_blocks[1]);
    assert_eq!(succ.args.len(), 1);

    // The old merge block took over the header's parameter
    let blocks: Vec<_> = func.body_blocks().collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(func.block_params(blocks[1]).len(), 1);
    assert_eq!(func.layout.first_inst(blocks[1]), Some(loops[0]));
    verify(func).unwrap();
}

#[test]
fn test_loop_merge_phi_unsupported() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[12])
        .op(Op::LoopMerge, &[14, 13, 0])
        .op(Op::BranchConditional, &[TRUE, 13, 14])
        .op(Op::Label, &[13])
        .op(Op::Branch, &[12])
        .op(Op::Label, &[14])
        .op(Op::Phi, &[I32, 20, ONE, 12])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedLoopMergePhi);
}

#[test]
fn test_duplicate_merge_annotation() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::SelectionMerge, &[14, 0])
        .op(Op::SelectionMerge, &[14, 0])
        .run()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedInstruction(_)));
}

#[test]
fn test_argument_decoration() {
    let module = Spirv::new()
        .prelude()
        .op(Op::Decorate, &[12, Decoration::Aliased.as_u32()])
        .op(Op::Function, &[VOID, 10, 0, FN_VOID_I32])
        .op(Op::FunctionParameter, &[I32, 12])
        .op(Op::Label, &[11])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    let func = only_function(&module);
    assert_eq!(func.args().len(), 1);
    assert_eq!(
        func.arg_attrs[0].get("spirv.decoration"),
        Some(&Attribute::Enum(EnumAttr::Decoration(Decoration::Aliased)))
    );
}

#[test]
fn test_conflicting_argument_decorations() {
    let err = Spirv::new()
        .prelude()
        .op(Op::Decorate, &[12, Decoration::Aliased.as_u32()])
        .op(Op::Decorate, &[12, Decoration::Restrict.as_u32()])
        .op(Op::Function, &[VOID, 10, 0, FN_VOID_I32])
        .op(Op::FunctionParameter, &[I32, 12])
        .run()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConflictingArgumentDecoration(12));
}

#[test]
fn test_import_linkage_is_declaration() {
    let linkage = with_string(
        &[10, Decoration::LinkageAttributes.as_u32()],
        "ext",
        &[lpc_spvir::LinkageType::Import.as_u32()],
    );
    let module = Spirv::new()
        .prelude()
        .op(Op::Decorate, &linkage)
        .op(Op::Function, &[VOID, 10, 0, FN_VOID_I32])
        .op(Op::FunctionParameter, &[I32, 12])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    let func = only_function(&module);
    assert!(func.is_declaration());
    assert!(matches!(
        func.attrs.get("linkage_attributes"),
        Some(Attribute::Linkage { .. })
    ));
}

#[test]
fn test_import_linkage_with_body() {
    let linkage = with_string(
        &[10, Decoration::LinkageAttributes.as_u32()],
        "ext",
        &[lpc_spvir::LinkageType::Import.as_u32()],
    );
    let err = Spirv::new()
        .prelude()
        .op(Op::Decorate, &linkage)
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .run()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedInstruction(_)));
}

#[test]
fn test_entry_point_names_function() {
    let entry_point = with_string(
        &[lpc_spvir::ExecutionModel::GLCompute.as_u32(), 10],
        "main",
        &[],
    );
    let module = Spirv::new()
        .op(Op::EntryPoint, &entry_point)
        .op(Op::ExecutionMode, &[10, lpc_spvir::ExecutionMode::LocalSize.as_u32(), 8, 1, 1])
        .prelude()
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    assert!(module.function("main").is_some());
    let ep = module.entry_points().next().unwrap();
    assert_eq!(ep.function, "main");
    let mode = module.execution_modes().next().unwrap();
    assert_eq!(mode.function, "main");
    assert_eq!(mode.values, vec![8, 1, 1]);
}

#[test]
fn test_spec_constant_operation() {
    let module = Spirv::new()
        .prelude()
        .op(Op::SpecConstant, &[I32, 30, 4])
        .op(Op::SpecConstantOp, &[I32, 31, Op::IAdd.as_u32(), 30, ONE])
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::ReturnValue, &[31])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    let func = only_function(&module);
    let ops = insts_with(func, Opcode::SpecConstantOperation);
    assert_eq!(ops.len(), 1);
    let data = func.dfg.inst_data(ops[0]);
    let body = func.region_blocks(data.regions[0]).next().unwrap();
    let opcodes: Vec<_> = func
        .block_insts(body)
        .map(|inst| func.dfg.inst_data(inst).opcode)
        .collect();
    assert_eq!(opcodes, vec![Opcode::IAdd, Opcode::Yield]);
    assert_eq!(insts_with(func, Opcode::ReferenceOf).len(), 1);
    assert_eq!(module.spec_constants().count(), 1);
    verify(func).unwrap();
}

#[test]
fn test_spec_constant_operation_rejects_function_value() {
    let err = Spirv::new()
        .prelude()
        .op(Op::SpecConstantOp, &[I32, 31, Op::IAdd.as_u32(), 20, ONE])
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::IAdd, &[I32, 20, ONE, ONE])
        .op(Op::ReturnValue, &[31])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap_err();

    assert_eq!(
        err.kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Value,
            id: 20
        }
    );
}

#[test]
fn test_error_reports_active_line() {
    let mut debug_string = vec![30];
    debug_string.extend(string("a.comp"));
    let err = Spirv::new()
        .op(Op::String, &debug_string)
        .prelude()
        .op(Op::Function, &[I32, 10, 0, FN_I32])
        .op(Op::Label, &[11])
        .op(Op::Line, &[30, 7, 3])
        .op(Op::IAdd, &[I32, 20, 99, ONE])
        .run()
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Value,
            id: 99
        }
    );
    assert_eq!(err.location, Location::file_line_col("a.comp", 7, 3));
}

#[test]
fn test_function_call_before_definition() {
    let module = Spirv::new()
        .prelude()
        .op(Op::Name, &with_string(&[20], "callee", &[]))
        .op(Op::Function, &[VOID, 10, 0, FN_VOID])
        .op(Op::Label, &[11])
        .op(Op::FunctionCall, &[VOID, 12, 20])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .op(Op::Function, &[VOID, 20, 0, FN_VOID])
        .op(Op::Label, &[21])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .run()
        .unwrap();

    let caller = module.function("spirv_fn_10").unwrap();
    let calls = insts_with(caller, Opcode::FunctionCall);
    assert_eq!(calls.len(), 1);
    assert_eq!(
        caller.dfg.inst_data(calls[0]).attrs.get("callee"),
        Some(&Attribute::SymbolRef(String::from("callee")))
    );
    assert!(module.function("callee").is_some());
}
