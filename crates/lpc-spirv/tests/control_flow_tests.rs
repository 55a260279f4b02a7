//! Tests for phis, selections and loops

use lpc_spirv::{ErrorKind, Op};
use lpc_spvir::{Function, Inst, Opcode};
use spirv_test::*;

fn insts_with(func: &Function, opcode: Opcode) -> Vec<Inst> {
    func.all_insts()
        .into_iter()
        .filter(|inst| func.dfg.inst_data(*inst).opcode == opcode)
        .collect()
}

/// `if (true) x = 1 else x = 2; return x`
fn if_else_phi() -> SpirvTest {
    SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::SelectionMerge, &[14, 0])
        .inst(Op::BranchConditional, &[TRUE, 12, 13])
        .inst(Op::Label, &[12])
        .inst(Op::Branch, &[14])
        .inst(Op::Label, &[13])
        .inst(Op::Branch, &[14])
        .inst(Op::Label, &[14])
        .inst(Op::Phi, &[I32, 20, ONE, 12, TWO, 13])
        .inst(Op::ReturnValue, &[20])
        .inst(Op::FunctionEnd, &[])
}

/// `for (i = 1; true; i += 1) {}`
fn counting_loop() -> SpirvTest {
    SpirvTest::shader()
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::Phi, &[I32, 20, ONE, 11, 21, 13])
        .inst(Op::LoopMerge, &[14, 13, 0])
        .inst(Op::BranchConditional, &[TRUE, 13, 14])
        .inst(Op::Label, &[13])
        .inst(Op::IAdd, &[I32, 21, 20, ONE])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[14])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
}

#[test]
fn test_if_else_phi_structurized() {
    if_else_phi().assert_function(
        "spirv_fn_10",
        r#"
        spirv.func @spirv_fn_10() -> i32 "None" {
          %0 = spirv.Constant {value = true : i1} : i1
          spirv.Branch ^bb1
        ^bb1:
          %1 = spirv.mlir.selection {selection_control = #spirv.selection_control<None>} : i32 {
            spirv.BranchConditional %0, ^bb1, ^bb2 : i1
          ^bb1:
            %2 = spirv.Constant {value = 1 : i32} : i32
            spirv.Branch ^bb3(%2 : i32)
          ^bb2:
            %3 = spirv.Constant {value = 2 : i32} : i32
            spirv.Branch ^bb3(%3 : i32)
          ^bb3(%4: i32):
            spirv.mlir.merge %4 : i32
          }
          spirv.ReturnValue %1 : i32
        }
    "#,
    );
}

#[test]
fn test_if_else_phi_unstructured() {
    if_else_phi().without_structurization().assert_function(
        "spirv_fn_10",
        r#"
        spirv.func @spirv_fn_10() -> i32 "None" {
          %0 = spirv.Constant {value = true : i1} : i1
          spirv.BranchConditional %0, ^bb2, ^bb3 : i1
        ^bb1(%1: i32):
          spirv.ReturnValue %1 : i32
        ^bb2:
          %2 = spirv.Constant {value = 1 : i32} : i32
          spirv.Branch ^bb1(%2 : i32)
        ^bb3:
          %3 = spirv.Constant {value = 2 : i32} : i32
          spirv.Branch ^bb1(%3 : i32)
        }
    "#,
    );
}

#[test]
fn test_counting_loop_structurized() {
    counting_loop().assert_function(
        "spirv_fn_10",
        r#"
        spirv.func @spirv_fn_10() "None" {
          %0 = spirv.Constant {value = 1 : i32} : i32
          spirv.Branch ^bb1(%0 : i32)
        ^bb1(%1: i32):
          spirv.mlir.loop {loop_control = #spirv.loop_control<None>} {
            spirv.Branch ^bb1(%1 : i32)
          ^bb1(%2: i32):
            %3 = spirv.Constant {value = true : i1} : i1
            spirv.BranchConditional %3, ^bb2, ^bb3 : i1
          ^bb2:
            %4 = spirv.Constant {value = 1 : i32} : i32
            %5 = spirv.IAdd %2, %4 : i32
            spirv.Branch ^bb1(%5 : i32)
          ^bb3:
            spirv.mlir.merge
          }
          spirv.Return
        }
    "#,
    );
}

#[test]
fn test_counting_loop_unstructured_keeps_back_edge() {
    let module = counting_loop().without_structurization().module();
    let func = get_function(&module, "spirv_fn_10");
    assert!(insts_with(func, Opcode::Loop).is_empty());
    assert_eq!(func.body_blocks().count(), 4);

    let header = func.body_blocks().nth(1).unwrap();
    assert_eq!(func.block_params(header).len(), 1);
    // Entry edge and back edge
    assert_eq!(func.block_users(header).len(), 2);
}

#[test]
fn test_selection_nested_in_loop() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::LoopMerge, &[16, 13, 0])
        .inst(Op::BranchConditional, &[TRUE, 14, 16])
        .inst(Op::Label, &[14])
        .inst(Op::SelectionMerge, &[15, 0])
        .inst(Op::BranchConditional, &[TRUE, 17, 15])
        .inst(Op::Label, &[17])
        .inst(Op::Branch, &[15])
        .inst(Op::Label, &[15])
        .inst(Op::Branch, &[13])
        .inst(Op::Label, &[13])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[16])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
        .module();
    let func = get_function(&module, "spirv_fn_10");

    // Entry block and the loop's merge block
    assert_eq!(func.body_blocks().count(), 2);

    let loops = insts_with(func, Opcode::Loop);
    let selections = insts_with(func, Opcode::Selection);
    assert_eq!(loops.len(), 1);
    assert_eq!(selections.len(), 1);

    let selection_block = func.layout.inst_block(selections[0]).unwrap();
    assert_eq!(func.layout.block_parent_inst(selection_block), Some(loops[0]));
    assert!(func.body_blocks().all(|block| {
        func.block_insts(block)
            .all(|inst| func.dfg.inst_data(inst).opcode != Opcode::Selection)
    }));
}

#[test]
fn test_selection_without_outside_uses_has_no_results() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::SelectionMerge, &[14, 0])
        .inst(Op::BranchConditional, &[TRUE, 12, 14])
        .inst(Op::Label, &[12])
        .inst(Op::Branch, &[14])
        .inst(Op::Label, &[14])
        .inst(Op::ReturnValue, &[ONE])
        .inst(Op::FunctionEnd, &[])
        .module();
    let func = get_function(&module, "spirv_fn_10");
    let selections = insts_with(func, Opcode::Selection);
    assert_eq!(selections.len(), 1);
    // Nothing defined inside the construct is used after it
    assert!(func.dfg.inst_results(selections[0]).is_empty());
}

#[test]
fn test_iadd_in_header_used_after_selection() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[15])
        .inst(Op::Label, &[15])
        .inst(Op::IAdd, &[I32, 20, ONE, TWO])
        .inst(Op::SelectionMerge, &[14, 0])
        .inst(Op::BranchConditional, &[TRUE, 12, 14])
        .inst(Op::Label, &[12])
        .inst(Op::Branch, &[14])
        .inst(Op::Label, &[14])
        .inst(Op::ReturnValue, &[20])
        .inst(Op::FunctionEnd, &[])
        .module();
    let func = get_function(&module, "spirv_fn_10");

    // The header is split, so the add stays in front of the construct
    let selections = insts_with(func, Opcode::Selection);
    assert_eq!(selections.len(), 1);
    let add = insts_with(func, Opcode::IAdd)[0];
    let add_block = func.layout.inst_block(add).unwrap();
    assert!(func.layout.block_parent_inst(add_block).is_none());
}

#[test]
fn test_value_from_loop_header_is_yielded() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::IAdd, &[I32, 20, ONE, TWO])
        .inst(Op::LoopMerge, &[14, 13, 0])
        .inst(Op::BranchConditional, &[TRUE, 13, 14])
        .inst(Op::Label, &[13])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[14])
        .inst(Op::ReturnValue, &[20])
        .inst(Op::FunctionEnd, &[])
        .module();
    let func = get_function(&module, "spirv_fn_10");

    let loops = insts_with(func, Opcode::Loop);
    assert_eq!(loops.len(), 1);
    let results = func.dfg.inst_results(loops[0]);
    assert_eq!(results.len(), 1);

    let ret = insts_with(func, Opcode::ReturnValue)[0];
    assert_eq!(func.dfg.inst_args(ret), results);
    let merges = insts_with(func, Opcode::Merge);
    let loop_merge = merges
        .iter()
        .copied()
        .find(|merge| {
            let block = func.layout.inst_block(*merge).unwrap();
            func.layout.block_parent_inst(block) == Some(loops[0])
        })
        .unwrap();
    let yielded = func.dfg.inst_args(loop_merge);
    assert_eq!(yielded.len(), 1);
    let add = insts_with(func, Opcode::IAdd)[0];
    assert_eq!(yielded[0], func.dfg.inst_results(add)[0]);
}

#[test]
fn test_selection_merging_into_loop_header_precedes_loop() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::SelectionMerge, &[12, 0])
        .inst(Op::BranchConditional, &[TRUE, 15, 12])
        .inst(Op::Label, &[15])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::LoopMerge, &[14, 13, 0])
        .inst(Op::BranchConditional, &[TRUE, 13, 14])
        .inst(Op::Label, &[13])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[14])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
        .module();
    let func = get_function(&module, "spirv_fn_10");

    let selections = insts_with(func, Opcode::Selection);
    let loops = insts_with(func, Opcode::Loop);
    assert_eq!(selections.len(), 1);
    assert_eq!(loops.len(), 1);

    // Siblings in the function body, selection first
    let selection_block = func.layout.inst_block(selections[0]).unwrap();
    let loop_block = func.layout.inst_block(loops[0]).unwrap();
    assert_eq!(selection_block, loop_block);
    assert!(func.layout.block_parent_inst(loop_block).is_none());
    let order: Vec<Opcode> = func
        .block_insts(loop_block)
        .map(|inst| func.dfg.inst_data(inst).opcode)
        .collect();
    assert_eq!(order, vec![Opcode::Selection, Opcode::Loop, Opcode::Return]);
}

#[test]
fn test_loop_merge_phi_is_rejected() {
    let kind = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::LoopMerge, &[14, 13, 0])
        .inst(Op::BranchConditional, &[TRUE, 13, 14])
        .inst(Op::Label, &[13])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[14])
        .inst(Op::Phi, &[I32, 20, ONE, 12])
        .inst(Op::ReturnValue, &[20])
        .inst(Op::FunctionEnd, &[])
        .expect_error_kind();
    assert_eq!(kind, ErrorKind::UnsupportedLoopMergePhi);
}

#[test]
fn test_loop_merge_phi_accepted_without_structurization() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::LoopMerge, &[14, 13, 0])
        .inst(Op::BranchConditional, &[TRUE, 13, 14])
        .inst(Op::Label, &[13])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[14])
        .inst(Op::Phi, &[I32, 20, ONE, 12])
        .inst(Op::ReturnValue, &[20])
        .inst(Op::FunctionEnd, &[])
        .without_structurization()
        .module();
    let func = get_function(&module, "spirv_fn_10");
    let with_params = func
        .body_blocks()
        .filter(|block| !func.block_params(*block).is_empty())
        .count();
    assert_eq!(with_params, 1);
}

#[test]
fn test_phi_operand_defined_later_in_body() {
    // The incoming value of the back edge is defined after the phi
    let module = counting_loop().without_structurization().module();
    let func = get_function(&module, "spirv_fn_10");
    let add = insts_with(func, Opcode::IAdd)[0];
    let sum = func.dfg.inst_results(add)[0];
    let users = func.value_users(sum);
    assert_eq!(users.len(), 1);
    assert_eq!(func.dfg.inst_data(users[0]).opcode, Opcode::Branch);
}

#[test]
fn test_phi_with_undefined_operand() {
    let kind = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::Phi, &[I32, 20, 99, 11])
        .inst(Op::ReturnValue, &[20])
        .inst(Op::FunctionEnd, &[])
        .expect_error_kind();
    assert_eq!(kind, ErrorKind::UndefinedPhiOperand(99));
}

#[test]
fn test_unreferenced_block_is_not_reachable() {
    let module = SpirvTest::shader()
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Branch, &[12])
        .inst(Op::Label, &[12])
        .inst(Op::Return, &[])
        .inst(Op::Label, &[13])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
        .module();
    let func = get_function(&module, "spirv_fn_10");

    let entry = func.body_blocks().next().unwrap();
    let mut reachable = vec![entry];
    let mut next = 0;
    while next < reachable.len() {
        for succ in func.successors(reachable[next]) {
            if !reachable.contains(&succ) {
                reachable.push(succ);
            }
        }
        next += 1;
    }
    assert_eq!(reachable.len(), 2);
}
