//! Tests for module-level instructions: header, types, globals, spec
//! constants and entry points

use lpc_spirv::{ErrorKind, IdKind, Op};
use lpc_spvir::{
    AddressingModel, Attribute, Capability, ExecutionMode, ExecutionModel, MemoryModel,
    ModuleItem, StorageClass, TypeData,
};
use spirv_test::*;

const PRIVATE: u32 = 6;
const UNIFORM: u32 = 2;

#[test]
fn test_module_header_and_vce() {
    let module = SpirvTest::new()
        .with_minor_version(3)
        .inst(Op::Capability, &[1])
        .inst(Op::Capability, &[11])
        .inst(Op::Capability, &[1])
        .inst_str(Op::Extension, &[], "SPV_KHR_storage_buffer_storage_class", &[])
        .inst(Op::MemoryModel, &[0, 1])
        .module();

    assert_eq!(module.addressing_model, Some(AddressingModel::Logical));
    assert_eq!(module.memory_model, Some(MemoryModel::GLSL450));
    let vce = module.vce.as_ref().unwrap();
    assert_eq!((vce.version.major, vce.version.minor), (1, 3));
    assert_eq!(vce.capabilities, vec![Capability::Shader, Capability::Int64]);
    assert_eq!(
        vce.extensions,
        vec![String::from("SPV_KHR_storage_buffer_storage_class")]
    );

    let text = format!("{}", module);
    assert_eq!(
        text.lines().next(),
        Some(
            "spirv.module Logical GLSL450 requires \
             #spirv.vce<v1.3, [Shader, Int64], [SPV_KHR_storage_buffer_storage_class]> {"
        )
    );
}

#[test]
fn test_named_global_with_decorations() {
    let module = SpirvTest::shader()
        .inst_str(Op::Name, &[30], "counter", &[])
        .inst(Op::Decorate, &[30, 33, 0])
        .inst(Op::Decorate, &[30, 34, 1])
        .inst(Op::TypePointer, &[22, UNIFORM, I32])
        .inst(Op::Variable, &[22, 30, UNIFORM])
        .module();

    let var = module.global_variable("counter").unwrap();
    let (pointee, storage) = module.types.pointee(var.ty).unwrap();
    assert_eq!(storage, StorageClass::Uniform);
    assert!(matches!(
        module.types.get(pointee),
        TypeData::Int { width: 32, .. }
    ));
    assert_eq!(var.attrs.get("binding").and_then(Attribute::as_int), Some(0));
    assert_eq!(var.attrs.get("descriptor_set").and_then(Attribute::as_int), Some(1));
    assert!(var.initializer.is_none());
}

#[test]
fn test_unnamed_global_with_initializer() {
    let module = SpirvTest::shader()
        .inst(Op::TypePointer, &[22, PRIVATE, I32])
        .inst(Op::Variable, &[22, 30, PRIVATE])
        .inst(Op::Variable, &[22, 31, PRIVATE, 30])
        .module();

    let names: Vec<&str> = module.global_variables().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["spirv_var_30", "spirv_var_31"]);
    let with_init = module.global_variable("spirv_var_31").unwrap();
    assert_eq!(with_init.initializer.as_deref(), Some("spirv_var_30"));
}

#[test]
fn test_global_storage_class_mismatch() {
    let kind = SpirvTest::shader()
        .inst(Op::TypePointer, &[22, PRIVATE, I32])
        .inst(Op::Variable, &[22, 30, UNIFORM])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::TypeMismatch(_)));
}

#[test]
fn test_global_of_non_pointer_type() {
    let kind = SpirvTest::shader()
        .inst(Op::Variable, &[I32, 30, PRIVATE])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::TypeMismatch(_)));
}

#[test]
fn test_spec_constant_with_spec_id() {
    let module = SpirvTest::shader()
        .inst(Op::Decorate, &[50, 1, 7])
        .inst(Op::SpecConstant, &[I32, 50, 42])
        .inst(Op::SpecConstantTrue, &[BOOL, 51])
        .module();

    let specs: Vec<_> = module.spec_constants().collect();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].name, "spirv_spec_const_50");
    assert_eq!(specs[0].default_value.as_int(), Some(42));
    assert_eq!(specs[0].attrs.get("spec_id").and_then(Attribute::as_int), Some(7));
    assert_eq!(specs[1].name, "spirv_spec_const_51");
    assert_eq!(specs[1].default_value.as_int(), Some(1));
}

#[test]
fn test_array_stride_from_decoration() {
    let module = SpirvTest::shader()
        .inst(Op::Decorate, &[40, 6, 16])
        .inst(Op::TypeArray, &[40, I32, TWO])
        .inst(Op::TypePointer, &[41, PRIVATE, 40])
        .inst(Op::Variable, &[41, 42, PRIVATE])
        .module();

    let var = module.global_variable("spirv_var_42").unwrap();
    let (array, _) = module.types.pointee(var.ty).unwrap();
    match module.types.get(array) {
        TypeData::Array {
            count, stride, ..
        } => assert_eq!((*count, *stride), (2, 16)),
        other => panic!("expected an array type, found {:?}", other),
    }
}

#[test]
fn test_conflicting_array_stride() {
    let kind = SpirvTest::shader()
        .inst(Op::Decorate, &[40, 6, 16])
        .inst(Op::Decorate, &[40, 6, 8])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::ConflictingDecoration(_)));
}

/// Struct 21 holds an i32 and a pointer to itself through pointer type 20;
/// `pointer_first` picks which of the two definitions comes first
fn self_referencing_struct(pointer_first: bool) -> SpirvTest {
    let test = SpirvTest::shader().inst(Op::TypeForwardPointer, &[20, PRIVATE]);
    let test = if pointer_first {
        test.inst(Op::TypePointer, &[20, PRIVATE, 21])
            .inst(Op::TypeStruct, &[21, I32, 20])
    } else {
        test.inst(Op::TypeStruct, &[21, I32, 20])
            .inst(Op::TypePointer, &[20, PRIVATE, 21])
    };
    test.inst(Op::Variable, &[20, 30, PRIVATE])
}

fn check_self_referencing_struct(pointer_first: bool) {
    let module = self_referencing_struct(pointer_first).module();
    let var = module.global_variable("spirv_var_30").unwrap();
    let (strukt, storage) = module.types.pointee(var.ty).unwrap();
    assert_eq!(storage, StorageClass::Private);

    let data = module.types.struct_data(strukt).unwrap();
    assert_eq!(data.name.as_deref(), Some("spirv_struct_21"));
    let body = data.body.as_ref().unwrap();
    assert_eq!(body.members.len(), 2);
    assert_eq!(body.members[1], var.ty);
}

#[test]
fn test_struct_through_forward_pointer_pointer_first() {
    check_self_referencing_struct(true);
}

#[test]
fn test_struct_through_forward_pointer_struct_first() {
    check_self_referencing_struct(false);
}

#[test]
fn test_struct_member_never_defined() {
    let kind = SpirvTest::shader()
        .inst(Op::TypeForwardPointer, &[20, PRIVATE])
        .inst(Op::TypeStruct, &[21, I32, 20])
        .expect_error_kind();
    assert_eq!(
        kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Type,
            id: 20
        }
    );
}

#[test]
fn test_struct_member_undefined_without_forward_pointer() {
    // The trailing unknown opcode is never reached
    let kind = SpirvTest::shader()
        .inst(Op::TypeStruct, &[21, I32, 20])
        .raw(&[(1 << 16) | 0xfff0])
        .expect_error_kind();
    assert_eq!(
        kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Type,
            id: 20
        }
    );
}

#[test]
fn test_entry_point_and_execution_mode() {
    let module = SpirvTest::shader()
        .inst_str(Op::EntryPoint, &[5, 10], "main", &[30])
        .inst(Op::ExecutionMode, &[10, 17, 8, 1, 1])
        .inst(Op::TypePointer, &[22, PRIVATE, I32])
        .inst(Op::Variable, &[22, 30, PRIVATE])
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
        .module();

    assert!(module.function("main").is_some());
    let entry = module.entry_points().next().unwrap();
    assert_eq!(entry.execution_model, ExecutionModel::GLCompute);
    assert_eq!(entry.function, "main");
    assert_eq!(entry.interface, ["spirv_var_30"]);

    let mode = module.execution_modes().next().unwrap();
    assert_eq!(mode.function, "main");
    assert_eq!(mode.mode, ExecutionMode::LocalSize);
    assert_eq!(mode.values, [8, 1, 1]);

    // Module items keep definition order; entry points are replayed last
    assert!(matches!(
        module.items.last(),
        Some(ModuleItem::ExecutionMode(_))
    ));
}

#[test]
fn test_entry_point_name_conflicts_with_debug_name() {
    let kind = SpirvTest::shader()
        .inst_str(Op::EntryPoint, &[5, 10], "main", &[])
        .inst_str(Op::Name, &[10], "helper", &[])
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::MalformedInstruction(_)));
}

#[test]
fn test_entry_point_for_unknown_function() {
    let kind = SpirvTest::shader()
        .inst_str(Op::EntryPoint, &[5, 10], "main", &[])
        .expect_error_kind();
    assert_eq!(
        kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Function,
            id: 10
        }
    );
}
