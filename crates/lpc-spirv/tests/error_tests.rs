//! Tests for rejected binaries and error locations

use lpc_spirv::{deserialize, deserialize_bytes, DeserializeOptions, ErrorKind, IdKind, Op};
use lpc_spvir::Location;
use spirv_test::*;

#[test]
fn test_empty_binary() {
    let err = deserialize(&[], &DeserializeOptions::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedHeader(_)));
    assert_eq!(err.location, Location::Unknown);
}

#[test]
fn test_wrong_magic_number() {
    let mut words = SpirvTest::new().words().to_vec();
    words[0] = words[0].swap_bytes();
    let err = deserialize(&words, &DeserializeOptions::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedHeader(_)));
}

#[test]
fn test_unsupported_version() {
    let kind = SpirvTest::new().with_minor_version(9).expect_error_kind();
    assert!(matches!(kind, ErrorKind::MalformedHeader(_)));
}

#[test]
fn test_big_endian_bytes_are_rejected() {
    let mut bytes = Vec::new();
    for word in SpirvTest::new().words() {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    let err = deserialize_bytes(&bytes, &DeserializeOptions::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedHeader(_)));
}

#[test]
fn test_zero_word_count() {
    let kind = SpirvTest::new().raw(&[0]).expect_error_kind();
    assert!(matches!(kind, ErrorKind::MalformedInstruction(_)));
}

#[test]
fn test_instruction_runs_past_end() {
    // OpTypeInt claims four words but only two follow
    let kind = SpirvTest::new()
        .raw(&[(4 << 16) | Op::TypeInt.as_u32(), 3, 32])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::UnexpectedEnd(_)));
}

#[test]
fn test_unknown_opcode() {
    let kind = SpirvTest::new().raw(&[(1 << 16) | 0xfff0]).expect_error_kind();
    assert_eq!(kind, ErrorKind::UnknownOpcode(0xfff0));
}

#[test]
fn test_operand_arity() {
    let kind = SpirvTest::new()
        .inst(Op::TypeInt, &[3, 32])
        .expect_error_kind();
    assert!(matches!(
        kind,
        ErrorKind::OperandArityMismatch {
            op: "OpTypeInt",
            found: 2,
            ..
        }
    ));
}

#[test]
fn test_unknown_enum_value() {
    let kind = SpirvTest::new()
        .inst(Op::MemoryModel, &[0, 77])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::InvalidEnumValue { value: 77, .. }));
}

#[test]
fn test_duplicate_type_id() {
    let kind = SpirvTest::new()
        .inst(Op::TypeBool, &[4])
        .inst(Op::TypeVoid, &[4])
        .expect_error_kind();
    assert_eq!(
        kind,
        ErrorKind::DuplicateDefinition {
            table: IdKind::Type,
            id: 4
        }
    );
}

#[test]
fn test_undefined_type() {
    let kind = SpirvTest::new()
        .inst(Op::TypeVector, &[5, 99, 4])
        .expect_error_kind();
    assert_eq!(
        kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Type,
            id: 99
        }
    );
}

#[test]
fn test_oversized_vector_is_rejected() {
    let kind = SpirvTest::shader()
        .inst(Op::TypeVector, &[30, I32, 0xffff_ffff])
        .inst(Op::ConstantNull, &[30, 31])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::InvalidLiteral(_)));
}

#[test]
fn test_oversized_tensor_rank_is_rejected() {
    let kind = SpirvTest::shader()
        .inst(Op::Constant, &[I32, 30, 0x7fff_ffff])
        .inst(Op::TypeTensorARM, &[31, I32, 30])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::InvalidLiteral(_)));
}

#[test]
fn test_switch_is_unsupported() {
    let kind = SpirvTest::shader()
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Switch, &[ONE, 12])
        .inst(Op::Label, &[12])
        .inst(Op::Return, &[])
        .inst(Op::FunctionEnd, &[])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::Unsupported(_)));
}

#[test]
fn test_missing_function_end() {
    let kind = SpirvTest::shader()
        .inst(Op::Function, &[VOID, 10, 0, FN_VOID])
        .inst(Op::Label, &[11])
        .inst(Op::Return, &[])
        .expect_error_kind();
    assert!(matches!(kind, ErrorKind::UnexpectedEnd(_)));
}

#[test]
fn test_undefined_value_in_body() {
    let kind = SpirvTest::shader()
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::ReturnValue, &[99])
        .inst(Op::FunctionEnd, &[])
        .expect_error_kind();
    assert_eq!(
        kind,
        ErrorKind::UndefinedReference {
            kind: IdKind::Value,
            id: 99
        }
    );
}

#[test]
fn test_error_carries_debug_line() {
    let err = SpirvTest::shader()
        .inst_str(Op::String, &[40], "shader.comp", &[])
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Line, &[40, 12, 5])
        .inst(Op::ReturnValue, &[99])
        .inst(Op::FunctionEnd, &[])
        .expect_error();
    assert_eq!(err.location, Location::file_line_col("shader.comp", 12, 5));
    assert!(format!("{}", err).starts_with("loc(\"shader.comp\":12:5): "));
}

#[test]
fn test_no_line_clears_location() {
    let err = SpirvTest::shader()
        .inst_str(Op::String, &[40], "shader.comp", &[])
        .inst(Op::Function, &[I32, 10, 0, FN_I32])
        .inst(Op::Label, &[11])
        .inst(Op::Line, &[40, 12, 5])
        .inst(Op::NoLine, &[])
        .inst(Op::ReturnValue, &[99])
        .inst(Op::FunctionEnd, &[])
        .expect_error();
    assert_eq!(err.location, Location::Unknown);
}
