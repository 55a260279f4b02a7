//! Wire opcodes.
//!
//! Only the instructions the deserializer understands are listed; any other
//! opcode number is reported by name `Op<n>` and rejected at dispatch.

use alloc::{format, string::String};

macro_rules! wire_opcodes {
    ($($variant:ident = $value:literal,)*) => {
        /// SPIR-V instruction opcode, as encoded in the low half of the
        /// first instruction word
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Op {
            $($variant,)*
        }

        impl Op {
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $($value => Some(Op::$variant),)*
                    _ => None,
                }
            }

            pub fn as_u32(self) -> u32 {
                match self {
                    $(Op::$variant => $value,)*
                }
            }

            /// Name as written in the SPIR-V specification, e.g. `OpTypeInt`
            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$variant => concat!("Op", stringify!($variant)),)*
                }
            }

            /// Inverse of `name`
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(concat!("Op", stringify!($variant)) => Some(Op::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

wire_opcodes! {
    Nop = 0,
    Undef = 1,
    SourceContinued = 2,
    Source = 3,
    SourceExtension = 4,
    Name = 5,
    MemberName = 6,
    String = 7,
    Line = 8,
    Extension = 10,
    ExtInstImport = 11,
    ExtInst = 12,
    MemoryModel = 14,
    EntryPoint = 15,
    ExecutionMode = 16,
    Capability = 17,
    TypeVoid = 19,
    TypeBool = 20,
    TypeInt = 21,
    TypeFloat = 22,
    TypeVector = 23,
    TypeMatrix = 24,
    TypeImage = 25,
    TypeSampler = 26,
    TypeSampledImage = 27,
    TypeArray = 28,
    TypeRuntimeArray = 29,
    TypeStruct = 30,
    TypePointer = 32,
    TypeFunction = 33,
    TypeForwardPointer = 39,
    ConstantTrue = 41,
    ConstantFalse = 42,
    Constant = 43,
    ConstantComposite = 44,
    ConstantNull = 46,
    SpecConstantTrue = 48,
    SpecConstantFalse = 49,
    SpecConstant = 50,
    SpecConstantComposite = 51,
    SpecConstantOp = 52,
    Function = 54,
    FunctionParameter = 55,
    FunctionEnd = 56,
    FunctionCall = 57,
    Variable = 59,
    Load = 61,
    Store = 62,
    CopyMemory = 63,
    AccessChain = 65,
    InBoundsAccessChain = 66,
    PtrAccessChain = 67,
    InBoundsPtrAccessChain = 70,
    Decorate = 71,
    MemberDecorate = 72,
    VectorExtractDynamic = 77,
    VectorInsertDynamic = 78,
    VectorShuffle = 79,
    CompositeConstruct = 80,
    CompositeExtract = 81,
    CompositeInsert = 82,
    CopyObject = 83,
    Transpose = 84,
    ConvertFToU = 109,
    ConvertFToS = 110,
    ConvertSToF = 111,
    ConvertUToF = 112,
    UConvert = 113,
    SConvert = 114,
    FConvert = 115,
    Bitcast = 124,
    SNegate = 126,
    FNegate = 127,
    IAdd = 128,
    FAdd = 129,
    ISub = 130,
    FSub = 131,
    IMul = 132,
    FMul = 133,
    UDiv = 134,
    SDiv = 135,
    FDiv = 136,
    UMod = 137,
    SRem = 138,
    SMod = 139,
    FRem = 140,
    FMod = 141,
    VectorTimesScalar = 142,
    MatrixTimesScalar = 143,
    MatrixTimesVector = 145,
    MatrixTimesMatrix = 146,
    Dot = 148,
    IsNan = 156,
    IsInf = 157,
    LogicalEqual = 164,
    LogicalNotEqual = 165,
    LogicalOr = 166,
    LogicalAnd = 167,
    LogicalNot = 168,
    Select = 169,
    IEqual = 170,
    INotEqual = 171,
    UGreaterThan = 172,
    SGreaterThan = 173,
    UGreaterThanEqual = 174,
    SGreaterThanEqual = 175,
    ULessThan = 176,
    SLessThan = 177,
    ULessThanEqual = 178,
    SLessThanEqual = 179,
    FOrdEqual = 180,
    FUnordEqual = 181,
    FOrdNotEqual = 182,
    FUnordNotEqual = 183,
    FOrdLessThan = 184,
    FUnordLessThan = 185,
    FOrdGreaterThan = 186,
    FUnordGreaterThan = 187,
    FOrdLessThanEqual = 188,
    FUnordLessThanEqual = 189,
    FOrdGreaterThanEqual = 190,
    FUnordGreaterThanEqual = 191,
    ShiftRightLogical = 194,
    ShiftRightArithmetic = 195,
    ShiftLeftLogical = 196,
    BitwiseOr = 197,
    BitwiseXor = 198,
    BitwiseAnd = 199,
    Not = 200,
    BitFieldInsert = 201,
    BitFieldSExtract = 202,
    BitFieldUExtract = 203,
    BitReverse = 204,
    BitCount = 205,
    ControlBarrier = 224,
    MemoryBarrier = 225,
    Phi = 245,
    LoopMerge = 246,
    SelectionMerge = 247,
    Label = 248,
    Branch = 249,
    BranchConditional = 250,
    Switch = 251,
    Kill = 252,
    Return = 253,
    ReturnValue = 254,
    Unreachable = 255,
    NoLine = 317,
    ModuleProcessed = 330,
    TypeTensorARM = 4163,
    TypeCooperativeMatrixKHR = 4456,
    ConstantCompositeReplicateEXT = 4461,
    SpecConstantCompositeReplicateEXT = 4462,
}

impl Op {
    /// Instructions that may be read ahead of their turn and replayed
    /// after the main pass
    pub fn is_deferrable(self) -> bool {
        matches!(self, Op::EntryPoint | Op::ExecutionMode)
    }

    /// Block terminators; an active `OpLine` ends with them
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Op::Branch
                | Op::BranchConditional
                | Op::Switch
                | Op::Kill
                | Op::Return
                | Op::ReturnValue
                | Op::Unreachable
        )
    }
}

/// Name of a raw opcode number, `Op<n>` when unknown
pub fn opcode_name(opcode: u32) -> String {
    match Op::from_u32(opcode) {
        Some(op) => String::from(op.name()),
        None => format!("Op<{}>", opcode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_numbers() {
        assert_eq!(Op::from_u32(21), Some(Op::TypeInt));
        assert_eq!(Op::TypeInt.as_u32(), 21);
        assert_eq!(Op::from_u32(4461), Some(Op::ConstantCompositeReplicateEXT));
        assert_eq!(Op::from_u32(9), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Op::SelectionMerge.name(), "OpSelectionMerge");
        assert_eq!(Op::from_name("OpLoopMerge"), Some(Op::LoopMerge));
        assert_eq!(Op::from_name("LoopMerge"), None);
        assert_eq!(opcode_name(248), "OpLabel");
        assert_eq!(opcode_name(9999), "Op<9999>");
    }

    #[test]
    fn test_deferrable() {
        assert!(Op::EntryPoint.is_deferrable());
        assert!(Op::ExecutionMode.is_deferrable());
        assert!(!Op::Function.is_deferrable());
    }
}
