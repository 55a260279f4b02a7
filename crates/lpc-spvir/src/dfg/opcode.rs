//! Operation opcodes.
//!
//! The opcode says what an operation does; operands, successors, nested
//! regions and attributes live in `InstData`.

use core::fmt;

macro_rules! opcodes {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        /// Operation opcode
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $($(#[$meta])* $variant,)*
        }

        impl Opcode {
            /// Fully qualified operation name, as printed
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    // Constants and symbol references
    Constant => "spirv.Constant",
    ConstantCompositeReplicate => "spirv.EXT.ConstantCompositeReplicate",
    /// Address of a global variable
    AddressOf => "spirv.mlir.addressof",
    /// Value of a specialization constant
    ReferenceOf => "spirv.mlir.referenceof",
    Undef => "spirv.Undef",
    /// Specialization-constant expression with a one-block body
    SpecConstantOperation => "spirv.SpecConstantOperation",

    // Structured control flow
    Selection => "spirv.mlir.selection",
    Loop => "spirv.mlir.loop",
    /// Leaves a structured region, passing the escaping values
    Merge => "spirv.mlir.merge",
    Yield => "spirv.mlir.yield",

    // Terminators
    Branch => "spirv.Branch",
    BranchConditional => "spirv.BranchConditional",
    Return => "spirv.Return",
    ReturnValue => "spirv.ReturnValue",
    Unreachable => "spirv.Unreachable",
    Kill => "spirv.Kill",

    // Calls and extended instruction sets
    FunctionCall => "spirv.FunctionCall",
    ExtInst => "spirv.ExtInst",

    // Memory
    Variable => "spirv.Variable",
    Load => "spirv.Load",
    Store => "spirv.Store",
    CopyMemory => "spirv.CopyMemory",
    AccessChain => "spirv.AccessChain",
    InBoundsPtrAccessChain => "spirv.InBoundsPtrAccessChain",
    PtrAccessChain => "spirv.PtrAccessChain",

    // Composites
    CompositeConstruct => "spirv.CompositeConstruct",
    CompositeExtract => "spirv.CompositeExtract",
    CompositeInsert => "spirv.CompositeInsert",
    VectorExtractDynamic => "spirv.VectorExtractDynamic",
    VectorInsertDynamic => "spirv.VectorInsertDynamic",
    VectorShuffle => "spirv.VectorShuffle",
    VectorTimesScalar => "spirv.VectorTimesScalar",
    MatrixTimesScalar => "spirv.MatrixTimesScalar",
    MatrixTimesVector => "spirv.MatrixTimesVector",
    MatrixTimesMatrix => "spirv.MatrixTimesMatrix",
    Transpose => "spirv.Transpose",
    Dot => "spirv.Dot",
    CopyObject => "spirv.CopyObject",

    // Conversions
    ConvertFToU => "spirv.ConvertFToU",
    ConvertFToS => "spirv.ConvertFToS",
    ConvertSToF => "spirv.ConvertSToF",
    ConvertUToF => "spirv.ConvertUToF",
    UConvert => "spirv.UConvert",
    SConvert => "spirv.SConvert",
    FConvert => "spirv.FConvert",
    Bitcast => "spirv.Bitcast",

    // Arithmetic
    SNegate => "spirv.SNegate",
    FNegate => "spirv.FNegate",
    IAdd => "spirv.IAdd",
    FAdd => "spirv.FAdd",
    ISub => "spirv.ISub",
    FSub => "spirv.FSub",
    IMul => "spirv.IMul",
    FMul => "spirv.FMul",
    UDiv => "spirv.UDiv",
    SDiv => "spirv.SDiv",
    FDiv => "spirv.FDiv",
    UMod => "spirv.UMod",
    SRem => "spirv.SRem",
    SMod => "spirv.SMod",
    FRem => "spirv.FRem",
    FMod => "spirv.FMod",
    IsNan => "spirv.IsNan",
    IsInf => "spirv.IsInf",

    // Logical
    LogicalEqual => "spirv.LogicalEqual",
    LogicalNotEqual => "spirv.LogicalNotEqual",
    LogicalOr => "spirv.LogicalOr",
    LogicalAnd => "spirv.LogicalAnd",
    LogicalNot => "spirv.LogicalNot",
    Select => "spirv.Select",

    // Comparisons
    IEqual => "spirv.IEqual",
    INotEqual => "spirv.INotEqual",
    UGreaterThan => "spirv.UGreaterThan",
    SGreaterThan => "spirv.SGreaterThan",
    UGreaterThanEqual => "spirv.UGreaterThanEqual",
    SGreaterThanEqual => "spirv.SGreaterThanEqual",
    ULessThan => "spirv.ULessThan",
    SLessThan => "spirv.SLessThan",
    ULessThanEqual => "spirv.ULessThanEqual",
    SLessThanEqual => "spirv.SLessThanEqual",
    FOrdEqual => "spirv.FOrdEqual",
    FUnordEqual => "spirv.FUnordEqual",
    FOrdNotEqual => "spirv.FOrdNotEqual",
    FUnordNotEqual => "spirv.FUnordNotEqual",
    FOrdLessThan => "spirv.FOrdLessThan",
    FUnordLessThan => "spirv.FUnordLessThan",
    FOrdGreaterThan => "spirv.FOrdGreaterThan",
    FUnordGreaterThan => "spirv.FUnordGreaterThan",
    FOrdLessThanEqual => "spirv.FOrdLessThanEqual",
    FUnordLessThanEqual => "spirv.FUnordLessThanEqual",
    FOrdGreaterThanEqual => "spirv.FOrdGreaterThanEqual",
    FUnordGreaterThanEqual => "spirv.FUnordGreaterThanEqual",

    // Bitwise
    ShiftRightLogical => "spirv.ShiftRightLogical",
    ShiftRightArithmetic => "spirv.ShiftRightArithmetic",
    ShiftLeftLogical => "spirv.ShiftLeftLogical",
    BitwiseOr => "spirv.BitwiseOr",
    BitwiseXor => "spirv.BitwiseXor",
    BitwiseAnd => "spirv.BitwiseAnd",
    Not => "spirv.Not",
    BitFieldInsert => "spirv.BitFieldInsert",
    BitFieldSExtract => "spirv.BitFieldSExtract",
    BitFieldUExtract => "spirv.BitFieldUExtract",
    BitReverse => "spirv.BitReverse",
    BitCount => "spirv.BitCount",

    // Barriers
    ControlBarrier => "spirv.ControlBarrier",
    MemoryBarrier => "spirv.MemoryBarrier",
}

impl Opcode {
    /// Check whether this opcode ends a block
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Branch
                | Opcode::BranchConditional
                | Opcode::Return
                | Opcode::ReturnValue
                | Opcode::Unreachable
                | Opcode::Kill
                | Opcode::Merge
                | Opcode::Yield
        )
    }

    /// Check whether this opcode owns nested regions
    pub fn has_regions(self) -> bool {
        matches!(
            self,
            Opcode::Selection | Opcode::Loop | Opcode::SpecConstantOperation
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
