//! Deserialization errors.
//!
//! Handlers return `Result<_, ErrorKind>`; the driver wraps the first
//! failure into a `DeserializeError` carrying the active `OpLine` location.

use alloc::string::String;
use core::fmt;

use lpc_spvir::Location;
use thiserror::Error;

use crate::table::IdKind;

/// Expected operand count of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    /// Inclusive range
    Between(usize, usize),
    OneOf(&'static [usize]),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::OneOf(counts) => counts.contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(lo, hi) => write!(f, "between {} and {}", lo, hi),
            Arity::OneOf(counts) => {
                f.write_str("one of ")?;
                for (i, n) in counts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{}", n)?;
                }
                Ok(())
            }
        }
    }
}

/// What went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unexpected end of binary: {0}")]
    UnexpectedEnd(String),

    /// Structurally invalid instruction that is not an arity problem
    #[error("malformed instruction: {0}")]
    MalformedInstruction(String),

    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("unhandled instruction {0}")]
    UnhandledInstruction(String),

    #[error("duplicate definition of {table} <id> {id}")]
    DuplicateDefinition { table: IdKind, id: u32 },

    #[error("undefined {kind} <id> {id}")]
    UndefinedReference { kind: IdKind, id: u32 },

    #[error("{op} expects {expected} operands, found {found}")]
    OperandArityMismatch {
        op: &'static str,
        expected: Arity,
        found: usize,
    },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("missing OpFunctionParameter instruction for argument {index}")]
    MissingParameter { index: usize },

    #[error("argument {index} has type {found}, but the function type expects {expected}")]
    ArgTypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("more than one aliasing decoration for function argument with result <id> {0}")]
    ConflictingArgumentDecoration(u32),

    #[error("conflicting decoration: {0}")]
    ConflictingDecoration(String),

    #[error("a basic block must start with OpLabel, found {0}")]
    MissingEntryLabel(String),

    #[error("constant operand <id> {0} must come from a normal constant")]
    UndefinedConstantOperand(u32),

    #[error("OpPhi references undefined value <id> {0}")]
    UndefinedPhiOperand(u32),

    #[error("OpPhi in loop merge block unsupported")]
    UnsupportedLoopMergePhi,

    #[error("failed control flow structurization: {0}")]
    StructurizationEscape(String),

    #[error("invalid {kind} value {value}")]
    InvalidEnumValue { kind: &'static str, value: u32 },

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ErrorKind {
    /// Check `found` operands against `expected`
    pub fn check_arity(op: &'static str, expected: Arity, found: usize) -> Result<(), ErrorKind> {
        if expected.accepts(found) {
            Ok(())
        } else {
            Err(ErrorKind::OperandArityMismatch {
                op,
                expected,
                found,
            })
        }
    }
}

/// Deserialization failure with the source location active when it occurred.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}: {kind}")]
pub struct DeserializeError {
    pub kind: ErrorKind,
    pub location: Location,
}

impl DeserializeError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Location::Unknown,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

impl From<ErrorKind> for DeserializeError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::ToString};

    use super::*;

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Exactly(3).accepts(3));
        assert!(!Arity::Exactly(3).accepts(2));
        assert!(Arity::AtLeast(1).accepts(7));
        assert!(Arity::Between(2, 4).accepts(4));
        assert!(!Arity::Between(2, 4).accepts(5));
        assert!(Arity::OneOf(&[3, 5]).accepts(5));
        assert!(!Arity::OneOf(&[3, 5]).accepts(4));
    }

    #[test]
    fn test_check_arity_message() {
        let err = ErrorKind::check_arity("OpTypePointer", Arity::Exactly(3), 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "OpTypePointer expects exactly 3 operands, found 2"
        );
    }

    #[test]
    fn test_error_display_with_location() {
        let err = DeserializeError::new(ErrorKind::UnsupportedLoopMergePhi)
            .with_location(Location::file_line_col("a.comp", 3, 1));
        assert_eq!(
            format!("{}", err),
            "loc(\"a.comp\":3:1): OpPhi in loop merge block unsupported"
        );
        let err: DeserializeError = ErrorKind::UnknownOpcode(9999).into();
        assert_eq!(err.to_string(), "loc(unknown): unknown opcode 9999");
    }
}
