//! Word stream cursor.
//!
//! The cursor slices one instruction at a time out of the word stream. It
//! never moves past the end of the stream: a truncated instruction is an
//! error and leaves the offset where it was.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::Version;

use crate::{
    error::ErrorKind,
    opcode::{opcode_name, Op},
};

pub const MAGIC_NUMBER: u32 = 0x0723_0203;

/// Words in the module header: magic, version, generator, bound, schema
pub const HEADER_WORDS: usize = 5;

const MAX_MINOR_VERSION: u32 = 6;

/// Module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: Version,
    pub generator: u32,
    /// Every `<id>` in the module is below this bound
    pub bound: u32,
}

impl Header {
    pub fn parse(words: &[u32]) -> Result<Self, ErrorKind> {
        if words.len() < HEADER_WORDS {
            return Err(ErrorKind::MalformedHeader(format!(
                "module must have a {}-word header, found {} words",
                HEADER_WORDS,
                words.len()
            )));
        }
        if words[0] != MAGIC_NUMBER {
            return Err(ErrorKind::MalformedHeader(format!(
                "incorrect magic number 0x{:08x}",
                words[0]
            )));
        }

        // 0 | major | minor | 0
        let version = words[1];
        if version >> 24 != 0 || version & 0xff != 0 {
            return Err(ErrorKind::MalformedHeader(format!(
                "malformed version word 0x{:08x}",
                version
            )));
        }
        let major = (version << 8) >> 24;
        let minor = (version << 16) >> 24;
        if major != 1 {
            return Err(ErrorKind::MalformedHeader(format!(
                "unsupported major version {}",
                major
            )));
        }
        if minor > MAX_MINOR_VERSION {
            return Err(ErrorKind::MalformedHeader(format!(
                "unsupported minor version {}",
                minor
            )));
        }

        Ok(Self {
            version: Version { major, minor },
            generator: words[2],
            bound: words[3],
        })
    }
}

/// One instruction: opcode plus its operand words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: u32,
    pub operands: &'a [u32],
}

impl<'a> Instruction<'a> {
    pub fn op(&self) -> Option<Op> {
        Op::from_u32(self.opcode)
    }

    pub fn name(&self) -> String {
        opcode_name(self.opcode)
    }
}

/// Cursor over the instruction stream after the header.
#[derive(Debug)]
pub struct WordCursor<'a> {
    words: &'a [u32],
    offset: usize,
    deferred: Vec<Instruction<'a>>,
}

impl<'a> WordCursor<'a> {
    pub fn new(words: &'a [u32], offset: usize) -> Self {
        Self {
            words,
            offset,
            deferred: Vec::new(),
        }
    }

    /// Word offset of the next instruction
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.words.len()
    }

    /// Slice the next instruction
    pub fn next_instruction(&mut self) -> Result<Instruction<'a>, ErrorKind> {
        self.slice(None)
    }

    /// Slice the next instruction that is not deferrable
    ///
    /// Deferrable instructions met on the way (entry points, execution
    /// modes) are set aside unless they are what the caller expects. The
    /// returned instruction may still differ from `expected`; checking that
    /// is up to the caller.
    pub fn next_expecting(&mut self, expected: Op) -> Result<Instruction<'a>, ErrorKind> {
        loop {
            let inst = self.slice(Some(expected))?;
            match inst.op() {
                Some(op) if op != expected && op.is_deferrable() => self.defer(inst),
                _ => return Ok(inst),
            }
        }
    }

    /// Set an instruction aside for replay after the main pass
    pub fn defer(&mut self, inst: Instruction<'a>) {
        self.deferred.push(inst);
    }

    /// Take the deferred instructions, in the order they were read
    pub fn take_deferred(&mut self) -> Vec<Instruction<'a>> {
        core::mem::take(&mut self.deferred)
    }

    fn slice(&mut self, expected: Option<Op>) -> Result<Instruction<'a>, ErrorKind> {
        let Some(&first) = self.words.get(self.offset) else {
            return Err(ErrorKind::UnexpectedEnd(match expected {
                Some(op) => format!("expected {} instruction", op.name()),
                None => String::from("expected more instructions"),
            }));
        };
        let word_count = (first >> 16) as usize;
        if word_count == 0 {
            return Err(ErrorKind::MalformedInstruction(format!(
                "word count cannot be zero at word {}",
                self.offset
            )));
        }
        let next = self.offset + word_count;
        if next > self.words.len() {
            return Err(ErrorKind::UnexpectedEnd(format!(
                "insufficient words for the last instruction: {} declared, {} left",
                word_count,
                self.words.len() - self.offset
            )));
        }
        let inst = Instruction {
            opcode: first & 0xffff,
            operands: &self.words[self.offset + 1..next],
        };
        self.offset = next;
        Ok(inst)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn word(op: Op, count: u32) -> u32 {
        (count << 16) | op.as_u32()
    }

    #[test]
    fn test_header_parse() {
        let header = Header::parse(&[MAGIC_NUMBER, 0x0001_0300, 7, 20, 0]).unwrap();
        assert_eq!(header.version, Version { major: 1, minor: 3 });
        assert_eq!(header.generator, 7);
        assert_eq!(header.bound, 20);
    }

    #[test]
    fn test_header_rejects_bad_magic_and_version() {
        assert!(matches!(
            Header::parse(&[0x0203_0723, 0x0001_0000, 0, 1, 0]),
            Err(ErrorKind::MalformedHeader(_))
        ));
        assert!(matches!(
            Header::parse(&[MAGIC_NUMBER, 0x0002_0000, 0, 1, 0]),
            Err(ErrorKind::MalformedHeader(_))
        ));
        assert!(matches!(
            Header::parse(&[MAGIC_NUMBER, 0x0001_0700, 0, 1, 0]),
            Err(ErrorKind::MalformedHeader(_))
        ));
        assert!(matches!(
            Header::parse(&[MAGIC_NUMBER, 0x0001_0000]),
            Err(ErrorKind::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_slices_instructions() {
        let words = vec![word(Op::Capability, 2), 1, word(Op::Nop, 1)];
        let mut cursor = WordCursor::new(&words, 0);

        let inst = cursor.next_instruction().unwrap();
        assert_eq!(inst.op(), Some(Op::Capability));
        assert_eq!(inst.operands, &[1]);

        let inst = cursor.next_instruction().unwrap();
        assert_eq!(inst.op(), Some(Op::Nop));
        assert!(inst.operands.is_empty());
        assert!(cursor.is_at_end());
        assert!(matches!(
            cursor.next_instruction(),
            Err(ErrorKind::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_truncated_instruction_does_not_advance() {
        let words = vec![word(Op::TypeInt, 4), 1, 32];
        let mut cursor = WordCursor::new(&words, 0);
        assert!(matches!(
            cursor.next_instruction(),
            Err(ErrorKind::UnexpectedEnd(_))
        ));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn test_zero_word_count() {
        let words = vec![Op::Nop.as_u32()];
        let mut cursor = WordCursor::new(&words, 0);
        assert!(matches!(
            cursor.next_instruction(),
            Err(ErrorKind::MalformedInstruction(_))
        ));
    }

    #[test]
    fn test_next_expecting_defers_entry_points() {
        let words = vec![
            word(Op::EntryPoint, 3),
            5,
            1,
            word(Op::FunctionParameter, 3),
            2,
            3,
        ];
        let mut cursor = WordCursor::new(&words, 0);
        let inst = cursor.next_expecting(Op::FunctionParameter).unwrap();
        assert_eq!(inst.op(), Some(Op::FunctionParameter));

        let deferred = cursor.take_deferred();
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].op(), Some(Op::EntryPoint));
        assert!(cursor.take_deferred().is_empty());
    }

    #[test]
    fn test_next_expecting_returns_mismatch() {
        let words = vec![word(Op::FunctionEnd, 1)];
        let mut cursor = WordCursor::new(&words, 0);
        let inst = cursor.next_expecting(Op::FunctionParameter).unwrap();
        assert_eq!(inst.op(), Some(Op::FunctionEnd));
        let err = cursor.next_expecting(Op::FunctionEnd).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::UnexpectedEnd(String::from("expected OpFunctionEnd instruction"))
        );
    }
}
