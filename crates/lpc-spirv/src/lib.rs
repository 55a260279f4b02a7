//! SPIR-V binary deserializer.
//!
//! Reads a SPIR-V word stream and builds an `lpc_spvir::Module`:
//! - Header validation and instruction slicing (`WordCursor`)
//! - Per-`<id>` tables for types, constants, values, names and decorations
//! - Function bodies with block arguments in place of `OpPhi`
//! - Structurization of merge-annotated control flow into selection and loop
//!   regions
//!
//! Deserialization is fail-fast: the first error aborts and is reported with
//! the `OpLine` location active at the time.

#![no_std]

extern crate alloc;

mod cursor;
mod deserializer;
mod error;
mod literal;
mod opcode;
mod options;
mod table;

use alloc::{format, vec::Vec};

use lpc_spvir::Module;

pub use cursor::{Header, Instruction, WordCursor, HEADER_WORDS, MAGIC_NUMBER};
pub use error::{Arity, DeserializeError, ErrorKind};
pub use literal::decode_string;
pub use opcode::{opcode_name, Op};
pub use options::DeserializeOptions;
pub use table::{IdKind, IdTable};

/// Deserialize a module from SPIR-V words
pub fn deserialize(words: &[u32], options: &DeserializeOptions) -> Result<Module, DeserializeError> {
    deserializer::deserialize(words, options)
}

/// Deserialize a module from little-endian SPIR-V bytes
pub fn deserialize_bytes(
    bytes: &[u8],
    options: &DeserializeOptions,
) -> Result<Module, DeserializeError> {
    if bytes.len() % 4 != 0 {
        return Err(ErrorKind::MalformedHeader(format!(
            "binary length {} is not a multiple of 4",
            bytes.len()
        ))
        .into());
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    deserialize(&words, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_must_be_word_aligned() {
        let err = deserialize_bytes(&[0x03, 0x02, 0x23], &DeserializeOptions::default())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedHeader(_)));
    }

    #[test]
    fn test_empty_module_from_bytes() {
        let mut bytes = Vec::new();
        for word in [MAGIC_NUMBER, 0x0001_0000, 0, 1, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let module = deserialize_bytes(&bytes, &DeserializeOptions::default()).unwrap();
        assert!(module.items.is_empty());
        let vce = module.vce.unwrap();
        assert_eq!(vce.version.minor, 0);
        assert!(vce.capabilities.is_empty());
    }
}
