//! Debug information: names, strings and source lines.

use alloc::{format, string::String};

use lpc_spvir::{Location, UNKNOWN_FILE};
use tracing::trace;

use super::Deserializer;
use crate::{
    error::{Arity, ErrorKind},
    literal::decode_string,
};

impl Deserializer<'_> {
    pub(super) fn process_name(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpName", Arity::AtLeast(2), operands.len())?;
        let mut index = 1;
        let name = decode_string(operands, &mut index)?;
        expect_no_trailing_words("OpName", operands, index)?;
        self.names.define(operands[0], name)
    }

    pub(super) fn process_member_name(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpMemberName", Arity::AtLeast(3), operands.len())?;
        let mut index = 2;
        let name = decode_string(operands, &mut index)?;
        expect_no_trailing_words("OpMemberName", operands, index)?;
        self.member_names
            .entry(operands[0])
            .or_default()
            .insert(operands[1], name);
        Ok(())
    }

    pub(super) fn process_debug_string(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpString", Arity::AtLeast(2), operands.len())?;
        let mut index = 1;
        let text = decode_string(operands, &mut index)?;
        expect_no_trailing_words("OpString", operands, index)?;
        self.debug_strings.define(operands[0], text)
    }

    /// `OpLine`: file `<id>`, line, column
    ///
    /// The location stays active until `OpNoLine`, a terminator or the
    /// next label.
    pub(super) fn process_line(&mut self, operands: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpLine", Arity::Exactly(3), operands.len())?;
        let file = self
            .debug_strings
            .lookup(operands[0])
            .cloned()
            .unwrap_or_else(|| String::from(UNKNOWN_FILE));
        let loc = Location::file_line_col(file, operands[1], operands[2]);
        trace!("debug line {}", loc);
        self.debug_line = Some(loc);
        Ok(())
    }
}

pub(super) fn expect_no_trailing_words(
    op: &str,
    operands: &[u32],
    index: usize,
) -> Result<(), ErrorKind> {
    if index == operands.len() {
        Ok(())
    } else {
        Err(ErrorKind::MalformedInstruction(format!(
            "unexpected trailing words in {} instruction",
            op
        )))
    }
}
