//! File-based tests for the SPIR-V deserializer.
//!
//! Test files hold a SPIR-V module in `.spvasm` assembly along with the
//! expectations in `;` comments:
//! - `test deserialize` files are assembled, deserialized, verified and
//!   printed, and the printed module is matched against filecheck
//!   directives
//! - `test deserialize-error` files must be rejected, with `; error:` lines
//!   naming fragments of the error text

pub mod assembler;
pub mod filecheck;
pub mod parser;
pub mod runner;

mod test_deserialize;
mod test_deserialize_error;

pub use assembler::assemble;
pub use crate::filecheck::match_filecheck;
pub use parser::{parse_test_file, TestCase};
pub use runner::{run_directory, run_test_file};
pub use test_deserialize::run_deserialize_test;
pub use test_deserialize_error::run_deserialize_error_test;
