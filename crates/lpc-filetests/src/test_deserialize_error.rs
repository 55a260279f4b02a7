//! The `deserialize-error` subtest - the module must be rejected with an
//! error whose text contains every `; error:` line

use lpc_spirv::{deserialize, DeserializeOptions};

use crate::{assembler::assemble, parser::TestCase};

/// Run a single deserialize-error test
pub fn run_deserialize_error_test(case: &TestCase) -> Result<(), String> {
    if case.expected_errors.is_empty() {
        return Err(String::from("no '; error:' expectations"));
    }
    let words = assemble(&case.source, case.minor_version)?;
    let options = DeserializeOptions::default().with_control_flow_structurization(case.structurize);
    let error = match deserialize(&words, &options) {
        Ok(module) => {
            return Err(format!(
                "expected an error, but deserialization succeeded:\n{}",
                module
            ))
        }
        Err(e) => format!("{}", e),
    };

    let missing: Vec<&String> = case
        .expected_errors
        .iter()
        .filter(|expected| !error.contains(expected.as_str()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "error text does not match\n\nExpected to contain:\n{}\n\nActual:\n{}",
            missing
                .iter()
                .map(|e| format!("  {}", e))
                .collect::<Vec<_>>()
                .join("\n"),
            error
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_test_file;

    #[test]
    fn test_loop_merge_phi() {
        let case =
            parse_test_file(include_str!("../filetests/deserialize-error/loop_merge_phi.spvasm"))
                .unwrap();
        if let Err(e) = run_deserialize_error_test(&case) {
            panic!("{}", e);
        }
    }

    #[test]
    fn test_success_is_a_failure() {
        let case = parse_test_file(
            "test deserialize-error\n\
             ; error: anything\n\
             OpCapability Shader\n",
        )
        .unwrap();
        let err = run_deserialize_error_test(&case).unwrap_err();
        assert!(err.starts_with("expected an error"));
    }
}
