//! The `deserialize` subtest - assemble, deserialize, verify, print and
//! filecheck

use lpc_spirv::{deserialize, DeserializeOptions};
use lpc_spvir::verify_module;

use crate::{assembler::assemble, filecheck::match_filecheck, parser::TestCase};

/// Run a single deserialize test
pub fn run_deserialize_test(case: &TestCase) -> Result<(), String> {
    let words = assemble(&case.source, case.minor_version)?;
    let options = DeserializeOptions::default().with_control_flow_structurization(case.structurize);
    let module = deserialize(&words, &options).map_err(|e| format!("deserialization failed: {}", e))?;

    let actual = format!("{}", module);
    if let Err(errors) = verify_module(&module) {
        let error_msgs: Vec<String> = errors
            .iter()
            .map(|e| match &e.location {
                Some(loc) => format!("  {}: {}", loc, e.message),
                None => format!("  {}", e.message),
            })
            .collect();
        return Err(format!(
            "verification failed:\n{}\n\nModule:\n{}",
            error_msgs.join("\n"),
            actual
        ));
    }

    match_filecheck(&actual, &case.expected_text)
        .map_err(|e| format!("{}\n\nModule:\n{}", e, actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_test_file;

    fn run(content: &str) {
        let case = parse_test_file(content).unwrap();
        assert_eq!(case.command, "test deserialize");
        if let Err(e) = run_deserialize_test(&case) {
            panic!("{}", e);
        }
    }

    #[test]
    fn test_deserialize_selection() {
        run(include_str!("../filetests/deserialize/selection.spvasm"));
    }

    #[test]
    fn test_deserialize_loop() {
        run(include_str!("../filetests/deserialize/loop.spvasm"));
    }

    #[test]
    fn test_failed_check_reports_module() {
        let case = parse_test_file(
            "test deserialize\n\
             OpCapability Shader\n\
             OpMemoryModel Logical GLSL450\n\
             ; check: spirv.func\n",
        )
        .unwrap();
        let err = run_deserialize_test(&case).unwrap_err();
        assert!(err.contains("Module:\nspirv.module Logical GLSL450"), "{}", err);
    }
}
