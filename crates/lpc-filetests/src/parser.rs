//! Test file parsing
//!
//! A test file starts with header lines, then holds one module in `.spvasm`
//! syntax. Expectations live in `;` comments anywhere in the file:
//!
//! ```text
//! test deserialize
//! set structurize=false
//! set version=1.3
//!
//!        OpCapability Shader
//! ; check: spirv.module
//! ```
//!
//! `test deserialize` files hold filecheck directives; `test
//! deserialize-error` files hold `; error: <text>` lines, each of which must
//! appear in the reported error.

use crate::filecheck::is_directive;

/// A test extracted from a test file
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// The test command, e.g. `test deserialize`
    pub command: String,
    /// Run the control flow structurizer
    pub structurize: bool,
    /// Minor SPIR-V version written into the header
    pub minor_version: u32,
    /// Assembly text of the module; header lines are blanked so line
    /// numbers match the file
    pub source: String,
    /// Filecheck directives, one per line
    pub expected_text: String,
    /// Expected error fragments
    pub expected_errors: Vec<String>,
}

/// Parse a test file
pub fn parse_test_file(content: &str) -> Result<TestCase, String> {
    let mut case = TestCase {
        command: String::new(),
        structurize: true,
        minor_version: 0,
        source: String::new(),
        expected_text: String::new(),
        expected_errors: Vec::new(),
    };

    let mut in_header = true;
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if in_header {
            if let Some(command) = trimmed.strip_prefix("test ") {
                if !case.command.is_empty() {
                    return Err(format!("line {}: more than one test command", index + 1));
                }
                case.command = format!("test {}", command.trim());
                case.source.push('\n');
                continue;
            }
            if let Some(setting) = trimmed.strip_prefix("set ") {
                apply_setting(&mut case, setting.trim())
                    .map_err(|e| format!("line {}: {}", index + 1, e))?;
                case.source.push('\n');
                continue;
            }
            if !trimmed.is_empty() && !trimmed.starts_with(';') {
                in_header = false;
            }
        }

        if let Some(comment) = trimmed.strip_prefix(';') {
            let comment = comment.trim();
            if let Some(error) = comment.strip_prefix("error:") {
                case.expected_errors.push(String::from(error.trim()));
            } else if is_directive(comment) {
                case.expected_text.push_str(comment);
                case.expected_text.push('\n');
            }
        }
        case.source.push_str(line);
        case.source.push('\n');
    }

    if case.command.is_empty() {
        return Err(String::from("missing test command"));
    }
    Ok(case)
}

fn apply_setting(case: &mut TestCase, setting: &str) -> Result<(), String> {
    let Some((name, value)) = setting.split_once('=') else {
        return Err(format!("setting '{}' must be name=value", setting));
    };
    match (name.trim(), value.trim()) {
        ("structurize", "true") => case.structurize = true,
        ("structurize", "false") => case.structurize = false,
        ("version", version) => {
            let minor = version
                .strip_prefix("1.")
                .and_then(|minor| minor.parse().ok())
                .ok_or_else(|| format!("unsupported version '{}'", version))?;
            case.minor_version = minor;
        }
        (name, value) => return Err(format!("unknown setting {}={}", name, value)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_and_directives() {
        let case = parse_test_file(
            "test deserialize\n\
             set structurize=false\n\
             set version=1.3\n\
             \n\
             OpCapability Shader ; check: ignored, not a whole-line comment\n\
             ; check: spirv.module\n\
             ; nextln: spirv.func\n\
             ; plain comment\n",
        )
        .unwrap();
        assert_eq!(case.command, "test deserialize");
        assert!(!case.structurize);
        assert_eq!(case.minor_version, 3);
        assert_eq!(case.expected_text, "check: spirv.module\nnextln: spirv.func\n");
        assert!(case.expected_errors.is_empty());
        // Header lines stay as blank lines
        assert_eq!(case.source.lines().nth(4), Some("OpCapability Shader ; check: ignored, not a whole-line comment"));
    }

    #[test]
    fn test_parse_error_expectations() {
        let case = parse_test_file(
            "test deserialize-error\n\
             ; error: undefined value\n\
             OpCapability Shader\n",
        )
        .unwrap();
        assert_eq!(case.command, "test deserialize-error");
        assert_eq!(case.expected_errors, vec![String::from("undefined value")]);
    }

    #[test]
    fn test_bad_header() {
        assert!(parse_test_file("OpCapability Shader\n").is_err());
        assert!(parse_test_file("test deserialize\nset speed=fast\n").is_err());
        assert!(parse_test_file("test deserialize\nset version=2.0\n").is_err());
    }
}
