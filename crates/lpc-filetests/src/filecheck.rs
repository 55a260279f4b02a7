//! Filecheck directive parsing and matching using the filecheck crate

use filecheck::{Checker, CheckerBuilder, NO_VARIABLES};

/// Directive prefixes the filecheck crate understands
const DIRECTIVES: [&str; 6] = ["check:", "sameln:", "nextln:", "unordered:", "not:", "regex:"];

/// Whether a (comment-stripped) line is a filecheck directive
pub fn is_directive(line: &str) -> bool {
    let trimmed = line.trim_start();
    DIRECTIVES.iter().any(|prefix| trimmed.starts_with(prefix))
}

/// Build a filechecker from expected text containing directives
pub fn build_filechecker(expected_text: &str) -> Result<Checker, String> {
    let mut builder = CheckerBuilder::new();
    for line in expected_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        builder
            .directive(trimmed)
            .map_err(|e| format!("Failed to parse filecheck directive '{}': {}", trimmed, e))?;
    }
    Ok(builder.finish())
}

/// Match actual output against filecheck directives
pub fn match_filecheck(actual: &str, expected_text: &str) -> Result<(), String> {
    let checker = build_filechecker(expected_text)?;
    if checker.is_empty() {
        return Err(String::from("no filecheck directives"));
    }

    if checker
        .check(actual, NO_VARIABLES)
        .map_err(|e| format!("Filecheck error: {}", e))?
    {
        Ok(())
    } else {
        let (_, explain) = checker
            .explain(actual, NO_VARIABLES)
            .map_err(|e| format!("Failed to get filecheck explanation: {}", e))?;
        Err(format!("Filecheck failed:\n{}", explain))
    }
}
