//! Running a directory of test files

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    parser::parse_test_file, test_deserialize::run_deserialize_test,
    test_deserialize_error::run_deserialize_error_test,
};

/// File extension of test files
pub const TEST_FILE_EXTENSION: &str = "spvasm";

/// Run one test file, dispatching on its test command
pub fn run_test_file(content: &str) -> Result<(), String> {
    let case = parse_test_file(content)?;
    match case.command.as_str() {
        "test deserialize" => run_deserialize_test(&case),
        "test deserialize-error" => run_deserialize_error_test(&case),
        other => Err(format!("unknown test command '{}'", other)),
    }
}

/// Run every test file under `dir`, recursively
///
/// Returns the number of files run, or one message per failing file.
pub fn run_directory(dir: &Path) -> Result<usize, Vec<String>> {
    let files = collect_test_files(dir).map_err(|e| vec![e])?;
    if files.is_empty() {
        return Err(vec![format!("no .{} files in {}", TEST_FILE_EXTENSION, dir.display())]);
    }

    let mut failures = Vec::new();
    for path in &files {
        let result = fs::read_to_string(path)
            .map_err(|e| format!("cannot read file: {}", e))
            .and_then(|content| run_test_file(&content));
        if let Err(message) = result {
            failures.push(format!("{}: {}", path.display(), message));
        }
    }

    if failures.is_empty() {
        Ok(files.len())
    } else {
        Err(failures)
    }
}

/// Test files under `dir`, sorted by path
fn collect_test_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries =
            fs::read_dir(&dir).map_err(|e| format!("cannot read {}: {}", dir.display(), e))?;
        for entry in entries {
            let path = entry
                .map_err(|e| format!("cannot read {}: {}", dir.display(), e))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == TEST_FILE_EXTENSION) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
