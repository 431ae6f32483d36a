//! Recovering the original source file of a run.
//!
//! The engine writes the linked module to `<run dir>/assembly.ll`, whose
//! second line names the file clang compiled:
//!
//! ```text
//! ; ModuleID = 'get_sign.bc'
//! source_filename = "test.c"
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::error::{ErrorLayer, KvizError, Result};
use crate::file_utils::{read_expected_file, write_file_ensuring_parent_dir};
use crate::json_format::to_string_indented;
use crate::run_locator::RunDir;

/// Zero-based index of the assembly line holding the source file name.
const SOURCE_FILENAME_LINE: usize = 1;

/// Contents of `source_code.json`.
#[derive(Debug, Serialize)]
pub struct SourceDocument {
    pub source_code: String,
}

/// Pull the quoted path out of the source-filename line.  Everything between
/// the first and the last double quote is the path, so paths containing
/// quotes survive.
pub fn extract_source_path(assembly_text: &str) -> Option<String> {
    lazy_static! {
        static ref RE_QUOTED: Regex = Regex::new(r#""(.*)""#).unwrap();
    }

    let line = assembly_text.lines().nth(SOURCE_FILENAME_LINE)?;
    RE_QUOTED
        .captures(line.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Locate the original source file for `run_dir`; relative names resolve
/// against `working_dir`, where the engine (and so clang's output) lives.
pub fn source_path_for_run(run_dir: &RunDir, working_dir: &Path) -> Result<PathBuf> {
    let assembly_path = run_dir.assembly_path();
    let assembly_text = read_expected_file(&assembly_path)?;
    if assembly_text.lines().count() <= SOURCE_FILENAME_LINE {
        return Err(KvizError::not_found(
            ErrorLayer::DataLayer,
            format!("File has fewer than two lines: {}", assembly_path.display()),
        ));
    }

    let source_name = extract_source_path(&assembly_text).ok_or_else(|| {
        KvizError::not_found(
            ErrorLayer::DataLayer,
            format!("No quoted source path on line 2 of {}", assembly_path.display()),
        )
    })?;
    debug!(%source_name, "source file named by assembly");

    Ok(working_dir.join(source_name))
}

pub fn read_source_document(source_path: &Path) -> Result<SourceDocument> {
    Ok(SourceDocument {
        source_code: read_expected_file(source_path)?,
    })
}

/// Copy the run's source file into `json_path` and return where it came from.
pub fn extract_source(run_dir: &RunDir, working_dir: &Path, json_path: &Path) -> Result<PathBuf> {
    let source_path = source_path_for_run(run_dir, working_dir)?;
    let document = read_source_document(&source_path)?;
    write_file_ensuring_parent_dir(json_path, &to_string_indented(&document)?)?;
    info!(source = %source_path.display(), output = %json_path.display(), "wrote source document");
    Ok(source_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::temp_dir::TempDir;

    const ASSEMBLY: &str = "; ModuleID = 'get_sign.bc'\nsource_filename = \"test.c\"\ntarget triple = \"x86_64\"\n";

    #[test]
    fn test_extract_source_path() {
        assert_eq!(extract_source_path(ASSEMBLY), Some("test.c".to_string()));
        assert_eq!(
            extract_source_path("x\n  source_filename = \"dir/a\"b.c\"  \n"),
            Some("dir/a\"b.c".to_string())
        );
        assert_eq!(extract_source_path("x\nsource_filename = test.c\n"), None);
        assert_eq!(extract_source_path("only one line"), None);
    }

    fn make_run_dir(tmp: &TempDir, assembly: &str) -> RunDir {
        let path = tmp.join("klee-out-0");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("assembly.ll"), assembly).unwrap();
        RunDir {
            run_id: "klee-out-0".to_string(),
            path,
        }
    }

    #[test]
    fn test_extract_source_writes_json() {
        let tmp = TempDir::new("kviz-extract-source");
        let run_dir = make_run_dir(&tmp, ASSEMBLY);
        std::fs::write(tmp.join("test.c"), "int main() {\n  return 0;\n}\n").unwrap();

        let json_path = tmp.join("out/source_code.json");
        let source_path = extract_source(&run_dir, &tmp, &json_path).unwrap();
        assert_eq!(source_path, tmp.join("test.c"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({ "source_code": "int main() {\n  return 0;\n}\n" })
        );
    }

    #[test]
    fn test_short_assembly_is_not_found() {
        let tmp = TempDir::new("kviz-extract-short");
        let run_dir = make_run_dir(&tmp, "; ModuleID = 'get_sign.bc'\n");
        let json_path = tmp.join("source_code.json");
        assert!(extract_source(&run_dir, &tmp, &json_path)
            .unwrap_err()
            .is_not_found());
        assert!(!json_path.exists());
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let tmp = TempDir::new("kviz-extract-missing");
        let run_dir = make_run_dir(&tmp, ASSEMBLY);
        let json_path = tmp.join("source_code.json");
        assert!(extract_source(&run_dir, &tmp, &json_path)
            .unwrap_err()
            .is_not_found());
        assert!(!json_path.exists());
    }
}
