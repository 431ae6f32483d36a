use std::path::Path;

use crate::error::{ErrorDetails, ErrorLayer, KvizError, Result};

pub fn write_file_ensuring_parent_dir(file_path: &Path, contents: &str) -> Result<()> {
    if let Some(parent_path) = file_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent_path) {
            return Err(KvizError::Problem(ErrorDetails {
                layer: ErrorLayer::DataLayer,
                message: format!(
                    "Problem creating parent of '{}': {}",
                    file_path.display(),
                    e
                ),
            }));
        }
    }
    std::fs::write(file_path, contents)?;
    Ok(())
}

/// Read a file that a previous stage told us should exist, reporting its
/// absence as a not-found rather than a generic I/O problem.
pub fn read_expected_file(file_path: &Path) -> Result<String> {
    if !file_path.is_file() {
        return Err(KvizError::not_found(
            ErrorLayer::DataLayer,
            format!("File does not exist: {}", file_path.display()),
        ));
    }
    Ok(std::fs::read_to_string(file_path)?)
}
