//! Locating the engine's run-output directory.
//!
//! The engine announces its output directory somewhere in a (very noisy)
//! combined stdout/stderr stream, e.g.
//! `KLEE: output directory is "/work/klee-out-3"`.  We take the last line that
//! mentions the keyword and pull `<keyword>-<digits>` out of it.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::ASSEMBLY_FILE_NAME;
use crate::error::{ErrorLayer, KvizError, Result};
use crate::tool_command::ToolCommand;

pub struct RunLocator {
    keyword: String,
    run_id_re: Regex,
}

impl RunLocator {
    pub fn new(keyword: &str) -> Result<RunLocator> {
        if keyword.is_empty() {
            return Err(KvizError::bad_input(
                "The run-directory keyword must not be empty".to_string(),
            ));
        }
        let run_id_re = Regex::new(&format!(r"{}-\d+", regex::escape(keyword)))
            .map_err(|e| KvizError::bad_input(e.to_string()))?;
        Ok(RunLocator {
            keyword: keyword.to_string(),
            run_id_re,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Scan `lines` in order, keep the last one containing the keyword, and
    /// extract the run identifier from it.  An identifier on an earlier line
    /// does not rescue a last matching line that lacks one.
    pub fn find_in_lines<I, S>(&self, lines: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut latest_line = None;
        for line in lines {
            let line = line.as_ref();
            if line.contains(self.keyword.as_str()) {
                latest_line = Some(line.trim().to_string());
            }
        }

        let latest_line = latest_line?;
        trace!(line = %latest_line, "latest keyword line");
        self.run_id_re
            .find(&latest_line)
            .map(|m| m.as_str().to_string())
    }

    /// Run the engine and return the identifier of its newest run directory.
    pub fn locate(&self, engine: &ToolCommand) -> Result<String> {
        info!(command = %engine.display(), "running engine");
        let lines = engine.run_combined_lines()?;
        match self.find_in_lines(&lines) {
            Some(run_id) => {
                info!(%run_id, "located run directory");
                Ok(run_id)
            }
            None => Err(KvizError::not_found(
                ErrorLayer::ToolLayer,
                format!(
                    "No '{}-<N>' directory in {} lines of engine output",
                    self.keyword,
                    lines.len()
                ),
            )),
        }
    }
}

/// A run-output directory that exists and contains the assembly dump.
#[derive(Clone, Debug, PartialEq)]
pub struct RunDir {
    pub run_id: String,
    pub path: PathBuf,
}

impl RunDir {
    pub fn assembly_path(&self) -> PathBuf {
        self.path.join(ASSEMBLY_FILE_NAME)
    }
}

/// Turn a located identifier into a verified directory under `working_dir`.
pub fn resolve_run_dir(working_dir: &Path, run_id: &str) -> Result<RunDir> {
    let path = working_dir.join(run_id);
    if !path.is_dir() {
        return Err(KvizError::not_found(
            ErrorLayer::DataLayer,
            format!("Directory does not exist: {}", path.display()),
        ));
    }

    let run_dir = RunDir {
        run_id: run_id.to_string(),
        path,
    };
    let assembly_path = run_dir.assembly_path();
    if !assembly_path.is_file() {
        return Err(KvizError::not_found(
            ErrorLayer::DataLayer,
            format!("File does not exist: {}", assembly_path.display()),
        ));
    }
    Ok(run_dir)
}
