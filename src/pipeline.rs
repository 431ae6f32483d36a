use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::exec_tree::ExecutionTree;
use crate::run_locator::{resolve_run_dir, RunDir, RunLocator};
use crate::source_extract::extract_source;

/// Artifacts of one complete run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub run_dir: RunDir,
    pub source_path: PathBuf,
    pub tree: ExecutionTree,
}

/// Run the engine and resolve the run directory it reported.
pub fn locate_run_dir(config: &Config) -> Result<RunDir> {
    let locator = RunLocator::new(&config.keyword)?;
    let run_id = locator.locate(&config.engine)?;
    resolve_run_dir(&config.working_dir, &run_id)
}

/// Invoke the tree-export utility on `run_dir_arg` and return its stdout.
/// The argument is interpreted by the utility relative to the working dir.
pub fn dump_tree(config: &Config, run_dir_arg: &str) -> Result<String> {
    let command = config.tree_export.with_arg(run_dir_arg);
    info!(command = %command.display(), "exporting execution tree");
    command.run_stdout()
}

pub fn build_tree_for_run(config: &Config, run_dir_arg: &str) -> Result<ExecutionTree> {
    let dump = dump_tree(config, run_dir_arg)?;
    ExecutionTree::build_from_dump(&dump, config.root_policy)
}

/// Build the tree from a previously saved dump instead of running the
/// utility.
pub fn build_tree_from_file(config: &Config, dump_path: &Path) -> Result<ExecutionTree> {
    let dump = crate::file_utils::read_expected_file(dump_path)?;
    ExecutionTree::build_from_dump(&dump, config.root_policy)
}

/// Locate, extract, build, and write both JSON documents.  The first stage
/// to fail stops everything after it.
pub fn run_pipeline(config: &Config) -> Result<PipelineOutcome> {
    let run_dir = locate_run_dir(config)?;

    let source_path = extract_source(&run_dir, &config.working_dir, &config.source_json_path())?;

    let tree = build_tree_for_run(config, &run_dir.run_id)?;
    let tree_path = config.tree_json_path();
    tree.write_json(&tree_path)?;
    info!(output = %tree_path.display(), nodes = tree.registry().len(), "wrote execution tree");

    Ok(PipelineOutcome {
        run_dir,
        source_path,
        tree,
    })
}
