use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::Result;
use crate::exec_tree::RootPolicy;
use crate::tool_command::ToolCommand;

pub const DEFAULT_ENGINE_COMMAND: &str =
    "./../../build/bin/klee -debug-print-instructions=all:stderr -write-smt2s -write-exec-tree get_sign.bc";
pub const DEFAULT_TREE_COMMAND: &str = "../../build/bin/klee-exec-tree tree-dot";
pub const DEFAULT_KEYWORD: &str = "klee-out";

pub const ASSEMBLY_FILE_NAME: &str = "assembly.ll";
pub const SOURCE_JSON_FILE_NAME: &str = "source_code.json";
pub const TREE_JSON_FILE_NAME: &str = "tree.json";

/// Settings shared by every subcommand.  All of them have defaults that
/// reproduce the layout of a KLEE checkout's example directory, and all are
/// global so they may come before or after the subcommand.
#[derive(Clone, Debug, Args)]
pub struct ConfigOpts {
    /// Command line used to launch the symbolic-execution engine.
    #[arg(
        long,
        global = true,
        env = "KVIZ_ENGINE_COMMAND",
        default_value = DEFAULT_ENGINE_COMMAND
    )]
    pub engine_command: String,

    /// Command line of the tree-export utility; the run directory is appended
    /// as the final argument.
    #[arg(
        long,
        global = true,
        env = "KVIZ_TREE_COMMAND",
        default_value = DEFAULT_TREE_COMMAND
    )]
    pub tree_command: String,

    /// Prefix of the engine's run-output directory names.
    #[arg(
        long,
        global = true,
        env = "KVIZ_KEYWORD",
        default_value = DEFAULT_KEYWORD
    )]
    pub keyword: String,

    /// Directory the external tools run in; run directories and relative
    /// source paths resolve against it.
    #[arg(long, global = true, env = "KVIZ_WORKING_DIR", default_value = ".")]
    pub working_dir: PathBuf,

    /// Directory receiving source_code.json and tree.json.
    #[arg(long, global = true, env = "KVIZ_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Fail instead of picking the first root when several nodes are never
    /// listed as a child.
    #[arg(long, global = true)]
    pub strict_root: bool,
}

/// Resolved settings handed to each stage by reference.
#[derive(Clone, Debug)]
pub struct Config {
    pub engine: ToolCommand,
    pub tree_export: ToolCommand,
    pub keyword: String,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    pub root_policy: RootPolicy,
}

impl Config {
    pub fn from_opts(opts: &ConfigOpts) -> Result<Config> {
        Ok(Config {
            engine: ToolCommand::parse(&opts.engine_command, &opts.working_dir)?,
            tree_export: ToolCommand::parse(&opts.tree_command, &opts.working_dir)?,
            keyword: opts.keyword.clone(),
            working_dir: opts.working_dir.clone(),
            output_dir: opts.output_dir.clone(),
            root_policy: if opts.strict_root {
                RootPolicy::Strict
            } else {
                RootPolicy::FirstFound
            },
        })
    }

    /// The default engine and export commands and keyword, rooted at
    /// `working_dir`.
    pub fn with_defaults(working_dir: &Path) -> Result<Config> {
        Ok(Config {
            engine: ToolCommand::parse(DEFAULT_ENGINE_COMMAND, working_dir)?,
            tree_export: ToolCommand::parse(DEFAULT_TREE_COMMAND, working_dir)?,
            keyword: DEFAULT_KEYWORD.to_string(),
            working_dir: working_dir.to_path_buf(),
            output_dir: PathBuf::from("."),
            root_policy: RootPolicy::FirstFound,
        })
    }

    pub fn source_json_path(&self) -> PathBuf {
        self.output_dir.join(SOURCE_JSON_FILE_NAME)
    }

    pub fn tree_json_path(&self) -> PathBuf {
        self.output_dir.join(TREE_JSON_FILE_NAME)
    }
}
