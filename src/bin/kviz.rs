//! Drive KLEE, find the run it produced, and turn that run into
//! `source_code.json` and `tree.json` for the execution-tree viewer.
//!
//! With no subcommand (or `run`) the whole pipeline executes.  The other
//! subcommands run one stage at a time, which is mostly useful when poking at
//! an existing run directory or a saved `tree-dot` dump.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use kviz::config::{Config, ConfigOpts};
use kviz::logging::init_logging;
use kviz::pipeline::{build_tree_for_run, build_tree_from_file, locate_run_dir, run_pipeline};
use kviz::run_locator::{resolve_run_dir, RunLocator};
use kviz::source_extract::extract_source;
use kviz::Result;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    config: ConfigOpts,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run the engine, extract the source file and build the tree.
    Run,
    /// Run the engine and print the name of the run directory it reported.
    Locate,
    /// Write source_code.json for an existing run directory.
    Source {
        /// Run directory name, relative to the working dir.
        run_dir: String,
    },
    /// Write tree.json from a run directory or a saved dump.  Without either,
    /// the engine is run first to find the directory.
    Tree {
        /// Run directory handed to the tree-export utility.
        run_dir: Option<String>,

        /// Read the dump from this file instead of running the utility.
        #[arg(long, conflicts_with = "run_dir")]
        dump: Option<PathBuf>,

        /// Print the tree to stdout instead of writing tree.json.
        #[arg(long)]
        stdout: bool,
    },
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_opts(&cli.config)?;

    match cli.cmd.unwrap_or(Cmd::Run) {
        Cmd::Run => {
            let outcome = run_pipeline(&config)?;
            println!("{}", outcome.run_dir.run_id);
        }
        Cmd::Locate => {
            // Only the identifier is wanted here, so a run directory that
            // vanished since the engine reported it isn't an error.
            let locator = RunLocator::new(&config.keyword)?;
            println!("{}", locator.locate(&config.engine)?);
        }
        Cmd::Source { run_dir } => {
            let run_dir = resolve_run_dir(&config.working_dir, &run_dir)?;
            let source_path =
                extract_source(&run_dir, &config.working_dir, &config.source_json_path())?;
            println!("{}", source_path.display());
        }
        Cmd::Tree {
            run_dir,
            dump,
            stdout,
        } => {
            let tree = match (dump, run_dir) {
                (Some(dump_path), _) => build_tree_from_file(&config, &dump_path)?,
                (None, Some(run_dir)) => build_tree_for_run(&config, &run_dir)?,
                (None, None) => build_tree_for_run(&config, &locate_run_dir(&config)?.run_id)?,
            };
            if stdout {
                println!("{}", tree.to_pretty_string()?);
            } else {
                tree.write_json(&config.tree_json_path())?;
            }
        }
    }

    Ok(())
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("kviz: {}", err);
        std::process::exit(1);
    }
}
