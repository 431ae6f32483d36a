extern crate serde;
extern crate serde_json;

extern crate clap;
extern crate itertools;
#[macro_use]
extern crate lazy_static;
extern crate regex;
extern crate shell_words;
#[macro_use]
extern crate tracing;
extern crate tracing_subscriber;

pub mod config;
pub mod error;
pub mod exec_tree;
pub mod file_utils;
pub mod json_format;
pub mod logging;
pub mod pipeline;
pub mod run_locator;
pub mod source_extract;
pub mod tool_command;

#[cfg(test)]
mod utils;

pub use error::{ErrorDetails, ErrorLayer, KvizError, Result};
