use std::fmt;

use itertools::Itertools;

pub type Result<T> = std::result::Result<T, KvizError>;

// I/O failures on files we were told about are data problems; the tool
// invocations wrap their own launch failures explicitly.
impl From<std::io::Error> for KvizError {
    fn from(err: std::io::Error) -> KvizError {
        KvizError::Problem(ErrorDetails {
            layer: ErrorLayer::DataLayer,
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for KvizError {
    fn from(err: serde_json::Error) -> KvizError {
        KvizError::Problem(ErrorDetails {
            layer: ErrorLayer::DataLayer,
            message: err.to_string(),
        })
    }
}

/// Express whether a failure stems from how we were invoked, from one of the
/// external tools, or from the artifacts those tools left behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorLayer {
    /// Our own configuration is unusable, like an empty keyword or a command
    /// string that can't be split into words.
    BadInput,
    /// An external tool could not be launched or its output did not contain
    /// what we needed.  We never inspect exit codes, so this is the only way
    /// tool failures become visible.
    ToolLayer,
    /// A run directory, dump file or source file is missing or unreadable.
    DataLayer,
}

/// Payload describing what went wrong for diagnostic purposes.
#[derive(Debug)]
pub struct ErrorDetails {
    pub layer: ErrorLayer,
    /// Stringified version of the lower level error or a description of the
    /// thing we went looking for.
    pub message: String,
}

/// Every failure is terminal for the stage that produced it; nothing retries.
#[derive(Debug)]
pub enum KvizError {
    /// An expected marker line, directory, file or path was absent.  The stage
    /// produces no artifact.
    NotFound(ErrorDetails),
    /// Something was present but unusable.
    Problem(ErrorDetails),
    /// Every node of the dump appears as somebody's child, which is what a
    /// cyclic (or empty) dump looks like.
    NoRoot,
    /// More than one node never appears as a child and we were asked to be
    /// strict about it.
    AmbiguousRoot { roots: Vec<String> },
    /// The node is reachable from the root and is its own ancestor.
    Cycle { name: String },
    /// The tree is too deep to become an in-memory `serde_json::Value`.  The
    /// file writers have no such limit.
    TooDeep { depth: usize, limit: usize },
}

impl KvizError {
    pub fn not_found(layer: ErrorLayer, message: String) -> KvizError {
        KvizError::NotFound(ErrorDetails { layer, message })
    }

    pub fn bad_input(message: String) -> KvizError {
        KvizError::Problem(ErrorDetails {
            layer: ErrorLayer::BadInput,
            message,
        })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KvizError::NotFound(_))
    }
}

impl fmt::Display for KvizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvizError::NotFound(details) => write!(f, "not found: {}", details.message),
            KvizError::Problem(details) => {
                write!(f, "{:?} problem: {}", details.layer, details.message)
            }
            KvizError::NoRoot => write!(f, "no root found: every node appears as a child"),
            KvizError::AmbiguousRoot { roots } => {
                write!(f, "multiple roots found: {}", roots.iter().join(", "))
            }
            KvizError::Cycle { name } => write!(f, "cycle detected at node '{}'", name),
            KvizError::TooDeep { depth, limit } => write!(
                f,
                "tree is {} levels deep, JSON values are limited to {}",
                depth, limit
            ),
        }
    }
}

impl std::error::Error for KvizError {}
