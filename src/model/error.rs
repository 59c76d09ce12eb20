use std::fmt;
use std::io;

/// Errors raised while decoding generated navigation data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The script does not declare the expected variable
    MissingVar(String),
    /// The script is malformed around a declaration
    Script(String),
    /// The payload of a variable is not valid JSON for the expected shape
    Json { var: String, message: String },
    /// A tree tuple violates the node invariants
    InvalidNode { path: String, reason: String },
    /// Index entries are not strictly sorted or contain duplicates
    UnsortedIndex { position: usize, reference: String },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::MissingVar(name) => write!(f, "missing declaration 'var {name}'"),
            DataError::Script(msg) => write!(f, "malformed script: {msg}"),
            DataError::Json { var, message } => write!(f, "invalid data in '{var}': {message}"),
            DataError::InvalidNode { path, reason } => {
                write!(f, "invalid tree node at {path}: {reason}")
            }
            DataError::UnsortedIndex {
                position,
                reference,
            } => write!(
                f,
                "index entry {position} ('{reference}') is out of order or duplicated"
            ),
        }
    }
}

impl std::error::Error for DataError {}

impl From<DataError> for io::Error {
    fn from(err: DataError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err.to_string())
    }
}

/// Failure modes of tree resolution and synchronization
///
/// None of these is fatal to the host; callers degrade to "tree not synced".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// A lazy sub-tree (or index chunk) could not be loaded. Retryable.
    ResourceUnavailable { resource: String, message: String },
    /// The reference is not part of the documented set.
    NotFound { reference: String },
    /// Index and tree data disagree: `path[depth]` is out of range.
    InvalidPath { path: Vec<usize>, depth: usize },
    /// The node id does not belong to this store.
    UnknownNode(usize),
    /// The store was disposed while the operation was pending.
    Disposed,
}

impl NavError {
    pub(crate) fn unavailable(resource: &str, err: &io::Error) -> Self {
        NavError::ResourceUnavailable {
            resource: resource.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, NavError::ResourceUnavailable { .. })
    }
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::ResourceUnavailable { resource, message } => {
                write!(f, "resource '{resource}' unavailable: {message}")
            }
            NavError::NotFound { reference } => write!(f, "'{reference}' is not in the index"),
            NavError::InvalidPath { path, depth } => {
                write!(f, "node path {path:?} is out of range at depth {depth}")
            }
            NavError::UnknownNode(id) => write!(f, "unknown node {id}"),
            NavError::Disposed => write!(f, "navigation tree has been disposed"),
        }
    }
}

impl std::error::Error for NavError {}
