use crate::model::{IndexEntry, NodeData};
use async_trait::async_trait;
use std::io;

/// Async documentation data backend trait
///
/// This trait abstracts where generated navigation data comes from (a local
/// output directory, memory, a remote server, ...). Every method may be
/// slow; callers go through [`super::SourceManager`] to coalesce requests.
#[async_trait]
pub trait DocSource: Send + Sync {
    /// Load the top-level node list of the navigation tree
    async fn load_tree(&self) -> io::Result<Vec<NodeData>>;

    /// Load the nodes of a lazy sub-tree resource
    ///
    /// # Errors
    ///
    /// Returns an error if the resource does not exist or cannot be decoded.
    async fn load_subtree(&self, resource: &str) -> io::Result<Vec<NodeData>>;

    /// Load the first reference of every index chunk, in chunk order
    async fn load_index_heads(&self) -> io::Result<Vec<String>>;

    /// Load the entries of index chunk `chunk`, sorted by reference
    async fn load_index_chunk(&self, chunk: usize) -> io::Result<Vec<IndexEntry>>;
}

/// Reject resource names that could escape the data directory
pub(crate) fn validate_resource_name(resource: &str) -> io::Result<()> {
    let valid = !resource.is_empty()
        && resource != "."
        && resource != ".."
        && !resource.contains(['/', '\\', '\0'])
        && !resource.contains("..");
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid resource name: {resource:?}"),
        ))
    }
}
