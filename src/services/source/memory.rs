use super::backend::DocSource;
use crate::model::{IndexEntry, NavIndex, NodeData};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;

/// In-memory navigation data, for embedding hosts and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryDocSource {
    tree: Vec<NodeData>,
    subtrees: HashMap<String, Vec<NodeData>>,
    index_chunks: Vec<NavIndex>,
}

impl MemoryDocSource {
    pub fn new(tree: Vec<NodeData>) -> Self {
        Self {
            tree,
            ..Self::default()
        }
    }

    pub fn with_subtree(mut self, resource: impl Into<String>, nodes: Vec<NodeData>) -> Self {
        self.subtrees.insert(resource.into(), nodes);
        self
    }

    /// Split `index` into chunks of `chunk_size` entries
    pub fn with_index(mut self, index: &NavIndex, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        self.index_chunks = index
            .entries()
            .chunks(chunk_size)
            .map(|chunk| NavIndex::from_unsorted(chunk.to_vec()))
            .collect();
        self
    }
}

#[async_trait]
impl DocSource for MemoryDocSource {
    async fn load_tree(&self) -> io::Result<Vec<NodeData>> {
        Ok(self.tree.clone())
    }

    async fn load_subtree(&self, resource: &str) -> io::Result<Vec<NodeData>> {
        self.subtrees.get(resource).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no sub-tree resource named {resource:?}"),
            )
        })
    }

    async fn load_index_heads(&self) -> io::Result<Vec<String>> {
        Ok(self
            .index_chunks
            .iter()
            .filter_map(|chunk| chunk.first_reference().map(str::to_string))
            .collect())
    }

    async fn load_index_chunk(&self, chunk: usize) -> io::Result<Vec<IndexEntry>> {
        self.index_chunks
            .get(chunk)
            .map(|index| index.entries().to_vec())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no index chunk {chunk}"))
            })
    }
}
