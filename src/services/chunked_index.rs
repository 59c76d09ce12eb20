//! Reference index split across chunk files
//!
//! Generated documentation ships the index in chunks: a small list of chunk
//! heads (the first reference of every chunk) plus one table per chunk.
//! A lookup binary-searches the heads for the one chunk that can hold the
//! reference, loads that chunk on demand and searches inside it. Decoded
//! chunks are kept in an LRU cache.

use crate::model::{DataError, NavError, NavIndex, NodePath, ReferenceIndex};
use crate::services::source::SourceManager;
use async_trait::async_trait;
use lru::LruCache;
use std::io;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

pub struct ChunkedIndex {
    manager: SourceManager,
    heads: Vec<String>,
    cache: Mutex<LruCache<usize, Arc<NavIndex>>>,
}

impl std::fmt::Debug for ChunkedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedIndex")
            .field("heads", &self.heads.len())
            .finish_non_exhaustive()
    }
}

impl ChunkedIndex {
    /// Load the chunk heads; chunks themselves are fetched on first use
    ///
    /// # Errors
    ///
    /// Fails if the heads cannot be read or are not strictly ascending.
    pub async fn load(manager: SourceManager, cache_size: usize) -> io::Result<Self> {
        let heads = manager.load_index_heads().await?;
        Ok(Self::with_heads(manager, heads, cache_size)?)
    }

    pub fn with_heads(
        manager: SourceManager,
        heads: Vec<String>,
        cache_size: usize,
    ) -> Result<Self, DataError> {
        if let Some(i) = heads.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(DataError::UnsortedIndex {
                position: i + 1,
                reference: heads[i + 1].clone(),
            });
        }
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        tracing::debug!("index has {} chunks", heads.len());

        Ok(Self {
            manager,
            heads,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.heads.len()
    }

    /// The only chunk that can contain `reference`: the last one whose head
    /// sorts at or before it
    pub fn chunk_for(&self, reference: &str) -> Option<usize> {
        self.heads
            .partition_point(|head| head.as_str() <= reference)
            .checked_sub(1)
    }

    /// Number of decoded chunks currently cached
    pub fn cached_chunks(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn chunk(&self, chunk: usize) -> Result<Arc<NavIndex>, NavError> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chunk)
            .cloned();
        if let Some(index) = cached {
            return Ok(index);
        }

        let entries = self
            .manager
            .load_index_chunk(chunk)
            .await
            .map_err(|e| NavError::unavailable(&format!("index chunk {chunk}"), &e))?;
        let index = Arc::new(NavIndex::from_unsorted(entries));
        tracing::trace!("decoded index chunk {} ({} entries)", chunk, index.len());

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(chunk, Arc::clone(&index));
        Ok(index)
    }
}

#[async_trait]
impl ReferenceIndex for ChunkedIndex {
    async fn lookup(&self, reference: &str) -> Result<NodePath, NavError> {
        let not_found = || NavError::NotFound {
            reference: reference.to_string(),
        };

        let chunk = self.chunk_for(reference).ok_or_else(not_found)?;
        let index = self.chunk(chunk).await?;
        index
            .find(reference)
            .map(|entry| entry.node_path.clone())
            .ok_or_else(not_found)
    }
}
