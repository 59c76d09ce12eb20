use super::backend::DocSource;
use crate::model::{IndexEntry, NodeData};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Map of key -> channels waiting for the in-flight fetch of that key
type PendingRequests<K, T> = Arc<Mutex<HashMap<K, Vec<oneshot::Sender<io::Result<T>>>>>>;

/// Manages documentation data fetches with request deduplication
///
/// The SourceManager sits between the tree store and the data backend:
/// - Concurrent requests for the same sub-tree resource (or index chunk)
///   perform a single backend call; every requester receives the result
/// - Requests for different resources proceed concurrently
/// - If the fetching request is dropped, waiters are released with an error
///   instead of hanging
pub struct SourceManager {
    source: Arc<dyn DocSource>,
    pending_subtrees: PendingRequests<String, Vec<NodeData>>,
    pending_chunks: PendingRequests<usize, Vec<IndexEntry>>,
}

impl fmt::Debug for SourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceManager")
            .field("source", &"<dyn DocSource>")
            .field("pending_subtrees", &"<mutex>")
            .field("pending_chunks", &"<mutex>")
            .finish()
    }
}

impl SourceManager {
    pub fn new(source: Arc<dyn DocSource>) -> Self {
        Self {
            source,
            pending_subtrees: Arc::new(Mutex::new(HashMap::new())),
            pending_chunks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load the top-level node list
    pub async fn load_tree(&self) -> io::Result<Vec<NodeData>> {
        self.source.load_tree().await
    }

    /// Load a lazy sub-tree, sharing any fetch already in flight
    pub async fn load_subtree(&self, resource: &str) -> io::Result<Vec<NodeData>> {
        let source = Arc::clone(&self.source);
        let name = resource.to_string();
        coalesce(&self.pending_subtrees, resource.to_string(), async move {
            source.load_subtree(&name).await
        })
        .await
    }

    pub async fn load_index_heads(&self) -> io::Result<Vec<String>> {
        self.source.load_index_heads().await
    }

    /// Load an index chunk, sharing any fetch already in flight
    pub async fn load_index_chunk(&self, chunk: usize) -> io::Result<Vec<IndexEntry>> {
        let source = Arc::clone(&self.source);
        coalesce(&self.pending_chunks, chunk, async move {
            source.load_index_chunk(chunk).await
        })
        .await
    }

    /// Whether a fetch for `resource` is currently outstanding
    pub fn is_subtree_pending(&self, resource: &str) -> bool {
        self.pending_subtrees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(resource)
    }

    /// Get the underlying source
    pub fn source(&self) -> &Arc<dyn DocSource> {
        &self.source
    }
}

impl Clone for SourceManager {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            pending_subtrees: Arc::clone(&self.pending_subtrees),
            pending_chunks: Arc::clone(&self.pending_chunks),
        }
    }
}

/// Run `fetch` unless a fetch for `key` is already in flight, in which case
/// wait for that one's result instead.
async fn coalesce<K, T, F>(pending: &PendingRequests<K, T>, key: K, fetch: F) -> io::Result<T>
where
    K: Eq + Hash + Clone + fmt::Debug,
    T: Clone,
    F: Future<Output = io::Result<T>>,
{
    let waiter = {
        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(senders) = pending.get_mut(&key) {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            Some(rx)
        } else {
            pending.insert(key.clone(), Vec::new());
            None
        }
    };

    if let Some(rx) = waiter {
        tracing::trace!("attaching to in-flight fetch of {:?}", key);
        return rx
            .await
            .unwrap_or_else(|_| Err(io::Error::other("request cancelled")));
    }

    let mut guard = InFlight {
        pending,
        key,
        finished: false,
    };
    let result = fetch.await;

    let senders = guard.finish();
    for sender in senders {
        let _ = sender.send(clone_result(&result));
    }
    result
}

fn clone_result<T: Clone>(result: &io::Result<T>) -> io::Result<T> {
    result
        .as_ref()
        .map(|v| v.clone())
        .map_err(|e| io::Error::new(e.kind(), e.to_string()))
}

/// Removes the pending entry when the fetching request completes or is dropped
struct InFlight<'a, K: Eq + Hash, T> {
    pending: &'a PendingRequests<K, T>,
    key: K,
    finished: bool,
}

impl<K: Eq + Hash, T> InFlight<'_, K, T> {
    fn finish(&mut self) -> Vec<oneshot::Sender<io::Result<T>>> {
        self.finished = true;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key)
            .unwrap_or_default()
    }
}

impl<K: Eq + Hash, T> Drop for InFlight<'_, K, T> {
    fn drop(&mut self) {
        if !self.finished {
            // dropping the senders wakes every waiter with a cancellation
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::source::{MemoryDocSource, SlowDocSource, SlowSourceConfig};
    use std::time::Duration;

    fn slow_source(delay: Duration) -> Arc<SlowDocSource> {
        let memory = MemoryDocSource::new(vec![NodeData::leaf("Home", "index.html")])
            .with_subtree("files_dup", vec![NodeData::leaf("os.c", "os_8c.html")])
            .with_subtree("annotated_dup", vec![NodeData::leaf("OS", "struct_o_s.html")]);
        Arc::new(SlowDocSource::with_uniform_delay(Arc::new(memory), delay))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_request_deduplication() {
        let slow = slow_source(Duration::from_millis(50));
        let manager = SourceManager::new(slow.clone());

        let mut handles = vec![];
        for _ in 0..10 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.load_subtree("files_dup").await
            }));
        }

        for handle in handles {
            let nodes = handle.await.unwrap().unwrap();
            assert_eq!(nodes.len(), 1);
        }

        assert_eq!(slow.metrics().await.subtree_calls, 1);
        assert!(!manager.is_subtree_pending("files_dup"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_different_resources() {
        let slow = slow_source(Duration::from_millis(20));
        let manager = SourceManager::new(slow.clone());

        let a = manager.load_subtree("files_dup");
        let b = manager.load_subtree("annotated_dup");
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap()[0].label, "os.c");
        assert_eq!(b.unwrap()[0].label, "OS");
        assert_eq!(slow.metrics().await.subtree_calls, 2);
    }

    #[tokio::test]
    async fn test_errors_are_shared() {
        let slow = slow_source(Duration::from_millis(20));
        let manager = SourceManager::new(slow.clone());

        let (a, b) = tokio::join!(
            manager.load_subtree("missing"),
            manager.load_subtree("missing")
        );
        assert_eq!(a.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(b.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(slow.metrics().await.subtree_calls, 1);
    }

    #[tokio::test]
    async fn test_sequential_requests_refetch() {
        let slow = slow_source(Duration::ZERO);
        let manager = SourceManager::new(slow.clone());

        manager.load_subtree("files_dup").await.unwrap();
        manager.load_subtree("files_dup").await.unwrap();

        // caching is the tree store's job; the manager only coalesces
        assert_eq!(slow.metrics().await.subtree_calls, 2);
    }

    #[tokio::test]
    async fn test_dropped_fetch_releases_waiters() {
        let slow = slow_source(Duration::from_secs(5));
        let manager = SourceManager::new(slow.clone());

        let leader = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.load_subtree("files_dup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(manager.is_subtree_pending("files_dup"));

        let follower = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.load_subtree("files_dup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        leader.abort();
        let result = follower.await.unwrap();
        assert!(result.is_err());
        assert!(!manager.is_subtree_pending("files_dup"));
    }

    #[tokio::test]
    async fn test_index_chunk_dedup() {
        let index = crate::model::NavIndex::from_unsorted(vec![
            IndexEntry::new("a.html", vec![0]),
            IndexEntry::new("b.html", vec![1]),
        ]);
        let memory = MemoryDocSource::new(Vec::new()).with_index(&index, 1);
        let slow = Arc::new(SlowDocSource::new(
            Arc::new(memory),
            SlowSourceConfig {
                index_chunk_delay: Duration::from_millis(20),
                ..SlowSourceConfig::none()
            },
        ));
        let manager = SourceManager::new(slow.clone());

        let (a, b) = tokio::join!(manager.load_index_chunk(1), manager.load_index_chunk(1));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(slow.metrics().await.index_chunk_calls, 1);
    }
}
