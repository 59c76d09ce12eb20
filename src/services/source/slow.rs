//! Slow documentation source for testing
//!
//! This module provides a decorator around any DocSource that adds
//! configurable delays to simulate documentation served from a slow disk or a
//! remote host. It also counts backend calls, which is how tests observe
//! that concurrent expansions of one node share a single fetch.

use super::backend::DocSource;
use crate::model::{IndexEntry, NodeData};
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Configuration for slow source simulation
#[derive(Debug, Clone)]
pub struct SlowSourceConfig {
    /// Delay for load_tree operations
    pub tree_delay: Duration,
    /// Delay for load_subtree operations
    pub subtree_delay: Duration,
    /// Delay for load_index_heads operations
    pub index_heads_delay: Duration,
    /// Delay for load_index_chunk operations
    pub index_chunk_delay: Duration,
}

impl SlowSourceConfig {
    /// Create a config with uniform delay for all operations
    pub fn uniform(delay: Duration) -> Self {
        Self {
            tree_delay: delay,
            subtree_delay: delay,
            index_heads_delay: delay,
            index_chunk_delay: delay,
        }
    }

    /// Create a config with no delays (useful as a baseline)
    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }

    /// Create a config simulating documentation served over a slow network
    pub fn slow_network() -> Self {
        Self {
            tree_delay: Duration::from_millis(300),
            subtree_delay: Duration::from_millis(500),
            index_heads_delay: Duration::from_millis(300),
            index_chunk_delay: Duration::from_millis(200),
        }
    }
}

impl Default for SlowSourceConfig {
    fn default() -> Self {
        Self::none()
    }
}

/// Metrics tracking for source operations
#[derive(Debug, Clone, Default)]
pub struct SourceMetrics {
    pub tree_calls: usize,
    pub subtree_calls: usize,
    pub index_heads_calls: usize,
    pub index_chunk_calls: usize,
    /// Total time spent in artificial delays
    pub total_delay_time: Duration,
}

impl SourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all metrics to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Get total number of backend calls
    pub fn total_calls(&self) -> usize {
        self.tree_calls + self.subtree_calls + self.index_heads_calls + self.index_chunk_calls
    }
}

/// Slow source wrapper
///
/// Wraps any DocSource implementation and adds configurable delays to each
/// operation. Also tracks metrics about operation counts and timing.
pub struct SlowDocSource {
    inner: Arc<dyn DocSource>,
    config: SlowSourceConfig,
    metrics: Arc<Mutex<SourceMetrics>>,
}

impl SlowDocSource {
    pub fn new(inner: Arc<dyn DocSource>, config: SlowSourceConfig) -> Self {
        Self {
            inner,
            config,
            metrics: Arc::new(Mutex::new(SourceMetrics::new())),
        }
    }

    /// Create with uniform delay for all operations
    pub fn with_uniform_delay(inner: Arc<dyn DocSource>, delay: Duration) -> Self {
        Self::new(inner, SlowSourceConfig::uniform(delay))
    }

    /// Get a snapshot of current metrics
    pub async fn metrics(&self) -> SourceMetrics {
        self.metrics.lock().await.clone()
    }

    pub async fn reset_metrics(&self) {
        self.metrics.lock().await.reset();
    }

    /// Get a clone of the metrics Arc for sharing
    pub fn metrics_arc(&self) -> Arc<Mutex<SourceMetrics>> {
        Arc::clone(&self.metrics)
    }

    async fn add_delay(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
            self.metrics.lock().await.total_delay_time += delay;
        }
    }
}

#[async_trait]
impl DocSource for SlowDocSource {
    async fn load_tree(&self) -> io::Result<Vec<NodeData>> {
        self.metrics.lock().await.tree_calls += 1;
        self.add_delay(self.config.tree_delay).await;
        self.inner.load_tree().await
    }

    async fn load_subtree(&self, resource: &str) -> io::Result<Vec<NodeData>> {
        self.metrics.lock().await.subtree_calls += 1;
        self.add_delay(self.config.subtree_delay).await;
        self.inner.load_subtree(resource).await
    }

    async fn load_index_heads(&self) -> io::Result<Vec<String>> {
        self.metrics.lock().await.index_heads_calls += 1;
        self.add_delay(self.config.index_heads_delay).await;
        self.inner.load_index_heads().await
    }

    async fn load_index_chunk(&self, chunk: usize) -> io::Result<Vec<IndexEntry>> {
        self.metrics.lock().await.index_chunk_calls += 1;
        self.add_delay(self.config.index_chunk_delay).await;
        self.inner.load_index_chunk(chunk).await
    }
}
