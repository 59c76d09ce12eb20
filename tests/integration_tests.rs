// Integration tests - loading generated navigation data and syncing against it

mod common;

use common::fixtures::{DocsFixture, INDEXED};
use common::tracing::init_tracing_from_env;
use navtree::config::SyncConfig;
use navtree::model::{IndexEntry, NavError, NavIndex, NodeData, ReferenceIndex};
use navtree::services::source::{
    DocSource, MemoryDocSource, SlowDocSource, SlowSourceConfig, SourceManager,
};
use navtree::services::ChunkedIndex;
use navtree::view::nav_tree::{ExpandStep, SyncController, SyncOutcome, TreeStore};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

async fn open_fixture(fixture: &DocsFixture) -> (TreeStore, ChunkedIndex) {
    let manager = SourceManager::new(Arc::new(fixture.source()));
    let store = TreeStore::load(manager.clone(), "Documentation").await.unwrap();
    let index = ChunkedIndex::load(manager, 2).await.unwrap();
    (store, index)
}

fn sync_on() -> SyncController {
    SyncController::new(&SyncConfig::default())
}

/// Tree of the two-page example: `a.html` at [0], `b.html` under a lazy
/// sub-tree at [0, 0]
fn two_page_source() -> MemoryDocSource {
    let tree = vec![NodeData::group(
        "Docs",
        vec![NodeData::lazy("A", Some("a.html"), "a_children")],
    )];
    let index = NavIndex::from_unsorted(vec![
        IndexEntry::new("a.html", vec![0]),
        IndexEntry::new("b.html", vec![0, 0]),
    ]);
    MemoryDocSource::new(tree)
        .with_subtree("a_children", vec![NodeData::leaf("B", "b.html")])
        .with_index(&index, 16)
}

#[tokio::test]
async fn test_every_indexed_reference_round_trips() {
    init_tracing_from_env();
    let fixture = DocsFixture::new();
    let (mut store, index) = open_fixture(&fixture).await;
    assert_eq!(index.chunk_count(), 2);
    assert_eq!(store.root().label, "SikendeRTOS");

    for (reference, path, label) in INDEXED {
        assert_eq!(&index.lookup(reference).await.unwrap(), path, "{reference}");

        let nodes = store.find_path(path).await.unwrap();
        let node = store.get_node(*nodes.last().unwrap()).unwrap();
        assert_eq!(node.target.as_deref(), Some(*reference));
        assert_eq!(&node.label, label);
    }
}

#[tokio::test]
async fn test_sync_opens_path_through_lazy_subtrees() {
    let fixture = DocsFixture::new();
    let (mut store, index) = open_fixture(&fixture).await;
    let mut sync = sync_on();

    let outcome = sync
        .on_content_navigated(&mut store, &index, "structtcb.html#a2")
        .await;
    assert_eq!(outcome, SyncOutcome::Synced);

    let state = sync.state();
    assert_eq!(state.current_reference.as_deref(), Some("structtcb.html#a2"));
    let labels: Vec<&str> = state
        .expanded_path
        .iter()
        .map(|&id| store.get_node(id).unwrap().label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec!["SikendeRTOS", "Data Structures", "Data Structures", "tcb", "sp"]
    );
    assert_eq!(state.selected, state.expanded_path.last().copied());
    for &id in &state.expanded_path[..state.expanded_path.len() - 1] {
        assert!(store.get_node(id).unwrap().is_expanded());
    }
}

#[tokio::test]
async fn test_two_page_example() {
    let manager = SourceManager::new(Arc::new(two_page_source()));
    let mut store = TreeStore::load(manager.clone(), "Documentation").await.unwrap();
    let index = ChunkedIndex::load(manager, 4).await.unwrap();
    let mut sync = sync_on();

    assert!(sync
        .on_content_navigated(&mut store, &index, "b.html")
        .await
        .is_synced());
    let selected = sync.state().selected.unwrap();
    assert_eq!(store.get_node(selected).unwrap().label, "B");
    assert_eq!(store.path_of(selected), vec![0, 0]);
    assert_eq!(sync.state().expanded_path.len(), 3);

    // an undocumented page leaves everything as it was
    let before = sync.state().clone();
    assert_eq!(
        sync.on_content_navigated(&mut store, &index, "missing.html")
            .await,
        SyncOutcome::NotFound
    );
    assert_eq!(sync.state(), &before);
}

#[tokio::test]
async fn test_toggle_sync_and_resync() {
    let fixture = DocsFixture::new();
    let (mut store, index) = open_fixture(&fixture).await;
    let mut sync = sync_on();

    sync.on_content_navigated(&mut store, &index, "files.html")
        .await;
    let synced_to_files = sync.state().selected;

    assert!(!sync.toggle_sync());
    assert_eq!(sync.sync_label(), "click to enable panel synchronisation");
    assert_eq!(
        sync.on_content_navigated(&mut store, &index, "_o_s_8c.html")
            .await,
        SyncOutcome::SyncDisabled
    );
    assert_eq!(sync.state().selected, synced_to_files);
    assert_eq!(
        sync.state().current_reference.as_deref(),
        Some("_o_s_8c.html")
    );

    assert!(sync.toggle_sync());
    assert_eq!(sync.sync_label(), "click to disable panel synchronisation");
    assert_eq!(sync.resync(&mut store, &index).await, SyncOutcome::Synced);
    let selected = sync.state().selected.unwrap();
    assert_eq!(store.path_of(selected), vec![1, 0, 1]);
}

#[tokio::test]
async fn test_concurrent_expansion_fetches_once() {
    let fixture = DocsFixture::new();
    let slow = Arc::new(SlowDocSource::new(
        Arc::new(fixture.source()),
        SlowSourceConfig {
            subtree_delay: Duration::from_millis(30),
            ..SlowSourceConfig::none()
        },
    ));
    let manager = SourceManager::new(slow.clone());
    let mut store = TreeStore::load(manager, "Documentation").await.unwrap();

    // "Files" > "File List" carries the lazy files_dup sub-tree
    let files = store.find_path(&[1]).await.unwrap()[1];
    let file_list = store.children(files).unwrap()[0];

    let ExpandStep::Pending(pending) = store.begin_expand(file_list).unwrap() else {
        panic!("expected a fetch for the lazy node");
    };
    let detached = tokio::spawn(pending.fetch());

    // a second expansion while the first is in flight attaches to it
    let children = store.expand_lazy(file_list).await.unwrap();
    assert_eq!(children.len(), 2);

    let fetched = detached.await.unwrap();
    assert_eq!(store.complete_expand(fetched).unwrap(), children);
    assert_eq!(slow.metrics().await.subtree_calls, 1);

    // later expansions come from the cache
    store.expand_lazy(file_list).await.unwrap();
    assert_eq!(slow.metrics().await.subtree_calls, 1);
}

#[tokio::test]
async fn test_missing_subtree_is_retryable() {
    let fixture = DocsFixture::new();
    let saved = fixture.remove("globals_dup.js");
    let (mut store, index) = open_fixture(&fixture).await;
    let mut sync = sync_on();

    let outcome = sync
        .on_content_navigated(&mut store, &index, "globals.html#index_a")
        .await;
    let SyncOutcome::Failed(err) = outcome else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert!(matches!(err, NavError::ResourceUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(sync.state().selected, None);

    // the node stays lazy and the next attempt fetches again
    fixture.restore("globals_dup.js", &saved);
    assert_eq!(
        sync.on_content_navigated(&mut store, &index, "globals.html#index_a")
            .await,
        SyncOutcome::Synced
    );
    let selected = sync.state().selected.unwrap();
    assert_eq!(store.get_node(selected).unwrap().label, "a");
}

#[tokio::test]
async fn test_missing_index_chunk_is_retryable() {
    let fixture = DocsFixture::new();
    let saved = fixture.remove("navtreeindex1.js");
    let (mut store, index) = open_fixture(&fixture).await;
    let mut sync = sync_on();

    // chunk 0 is still there
    assert!(sync
        .on_content_navigated(&mut store, &index, "classes.html")
        .await
        .is_synced());

    let outcome = sync
        .on_content_navigated(&mut store, &index, "structfifo.html")
        .await;
    assert!(matches!(
        outcome,
        SyncOutcome::Failed(NavError::ResourceUnavailable { .. })
    ));

    fixture.restore("navtreeindex1.js", &saved);
    assert!(sync
        .on_content_navigated(&mut store, &index, "structfifo.html")
        .await
        .is_synced());
}

#[tokio::test]
async fn test_anchor_fallback() {
    let fixture = DocsFixture::new();
    let (mut store, index) = open_fixture(&fixture).await;

    let mut strict = sync_on();
    assert_eq!(
        strict
            .on_content_navigated(&mut store, &index, "_o_s_8c.html#a7")
            .await,
        SyncOutcome::NotFound
    );

    let mut lenient = SyncController::new(&SyncConfig {
        anchor_fallback: true,
        ..SyncConfig::default()
    });
    assert!(lenient
        .on_content_navigated(&mut store, &index, "_o_s_8c.html#a7")
        .await
        .is_synced());
    let selected = lenient.state().selected.unwrap();
    assert_eq!(store.get_node(selected).unwrap().label, "OS.c");
}

#[tokio::test]
async fn test_disposed_store_discards_late_fetch() {
    let fixture = DocsFixture::new();
    let manager = SourceManager::new(Arc::new(fixture.source()));
    let mut store = TreeStore::load(manager, "Documentation").await.unwrap();

    let data_structures = store.find_path(&[0]).await.unwrap()[1];
    let lazy = store.children(data_structures).unwrap()[0];
    let ExpandStep::Pending(pending) = store.begin_expand(lazy).unwrap() else {
        panic!("expected a fetch for the lazy node");
    };
    let fetched = pending.fetch().await;

    let nodes_before = store.node_count();
    store.dispose();
    assert!(matches!(
        store.complete_expand(fetched),
        Err(NavError::Disposed)
    ));
    assert_eq!(store.node_count(), nodes_before);
}

#[tokio::test]
async fn test_several_top_level_entries_get_a_synthetic_root() {
    let source = MemoryDocSource::new(vec![
        NodeData::leaf("Main Page", "index.html"),
        NodeData::leaf("Files", "files.html"),
    ]);
    let tree = source.load_tree().await.unwrap();
    assert_eq!(tree.len(), 2);

    let store = TreeStore::load(SourceManager::new(Arc::new(source)), "Project")
        .await
        .unwrap();
    assert_eq!(store.root().label, "Project");
    assert!(store.root().is_grouping());
    assert_eq!(store.children(store.root_id()).unwrap().len(), 2);
}

fn arb_tree() -> impl Strategy<Value = NodeData> {
    let leaf = "[a-z]{1,6}".prop_map(|name| NodeData::leaf(name.clone(), format!("{name}.html")));
    leaf.prop_recursive(4, 48, 4, |inner| {
        ("[a-z]{1,6}", prop::collection::vec(inner, 1..4)).prop_map(|(name, children)| {
            NodeData::branch(name.clone(), format!("{name}_grp.html"), children)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the index reports for a reference, the tree node at that
    /// path has that reference as its target
    #[test]
    fn prop_index_paths_lead_to_their_targets(tree in arb_tree()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let index = NavIndex::from_tree(&tree);
            let source = MemoryDocSource::new(vec![tree]);
            let mut store = TreeStore::load(SourceManager::new(Arc::new(source)), "Docs")
                .await
                .unwrap();

            for entry in index.entries() {
                let nodes = store.find_path(&entry.node_path).await.unwrap();
                let node = store.get_node(*nodes.last().unwrap()).unwrap();
                prop_assert_eq!(node.target.as_deref(), Some(entry.reference.as_str()));
            }
            Ok(())
        })?;
    }
}
