use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use navtree::app::App;
use navtree::config::Config;
use navtree::model::ReferenceIndex;
use navtree::services::source::{
    DocSource, LocalDocSource, SlowDocSource, SlowSourceConfig, SourceManager,
};
use navtree::services::{tracing_setup, ChunkedIndex};
use navtree::view::nav_tree::{NavTreeView, SyncController, SyncOutcome, TreeStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Browse generated documentation with a navigation tree that follows the open page
#[derive(Parser, Debug)]
#[command(name = "navtree")]
#[command(about = "Documentation navigation tree that stays in sync with the open page", long_about = None)]
#[command(version)]
struct Args {
    /// Documentation output directory (containing navtreedata.js)
    #[arg(value_name = "DOCS_DIR", default_value = ".")]
    docs_dir: PathBuf,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file (default: system temp dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Page to open on start
    #[arg(long, value_name = "REFERENCE")]
    open: Option<String>,

    /// Resolve references to their tree position, print the paths and exit
    #[arg(long, value_name = "REFERENCE")]
    resolve: Vec<String>,

    /// Print the whole tree, loading every lazy sub-tree, and exit
    #[arg(long)]
    print_tree: bool,

    /// Stop --print-tree below this depth
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,

    /// Simulated latency for every data file read, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0)]
    latency: u64,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn open_source(args: &Args, config: &Config) -> Arc<dyn DocSource> {
    let local: Arc<dyn DocSource> =
        Arc::new(LocalDocSource::new(args.docs_dir.clone(), config.data.clone()));
    if args.latency == 0 {
        return local;
    }
    Arc::new(SlowDocSource::new(
        local,
        SlowSourceConfig::uniform(Duration::from_millis(args.latency)),
    ))
}

async fn resolve_all(
    store: &mut TreeStore,
    index: &dyn ReferenceIndex,
    config: &Config,
    references: &[String],
) {
    let mut sync = SyncController::new(&config.sync);
    sync.set_sync_enabled(true);

    for reference in references {
        match sync.on_content_navigated(store, index, reference).await {
            SyncOutcome::Synced => {
                let labels: Vec<&str> = sync
                    .state()
                    .expanded_path
                    .iter()
                    .filter_map(|&id| store.get_node(id))
                    .map(|node| node.label.as_str())
                    .collect();
                let path = sync
                    .state()
                    .selected
                    .map(|id| store.path_of(id))
                    .unwrap_or_default();
                println!("{reference}\t{path:?}\t{}", labels.join(" > "));
            }
            SyncOutcome::NotFound => println!("{reference}\tnot found"),
            SyncOutcome::Failed(err) => println!("{reference}\terror: {err}"),
            SyncOutcome::SyncDisabled => {}
        }
    }
}

async fn print_tree(store: &mut TreeStore, max_depth: Option<usize>) {
    let mut stack = vec![(store.root_id(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = store.get_node(id) else {
            continue;
        };
        let target = node
            .target
            .as_deref()
            .map(|t| format!(" ({t})"))
            .unwrap_or_default();
        println!("{}{}{}", "  ".repeat(depth), node.label, target);

        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        match store.expand_lazy(id).await {
            Ok(children) => stack.extend(children.into_iter().rev().map(|c| (c, depth + 1))),
            Err(err) => println!("{}! {err}", "  ".repeat(depth + 1)),
        }
    }
}

#[tokio::main]
async fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let config = Config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    if args.dump_config {
        let json =
            serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{json}");
        return Ok(());
    }

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(tracing_setup::default_log_path);
    if let Err(e) = tracing_setup::init_global(&log_file) {
        eprintln!("Warning: could not open log file {}: {e}", log_file.display());
    }
    tracing::info!("navtree starting in {:?}", args.docs_dir);

    let manager = SourceManager::new(open_source(&args, &config));
    let mut store = TreeStore::load(manager.clone(), &config.data.root_label)
        .await
        .with_context(|| {
            format!(
                "Failed to load the navigation tree from {}",
                args.docs_dir.display()
            )
        })?;
    let index = ChunkedIndex::load(manager, config.data.index_cache_size)
        .await
        .context("Failed to load the navigation index")?;

    if !args.resolve.is_empty() {
        resolve_all(&mut store, &index, &config, &args.resolve).await;
        return Ok(());
    }
    if args.print_tree {
        print_tree(&mut store, args.max_depth).await;
        return Ok(());
    }

    let view = NavTreeView::new(store, SyncController::new(&config.sync));
    let mut app = App::new(view, Arc::new(index), config);
    if let Some(reference) = &args.open {
        app.open_reference(reference);
    }

    let mut terminal = ratatui::init();
    if let Err(e) = execute!(std::io::stdout(), EnableMouseCapture) {
        tracing::warn!("mouse capture unavailable: {}", e);
    }
    let result = app.run(&mut terminal).await;
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    tracing::info!("navtree exiting");
    result.context("Browser failed")
}
