use super::backend::{validate_resource_name, DocSource};
use crate::config::DataConfig;
use crate::model::script::parse_var;
use crate::model::{IndexEntry, NavIndex, NodeData, NodePath};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Reads generated navigation scripts from a documentation output directory
///
/// Layout (names configurable through [`DataConfig`]):
/// - `navtreedata.js`: `var NAVTREE` (tree) and `var NAVTREEINDEX` (chunk heads)
/// - `<resource>.js`: `var <resource>` (lazy sub-tree)
/// - `navtreeindex<N>.js`: `var NAVTREEINDEX<N>` (reference -> path table)
#[derive(Debug, Clone)]
pub struct LocalDocSource {
    dir: PathBuf,
    layout: DataConfig,
}

impl LocalDocSource {
    pub fn new(dir: impl Into<PathBuf>, layout: DataConfig) -> Self {
        Self {
            dir: dir.into(),
            layout,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_script(&self, file_name: &str) -> io::Result<String> {
        let path = self.dir.join(file_name);
        tracing::trace!("reading navigation script {:?}", path);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl DocSource for LocalDocSource {
    async fn load_tree(&self) -> io::Result<Vec<NodeData>> {
        let script = self.read_script(&self.layout.tree_file).await?;
        Ok(parse_var(&script, &self.layout.tree_var)?)
    }

    async fn load_subtree(&self, resource: &str) -> io::Result<Vec<NodeData>> {
        validate_resource_name(resource)?;
        let script = self.read_script(&format!("{resource}.js")).await?;
        Ok(parse_var(&script, resource)?)
    }

    async fn load_index_heads(&self) -> io::Result<Vec<String>> {
        let script = self.read_script(&self.layout.tree_file).await?;
        Ok(parse_var(&script, &self.layout.index_var)?)
    }

    async fn load_index_chunk(&self, chunk: usize) -> io::Result<Vec<IndexEntry>> {
        let file_name = format!("{}{}.js", self.layout.index_chunk_prefix, chunk);
        let var_name = format!("{}{}", self.layout.index_var, chunk);
        let script = self.read_script(&file_name).await?;
        let table: BTreeMap<String, NodePath> = parse_var(&script, &var_name)?;
        Ok(NavIndex::from_table(table).entries().to_vec())
    }
}
