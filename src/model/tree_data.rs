//! Navigation tree feed
//!
//! Generated data describes every node as a `[label, target, children]`
//! tuple where `children` is either `null` (leaf), an array of nested tuples
//! (eagerly known children) or a string naming the script that holds the
//! sub-tree (lazy children). The positional encoding is resolved once, here,
//! into [`ChildSource`]; nothing downstream inspects JSON value types.

use super::DataError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One node of the navigation feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub label: String,
    /// Page or anchor the node points at; `None` for grouping nodes
    pub target: Option<String>,
    pub children: ChildSource,
}

/// Where a node's children come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSource {
    /// No children
    Leaf,
    /// Children shipped inline, in display order
    Eager(Vec<NodeData>),
    /// Children live in an external sub-tree resource
    Lazy(String),
}

impl NodeData {
    pub fn leaf(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: Some(target.into()),
            children: ChildSource::Leaf,
        }
    }

    /// A grouping node without a target of its own
    pub fn group(label: impl Into<String>, children: Vec<NodeData>) -> Self {
        Self {
            label: label.into(),
            target: None,
            children: ChildSource::Eager(children),
        }
    }

    pub fn branch(
        label: impl Into<String>,
        target: impl Into<String>,
        children: Vec<NodeData>,
    ) -> Self {
        Self {
            label: label.into(),
            target: Some(target.into()),
            children: ChildSource::Eager(children),
        }
    }

    pub fn lazy(
        label: impl Into<String>,
        target: Option<&str>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            target: target.map(str::to_string),
            children: ChildSource::Lazy(resource.into()),
        }
    }

    pub fn is_grouping(&self) -> bool {
        self.target.is_none()
    }

    /// Decode one `[label, target, children]` tuple
    pub fn from_json(value: &Value) -> Result<Self, DataError> {
        decode_node(value, "$")
    }

    /// Decode an array of tuples, as found at the top of a sub-tree script
    pub fn list_from_json(value: &Value) -> Result<Vec<Self>, DataError> {
        decode_list(value, "$")
    }

    /// Check the node invariants on an already built value
    pub fn validate(&self) -> Result<(), DataError> {
        validate_node(self, "$")
    }
}

impl<'de> Deserialize<'de> for NodeData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        NodeData::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Pick the root of a top-level node list.
///
/// A single top-level entry is the root itself. Several entries are wrapped
/// in a grouping node labelled `root_label`.
pub fn root_from_list(mut nodes: Vec<NodeData>, root_label: &str) -> Result<NodeData, DataError> {
    match nodes.len() {
        0 => Err(DataError::InvalidNode {
            path: "$".to_string(),
            reason: "navigation tree is empty".to_string(),
        }),
        1 => Ok(nodes.remove(0)),
        _ => Ok(NodeData::group(root_label, nodes)),
    }
}

fn decode_list(value: &Value, path: &str) -> Result<Vec<NodeData>, DataError> {
    let items = value.as_array().ok_or_else(|| DataError::InvalidNode {
        path: path.to_string(),
        reason: "expected an array of nodes".to_string(),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_node(item, &format!("{path}[{i}]")))
        .collect()
}

fn decode_node(value: &Value, path: &str) -> Result<NodeData, DataError> {
    let invalid = |reason: &str| DataError::InvalidNode {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let tuple = value
        .as_array()
        .ok_or_else(|| invalid("expected a [label, target, children] tuple"))?;
    if tuple.len() != 3 {
        return Err(invalid("tuple must have exactly three elements"));
    }

    let label = tuple[0]
        .as_str()
        .ok_or_else(|| invalid("label must be a string"))?
        .to_string();

    let target = match &tuple[1] {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        _ => return Err(invalid("target must be a string or null")),
    };

    let children = match &tuple[2] {
        Value::Null => ChildSource::Leaf,
        Value::String(resource) if resource.is_empty() => {
            return Err(invalid("lazy resource name is empty"))
        }
        Value::String(resource) => ChildSource::Lazy(resource.clone()),
        Value::Array(_) => {
            let nodes = decode_list(&tuple[2], &format!("{path}.children"))?;
            if nodes.is_empty() {
                ChildSource::Leaf
            } else {
                ChildSource::Eager(nodes)
            }
        }
        _ => return Err(invalid("children must be null, an array or a resource name")),
    };

    let node = NodeData {
        label,
        target,
        children,
    };
    check_grouping(&node, path)?;
    Ok(node)
}

fn validate_node(node: &NodeData, path: &str) -> Result<(), DataError> {
    check_grouping(node, path)?;
    if let ChildSource::Eager(children) = &node.children {
        for (i, child) in children.iter().enumerate() {
            validate_node(child, &format!("{path}[{i}]"))?;
        }
    }
    Ok(())
}

fn check_grouping(node: &NodeData, path: &str) -> Result<(), DataError> {
    let has_children = match &node.children {
        ChildSource::Leaf => false,
        ChildSource::Eager(children) => !children.is_empty(),
        ChildSource::Lazy(_) => true,
    };
    if node.is_grouping() && !has_children {
        return Err(DataError::InvalidNode {
            path: path.to_string(),
            reason: format!("grouping node '{}' has no children", node.label),
        });
    }
    Ok(())
}
