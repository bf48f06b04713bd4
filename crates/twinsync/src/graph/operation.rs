use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::model::GraphModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

/// One JSON-Patch operation against a node's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    /// `add` also replaces a property that already exists.
    pub fn add(property: &str, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: format!("/{}", property),
            value: Some(value),
        }
    }

    pub fn remove(property: &str) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: format!("/{}", property),
            value: None,
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.op, self.path, value),
            None => write!(f, "{} {}", self.op, self.path),
        }
    }
}

/// A graph vertex (twin) typed by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub model_id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A directed, named relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub name: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

/// One idempotent mutation of the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type")]
pub enum GraphOperation {
    EnsureModels {
        models: Vec<GraphModel>,
    },
    UpsertNode(Node),
    UpsertEdge(Edge),
    PatchNode {
        id: String,
        patch: Vec<PatchOp>,
    },
    DeleteNode {
        id: String,
    },
    DeleteModel {
        id: String,
    },
}

impl GraphOperation {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// The node, edge or model this operation addresses.
    pub fn target(&self) -> &str {
        match self {
            GraphOperation::EnsureModels { .. } => "models",
            GraphOperation::UpsertNode(node) => &node.id,
            GraphOperation::UpsertEdge(edge) => &edge.id,
            GraphOperation::PatchNode { id, .. }
            | GraphOperation::DeleteNode { id }
            | GraphOperation::DeleteModel { id } => id,
        }
    }
}

/// One-line summary, used by `plan` output and in logs.
impl fmt::Display for GraphOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphOperation::EnsureModels { models } => {
                write!(f, "EnsureModels ({} models)", models.len())
            }
            GraphOperation::UpsertNode(node) => {
                let keys: Vec<&str> = node.properties.keys().map(String::as_str).collect();
                write!(
                    f,
                    "UpsertNode {} [{}] {{{}}}",
                    node.id,
                    node.model_id,
                    keys.join(", ")
                )
            }
            GraphOperation::UpsertEdge(edge) => write!(
                f,
                "UpsertEdge {} -{}-> {}",
                edge.source_node_id, edge.name, edge.target_node_id
            ),
            GraphOperation::PatchNode { id, patch } => {
                let ops: Vec<String> = patch.iter().map(PatchOp::to_string).collect();
                write!(f, "PatchNode {} [{}]", id, ops.join("; "))
            }
            GraphOperation::DeleteNode { id } => write!(f, "DeleteNode {}", id),
            GraphOperation::DeleteModel { id } => write!(f, "DeleteModel {}", id),
        }
    }
}

/// Render an operation list one summary per line.
pub fn summarize(operations: &[GraphOperation]) -> String {
    operations
        .iter()
        .map(GraphOperation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
