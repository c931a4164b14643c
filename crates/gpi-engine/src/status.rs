use gpi_port::PortValue;
use serde::Serialize;

use crate::error::ComputeError;

/// Evaluation state of a node instance.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeStatus {
  /// Not yet evaluated since it was added or last changed.
  Unevaluated,
  /// Required inputs have no value yet.
  Waiting { missing: Vec<String> },
  /// A computation is in flight.
  Pending { generation: u64 },
  /// The last computation committed an output.
  Ready,
  Failed { error: ComputeError },
}

impl NodeStatus {
  pub fn label(&self) -> &'static str {
    match self {
      NodeStatus::Unevaluated => "unevaluated",
      NodeStatus::Waiting { .. } => "waiting",
      NodeStatus::Pending { .. } => "pending",
      NodeStatus::Ready => "ready",
      NodeStatus::Failed { .. } => "failed",
    }
  }

  pub fn is_pending(&self) -> bool {
    matches!(self, NodeStatus::Pending { .. })
  }
}

/// Serializable summary of one node for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
  pub node_type: String,
  pub status: &'static str,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub missing: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub output: Option<PortValue>,
}

impl NodeReport {
  pub fn new(node_type: &str, status: &NodeStatus, output: Option<&PortValue>) -> Self {
    let (missing, error) = match status {
      NodeStatus::Waiting { missing } => (missing.clone(), None),
      NodeStatus::Failed { error } => (Vec::new(), Some(error.to_string())),
      _ => (Vec::new(), None),
    };
    Self {
      node_type: node_type.to_string(),
      status: status.label(),
      missing,
      error,
      output: output.cloned(),
    }
  }
}
