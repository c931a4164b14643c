use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::instance::{NodeInstance, Wire};

/// Serialized graph.
///
/// ```json
/// {
///   "nodes": [
///     { "id": "three", "type": "_Constant", "config": { "value": 3 } },
///     { "id": "sum", "type": "_Add" }
///   ],
///   "wires": [{ "from": "three", "to": "sum", "port": "a" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
  #[serde(default)]
  pub nodes: Vec<NodeInstance>,
  #[serde(default)]
  pub wires: Vec<Wire>,
}

impl GraphDef {
  /// Build the topology, rejecting duplicate ids, dangling wires and cycles.
  pub fn into_graph(self) -> Result<Graph, GraphError> {
    let mut graph = Graph::new();
    for node in self.nodes {
      graph.add_node(node)?;
    }
    for wire in self.wires {
      graph.connect(wire)?;
    }
    Ok(graph)
  }
}

impl From<&Graph> for GraphDef {
  fn from(graph: &Graph) -> Self {
    Self {
      nodes: graph.nodes().cloned().collect(),
      wires: graph.wires().cloned().collect(),
    }
  }
}
