use async_trait::async_trait;
use gpi_node::{Config, Inputs};
use gpi_port::PortValue;

use crate::error::RemoteError;

/// A provider of dynamically defined node types.
#[async_trait]
pub trait NodeSource: Send + Sync {
  /// Raw node descriptions, one JSON document per node type.
  ///
  /// Descriptions are returned undecoded so a single malformed entry can be
  /// dropped without losing its siblings.
  async fn list_nodes(&self) -> Result<Vec<serde_json::Value>, RemoteError>;

  /// Run `node_type` on the given inputs and resolved configuration.
  async fn run_node(
    &self,
    node_type: &str,
    inputs: &Inputs,
    config: &Config,
  ) -> Result<PortValue, RemoteError>;
}
