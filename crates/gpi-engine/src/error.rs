use gpi_graph::GraphError;
use gpi_node::NodeError;
use gpi_port::PortError;
use gpi_registry::RegistryError;
use gpi_remote::RemoteError;
use thiserror::Error;

/// Why a node instance failed to produce an output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
  /// The instance's type is in neither the built-in nor the dynamic set.
  #[error("node type not found: {node_type}")]
  NodeNotFound { node_type: String },

  /// The registry refused the lookup for a reason other than a missing type.
  #[error(transparent)]
  Lookup(#[from] RegistryError),

  /// A built-in rejected its inputs or configuration.
  #[error("invalid input: {0}")]
  InvalidInput(#[from] NodeError),

  /// The external node source failed or could not be reached.
  #[error(transparent)]
  Remote(#[from] RemoteError),

  /// No node source is configured for a remote node type.
  #[error("no node source available to run {node_type}")]
  NoSource { node_type: String },

  /// The computed value cannot carry the definition's declared output type.
  #[error("output of {node_type} does not match its declaration: {source}")]
  OutputMismatch {
    node_type: String,
    #[source]
    source: PortError,
  },
}

/// Errors from editing a graph session.
#[derive(Debug, Error)]
pub enum SessionError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  /// The connection was refused by the port type check. No wire was created.
  #[error(transparent)]
  Port(#[from] PortError),

  #[error("node {node_id} has no input port '{port}'")]
  PortNotFound { node_id: String, port: String },
}
