use thiserror::Error;

/// Errors raised by the node registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  /// No built-in or dynamic definition carries this type name.
  #[error("node type not found: {node_type}")]
  NodeNotFound { node_type: String },

  /// Two built-in definitions share a type name.
  #[error("duplicate built-in node type: {node_type}")]
  DuplicateBuiltin { node_type: String },
}
