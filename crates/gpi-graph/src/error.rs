use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("node not found: {id}")]
  NodeNotFound { id: String },

  #[error("node already exists: {id}")]
  DuplicateNode { id: String },

  /// Wiring `from` into `to` would close a loop.
  #[error("wire {from} -> {to} would create a cycle")]
  CycleDetected { from: String, to: String },
}
