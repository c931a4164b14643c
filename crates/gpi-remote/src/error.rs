use std::time::Duration;

use thiserror::Error;

/// Errors talking to the external node source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
  /// The process could not be started or exited unsuccessfully.
  #[error("node source unavailable: {reason}")]
  Unavailable { reason: String },

  /// The process did not answer in time.
  #[error("node source timed out after {timeout:?}")]
  Timeout { timeout: Duration },

  /// The process answered with something that does not decode.
  #[error("malformed response from node source: {reason}")]
  Malformed { reason: String },

  /// The process reported a failure while running a node.
  #[error("node {node_type} failed remotely: {message}")]
  Remote { node_type: String, message: String },
}

impl RemoteError {
  /// Whether the source could not be reached at all.
  pub fn is_unavailable(&self) -> bool {
    matches!(
      self,
      RemoteError::Unavailable { .. } | RemoteError::Timeout { .. }
    )
  }
}
