use gpi_port::PortType;
use thiserror::Error;

/// Errors raised by a built-in node's compute function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
  /// A required input was not supplied.
  #[error("missing input '{port}'")]
  MissingInput { port: String },

  /// An input carried a payload the node cannot handle.
  #[error("input '{port}' expected {expected}, got {actual}")]
  InputType {
    port: String,
    expected: &'static str,
    actual: PortType,
  },

  /// A configuration entry is absent or has the wrong JSON type.
  #[error("config '{key}' must be {expected}")]
  InvalidConfig { key: String, expected: &'static str },
}
