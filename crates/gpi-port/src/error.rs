use thiserror::Error;

use crate::types::PortType;

/// Errors raised by the port type system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
  /// An output port's type is not among the types an input port accepts.
  #[error("port type mismatch: {output} is not accepted by input expecting {}", list(.accepted))]
  PortTypeMismatch {
    output: PortType,
    accepted: Vec<PortType>,
  },

  /// An array item does not match the array's element type.
  #[error("array element mismatch at index {index}: expected {expected}, got {actual}")]
  ElementMismatch {
    index: usize,
    expected: PortType,
    actual: PortType,
  },

  /// Image payload length disagrees with its dimensions.
  #[error("image data has {actual} bytes, expected {width}x{height}x{channels}")]
  ImageSize {
    width: u32,
    height: u32,
    channels: u8,
    actual: usize,
  },

  /// A value cannot be re-tagged as the requested type without loss.
  #[error("cannot re-tag {actual} value as {expected}")]
  Retag { expected: PortType, actual: PortType },
}

fn list(types: &[PortType]) -> String {
  if types.is_empty() {
    return "nothing".to_string();
  }
  types
    .iter()
    .map(|t| t.to_string())
    .collect::<Vec<_>>()
    .join(" | ")
}
