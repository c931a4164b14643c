use serde::{Deserialize, Serialize};

use crate::types::{PortType, is_compatible};

/// Declaration of an input slot on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPort {
  /// Types this input accepts. A union when more than one.
  pub accepts: Vec<PortType>,

  /// Optional inputs do not hold back evaluation when unconnected.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub optional: bool,
}

impl InputPort {
  /// A required input accepting any of the given types.
  pub fn required(accepts: impl IntoIterator<Item = PortType>) -> Self {
    Self {
      accepts: accepts.into_iter().collect(),
      optional: false,
    }
  }

  /// An optional input accepting any of the given types.
  pub fn optional(accepts: impl IntoIterator<Item = PortType>) -> Self {
    Self {
      accepts: accepts.into_iter().collect(),
      optional: true,
    }
  }

  /// Whether an output of type `ty` may be connected here.
  pub fn accepts(&self, ty: &PortType) -> bool {
    is_compatible(ty, &self.accepts)
  }
}

/// Declaration of a node's output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPort {
  pub produces: PortType,
}

impl OutputPort {
  pub fn new(produces: PortType) -> Self {
    Self { produces }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_optional_flag_defaults_to_required() {
    let port: InputPort = serde_json::from_str(r#"{"accepts":["Real"]}"#).unwrap();
    assert_eq!(port, InputPort::required([PortType::Real]));
    assert_eq!(
      serde_json::to_string(&port).unwrap(),
      r#"{"accepts":["Real"]}"#
    );
  }

  #[test]
  fn test_input_accepts() {
    let port = InputPort::optional([PortType::Vector, PortType::array_of(PortType::Real)]);
    assert!(port.optional);
    assert!(port.accepts(&PortType::Vector));
    assert!(!port.accepts(&PortType::array_of(PortType::Integer)));
  }
}
