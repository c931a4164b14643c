use std::collections::BTreeMap;

use gpi_port::{InputPort, OutputPort};
use serde::{Deserialize, Serialize};

use crate::definition::{Compute, Config, NodeDefinition};

/// Wire form of a node type as reported by the external node source.
///
/// ```json
/// {
///   "type": "add_int",
///   "inputs": { "a": { "accepts": ["Integer"] } },
///   "output": { "produces": "Integer" },
///   "config_defaults": { "offset": 0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
  #[serde(rename = "type")]
  pub node_type: String,

  #[serde(default)]
  pub inputs: BTreeMap<String, InputPort>,

  pub output: OutputPort,

  #[serde(default)]
  pub config_defaults: Config,
}

impl NodeDescription {
  /// Convert to a definition whose compute is delegated back to the source.
  pub fn into_definition(self) -> NodeDefinition {
    let mut def = NodeDefinition::remote(self.node_type, self.output);
    for (name, port) in self.inputs {
      def = def.with_input(name, port);
    }
    for (key, value) in self.config_defaults {
      def = def.with_config(key, value);
    }
    def
  }
}

impl From<&NodeDefinition> for NodeDescription {
  fn from(def: &NodeDefinition) -> Self {
    Self {
      node_type: def.node_type().to_string(),
      inputs: def.inputs().clone(),
      output: def.output().clone(),
      config_defaults: def.config().clone(),
    }
  }
}

impl NodeDefinition {
  /// Where compute happens, as a short label for listings.
  pub fn origin(&self) -> &'static str {
    match self.compute() {
      Compute::Builtin { .. } => "builtin",
      Compute::Remote { .. } => "remote",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use gpi_port::PortType;
  use serde_json::json;

  #[test]
  fn test_parse_description() {
    let desc: NodeDescription = serde_json::from_value(json!({
      "type": "add_int",
      "inputs": {
        "a": { "accepts": ["Integer"] },
        "b": { "accepts": ["Integer"], "optional": true }
      },
      "output": { "produces": "Integer" },
      "config_defaults": { "offset": 0 }
    }))
    .unwrap();

    let def = desc.into_definition();
    assert_eq!(def.node_type(), "add_int");
    assert!(def.is_remote());
    assert_eq!(def.origin(), "remote");
    assert!(def.input("b").unwrap().optional);
    assert_eq!(def.output().produces, PortType::Integer);
    assert_eq!(def.config()["offset"], json!(0));
  }

  #[test]
  fn test_inputs_and_config_default_to_empty() {
    let desc: NodeDescription = serde_json::from_value(json!({
      "type": "noise",
      "output": { "produces": { "Array": "Real" } }
    }))
    .unwrap();
    let def = desc.into_definition();
    assert!(def.inputs().is_empty());
    assert!(def.config().is_empty());
  }

  #[test]
  fn test_missing_output_is_rejected() {
    let result = serde_json::from_value::<NodeDescription>(json!({ "type": "broken" }));
    assert!(result.is_err());
  }

  #[test]
  fn test_from_definition() {
    let def = crate::Builtin::Add.definition();
    let desc = NodeDescription::from(&def);
    assert_eq!(desc.node_type, "_Add");
    assert_eq!(desc.inputs.len(), 2);
  }
}
