use std::collections::BTreeMap;

use gpi_port::{InputPort, OutputPort, PortValue};
use serde::{Deserialize, Serialize};

use crate::builtin::Builtin;

/// Input values keyed by port name.
pub type Inputs = BTreeMap<String, PortValue>;

/// Configuration values keyed by config key.
pub type Config = BTreeMap<String, serde_json::Value>;

/// How a node produces its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compute {
  /// Pure function evaluated in-process.
  Builtin { builtin: Builtin },
  /// Delegated to the external node-source process under `remote_type`.
  Remote { remote_type: String },
}

/// Immutable template describing a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
  node_type: String,
  inputs: BTreeMap<String, InputPort>,
  output: OutputPort,
  config: Config,
  compute: Compute,
}

impl NodeDefinition {
  /// Start a definition with no inputs and no configuration.
  pub fn new(node_type: impl Into<String>, output: OutputPort, compute: Compute) -> Self {
    Self {
      node_type: node_type.into(),
      inputs: BTreeMap::new(),
      output,
      config: Config::new(),
      compute,
    }
  }

  /// Definition whose compute is delegated to the external process under its own name.
  pub fn remote(node_type: impl Into<String>, output: OutputPort) -> Self {
    let node_type = node_type.into();
    let compute = Compute::Remote {
      remote_type: node_type.clone(),
    };
    Self::new(node_type, output, compute)
  }

  pub fn with_input(mut self, name: impl Into<String>, port: InputPort) -> Self {
    self.inputs.insert(name.into(), port);
    self
  }

  pub fn with_config(mut self, key: impl Into<String>, default: serde_json::Value) -> Self {
    self.config.insert(key.into(), default);
    self
  }

  pub fn node_type(&self) -> &str {
    &self.node_type
  }

  pub fn inputs(&self) -> &BTreeMap<String, InputPort> {
    &self.inputs
  }

  pub fn input(&self, name: &str) -> Option<&InputPort> {
    self.inputs.get(name)
  }

  pub fn output(&self) -> &OutputPort {
    &self.output
  }

  /// Default configuration.
  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn compute(&self) -> &Compute {
    &self.compute
  }

  pub fn is_remote(&self) -> bool {
    matches!(self.compute, Compute::Remote { .. })
  }

  /// Required input ports without a value in `inputs`, in port order.
  pub fn missing_inputs(&self, inputs: &Inputs) -> Vec<String> {
    self
      .inputs
      .iter()
      .filter(|(name, port)| !port.optional && !inputs.contains_key(*name))
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Instance configuration layered over this definition's defaults.
  pub fn resolve_config(&self, overrides: &Config) -> Config {
    let mut config = self.config.clone();
    for (key, value) in overrides {
      config.insert(key.clone(), value.clone());
    }
    config
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use gpi_port::PortType;
  use serde_json::json;

  fn binary_def() -> NodeDefinition {
    NodeDefinition::remote("scale", OutputPort::new(PortType::Real))
      .with_input("a", InputPort::required([PortType::Real]))
      .with_input("b", InputPort::optional([PortType::Real]))
      .with_config("factor", json!(2.0))
  }

  #[test]
  fn test_remote_compute_uses_own_name() {
    let def = binary_def();
    assert!(def.is_remote());
    assert_eq!(
      def.compute(),
      &Compute::Remote {
        remote_type: "scale".to_string()
      }
    );
  }

  #[test]
  fn test_missing_inputs_skips_optional() {
    let def = binary_def();
    assert_eq!(def.missing_inputs(&Inputs::new()), vec!["a".to_string()]);

    let mut inputs = Inputs::new();
    inputs.insert("a".to_string(), PortValue::Real(1.0));
    assert!(def.missing_inputs(&inputs).is_empty());
  }

  #[test]
  fn test_resolve_config_overrides_defaults() {
    let def = binary_def().with_config("label", json!("x"));
    let mut overrides = Config::new();
    overrides.insert("factor".to_string(), json!(5));

    let resolved = def.resolve_config(&overrides);
    assert_eq!(resolved["factor"], json!(5));
    assert_eq!(resolved["label"], json!("x"));
  }

  #[test]
  fn test_compute_serialization() {
    let compute = Compute::Builtin {
      builtin: Builtin::Add,
    };
    assert_eq!(
      serde_json::to_value(&compute).unwrap(),
      json!({"kind": "builtin", "builtin": "_Add"})
    );
  }
}
