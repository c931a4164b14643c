use std::collections::BTreeMap;

use gpi_port::PortValue;
use serde::{Deserialize, Serialize};

/// A placed occurrence of a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
  pub id: String,

  #[serde(rename = "type")]
  pub node_type: String,

  /// Overrides layered over the definition's config defaults.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub config: BTreeMap<String, serde_json::Value>,

  /// Values set directly on input ports rather than fed by a wire.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub inputs: BTreeMap<String, PortValue>,
}

impl NodeInstance {
  pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type: node_type.into(),
      config: BTreeMap::new(),
      inputs: BTreeMap::new(),
    }
  }

  /// New instance with a random id.
  pub fn with_random_id(node_type: impl Into<String>) -> Self {
    Self::new(uuid::Uuid::new_v4().to_string(), node_type)
  }

  pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.config.insert(key.into(), value);
    self
  }

  pub fn with_input(mut self, port: impl Into<String>, value: PortValue) -> Self {
    self.inputs.insert(port.into(), value);
    self
  }
}

/// Feeds the output of `from` into input `port` of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
  pub from: String,
  pub to: String,
  pub port: String,
}

impl Wire {
  pub fn new(from: impl Into<String>, to: impl Into<String>, port: impl Into<String>) -> Self {
    Self {
      from: from.into(),
      to: to.into(),
      port: port.into(),
    }
  }
}
