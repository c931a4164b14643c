use gpi_node::{Config, Inputs};
use gpi_port::PortValue;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// A request written to the node source's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
  ListNodes,
  RunNode {
    node_type: String,
    inputs: Inputs,
    config: Config,
  },
}

/// Answer to a `run_node` request: either `{"out": ...}` or `{"error": "..."}`.
#[derive(Debug, Default, Deserialize)]
pub struct RunReply {
  #[serde(default)]
  pub out: Option<serde_json::Value>,
  #[serde(default)]
  pub error: Option<String>,
}

impl RunReply {
  pub fn into_result(self, node_type: &str) -> Result<PortValue, RemoteError> {
    if let Some(message) = self.error {
      return Err(RemoteError::Remote {
        node_type: node_type.to_string(),
        message,
      });
    }

    let out = self.out.ok_or_else(|| RemoteError::Malformed {
      reason: "reply has neither `out` nor `error`".to_string(),
    })?;
    serde_json::from_value(out).map_err(|e| RemoteError::Malformed {
      reason: format!("invalid output value: {}", e),
    })
  }
}
