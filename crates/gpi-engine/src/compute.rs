use std::sync::Arc;

use futures::future::BoxFuture;
use gpi_node::{Compute, Config, Inputs, NodeDefinition};
use gpi_port::PortValue;
use gpi_remote::NodeSource;

use crate::error::ComputeError;

/// Outcome of asking a node to compute.
pub enum Computation {
  /// Finished immediately.
  Ready(Result<PortValue, ComputeError>),
  /// Completes later, after a call to the external node source.
  Pending(BoxFuture<'static, Result<PortValue, ComputeError>>),
}

impl Computation {
  /// Wait for the result, whichever variant this is.
  pub async fn wait(self) -> Result<PortValue, ComputeError> {
    match self {
      Computation::Ready(result) => result,
      Computation::Pending(future) => future.await,
    }
  }

  pub fn is_pending(&self) -> bool {
    matches!(self, Computation::Pending(_))
  }
}

/// Dispatches a definition's compute, built-in or remote.
#[derive(Clone, Default)]
pub struct ComputeEngine {
  source: Option<Arc<dyn NodeSource>>,
}

impl ComputeEngine {
  /// An engine that can only run built-ins.
  pub fn new() -> Self {
    Self::default()
  }

  /// An engine that delegates remote node types to `source`.
  pub fn with_source(source: Arc<dyn NodeSource>) -> Self {
    Self {
      source: Some(source),
    }
  }

  /// Compute `def` on `inputs`, with `config` layered over its defaults.
  ///
  /// Inputs are trusted to match the declared ports; callers check for
  /// missing required inputs first. The result is re-tagged with the
  /// declared output type.
  pub fn compute(&self, def: Arc<NodeDefinition>, inputs: Inputs, config: &Config) -> Computation {
    let config = def.resolve_config(config);

    match def.compute().clone() {
      Compute::Builtin { builtin } => {
        let result = builtin
          .compute(&inputs, &config)
          .map_err(ComputeError::from)
          .and_then(|value| declared_output(&def, value));
        Computation::Ready(result)
      }
      Compute::Remote { remote_type } => {
        let Some(source) = self.source.clone() else {
          return Computation::Ready(Err(ComputeError::NoSource {
            node_type: def.node_type().to_string(),
          }));
        };
        Computation::Pending(Box::pin(async move {
          let value = source.run_node(&remote_type, &inputs, &config).await?;
          declared_output(&def, value)
        }))
      }
    }
  }
}

fn declared_output(def: &NodeDefinition, value: PortValue) -> Result<PortValue, ComputeError> {
  value
    .retag(&def.output().produces)
    .map_err(|source| ComputeError::OutputMismatch {
      node_type: def.node_type().to_string(),
      source,
    })
}
