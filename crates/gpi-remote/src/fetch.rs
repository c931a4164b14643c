use gpi_node::{NodeDefinition, NodeDescription};
use tracing::{instrument, warn};

use crate::error::RemoteError;
use crate::source::NodeSource;

/// Ask `source` for its node types and decode each description on its own.
///
/// Descriptions that fail to decode are logged and dropped. Only a failure
/// of the request as a whole is returned as an error.
#[instrument(skip(source))]
pub async fn fetch_definitions(source: &dyn NodeSource) -> Result<Vec<NodeDefinition>, RemoteError> {
  let raw = source.list_nodes().await?;
  let mut definitions = Vec::with_capacity(raw.len());

  for (index, value) in raw.into_iter().enumerate() {
    match serde_json::from_value::<NodeDescription>(value) {
      Ok(description) => definitions.push(description.into_definition()),
      Err(e) => warn!(index, error = %e, "dropping malformed node description"),
    }
  }

  Ok(definitions)
}
