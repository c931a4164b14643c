use std::sync::Arc;
use std::time::Duration;

use gpi_registry::{NodeRegistry, RegistrySnapshot};
use gpi_remote::{NodeSource, fetch_definitions};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::LoaderError;
use crate::event::{ChangeEvent, EventFilter};

/// Fetches dynamic definitions from a node source into a registry.
pub struct NodeLoader {
  registry: Arc<NodeRegistry>,
  source: Arc<dyn NodeSource>,
}

impl NodeLoader {
  pub fn new(registry: Arc<NodeRegistry>, source: Arc<dyn NodeSource>) -> Self {
    Self { registry, source }
  }

  pub fn registry(&self) -> &Arc<NodeRegistry> {
    &self.registry
  }

  /// Fetch every description and replace the dynamic set.
  ///
  /// On failure the registry keeps its last-known-good dynamic set.
  #[instrument(skip(self))]
  pub async fn reload(&self) -> Result<Arc<RegistrySnapshot>, LoaderError> {
    match fetch_definitions(self.source.as_ref()).await {
      Ok(definitions) => Ok(self.registry.replace_dynamic(definitions)),
      Err(e) => {
        warn!(error = %e, "reload failed, keeping previous dynamic nodes");
        Err(e.into())
      }
    }
  }

  /// Reload once `quiet` has passed since the last actionable change.
  ///
  /// Runs until `cancel` fires or the change stream ends. A burst of changes
  /// produces a single reload; a failed reload is logged and the loop carries
  /// on.
  pub async fn run(
    &self,
    mut events: mpsc::Receiver<ChangeEvent>,
    filter: EventFilter,
    quiet: Duration,
    cancel: CancellationToken,
  ) {
    let mut deadline: Option<Instant> = None;

    loop {
      let settled = async move {
        match deadline {
          Some(at) => tokio::time::sleep_until(at).await,
          None => std::future::pending().await,
        }
      };

      tokio::select! {
        biased;

        _ = cancel.cancelled() => {
          debug!("node loader cancelled");
          break;
        }
        event = events.recv() => match event {
          Some(event) if filter.is_actionable(&event) => {
            debug!(path = %event.path.display(), kind = ?event.kind, "node source changed");
            deadline = Some(Instant::now() + quiet);
          }
          Some(event) => {
            trace!(path = %event.path.display(), kind = ?event.kind, "ignoring change");
          }
          None => {
            info!("change stream closed");
            break;
          }
        },
        _ = settled => {
          deadline = None;
          // Failure already logged; the loop keeps watching.
          let _ = self.reload().await;
        }
      }
    }
  }
}
