use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::LoaderError;
use crate::event::ChangeEvent;

const CHANNEL_CAPACITY: usize = 100;

/// Keeps the underlying file-system watch alive. Dropping it ends the stream.
pub struct NodeWatcher {
  _watcher: RecommendedWatcher,
}

/// Subscribe to changes under `dir`.
///
/// Returns the watcher handle and the stream of raw changes. The stream is
/// not filtered and cannot be restarted: once the handle is dropped the
/// receiver yields `None` and a new subscription must be made.
pub fn watch_dir(
  dir: &Path,
  recursive: bool,
) -> Result<(NodeWatcher, mpsc::Receiver<ChangeEvent>), LoaderError> {
  let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

  let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
    match res {
      Ok(event) => {
        for change in ChangeEvent::from_notify(event) {
          // Runs on the notifier's own thread.
          if tx.blocking_send(change).is_err() {
            return;
          }
        }
      }
      Err(e) => warn!(error = %e, "file watcher error"),
    }
  })?;

  let mode = if recursive {
    RecursiveMode::Recursive
  } else {
    RecursiveMode::NonRecursive
  };
  watcher.watch(dir, mode)?;
  info!(dir = %dir.display(), recursive, "watching node directory");

  Ok((NodeWatcher { _watcher: watcher }, rx))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test(flavor = "multi_thread")]
  async fn test_file_creation_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (_watcher, mut rx) = watch_dir(dir.path(), true).unwrap();

    let path = dir.path().join("new_node.py");
    std::fs::write(&path, "def compute(): pass\n").unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), async {
      loop {
        match rx.recv().await {
          Some(event) if event.path.ends_with("new_node.py") => return Some(event),
          Some(_) => continue,
          None => return None,
        }
      }
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(event.path.file_name(), path.file_name());
  }

  #[test]
  fn test_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent");
    assert!(matches!(
      watch_dir(&missing, false),
      Err(LoaderError::Watch(_))
    ));
  }
}
