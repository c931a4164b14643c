use gpi_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
  /// The file-system watcher could not be set up.
  #[error("failed to watch node directory: {0}")]
  Watch(#[from] notify::Error),

  /// The node source could not be queried. The registry is unchanged.
  #[error("failed to fetch node definitions: {0}")]
  Fetch(#[from] RemoteError),
}
