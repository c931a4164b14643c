use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::ModifyKind;

/// Kind of file-system change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  Created,
  Modified,
  Removed,
  /// Accesses, metadata touches and other events that do not change content.
  Continuous,
}

impl From<&EventKind> for ChangeKind {
  fn from(kind: &EventKind) -> Self {
    match kind {
      EventKind::Create(_) => ChangeKind::Created,
      EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Continuous,
      EventKind::Modify(_) => ChangeKind::Modified,
      EventKind::Remove(_) => ChangeKind::Removed,
      EventKind::Access(_) | EventKind::Any | EventKind::Other => ChangeKind::Continuous,
    }
  }
}

/// A single change to a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
  pub kind: ChangeKind,
  pub path: PathBuf,
}

impl ChangeEvent {
  pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
    Self {
      kind,
      path: path.into(),
    }
  }

  /// Split a notify event into one change per affected path.
  pub fn from_notify(event: notify::Event) -> Vec<ChangeEvent> {
    let kind = ChangeKind::from(&event.kind);
    event
      .paths
      .into_iter()
      .map(|path| ChangeEvent { kind, path })
      .collect()
  }
}

/// Decides which changes should trigger a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
  extensions: Vec<String>,
  ignore_dirs: Vec<String>,
}

impl Default for EventFilter {
  fn default() -> Self {
    Self::new(["py"], [".venv", "__pycache__"])
  }
}

impl EventFilter {
  pub fn new<E, D>(extensions: E, ignore_dirs: D) -> Self
  where
    E: IntoIterator,
    E::Item: Into<String>,
    D: IntoIterator,
    D::Item: Into<String>,
  {
    Self {
      extensions: extensions.into_iter().map(Into::into).collect(),
      ignore_dirs: ignore_dirs.into_iter().map(Into::into).collect(),
    }
  }

  /// A discrete change to a source file outside any ignored directory.
  pub fn is_actionable(&self, event: &ChangeEvent) -> bool {
    event.kind != ChangeKind::Continuous
      && self.has_source_extension(&event.path)
      && !self.is_ignored(&event.path)
  }

  fn has_source_extension(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
  }

  fn is_ignored(&self, path: &Path) -> bool {
    path.components().any(|component| {
      component
        .as_os_str()
        .to_str()
        .is_some_and(|name| self.ignore_dirs.iter().any(|d| d == name))
    })
  }
}
