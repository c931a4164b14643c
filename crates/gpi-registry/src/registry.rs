use std::collections::HashMap;
use std::sync::Arc;

use gpi_node::NodeDefinition;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::RegistryError;

type Definitions = HashMap<String, Arc<NodeDefinition>>;

/// Immutable view of the dynamically discovered definitions.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
  version: u64,
  definitions: Definitions,
}

impl RegistrySnapshot {
  /// Incremented on every replacement. The empty initial set is version 0.
  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn get(&self, node_type: &str) -> Option<&Arc<NodeDefinition>> {
    self.definitions.get(node_type)
  }

  pub fn len(&self) -> usize {
    self.definitions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.definitions.is_empty()
  }

  /// Type names in this snapshot, sorted.
  pub fn node_types(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}

/// Lookup table from node type name to definition.
///
/// Built-ins take precedence over dynamic definitions of the same name.
pub struct NodeRegistry {
  builtins: Arc<Definitions>,
  dynamic: watch::Sender<Arc<RegistrySnapshot>>,
}

impl NodeRegistry {
  /// Create a registry over a fixed set of built-ins and an empty dynamic set.
  pub fn new(builtins: impl IntoIterator<Item = NodeDefinition>) -> Result<Self, RegistryError> {
    let mut map = Definitions::new();
    for def in builtins {
      let node_type = def.node_type().to_string();
      if map.contains_key(&node_type) {
        return Err(RegistryError::DuplicateBuiltin { node_type });
      }
      map.insert(node_type, Arc::new(def));
    }

    let (dynamic, _) = watch::channel(Arc::new(RegistrySnapshot::default()));
    Ok(Self {
      builtins: Arc::new(map),
      dynamic,
    })
  }

  /// Resolve a type name, built-ins first.
  pub fn lookup(&self, node_type: &str) -> Result<Arc<NodeDefinition>, RegistryError> {
    if let Some(def) = self.builtins.get(node_type) {
      return Ok(def.clone());
    }

    self
      .dynamic
      .borrow()
      .get(node_type)
      .cloned()
      .ok_or_else(|| RegistryError::NodeNotFound {
        node_type: node_type.to_string(),
      })
  }

  pub fn contains(&self, node_type: &str) -> bool {
    self.lookup(node_type).is_ok()
  }

  pub fn is_builtin(&self, node_type: &str) -> bool {
    self.builtins.contains_key(node_type)
  }

  /// The current dynamic snapshot.
  pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
    self.dynamic.borrow().clone()
  }

  /// Receive a notification each time the dynamic set is replaced.
  pub fn subscribe(&self) -> watch::Receiver<Arc<RegistrySnapshot>> {
    self.dynamic.subscribe()
  }

  /// Every definition, built-ins then dynamic, each group sorted by name.
  pub fn definitions(&self) -> Vec<Arc<NodeDefinition>> {
    let mut builtins: Vec<_> = self.builtins.values().cloned().collect();
    builtins.sort_by(|a, b| a.node_type().cmp(b.node_type()));

    let snapshot = self.snapshot();
    let mut dynamic: Vec<_> = snapshot.definitions.values().cloned().collect();
    dynamic.sort_by(|a, b| a.node_type().cmp(b.node_type()));

    builtins.extend(dynamic);
    builtins
  }

  /// Replace the entire dynamic set in one step.
  ///
  /// Definitions that collide with a built-in are dropped, as are repeats of
  /// a name already seen in `definitions` (the first one wins).
  pub fn replace_dynamic(
    &self,
    definitions: impl IntoIterator<Item = NodeDefinition>,
  ) -> Arc<RegistrySnapshot> {
    let mut map = Definitions::new();
    for def in definitions {
      let node_type = def.node_type();
      if self.builtins.contains_key(node_type) {
        warn!(node_type, "dynamic node shadows a built-in, skipping");
        continue;
      }
      if map.contains_key(node_type) {
        warn!(node_type, "duplicate dynamic node type, keeping first");
        continue;
      }
      debug!(node_type, "registering dynamic node");
      map.insert(node_type.to_string(), Arc::new(def));
    }

    let mut installed = None;
    self.dynamic.send_modify(|current| {
      let next = Arc::new(RegistrySnapshot {
        version: current.version + 1,
        definitions: std::mem::take(&mut map),
      });
      installed = Some(next.clone());
      *current = next;
    });

    let snapshot = installed.unwrap_or_else(|| self.snapshot());
    info!(
      version = snapshot.version,
      count = snapshot.len(),
      "dynamic node set replaced"
    );
    snapshot
  }
}
