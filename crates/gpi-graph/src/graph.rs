use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::GraphError;
use crate::instance::{NodeInstance, Wire};

/// Node instances and the wires between them. Always acyclic.
#[derive(Debug, Clone, Default)]
pub struct Graph {
  nodes: BTreeMap<String, NodeInstance>,
  /// Wires keyed by their target `(to, port)`; an input port has at most one feed.
  wires: BTreeMap<(String, String), Wire>,
}

impl Graph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_node(&mut self, node: NodeInstance) -> Result<(), GraphError> {
    if self.nodes.contains_key(&node.id) {
      return Err(GraphError::DuplicateNode { id: node.id });
    }
    self.nodes.insert(node.id.clone(), node);
    Ok(())
  }

  /// Remove a node and every wire touching it.
  pub fn remove_node(&mut self, id: &str) -> Result<NodeInstance, GraphError> {
    let node = self.nodes.remove(id).ok_or_else(|| GraphError::NodeNotFound {
      id: id.to_string(),
    })?;
    self.wires.retain(|_, wire| wire.from != id && wire.to != id);
    Ok(node)
  }

  pub fn node(&self, id: &str) -> Result<&NodeInstance, GraphError> {
    self.nodes.get(id).ok_or_else(|| GraphError::NodeNotFound {
      id: id.to_string(),
    })
  }

  pub fn node_mut(&mut self, id: &str) -> Result<&mut NodeInstance, GraphError> {
    self.nodes.get_mut(id).ok_or_else(|| GraphError::NodeNotFound {
      id: id.to_string(),
    })
  }

  pub fn contains(&self, id: &str) -> bool {
    self.nodes.contains_key(id)
  }

  /// All instances, ordered by id.
  pub fn nodes(&self) -> impl Iterator<Item = &NodeInstance> {
    self.nodes.values()
  }

  pub fn wires(&self) -> impl Iterator<Item = &Wire> {
    self.wires.values()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Add a wire, replacing any wire already feeding the same input port.
  ///
  /// Returns the replaced wire, if any. Fails without changing the graph if
  /// either end is unknown or the wire would create a cycle.
  pub fn connect(&mut self, wire: Wire) -> Result<Option<Wire>, GraphError> {
    self.node(&wire.from)?;
    self.node(&wire.to)?;

    let key = (wire.to.clone(), wire.port.clone());
    // The wire being replaced cannot be part of a new cycle.
    let replaced = self.wires.remove(&key);
    if wire.from == wire.to || self.reaches(&wire.to, &wire.from) {
      if let Some(previous) = replaced {
        self.wires.insert(key, previous);
      }
      return Err(GraphError::CycleDetected {
        from: wire.from,
        to: wire.to,
      });
    }

    self.wires.insert(key, wire);
    Ok(replaced)
  }

  /// Remove the wire feeding `port` on `to`.
  pub fn disconnect(&mut self, to: &str, port: &str) -> Option<Wire> {
    self.wires.remove(&(to.to_string(), port.to_string()))
  }

  /// The wire feeding `port` on `to`.
  pub fn wire_into(&self, to: &str, port: &str) -> Option<&Wire> {
    self.wires.get(&(to.to_string(), port.to_string()))
  }

  /// Wires feeding any port of `to`, ordered by port.
  pub fn incoming(&self, to: &str) -> Vec<&Wire> {
    self.wires.values().filter(|wire| wire.to == to).collect()
  }

  /// Ids of nodes wired directly into `id`.
  pub fn upstream(&self, id: &str) -> Vec<&str> {
    let set: BTreeSet<&str> = self
      .incoming(id)
      .into_iter()
      .map(|wire| wire.from.as_str())
      .collect();
    set.into_iter().collect()
  }

  /// Ids of nodes `id` is wired directly into.
  pub fn downstream(&self, id: &str) -> Vec<&str> {
    let set: BTreeSet<&str> = self
      .wires
      .values()
      .filter(|wire| wire.from == id)
      .map(|wire| wire.to.as_str())
      .collect();
    set.into_iter().collect()
  }

  /// `id` together with everything transitively downstream of it.
  pub fn downstream_closure(&self, id: &str) -> HashSet<String> {
    let adjacency = self.adjacency();
    let mut seen = HashSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
      if !seen.insert(current.to_string()) {
        continue;
      }
      if let Some(next) = adjacency.get(current) {
        stack.extend(next.iter().copied());
      }
    }
    seen
  }

  /// Node ids ordered so every node comes after all of its upstream nodes.
  ///
  /// Ties are broken by id so the order is stable.
  pub fn topological_order(&self) -> Vec<String> {
    let adjacency = self.adjacency();
    let mut in_degree: HashMap<&str, usize> =
      self.nodes.keys().map(|id| (id.as_str(), 0)).collect();
    for wire in self.wires.values() {
      if let Some(degree) = in_degree.get_mut(wire.to.as_str()) {
        *degree += 1;
      }
    }

    let mut ready: BTreeSet<&str> = in_degree
      .iter()
      .filter(|(_, degree)| **degree == 0)
      .map(|(id, _)| *id)
      .collect();
    let mut order = Vec::with_capacity(self.nodes.len());

    while let Some(id) = ready.pop_first() {
      order.push(id.to_string());
      for &next in adjacency.get(id).into_iter().flatten() {
        if let Some(degree) = in_degree.get_mut(next) {
          *degree -= 1;
          if *degree == 0 {
            ready.insert(next);
          }
        }
      }
    }

    order
  }

  /// Whether `target` is reachable from `start` along wires.
  fn reaches(&self, start: &str, target: &str) -> bool {
    let adjacency = self.adjacency();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
      if current == target {
        return true;
      }
      if !seen.insert(current) {
        continue;
      }
      if let Some(next) = adjacency.get(current) {
        stack.extend(next.iter().copied());
      }
    }
    false
  }

  /// node id -> ids it feeds, one entry per wire.
  fn adjacency(&self) -> HashMap<&str, Vec<&str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for wire in self.wires.values() {
      adjacency
        .entry(wire.from.as_str())
        .or_default()
        .push(wire.to.as_str());
    }
    adjacency
  }
}
