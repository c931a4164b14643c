use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use gpi_graph::{Graph, GraphDef, NodeInstance, Wire};
use gpi_node::Inputs;
use gpi_port::{PortValue, check_connection};
use gpi_registry::{NodeRegistry, RegistryError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::compute::{Computation, ComputeEngine};
use crate::error::{ComputeError, SessionError};
use crate::events::{NoopNotifier, SessionEvent, SessionNotifier};
use crate::status::{NodeReport, NodeStatus};

/// Result of a pending computation, tagged with the generation it was started under.
#[derive(Debug)]
struct Completion {
  node_id: String,
  generation: u64,
  result: Result<PortValue, ComputeError>,
}

/// Per-instance evaluation state.
#[derive(Debug)]
struct Slot {
  /// Generation of the latest submission. A result tagged with any other is stale.
  generation: u64,
  status: NodeStatus,
  /// Last committed output. This is what downstream nodes read.
  output: Option<PortValue>,
  dirty: bool,
}

impl Slot {
  fn new() -> Self {
    Self {
      generation: 0,
      status: NodeStatus::Unevaluated,
      output: None,
      dirty: true,
    }
  }
}

/// A graph together with the state needed to keep its outputs current.
///
/// Every edit marks the edited node and everything downstream of it dirty.
/// [`evaluate`](Self::evaluate) recomputes dirty nodes in dependency order;
/// remote computations run as spawned tasks and report back through a
/// channel. Each submission gets a fresh generation and a result is only
/// committed if its generation is still the node's latest, so a slow stale
/// result can never overwrite a newer one.
///
/// Must be used from within a tokio runtime.
pub struct GraphSession<N: SessionNotifier = NoopNotifier> {
  graph: Graph,
  registry: Arc<NodeRegistry>,
  engine: ComputeEngine,
  slots: HashMap<String, Slot>,
  next_generation: u64,
  completions_tx: mpsc::UnboundedSender<Completion>,
  completions_rx: mpsc::UnboundedReceiver<Completion>,
  notifier: N,
}

impl GraphSession<NoopNotifier> {
  pub fn new(registry: Arc<NodeRegistry>, engine: ComputeEngine) -> Self {
    Self::with_notifier(registry, engine, NoopNotifier)
  }
}

impl<N: SessionNotifier> GraphSession<N> {
  pub fn with_notifier(registry: Arc<NodeRegistry>, engine: ComputeEngine, notifier: N) -> Self {
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    Self {
      graph: Graph::new(),
      registry,
      engine,
      slots: HashMap::new(),
      next_generation: 0,
      completions_tx,
      completions_rx,
      notifier,
    }
  }

  /// Load every node and wire of `def`, type-checking each wire.
  ///
  /// A wire touching a node whose type is not registered yet is kept
  /// unchecked, so a document referencing external nodes still loads while
  /// the node source is down.
  pub fn load(&mut self, def: GraphDef) -> Result<(), SessionError> {
    for node in def.nodes {
      self.insert_node(node)?;
    }
    for wire in def.wires {
      match self.connect(&wire.from, &wire.to, &wire.port) {
        Ok(_) => {}
        Err(SessionError::Registry(e)) => {
          warn!(from = %wire.from, to = %wire.to, error = %e, "keeping unchecked wire");
          let to = wire.to.clone();
          self.graph.connect(wire)?;
          self.mark_dirty(&to);
        }
        Err(e) => return Err(e),
      }
    }
    Ok(())
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn registry(&self) -> &Arc<NodeRegistry> {
    &self.registry
  }

  /// Place a new instance of `node_type` and return its id.
  ///
  /// The type is not resolved until evaluation, so an unknown type leaves
  /// the instance in place with a failed status.
  pub fn add_node(
    &mut self,
    node_type: &str,
    config: BTreeMap<String, serde_json::Value>,
  ) -> Result<String, SessionError> {
    let mut node = NodeInstance::with_random_id(node_type);
    node.config = config;
    let id = node.id.clone();
    self.insert_node(node)?;
    Ok(id)
  }

  /// Place an instance with a caller-chosen id.
  pub fn insert_node(&mut self, node: NodeInstance) -> Result<(), SessionError> {
    let id = node.id.clone();
    self.graph.add_node(node)?;
    self.slots.insert(id, Slot::new());
    Ok(())
  }

  pub fn remove_node(&mut self, id: &str) -> Result<NodeInstance, SessionError> {
    self.mark_downstream_dirty(id);
    let node = self.graph.remove_node(id)?;
    // Any result still in flight for this node is dropped on arrival.
    self.slots.remove(id);
    Ok(node)
  }

  /// Wire the output of `from` into `port` on `to`.
  ///
  /// Both node types must resolve and the output type must be accepted by
  /// the port. A wire already feeding the port is replaced and returned.
  pub fn connect(&mut self, from: &str, to: &str, port: &str) -> Result<Option<Wire>, SessionError> {
    let from_def = self.registry.lookup(&self.graph.node(from)?.node_type)?;
    let to_def = self.registry.lookup(&self.graph.node(to)?.node_type)?;
    let input = to_def
      .input(port)
      .ok_or_else(|| SessionError::PortNotFound {
        node_id: to.to_string(),
        port: port.to_string(),
      })?;
    check_connection(&from_def.output().produces, &input.accepts)?;

    let replaced = self.graph.connect(Wire::new(from, to, port))?;
    debug!(from, to, port, "wire connected");
    self.mark_dirty(to);
    Ok(replaced)
  }

  pub fn disconnect(&mut self, to: &str, port: &str) -> Option<Wire> {
    let wire = self.graph.disconnect(to, port)?;
    self.mark_dirty(to);
    Some(wire)
  }

  pub fn set_config(&mut self, id: &str, key: &str, value: serde_json::Value) -> Result<(), SessionError> {
    self.graph.node_mut(id)?.config.insert(key.to_string(), value);
    self.mark_dirty(id);
    Ok(())
  }

  /// Set a value directly on an input port. A wire into the same port takes precedence.
  pub fn set_input(&mut self, id: &str, port: &str, value: PortValue) -> Result<(), SessionError> {
    let def = self.registry.lookup(&self.graph.node(id)?.node_type)?;
    let input = def.input(port).ok_or_else(|| SessionError::PortNotFound {
      node_id: id.to_string(),
      port: port.to_string(),
    })?;
    check_connection(&value.port_type(), &input.accepts)?;

    self.graph.node_mut(id)?.inputs.insert(port.to_string(), value);
    self.mark_dirty(id);
    Ok(())
  }

  pub fn clear_input(&mut self, id: &str, port: &str) -> Result<Option<PortValue>, SessionError> {
    let previous = self.graph.node_mut(id)?.inputs.remove(port);
    if previous.is_some() {
      self.mark_dirty(id);
    }
    Ok(previous)
  }

  /// Re-resolve every instance against the registry on next evaluation.
  pub fn on_registry_changed(&mut self) {
    info!(nodes = self.slots.len(), "node registry changed, re-evaluating graph");
    for slot in self.slots.values_mut() {
      slot.dirty = true;
    }
  }

  pub fn status(&self, id: &str) -> Option<&NodeStatus> {
    self.slots.get(id).map(|slot| &slot.status)
  }

  /// Last committed output of `id`.
  pub fn output(&self, id: &str) -> Option<&PortValue> {
    self.slots.get(id).and_then(|slot| slot.output.as_ref())
  }

  /// Current generation of `id`, 0 if it has never been submitted.
  pub fn generation(&self, id: &str) -> Option<u64> {
    self.slots.get(id).map(|slot| slot.generation)
  }

  pub fn has_pending(&self) -> bool {
    self.slots.values().any(|slot| slot.status.is_pending())
  }

  /// Summary of every node, keyed by id.
  pub fn report(&self) -> BTreeMap<String, NodeReport> {
    self
      .graph
      .nodes()
      .filter_map(|node| {
        let slot = self.slots.get(&node.id)?;
        Some((
          node.id.clone(),
          NodeReport::new(&node.node_type, &slot.status, slot.output.as_ref()),
        ))
      })
      .collect()
  }

  /// Submit every dirty node whose upstream nodes have settled.
  ///
  /// Synchronous results are committed immediately, so a chain of built-ins
  /// settles in one call. Returns the number of nodes submitted.
  pub fn evaluate(&mut self) -> usize {
    let mut submitted = 0;
    for id in self.graph.topological_order() {
      let dirty = self.slots.get(&id).is_some_and(|slot| slot.dirty);
      if !dirty || !self.upstream_settled(&id) {
        continue;
      }
      if let Some(slot) = self.slots.get_mut(&id) {
        slot.dirty = false;
      }
      if self.submit(&id) {
        submitted += 1;
      }
    }
    submitted
  }

  /// Evaluate and apply completions until nothing is dirty-and-ready or in flight.
  pub async fn run_until_idle(&mut self) {
    loop {
      self.evaluate();
      if !self.has_pending() {
        break;
      }
      if self.apply_next_completion().await.is_none() {
        break;
      }
    }
  }

  /// Wait for the next in-flight result and apply it.
  ///
  /// Returns whether it was committed; `false` means it was stale.
  pub async fn apply_next_completion(&mut self) -> Option<bool> {
    let completion = self.completions_rx.recv().await?;
    Some(self.apply(completion))
  }

  fn upstream_settled(&self, id: &str) -> bool {
    self.graph.upstream(id).into_iter().all(|up| {
      self
        .slots
        .get(up)
        .is_some_and(|slot| !slot.dirty && !slot.status.is_pending())
    })
  }

  /// Start computing `id`. Returns `false` if nothing was started.
  fn submit(&mut self, id: &str) -> bool {
    let Ok(node) = self.graph.node(id) else {
      return false;
    };

    // Every outcome below supersedes whatever is still in flight for `id`.
    self.next_generation += 1;
    let generation = self.next_generation;
    if let Some(slot) = self.slots.get_mut(id) {
      slot.generation = generation;
    }

    let def = match self.registry.lookup(&node.node_type) {
      Ok(def) => def,
      Err(RegistryError::NodeNotFound { node_type }) => {
        warn!(node_id = id, node_type = %node_type, "node type not found");
        let error = ComputeError::NodeNotFound { node_type };
        self.commit(id, None, NodeStatus::Failed { error });
        return false;
      }
      Err(e) => {
        warn!(node_id = id, error = %e, "node type lookup failed");
        self.commit(id, None, NodeStatus::Failed { error: e.into() });
        return false;
      }
    };

    let inputs = self.gather_inputs(node);
    let missing = def.missing_inputs(&inputs);
    if !missing.is_empty() {
      debug!(node_id = id, ?missing, "waiting for inputs");
      self.notifier.notify(SessionEvent::NodeWaiting {
        node_id: id.to_string(),
        missing: missing.clone(),
      });
      self.commit(id, None, NodeStatus::Waiting { missing });
      return false;
    }

    let computation = self.engine.compute(def, inputs, &node.config);
    self.notifier.notify(SessionEvent::NodeSubmitted {
      node_id: id.to_string(),
      generation,
    });

    match computation {
      Computation::Ready(result) => {
        self.apply(Completion {
          node_id: id.to_string(),
          generation,
          result,
        });
      }
      Computation::Pending(future) => {
        if let Some(slot) = self.slots.get_mut(id) {
          slot.status = NodeStatus::Pending { generation };
        }
        debug!(node_id = id, generation, "computation pending");
        let tx = self.completions_tx.clone();
        let node_id = id.to_string();
        tokio::spawn(async move {
          let result = future.await;
          // The session may already be gone.
          let _ = tx.send(Completion {
            node_id,
            generation,
            result,
          });
        });
      }
    }
    true
  }

  /// Values for each input port: wired outputs first, then directly set values.
  fn gather_inputs(&self, node: &NodeInstance) -> Inputs {
    let mut inputs: Inputs = node.inputs.clone();
    for wire in self.graph.incoming(&node.id) {
      match self.output(&wire.from) {
        Some(value) => {
          inputs.insert(wire.port.clone(), value.clone());
        }
        None => {
          inputs.remove(&wire.port);
        }
      }
    }
    inputs
  }

  /// Commit a result if its generation is still current. Returns whether it was committed.
  fn apply(&mut self, completion: Completion) -> bool {
    let Completion {
      node_id,
      generation,
      result,
    } = completion;

    let current = self.slots.get(&node_id).map(|slot| slot.generation);
    if current != Some(generation) {
      debug!(node_id = %node_id, generation, ?current, "discarding stale result");
      self.notifier.notify(SessionEvent::StaleResultDiscarded { node_id, generation });
      return false;
    }

    match result {
      Ok(output) => {
        debug!(node_id = %node_id, generation, "node computed");
        self.notifier.notify(SessionEvent::NodeCompleted {
          node_id: node_id.clone(),
          generation,
          output: output.clone(),
        });
        self.commit(&node_id, Some(output), NodeStatus::Ready);
      }
      Err(error) => {
        warn!(node_id = %node_id, generation, error = %error, "node failed");
        self.notifier.notify(SessionEvent::NodeFailed {
          node_id: node_id.clone(),
          generation,
          error: error.to_string(),
        });
        self.commit(&node_id, None, NodeStatus::Failed { error });
      }
    }
    true
  }

  /// Record a new status and output, then dirty everything downstream.
  fn commit(&mut self, id: &str, output: Option<PortValue>, status: NodeStatus) {
    if let Some(slot) = self.slots.get_mut(id) {
      slot.output = output;
      slot.status = status;
    }
    for down in self.graph.downstream(id) {
      if let Some(slot) = self.slots.get_mut(down) {
        slot.dirty = true;
      }
    }
  }

  fn mark_dirty(&mut self, id: &str) {
    for affected in self.graph.downstream_closure(id) {
      if let Some(slot) = self.slots.get_mut(&affected) {
        slot.dirty = true;
      }
    }
  }

  fn mark_downstream_dirty(&mut self, id: &str) {
    for down in self.graph.downstream(id) {
      if let Some(slot) = self.slots.get_mut(down) {
        slot.dirty = true;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use gpi_node::builtin_definitions;
  use gpi_port::PortError;
  use serde_json::json;

  fn session() -> GraphSession {
    let registry = Arc::new(NodeRegistry::new(builtin_definitions()).unwrap());
    GraphSession::new(registry, ComputeEngine::new())
  }

  fn constant(session: &mut GraphSession, id: &str, value: f64) {
    session
      .insert_node(NodeInstance::new(id, "_Constant").with_config("value", json!(value)))
      .unwrap();
  }

  #[tokio::test]
  async fn test_chain_settles_in_one_pass() {
    let mut session = session();
    constant(&mut session, "three", 3.0);
    constant(&mut session, "four", 4.0);
    session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
    session.connect("three", "sum", "a").unwrap();
    session.connect("four", "sum", "b").unwrap();

    assert_eq!(session.evaluate(), 3);
    assert_eq!(session.output("sum"), Some(&PortValue::Integer(7)));
    assert_eq!(session.status("sum"), Some(&NodeStatus::Ready));
  }

  #[tokio::test]
  async fn test_only_dirty_nodes_recompute() {
    let mut session = session();
    constant(&mut session, "three", 3.0);
    constant(&mut session, "four", 4.0);
    session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
    session.connect("three", "sum", "a").unwrap();
    session.connect("four", "sum", "b").unwrap();
    session.evaluate();

    session.set_config("four", "value", json!(10)).unwrap();
    assert_eq!(session.evaluate(), 2);
    assert_eq!(session.output("sum"), Some(&PortValue::Integer(13)));
    assert_eq!(session.evaluate(), 0);
  }

  #[tokio::test]
  async fn test_incompatible_wire_rejected() {
    let mut session = session();
    constant(&mut session, "c", 1.0);
    session.insert_node(NodeInstance::new("img", "_Image")).unwrap();

    let err = session.connect("c", "img", "a").unwrap_err();
    assert!(matches!(
      err,
      SessionError::Port(PortError::PortTypeMismatch { .. })
    ));
    assert_eq!(session.graph().wires().count(), 0);
  }

  #[tokio::test]
  async fn test_unknown_port_rejected() {
    let mut session = session();
    constant(&mut session, "c", 1.0);
    session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
    assert!(matches!(
      session.connect("c", "sum", "z"),
      Err(SessionError::PortNotFound { .. })
    ));
  }

  #[tokio::test]
  async fn test_unknown_type_fails_but_stays() {
    let mut session = session();
    session.insert_node(NodeInstance::new("n", "_Nope")).unwrap();
    session.evaluate();

    assert!(session.graph().contains("n"));
    assert_eq!(
      session.status("n"),
      Some(&NodeStatus::Failed {
        error: ComputeError::NodeNotFound {
          node_type: "_Nope".to_string()
        }
      })
    );
  }

  #[tokio::test]
  async fn test_failure_does_not_spread_sideways() {
    let mut session = session();
    session
      .insert_node(NodeInstance::new("bad", "_Constant").with_config("value", json!("x")))
      .unwrap();
    constant(&mut session, "good", 2.0);
    session.evaluate();

    assert!(matches!(
      session.status("bad"),
      Some(NodeStatus::Failed {
        error: ComputeError::InvalidInput(_)
      })
    ));
    assert_eq!(session.output("good"), Some(&PortValue::Real(2.0)));
  }

  #[tokio::test]
  async fn test_upstream_failure_leaves_downstream_waiting() {
    let mut session = session();
    session
      .insert_node(NodeInstance::new("bad", "_Constant").with_config("value", json!("x")))
      .unwrap();
    session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
    session.connect("bad", "sum", "a").unwrap();
    session.set_input("sum", "b", PortValue::Integer(1)).unwrap();
    session.evaluate();

    assert_eq!(
      session.status("sum"),
      Some(&NodeStatus::Waiting {
        missing: vec!["a".to_string()]
      })
    );
  }

  #[tokio::test]
  async fn test_set_input_type_checked() {
    let mut session = session();
    session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
    assert!(session.set_input("sum", "a", PortValue::Vector(vec![1.0])).is_err());
    assert!(session.set_input("sum", "a", PortValue::Real(1.0)).is_ok());
  }

  #[tokio::test]
  async fn test_disconnect_clears_downstream_output() {
    let mut session = session();
    constant(&mut session, "c", 5.0);
    session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
    session.connect("c", "sum", "a").unwrap();
    session.set_input("sum", "b", PortValue::Integer(1)).unwrap();
    session.evaluate();
    assert_eq!(session.output("sum"), Some(&PortValue::Integer(6)));

    session.disconnect("sum", "a");
    session.evaluate();
    assert_eq!(session.output("sum"), None);
    assert_eq!(session.status("sum").map(NodeStatus::label), Some("waiting"));
  }

  #[tokio::test]
  async fn test_remove_node_dirties_downstream() {
    let mut session = session();
    constant(&mut session, "c", 5.0);
    session.insert_node(NodeInstance::new("plot", "_sin")).unwrap();
    session.insert_node(NodeInstance::new("range", "_Range")).unwrap();
    session.connect("range", "plot", "a").unwrap();
    session.evaluate();
    assert_eq!(session.status("plot"), Some(&NodeStatus::Ready));

    session.remove_node("range").unwrap();
    session.evaluate();
    assert_eq!(session.status("plot").map(NodeStatus::label), Some("waiting"));
    assert!(session.status("range").is_none());
  }

  #[tokio::test]
  async fn test_load_document() {
    let def: GraphDef = serde_json::from_value(json!({
      "nodes": [
        {"id": "x", "type": "_Linspace", "config": {"start": 0, "stop": 1, "num": 3}},
        {"id": "y", "type": "_Plot"}
      ],
      "wires": [{"from": "x", "to": "y", "port": "a"}]
    }))
    .unwrap();

    let mut session = session();
    session.load(def).unwrap();
    session.run_until_idle().await;

    assert_eq!(
      session.output("y").and_then(PortValue::as_reals),
      Some(vec![0.0, 0.5, 1.0])
    );
    let report = session.report();
    assert_eq!(report["y"].status, "ready");
  }

  #[tokio::test]
  async fn test_load_keeps_wires_to_unregistered_types() {
    let def: GraphDef = serde_json::from_value(json!({
      "nodes": [
        {"id": "x", "type": "_Range"},
        {"id": "ext", "type": "scale"}
      ],
      "wires": [{"from": "x", "to": "ext", "port": "a"}]
    }))
    .unwrap();

    let mut session = session();
    session.load(def).unwrap();
    session.run_until_idle().await;

    assert_eq!(session.graph().upstream("ext"), vec!["x"]);
    assert_eq!(session.status("ext").map(NodeStatus::label), Some("failed"));
  }

  #[tokio::test]
  async fn test_load_rejects_mismatched_wire() {
    let def: GraphDef = serde_json::from_value(json!({
      "nodes": [
        {"id": "x", "type": "_Range"},
        {"id": "sum", "type": "_Add"}
      ],
      "wires": [{"from": "x", "to": "sum", "port": "a"}]
    }))
    .unwrap();

    assert!(matches!(
      session().load(def),
      Err(SessionError::Port(_))
    ));
  }
}
