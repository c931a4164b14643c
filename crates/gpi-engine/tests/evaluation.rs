//! End-to-end evaluation through the registry, compute engine and session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gpi_engine::{
  ChannelNotifier, ComputeEngine, ComputeError, GraphSession, NodeStatus, SessionEvent,
};
use gpi_graph::NodeInstance;
use gpi_node::{Config, Inputs, NodeDefinition, builtin_definitions};
use gpi_port::{OutputPort, PortType, PortValue};
use gpi_registry::{NodeRegistry, RegistryError};
use gpi_remote::{NodeSource, RemoteError};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

fn registry() -> Arc<NodeRegistry> {
  Arc::new(NodeRegistry::new(builtin_definitions()).unwrap())
}

/// Node source whose answers are released by the test, one per value of input `b`.
#[derive(Default)]
struct GatedSource {
  gates: Mutex<HashMap<i64, oneshot::Receiver<PortValue>>>,
}

impl GatedSource {
  fn gate(&self, b: i64) -> oneshot::Sender<PortValue> {
    let (tx, rx) = oneshot::channel();
    self.gates.lock().unwrap().insert(b, rx);
    tx
  }
}

#[async_trait]
impl NodeSource for GatedSource {
  async fn list_nodes(&self) -> Result<Vec<serde_json::Value>, RemoteError> {
    Ok(Vec::new())
  }

  async fn run_node(
    &self,
    _node_type: &str,
    inputs: &Inputs,
    _config: &Config,
  ) -> Result<PortValue, RemoteError> {
    let b = inputs
      .get("b")
      .and_then(PortValue::as_f64)
      .map(|b| b as i64)
      .unwrap_or_default();
    let gate = self.gates.lock().unwrap().remove(&b);
    match gate {
      Some(rx) => rx.await.map_err(|_| RemoteError::Unavailable {
        reason: "gate dropped".to_string(),
      }),
      None => Err(RemoteError::Unavailable {
        reason: format!("no gate for b={}", b),
      }),
    }
  }
}

#[tokio::test]
async fn test_constant_computes_real_ten() {
  let mut session = GraphSession::new(registry(), ComputeEngine::new());
  session
    .insert_node(NodeInstance::new("c", "_Constant").with_config("value", json!(10)))
    .unwrap();
  session.run_until_idle().await;

  assert_eq!(session.output("c"), Some(&PortValue::Real(10.0)));
}

#[tokio::test]
async fn test_constants_into_add_compute_integer_seven() {
  let mut session = GraphSession::new(registry(), ComputeEngine::new());
  session
    .insert_node(NodeInstance::new("three", "_Constant").with_config("value", json!(3)))
    .unwrap();
  session
    .insert_node(NodeInstance::new("four", "_Constant").with_config("value", json!(4)))
    .unwrap();
  session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
  session.connect("three", "sum", "a").unwrap();
  session.connect("four", "sum", "b").unwrap();
  session.run_until_idle().await;

  assert_eq!(session.output("three"), Some(&PortValue::Real(3.0)));
  assert_eq!(session.output("sum"), Some(&PortValue::Integer(7)));
}

#[tokio::test]
async fn test_unknown_type_is_not_found() {
  let registry = registry();
  assert_eq!(
    registry.lookup("_Missing").unwrap_err(),
    RegistryError::NodeNotFound {
      node_type: "_Missing".to_string()
    }
  );
}

#[tokio::test]
async fn test_registry_round_trip_and_no_shadowing() {
  let registry = registry();
  for def in builtin_definitions() {
    assert_eq!(*registry.lookup(def.node_type()).unwrap(), def);
  }

  registry.replace_dynamic([NodeDefinition::remote(
    "_Constant",
    OutputPort::new(PortType::Image),
  )]);
  assert_eq!(
    registry.lookup("_Constant").unwrap().output().produces,
    PortType::Real
  );
}

#[tokio::test]
async fn test_missing_input_holds_back_compute() {
  let mut session = GraphSession::new(registry(), ComputeEngine::new());
  session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
  session.set_input("sum", "b", PortValue::Integer(5)).unwrap();
  session.run_until_idle().await;

  assert_eq!(
    session.status("sum"),
    Some(&NodeStatus::Waiting {
      missing: vec!["a".to_string()]
    })
  );
  assert!(!session.has_pending());

  session.set_input("sum", "a", PortValue::Integer(2)).unwrap();
  session.run_until_idle().await;
  assert_eq!(session.output("sum"), Some(&PortValue::Integer(7)));
}

#[tokio::test]
async fn test_stale_result_arriving_late_is_discarded() {
  let source = Arc::new(GatedSource::default());
  let first = source.gate(2);
  let second = source.gate(3);

  let (tx, mut events) = mpsc::unbounded_channel();
  let mut session = GraphSession::with_notifier(
    registry(),
    ComputeEngine::with_source(source.clone()),
    ChannelNotifier::new(tx),
  );
  session
    .insert_node(NodeInstance::new("dyn", "_DynamicNode"))
    .unwrap();

  session.set_input("dyn", "a", PortValue::Real(1.0)).unwrap();
  session.set_input("dyn", "b", PortValue::Real(2.0)).unwrap();
  session.evaluate();
  let g1 = session.generation("dyn").unwrap();

  session.set_input("dyn", "b", PortValue::Real(3.0)).unwrap();
  session.evaluate();
  let g2 = session.generation("dyn").unwrap();
  assert!(g2 > g1);
  assert_eq!(
    session.status("dyn"),
    Some(&NodeStatus::Pending { generation: g2 })
  );

  second.send(PortValue::Real(4.0)).unwrap();
  assert_eq!(session.apply_next_completion().await, Some(true));
  assert_eq!(session.output("dyn"), Some(&PortValue::Real(4.0)));

  first.send(PortValue::Real(3.0)).unwrap();
  assert_eq!(session.apply_next_completion().await, Some(false));
  assert_eq!(session.output("dyn"), Some(&PortValue::Real(4.0)));
  assert_eq!(session.status("dyn"), Some(&NodeStatus::Ready));

  drop(session);
  let mut seen = Vec::new();
  while let Some(event) = events.recv().await {
    seen.push(event);
  }
  assert!(seen.contains(&SessionEvent::StaleResultDiscarded {
    node_id: "dyn".to_string(),
    generation: g1,
  }));
}

#[tokio::test]
async fn test_stale_result_arriving_early_is_discarded() {
  let source = Arc::new(GatedSource::default());
  let first = source.gate(2);
  let second = source.gate(3);

  let mut session = GraphSession::new(registry(), ComputeEngine::with_source(source.clone()));
  session
    .insert_node(NodeInstance::new("dyn", "_DynamicNode"))
    .unwrap();
  session.set_input("dyn", "a", PortValue::Real(1.0)).unwrap();
  session.set_input("dyn", "b", PortValue::Real(2.0)).unwrap();
  session.evaluate();
  session.set_input("dyn", "b", PortValue::Real(3.0)).unwrap();
  session.evaluate();

  first.send(PortValue::Real(3.0)).unwrap();
  assert_eq!(session.apply_next_completion().await, Some(false));
  assert!(session.status("dyn").unwrap().is_pending());
  assert_eq!(session.output("dyn"), None);

  second.send(PortValue::Real(4.0)).unwrap();
  session.run_until_idle().await;
  assert_eq!(session.output("dyn"), Some(&PortValue::Real(4.0)));
}

#[tokio::test]
async fn test_downstream_waits_for_pending_upstream() {
  let source = Arc::new(GatedSource::default());
  let gate = source.gate(2);

  let mut session = GraphSession::new(registry(), ComputeEngine::with_source(source.clone()));
  session
    .insert_node(NodeInstance::new("dyn", "_DynamicNode"))
    .unwrap();
  session.insert_node(NodeInstance::new("sum", "_Add")).unwrap();
  session.set_input("dyn", "a", PortValue::Real(1.0)).unwrap();
  session.set_input("dyn", "b", PortValue::Real(2.0)).unwrap();
  session.connect("dyn", "sum", "a").unwrap();
  session.set_input("sum", "b", PortValue::Integer(10)).unwrap();

  session.evaluate();
  assert!(session.status("dyn").unwrap().is_pending());
  assert_eq!(session.status("sum"), Some(&NodeStatus::Unevaluated));

  gate.send(PortValue::Real(3.0)).unwrap();
  session.run_until_idle().await;
  assert_eq!(session.output("sum"), Some(&PortValue::Integer(13)));
}

#[tokio::test]
async fn test_remote_failure_marks_only_that_node() {
  let source = Arc::new(GatedSource::default());
  let mut session = GraphSession::new(registry(), ComputeEngine::with_source(source));
  session
    .insert_node(NodeInstance::new("dyn", "_DynamicNode"))
    .unwrap();
  session
    .insert_node(NodeInstance::new("c", "_Constant"))
    .unwrap();
  session.set_input("dyn", "a", PortValue::Real(1.0)).unwrap();
  session.set_input("dyn", "b", PortValue::Real(99.0)).unwrap();
  session.run_until_idle().await;

  assert!(matches!(
    session.status("dyn"),
    Some(NodeStatus::Failed {
      error: ComputeError::Remote(RemoteError::Unavailable { .. })
    })
  ));
  assert_eq!(session.output("c"), Some(&PortValue::Real(10.0)));
}

#[tokio::test]
async fn test_registry_reload_resolves_new_type() {
  let registry = registry();
  let source = Arc::new(GatedSource::default());
  let gate = source.gate(0);

  let mut session = GraphSession::new(registry.clone(), ComputeEngine::with_source(source.clone()));
  session.insert_node(NodeInstance::new("n", "noise")).unwrap();
  session.run_until_idle().await;
  assert_eq!(session.status("n").map(NodeStatus::label), Some("failed"));

  registry.replace_dynamic([NodeDefinition::remote(
    "noise",
    OutputPort::new(PortType::array_of(PortType::Real)),
  )]);
  session.on_registry_changed();
  gate.send(PortValue::Vector(vec![0.5, 0.25])).unwrap();
  session.run_until_idle().await;

  assert_eq!(
    session.output("n"),
    Some(&PortValue::reals([0.5, 0.25]))
  );
}

#[tokio::test]
async fn test_result_for_cleared_input_is_discarded() {
  let source = Arc::new(GatedSource::default());
  let gate = source.gate(2);

  let mut session = GraphSession::new(registry(), ComputeEngine::with_source(source.clone()));
  session
    .insert_node(NodeInstance::new("dyn", "_DynamicNode"))
    .unwrap();
  session.set_input("dyn", "a", PortValue::Real(1.0)).unwrap();
  session.set_input("dyn", "b", PortValue::Real(2.0)).unwrap();
  session.evaluate();
  assert!(session.status("dyn").unwrap().is_pending());

  session.clear_input("dyn", "b").unwrap();
  session.evaluate();
  assert_eq!(
    session.status("dyn"),
    Some(&NodeStatus::Waiting {
      missing: vec!["b".to_string()]
    })
  );

  gate.send(PortValue::Real(3.0)).unwrap();
  assert_eq!(session.apply_next_completion().await, Some(false));
  assert_eq!(
    session.status("dyn").map(NodeStatus::label),
    Some("waiting")
  );
  assert_eq!(session.output("dyn"), None);
}

#[tokio::test]
async fn test_result_for_unregistered_type_is_discarded() {
  let registry = registry();
  let source = Arc::new(GatedSource::default());
  let gate = source.gate(0);
  registry.replace_dynamic([NodeDefinition::remote(
    "noise",
    OutputPort::new(PortType::Real),
  )]);

  let mut session = GraphSession::new(registry.clone(), ComputeEngine::with_source(source.clone()));
  session.insert_node(NodeInstance::new("n", "noise")).unwrap();
  session.evaluate();
  assert!(session.status("n").unwrap().is_pending());

  registry.replace_dynamic(Vec::new());
  session.on_registry_changed();
  session.evaluate();
  assert_eq!(
    session.status("n"),
    Some(&NodeStatus::Failed {
      error: ComputeError::NodeNotFound {
        node_type: "noise".to_string()
      }
    })
  );

  gate.send(PortValue::Real(0.5)).unwrap();
  assert_eq!(session.apply_next_completion().await, Some(false));
  assert_eq!(session.status("n").map(NodeStatus::label), Some("failed"));
  assert_eq!(session.output("n"), None);
}
