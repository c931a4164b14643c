//! Evaluation events for observers of a graph session.

use gpi_port::PortValue;
use serde::Serialize;
use tokio::sync::mpsc;

/// Emitted as a session evaluates its nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
  /// A computation was started under a new generation.
  NodeSubmitted { node_id: String, generation: u64 },

  /// A node is held back by missing required inputs.
  NodeWaiting {
    node_id: String,
    missing: Vec<String>,
  },

  NodeCompleted {
    node_id: String,
    generation: u64,
    output: PortValue,
  },

  NodeFailed {
    node_id: String,
    generation: u64,
    error: String,
  },

  /// A result arrived for a generation that has since been superseded.
  StaleResultDiscarded { node_id: String, generation: u64 },
}

/// Receives session events.
pub trait SessionNotifier: Send + Sync {
  fn notify(&self, event: SessionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl SessionNotifier for NoopNotifier {
  fn notify(&self, _event: SessionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
    Self { sender }
  }
}

impl SessionNotifier for ChannelNotifier {
  fn notify(&self, event: SessionEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
