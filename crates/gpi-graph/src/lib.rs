//! GPI Graph
//!
//! Topology of a node graph: placed [`NodeInstance`]s and the [`Wire`]s that
//! feed one instance's output into another's input port. The graph knows
//! nothing about node definitions or port types; connection type checks are
//! made by the caller before [`Graph::connect`].
//!
//! The graph is kept acyclic at all times. [`Graph::topological_order`]
//! gives the order in which instances can be evaluated.

mod document;
mod error;
mod graph;
mod instance;

pub use document::GraphDef;
pub use error::GraphError;
pub use graph::Graph;
pub use instance::{NodeInstance, Wire};
