//! GPI Node
//!
//! A [`NodeDefinition`] is the immutable template for a node type: its input
//! ports, its output port, default configuration and how it computes.
//!
//! Compute behaviour is data, not a closure. Built-in nodes dispatch on the
//! closed [`Builtin`] enum; nodes discovered from the external node source
//! carry [`Compute::Remote`] and are evaluated by calling back into that
//! process.
//!
//! [`NodeDescription`] is the serialized form exchanged with the external
//! node source.

mod builtin;
mod definition;
mod description;
mod error;

pub use builtin::{Builtin, DYNAMIC_NODE, builtin_definitions};
pub use definition::{Compute, Config, Inputs, NodeDefinition};
pub use description::NodeDescription;
pub use error::NodeError;
