//! GPI Registry
//!
//! Maps node type names to [`NodeDefinition`](gpi_node::NodeDefinition)s.
//!
//! Built-in definitions are fixed at construction. Dynamically discovered
//! definitions live in an immutable [`RegistrySnapshot`] that is replaced
//! wholesale on every reload, so readers always see either the previous set
//! or the next one and never a partial mix.

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{NodeRegistry, RegistrySnapshot};
