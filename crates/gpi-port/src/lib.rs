//! GPI Port
//!
//! This crate defines the typed values that flow along wires between nodes and
//! the rules that decide whether a wire may be drawn between two ports.
//!
//! Every [`PortValue`] carries its [`PortType`] as the enum variant, so a value's
//! tag is never inferred from its payload. Compound types such as
//! `Array<Real>` are matched structurally: an input accepting `Array<Real>`
//! rejects an `Array<Integer>` output.
//!
//! Values use serde's externally tagged representation on the wire:
//!
//! ```json
//! { "Real": 3.0 }
//! { "Array": { "element": "Real", "items": [{ "Real": 1.0 }, { "Real": 2.0 }] } }
//! ```

mod error;
mod port;
mod types;
mod value;

pub use error::PortError;
pub use port::{InputPort, OutputPort};
pub use types::{PortType, check_connection, is_compatible};
pub use value::{ArrayValue, ImageValue, PortValue};
