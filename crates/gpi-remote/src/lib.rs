//! GPI Remote
//!
//! The external node source is a separate process that knows about node
//! types defined outside the editor. It answers two requests: list the node
//! types it knows, and run one of them on a set of inputs.
//!
//! [`NodeSource`] is the seam the loader and compute engine depend on.
//! [`ProcessNodeSource`] implements it by spawning the configured host
//! program once per request and exchanging a single JSON document over
//! stdin and stdout.

mod error;
mod fetch;
mod message;
mod process;
mod source;

pub use error::RemoteError;
pub use fetch::fetch_definitions;
pub use message::{Request, RunReply};
pub use process::ProcessNodeSource;
pub use source::NodeSource;
