//! GPI Engine
//!
//! [`ComputeEngine`] runs a single node definition on a set of inputs.
//! Built-ins finish immediately; remote node types return a pending
//! [`Computation`] that resolves once the external node source answers.
//!
//! [`GraphSession`] keeps a whole graph's outputs current. It recomputes
//! only what an edit invalidated, in dependency order, and tags every
//! computation with a generation so results that arrive out of order are
//! discarded instead of overwriting newer ones.
//!
//! ```text
//!   edit ──► mark dirty ──► evaluate ──► Ready ──────────────► commit
//!                               │                                 ▲
//!                               └──► Pending ──► spawned task ────┘
//!                                     (generation)   (stale results dropped)
//! ```

mod compute;
mod error;
mod events;
mod session;
mod status;

pub use compute::{Computation, ComputeEngine};
pub use error::{ComputeError, SessionError};
pub use events::{ChannelNotifier, NoopNotifier, SessionEvent, SessionNotifier};
pub use session::GraphSession;
pub use status::{NodeReport, NodeStatus};
