//! GPI Loader
//!
//! Keeps the registry's dynamic node set in step with the external node
//! source. [`NodeLoader::reload`] fetches every description and swaps the
//! dynamic set in one step. [`watch_dir`] turns file-system notifications
//! into [`ChangeEvent`]s, and [`NodeLoader::run`] coalesces bursts of
//! actionable events into a single reload once the directory has been quiet
//! for the debounce interval.

mod error;
mod event;
mod loader;
mod watcher;

pub use error::LoaderError;
pub use event::{ChangeEvent, ChangeKind, EventFilter};
pub use loader::NodeLoader;
pub use watcher::{NodeWatcher, watch_dir};
