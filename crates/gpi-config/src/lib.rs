//! GPI Config
//!
//! Settings loaded from `<config_dir>/gpi/config.toml`. Every field has a
//! default, so a missing file or a partial file is fine:
//!
//! ```toml
//! nodes_dir = "/home/me/gpi/nodes"
//! venv_dir = "/home/me/gpi/nodes/.venv"
//!
//! [host]
//! program = "python3"
//! args = ["-m", "gpi_host"]
//! timeout_ms = 10000
//!
//! [watch]
//! recursive = true
//! debounce_ms = 2000
//! extensions = ["py"]
//! ignore_dirs = [".venv", "__pycache__"]
//! ```

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{HostSettings, Settings, WatchSettings, default_config_path};
