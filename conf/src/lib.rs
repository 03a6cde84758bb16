//! Configuration loading and hot reload for every binary in the workspace.
//!
//! Two documents are loaded independently (`spec.md` §6): `AppConfig` (YAML,
//! pointed at by `--config`) and `GameConfig` (JSON, found under
//! `--gameDir`). Both are re-parsed and atomically swapped into a
//! `RwLock`-guarded slot on a filesystem change, the way the teacher's
//! `lobby::reload_config` swaps its room-config map.

mod app_config;
mod cli;
mod game_config;
mod watch;

pub use app_config::AppConfig;
pub use cli::Cli;
pub use game_config::{GameConfig, ServerEntry};
pub use watch::{ConfigError, ConfigHandle};
