//! Configuration and component wiring shared by the Strata binary.

pub mod bootstrap;
pub mod config;

pub use bootstrap::{App, create_embedder, open_store, resolve_config_path};
pub use config::Config;
