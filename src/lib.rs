//! Atomemo plugin CLI: device login, plugin scaffolding and debug keys

pub mod api;
pub mod auth;
pub mod config;
pub mod env_file;
pub mod generator;

pub use api::ApiClient;
pub use config::{Config, ConfigStore};
pub use generator::{GenerationContext, create_generator};
