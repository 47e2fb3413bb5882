//! Configuration loaded from `.credvault.toml`.

pub mod settings;

pub use settings::{Settings, CONFIG_ENV_VAR};
