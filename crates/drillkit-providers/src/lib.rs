//! drillkit-providers: AI question generators.
//!
//! Implements the `QuizGenerator` trait for OpenAI-compatible gateways,
//! Anthropic, and an offline mock, and loads `drillkit.toml`.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;

pub use config::{create_generator, load_config, load_config_from, DrillkitConfig, ProviderConfig};
pub use error::ProviderError;
