//! Configuration file and generator factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use drillkit_core::content::RemoteQuizSource;
use drillkit_core::model::{SessionConfig, Variant};
use drillkit_core::presets::{self, VariantOverrides};
use drillkit_core::traits::QuizGenerator;

use crate::anthropic::AnthropicGenerator;
use crate::gateway::GatewayGenerator;
use crate::mock::MockGenerator;

pub const CONFIG_FILE_NAME: &str = "drillkit.toml";

/// Configuration for a single question generator.
///
/// Debug output masks API keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gateway {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Mock {
        /// Fixed completion text; stock questions when absent.
        #[serde(default)]
        response: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gateway {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gateway")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { response } => f
                .debug_struct("Mock")
                .field("response", &response.as_ref().map(|r| r.len()))
                .finish(),
        }
    }
}

/// Top-level drillkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillkitConfig {
    /// Generator configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Where `results.jsonl` is written.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Per-variant overrides keyed by variant name.
    #[serde(default)]
    pub variants: HashMap<String, VariantOverrides>,
}

fn default_provider() -> String {
    "gateway".to_string()
}
fn default_model() -> String {
    "google/gemini-2.5-flash".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./drillkit-results")
}

impl Default for DrillkitConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            results_dir: default_results_dir(),
            variants: HashMap::new(),
        }
    }
}

impl DrillkitConfig {
    /// The preset for `variant` with this file's overrides applied.
    pub fn session_config(&self, variant: Variant) -> SessionConfig {
        let mut config = presets::config(variant);
        let overrides = self
            .variants
            .iter()
            .find(|(key, _)| key.parse::<Variant>().ok() == Some(variant));
        if let Some((_, overrides)) = overrides {
            overrides.apply(&mut config);
        }
        config
    }

    /// Build the remote quiz source from the default provider.
    pub fn remote_source(&self) -> Result<RemoteQuizSource> {
        let provider = self.providers.get(&self.default_provider).with_context(|| {
            format!(
                "provider '{}' is not configured; add it under [providers] or set DRILLKIT_GATEWAY_KEY",
                self.default_provider
            )
        })?;
        let generator = create_generator(provider)?;
        Ok(RemoteQuizSource::new(generator, self.default_model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens))
    }

    fn check_variant_keys(&self) -> Result<()> {
        for key in self.variants.keys() {
            key.parse::<Variant>()
                .map_err(|e| anyhow::anyhow!("[variants.{key}]: {e}"))?;
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gateway { api_key, base_url } => ProviderConfig::Gateway {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Mock { response } => ProviderConfig::Mock {
            response: response.clone(),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `drillkit.toml` in the current directory
/// 2. `~/.config/drillkit/config.toml`
///
/// `DRILLKIT_GATEWAY_KEY` and `DRILLKIT_ANTHROPIC_KEY` override the keys of
/// the `gateway` and `anthropic` providers, creating them if needed.
pub fn load_config() -> Result<DrillkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DrillkitConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => DrillkitConfig::default(),
    };

    if let Ok(key) = std::env::var("DRILLKIT_GATEWAY_KEY") {
        match config.providers.get_mut("gateway") {
            Some(ProviderConfig::Gateway { api_key, .. }) => *api_key = key,
            _ => {
                config.providers.insert(
                    "gateway".into(),
                    ProviderConfig::Gateway {
                        api_key: key,
                        base_url: None,
                    },
                );
            }
        }
    }

    if let Ok(key) = std::env::var("DRILLKIT_ANTHROPIC_KEY") {
        match config.providers.get_mut("anthropic") {
            Some(ProviderConfig::Anthropic { api_key, .. }) => *api_key = key,
            _ => {
                config.providers.insert(
                    "anthropic".into(),
                    ProviderConfig::Anthropic {
                        api_key: key,
                        base_url: None,
                    },
                );
            }
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

/// Parse and check a config document.
pub fn parse_config(content: &str) -> Result<DrillkitConfig> {
    let config: DrillkitConfig = toml::from_str(content)?;
    config.check_variant_keys()?;
    Ok(config)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("drillkit"))
}

/// Create a generator from its configuration.
pub fn create_generator(config: &ProviderConfig) -> Result<Arc<dyn QuizGenerator>> {
    let generator: Arc<dyn QuizGenerator> = match config {
        ProviderConfig::Gateway { api_key, base_url } => {
            Arc::new(GatewayGenerator::new(api_key, base_url.clone())?)
        }
        ProviderConfig::Anthropic { api_key, base_url } => {
            Arc::new(AnthropicGenerator::new(api_key, base_url.clone())?)
        }
        ProviderConfig::Mock { response } => match response {
            Some(response) => Arc::new(MockGenerator::with_fixed_response(response)),
            None => Arc::new(MockGenerator::stock()),
        },
    };
    Ok(generator)
}

/// Starter config written by `drillkit init`.
pub const STARTER_CONFIG: &str = r#"# drillkit configuration

default_provider = "gateway"
default_model = "google/gemini-2.5-flash"
results_dir = "./drillkit-results"

[providers.gateway]
type = "gateway"
api_key = "${DRILLKIT_GATEWAY_KEY}"

# [providers.anthropic]
# type = "anthropic"
# api_key = "${DRILLKIT_ANTHROPIC_KEY}"

# [providers.offline]
# type = "mock"

[variants.arithmetic]
per_session_secs = 60

[variants.challenge]
item_count = 10
per_item_secs = 30
"#;
