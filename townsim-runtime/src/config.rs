//! Runtime configuration glue.
//!
//! The core crate owns the [`TownConfig`] schema; this module loads it,
//! applies command-line overrides and translates the `[llm]` section into
//! what the gateway crate understands.

use std::path::Path;

use anyhow::Context;
use townsim_core::TownConfig;
use townsim_core::config::LlmConfig;
use townsim_llm::{GatewayConfig, PromptSet};
use tracing::info;

/// Load a town configuration, or the defaults when `path` is `None`.
///
/// # Errors
///
/// Fails when the file cannot be read, parsed or validated.
pub fn load_town_config(path: Option<&Path>) -> anyhow::Result<TownConfig> {
    let config = match path {
        Some(p) => TownConfig::from_file(p)
            .with_context(|| format!("failed to load config from {}", p.display()))?,
        None => TownConfig::default(),
    };
    config.validate().context("invalid town configuration")?;
    Ok(config)
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Fixed RNG seed.
    pub seed: Option<u64>,
    /// Tick interval in milliseconds.
    pub tick_interval_ms: Option<u64>,
    /// Generation provider name.
    pub provider: Option<String>,
}

impl Overrides {
    /// Apply every override that is set.
    pub fn apply(&self, config: &mut TownConfig) {
        if let Some(seed) = self.seed {
            config.general.seed = Some(seed);
        }
        if let Some(ms) = self.tick_interval_ms {
            config.general.tick_interval_ms = ms;
        }
        if let Some(provider) = &self.provider {
            config.llm.provider.clone_from(provider);
        }
    }
}

/// Gateway settings for the `[llm]` section.
#[must_use]
pub fn gateway_config(llm: &LlmConfig) -> GatewayConfig {
    GatewayConfig {
        provider: llm.provider.clone(),
        base_url: llm.base_url.clone(),
        api_key: llm.api_key.clone(),
        model: llm.model.clone(),
        request_timeout_ms: llm.request_timeout_ms,
        max_retries: llm.max_retries,
        temperature: llm.temperature,
    }
}

/// Prompt templates: the built-ins, overridden by `llm.prompt_file` if set.
///
/// # Errors
///
/// Fails when the prompt file is set but unreadable or malformed.
pub fn load_prompts(llm: &LlmConfig) -> anyhow::Result<PromptSet> {
    match &llm.prompt_file {
        Some(file) => {
            let set = PromptSet::from_toml_file(file)
                .with_context(|| format!("failed to load prompts from {file}"))?;
            info!(file = %file, "prompt overrides loaded");
            Ok(set)
        }
        None => Ok(PromptSet::builtin()),
    }
}
