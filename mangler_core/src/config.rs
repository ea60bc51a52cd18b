use serde::Deserialize;
use std::path::PathBuf;

/// Tuning knobs for the havoc engine.
///
/// The defaults reproduce the historical behavior: up to `2^5 = 32` stacked
/// mutations per pass and a 128-attempt retry budget before a run is declared
/// stalled.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct HavocSettings {
    /// Exponent bound for the stacked-mutation count draw; the count is
    /// `round(2^x)` with `x` uniform in `[0, max-stack-power)`.
    #[serde(default = "default_max_stack_power")]
    pub max_stack_power: f64,
    /// Consecutive operator failures tolerated before a run fails.
    #[serde(default = "default_max_failed_mutations")]
    pub max_failed_mutations: u32,
}

fn default_max_stack_power() -> f64 {
    5.0
}

fn default_max_failed_mutations() -> u32 {
    128
}

impl Default for HavocSettings {
    fn default() -> Self {
        Self {
            max_stack_power: default_max_stack_power(),
            max_failed_mutations: default_max_failed_mutations(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct MutatorConfig {
    #[serde(default)]
    pub havoc: HavocSettings,
    /// Generator seed for reproducible runs; harnesses may override it.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl MutatorConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: MutatorConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        anyhow::ensure!(
            config.havoc.max_stack_power > 0.0,
            "max-stack-power must be positive, got {}",
            config.havoc.max_stack_power
        );
        anyhow::ensure!(
            config.havoc.max_failed_mutations > 0,
            "max-failed-mutations must be positive"
        );

        Ok(config)
    }
}
