//! Configuration for resolution and input handling.
//!
//! Load order: `.gts/config.toml` → environment variables → defaults.

use crate::storage;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Largest candidate count for which exact hitting-set search is allowed.
pub const EXACT_CANDIDATES_LIMIT: usize = 24;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GtsConfig {
    pub resolve: ResolveConfig,
    pub input: InputConfig,
}

/// How hoist sets are chosen from the cycles found at a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HittingSetStrategy {
    /// Most frequent id first, ties by id.
    #[default]
    Greedy,
    /// Smallest set, searched by increasing size. Falls back to greedy
    /// above `exact_max_candidates`.
    Exact,
}

impl FromStr for HittingSetStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown hitting-set strategy: {other}")),
        }
    }
}

/// Tree resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Cap on fixpoint passes per directory level. Unset means the number of
    /// targets in the subtree plus one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_level_passes: Option<usize>,
    pub hitting_set: HittingSetStrategy,
    pub exact_max_candidates: usize,
}

/// Input filtering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Recipe ids that cannot be built. They and their dependents are skipped.
    pub unavailable: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_level_passes: None,
            hitting_set: HittingSetStrategy::Greedy,
            exact_max_candidates: 16,
        }
    }
}

/// Parse an env var, ignoring it when unset or malformed.
fn env_value<T: FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok()?.parse().ok()
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: FromStr>(var: &str, target: &mut T) {
    if let Some(n) = env_value(var) {
        *target = n;
    }
}

impl GtsConfig {
    /// Load config from `.gts/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = storage::config_file(project_root);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Some(n) = env_value("GTS_MAX_LEVEL_PASSES") {
            config.resolve.max_level_passes = Some(n);
        }
        env_override("GTS_HITTING_SET", &mut config.resolve.hitting_set);
        env_override(
            "GTS_EXACT_MAX_CANDIDATES",
            &mut config.resolve.exact_max_candidates,
        );

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolve.exact_max_candidates > EXACT_CANDIDATES_LIMIT {
            anyhow::bail!(
                "exact_max_candidates ({}) must be at most {}",
                self.resolve.exact_max_candidates,
                EXACT_CANDIDATES_LIMIT,
            );
        }
        if self.resolve.max_level_passes == Some(0) {
            anyhow::bail!("max_level_passes must be greater than zero");
        }
        Ok(())
    }
}
