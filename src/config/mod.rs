//! Scoring configuration
//!
//! Loaded from `registry-scoring.toml` in a working directory:
//!
//! ```toml
//! [scoring]
//! staleness_grace_ms = 2000  # dependencies this close to a score count as newer
//! jobs = 10                  # parallel computations in a batch
//! dry_run = false            # compute without uploading
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "registry-scoring.toml";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Settings shared by the score and score card engines
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScoringConfig {
    /// Staleness grace window in milliseconds
    #[serde(default = "default_staleness_grace_ms")]
    pub staleness_grace_ms: u64,

    /// Worker threads used by batch computations
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Compute results but never upload them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_staleness_grace_ms() -> u64 {
    2000
}

fn default_jobs() -> usize {
    10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            staleness_grace_ms: default_staleness_grace_ms(),
            jobs: default_jobs(),
            dry_run: false,
        }
    }
}

impl ScoringConfig {
    pub fn staleness_grace(&self) -> Duration {
        Duration::from_millis(self.staleness_grace_ms)
    }

    /// Pool size, never zero
    pub fn worker_count(&self) -> usize {
        self.jobs.max(1)
    }
}

/// Load `registry-scoring.toml` from `dir`, falling back to defaults
pub fn load_config(dir: &Path) -> ScoringConfig {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
        return ScoringConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            debug!("Loaded scoring config from {}", path.display());
            config.scoring
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            ScoringConfig::default()
        }
    }
}

fn load_toml_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path());
        assert_eq!(config, ScoringConfig::default());
        assert_eq!(config.staleness_grace(), Duration::from_secs(2));
        assert_eq!(config.jobs, 10);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[scoring]\njobs = 4\ndry_run = true\n",
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.jobs, 4);
        assert!(config.dry_run);
        assert_eq!(config.staleness_grace_ms, 2000);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[scoring\njobs = ").unwrap();
        assert_eq!(load_config(dir.path()), ScoringConfig::default());
    }

    #[test]
    fn test_worker_count_never_zero() {
        let config = ScoringConfig {
            jobs: 0,
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
