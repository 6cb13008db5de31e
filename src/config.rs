//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/sectorank/sectorank.toml`
//! 3. Local config: `<dir>/.sectorank.toml`
//! 4. Environment variables: `SECTORANK_*` prefix

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{DEFAULT_BREADCRUMB_SEPARATOR, DEFAULT_SCORE_DECIMALS, DEFAULT_SHRINKAGE_K};

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified in this layer, inherit from below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub shrinkage_k: Option<f64>,
    pub score_decimals: Option<u32>,
    pub breadcrumb_separator: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub snapshot: Option<PathBuf>,
}

/// Unified configuration for sectorank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Prior weight of the population mean, in votes (default: 10)
    pub shrinkage_k: f64,
    /// Decimals kept on means and weighted scores (default: 2)
    pub score_decimals: u32,
    /// Separator between titles in breadcrumbs (default: " > ")
    pub breadcrumb_separator: String,
    /// Lifetime of cached hierarchy listings in seconds (default: 300)
    pub cache_ttl_secs: u64,
    /// Snapshot used when no `--snapshot` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shrinkage_k: DEFAULT_SHRINKAGE_K,
            score_decimals: DEFAULT_SCORE_DECIMALS,
            breadcrumb_separator: DEFAULT_BREADCRUMB_SEPARATOR.to_string(),
            cache_ttl_secs: 300,
            snapshot: None,
        }
    }
}

/// Get the XDG config directory for sectorank.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sectorank").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("sectorank.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".sectorank.toml")
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            self.snapshot = Some(PathBuf::from(expand_path(&snapshot.to_string_lossy())));
        }
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            shrinkage_k: overlay.shrinkage_k.unwrap_or(self.shrinkage_k),
            score_decimals: overlay.score_decimals.unwrap_or(self.score_decimals),
            breadcrumb_separator: overlay
                .breadcrumb_separator
                .clone()
                .unwrap_or_else(|| self.breadcrumb_separator.clone()),
            cache_ttl_secs: overlay.cache_ttl_secs.unwrap_or(self.cache_ttl_secs),
            snapshot: overlay.snapshot.clone().or_else(|| self.snapshot.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.sectorank.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply SECTORANK_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(Environment::with_prefix("SECTORANK").try_parsing(true))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<f64>("shrinkage_k") {
            settings.shrinkage_k = val;
        }
        if let Ok(val) = config.get::<u32>("score_decimals") {
            settings.score_decimals = val;
        }
        if let Ok(val) = config.get_string("breadcrumb_separator") {
            settings.breadcrumb_separator = val;
        }
        if let Ok(val) = config.get::<u64>("cache_ttl_secs") {
            settings.cache_ttl_secs = val;
        }
        if let Ok(val) = config.get_string("snapshot") {
            settings.snapshot = Some(PathBuf::from(val));
        }

        Ok(settings)
    }

    /// Reject values the scorer would refuse later anyway.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if !self.shrinkage_k.is_finite() || self.shrinkage_k < 0.0 {
            return Err(ApplicationError::Config {
                message: format!(
                    "shrinkage_k must be a non-negative number, got {}",
                    self.shrinkage_k
                ),
            });
        }
        if self.score_decimals > 10 {
            return Err(ApplicationError::Config {
                message: format!("score_decimals must be at most 10, got {}", self.score_decimals),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# sectorank configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/sectorank/sectorank.toml
#   Local:  <dir>/.sectorank.toml  (dir given with -C, default cwd)
#   Env:    SECTORANK_* environment variables

# Prior weight of the population mean, expressed in votes
# shrinkage_k = 10.0

# Decimals kept on means and weighted scores
# score_decimals = 2

# Separator between titles in the hierarchy breadcrumb
# breadcrumb_separator = " > "

# Lifetime of cached hierarchy listings, in seconds
# cache_ttl_secs = 300

# Snapshot file used when --snapshot is not given (~ and $VAR are expanded)
# snapshot = "~/data/dashboard.json"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_when_created_then_matches_scoring_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.shrinkage_k, 10.0);
        assert_eq!(settings.score_decimals, 2);
        assert_eq!(settings.breadcrumb_separator, " > ");
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
        assert!(settings.snapshot.is_none());
    }

    #[test]
    fn given_tilde_in_snapshot_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            snapshot: Some(PathBuf::from("~/dashboard.json")),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let snapshot = settings.snapshot.unwrap();
        assert!(
            snapshot.to_string_lossy().starts_with(&home),
            "snapshot should start with home dir: {}",
            snapshot.display()
        );
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let base = Settings::default();
        let overlay = RawSettings {
            shrinkage_k: Some(25.0),
            ..RawSettings::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.shrinkage_k, 25.0);
        assert_eq!(merged.score_decimals, base.score_decimals);
        assert_eq!(merged.breadcrumb_separator, base.breadcrumb_separator);
    }

    #[test]
    fn given_negative_k_when_validating_then_errors() {
        let settings = Settings {
            shrinkage_k: -1.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn given_template_when_parsing_then_yields_empty_raw_settings() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.shrinkage_k.is_none());
        assert!(raw.snapshot.is_none());
    }
}
