// LdapWatch - GPL-3.0-or-later
// This file is part of LdapWatch.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// LdapWatch is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LdapWatch is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LdapWatch.  If not, see <https://www.gnu.org/licenses/>.

use crate::solution::ollama::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration stored in the config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Where log lines are collected from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// File extension (without dot) of log files inside a directory
    pub extension: String,
    pub max_files: usize,
    /// Cap on the number of matching lines, unlimited when `None`
    pub max_matches: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            extension: "log".to_string(),
            max_files: 100,
            max_matches: None,
        }
    }
}

/// Settings of the optional solution enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub api_base: String,
    pub model: String,
    /// Timeout of one generate request
    pub timeout_secs: u64,
    /// Timeout of the availability probe
    pub probe_timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: 300,
            probe_timeout_ms: 500,
        }
    }
}

impl EnrichmentConfig {
    /// Apply `OLLAMA_API_BASE`, `OLLAMA_MODEL`, `OLLAMA_TIMEOUT` and
    /// `DISABLE_AI_ENHANCEMENT` as returned by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup("OLLAMA_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.api_base = base;
        }
        if let Some(model) = lookup("OLLAMA_MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        if let Some(timeout) = lookup("OLLAMA_TIMEOUT") {
            match timeout.trim().parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(e) => tracing::warn!("Ignoring OLLAMA_TIMEOUT={timeout:?}: {e}"),
            }
        }
        if lookup("DISABLE_AI_ENHANCEMENT").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")) {
            self.enabled = false;
        }
    }
}

impl AppConfig {
    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ldapwatch").join("config.json"))
    }

    /// Load config from the default location, returning defaults if absent or broken
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::info!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("No config found at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{e:#}, using defaults");
                Self::default()
            }
        }
    }

    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid config JSON.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        tracing::info!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Save config to `path`, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EnrichmentConfig {
            enabled: true,
            ..EnrichmentConfig::default()
        };
        config.apply_env(env(&[
            ("OLLAMA_API_BASE", "http://gpu-box:11434"),
            ("OLLAMA_MODEL", "deepseek-r1"),
            ("OLLAMA_TIMEOUT", "45"),
        ]));
        assert!(config.enabled);
        assert_eq!(config.api_base, "http://gpu-box:11434");
        assert_eq!(config.model, "deepseek-r1");
        assert_eq!(config.timeout_secs, 45);
    }

    #[test]
    fn test_disable_and_bad_values() {
        let mut config = EnrichmentConfig {
            enabled: true,
            ..EnrichmentConfig::default()
        };
        config.apply_env(env(&[
            ("OLLAMA_API_BASE", "   "),
            ("OLLAMA_TIMEOUT", "soon"),
            ("DISABLE_AI_ENHANCEMENT", "true"),
        ]));
        assert!(!config.enabled);
        assert_eq!(config.api_base, DEFAULT_OLLAMA_URL);
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"search": {"max_files": 5}}"#).unwrap();
        assert_eq!(config.search.max_files, 5);
        assert_eq!(config.search.extension, "log");
        assert_eq!(config.enrichment, EnrichmentConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.search.max_matches = Some(1000);
        config.enrichment.enabled = true;
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }
}
