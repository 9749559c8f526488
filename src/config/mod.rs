// LogSpan - GPL-3.0-or-later
// This file is part of LogSpan.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// LogSpan is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogSpan is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogSpan.  If not, see <https://www.gnu.org/licenses/>.

use crate::anomaly::span::SpanThresholds;
use crate::parser::patterns::{DEFAULT_MACHINE_PATTERN, DEFAULT_SERVICE_PATTERN};
use crate::parser::ConvertStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// User configuration stored in the config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Regex for service names inside message text
    pub service_pattern: String,
    /// Regex for machine identifiers following `@`
    pub machine_pattern: String,
    /// Extension of the log files to convert
    pub input_extension: String,
    pub strategy: ConvertStrategy,
    pub thresholds: SpanThresholds,
    /// Preferred order of services when inspecting one request
    pub service_flow: Vec<String>,
    /// How many problematic requests to print
    pub report_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_pattern: DEFAULT_SERVICE_PATTERN.to_string(),
            machine_pattern: DEFAULT_MACHINE_PATTERN.to_string(),
            input_extension: ".txt".to_string(),
            strategy: ConvertStrategy::default(),
            thresholds: SpanThresholds::default(),
            service_flow: Vec::new(),
            report_limit: 50,
        }
    }
}

impl Config {
    /// Get the path to the global config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("logspan").join("config.json"))
    }

    /// Load the global config, returning defaults if it is missing or unreadable
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            tracing::debug!("No global config found, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Load an explicitly named config file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Explicit path if given, otherwise the global config
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        explicit.map_or_else(|| Ok(Self::load()), Self::load_from)
    }
}
