// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Replay configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ifc_stream_loader::{LoaderConfig, TypeDefaults};

/// Replay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Loader settings (`IFC_STREAM_*` queue, drain and timeout variables).
    pub loader: LoaderConfig,
    /// Topic to replay; the first data frame's topic when unset.
    pub topic_id: Option<u64>,
    /// JSON file with a per-type defaults table; the standard palette when unset.
    pub defaults_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            loader: LoaderConfig::from_env(),
            topic_id: std::env::var("IFC_STREAM_TOPIC")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            defaults_path: std::env::var_os("IFC_STREAM_DEFAULTS").map(PathBuf::from),
        }
    }

    /// Read the defaults table
    pub fn type_defaults(&self) -> Result<TypeDefaults> {
        let Some(path) = &self.defaults_path else {
            return Ok(TypeDefaults::standard());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading defaults table {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing defaults table {}", path.display()))
    }
}
