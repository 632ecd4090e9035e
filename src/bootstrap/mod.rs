// Copyright (c) 2021 Andrew Gazelka - All Rights Reserved.
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Everything needed before the first tick: options, settings and logging.

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{
    client::{
        follow::ExecutorConfig, pathfind::context::PathConfig, tasks::navigate::BehaviorConfig,
    },
    error::{ConfigError, Res},
};

pub mod opts;

/// Every tunable in one place
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub path: PathConfig,
    pub executor: ExecutorConfig,
    pub behavior: BehaviorConfig,
}

impl Settings {
    pub fn from_json(json: &str) -> Res<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// The defaults if there is no file
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let json = fs::read_to_string(path)
            .map_err(ConfigError::from)
            .with_context(|| format!("reading settings from {}", path.display()))?;

        Self::from_json(&json).with_context(|| format!("loading settings from {}", path.display()))
    }

    fn validate(&self) -> Res {
        let path = &self.path;

        if path.coefficients.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one coefficient is needed".to_string(),
            ));
        }

        if path.coefficients.iter().any(|&c| c <= 0.0) {
            return Err(ConfigError::Invalid(
                "coefficients must be positive".to_string(),
            ));
        }

        if !path.time_check_interval.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "time_check_interval must be a power of two, not {}",
                path.time_check_interval
            )));
        }

        let executor = &self.executor;
        if executor.max_dist_from_path > executor.max_max_dist_from_path {
            return Err(ConfigError::Invalid(
                "max_dist_from_path must not exceed max_max_dist_from_path".to_string(),
            ));
        }

        let factor = self.behavior.path_cutoff_factor;
        if !(0.0..=1.0).contains(&factor) {
            return Err(ConfigError::Invalid(format!(
                "path_cutoff_factor must be in 0..=1, not {factor}"
            )));
        }

        Ok(())
    }
}

/// Log to stderr. `RUST_LOG` overrides the default of `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // a subscriber is already set in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}
