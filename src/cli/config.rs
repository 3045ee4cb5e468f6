// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use nm_match::{MatchOptions, NM_IP_ROUTE_METRIC_DEFAULT};
use serde::Deserialize;

use crate::error::CliError;

pub(crate) const DEFAULT_CONFIG_PATH: &str = "/etc/nm-match/nm-match.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CliConfig {
    #[serde(default)]
    pub(crate) main: CliMainConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct CliMainConfig {
    pub(crate) ipv4_route_metric: Option<i64>,
    pub(crate) ipv6_route_metric: Option<i64>,
}

impl CliConfig {
    /// Missing file is only allowed for the default path.
    pub(crate) fn load(path: Option<&str>) -> Result<Self, CliError> {
        let (path, is_default) = match path {
            Some(p) => (p, false),
            None => (DEFAULT_CONFIG_PATH, true),
        };
        if is_default && !Path::new(path).exists() {
            log::debug!("Configuration file {path} not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::from(format!(
                "Failed to read configuration file {path}: {e}"
            ))
        })?;
        Self::parse(&content)
    }

    pub(crate) fn parse(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill the default route metrics not defined in `opts`.
    pub(crate) fn apply(&self, opts: &mut MatchOptions) {
        if opts.default_v4_metric == NM_IP_ROUTE_METRIC_DEFAULT {
            if let Some(metric) = self.main.ipv4_route_metric {
                opts.default_v4_metric = metric;
            }
        }
        if opts.default_v6_metric == NM_IP_ROUTE_METRIC_DEFAULT {
            if let Some(metric) = self.main.ipv6_route_metric {
                opts.default_v6_metric = metric;
            }
        }
    }
}
