// SPDX-License-Identifier: Apache-2.0

use nm_match::NmMatchError;

pub(crate) const EXIT_FAILURE: i32 = 1;
pub(crate) const EX_DATAERR: i32 = 65;
pub(crate) const EX_CONFIG: i32 = 78;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CliError {
    pub(crate) code: i32,
    pub(crate) msg: String,
}

impl Default for CliError {
    fn default() -> Self {
        Self {
            code: EXIT_FAILURE,
            msg: String::new(),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CliError {}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self {
            code: EXIT_FAILURE,
            msg,
        }
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self::from(msg.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self {
            code: EXIT_FAILURE,
            msg: format!("std::io::Error: {e}"),
        }
    }
}

impl From<NmMatchError> for CliError {
    fn from(e: NmMatchError) -> Self {
        Self {
            code: EX_DATAERR,
            msg: format!("NmMatchError: {e}"),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        Self {
            code: EX_DATAERR,
            msg: format!("serde_yaml::Error: {e}"),
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        Self {
            code: EX_CONFIG,
            msg: format!("Invalid configuration: {e}"),
        }
    }
}
