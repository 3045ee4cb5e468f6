// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use nm_match::{MatchOptions, MatchSpecDeviceData, NmConnection};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CliError;

/// Input of the `match` and `diff` commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct MatchInput {
    /// Profile generated from current device state.
    pub(crate) original: NmConnection,
    #[serde(default)]
    pub(crate) candidates: Vec<NmConnection>,
    /// Stored profiles which are not candidates but might be referred
    /// by candidates, like the controller profile of a port.
    #[serde(default)]
    pub(crate) stored: Vec<NmConnection>,
    #[serde(default)]
    pub(crate) options: MatchOptions,
}

impl MatchInput {
    /// All stored profiles usable for UUID lookup.
    pub(crate) fn all_stored(&self) -> Vec<NmConnection> {
        self.candidates
            .iter()
            .chain(self.stored.iter())
            .cloned()
            .collect()
    }
}

/// Input of the `device-match` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct DeviceMatchInput {
    #[serde(default)]
    pub(crate) specs: Vec<String>,
    pub(crate) device: MatchSpecDeviceData,
}

pub(crate) fn input_from_file<T>(
    file_path: &str,
    input_name: &str,
) -> Result<T, CliError>
where
    T: DeserializeOwned,
{
    if file_path == "-" {
        input_from_fd(&mut std::io::stdin(), input_name)
    } else {
        input_from_fd(&mut std::fs::File::open(file_path)?, input_name)
    }
}

pub(crate) fn input_from_fd<T, R>(
    fd: &mut R,
    input_name: &str,
) -> Result<T, CliError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut content = String::new();
    // Replace non-breaking space '\u{A0}'  to normal space
    fd.read_to_string(&mut content)?;
    let content = content.replace('\u{A0}', " ");

    match serde_yaml::from_str(&content) {
        Ok(s) => Ok(s),
        Err(e) => Err(CliError {
            code: crate::error::EX_DATAERR,
            msg: format!("Provided file is not valid {input_name}: {e}"),
        }),
    }
}
