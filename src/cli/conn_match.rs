// SPDX-License-Identifier: Apache-2.0

use nm_match::{
    apply_waivers, device_matches, find_best_match, nm_connection_diff,
    MatchOptions, NmConnection,
};
use serde::Serialize;

use crate::error::{CliError, EXIT_FAILURE};
use crate::state::{DeviceMatchInput, MatchInput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CandidateDiffReport {
    pub(crate) connection: String,
    pub(crate) exact: bool,
    pub(crate) differences: Vec<String>,
    pub(crate) waived: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) unwaived: Vec<String>,
}

pub(crate) fn match_connection(
    input: &MatchInput,
    opts: &MatchOptions,
    filter: Option<&dyn Fn(&NmConnection) -> bool>,
) -> Result<String, CliError> {
    let stored = input.all_stored();
    match find_best_match(
        &input.candidates,
        &input.original,
        opts,
        &stored,
        filter,
    ) {
        Some(conn) => {
            log::info!("Connection {} matched {conn}", input.original);
            Ok(conn.to_string())
        }
        None => Err(CliError {
            code: EXIT_FAILURE,
            msg: format!(
                "No connection matches the generated connection {}",
                input.original
            ),
        }),
    }
}

pub(crate) fn diff_connections(
    input: &MatchInput,
    opts: &MatchOptions,
) -> Result<String, CliError> {
    let stored = input.all_stored();
    let mut reports = Vec::new();
    for candidate in input.candidates.iter() {
        let (exact, mut diff) = nm_connection_diff(&input.original, candidate);
        let differences: Vec<String> =
            diff.iter().map(|(s, p, _)| format!("{s}.{p}")).collect();
        let waived = exact
            || apply_waivers(
                &input.original,
                candidate,
                &mut diff,
                opts,
                &stored,
            );
        reports.push(CandidateDiffReport {
            connection: candidate.to_string(),
            exact,
            differences,
            waived,
            unwaived: diff.iter().map(|(s, p, _)| format!("{s}.{p}")).collect(),
        });
    }
    Ok(serde_yaml::to_string(&reports)?)
}

pub(crate) fn device_match(input: &DeviceMatchInput) -> String {
    device_matches(&input.specs, &input.device).to_string()
}

pub(crate) fn uuid_filter(uuid: &str) -> impl Fn(&NmConnection) -> bool + '_ {
    move |c: &NmConnection| c.uuid() == Some(uuid)
}
