// SPDX-License-Identifier: Apache-2.0

mod config;
mod conn_match;
mod error;
mod state;

use nm_match::MatchOptions;

use crate::config::CliConfig;
use crate::conn_match::{
    device_match, diff_connections, match_connection, uuid_filter,
};
use crate::error::CliError;
use crate::state::{input_from_file, DeviceMatchInput, MatchInput};

const APP_NAME: &str = "nmmatchctl";

const SUB_CMD_MATCH: &str = "match";
const SUB_CMD_DIFF: &str = "diff";
const SUB_CMD_DEVICE_MATCH: &str = "device-match";

fn main() {
    let mut app = clap::Command::new(APP_NAME)
        .version(clap::crate_version!())
        .about("Find the stored connection profile matching device state")
        .arg_required_else_help(true)
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Set verbose level")
                .global(true),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .help("Disable logging")
                .global(true),
        )
        .arg(
            clap::Arg::new("CONFIG")
                .long("config")
                .short('c')
                .takes_value(true)
                .help(
                    "Configuration file, default is \
                    /etc/nm-match/nm-match.toml",
                )
                .global(true),
        )
        .subcommand(
            match_args(clap::Command::new(SUB_CMD_MATCH))
                .about(
                    "Find the best matching candidate for the generated \
                    connection",
                )
                .arg(
                    clap::Arg::new("UUID")
                        .long("uuid")
                        .takes_value(true)
                        .help("Only consider candidate with this UUID"),
                ),
        )
        .subcommand(
            match_args(clap::Command::new(SUB_CMD_DIFF)).about(
                "Show differences between the generated connection and \
                each candidate",
            ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_DEVICE_MATCH)
                .about("Check device against match specifications")
                .arg(
                    clap::Arg::new("FILE")
                        .required(true)
                        .index(1)
                        .help(
                            "YAML file holding `specs` and `device`, \
                            use `-` for stdin",
                        ),
                ),
        );
    let matches = app.get_matches_mut();

    let (log_module_filters, log_level) =
        match matches.occurrences_of("verbose") {
            0 => (vec!["nm_match", "nmmatchctl"], log::LevelFilter::Warn),
            1 => (vec!["nm_match", "nmmatchctl"], log::LevelFilter::Info),
            2 => (vec!["nm_match", "nmmatchctl"], log::LevelFilter::Debug),
            _ => (vec![""], log::LevelFilter::Trace),
        };

    if !matches.is_present("quiet") {
        let mut log_builder = env_logger::Builder::new();
        for log_module_filter in log_module_filters {
            if !log_module_filter.is_empty() {
                log_builder.filter(Some(log_module_filter), log_level);
            } else {
                log_builder.filter(None, log_level);
            }
        }
        log_builder.init();
    }

    let config = match CliConfig::load(matches.value_of("CONFIG")) {
        Ok(c) => c,
        Err(e) => {
            print_result_and_exit(Err(e));
            return;
        }
    };

    let result = if let Some(matches) = matches.subcommand_matches(SUB_CMD_MATCH)
    {
        load_match_input(matches, &config).and_then(|(input, opts)| {
            match matches.value_of("UUID") {
                Some(uuid) => {
                    let filter = uuid_filter(uuid);
                    match_connection(&input, &opts, Some(&filter))
                }
                None => match_connection(&input, &opts, None),
            }
        })
    } else if let Some(matches) = matches.subcommand_matches(SUB_CMD_DIFF) {
        load_match_input(matches, &config)
            .and_then(|(input, opts)| diff_connections(&input, &opts))
    } else if let Some(matches) =
        matches.subcommand_matches(SUB_CMD_DEVICE_MATCH)
    {
        input_from_file::<DeviceMatchInput>(
            matches.value_of("FILE").unwrap_or("-"),
            "device match input",
        )
        .map(|input| device_match(&input))
    } else {
        app.print_help().ok();
        Ok(String::new())
    };

    print_result_and_exit(result);
}

fn match_args(cmd: clap::Command<'static>) -> clap::Command<'static> {
    cmd.arg(
        clap::Arg::new("FILE")
            .required(true)
            .index(1)
            .help(
                "YAML file holding `original`, `candidates` and optional \
                `stored` and `options`, use `-` for stdin",
            ),
    )
    .arg(
        clap::Arg::new("INDICATED")
            .long("indicated")
            .help("Only check connection type and port type"),
    )
    .arg(
        clap::Arg::new("NO_CARRIER")
            .long("no-carrier")
            .help("Device has no carrier"),
    )
    .arg(
        clap::Arg::new("IPV4_METRIC")
            .long("ipv4-metric")
            .takes_value(true)
            .allow_hyphen_values(true)
            .help("Default metric of IPv4 routes"),
    )
    .arg(
        clap::Arg::new("IPV6_METRIC")
            .long("ipv6-metric")
            .takes_value(true)
            .allow_hyphen_values(true)
            .help("Default metric of IPv6 routes"),
    )
}

// Options priority: command line, input file, configuration file.
fn load_match_input(
    matches: &clap::ArgMatches,
    config: &CliConfig,
) -> Result<(MatchInput, MatchOptions), CliError> {
    let input: MatchInput = input_from_file(
        matches.value_of("FILE").unwrap_or("-"),
        "match input",
    )?;
    let mut opts = input.options;
    config.apply(&mut opts);

    if matches.is_present("INDICATED") {
        opts = opts.indicated(true);
    }
    if matches.is_present("NO_CARRIER") {
        opts = opts.device_has_carrier(false);
    }
    if let Some(metric) = parse_metric(matches.value_of("IPV4_METRIC"))? {
        opts.default_v4_metric = metric;
    }
    if let Some(metric) = parse_metric(matches.value_of("IPV6_METRIC"))? {
        opts.default_v6_metric = metric;
    }
    log::debug!(
        "Matching {} against {} candidates with {opts:?}",
        input.original,
        input.candidates.len()
    );
    Ok((input, opts))
}

fn parse_metric(value: Option<&str>) -> Result<Option<i64>, CliError> {
    value
        .map(|v| {
            v.parse::<i64>().map_err(|e| {
                CliError::from(format!("Invalid route metric {v}: {e}"))
            })
        })
        .transpose()
}

fn print_result_and_exit(result: Result<String, CliError>) {
    match result {
        Ok(s) => {
            if !s.is_empty() {
                println!("{}", s.trim_end());
            }
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.code);
        }
    }
}
