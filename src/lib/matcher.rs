// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::diff::nm_connection_diff;
use crate::waiver::{
    apply_waivers_with_ctx, NmSortedRoutesCache, NmWaiverContext,
};
use crate::{NmConnection, NmIpFamily, NM_IP_ROUTE_METRIC_DEFAULT};

/// Access to stored connection profiles.
pub trait SettingsLookup {
    fn lookup_connection_by_uuid(&self, uuid: &str) -> Option<NmConnection>;
}

impl SettingsLookup for Vec<NmConnection> {
    fn lookup_connection_by_uuid(&self, uuid: &str) -> Option<NmConnection> {
        self.as_slice().lookup_connection_by_uuid(uuid)
    }
}

impl SettingsLookup for &[NmConnection] {
    fn lookup_connection_by_uuid(&self, uuid: &str) -> Option<NmConnection> {
        self.iter().find(|c| c.uuid() == Some(uuid)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
#[non_exhaustive]
pub struct MatchOptions {
    /// Candidates were hinted beforehand, for example by the state file of
    /// a previous run, only connection type and port type are checked.
    pub indicated: bool,
    pub device_has_carrier: bool,
    /// Route metric used for IPv4 routes with no metric defined when the
    /// profile has no `route-metric` either.
    pub default_v4_metric: i64,
    /// Like `default_v4_metric`, for IPv6.
    pub default_v6_metric: i64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            indicated: false,
            device_has_carrier: true,
            default_v4_metric: NM_IP_ROUTE_METRIC_DEFAULT,
            default_v6_metric: NM_IP_ROUTE_METRIC_DEFAULT,
        }
    }
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indicated(mut self, indicated: bool) -> Self {
        self.indicated = indicated;
        self
    }

    pub fn device_has_carrier(mut self, has_carrier: bool) -> Self {
        self.device_has_carrier = has_carrier;
        self
    }

    pub fn default_metrics(mut self, v4_metric: i64, v6_metric: i64) -> Self {
        self.default_v4_metric = v4_metric;
        self.default_v6_metric = v6_metric;
        self
    }

    pub(crate) fn default_metric(&self, family: NmIpFamily) -> i64 {
        match family {
            NmIpFamily::V4 => self.default_v4_metric,
            NmIpFamily::V6 => self.default_v6_metric,
        }
    }
}

/// Find the stored profile which best describes the `original` profile
/// generated from current device state.
///
/// Candidates are checked in the supplied order. An exact match is returned
/// immediately, otherwise the first candidate whose differences could all
/// be waived is returned.
pub fn find_best_match<'a>(
    candidates: &'a [NmConnection],
    original: &NmConnection,
    opts: &MatchOptions,
    lookup: &dyn SettingsLookup,
    filter: Option<&dyn Fn(&NmConnection) -> bool>,
) -> Option<&'a NmConnection> {
    let orig_routes = NmSortedRoutesCache::new(original, opts);
    let ctx = NmWaiverContext {
        opts,
        lookup,
        orig_routes: &orig_routes,
    };
    let mut best_match: Option<&'a NmConnection> = None;

    for candidate in candidates {
        if let Some(filter) = filter {
            if !filter(candidate) {
                continue;
            }
        }

        if opts.indicated {
            if original.connection_type() == candidate.connection_type()
                && original.port_type() == candidate.port_type()
            {
                log::debug!("Indicated connection {candidate} matched");
                return Some(candidate);
            }
            continue;
        }

        let (is_equal, mut diff) = nm_connection_diff(original, candidate);
        if is_equal {
            log::debug!("Connection {candidate} is an exact match");
            return Some(candidate);
        }

        if best_match.is_none() {
            if apply_waivers_with_ctx(original, candidate, &mut diff, &ctx) {
                log::debug!(
                    "Connection {candidate} matched after waiving differences"
                );
                best_match = Some(candidate);
            } else {
                log::debug!(
                    "Connection {candidate} differs on {} properties: {diff}",
                    diff.len()
                );
            }
        }
    }
    best_match
}

/// Whether `candidate` is equal to `original` or only differs on waivable
/// properties.
pub fn is_possible_match(
    original: &NmConnection,
    candidate: &NmConnection,
    opts: &MatchOptions,
    lookup: &dyn SettingsLookup,
) -> bool {
    let (is_equal, mut diff) = nm_connection_diff(original, candidate);
    is_equal
        || crate::apply_waivers(original, candidate, &mut diff, opts, lookup)
}
