// SPDX-License-Identifier: Apache-2.0

// Differences between a profile generated from kernel state and a stored
// profile which are known to be caused by expected system behavior rather
// than by a configuration mismatch.
//
// Every rule looks at its own diff entries only:
//  * entry absent: nothing to waive, pass.
//  * entry present and the equivalence holds: remove the entry, pass.
//  * otherwise: fail, the candidate must be rejected.

use once_cell::unsync::OnceCell;

use crate::route::{canonicalize_routes, sorted_routes_equivalent};
use crate::{
    MatchOptions, NmConnection, NmIpFamily, NmIpRoute, NmPropertyDiff,
    SettingsLookup, NM_IP_ROUTE_METRIC_DEFAULT,
    NM_SETTING_CONNECTION_CONTROLLER, NM_SETTING_CONNECTION_INTERFACE_NAME,
    NM_SETTING_CONNECTION_MASTER, NM_SETTING_CONNECTION_SETTING_NAME,
    NM_SETTING_INFINIBAND_MAC_ADDRESS, NM_SETTING_INFINIBAND_SETTING_NAME,
    NM_SETTING_IP4_CONFIG_METHOD_AUTO, NM_SETTING_IP4_CONFIG_METHOD_DISABLED,
    NM_SETTING_IP6_CONFIG_METHOD_AUTO, NM_SETTING_IP6_CONFIG_METHOD_DISABLED,
    NM_SETTING_IP6_CONFIG_METHOD_IGNORE,
    NM_SETTING_IP6_CONFIG_METHOD_LINK_LOCAL, NM_SETTING_IP_CONFIG_METHOD,
    NM_SETTING_IP_CONFIG_ROUTES, NM_SETTING_MATCH_SETTING_NAME,
    NM_SETTING_WIRED_CLONED_MAC_ADDRESS, NM_SETTING_WIRED_MAC_ADDRESS,
    NM_SETTING_WIRED_S390_NETTYPE, NM_SETTING_WIRED_S390_OPTIONS,
    NM_SETTING_WIRED_S390_SUBCHANNELS, NM_SETTING_WIRED_SETTING_NAME,
};

// Symbolic cloned MAC address values, not a literal address.
const NM_CLONED_MAC_SPECIAL_VALUES: [&str; 5] =
    ["preserve", "permanent", "random", "stable", "stable-ssid"];

const S390_PROPERTIES: [&str; 3] = [
    NM_SETTING_WIRED_S390_SUBCHANNELS,
    NM_SETTING_WIRED_S390_NETTYPE,
    NM_SETTING_WIRED_S390_OPTIONS,
];

const CONTROLLER_PROPERTIES: [&str; 2] =
    [NM_SETTING_CONNECTION_CONTROLLER, NM_SETTING_CONNECTION_MASTER];

type NmWaiverRule = fn(
    &NmConnection,
    &NmConnection,
    &mut NmPropertyDiff,
    &NmWaiverContext<'_>,
) -> bool;

const NM_WAIVER_RULES: [(&str, NmWaiverRule); 11] = [
    ("ipv6 method", check_ip6_method),
    ("ipv4 method", check_ip4_method),
    ("ipv4 routes", check_ip4_routes),
    ("ipv6 routes", check_ip6_routes),
    ("interface name", check_interface_name),
    ("wired MAC address", check_wired_mac_address),
    ("infiniband MAC address", check_infiniband_mac_address),
    ("cloned MAC address", check_cloned_mac_address),
    ("controller", check_controller),
    ("s390 properties", check_s390_props),
    ("match setting", drop_match_setting),
];

/// Sorted routes of the original profile, computed at most once per family
/// no matter how many candidates it is compared with.
pub(crate) struct NmSortedRoutesCache<'a> {
    original: &'a NmConnection,
    opts: &'a MatchOptions,
    ipv4: OnceCell<Option<Vec<NmIpRoute>>>,
    ipv6: OnceCell<Option<Vec<NmIpRoute>>>,
}

impl<'a> NmSortedRoutesCache<'a> {
    pub(crate) fn new(
        original: &'a NmConnection,
        opts: &'a MatchOptions,
    ) -> Self {
        Self {
            original,
            opts,
            ipv4: OnceCell::new(),
            ipv6: OnceCell::new(),
        }
    }

    fn get(&self, family: NmIpFamily) -> Option<&[NmIpRoute]> {
        let cell = match family {
            NmIpFamily::V4 => &self.ipv4,
            NmIpFamily::V6 => &self.ipv6,
        };
        cell.get_or_init(|| {
            canonicalize_routes(
                self.original.ip_routes(family),
                self.opts.default_metric(family),
            )
        })
        .as_deref()
    }
}

pub(crate) struct NmWaiverContext<'a> {
    pub(crate) opts: &'a MatchOptions,
    pub(crate) lookup: &'a dyn SettingsLookup,
    pub(crate) orig_routes: &'a NmSortedRoutesCache<'a>,
}

/// Remove every waivable difference from `diff`.
///
/// Return true when all rules passed and nothing is left in `diff`, which
/// means the candidate is equivalent to the original.
pub fn apply_waivers(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    opts: &MatchOptions,
    lookup: &dyn SettingsLookup,
) -> bool {
    let orig_routes = NmSortedRoutesCache::new(original, opts);
    let ctx = NmWaiverContext {
        opts,
        lookup,
        orig_routes: &orig_routes,
    };
    apply_waivers_with_ctx(original, candidate, diff, &ctx)
}

pub(crate) fn apply_waivers_with_ctx(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    ctx: &NmWaiverContext<'_>,
) -> bool {
    for (name, rule) in NM_WAIVER_RULES.iter() {
        if !rule(original, candidate, diff, ctx) {
            log::debug!(
                "Connection {candidate} rejected by {name} difference"
            );
            return false;
        }
    }
    diff.is_empty()
}

fn check_ip6_method(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    let setting_name = NmIpFamily::V6.setting_name();
    if !diff.contains(setting_name, NM_SETTING_IP_CONFIG_METHOD) {
        return true;
    }
    let orig_method = original.ip_method(NmIpFamily::V6);
    let cand_method = candidate.ip_method(NmIpFamily::V6);
    // Absent setting counts as may-fail.
    let cand_may_fail =
        candidate.ip_may_fail(NmIpFamily::V6).unwrap_or(true);

    // Kernel keeps IPv6 link-local address when auto configuration has not
    // finished yet, or failed.
    let allow = (orig_method == NM_SETTING_IP6_CONFIG_METHOD_LINK_LOCAL
        && cand_method == NM_SETTING_IP6_CONFIG_METHOD_AUTO
        && cand_may_fail)
        || ([
            NM_SETTING_IP6_CONFIG_METHOD_LINK_LOCAL,
            NM_SETTING_IP6_CONFIG_METHOD_DISABLED,
            NM_SETTING_IP6_CONFIG_METHOD_AUTO,
        ]
        .contains(&orig_method)
            && cand_method == NM_SETTING_IP6_CONFIG_METHOD_IGNORE);

    if allow {
        diff.remove(setting_name, NM_SETTING_IP_CONFIG_METHOD);
    }
    allow
}

fn check_ip4_method(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    ctx: &NmWaiverContext<'_>,
) -> bool {
    let setting_name = NmIpFamily::V4.setting_name();
    if !diff.contains(setting_name, NM_SETTING_IP_CONFIG_METHOD) {
        return true;
    }
    let cand_may_fail =
        candidate.ip_may_fail(NmIpFamily::V4).unwrap_or(true);

    // Without carrier no address could be assigned, auto configuration
    // did not fail.
    let allow = original.ip_method(NmIpFamily::V4)
        == NM_SETTING_IP4_CONFIG_METHOD_DISABLED
        && candidate.ip_method(NmIpFamily::V4)
            == NM_SETTING_IP4_CONFIG_METHOD_AUTO
        && cand_may_fail
        && !ctx.opts.device_has_carrier;

    if allow {
        diff.remove(setting_name, NM_SETTING_IP_CONFIG_METHOD);
    }
    allow
}

fn check_ip4_routes(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    ctx: &NmWaiverContext<'_>,
) -> bool {
    check_ip_routes(NmIpFamily::V4, original, candidate, diff, ctx)
}

fn check_ip6_routes(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    ctx: &NmWaiverContext<'_>,
) -> bool {
    check_ip_routes(NmIpFamily::V6, original, candidate, diff, ctx)
}

fn check_ip_routes(
    family: NmIpFamily,
    _original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    ctx: &NmWaiverContext<'_>,
) -> bool {
    let setting_name = family.setting_name();
    if !diff.contains(setting_name, NM_SETTING_IP_CONFIG_ROUTES) {
        return true;
    }

    let cand_default_metric = match candidate.route_metric(family) {
        NM_IP_ROUTE_METRIC_DEFAULT => ctx.opts.default_metric(family),
        m => m,
    };
    let cand_routes =
        canonicalize_routes(candidate.ip_routes(family), cand_default_metric);

    let allow = match (ctx.orig_routes.get(family), cand_routes.as_deref()) {
        (Some(orig_routes), Some(cand_routes)) => sorted_routes_equivalent(
            orig_routes,
            cand_routes,
            family.host_prefix_len(),
        ),
        _ => false,
    };
    if allow {
        diff.remove(setting_name, NM_SETTING_IP_CONFIG_ROUTES);
    }
    allow
}

fn check_interface_name(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    waive_if_either_unset(
        diff,
        NM_SETTING_CONNECTION_SETTING_NAME,
        NM_SETTING_CONNECTION_INTERFACE_NAME,
        original.iface_name(),
        candidate.iface_name(),
    )
}

fn check_wired_mac_address(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    waive_if_either_unset(
        diff,
        NM_SETTING_WIRED_SETTING_NAME,
        NM_SETTING_WIRED_MAC_ADDRESS,
        original.wired_mac_address(),
        candidate.wired_mac_address(),
    )
}

fn check_infiniband_mac_address(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    waive_if_either_unset(
        diff,
        NM_SETTING_INFINIBAND_SETTING_NAME,
        NM_SETTING_INFINIBAND_MAC_ADDRESS,
        original.infiniband_mac_address(),
        candidate.infiniband_mac_address(),
    )
}

fn waive_if_either_unset(
    diff: &mut NmPropertyDiff,
    setting_name: &str,
    prop_name: &str,
    orig_value: Option<&str>,
    cand_value: Option<&str>,
) -> bool {
    if !diff.contains(setting_name, prop_name) {
        return true;
    }
    if orig_value.is_none() || cand_value.is_none() {
        diff.remove(setting_name, prop_name);
        true
    } else {
        false
    }
}

fn is_cloned_mac_special(mac: &str) -> bool {
    NM_CLONED_MAC_SPECIAL_VALUES.contains(&mac)
}

// A symbolic value on the original side carries no address, so it is
// treated as unset. On the candidate side it still promises a MAC
// different from any concrete one observed, so it only matches an unset
// original.
fn check_cloned_mac_address(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    if !diff.contains(
        NM_SETTING_WIRED_SETTING_NAME,
        NM_SETTING_WIRED_CLONED_MAC_ADDRESS,
    ) {
        return true;
    }
    let orig_mac = original
        .wired_cloned_mac_address()
        .filter(|m| !is_cloned_mac_special(m));
    let cand_mac = candidate.wired_cloned_mac_address();

    if orig_mac.is_none() || cand_mac.is_none() {
        diff.remove(
            NM_SETTING_WIRED_SETTING_NAME,
            NM_SETTING_WIRED_CLONED_MAC_ADDRESS,
        );
        true
    } else {
        false
    }
}

fn check_controller(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    ctx: &NmWaiverContext<'_>,
) -> bool {
    if !CONTROLLER_PROPERTIES
        .iter()
        .any(|p| diff.contains(NM_SETTING_CONNECTION_SETTING_NAME, p))
    {
        return true;
    }
    let (orig_ctrl, cand_ctrl) =
        match (original.controller(), candidate.controller()) {
            (Some(o), Some(c)) => (o, c),
            _ => return false,
        };

    // Same controller stored in `controller` on one side and in legacy
    // `master` on the other.
    let allow = orig_ctrl == cand_ctrl || {
        if uuid::Uuid::parse_str(orig_ctrl).is_err() {
            log::debug!("Controller {orig_ctrl} is not a UUID");
            false
        } else {
            match ctx.lookup.lookup_connection_by_uuid(orig_ctrl) {
                Some(ctrl_conn) => ctrl_conn.iface_name() == Some(cand_ctrl),
                None => {
                    log::debug!(
                        "Controller connection {orig_ctrl} not found"
                    );
                    false
                }
            }
        }
    };
    if allow {
        for prop_name in CONTROLLER_PROPERTIES {
            diff.remove(NM_SETTING_CONNECTION_SETTING_NAME, prop_name);
        }
    }
    allow
}

fn check_s390_props(
    original: &NmConnection,
    candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    if !S390_PROPERTIES
        .iter()
        .any(|p| diff.contains(NM_SETTING_WIRED_SETTING_NAME, p))
    {
        return true;
    }
    let allow = !original.has_setting(NM_SETTING_WIRED_SETTING_NAME)
        && candidate.has_setting(NM_SETTING_WIRED_SETTING_NAME)
        && candidate.s390_subchannels().is_empty()
        && candidate.s390_nettype().is_none()
        && candidate.s390_options_count() == 0;
    if allow {
        for prop_name in S390_PROPERTIES {
            diff.remove(NM_SETTING_WIRED_SETTING_NAME, prop_name);
        }
    }
    allow
}

// Match setting is a hint for selecting devices, not a state property.
fn drop_match_setting(
    _original: &NmConnection,
    _candidate: &NmConnection,
    diff: &mut NmPropertyDiff,
    _ctx: &NmWaiverContext<'_>,
) -> bool {
    diff.remove_setting(NM_SETTING_MATCH_SETTING_NAME);
    true
}
