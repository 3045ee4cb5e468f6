// SPDX-License-Identifier: Apache-2.0

use super::new_conn;
use crate::{
    apply_waivers, nm_connection_diff, MatchOptions, NmConnection,
    NmPropertyDiff, NmValue, NM_SETTING_WIRED_S390_NETTYPE,
    NM_SETTING_WIRED_S390_SUBCHANNELS, NM_SETTING_WIRED_SETTING_NAME,
};

const BOND_UUID: &str = "4b2a2f8e-9f76-4c3c-9f3a-6d0b3a1e2c11";

fn waive(
    orig: &NmConnection,
    cand: &NmConnection,
    opts: &MatchOptions,
    stored: &[NmConnection],
) -> (bool, NmPropertyDiff) {
    let (_, mut diff) = nm_connection_diff(orig, cand);
    let ret = apply_waivers(orig, cand, &mut diff, opts, &stored);
    (ret, diff)
}

fn no_stored() -> Vec<NmConnection> {
    Vec::new()
}

#[test]
fn test_ipv4_method_waived_only_without_carrier() {
    let orig = new_conn(
        r"---
        ipv4:
          method: disabled
        ",
    );
    let cand = new_conn(
        r"---
        ipv4:
          method: auto
          may-fail: true
        ",
    );

    let (ret, diff) = waive(
        &orig,
        &cand,
        &MatchOptions::new().device_has_carrier(true),
        &no_stored(),
    );
    assert!(!ret);
    assert!(diff.contains("ipv4", "method"));

    let (ret, diff) = waive(
        &orig,
        &cand,
        &MatchOptions::new().device_has_carrier(false),
        &no_stored(),
    );
    assert!(ret);
    assert!(diff.is_empty());
}

#[test]
fn test_ipv4_method_not_waived_when_may_fail_is_false() {
    let orig = new_conn(
        r"---
        ipv4:
          method: disabled
        ",
    );
    let cand = new_conn(
        r"---
        ipv4:
          method: auto
          may-fail: false
        ",
    );

    let (ret, _) = waive(
        &orig,
        &cand,
        &MatchOptions::new().device_has_carrier(false),
        &no_stored(),
    );
    assert!(!ret);
}

#[test]
fn test_ipv4_method_manual_never_waived() {
    let orig = new_conn(
        r"---
        ipv4:
          method: disabled
        ",
    );
    let cand = new_conn(
        r"---
        ipv4:
          method: manual
          addresses:
          - 192.0.2.2/24
        ",
    );

    let (ret, _) = waive(
        &orig,
        &cand,
        &MatchOptions::new().device_has_carrier(false),
        &no_stored(),
    );
    assert!(!ret);
}

#[test]
fn test_ipv6_link_local_to_auto_with_may_fail() {
    let orig = new_conn(
        r"---
        ipv6:
          method: link-local
        ",
    );
    let cand = new_conn(
        r"---
        ipv6:
          method: auto
          may-fail: true
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
    assert!(diff.is_empty());
}

#[test]
fn test_ipv6_link_local_to_auto_without_may_fail() {
    let orig = new_conn(
        r"---
        ipv6:
          method: link-local
        ",
    );
    let cand = new_conn(
        r"---
        ipv6:
          method: auto
          may-fail: false
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
    assert!(diff.contains("ipv6", "method"));
}

#[test]
fn test_ipv6_link_local_to_absent_setting() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ipv6:
          method: link-local
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
    assert!(diff.is_empty());
}

#[test]
fn test_ipv6_any_to_ignore() {
    for method in ["link-local", "disabled", "auto"] {
        let mut orig = new_conn(
            r"---
            ipv6:
              method: auto
            ",
        );
        orig.set_property("ipv6", "method", NmValue::Str(method.to_string()));
        let cand = new_conn(
            r"---
            ipv6:
              method: ignore
              may-fail: false
            ",
        );

        let (ret, _) =
            waive(&orig, &cand, &MatchOptions::new(), &no_stored());
        assert!(ret, "ipv6 method {method} should match ignore");
    }

    let orig = new_conn(
        r"---
        ipv6:
          method: manual
        ",
    );
    let cand = new_conn(
        r"---
        ipv6:
          method: ignore
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
}

#[test]
fn test_routes_waived_with_host_route() {
    let orig = new_conn(
        r"---
        ipv4:
          method: manual
          routes:
          - 10.0.0.0/24 10.0.0.1 100
          - 10.0.0.5/32 10.0.0.1
        ",
    );
    let cand = new_conn(
        r"---
        ipv4:
          method: manual
          routes:
          - 10.0.0.0/24 10.0.0.1 100
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
    assert!(diff.is_empty());

    let (ret, diff) =
        waive(&cand, &orig, &MatchOptions::new(), &no_stored());
    assert!(!ret);
    assert!(diff.contains("ipv4", "routes"));
}

#[test]
fn test_routes_waived_with_candidate_route_metric() {
    let orig = new_conn(
        r"---
        ipv6:
          method: manual
          routes:
          - 2001:db8:1::/64 2001:db8::1 300
        ",
    );
    let cand = new_conn(
        r"---
        ipv6:
          method: manual
          route-metric: 300
          routes:
          - 2001:db8:1::/64 2001:db8::1
        ",
    );

    let opts = MatchOptions::new().default_metrics(100, 1024);

    let (ret, _) = waive(&orig, &cand, &opts, &no_stored());
    assert!(ret);

    let mut cand_without_metric = cand.clone();
    cand_without_metric.set_property("ipv6", "route-metric", NmValue::Int(-1));
    let (ret, _) = waive(&orig, &cand_without_metric, &opts, &no_stored());
    assert!(!ret);
}

#[test]
fn test_interface_name_waived_when_unset() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);

    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth2
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
}

#[test]
fn test_mac_address_waived_when_unset() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        802-3-ethernet:
          mac-address: '00:11:22:33:44:55'
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);

    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        802-3-ethernet:
          mac-address: '00:11:22:33:44:66'
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
}

#[test]
fn test_infiniband_mac_address_waived_when_unset() {
    let orig = new_conn(
        r"---
        connection:
          type: infiniband
        infiniband:
          transport-mode: datagram
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: infiniband
        infiniband:
          transport-mode: datagram
          mac-address: '80:00:00:48:fe:80:00:00:00:00:00:00:f4:52:14:03:00:8d:50:c1'
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
}

#[test]
fn test_cloned_mac_address_special_value() {
    let orig = new_conn(
        r"---
        802-3-ethernet:
          mtu: 1500
        ",
    );
    let cand = new_conn(
        r"---
        802-3-ethernet:
          mtu: 1500
          cloned-mac-address: random
        ",
    );
    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
    assert!(diff.is_empty());

    let orig = new_conn(
        r"---
        802-3-ethernet:
          mtu: 1500
          cloned-mac-address: 'AA:BB:CC:DD:EE:FF'
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
}

#[test]
fn test_cloned_mac_address_unset_candidate() {
    let orig = new_conn(
        r"---
        802-3-ethernet:
          cloned-mac-address: 'AA:BB:CC:DD:EE:FF'
        ",
    );
    let cand = new_conn(
        r"---
        802-3-ethernet:
          mtu: 0
        ",
    );
    let (ret, _) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
}

fn controller_conns() -> (NmConnection, NmConnection) {
    let orig = new_conn(&format!(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
          controller: {BOND_UUID}
          port-type: bond
        "
    ));
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
          controller: bond0
          port-type: bond
        ",
    );
    (orig, cand)
}

fn bond_conn(iface_name: &str) -> NmConnection {
    new_conn(&format!(
        r"---
        connection:
          id: {iface_name}
          uuid: {BOND_UUID}
          type: bond
          interface-name: {iface_name}
        "
    ))
}

#[test]
fn test_controller_waived_when_uuid_resolved() {
    let (orig, cand) = controller_conns();

    let (ret, diff) = waive(
        &orig,
        &cand,
        &MatchOptions::new(),
        &vec![bond_conn("bond0")],
    );
    assert!(ret);
    assert!(diff.is_empty());
}

#[test]
fn test_controller_rejected_when_uuid_not_found() {
    let (orig, cand) = controller_conns();

    let (ret, diff) = waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
    assert!(diff.contains("connection", "controller"));
}

#[test]
fn test_controller_rejected_when_iface_name_differs() {
    let (orig, cand) = controller_conns();

    let (ret, _) = waive(
        &orig,
        &cand,
        &MatchOptions::new(),
        &vec![bond_conn("bond1")],
    );
    assert!(!ret);
}

#[test]
fn test_controller_rejected_when_not_uuid() {
    let (_, cand) = controller_conns();
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
          controller: bond1
          port-type: bond
        ",
    );

    let (ret, _) = waive(
        &orig,
        &cand,
        &MatchOptions::new(),
        &vec![bond_conn("bond0")],
    );
    assert!(!ret);
}

#[test]
fn test_controller_legacy_master_property() {
    let (orig, _) = controller_conns();
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
          master: bond0
          slave-type: bond
        ",
    );

    let (ret, diff) = waive(
        &orig,
        &cand,
        &MatchOptions::new(),
        &vec![bond_conn("bond0")],
    );
    assert!(ret);
    assert!(diff.is_empty());
}

#[test]
fn test_s390_props_rejected_with_non_default_candidate() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        802-3-ethernet:
          s390-nettype: qeth
          s390-subchannels:
          - 0.0.8000
          - 0.0.8001
          - 0.0.8002
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
    assert!(diff.contains(
        NM_SETTING_WIRED_SETTING_NAME,
        NM_SETTING_WIRED_S390_NETTYPE
    ));
}

#[test]
fn test_s390_props_waived_with_default_candidate() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        802-3-ethernet:
          mtu: 0
        ",
    );
    let mut diff = NmPropertyDiff::default();
    diff.insert(
        NM_SETTING_WIRED_SETTING_NAME,
        NM_SETTING_WIRED_S390_SUBCHANNELS,
        (None, Some(NmValue::StrList(Vec::new()))),
    );

    assert!(apply_waivers(
        &orig,
        &cand,
        &mut diff,
        &MatchOptions::new(),
        &no_stored()
    ));
    assert!(diff.is_empty());
}

#[test]
fn test_match_setting_always_dropped() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        match:
          interface-name:
          - eth*
          driver: e1000e
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(ret);
    assert!(diff.is_empty());
}

#[test]
fn test_unwaivable_difference_left() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        802-3-ethernet:
          mtu: 1500
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        802-3-ethernet:
          mtu: 9000
        ",
    );

    let (ret, diff) =
        waive(&orig, &cand, &MatchOptions::new(), &no_stored());
    assert!(!ret);
    assert_eq!(diff.to_string(), "802-3-ethernet.mtu");
}
