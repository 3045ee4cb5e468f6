// SPDX-License-Identifier: Apache-2.0

use super::new_conn;
use crate::{
    nm_connection_diff, NmValue, NM_SETTING_IP4_CONFIG_SETTING_NAME,
    NM_SETTING_IP_CONFIG_METHOD, NM_SETTING_WIRED_SETTING_NAME,
};

#[test]
fn test_diff_equal_profiles() {
    let conn = new_conn(
        r"---
        connection:
          id: eth1
          uuid: 8e6bbd4c-5f0f-4d1c-9a2e-0c1fa0b8c6a1
          type: 802-3-ethernet
          interface-name: eth1
        ipv4:
          method: manual
          addresses:
          - 192.0.2.2/24
        ",
    );

    let (is_equal, diff) = nm_connection_diff(&conn, &conn.clone());

    assert!(is_equal);
    assert!(diff.is_empty());
}

#[test]
fn test_diff_ignore_non_inferrable_properties() {
    let conn1 = new_conn(
        r"---
        connection:
          id: eth1
          uuid: 8e6bbd4c-5f0f-4d1c-9a2e-0c1fa0b8c6a1
          type: 802-3-ethernet
          autoconnect: false
        ipv4:
          method: auto
          may-fail: false
          route-metric: 50
        ",
    );
    let conn2 = new_conn(
        r"---
        connection:
          id: Wired connection 1
          uuid: 0a7f2b1e-2b0c-43f8-a1a5-4a4c4f2d1d33
          type: 802-3-ethernet
        ipv4:
          method: auto
        ",
    );

    let (is_equal, diff) = nm_connection_diff(&conn1, &conn2);

    assert!(is_equal);
    assert!(diff.is_empty());
}

#[test]
fn test_diff_report_inferrable_properties() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ipv4:
          method: disabled
        ipv6:
          method: link-local
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ipv4:
          method: auto
        ipv6:
          method: auto
        ",
    );

    let (is_equal, diff) = nm_connection_diff(&orig, &cand);

    assert!(!is_equal);
    assert_eq!(diff.len(), 2);
    assert_eq!(diff.to_string(), "ipv4.method, ipv6.method");
    assert_eq!(
        diff.get(NM_SETTING_IP4_CONFIG_SETTING_NAME, NM_SETTING_IP_CONFIG_METHOD),
        Some(&(
            Some(NmValue::Str("disabled".to_string())),
            Some(NmValue::Str("auto".to_string()))
        ))
    );
}

#[test]
fn test_diff_absent_setting_equal_to_default_setting() {
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
          s390-subchannels: []
        ",
    );

    let (is_equal, _) = nm_connection_diff(&orig, &cand);

    assert!(is_equal);
    assert!(!orig.has_setting(NM_SETTING_WIRED_SETTING_NAME));
    assert!(cand.has_setting(NM_SETTING_WIRED_SETTING_NAME));
}

#[test]
fn test_diff_absent_setting_against_non_default() {
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
          mtu: 9000
        ",
    );

    let (is_equal, diff) = nm_connection_diff(&orig, &cand);

    assert!(!is_equal);
    assert_eq!(
        diff.get(NM_SETTING_WIRED_SETTING_NAME, "mtu"),
        Some(&(Some(NmValue::Int(0)), Some(NmValue::Int(9000))))
    );
}

#[test]
fn test_diff_empty_string_is_unset() {
    let conn1 = new_conn(
        r#"---
        connection:
          type: 802-3-ethernet
          interface-name: ""
        "#,
    );
    let conn2 = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );

    assert!(conn1.iface_name().is_none());
    assert!(nm_connection_diff(&conn1, &conn2).0);
}

#[test]
fn test_diff_remove_drop_empty_setting() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
        ipv4:
          method: disabled
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth2
        ipv4:
          method: auto
        ",
    );

    let (_, mut diff) = nm_connection_diff(&orig, &cand);

    assert!(diff.contains_setting(NM_SETTING_IP4_CONFIG_SETTING_NAME));
    assert!(
        diff.remove(NM_SETTING_IP4_CONFIG_SETTING_NAME, NM_SETTING_IP_CONFIG_METHOD)
    );
    assert!(!diff.contains_setting(NM_SETTING_IP4_CONFIG_SETTING_NAME));
    assert!(!diff.is_empty());
    assert!(diff.remove("connection", "interface-name"));
    assert!(diff.is_empty());
}

#[test]
fn test_diff_unknown_setting_not_compared() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        user:
          data:
            foo: bar
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
        ",
    );

    assert!(nm_connection_diff(&orig, &cand).0);
    assert!(orig.has_setting("user"));
}

#[test]
fn test_diff_legacy_slave_type_folded_into_port_type() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          slave-type: bond
        ",
    );
    let cand = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          port-type: bridge
        ",
    );

    let (is_equal, diff) = nm_connection_diff(&orig, &cand);

    assert!(!is_equal);
    assert_eq!(diff.to_string(), "connection.port-type");
    assert_eq!(
        diff.get("connection", "port-type"),
        Some(&(
            Some(NmValue::Str("bond".to_string())),
            Some(NmValue::Str("bridge".to_string()))
        ))
    );
}
