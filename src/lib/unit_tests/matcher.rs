// SPDX-License-Identifier: Apache-2.0

use super::new_conn;
use crate::{find_best_match, is_possible_match, MatchOptions, NmConnection};

fn generated_conn() -> NmConnection {
    new_conn(
        r"---
        connection:
          id: eth1
          type: 802-3-ethernet
          interface-name: eth1
        ipv4:
          method: disabled
        ipv6:
          method: link-local
        ",
    )
}

fn waivable_conn() -> NmConnection {
    new_conn(
        r"---
        connection:
          id: waived
          uuid: 6f4c1d9e-3b8a-4e15-9c3d-2a7b5e8f0c41
          type: 802-3-ethernet
          interface-name: eth1
        ipv4:
          method: auto
          may-fail: true
        ipv6:
          method: auto
          may-fail: true
        ",
    )
}

fn exact_conn() -> NmConnection {
    new_conn(
        r"---
        connection:
          id: exact
          uuid: 1d3e5f7a-9b2c-4d6e-8f0a-1b3c5d7e9f20
          type: 802-3-ethernet
          interface-name: eth1
          autoconnect: false
        ipv4:
          method: disabled
        ipv6:
          method: link-local
        ",
    )
}

#[test]
fn test_match_itself() {
    let conn = waivable_conn();
    let candidates = vec![conn.clone()];

    let best = find_best_match(
        &candidates,
        &conn,
        &MatchOptions::new(),
        &candidates,
        None,
    );

    assert_eq!(best, Some(&conn));
}

#[test]
fn test_match_no_candidates() {
    let candidates: Vec<NmConnection> = Vec::new();

    assert!(find_best_match(
        &candidates,
        &generated_conn(),
        &MatchOptions::new(),
        &candidates,
        None,
    )
    .is_none());
}

#[test]
fn test_match_waived_both_methods_without_carrier() {
    let candidates = vec![waivable_conn()];
    let opts = MatchOptions::new().device_has_carrier(false);

    let best = find_best_match(
        &candidates,
        &generated_conn(),
        &opts,
        &candidates,
        None,
    );

    assert_eq!(best.and_then(|c| c.id()), Some("waived"));
}

#[test]
fn test_no_match_with_carrier() {
    let candidates = vec![waivable_conn()];
    let opts = MatchOptions::new().device_has_carrier(true);

    let best = find_best_match(
        &candidates,
        &generated_conn(),
        &opts,
        &candidates,
        None,
    );

    assert!(best.is_none());
}

#[test]
fn test_exact_match_wins_over_waived_match() {
    let opts = MatchOptions::new().device_has_carrier(false);
    let original = generated_conn();

    let candidates = vec![waivable_conn(), exact_conn()];
    let best =
        find_best_match(&candidates, &original, &opts, &candidates, None);
    assert_eq!(best.and_then(|c| c.id()), Some("exact"));

    let candidates = vec![exact_conn(), waivable_conn()];
    let best =
        find_best_match(&candidates, &original, &opts, &candidates, None);
    assert_eq!(best.and_then(|c| c.id()), Some("exact"));
}

#[test]
fn test_first_waived_match_wins() {
    let opts = MatchOptions::new().device_has_carrier(false);
    let mut second = waivable_conn();
    second.set_property(
        "connection",
        "id",
        crate::NmValue::Str("second".to_string()),
    );
    let candidates = vec![waivable_conn(), second];

    let best = find_best_match(
        &candidates,
        &generated_conn(),
        &opts,
        &candidates,
        None,
    );

    assert_eq!(best.and_then(|c| c.id()), Some("waived"));
}

#[test]
fn test_match_with_filter() {
    let opts = MatchOptions::new().device_has_carrier(false);
    let candidates = vec![exact_conn(), waivable_conn()];
    let filter = |c: &NmConnection| c.id() != Some("exact");

    let best = find_best_match(
        &candidates,
        &generated_conn(),
        &opts,
        &candidates,
        Some(&filter),
    );

    assert_eq!(best.and_then(|c| c.id()), Some("waived"));
}

#[test]
fn test_indicated_match_only_check_type() {
    let original = generated_conn();
    let candidates = vec![
        new_conn(
            r"---
            connection:
              id: bond-port
              type: 802-3-ethernet
              port-type: bond
            ",
        ),
        new_conn(
            r"---
            connection:
              id: wifi
              type: 802-11-wireless
            ",
        ),
        new_conn(
            r"---
            connection:
              id: static
              type: 802-3-ethernet
              interface-name: eth9
            ipv4:
              method: manual
              addresses:
              - 192.0.2.2/24
            ",
        ),
    ];

    let best = find_best_match(
        &candidates,
        &original,
        &MatchOptions::new().indicated(true),
        &candidates,
        None,
    );
    assert_eq!(best.and_then(|c| c.id()), Some("static"));

    let best = find_best_match(
        &candidates,
        &original,
        &MatchOptions::new(),
        &candidates,
        None,
    );
    assert!(best.is_none());
}

#[test]
fn test_is_possible_match() {
    let opts = MatchOptions::new().device_has_carrier(false);
    let candidates: Vec<NmConnection> = Vec::new();

    assert!(is_possible_match(
        &generated_conn(),
        &waivable_conn(),
        &opts,
        &candidates
    ));
    assert!(is_possible_match(
        &generated_conn(),
        &exact_conn(),
        &opts,
        &candidates
    ));
    assert!(!is_possible_match(
        &generated_conn(),
        &waivable_conn(),
        &MatchOptions::new(),
        &candidates
    ));
}

#[test]
fn test_match_options_from_yaml() {
    let opts: MatchOptions = serde_yaml::from_str(
        r"---
        device-has-carrier: false
        default-v4-metric: 100
        ",
    )
    .unwrap();

    assert!(!opts.indicated);
    assert!(!opts.device_has_carrier);
    assert_eq!(opts.default_v4_metric, 100);
    assert_eq!(opts.default_v6_metric, -1);
}

#[test]
fn test_match_legacy_slave_type_against_port_type() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
          slave-type: bond
        ",
    );
    let candidates = vec![new_conn(
        r"---
        connection:
          id: eth1
          type: 802-3-ethernet
          interface-name: eth1
          port-type: bond
        ",
    )];

    let best = find_best_match(
        &candidates,
        &orig,
        &MatchOptions::new(),
        &candidates,
        None,
    );

    assert_eq!(best, Some(&candidates[0]));
}

#[test]
fn test_no_match_on_different_port_type_spelled_legacy() {
    let orig = new_conn(
        r"---
        connection:
          type: 802-3-ethernet
          interface-name: eth1
          slave-type: bond
        ",
    );
    let candidates = vec![new_conn(
        r"---
        connection:
          id: eth1
          type: 802-3-ethernet
          interface-name: eth1
          port-type: bridge
        ",
    )];

    assert!(find_best_match(
        &candidates,
        &orig,
        &MatchOptions::new(),
        &candidates,
        None,
    )
    .is_none());
}
