// SPDX-License-Identifier: Apache-2.0

//! Matching of connection profiles generated from the current state of a
//! network interface against stored connection profiles.
//!
//! The matching engine is pure: it only reads the profiles handed to it and
//! reaches stored profiles through the [SettingsLookup] trait.
//!
//! ```
//! use nm_match::{find_best_match, MatchOptions, NmConnection};
//!
//! let original: NmConnection = serde_yaml::from_str(
//!     r"---
//!     connection:
//!       type: 802-3-ethernet
//!       interface-name: eth1
//!     ipv4:
//!       method: disabled
//!     ipv6:
//!       method: link-local
//!     ",
//! )
//! .unwrap();
//! let stored: Vec<NmConnection> = serde_yaml::from_str(
//!     r"---
//!     - connection:
//!         id: eth1
//!         type: 802-3-ethernet
//!         interface-name: eth1
//!       ipv4:
//!         method: auto
//!       ipv6:
//!         method: auto
//!     ",
//! )
//! .unwrap();
//!
//! let opts = MatchOptions::new().device_has_carrier(false);
//! let best = find_best_match(&stored, &original, &opts, &stored, None);
//! assert_eq!(best.and_then(|c| c.id()), Some("eth1"));
//! ```

mod connection;
mod diff;
mod error;
mod match_spec;
mod matcher;
mod route;
mod routing_rule;
mod schema;
mod waiver;

pub use crate::connection::{NmConnection, NmSetting, NmValue};
pub use crate::diff::{nm_connection_diff, NmPropertyDiff, NmPropertyDiffValues};
pub use crate::error::{ErrorKind, NmMatchError};
pub use crate::match_spec::{
    device_matches, MatchResult, MatchSpec, MatchSpecDeviceData,
    MatchSpecKind,
};
pub use crate::matcher::{
    find_best_match, is_possible_match, MatchOptions, SettingsLookup,
};
pub use crate::route::{
    route_cmp, routes_equivalent_as_set, NmIpFamily, NmIpRoute,
    NM_IP_ROUTE_METRIC_DEFAULT,
};
pub use crate::routing_rule::{
    NmIpRoutingRule, NmRange, NmRoutingRuleAction, PlatformRoutingRule,
};
pub use crate::schema::*;
pub use crate::waiver::apply_waivers;
