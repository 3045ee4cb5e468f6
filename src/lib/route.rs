// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{ErrorKind, NmMatchError};

/// Route metric left to the connection or global default.
pub const NM_IP_ROUTE_METRIC_DEFAULT: i64 = -1;

const IPV4_HOST_PREFIX_LEN: u32 = 32;
const IPV6_HOST_PREFIX_LEN: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NmIpFamily {
    V4,
    V6,
}

impl NmIpFamily {
    pub fn setting_name(&self) -> &'static str {
        match self {
            Self::V4 => crate::NM_SETTING_IP4_CONFIG_SETTING_NAME,
            Self::V6 => crate::NM_SETTING_IP6_CONFIG_SETTING_NAME,
        }
    }

    /// Prefix length of a host route: 32 for IPv4, 128 for IPv6.
    pub fn host_prefix_len(&self) -> u32 {
        match self {
            Self::V4 => IPV4_HOST_PREFIX_LEN,
            Self::V6 => IPV6_HOST_PREFIX_LEN,
        }
    }

    pub(crate) fn of_addr(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl std::fmt::Display for NmIpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.setting_name())
    }
}

impl Serialize for NmIpFamily {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.setting_name())
    }
}

impl<'de> Deserialize<'de> for NmIpFamily {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = String::deserialize(deserializer)?;
        match v.as_str() {
            "ipv4" | "inet" => Ok(Self::V4),
            "ipv6" | "inet6" => Ok(Self::V6),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid IP family {v}, expecting ipv4 or ipv6"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct NmIpRoute {
    #[serde(skip)]
    pub family: NmIpFamily,
    pub dest: String,
    pub prefix: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop: Option<String>,
    /// [NM_IP_ROUTE_METRIC_DEFAULT] means unspecified.
    pub metric: i64,
}

impl NmIpRoute {
    /// Build a route from `dest/prefix`, an optional next hop and a metric.
    pub fn new(
        destination: &str,
        next_hop: Option<&str>,
        metric: i64,
    ) -> Result<Self, NmMatchError> {
        let (dest, prefix) = parse_destination(destination)?;
        let family = NmIpFamily::of_addr(&dest);
        let next_hop = match next_hop {
            Some(nh) => {
                let nh_addr = nh.parse::<IpAddr>()?;
                if NmIpFamily::of_addr(&nh_addr) != family {
                    return Err(NmMatchError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Next hop {nh} is not in the same IP family as \
                            route destination {destination}"
                        ),
                    ));
                }
                Some(nh.to_string())
            }
            None => None,
        };
        Ok(Self {
            family,
            dest: dest.to_string(),
            prefix: prefix.unwrap_or_else(|| family.host_prefix_len()),
            next_hop,
            metric,
        })
    }

    pub(crate) fn from_value(
        value: &Value,
        family: NmIpFamily,
    ) -> Result<Self, NmMatchError> {
        let route = match value {
            // nmcli style: `DEST/PREFIX [NEXT_HOP] [METRIC]`
            Value::String(s) => {
                let mut items = s.split_whitespace();
                let dest = items.next().unwrap_or_default();
                let mut next_hop = None;
                let mut metric = NM_IP_ROUTE_METRIC_DEFAULT;
                for item in items {
                    if let Ok(m) = item.parse::<i64>() {
                        metric = m;
                    } else {
                        next_hop = Some(item);
                    }
                }
                Self::new(dest, next_hop, metric)?
            }
            Value::Object(m) => {
                let dest =
                    m.get("dest").and_then(|v| v.as_str()).ok_or_else(|| {
                        NmMatchError::new(
                            ErrorKind::InvalidArgument,
                            format!("Route {value} has no `dest` defined"),
                        )
                    })?;
                let dest = match m.get("prefix").and_then(|v| v.as_u64()) {
                    Some(p) if !dest.contains('/') => format!("{dest}/{p}"),
                    _ => dest.to_string(),
                };
                let next_hop = m.get("next-hop").and_then(|v| v.as_str());
                let metric = m
                    .get("metric")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(NM_IP_ROUTE_METRIC_DEFAULT);
                Self::new(dest.as_str(), next_hop, metric)?
            }
            _ => {
                return Err(NmMatchError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Expecting route string or dict, but got {value}"
                    ),
                ));
            }
        };
        if route.family != family {
            return Err(NmMatchError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Route {value} does not belong to {} setting",
                    family.setting_name()
                ),
            ));
        }
        Ok(route)
    }

    pub fn effective_metric(&self, default_metric: i64) -> i64 {
        if self.metric == NM_IP_ROUTE_METRIC_DEFAULT {
            default_metric
        } else {
            self.metric
        }
    }

    // Destination with the host bits beyond the prefix length cleared.
    // None when the destination is not a valid address of the route family.
    pub(crate) fn masked_dest(&self) -> Option<Vec<u8>> {
        let addr = self.dest.parse::<IpAddr>().ok()?;
        if NmIpFamily::of_addr(&addr) != self.family
            || self.prefix > self.family.host_prefix_len()
        {
            return None;
        }
        let mut octets = match addr {
            IpAddr::V4(a) => a.octets().to_vec(),
            IpAddr::V6(a) => a.octets().to_vec(),
        };
        let prefix = self.prefix as usize;
        for (i, octet) in octets.iter_mut().enumerate() {
            let bit_start = i * 8;
            if bit_start >= prefix {
                *octet = 0;
            } else if bit_start + 8 > prefix {
                *octet &= 0xffu8 << (8 - (prefix - bit_start));
            }
        }
        Some(octets)
    }
}

impl std::fmt::Display for NmIpRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.dest, self.prefix)?;
        if let Some(nh) = self.next_hop.as_ref() {
            write!(f, " via {nh}")?;
        }
        if self.metric != NM_IP_ROUTE_METRIC_DEFAULT {
            write!(f, " metric {}", self.metric)?;
        }
        Ok(())
    }
}

fn parse_destination(
    destination: &str,
) -> Result<(IpAddr, Option<u32>), NmMatchError> {
    let (addr, prefix) = match destination.split_once('/') {
        Some((addr, prefix)) => (
            addr,
            Some(prefix.parse::<u32>().map_err(|e| {
                NmMatchError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Invalid prefix length in route destination \
                        {destination}: {e}"
                    ),
                )
            })?),
        ),
        None => (destination, None),
    };
    let addr = addr.parse::<IpAddr>()?;
    if let Some(prefix) = prefix {
        if prefix > NmIpFamily::of_addr(&addr).host_prefix_len() {
            return Err(NmMatchError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Prefix length {prefix} is too large for route \
                    destination {destination}"
                ),
            ));
        }
    }
    Ok((addr, prefix))
}

/// Total order of routes, first differing field decides:
/// family, prefix length, effective metric, next hop, then destination with
/// host bits masked.
pub fn route_cmp(
    r1: &NmIpRoute,
    r2: &NmIpRoute,
    default_metric: i64,
) -> Ordering {
    r1.family
        .cmp(&r2.family)
        .then_with(|| r1.prefix.cmp(&r2.prefix))
        .then_with(|| {
            r1.effective_metric(default_metric)
                .cmp(&r2.effective_metric(default_metric))
        })
        .then_with(|| {
            r1.next_hop
                .as_deref()
                .unwrap_or_default()
                .cmp(r2.next_hop.as_deref().unwrap_or_default())
        })
        .then_with(|| match (r1.masked_dest(), r2.masked_dest()) {
            (Some(d1), Some(d2)) => d1.cmp(&d2),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => r1.dest.cmp(&r2.dest),
        })
}

/// Routes with unspecified metric resolved to `default_metric` and sorted
/// by [route_cmp].
/// Return None if any route holds an invalid destination.
pub(crate) fn canonicalize_routes(
    routes: &[NmIpRoute],
    default_metric: i64,
) -> Option<Vec<NmIpRoute>> {
    let mut ret = Vec::with_capacity(routes.len());
    for route in routes {
        if route.masked_dest().is_none() {
            log::warn!(
                "Route {route} holds invalid destination, treating routes \
                as not comparable"
            );
            return None;
        }
        let mut route = route.clone();
        route.metric = route.effective_metric(default_metric);
        ret.push(route);
    }
    ret.sort_by(|r1, r2| route_cmp(r1, r2, default_metric));
    Some(ret)
}

/// Whether every candidate route exists in the original routes, allowing
/// the original to hold extra host routes (prefix length `host_plen`) which
/// kernel added for directly reachable gateways.
pub fn routes_equivalent_as_set(
    orig_routes: &[NmIpRoute],
    candidate_routes: &[NmIpRoute],
    default_metric: i64,
    host_plen: u32,
) -> bool {
    match (
        canonicalize_routes(orig_routes, default_metric),
        canonicalize_routes(candidate_routes, default_metric),
    ) {
        (Some(orig), Some(cand)) => {
            sorted_routes_equivalent(&orig, &cand, host_plen)
        }
        _ => false,
    }
}

// Both lists should be produced by canonicalize_routes().
pub(crate) fn sorted_routes_equivalent(
    orig_routes: &[NmIpRoute],
    candidate_routes: &[NmIpRoute],
    host_plen: u32,
) -> bool {
    let mut orig_iter = orig_routes.iter();
    for cand_route in candidate_routes {
        loop {
            let orig_route = match orig_iter.next() {
                Some(r) => r,
                None => return false,
            };
            if route_cmp(orig_route, cand_route, NM_IP_ROUTE_METRIC_DEFAULT)
                == Ordering::Equal
            {
                break;
            }
            if orig_route.prefix != host_plen {
                return false;
            }
        }
    }
    orig_iter.all(|r| r.prefix == host_plen)
}
