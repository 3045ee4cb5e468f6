// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NmIpFamily, NmMatchError};

const RT_TABLE_MAIN: u32 = 254;

const FR_ACT_TO_TBL: u8 = 1;
const FR_ACT_BLACKHOLE: u8 = 6;
const FR_ACT_UNREACHABLE: u8 = 7;
const FR_ACT_PROHIBIT: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum NmRoutingRuleAction {
    #[default]
    ToTable,
    Blackhole,
    Unreachable,
    Prohibit,
}

impl NmRoutingRuleAction {
    fn to_platform(self) -> u8 {
        match self {
            Self::ToTable => FR_ACT_TO_TBL,
            Self::Blackhole => FR_ACT_BLACKHOLE,
            Self::Unreachable => FR_ACT_UNREACHABLE,
            Self::Prohibit => FR_ACT_PROHIBIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NmRange<T> {
    pub start: T,
    pub end: T,
}

/// IP policy routing rule as stored in the `routing-rules` property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct NmIpRoutingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<NmIpFamily>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default)]
    pub invert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tos: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipproto: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<NmRange<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<NmRange<u16>>,
    /// Source prefix like `192.0.2.0/24`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination prefix like `2001:db8::/64`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fwmark: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fwmask: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iifname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oifname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<NmRoutingRuleAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_prefixlength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid_range: Option<NmRange<u32>>,
}

/// Routing rule in the form platform layer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PlatformRoutingRule {
    pub family: NmIpFamily,
    pub priority: u32,
    pub invert: bool,
    pub tos: u8,
    pub ip_proto: u8,
    pub sport_range: (u16, u16),
    pub dport_range: (u16, u16),
    pub src: IpAddr,
    pub src_len: u8,
    pub dst: IpAddr,
    pub dst_len: u8,
    pub fwmark: u32,
    pub fwmask: u32,
    pub iifname: Option<String>,
    pub oifname: Option<String>,
    pub table: u32,
    pub action: u8,
    /// -1 means not set
    pub suppress_prefixlen_inverse: i32,
    pub uid_range: Option<(u32, u32)>,
}

impl NmIpRoutingRule {
    fn family(&self) -> Result<NmIpFamily, NmMatchError> {
        if let Some(family) = self.family {
            return Ok(family);
        }
        if let Some(prefix) = self.from.as_deref().or(self.to.as_deref()) {
            let (addr, _) = parse_prefix(prefix, None)?;
            return Ok(NmIpFamily::of_addr(&addr));
        }
        Err(NmMatchError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Routing rule {self:?} has no family, `from` or `to` defined"
            ),
        ))
    }

    pub fn to_platform(&self) -> Result<PlatformRoutingRule, NmMatchError> {
        let family = self.family()?;
        let unspecified = match family {
            NmIpFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            NmIpFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let (src, src_len) = match self.from.as_deref() {
            Some(p) => parse_prefix(p, Some(family))?,
            None => (unspecified, 0),
        };
        let (dst, dst_len) = match self.to.as_deref() {
            Some(p) => parse_prefix(p, Some(family))?,
            None => (unspecified, 0),
        };
        let action = self.action.unwrap_or_default();
        let table = match (action, self.table) {
            (NmRoutingRuleAction::ToTable, None | Some(0)) => RT_TABLE_MAIN,
            (_, t) => t.unwrap_or_default(),
        };

        Ok(PlatformRoutingRule {
            family,
            priority: self.priority.unwrap_or_default(),
            invert: self.invert,
            tos: self.tos.unwrap_or_default(),
            ip_proto: self.ipproto.unwrap_or_default(),
            sport_range: range_to_platform(self.source_port, "source-port")?,
            dport_range: range_to_platform(
                self.destination_port,
                "destination-port",
            )?,
            src,
            src_len,
            dst,
            dst_len,
            fwmark: self.fwmark.unwrap_or_default(),
            fwmask: self.fwmask.unwrap_or_default(),
            iifname: self.iifname.clone(),
            oifname: self.oifname.clone(),
            table,
            action: action.to_platform(),
            suppress_prefixlen_inverse: self
                .suppress_prefixlength
                .unwrap_or(-1),
            uid_range: self
                .uid_range
                .map(|r| range_to_platform(Some(r), "uid-range"))
                .transpose()?,
        })
    }
}

fn range_to_platform<T>(
    range: Option<NmRange<T>>,
    name: &str,
) -> Result<(T, T), NmMatchError>
where
    T: Copy + Default + PartialOrd + std::fmt::Display,
{
    match range {
        Some(r) if r.start > r.end => Err(NmMatchError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Routing rule {name} start {} is larger than end {}",
                r.start, r.end
            ),
        )),
        Some(r) => Ok((r.start, r.end)),
        None => Ok((T::default(), T::default())),
    }
}

fn parse_prefix(
    prefix: &str,
    family: Option<NmIpFamily>,
) -> Result<(IpAddr, u8), NmMatchError> {
    let (addr, plen) = match prefix.split_once('/') {
        Some((a, p)) => (a, Some(p)),
        None => (prefix, None),
    };
    let addr = addr.parse::<IpAddr>()?;
    let addr_family = NmIpFamily::of_addr(&addr);
    if let Some(family) = family {
        if family != addr_family {
            return Err(NmMatchError::new(
                ErrorKind::InvalidArgument,
                format!("Routing rule prefix {prefix} is not {family}"),
            ));
        }
    }
    let plen = match plen {
        Some(p) => p.parse::<u8>().map_err(|e| {
            NmMatchError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid prefix length in {prefix}: {e}"),
            )
        })?,
        None => addr_family.host_prefix_len() as u8,
    };
    if u32::from(plen) > addr_family.host_prefix_len() {
        return Err(NmMatchError::new(
            ErrorKind::InvalidArgument,
            format!("Prefix length of {prefix} is too large"),
        ));
    }
    Ok((addr, plen))
}
