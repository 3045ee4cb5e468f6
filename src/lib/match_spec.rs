// SPDX-License-Identifier: Apache-2.0

//! Device match specification, for example `interface-name:eth*`,
//! `driver:e1000e` or `except:mac-address:00:11:22:33:44:55`.

use globset::Glob;
use serde::{Deserialize, Serialize};

const EXCEPT_TAG: &str = "except:";
const INTERFACE_NAME_TAG: &str = "interface-name:";
const MAC_TAG: &str = "mac:";
const MAC_ADDRESS_TAG: &str = "mac-address:";
const TYPE_TAG: &str = "type:";
const DRIVER_TAG: &str = "driver:";
const DRIVER_VERSION_TAG: &str = "driver-version:";
const S390_SUBCHANNELS_TAG: &str = "s390-subchannels:";
const DHCP_PLUGIN_TAG: &str = "dhcp-plugin:";

/// Snapshot of the device properties a match specification can refer to.
/// Built either from a managed device or from a bare platform link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
#[non_exhaustive]
pub struct MatchSpecDeviceData {
    pub interface_name: Option<String>,
    /// Type description, like `ethernet` or `bond`.
    pub device_type: Option<String>,
    pub driver: Option<String>,
    pub driver_version: Option<String>,
    /// None for virtual device without hardware address.
    pub hwaddr: Option<String>,
    /// Comma separated s390 subchannels, like `0.0.1234,0.0.1235,0.0.1236`.
    pub s390_subchannels: Option<String>,
    pub dhcp_plugin: Option<String>,
}

impl MatchSpecDeviceData {
    pub fn new(interface_name: &str) -> Self {
        Self {
            interface_name: Some(interface_name.to_string()),
            ..Default::default()
        }
    }

    /// Link known by kernel only, the driver version, s390 subchannels and
    /// DHCP plugin are not available there.
    pub fn from_platform_link(
        interface_name: &str,
        link_type: &str,
        driver: Option<&str>,
        hwaddr: Option<&str>,
    ) -> Self {
        Self {
            interface_name: Some(interface_name.to_string()),
            device_type: Some(link_type.to_string()),
            driver: driver.map(|d| d.to_string()),
            hwaddr: hwaddr.map(|h| h.to_string()),
            ..Default::default()
        }
    }

    pub fn with_device_type(mut self, device_type: &str) -> Self {
        self.device_type = Some(device_type.to_string());
        self
    }

    pub fn with_driver(mut self, driver: &str, version: Option<&str>) -> Self {
        self.driver = Some(driver.to_string());
        self.driver_version = version.map(|v| v.to_string());
        self
    }

    pub fn with_hwaddr(mut self, hwaddr: &str) -> Self {
        self.hwaddr = Some(hwaddr.to_string());
        self
    }

    pub fn with_s390_subchannels(mut self, subchannels: &str) -> Self {
        self.s390_subchannels = Some(subchannels.to_string());
        self
    }

    pub fn with_dhcp_plugin(mut self, dhcp_plugin: &str) -> Self {
        self.dhcp_plugin = Some(dhcp_plugin.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchSpecKind {
    /// `*`
    Any,
    InterfaceName {
        name: String,
        use_glob: bool,
    },
    HwAddr(String),
    DeviceType(String),
    Driver {
        name: String,
        version: Option<String>,
    },
    DriverVersion(String),
    S390Subchannels(String),
    DhcpPlugin(String),
    /// No tag, matched against hardware address or interface name.
    Untagged(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct MatchSpec {
    pub except: bool,
    pub kind: MatchSpecKind,
}

impl MatchSpec {
    /// Return None for empty specification.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (except, spec) = match spec.strip_prefix(EXCEPT_TAG) {
            Some(s) => (true, s),
            None => (false, spec),
        };
        if spec.is_empty() {
            return None;
        }

        let kind = if spec == "*" {
            MatchSpecKind::Any
        } else if let Some(s) = spec.strip_prefix(INTERFACE_NAME_TAG) {
            if let Some(s) = s.strip_prefix('=') {
                MatchSpecKind::InterfaceName {
                    name: s.to_string(),
                    use_glob: false,
                }
            } else {
                MatchSpecKind::InterfaceName {
                    name: s.strip_prefix('~').unwrap_or(s).to_string(),
                    use_glob: true,
                }
            }
        } else if let Some(s) = spec
            .strip_prefix(MAC_ADDRESS_TAG)
            .or_else(|| spec.strip_prefix(MAC_TAG))
        {
            MatchSpecKind::HwAddr(s.to_string())
        } else if let Some(s) = spec.strip_prefix(TYPE_TAG) {
            MatchSpecKind::DeviceType(s.to_string())
        } else if let Some(s) = spec.strip_prefix(DRIVER_VERSION_TAG) {
            MatchSpecKind::DriverVersion(s.to_string())
        } else if let Some(s) = spec.strip_prefix(DRIVER_TAG) {
            match s.split_once('/') {
                Some((name, version)) => MatchSpecKind::Driver {
                    name: name.to_string(),
                    version: Some(version.to_string()),
                },
                None => MatchSpecKind::Driver {
                    name: s.to_string(),
                    version: None,
                },
            }
        } else if let Some(s) = spec.strip_prefix(S390_SUBCHANNELS_TAG) {
            MatchSpecKind::S390Subchannels(s.to_string())
        } else if let Some(s) = spec.strip_prefix(DHCP_PLUGIN_TAG) {
            MatchSpecKind::DhcpPlugin(s.to_string())
        } else {
            MatchSpecKind::Untagged(spec.to_string())
        };
        Some(Self { except, kind })
    }

    fn matches(&self, data: &MatchSpecDeviceData) -> bool {
        match &self.kind {
            MatchSpecKind::Any => true,
            MatchSpecKind::InterfaceName { name, use_glob } => {
                data.interface_name.as_deref().map(|ifname| {
                    ifname == name || (*use_glob && glob_match(name, ifname))
                }) == Some(true)
            }
            MatchSpecKind::HwAddr(mac) => hwaddr_matches(mac, data),
            MatchSpecKind::DeviceType(t) => {
                data.device_type.as_deref() == Some(t.as_str())
            }
            MatchSpecKind::Driver { name, version } => {
                data.driver.as_deref() == Some(name.as_str())
                    && match version {
                        Some(v) => {
                            data.driver_version.as_deref() == Some(v.as_str())
                        }
                        None => true,
                    }
            }
            MatchSpecKind::DriverVersion(v) => {
                data.driver_version.as_deref() == Some(v.as_str())
            }
            MatchSpecKind::S390Subchannels(s) => data
                .s390_subchannels
                .as_deref()
                .map(|d| s390_subchannels_matches(s, d))
                == Some(true),
            MatchSpecKind::DhcpPlugin(p) => {
                data.dhcp_plugin.as_deref() == Some(p.as_str())
            }
            // Untagged `except:` specification never falls back this way.
            MatchSpecKind::Untagged(s) => {
                !self.except
                    && (hwaddr_matches(s, data)
                        || data.interface_name.as_deref() == Some(s.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchResult {
    Matched,
    NotMatched,
    /// Nothing to match against, caller decides.
    NoSpecs,
}

impl MatchResult {
    pub fn unwrap_or(self, default: bool) -> bool {
        match self {
            Self::Matched => true,
            Self::NotMatched => false,
            Self::NoSpecs => default,
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Matched => "match",
                Self::NotMatched => "no-match",
                Self::NoSpecs => "no-specs",
            }
        )
    }
}

/// Check device against the match specifications.
///
/// Any matching `except:` specification rejects the device regardless of
/// other matches. A list holding only `except:` specifications matches all
/// devices not excluded by them.
pub fn device_matches<S>(
    specs: &[S],
    device_data: &MatchSpecDeviceData,
) -> MatchResult
where
    S: AsRef<str>,
{
    let specs: Vec<MatchSpec> =
        specs.iter().filter_map(|s| MatchSpec::parse(s.as_ref())).collect();
    if specs.is_empty() {
        return MatchResult::NoSpecs;
    }

    let mut has_not_except = false;
    let mut matched = false;
    for spec in specs.iter() {
        if spec.except {
            if spec.matches(device_data) {
                log::debug!(
                    "Device {:?} excluded by match spec {:?}",
                    device_data.interface_name,
                    spec.kind
                );
                return MatchResult::NotMatched;
            }
        } else {
            has_not_except = true;
            if !matched && spec.matches(device_data) {
                matched = true;
            }
        }
    }
    if matched || !has_not_except {
        MatchResult::Matched
    } else {
        MatchResult::NotMatched
    }
}

fn parse_hwaddr(mac: &str) -> Option<Vec<u8>> {
    let ret: Option<Vec<u8>> = mac
        .split([':', '-'])
        .map(|b| {
            if b.len() == 2 {
                u8::from_str_radix(b, 16).ok()
            } else {
                None
            }
        })
        .collect();
    ret.filter(|r| !r.is_empty())
}

fn hwaddr_matches(spec_mac: &str, data: &MatchSpecDeviceData) -> bool {
    match (
        parse_hwaddr(spec_mac),
        data.hwaddr.as_deref().and_then(parse_hwaddr),
    ) {
        (Some(m1), Some(m2)) => m1 == m2,
        _ => false,
    }
}

fn parse_s390_subchannels(subchannels: &str) -> Option<Vec<[u32; 3]>> {
    subchannels
        .split(',')
        .map(|subchannel| {
            let mut ret = [0u32; 3];
            let mut items = subchannel.trim().split('.');
            for item in ret.iter_mut() {
                *item = u32::from_str_radix(items.next()?, 16).ok()?;
            }
            if items.next().is_some() {
                None
            } else {
                Some(ret)
            }
        })
        .collect()
}

fn s390_subchannels_matches(spec: &str, device: &str) -> bool {
    match (parse_s390_subchannels(spec), parse_s390_subchannels(device)) {
        (Some(s), Some(d)) => s == d,
        _ => spec == device,
    }
}

// Invalid pattern falls back to literal comparison.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(text),
        Err(e) => {
            log::warn!(
                "Invalid glob pattern {pattern}: {e}, treating as literal"
            );
            pattern == text
        }
    }
}
