// SPDX-License-Identifier: Apache-2.0

// Static description of the settings and properties the matcher knows
// about. Only properties flagged `inferrable` take part in matching: those
// are the ones which can be derived back from the kernel state of an
// interface.

use crate::NmValue;

pub const NM_SETTING_CONNECTION_SETTING_NAME: &str = "connection";
pub const NM_SETTING_IP4_CONFIG_SETTING_NAME: &str = "ipv4";
pub const NM_SETTING_IP6_CONFIG_SETTING_NAME: &str = "ipv6";
pub const NM_SETTING_WIRED_SETTING_NAME: &str = "802-3-ethernet";
pub const NM_SETTING_INFINIBAND_SETTING_NAME: &str = "infiniband";
pub const NM_SETTING_VLAN_SETTING_NAME: &str = "vlan";
pub const NM_SETTING_BOND_SETTING_NAME: &str = "bond";
pub const NM_SETTING_BRIDGE_SETTING_NAME: &str = "bridge";
pub const NM_SETTING_MATCH_SETTING_NAME: &str = "match";
pub const NM_SETTING_PROXY_SETTING_NAME: &str = "proxy";

pub const NM_SETTING_CONNECTION_ID: &str = "id";
pub const NM_SETTING_CONNECTION_UUID: &str = "uuid";
pub const NM_SETTING_CONNECTION_TYPE: &str = "type";
pub const NM_SETTING_CONNECTION_INTERFACE_NAME: &str = "interface-name";
pub const NM_SETTING_CONNECTION_CONTROLLER: &str = "controller";
pub const NM_SETTING_CONNECTION_MASTER: &str = "master";
pub const NM_SETTING_CONNECTION_PORT_TYPE: &str = "port-type";
pub const NM_SETTING_CONNECTION_SLAVE_TYPE: &str = "slave-type";

pub const NM_SETTING_IP_CONFIG_METHOD: &str = "method";
pub const NM_SETTING_IP_CONFIG_ROUTES: &str = "routes";
pub const NM_SETTING_IP_CONFIG_ROUTE_METRIC: &str = "route-metric";
pub const NM_SETTING_IP_CONFIG_MAY_FAIL: &str = "may-fail";

pub const NM_SETTING_WIRED_MAC_ADDRESS: &str = "mac-address";
pub const NM_SETTING_WIRED_CLONED_MAC_ADDRESS: &str = "cloned-mac-address";
pub const NM_SETTING_WIRED_S390_SUBCHANNELS: &str = "s390-subchannels";
pub const NM_SETTING_WIRED_S390_NETTYPE: &str = "s390-nettype";
pub const NM_SETTING_WIRED_S390_OPTIONS: &str = "s390-options";
pub const NM_SETTING_INFINIBAND_MAC_ADDRESS: &str = "mac-address";

pub const NM_SETTING_IP4_CONFIG_METHOD_AUTO: &str = "auto";
pub const NM_SETTING_IP4_CONFIG_METHOD_DISABLED: &str = "disabled";
pub const NM_SETTING_IP6_CONFIG_METHOD_AUTO: &str = "auto";
pub const NM_SETTING_IP6_CONFIG_METHOD_DISABLED: &str = "disabled";
pub const NM_SETTING_IP6_CONFIG_METHOD_LINK_LOCAL: &str = "link-local";
pub const NM_SETTING_IP6_CONFIG_METHOD_IGNORE: &str = "ignore";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NmValueKind {
    Bool,
    Int,
    Str,
    StrList,
    StrMap,
    Routes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NmDefault {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
    EmptyList,
    EmptyMap,
}

impl NmDefault {
    pub(crate) fn to_value(self) -> Option<NmValue> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(NmValue::Bool(b)),
            Self::Int(i) => Some(NmValue::Int(i)),
            Self::Str(s) => Some(NmValue::Str(s.to_string())),
            Self::EmptyList => Some(NmValue::StrList(Vec::new())),
            Self::EmptyMap => Some(NmValue::StrMap(Default::default())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NmPropertySchema {
    pub(crate) name: &'static str,
    pub(crate) kind: NmValueKind,
    pub(crate) default: NmDefault,
    pub(crate) inferrable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NmSettingSchema {
    pub(crate) name: &'static str,
    pub(crate) properties: &'static [NmPropertySchema],
}

impl NmSettingSchema {
    pub(crate) fn property(
        &self,
        name: &str,
    ) -> Option<&'static NmPropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn inferrable_properties(
        &self,
    ) -> impl Iterator<Item = &'static NmPropertySchema> {
        self.properties.iter().filter(|p| p.inferrable)
    }
}

const fn prop(
    name: &'static str,
    kind: NmValueKind,
    default: NmDefault,
    inferrable: bool,
) -> NmPropertySchema {
    NmPropertySchema {
        name,
        kind,
        default,
        inferrable,
    }
}

use NmDefault as D;
use NmValueKind as K;

const CONNECTION_PROPERTIES: &[NmPropertySchema] = &[
    prop("id", K::Str, D::Null, false),
    prop("uuid", K::Str, D::Null, false),
    prop("type", K::Str, D::Null, true),
    prop("interface-name", K::Str, D::Null, true),
    prop("controller", K::Str, D::Null, true),
    prop("master", K::Str, D::Null, true),
    prop("port-type", K::Str, D::Null, true),
    prop("slave-type", K::Str, D::Null, true),
    prop("autoconnect", K::Bool, D::Bool(true), false),
    prop("autoconnect-priority", K::Int, D::Int(0), false),
    prop("zone", K::Str, D::Null, false),
    prop("timestamp", K::Int, D::Int(0), false),
];

const IP4_CONFIG_PROPERTIES: &[NmPropertySchema] = &[
    prop("method", K::Str, D::Str("auto"), true),
    prop("addresses", K::StrList, D::EmptyList, true),
    prop("gateway", K::Str, D::Null, true),
    prop("routes", K::Routes, D::EmptyList, true),
    prop("route-metric", K::Int, D::Int(-1), false),
    prop("route-table", K::Int, D::Int(0), false),
    prop("may-fail", K::Bool, D::Bool(true), false),
    prop("never-default", K::Bool, D::Bool(false), true),
    prop("dns", K::StrList, D::EmptyList, true),
    prop("dns-search", K::StrList, D::EmptyList, false),
    prop("ignore-auto-routes", K::Bool, D::Bool(false), false),
    prop("ignore-auto-dns", K::Bool, D::Bool(false), false),
    prop("dhcp-timeout", K::Int, D::Int(0), false),
    prop("dhcp-client-id", K::Str, D::Null, false),
];

const IP6_CONFIG_PROPERTIES: &[NmPropertySchema] = &[
    prop("method", K::Str, D::Str("auto"), true),
    prop("addresses", K::StrList, D::EmptyList, true),
    prop("gateway", K::Str, D::Null, true),
    prop("routes", K::Routes, D::EmptyList, true),
    prop("route-metric", K::Int, D::Int(-1), false),
    prop("route-table", K::Int, D::Int(0), false),
    prop("may-fail", K::Bool, D::Bool(true), false),
    prop("never-default", K::Bool, D::Bool(false), true),
    prop("dns", K::StrList, D::EmptyList, true),
    prop("dns-search", K::StrList, D::EmptyList, false),
    prop("ignore-auto-routes", K::Bool, D::Bool(false), false),
    prop("ignore-auto-dns", K::Bool, D::Bool(false), false),
    prop("dhcp-timeout", K::Int, D::Int(0), false),
    prop("addr-gen-mode", K::Str, D::Null, false),
    prop("ip6-privacy", K::Int, D::Int(-1), false),
];

const WIRED_PROPERTIES: &[NmPropertySchema] = &[
    prop("mac-address", K::Str, D::Null, true),
    prop("cloned-mac-address", K::Str, D::Null, true),
    prop("mtu", K::Int, D::Int(0), true),
    prop("s390-subchannels", K::StrList, D::EmptyList, true),
    prop("s390-nettype", K::Str, D::Null, true),
    prop("s390-options", K::StrMap, D::EmptyMap, true),
    prop("auto-negotiate", K::Bool, D::Bool(false), false),
    prop("speed", K::Int, D::Int(0), false),
    prop("duplex", K::Str, D::Null, false),
    prop("wake-on-lan", K::Int, D::Int(1), false),
];

const INFINIBAND_PROPERTIES: &[NmPropertySchema] = &[
    prop("mac-address", K::Str, D::Null, true),
    prop("mtu", K::Int, D::Int(0), true),
    prop("transport-mode", K::Str, D::Null, true),
    prop("p-key", K::Int, D::Int(-1), true),
    prop("parent", K::Str, D::Null, true),
];

const VLAN_PROPERTIES: &[NmPropertySchema] = &[
    prop("id", K::Int, D::Int(0), true),
    prop("parent", K::Str, D::Null, true),
    prop("flags", K::Int, D::Int(1), false),
];

const BOND_PROPERTIES: &[NmPropertySchema] =
    &[prop("options", K::StrMap, D::EmptyMap, true)];

const BRIDGE_PROPERTIES: &[NmPropertySchema] = &[
    prop("mac-address", K::Str, D::Null, true),
    prop("stp", K::Bool, D::Bool(true), true),
    prop("priority", K::Int, D::Int(32768), true),
    prop("forward-delay", K::Int, D::Int(15), true),
    prop("hello-time", K::Int, D::Int(2), true),
    prop("max-age", K::Int, D::Int(20), true),
];

const MATCH_PROPERTIES: &[NmPropertySchema] = &[
    prop("interface-name", K::StrList, D::EmptyList, true),
    prop("driver", K::StrList, D::EmptyList, true),
    prop("path", K::StrList, D::EmptyList, true),
    prop("kernel-command-line", K::StrList, D::EmptyList, true),
];

const PROXY_PROPERTIES: &[NmPropertySchema] = &[
    prop("method", K::Str, D::Str("none"), true),
    prop("pac-url", K::Str, D::Null, true),
    prop("pac-script", K::Str, D::Null, false),
    prop("browser-only", K::Bool, D::Bool(false), true),
];

pub(crate) const NM_SETTINGS_SCHEMA: &[NmSettingSchema] = &[
    NmSettingSchema {
        name: NM_SETTING_CONNECTION_SETTING_NAME,
        properties: CONNECTION_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_IP4_CONFIG_SETTING_NAME,
        properties: IP4_CONFIG_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_IP6_CONFIG_SETTING_NAME,
        properties: IP6_CONFIG_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_WIRED_SETTING_NAME,
        properties: WIRED_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_INFINIBAND_SETTING_NAME,
        properties: INFINIBAND_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_VLAN_SETTING_NAME,
        properties: VLAN_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_BOND_SETTING_NAME,
        properties: BOND_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_BRIDGE_SETTING_NAME,
        properties: BRIDGE_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_MATCH_SETTING_NAME,
        properties: MATCH_PROPERTIES,
    },
    NmSettingSchema {
        name: NM_SETTING_PROXY_SETTING_NAME,
        properties: PROXY_PROPERTIES,
    },
];

pub(crate) fn setting_schema(name: &str) -> Option<&'static NmSettingSchema> {
    NM_SETTINGS_SCHEMA.iter().find(|s| s.name == name)
}

pub(crate) fn property_schema(
    setting_name: &str,
    prop_name: &str,
) -> Option<&'static NmPropertySchema> {
    setting_schema(setting_name).and_then(|s| s.property(prop_name))
}

