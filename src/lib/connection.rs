// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schema::{property_schema, setting_schema, NmValueKind};
use crate::{
    ErrorKind, NmIpFamily, NmIpRoute, NmMatchError,
    NM_IP_ROUTE_METRIC_DEFAULT, NM_SETTING_CONNECTION_CONTROLLER,
    NM_SETTING_CONNECTION_ID, NM_SETTING_CONNECTION_INTERFACE_NAME,
    NM_SETTING_CONNECTION_MASTER, NM_SETTING_CONNECTION_PORT_TYPE,
    NM_SETTING_CONNECTION_SETTING_NAME, NM_SETTING_CONNECTION_SLAVE_TYPE,
    NM_SETTING_CONNECTION_TYPE, NM_SETTING_CONNECTION_UUID,
    NM_SETTING_INFINIBAND_MAC_ADDRESS, NM_SETTING_INFINIBAND_SETTING_NAME,
    NM_SETTING_IP_CONFIG_MAY_FAIL, NM_SETTING_IP_CONFIG_METHOD,
    NM_SETTING_IP_CONFIG_ROUTES, NM_SETTING_IP_CONFIG_ROUTE_METRIC,
    NM_SETTING_WIRED_CLONED_MAC_ADDRESS, NM_SETTING_WIRED_MAC_ADDRESS,
    NM_SETTING_WIRED_S390_NETTYPE, NM_SETTING_WIRED_S390_OPTIONS,
    NM_SETTING_WIRED_S390_SUBCHANNELS, NM_SETTING_WIRED_SETTING_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum NmValue {
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    StrMap(BTreeMap<String, String>),
    Routes(Vec<NmIpRoute>),
}

impl NmValue {
    pub fn as_str(&self) -> Option<&str> {
        if let Self::Str(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        if let Self::Int(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        if let Self::StrList(l) = self {
            Some(l.as_slice())
        } else {
            None
        }
    }

    pub fn as_str_map(&self) -> Option<&BTreeMap<String, String>> {
        if let Self::StrMap(m) = self {
            Some(m)
        } else {
            None
        }
    }

    pub fn as_routes(&self) -> Option<&[NmIpRoute]> {
        if let Self::Routes(r) = self {
            Some(r.as_slice())
        } else {
            None
        }
    }

    fn from_value(
        setting_name: &str,
        prop_name: &str,
        value: &Value,
    ) -> Result<Option<Self>, NmMatchError> {
        if value.is_null() {
            return Ok(None);
        }
        let invalid = || {
            NmMatchError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Invalid value {value} for property \
                    {setting_name}.{prop_name}"
                ),
            )
        };
        let kind = match property_schema(setting_name, prop_name) {
            Some(p) => p.kind,
            None => return Ok(Self::from_unknown_value(value)),
        };
        Ok(Some(match kind {
            NmValueKind::Bool => match value {
                Value::Bool(b) => Self::Bool(*b),
                Value::String(s) => match s.as_str() {
                    "yes" | "true" => Self::Bool(true),
                    "no" | "false" => Self::Bool(false),
                    _ => return Err(invalid()),
                },
                _ => return Err(invalid()),
            },
            NmValueKind::Int => match value {
                Value::Number(n) => Self::Int(n.as_i64().ok_or_else(invalid)?),
                Value::String(s) => {
                    Self::Int(s.parse::<i64>().map_err(|_| invalid())?)
                }
                _ => return Err(invalid()),
            },
            NmValueKind::Str => match value {
                // Empty string means unset
                Value::String(s) if s.is_empty() => return Ok(None),
                Value::String(s) => Self::Str(s.to_string()),
                Value::Number(n) => Self::Str(n.to_string()),
                Value::Bool(b) => Self::Str(b.to_string()),
                _ => return Err(invalid()),
            },
            NmValueKind::StrList => match value {
                Value::Array(items) => Self::StrList(
                    items
                        .iter()
                        .map(|v| value_to_string(v).ok_or_else(invalid))
                        .collect::<Result<Vec<String>, NmMatchError>>()?,
                ),
                Value::String(s) => Self::StrList(
                    s.split(',')
                        .map(|i| i.trim())
                        .filter(|i| !i.is_empty())
                        .map(|i| i.to_string())
                        .collect(),
                ),
                _ => return Err(invalid()),
            },
            NmValueKind::StrMap => match value {
                Value::Object(m) => {
                    let mut ret = BTreeMap::new();
                    for (k, v) in m.iter() {
                        ret.insert(
                            k.to_string(),
                            value_to_string(v).ok_or_else(invalid)?,
                        );
                    }
                    Self::StrMap(ret)
                }
                _ => return Err(invalid()),
            },
            NmValueKind::Routes => {
                let family = if setting_name
                    == NmIpFamily::V6.setting_name()
                {
                    NmIpFamily::V6
                } else {
                    NmIpFamily::V4
                };
                let mut routes = Vec::new();
                for item in value.as_array().ok_or_else(invalid)? {
                    routes.push(NmIpRoute::from_value(item, family)?);
                }
                Self::Routes(routes)
            }
        }))
    }

    // Properties not described by schema are preserved but never diffed.
    fn from_unknown_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => Some(Self::Str(n.to_string())),
            },
            Value::String(s) => Some(Self::Str(s.to_string())),
            Value::Array(items) => Some(Self::StrList(
                items.iter().filter_map(value_to_string).collect(),
            )),
            Value::Object(m) => Some(Self::StrMap(
                m.iter()
                    .filter_map(|(k, v)| {
                        value_to_string(v).map(|v| (k.to_string(), v))
                    })
                    .collect(),
            )),
            Value::Null => None,
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl std::fmt::Display for NmValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::StrList(l) => write!(f, "[{}]", l.join(", ")),
            Self::StrMap(m) => write!(
                f,
                "{{{}}}",
                m.iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Self::Routes(r) => write!(
                f,
                "[{}]",
                r.iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NmSetting {
    props: BTreeMap<String, NmValue>,
}

impl NmSetting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prop_name: &str) -> Option<&NmValue> {
        self.props.get(prop_name)
    }

    pub fn set(&mut self, prop_name: &str, value: NmValue) {
        self.props.insert(prop_name.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NmValue)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    fn get_str(&self, prop_name: &str) -> Option<&str> {
        self.get(prop_name).and_then(|v| v.as_str())
    }
}

/// Connection profile: settings keyed by their name, each setting name
/// appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NmConnection {
    settings: BTreeMap<String, NmSetting>,
}

impl<'de> Deserialize<'de> for NmConnection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Self::from_value(&v).map_err(serde::de::Error::custom)
    }
}

impl NmConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &Value) -> Result<Self, NmMatchError> {
        let mut ret = Self::new();
        let settings = value.as_object().ok_or_else(|| {
            NmMatchError::new(
                ErrorKind::InvalidArgument,
                format!("Expecting dict of settings, but got {value}"),
            )
        })?;
        for (setting_name, props) in settings.iter() {
            if setting_schema(setting_name).is_none() {
                log::debug!(
                    "Setting {setting_name} is unknown, it will not be used \
                    for matching"
                );
            }
            let mut setting = NmSetting::new();
            if let Some(props) = props.as_object() {
                for (prop_name, v) in props.iter() {
                    if let Some(v) =
                        NmValue::from_value(setting_name, prop_name, v)?
                    {
                        setting.set(prop_name, v);
                    }
                }
            } else if !props.is_null() {
                return Err(NmMatchError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Expecting dict for setting {setting_name}, \
                        but got {props}"
                    ),
                ));
            }
            ret.settings.insert(setting_name.to_string(), setting);
        }
        Ok(ret)
    }

    pub fn setting(&self, setting_name: &str) -> Option<&NmSetting> {
        self.settings.get(setting_name)
    }

    pub fn has_setting(&self, setting_name: &str) -> bool {
        self.settings.contains_key(setting_name)
    }

    pub fn settings(&self) -> impl Iterator<Item = (&str, &NmSetting)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add an empty setting if not exist yet.
    pub fn add_setting(&mut self, setting_name: &str) -> &mut NmSetting {
        self.settings.entry(setting_name.to_string()).or_default()
    }

    pub fn set_property(
        &mut self,
        setting_name: &str,
        prop_name: &str,
        value: NmValue,
    ) {
        self.add_setting(setting_name).set(prop_name, value);
    }

    /// Value explicitly stored in this profile.
    pub fn property(
        &self,
        setting_name: &str,
        prop_name: &str,
    ) -> Option<&NmValue> {
        self.setting(setting_name).and_then(|s| s.get(prop_name))
    }

    /// Explicit value, or the schema default when not set.
    /// An absent setting is treated as a setting holding only defaults.
    pub fn effective_property(
        &self,
        setting_name: &str,
        prop_name: &str,
    ) -> Option<NmValue> {
        self.property(setting_name, prop_name).cloned().or_else(|| {
            property_schema(setting_name, prop_name)
                .and_then(|p| p.default.to_value())
        })
    }

    fn str_property(&self, setting_name: &str, prop_name: &str) -> Option<&str> {
        self.setting(setting_name).and_then(|s| s.get_str(prop_name))
    }

    pub fn id(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_CONNECTION_SETTING_NAME,
            NM_SETTING_CONNECTION_ID,
        )
    }

    pub fn uuid(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_CONNECTION_SETTING_NAME,
            NM_SETTING_CONNECTION_UUID,
        )
    }

    pub fn connection_type(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_CONNECTION_SETTING_NAME,
            NM_SETTING_CONNECTION_TYPE,
        )
    }

    pub fn iface_name(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_CONNECTION_SETTING_NAME,
            NM_SETTING_CONNECTION_INTERFACE_NAME,
        )
    }

    /// Controller, falling back to the legacy `master` property.
    pub fn controller(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_CONNECTION_SETTING_NAME,
            NM_SETTING_CONNECTION_CONTROLLER,
        )
        .or_else(|| {
            self.str_property(
                NM_SETTING_CONNECTION_SETTING_NAME,
                NM_SETTING_CONNECTION_MASTER,
            )
        })
    }

    /// Port type, falling back to the legacy `slave-type` property.
    pub fn port_type(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_CONNECTION_SETTING_NAME,
            NM_SETTING_CONNECTION_PORT_TYPE,
        )
        .or_else(|| {
            self.str_property(
                NM_SETTING_CONNECTION_SETTING_NAME,
                NM_SETTING_CONNECTION_SLAVE_TYPE,
            )
        })
    }

    /// IP method, `auto` when not defined or the IP setting is absent.
    pub fn ip_method(&self, family: NmIpFamily) -> &str {
        self.str_property(family.setting_name(), NM_SETTING_IP_CONFIG_METHOD)
            .unwrap_or(crate::NM_SETTING_IP4_CONFIG_METHOD_AUTO)
    }

    /// None if the IP setting is absent.
    pub fn ip_may_fail(&self, family: NmIpFamily) -> Option<bool> {
        self.setting(family.setting_name()).map(|s| {
            s.get(NM_SETTING_IP_CONFIG_MAY_FAIL)
                .and_then(|v| v.as_bool())
                .unwrap_or(true)
        })
    }

    /// The `route-metric` of IP setting, [NM_IP_ROUTE_METRIC_DEFAULT] when
    /// unset.
    pub fn route_metric(&self, family: NmIpFamily) -> i64 {
        self.property(family.setting_name(), NM_SETTING_IP_CONFIG_ROUTE_METRIC)
            .and_then(|v| v.as_i64())
            .unwrap_or(NM_IP_ROUTE_METRIC_DEFAULT)
    }

    pub fn ip_routes(&self, family: NmIpFamily) -> &[NmIpRoute] {
        self.property(family.setting_name(), NM_SETTING_IP_CONFIG_ROUTES)
            .and_then(|v| v.as_routes())
            .unwrap_or_default()
    }

    pub fn wired_mac_address(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_WIRED_SETTING_NAME,
            NM_SETTING_WIRED_MAC_ADDRESS,
        )
    }

    pub fn wired_cloned_mac_address(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_WIRED_SETTING_NAME,
            NM_SETTING_WIRED_CLONED_MAC_ADDRESS,
        )
    }

    pub fn infiniband_mac_address(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_INFINIBAND_SETTING_NAME,
            NM_SETTING_INFINIBAND_MAC_ADDRESS,
        )
    }

    pub fn s390_subchannels(&self) -> &[String] {
        self.property(
            NM_SETTING_WIRED_SETTING_NAME,
            NM_SETTING_WIRED_S390_SUBCHANNELS,
        )
        .and_then(|v| v.as_str_list())
        .unwrap_or_default()
    }

    pub fn s390_nettype(&self) -> Option<&str> {
        self.str_property(
            NM_SETTING_WIRED_SETTING_NAME,
            NM_SETTING_WIRED_S390_NETTYPE,
        )
    }

    pub fn s390_options_count(&self) -> usize {
        self.property(
            NM_SETTING_WIRED_SETTING_NAME,
            NM_SETTING_WIRED_S390_OPTIONS,
        )
        .and_then(|v| v.as_str_map())
        .map(|m| m.len())
        .unwrap_or_default()
    }
}

impl std::fmt::Display for NmConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.id(), self.uuid()) {
            (Some(id), Some(uuid)) => write!(f, "{id}({uuid})"),
            (Some(id), None) => write!(f, "{id}"),
            (None, Some(uuid)) => write!(f, "{uuid}"),
            (None, None) => write!(f, "<anonymous>"),
        }
    }
}
