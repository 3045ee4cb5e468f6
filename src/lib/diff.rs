// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::schema::setting_schema;
use crate::{
    NmConnection, NmValue, NM_SETTING_CONNECTION_PORT_TYPE,
    NM_SETTING_CONNECTION_SETTING_NAME, NM_SETTING_CONNECTION_SLAVE_TYPE,
};

// (setting, property, legacy alias): the alias is folded into the property
// and never reported on its own.
const NM_PROPERTY_ALIASES: [(&str, &str, &str); 1] = [(
    NM_SETTING_CONNECTION_SETTING_NAME,
    NM_SETTING_CONNECTION_PORT_TYPE,
    NM_SETTING_CONNECTION_SLAVE_TYPE,
)];

/// Values of one property in the original and the candidate profile,
/// None stands for unset.
pub type NmPropertyDiffValues = (Option<NmValue>, Option<NmValue>);

/// Inferrable properties which differ between two profiles, keyed by
/// setting name then property name.
/// A setting never holds an empty property map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NmPropertyDiff {
    settings: BTreeMap<String, BTreeMap<String, NmPropertyDiffValues>>,
}

impl NmPropertyDiff {
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn contains(&self, setting_name: &str, prop_name: &str) -> bool {
        self.get(setting_name, prop_name).is_some()
    }

    pub fn contains_setting(&self, setting_name: &str) -> bool {
        self.settings.contains_key(setting_name)
    }

    pub fn get(
        &self,
        setting_name: &str,
        prop_name: &str,
    ) -> Option<&NmPropertyDiffValues> {
        self.settings
            .get(setting_name)
            .and_then(|props| props.get(prop_name))
    }

    pub(crate) fn insert(
        &mut self,
        setting_name: &str,
        prop_name: &str,
        values: NmPropertyDiffValues,
    ) {
        self.settings
            .entry(setting_name.to_string())
            .or_default()
            .insert(prop_name.to_string(), values);
    }

    /// Remove the property, and the setting if it has no property left.
    pub fn remove(&mut self, setting_name: &str, prop_name: &str) -> bool {
        let mut removed = false;
        if let Some(props) = self.settings.get_mut(setting_name) {
            removed = props.remove(prop_name).is_some();
            if props.is_empty() {
                self.settings.remove(setting_name);
            }
        }
        removed
    }

    pub fn remove_setting(&mut self, setting_name: &str) -> bool {
        self.settings.remove(setting_name).is_some()
    }

    /// Iterate `(setting name, property name, values)`.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, &str, &NmPropertyDiffValues)> {
        self.settings.iter().flat_map(|(setting_name, props)| {
            props.iter().map(move |(prop_name, values)| {
                (setting_name.as_str(), prop_name.as_str(), values)
            })
        })
    }

    pub fn len(&self) -> usize {
        self.settings.values().map(|props| props.len()).sum()
    }
}

// The `setting.property` list joined by comma.
impl std::fmt::Display for NmPropertyDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.iter()
                .map(|(setting_name, prop_name, _)| format!(
                    "{setting_name}.{prop_name}"
                ))
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

/// Compare the inferrable properties of two profiles.
///
/// Unset properties use their schema default, and an absent setting is
/// compared as a setting holding only default values. Use
/// [NmConnection::has_setting()] to tell the two apart.
/// The legacy `slave-type` is compared as `port-type`.
///
/// Return whether both are equal and the differences found.
pub fn nm_connection_diff(
    original: &NmConnection,
    candidate: &NmConnection,
) -> (bool, NmPropertyDiff) {
    let mut diff = NmPropertyDiff::default();

    let setting_names: BTreeSet<&str> = original
        .settings()
        .chain(candidate.settings())
        .map(|(name, _)| name)
        .collect();

    for setting_name in setting_names {
        let schema = match setting_schema(setting_name) {
            Some(s) => s,
            None => continue,
        };
        for prop in schema.inferrable_properties() {
            if is_legacy_alias(setting_name, prop.name) {
                continue;
            }
            let orig_value = effective_property_with_alias(
                original,
                setting_name,
                prop.name,
            );
            let cand_value = effective_property_with_alias(
                candidate,
                setting_name,
                prop.name,
            );
            if orig_value != cand_value {
                diff.insert(setting_name, prop.name, (orig_value, cand_value));
            }
        }
    }
    (diff.is_empty(), diff)
}

fn is_legacy_alias(setting_name: &str, prop_name: &str) -> bool {
    NM_PROPERTY_ALIASES
        .iter()
        .any(|(s, _, alias)| *s == setting_name && *alias == prop_name)
}

fn effective_property_with_alias(
    conn: &NmConnection,
    setting_name: &str,
    prop_name: &str,
) -> Option<NmValue> {
    let alias = NM_PROPERTY_ALIASES
        .iter()
        .find(|(s, p, _)| *s == setting_name && *p == prop_name)
        .map(|(_, _, alias)| *alias);
    let value = conn.effective_property(setting_name, prop_name);
    match alias {
        Some(alias) => {
            value.or_else(|| conn.effective_property(setting_name, alias))
        }
        None => value,
    }
}
