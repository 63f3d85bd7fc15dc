//! Mapping rules shared by several resources.

use super::Attr;
use crate::api::KeyValue;
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// User-facing config map; the wire form is a `{key, value}` list.
pub type ConfigMap = BTreeMap<String, String>;

pub const PRINCIPAL_PREFIX: &str = "User:";

pub fn configs_to_wire(map: &ConfigMap) -> Vec<KeyValue> {
    map.iter().map(|(k, v)| KeyValue::new(k.clone(), v.clone())).collect()
}

pub fn configs_from_wire(list: &[KeyValue]) -> ConfigMap {
    list.iter().map(|kv| (kv.key.clone(), kv.value.clone())).collect()
}

/// Server configs restricted to the keys the user manages.
///
/// An unknown prior (import) adopts every server key; a null prior manages none.
pub fn managed_configs(server: &[KeyValue], prior: &Attr<ConfigMap>) -> Attr<ConfigMap> {
    let all = configs_from_wire(server);
    match prior {
        Attr::Known(prior) => {
            Attr::Known(all.into_iter().filter(|(k, _)| prior.contains_key(k)).collect())
        }
        Attr::Unknown if !all.is_empty() => Attr::Known(all),
        _ => Attr::Null,
    }
}

/// Keys present in `prior` but missing from `plan`.
pub fn removed_keys(prior: &ConfigMap, plan: &ConfigMap) -> Vec<String> {
    prior.keys().filter(|k| !plan.contains_key(*k)).cloned().collect()
}

/// `alicloud` is presented as `aliyun` on the wire.
pub fn provider_to_wire(provider: &str) -> String {
    match provider {
        "alicloud" => "aliyun".to_string(),
        other => other.to_string(),
    }
}

pub fn provider_from_wire(provider: &str) -> String {
    match provider {
        "aliyun" => "alicloud".to_string(),
        other => other.to_string(),
    }
}

/// Instance status as shown to the user.
///
/// The waiter's pending states (`Creating`, `Changing`, `Deleting`) are kept so a snapshot
/// saved mid-operation says what is in progress; anything unrecognised is `Unknown`.
pub fn status_from_wire(state: &str) -> &'static str {
    match state {
        "Available" => "Running",
        "Error" => "Abnormal",
        "Creating" => "Creating",
        "Changing" => "Changing",
        "Deleting" => "Deleting",
        _ => "Unknown",
    }
}

/// `User:<name>` -> `<name>`.
pub fn parse_principal(principal: &str) -> Result<String> {
    match principal.strip_prefix(PRINCIPAL_PREFIX) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::validation(format!(
            "invalid principal {:?}: expected {}<name>",
            principal, PRINCIPAL_PREFIX
        ))),
    }
}

pub fn format_principal(user: &str) -> String {
    format!("{}{}", PRINCIPAL_PREFIX, user)
}

pub fn format_time(time: &Option<DateTime<Utc>>) -> Attr<String> {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)).into()
}

pub fn non_empty(value: &str) -> Attr<String> {
    if value.is_empty() {
        Attr::Null
    } else {
        Attr::Known(value.to_string())
    }
}

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Per-operation timeouts, written as human-readable durations (`"30m"`, `"1h 30m"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create: Attr<String>,
    pub update: Attr<String>,
    pub delete: Attr<String>,
}

impl Timeouts {
    pub fn create(&self) -> Result<Duration> {
        parse_timeout("create", &self.create, DEFAULT_CREATE_TIMEOUT)
    }

    pub fn update(&self) -> Result<Duration> {
        parse_timeout("update", &self.update, DEFAULT_UPDATE_TIMEOUT)
    }

    pub fn delete(&self) -> Result<Duration> {
        parse_timeout("delete", &self.delete, DEFAULT_DELETE_TIMEOUT)
    }
}

/// Timeouts of an optional block, falling back to defaults.
pub fn timeouts_of(block: &Attr<Timeouts>) -> Timeouts {
    block.value().cloned().unwrap_or_default()
}

fn parse_timeout(which: &str, value: &Attr<String>, default: Duration) -> Result<Duration> {
    match value.non_empty() {
        None => Ok(default),
        Some(raw) => humantime::parse_duration(raw).map_err(|e| {
            Error::validation(format!("invalid {} timeout {:?}: {}", which, raw, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trip() {
        let mut map = ConfigMap::new();
        map.insert("retention.ms".into(), "3600000".into());
        map.insert("cleanup.policy".into(), "compact".into());
        map.insert("empty".into(), String::new());
        assert_eq!(configs_from_wire(&configs_to_wire(&map)), map);
        assert_eq!(configs_from_wire(&configs_to_wire(&ConfigMap::new())), ConfigMap::new());
    }

    #[test]
    fn managed_configs_keeps_user_keys() {
        let server = vec![KeyValue::new("a", "1"), KeyValue::new("b", "2")];
        let mut prior = ConfigMap::new();
        prior.insert("a".into(), "0".into());
        let got = managed_configs(&server, &Attr::Known(prior));
        assert_eq!(got.value().unwrap().len(), 1);
        assert_eq!(got.value().unwrap()["a"], "1");
        assert_eq!(managed_configs(&server, &Attr::Unknown).value().unwrap().len(), 2);
        assert!(managed_configs(&server, &Attr::Null).is_null());
        assert!(managed_configs(&[], &Attr::Unknown).is_null());
    }

    #[test]
    fn provider_names_map_both_ways() {
        assert_eq!(provider_to_wire("alicloud"), "aliyun");
        assert_eq!(provider_from_wire("aliyun"), "alicloud");
        assert_eq!(provider_to_wire("aws"), "aws");
        assert_eq!(provider_from_wire("aws"), "aws");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_from_wire("Available"), "Running");
        assert_eq!(status_from_wire("Error"), "Abnormal");
        assert_eq!(status_from_wire("Creating"), "Creating");
        assert_eq!(status_from_wire("Changing"), "Changing");
        assert_eq!(status_from_wire("Deleting"), "Deleting");
        assert_eq!(status_from_wire("Rebooting"), "Unknown");
        assert_eq!(status_from_wire(""), "Unknown");
    }

    #[test]
    fn principal_parse() {
        for name in ["alice", "a", "User:nested", "with space"] {
            assert_eq!(parse_principal(&format_principal(name)).unwrap(), name);
        }
        assert!(parse_principal("User:").is_err());
        assert!(parse_principal("User").is_err());
        assert!(parse_principal("Group:ops").is_err());
        assert!(parse_principal("").is_err());
    }

    #[test]
    fn timeouts_parse_with_defaults() {
        let t = Timeouts { create: "30m".into(), update: Attr::Null, delete: "1h 5m".into() };
        assert_eq!(t.create().unwrap(), Duration::from_secs(1800));
        assert_eq!(t.update().unwrap(), DEFAULT_UPDATE_TIMEOUT);
        assert_eq!(t.delete().unwrap(), Duration::from_secs(3900));

        let bad = Timeouts { create: "soon".into(), ..Default::default() };
        assert!(bad.create().unwrap_err().is_validation());
    }
}
