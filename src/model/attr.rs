use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON marker the host uses for values that are only known after apply.
pub const UNKNOWN_MARKER: &str = "$unknown";

/// A desired-state attribute: set, computed-after-apply, or omitted.
///
/// Wire payloads are only ever built from `Known` values; `Unknown` and `Null` both
/// mean "do not send". Values flattened from a server response are never `Unknown`.
///
/// JSON form: `null` (or an absent field) is `Null`, `{"$unknown": true}` is `Unknown`,
/// anything else is `Known`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attr<T> {
    Known(T),
    Unknown,
    #[default]
    Null,
}

impl<T> Attr<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Attr::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Attr::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Attr::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Attr::Known(v) => Attr::Known(v),
            Attr::Unknown => Attr::Unknown,
            Attr::Null => Attr::Null,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Known(v) => Attr::Known(f(v)),
            Attr::Unknown => Attr::Unknown,
            Attr::Null => Attr::Null,
        }
    }
}

impl<T: Clone> Attr<T> {
    /// Use `self` if known, otherwise the prior value. Never yields `Unknown`.
    pub fn or_prior(self, prior: &Attr<T>) -> Attr<T> {
        match self {
            Attr::Known(v) => Attr::Known(v),
            _ => match prior {
                Attr::Known(v) => Attr::Known(v.clone()),
                _ => Attr::Null,
            },
        }
    }

    /// Known value or the provided default.
    pub fn value_or(&self, default: T) -> T {
        self.value().cloned().unwrap_or(default)
    }
}

impl Attr<String> {
    /// Known, non-empty string.
    pub fn non_empty(&self) -> Option<&str> {
        self.value().map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Known string or `""`.
    pub fn as_str(&self) -> &str {
        self.value().map(String::as_str).unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Attr::Known(v),
            None => Attr::Null,
        }
    }
}

impl From<&str> for Attr<String> {
    fn from(value: &str) -> Self {
        Attr::Known(value.to_string())
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Known(v) => v.serialize(serializer),
            Attr::Null => serializer.serialize_none(),
            Attr::Unknown => {
                let mut marker = serde_json::Map::new();
                marker.insert(UNKNOWN_MARKER.to_string(), serde_json::Value::Bool(true));
                marker.serialize(serializer)
            }
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Attr::Null);
        }
        if let Some(obj) = value.as_object() {
            if obj.len() == 1 && obj.get(UNKNOWN_MARKER) == Some(&serde_json::Value::Bool(true)) {
                return Ok(Attr::Unknown);
            }
        }
        serde_json::from_value(value).map(Attr::Known).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Probe {
        name: Attr<String>,
        count: Attr<i64>,
    }

    #[test]
    fn json_forms() {
        let p: Probe = serde_json::from_value(json!({"name": {"$unknown": true}})).unwrap();
        assert_eq!(p.name, Attr::Unknown);
        assert_eq!(p.count, Attr::Null);

        let p: Probe = serde_json::from_value(json!({"name": "demo", "count": null})).unwrap();
        assert_eq!(p.name, Attr::Known("demo".to_string()));
        assert!(p.count.is_null());

        let back = serde_json::to_value(Probe { name: Attr::Unknown, count: Attr::Known(3) }).unwrap();
        assert_eq!(back, json!({"name": {"$unknown": true}, "count": 3}));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let res: Result<Probe, _> = serde_json::from_value(json!({"count": "three"}));
        assert!(res.is_err());
    }

    #[test]
    fn or_prior_never_yields_unknown() {
        let prior = Attr::Known("secret".to_string());
        assert_eq!(Attr::Null.or_prior(&prior), prior);
        assert_eq!(Attr::Unknown.or_prior(&prior), prior);
        assert_eq!(Attr::<String>::Unknown.or_prior(&Attr::Unknown), Attr::Null);
        assert_eq!(Attr::from("new").or_prior(&prior), Attr::from("new"));
    }
}
