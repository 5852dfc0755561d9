use serde_json::{Map, Value};

/// Caller-facing keys that Geonames expects under a different query name.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("postalCode", "postalcode"),
    ("countryCode", "country"),
    ("admLevel", "adm"),
];

fn wire_name(key: &str) -> &str {
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, wire)| *wire)
        .unwrap_or(key)
}

/// Per-call request parameters
///
/// Values are plain JSON scalars. A `null` value is treated exactly like a
/// missing key, so `Option<T>` can be passed straight through `with`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions(Map<String, Value>);

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a present, non-null value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Value::is_null)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Rename caller aliases (`postalCode`, `countryCode`, `admLevel`) to the
    /// names the service reads. When both spellings are given, the alias wins.
    pub fn to_wire(&self) -> RequestOptions {
        let mut wire = Map::new();
        for (key, value) in &self.0 {
            if wire_name(key) == key.as_str() {
                wire.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &self.0 {
            let name = wire_name(key);
            if name != key.as_str() && !value.is_null() {
                wire.insert(name.to_string(), value.clone());
            }
        }
        RequestOptions(wire)
    }
}

impl From<Map<String, Value>> for RequestOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for RequestOptions
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Flattened query string parameters, ready to hand to the HTTP client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value sent under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    fn push(&mut self, name: &str, value: &Value) {
        match value {
            Value::Null => {}
            Value::String(s) => self.pairs.push((name.to_string(), s.clone())),
            Value::Bool(b) => self.pairs.push((name.to_string(), b.to_string())),
            Value::Number(n) => self.pairs.push((name.to_string(), n.to_string())),
            // Repeated parameters, e.g. several featureCode values
            Value::Array(items) => {
                for item in items {
                    self.push(name, item);
                }
            }
            Value::Object(_) => self.pairs.push((name.to_string(), value.to_string())),
        }
    }
}

/// Merge option layers into a query, lowest precedence first.
///
/// Null values never override a lower layer. The layers are only read, so a
/// defaults template can be shared between calls safely.
pub fn merge(layers: &[&RequestOptions]) -> Query {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            if !value.is_null() {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    let mut query = Query::default();
    for (key, value) in &merged {
        query.push(key, value);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_higher_layer_wins() {
        let defaults = RequestOptions::new().with("maxRows", 5).with("radius", 10);
        let caller = RequestOptions::new().with("maxRows", 20);

        let query = merge(&[&defaults, &caller]);
        assert_eq!(query.get("maxRows"), Some("20"));
        assert_eq!(query.get("radius"), Some("10"));
    }

    #[test]
    fn test_null_falls_through() {
        let defaults = RequestOptions::new().with("maxRows", 5);
        let caller = RequestOptions::new()
            .with("maxRows", None::<u32>)
            .with("style", Value::Null);

        let query = merge(&[&defaults, &caller]);
        assert_eq!(query.get("maxRows"), Some("5"));
        assert!(!query.contains("style"));
    }

    #[test]
    fn test_merge_does_not_touch_layers() {
        let defaults = RequestOptions::new().with("maxRows", 5);
        let caller = RequestOptions::new().with("maxRows", 7);
        let _ = merge(&[&defaults, &caller]);
        let again = merge(&[&defaults]);
        assert_eq!(again.get("maxRows"), Some("5"));
    }

    #[test]
    fn test_scalar_formatting() {
        let options = RequestOptions::new()
            .with("lat", 51.05)
            .with("localCountry", true)
            .with("postalcode", "3580");

        let query = merge(&[&options]);
        assert_eq!(query.get("lat"), Some("51.05"));
        assert_eq!(query.get("localCountry"), Some("true"));
        assert_eq!(query.get("postalcode"), Some("3580"));
    }

    #[test]
    fn test_arrays_repeat_parameter() {
        let options = RequestOptions::new().with("featureCode", json!(["PPL", "PPLA"]));
        let query = merge(&[&options]);
        let codes: Vec<&str> = query.get_all("featureCode").collect();
        assert_eq!(codes, vec!["PPL", "PPLA"]);
    }

    #[test]
    fn test_aliases_renamed() {
        let options = RequestOptions::new()
            .with("postalCode", "3580")
            .with("countryCode", "BE")
            .with("admLevel", 2)
            .with("maxRows", 20);

        let wire = options.to_wire();
        assert_eq!(wire.get("postalcode"), Some(&json!("3580")));
        assert_eq!(wire.get("country"), Some(&json!("BE")));
        assert_eq!(wire.get("adm"), Some(&json!(2)));
        assert!(wire.get("postalCode").is_none());
        assert!(wire.get("countryCode").is_none());
    }

    #[test]
    fn test_alias_beats_wire_spelling() {
        let options = RequestOptions::new()
            .with("country", "NL")
            .with("countryCode", "BE");
        assert_eq!(options.to_wire().get("country"), Some(&json!("BE")));

        let null_alias = RequestOptions::new()
            .with("country", "NL")
            .with("countryCode", Value::Null);
        assert_eq!(null_alias.to_wire().get("country"), Some(&json!("NL")));
    }

    #[test]
    fn test_from_iter() {
        let options: RequestOptions = [("lat", 1.5), ("lng", 2.5)].into_iter().collect();
        assert_eq!(options.get("lng"), Some(&json!(2.5)));
        assert!(!options.is_empty());
        assert!(RequestOptions::new().with("x", Value::Null).is_empty());
    }
}
