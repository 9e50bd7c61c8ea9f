use std::collections::HashMap;

/// Request headers whose value is a `", "` separated list.
const MULTI_VALUED: &[&str] = &[
    "accept",
    "accept-charset",
    "accept-encoding",
    "accept-language",
    "cache-control",
    "connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "vary",
    "via",
];

/// Request header map. Names are lowercased on every insert and lookup, so
/// callers may use any casing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    values: HashMap<String, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_multi_valued(name: &str) -> bool {
        MULTI_VALUED.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Adds a raw header value, splitting it into a list for multi-valued
    /// headers. Repeated names accumulate.
    pub fn append(&mut self, name: &str, raw_value: &str) {
        let entry = self.values.entry(name.to_ascii_lowercase()).or_default();
        if Self::is_multi_valued(name) {
            entry.extend(raw_value.split(", ").map(String::from));
        } else {
            entry.push(raw_value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_slice())
    }

    /// First value of `name`, the common case for single-valued headers.
    pub fn get_one(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|v| v.first())
            .map(|v| v.as_str())
    }

}

impl<const N: usize> From<[(&str, &str); N]> for HeaderMap {
    fn from(value: [(&str, &str); N]) -> Self {
        let mut map = HeaderMap::new();
        for (k, v) in value {
            map.append(k, v);
        }
        map
    }
}

/// Response headers. Kept in insertion order and emitted with the casing the
/// handler used; lookups ignore case.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing an existing entry of any casing in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
