//! Typed env-encoded key/value payloads (`k1=v1&k2=v2&...`).
//!
//! The wire format is kept for compatibility with the opaque-query protocol
//! (§6.2/§9 design notes), but it is parsed into this typed map at the
//! boundary; nothing downstream plumbs raw strings.

use std::collections::BTreeMap;
use std::fmt;

/// An ordered key/value env. Keys are sorted so that encoding is
/// deterministic (needed so signing over the encoded form is reproducible).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env(BTreeMap<String, String>);

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes as `k1=v1&k2=v2&...`, keys sorted lexicographically.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a `k1=v1&k2=v2` string. Entries without `=` are ignored;
    /// malformed input never panics, matching the opaque-query contract that
    /// transport errors are the caller's concern, not this parser's.
    pub fn decode(s: &str) -> Self {
        let mut env = Env::new();
        if s.is_empty() {
            return env;
        }
        for part in s.split('&') {
            if let Some((k, v)) = part.split_once('=') {
                env.set(k, v);
            }
        }
        env
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromIterator<(String, String)> for Env {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Env(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let mut env = Env::new();
        env.set("a", "1").set("b", "2");
        let wire = env.encode();
        assert_eq!(wire, "a=1&b=2");
        assert_eq!(Env::decode(&wire), env);
    }

    #[test]
    fn decode_ignores_malformed_parts() {
        let env = Env::decode("a=1&bogus&b=2");
        assert_eq!(env.get("a"), Some("1"));
        assert_eq!(env.get("b"), Some("2"));
        assert_eq!(env.get("bogus"), None);
    }

    #[test]
    fn decode_empty_is_empty() {
        assert_eq!(Env::decode(""), Env::new());
    }
}
