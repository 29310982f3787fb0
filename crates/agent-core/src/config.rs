//! Credentials
//!
//! Named credentials and endpoints consumed at registry-build time. A
//! missing or blank value only disables the capabilities that need it.

use std::collections::BTreeMap;

use crate::registry::Precondition;

/// Variables read by [`Credentials::from_env`]
pub const KNOWN_KEYS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "OWM_API_KEY",
    "WOLFRAM_ALPHA_APPID",
    "GOOGLE_API_KEY",
    "GOOGLE_CSE_ID",
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every known, non-blank variable from the environment
    pub fn from_env() -> Self {
        KNOWN_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value)))
            .collect()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value; blank values are ignored
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Precondition that every key in `keys` is set
    pub fn require(&self, keys: &[&str]) -> Precondition {
        let missing: Vec<&str> = keys.iter().copied().filter(|k| !self.contains(k)).collect();
        if missing.is_empty() {
            Precondition::Met
        } else {
            Precondition::missing(format!("{} not found", missing.join(" and/or ")))
        }
    }

    /// Keys present, for startup logs (never the values)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut credentials = Self::new();
        for (key, value) in iter {
            credentials.insert(key, value);
        }
        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_absent() {
        let creds = Credentials::new().with("OWM_API_KEY", "  ").with("GOOGLE_API_KEY", "k");
        assert!(!creds.contains("OWM_API_KEY"));
        assert_eq!(creds.get("GOOGLE_API_KEY"), Some("k"));
    }

    #[test]
    fn test_require_reports_missing_keys() {
        let creds = Credentials::new().with("GOOGLE_API_KEY", "k");
        assert_eq!(creds.require(&["GOOGLE_API_KEY"]), Precondition::Met);
        assert_eq!(
            creds.require(&["GOOGLE_API_KEY", "GOOGLE_CSE_ID"]),
            Precondition::missing("GOOGLE_CSE_ID not found")
        );
    }

    #[test]
    fn test_collect_from_pairs() {
        let creds: Credentials = [("WOLFRAM_ALPHA_APPID", "abc"), ("OWM_API_KEY", "")]
            .into_iter()
            .collect();
        assert_eq!(creds.keys().collect::<Vec<_>>(), vec!["WOLFRAM_ALPHA_APPID"]);
    }
}
