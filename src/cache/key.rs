//! Canonical route cache keys.

use std::collections::BTreeMap;
use std::fmt;

/// Canonical identity of a compiled route: the prefix plus the sorted
/// `name=value` pairs the client actually supplied.
///
/// The wire form is `prefix + "," + pairs` with no separator between pairs
/// and pairs ordered by parameter name. Parameters filled in from a
/// prefix's defaults do not contribute; two requests differing only in
/// unsupplied defaults share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(prefix: &str, supplied: &BTreeMap<String, String>) -> Self {
        let mut key = String::with_capacity(prefix.len() + 1);
        key.push_str(prefix);
        key.push(',');
        for (name, value) in supplied {
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_orders_pairs_by_name() {
        let key = CacheKey::for_request("/world", &pairs(&[("z", "3"), ("style", "day")]));
        assert_eq!(key.as_str(), "/world,style=dayz=3");
    }

    #[test]
    fn test_key_ignores_submission_order() {
        let forward = CacheKey::for_request("/world", &pairs(&[("a", "1"), ("b", "2"), ("c", "3")]));
        let reversed =
            CacheKey::for_request("/world", &pairs(&[("c", "3"), ("b", "2"), ("a", "1")]));
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_key_without_supplied_parameters_is_bare() {
        let key = CacheKey::for_request("/world", &BTreeMap::new());
        assert_eq!(key.as_str(), "/world,");
    }
}
